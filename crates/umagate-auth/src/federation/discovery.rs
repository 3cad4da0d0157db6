//! Provider discovery and endpoint resolution.
//!
//! # Overview
//!
//! [`ProviderConfigResolver`] fetches the provider's discovery documents once
//! at startup and produces an immutable [`ProviderConfig`]. Each integration
//! is resolved only when its discovery URI is configured:
//!
//! - `openid_config_uri` → [`OpenIdConfiguration`]
//! - `uma_config_uri` → [`UmaConfiguration`]
//!
//! A non-success status, a transport failure, a missing required member or a
//! disallowed URL scheme aborts startup for that integration. There is no
//! refresh path: picking up new endpoints requires resolving again.
//!
//! # Example
//!
//! ```ignore
//! use umagate_auth::federation::discovery::{DiscoveryClient, ProviderConfigResolver};
//!
//! let client = DiscoveryClient::new(&config.http, config.provider.allow_http)?;
//! let resolver = ProviderConfigResolver::new(client, config.provider.clone());
//! let provider = resolver.resolve().await?;
//! ```

use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use url::Url;

use super::metadata::{OpenIdConfiguration, UmaConfiguration};
use crate::config::{HttpConfig, ProviderSettings};

/// Errors that can occur while fetching discovery documents.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// A network error occurred while fetching the document.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The HTTP request returned a non-success status code.
    #[error("HTTP error: status {0}")]
    HttpError(u16),

    /// The document could not be parsed, or lacks a required member.
    #[error("Failed to parse discovery document: {0}")]
    ParseError(String),

    /// A URL scheme is not allowed (must be HTTPS in production).
    #[error("Invalid URL scheme for {name}: {scheme} (only HTTPS is allowed)")]
    InvalidScheme {
        /// The member or setting carrying the URL.
        name: String,
        /// The rejected scheme.
        scheme: String,
    },

    /// The response exceeded the maximum allowed size.
    #[error("Response exceeds maximum size of {max_size} bytes")]
    ResponseTooLarge {
        /// The maximum allowed size.
        max_size: usize,
    },
}

/// Fetches JSON discovery documents with size and scheme limits.
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    http_client: reqwest::Client,
    max_response_size: usize,
    allow_http: bool,
}

impl DiscoveryClient {
    /// Creates a discovery client honouring the HTTP limits.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryError::NetworkError` if the HTTP client cannot be
    /// built.
    pub fn new(http: &HttpConfig, allow_http: bool) -> Result<Self, DiscoveryError> {
        let http_client = http
            .client()
            .map_err(|e| DiscoveryError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            max_response_size: http.max_response_size,
            allow_http,
        })
    }

    /// Returns the underlying HTTP client.
    #[must_use]
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Returns the response size limit in bytes.
    #[must_use]
    pub fn max_response_size(&self) -> usize {
        self.max_response_size
    }

    /// Returns `true` if plain HTTP URLs are accepted.
    #[must_use]
    pub fn allow_http(&self) -> bool {
        self.allow_http
    }

    /// Fetches and parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL scheme is not allowed, the request fails,
    /// the status is not 2xx, the body is too large, or it does not parse.
    pub async fn fetch<T: DeserializeOwned>(&self, name: &str, url: &Url) -> Result<T, DiscoveryError> {
        let body = self.fetch_bytes(name, url).await?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!("Failed to parse {} from {}: {}", name, url, e);
            DiscoveryError::ParseError(format!("{name}: {e}"))
        })
    }

    /// Fetches a document body without interpreting it.
    ///
    /// # Errors
    ///
    /// Same as [`DiscoveryClient::fetch`], minus parsing.
    pub async fn fetch_bytes(&self, name: &str, url: &Url) -> Result<Vec<u8>, DiscoveryError> {
        self.validate_scheme(name, url)?;

        tracing::debug!("Fetching {} from {}", name, url);

        let response = self
            .http_client
            .get(url.as_str())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!("Failed to fetch {} from {}: {}", name, url, e);
                DiscoveryError::NetworkError(e.to_string())
            })?;

        let status = response.status();
        tracing::debug!(%status, "GET {}", url);
        if !status.is_success() {
            return Err(DiscoveryError::HttpError(status.as_u16()));
        }

        if let Some(len) = response.content_length()
            && len as usize > self.max_response_size
        {
            return Err(DiscoveryError::ResponseTooLarge {
                max_size: self.max_response_size,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| DiscoveryError::NetworkError(e.to_string()))?
            .to_vec();
        if body.len() > self.max_response_size {
            return Err(DiscoveryError::ResponseTooLarge {
                max_size: self.max_response_size,
            });
        }

        Ok(body)
    }

    /// Validates that a URL uses an allowed scheme.
    pub fn validate_scheme(&self, name: &str, url: &Url) -> Result<(), DiscoveryError> {
        match url.scheme() {
            "https" => Ok(()),
            "http" if self.allow_http => Ok(()),
            scheme => Err(DiscoveryError::InvalidScheme {
                name: name.to_string(),
                scheme: scheme.to_string(),
            }),
        }
    }
}

/// Endpoint URLs resolved from the discovery documents.
///
/// Read-only once resolved. An integration whose discovery URI is not
/// configured is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    /// OpenID configuration, when token login is enabled.
    pub openid: Option<OpenIdConfiguration>,

    /// UMA configuration, when directory access is enabled.
    pub uma: Option<UmaConfiguration>,
}

/// Resolves [`ProviderConfig`] from the configured discovery URIs.
#[derive(Debug, Clone)]
pub struct ProviderConfigResolver {
    client: DiscoveryClient,
    settings: ProviderSettings,
}

impl ProviderConfigResolver {
    /// Creates a resolver.
    #[must_use]
    pub fn new(client: DiscoveryClient, settings: ProviderSettings) -> Self {
        Self { client, settings }
    }

    /// Returns the discovery client.
    #[must_use]
    pub fn client(&self) -> &DiscoveryClient {
        &self.client
    }

    /// Fetches every configured discovery document.
    ///
    /// # Errors
    ///
    /// Returns the first [`DiscoveryError`] encountered.
    pub async fn resolve(&self) -> Result<ProviderConfig, DiscoveryError> {
        let openid = match &self.settings.openid_config_uri {
            Some(uri) => Some(self.resolve_openid(uri).await?),
            None => {
                tracing::info!("OpenID discovery not configured; token login disabled");
                None
            }
        };

        let uma = match &self.settings.uma_config_uri {
            Some(uri) => Some(self.resolve_uma(uri).await?),
            None => {
                tracing::info!("UMA discovery not configured; directory mutations disabled");
                None
            }
        };

        Ok(ProviderConfig { openid, uma })
    }

    /// Fetches and validates the OpenID configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be fetched or parsed, or if
    /// an endpoint uses a disallowed scheme.
    pub async fn resolve_openid(&self, uri: &Url) -> Result<OpenIdConfiguration, DiscoveryError> {
        let config: OpenIdConfiguration = self.client.fetch("openid configuration", uri).await?;
        for (name, url) in config.endpoints() {
            self.client.validate_scheme(name, url)?;
        }

        tracing::debug!(issuer = %config.issuer, "Resolved OpenID configuration");
        Ok(config)
    }

    /// Fetches and validates the UMA configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be fetched or parsed, or if
    /// an endpoint uses a disallowed scheme.
    pub async fn resolve_uma(&self, uri: &Url) -> Result<UmaConfiguration, DiscoveryError> {
        let config: UmaConfiguration = self.client.fetch("uma configuration", uri).await?;
        for (name, url) in config.endpoints() {
            self.client.validate_scheme(name, url)?;
        }

        tracing::debug!(issuer = %config.issuer, "Resolved UMA configuration");
        Ok(config)
    }
}
