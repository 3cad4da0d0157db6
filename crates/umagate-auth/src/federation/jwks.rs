//! Provider JWKS fetching.
//!
//! The provider's key set is fetched once, when the OpenID configuration is
//! resolved, and kept for the lifetime of the process. A key rotated by the
//! provider is picked up only by resolving again.
//!
//! # Example
//!
//! ```ignore
//! use umagate_auth::federation::jwks::KeySetCache;
//!
//! let keys = KeySetCache::fetch(&discovery, &openid.jwks_uri).await?;
//! let key = keys.get("key-1")?;
//! ```
//!
//! # Security Considerations
//!
//! - Only HTTPS URIs are allowed for JWKS endpoints (configurable for testing)
//! - Response size is limited by `http.max_response_size`
//! - A key whose `kid`, `kty` or `alg` is missing is never used

use std::sync::Arc;

use time::OffsetDateTime;
use url::Url;

use super::discovery::{DiscoveryClient, DiscoveryError};
use crate::token::{JsonWebKey, KeySet, TokenVerifier};

/// Errors that can occur during JWKS operations.
#[derive(Debug, thiserror::Error)]
pub enum JwksError {
    /// A network error occurred while fetching the JWKS.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The HTTP request returned a non-success status code.
    #[error("HTTP error: status {0}")]
    HttpError(u16),

    /// The JWKS response could not be parsed.
    #[error("Failed to parse JWKS: {0}")]
    ParseError(String),

    /// The requested key was not found in the JWKS.
    #[error("No key found for kid: {0}")]
    KeyNotFound(String),

    /// The JWKS holds no usable key.
    #[error("No keys found in JWKS")]
    NoKeys,

    /// The JWKS URI scheme is not allowed (must be HTTPS in production).
    #[error("Invalid URL scheme: {0} (only HTTPS is allowed)")]
    InvalidScheme(String),

    /// The JWKS response exceeded the maximum allowed size.
    #[error("Response exceeds maximum size of {max_size} bytes")]
    ResponseTooLarge {
        /// The maximum allowed size.
        max_size: usize,
    },
}

impl From<DiscoveryError> for JwksError {
    fn from(err: DiscoveryError) -> Self {
        match err {
            DiscoveryError::NetworkError(msg) => Self::NetworkError(msg),
            DiscoveryError::HttpError(status) => Self::HttpError(status),
            DiscoveryError::ParseError(msg) => Self::ParseError(msg),
            DiscoveryError::InvalidScheme { scheme, .. } => Self::InvalidScheme(scheme),
            DiscoveryError::ResponseTooLarge { max_size } => Self::ResponseTooLarge { max_size },
        }
    }
}

/// The provider's published key set, as fetched at startup.
#[derive(Debug, Clone)]
pub struct KeySetCache {
    keys: Arc<KeySet>,
    source: Url,
    fetched_at: OffsetDateTime,
}

impl KeySetCache {
    /// Fetches and parses the JWKS document at `jwks_uri`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The URI scheme is not HTTPS (unless `allow_http` is configured)
    /// - The HTTP request fails or returns a non-2xx status
    /// - The response is too large or cannot be parsed as a JWKS
    /// - The document holds no usable key
    pub async fn fetch(client: &DiscoveryClient, jwks_uri: &Url) -> Result<Self, JwksError> {
        let body = client.fetch_bytes("jwks_uri", jwks_uri).await?;
        let keys = KeySet::from_slice(&body)?;

        tracing::info!(keys = keys.len(), "Fetched provider JWKS from {}", jwks_uri);

        Ok(Self::from_key_set(keys, jwks_uri.clone()))
    }

    /// Wraps an already parsed key set.
    #[must_use]
    pub fn from_key_set(keys: KeySet, source: Url) -> Self {
        Self {
            keys: Arc::new(keys),
            source,
            fetched_at: OffsetDateTime::now_utc(),
        }
    }

    /// Looks up a key by `kid`.
    ///
    /// # Errors
    ///
    /// Returns `JwksError::KeyNotFound` if no key carries that identifier.
    pub fn get(&self, kid: &str) -> Result<&JsonWebKey, JwksError> {
        self.keys
            .find(kid)
            .ok_or_else(|| JwksError::KeyNotFound(kid.to_string()))
    }

    /// Returns the parsed key set.
    #[must_use]
    pub fn key_set(&self) -> &KeySet {
        &self.keys
    }

    /// Returns the URI the keys were fetched from.
    #[must_use]
    pub fn source(&self) -> &Url {
        &self.source
    }

    /// Returns when the keys were fetched.
    #[must_use]
    pub fn fetched_at(&self) -> OffsetDateTime {
        self.fetched_at
    }

    /// Builds a token verifier sharing these keys.
    #[must_use]
    pub fn verifier(&self) -> TokenVerifier {
        TokenVerifier::new(Arc::clone(&self.keys))
    }
}
