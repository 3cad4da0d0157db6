//! Identity provider integration configuration.
//!
//! Both integrations are optional. Leaving `openid_config_uri` unset disables
//! token login; leaving `uma_config_uri` unset turns directory mutations into
//! no-ops.
//!
//! # Example (TOML)
//!
//! ```toml
//! [auth.provider]
//! openid_config_uri = "https://idp.example.com/.well-known/openid-configuration"
//! uma_config_uri = "https://idp.example.com/.well-known/uma-configuration"
//! scim_user_endpoint = "https://idp.example.com/identity/seam/resource/restv1/scim/v2/Users"
//! client_id = "@!1234"
//! client_secret = "change-me"
//! require_u2f = false
//!
//! [auth.http]
//! connect_timeout = "5s"
//! request_timeout = "30s"
//! handshake_timeout = "1m"
//!
//! [auth.cache]
//! ttl = "5m"
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration of the identity provider integration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Provider endpoints and client credentials.
    pub provider: ProviderSettings,

    /// Outbound HTTP limits.
    pub http: HttpConfig,

    /// Local user cache.
    pub cache: CacheConfig,
}

/// Provider endpoints and client credentials.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// OpenID discovery document. Unset disables token login.
    pub openid_config_uri: Option<Url>,

    /// UMA discovery document. Unset disables directory mutations.
    pub uma_config_uri: Option<Url>,

    /// SCIM user collection protected by UMA.
    pub scim_user_endpoint: Option<Url>,

    /// OAuth client identifier.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: String,

    /// Only accept identity tokens whose `acr` is `u2f`.
    pub require_u2f: bool,

    /// Whether to allow plain HTTP provider URLs (for testing only).
    pub allow_http: bool,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("openid_config_uri", &self.openid_config_uri)
            .field("uma_config_uri", &self.uma_config_uri)
            .field("scim_user_endpoint", &self.scim_user_endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("require_u2f", &self.require_u2f)
            .field("allow_http", &self.allow_http)
            .finish()
    }
}

impl ProviderSettings {
    /// Returns `true` if token login is configured.
    #[must_use]
    pub fn openid_enabled(&self) -> bool {
        self.openid_config_uri.is_some()
    }

    /// Returns `true` if UMA-gated directory access is configured.
    #[must_use]
    pub fn uma_enabled(&self) -> bool {
        self.uma_config_uri.is_some()
    }
}

/// Outbound HTTP limits applied to every provider call.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// TCP connect timeout.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Whole-request timeout for a single call.
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Deadline for a complete UMA handshake.
    #[serde(with = "humantime_serde")]
    pub handshake_timeout: Duration,

    /// Largest discovery or JWKS document accepted, in bytes.
    pub max_response_size: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(60),
            max_response_size: 1024 * 1024,
        }
    }
}

impl HttpConfig {
    /// Builds a stateless HTTP client honouring these limits.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
    }
}

/// Local user cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache users after a successful login.
    pub enabled: bool,

    /// How long a cached user is trusted before it is reloaded.
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(300),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a timeout is zero or a provider
    /// URL is not HTTPS while `allow_http` is off, and `ConfigError::Missing`
    /// if an enabled integration lacks client credentials or the SCIM user
    /// endpoint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let http = &self.http;
        if http.connect_timeout.is_zero()
            || http.request_timeout.is_zero()
            || http.handshake_timeout.is_zero()
        {
            return Err(ConfigError::InvalidValue(
                "http timeouts must be > 0".to_string(),
            ));
        }
        if http.max_response_size == 0 {
            return Err(ConfigError::InvalidValue(
                "http.max_response_size must be > 0".to_string(),
            ));
        }

        let provider = &self.provider;
        if provider.openid_enabled() || provider.uma_enabled() {
            if provider.client_id.is_empty() {
                return Err(ConfigError::Missing("provider.client_id".to_string()));
            }
            if provider.client_secret.is_empty() {
                return Err(ConfigError::Missing("provider.client_secret".to_string()));
            }
        }
        if provider.uma_enabled() && provider.scim_user_endpoint.is_none() {
            return Err(ConfigError::Missing(
                "provider.scim_user_endpoint".to_string(),
            ));
        }

        let urls = [
            ("provider.openid_config_uri", &provider.openid_config_uri),
            ("provider.uma_config_uri", &provider.uma_config_uri),
            ("provider.scim_user_endpoint", &provider.scim_user_endpoint),
        ];
        for (name, url) in urls {
            if let Some(url) = url {
                check_scheme(name, url, provider.allow_http)?;
            }
        }

        Ok(())
    }
}

/// Requires `https`, or `http` when explicitly allowed.
pub(crate) fn check_scheme(name: &str, url: &Url, allow_http: bool) -> Result<(), ConfigError> {
    match url.scheme() {
        "https" => Ok(()),
        "http" if allow_http => Ok(()),
        other => Err(ConfigError::InvalidValue(format!(
            "{name} must use https, got '{other}'"
        ))),
    }
}
