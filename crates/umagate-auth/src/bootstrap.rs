//! Startup wiring.
//!
//! [`Gateway::initialize`] validates the configuration, resolves discovery
//! and the JWKS once, and builds the components every caller shares:
//!
//! - an [`IdentityAuthenticator`] when OpenID is configured
//! - a [`DirectoryClient`] when UMA is configured, [`DisabledDirectory`]
//!   otherwise
//!
//! Nothing here is refreshed afterwards. Picking up rotated keys or moved
//! endpoints means initializing a new gateway.

use std::sync::Arc;

use crate::AuthResult;
use crate::config::AuthConfig;
use crate::directory::{DirectoryClient, DirectoryService, DisabledDirectory};
use crate::error::AuthError;
use crate::federation::{
    DiscoveryClient, KeySetCache, OpenIdClient, ProviderConfig, ProviderConfigResolver,
};
use crate::identity::{InMemoryUserCache, IdentityAuthenticator, NullUserCache, UserCache, UserStore};
use crate::uma::{UmaAuthorizer, UmaSession};

/// The initialized provider integration.
pub struct Gateway {
    provider: ProviderConfig,
    keys: Option<KeySetCache>,
    authenticator: Option<Arc<IdentityAuthenticator>>,
    authorizer: Option<Arc<UmaAuthorizer>>,
    directory: Arc<dyn DirectoryService>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("provider", &self.provider)
            .field("authenticator", &self.authenticator)
            .field("authorizer", &self.authorizer)
            .field("directory_enabled", &self.directory.is_enabled())
            .finish()
    }
}

impl Gateway {
    /// Resolves the provider and builds the configured components.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the configuration is invalid,
    /// or if a configured discovery document or the JWKS cannot be fetched.
    pub async fn initialize(config: &AuthConfig, store: Arc<dyn UserStore>) -> AuthResult<Self> {
        config
            .validate()
            .map_err(|e| AuthError::configuration(e.to_string()))?;

        let settings = &config.provider;
        let discovery = DiscoveryClient::new(&config.http, settings.allow_http)?;
        let resolver = ProviderConfigResolver::new(discovery.clone(), settings.clone());
        let provider = resolver.resolve().await?;

        let mut keys = None;
        let mut authenticator = None;
        if let Some(openid) = &provider.openid {
            let key_set = KeySetCache::fetch(&discovery, &openid.jwks_uri).await?;
            let client = OpenIdClient::new(
                discovery.http_client().clone(),
                openid.clone(),
                &settings.client_id,
                &settings.client_secret,
            );
            let cache: Arc<dyn UserCache> = if config.cache.enabled {
                Arc::new(InMemoryUserCache::new(config.cache.ttl))
            } else {
                Arc::new(NullUserCache)
            };

            authenticator = Some(Arc::new(
                IdentityAuthenticator::new(key_set.verifier(), client, store, cache)
                    .with_require_u2f(settings.require_u2f),
            ));
            keys = Some(key_set);
        }

        let mut authorizer = None;
        let directory: Arc<dyn DirectoryService> = match (&provider.uma, &settings.scim_user_endpoint) {
            (Some(uma), Some(resource)) => {
                let session = UmaSession::new(&config.http)
                    .map_err(|e| AuthError::configuration(format!("UMA session: {e}")))?;
                let uma_authorizer = Arc::new(UmaAuthorizer::new(
                    session,
                    uma.clone(),
                    &settings.client_id,
                    &settings.client_secret,
                    resource.clone(),
                    config.http.handshake_timeout,
                ));
                authorizer = Some(Arc::clone(&uma_authorizer));
                Arc::new(DirectoryClient::new(
                    discovery.http_client().clone(),
                    uma_authorizer,
                ))
            }
            _ => Arc::new(DisabledDirectory),
        };

        tracing::info!(
            token_login = authenticator.is_some(),
            directory = directory.is_enabled(),
            "Identity provider integration initialized"
        );

        Ok(Self {
            provider,
            keys,
            authenticator,
            authorizer,
            directory,
        })
    }

    /// Returns the resolved endpoints.
    #[must_use]
    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// Returns the provider keys, when token login is configured.
    #[must_use]
    pub fn keys(&self) -> Option<&KeySetCache> {
        self.keys.as_ref()
    }

    /// Returns the authenticator, when token login is configured.
    #[must_use]
    pub fn authenticator(&self) -> Option<&Arc<IdentityAuthenticator>> {
        self.authenticator.as_ref()
    }

    /// Returns the UMA authorizer, when directory access is configured.
    #[must_use]
    pub fn authorizer(&self) -> Option<&Arc<UmaAuthorizer>> {
        self.authorizer.as_ref()
    }

    /// Returns the directory service.
    #[must_use]
    pub fn directory(&self) -> Arc<dyn DirectoryService> {
        Arc::clone(&self.directory)
    }
}
