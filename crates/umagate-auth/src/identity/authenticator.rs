//! Token login.
//!
//! # Flow
//!
//! 1. Verify the id token; with `require_u2f`, its `acr` must be `u2f`
//! 2. Fetch user info with the access token
//! 3. End the provider session (best-effort, failures are only logged)
//! 4. Require the user-info `sub` to equal the id token's `sub`
//! 5. Load the local user by the user-info `user_name`, cache first
//! 6. Pre-checks, then compare the stored password with `employee_number`
//! 7. Post-checks, then cache the user if it was loaded from the store
//!
//! Step 3 runs before the subject and credential checks, so the provider
//! session is ended even for a login that is then rejected.
//!
//! If step 6 fails against a cached user, the cache entry is dropped and
//! the user is reloaded from the store and checked once more.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::cache::UserCache;
use super::checks::{AccountStatusCheck, PostAuthenticationChecks, PreAuthenticationChecks};
use super::user::{LocalUser, UserStore};
use crate::AuthResult;
use crate::error::{AuthError, ProviderStep};
use crate::federation::{OpenIdClient, UserInfo};
use crate::token::{IdTokenClaims, TokenVerifier};

/// `acr` value of a second-factor login.
pub const U2F_ACR: &str = "u2f";

/// The token pair presented at login.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenCredentials {
    /// Compact id token.
    pub id_token: String,

    /// Access token for the user-info call.
    pub access_token: String,
}

impl fmt::Debug for TokenCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCredentials")
            .field("id_token", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// An authentication attempt.
#[derive(Debug, Clone)]
pub struct AuthenticationRequest {
    /// The presented tokens.
    pub credentials: TokenCredentials,

    /// Caller-supplied request details, passed through untouched.
    pub details: Option<Value>,
}

impl AuthenticationRequest {
    /// Creates a request without details.
    #[must_use]
    pub fn new(id_token: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            credentials: TokenCredentials {
                id_token: id_token.into(),
                access_token: access_token.into(),
            },
            details: None,
        }
    }

    /// Attaches request details.
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// A successful login.
///
/// `credentials` and `details` are the caller's originals, never rebuilt
/// from provider responses.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    /// The local user.
    pub principal: LocalUser,

    /// The presented tokens.
    pub credentials: TokenCredentials,

    /// The caller's request details.
    pub details: Option<Value>,

    /// Authorities granted to the principal.
    pub authorities: Vec<String>,

    /// The verified id token claims.
    pub claims: IdTokenClaims,

    /// The provider's user-info response.
    pub identity: UserInfo,
}

/// Turns a verified token pair into a local identity.
pub struct IdentityAuthenticator {
    verifier: TokenVerifier,
    client: OpenIdClient,
    store: Arc<dyn UserStore>,
    cache: Arc<dyn UserCache>,
    pre_checks: Arc<dyn AccountStatusCheck>,
    post_checks: Arc<dyn AccountStatusCheck>,
    require_u2f: bool,
}

impl fmt::Debug for IdentityAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityAuthenticator")
            .field("issuer", &self.client.configuration().issuer)
            .field("keys", &self.verifier.key_set().len())
            .field("require_u2f", &self.require_u2f)
            .finish_non_exhaustive()
    }
}

impl IdentityAuthenticator {
    /// Creates an authenticator with the default account status checks.
    #[must_use]
    pub fn new(
        verifier: TokenVerifier,
        client: OpenIdClient,
        store: Arc<dyn UserStore>,
        cache: Arc<dyn UserCache>,
    ) -> Self {
        Self {
            verifier,
            client,
            store,
            cache,
            pre_checks: Arc::new(PreAuthenticationChecks),
            post_checks: Arc::new(PostAuthenticationChecks),
            require_u2f: false,
        }
    }

    /// Only accept id tokens whose `acr` is `u2f`.
    #[must_use]
    pub fn with_require_u2f(mut self, require_u2f: bool) -> Self {
        self.require_u2f = require_u2f;
        self
    }

    /// Replaces the checks run before the credential comparison.
    #[must_use]
    pub fn with_pre_checks(mut self, checks: Arc<dyn AccountStatusCheck>) -> Self {
        self.pre_checks = checks;
        self
    }

    /// Replaces the checks run after the credential comparison.
    #[must_use]
    pub fn with_post_checks(mut self, checks: Arc<dyn AccountStatusCheck>) -> Self {
        self.post_checks = checks;
        self
    }

    /// Returns the OpenID client.
    #[must_use]
    pub fn client(&self) -> &OpenIdClient {
        &self.client
    }

    /// Authenticates a token pair.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidToken` if the id token does not verify
    /// - `AuthError::BadCredentials` for a wrong authentication method, a
    ///   subject mismatch, an unknown user or a credential mismatch
    /// - `AuthError::AccountStatus` if the local account is not usable
    /// - `AuthError::UpstreamUnavailable` / `ProtocolStep` if the user-info
    ///   call fails
    pub async fn authenticate(
        &self,
        request: AuthenticationRequest,
    ) -> AuthResult<AuthenticatedIdentity> {
        let AuthenticationRequest {
            credentials,
            details,
        } = request;

        let claims = self.verifier.verify(&credentials.id_token)?;
        if self.require_u2f && claims.acr.as_deref() != Some(U2F_ACR) {
            tracing::warn!(acr = ?claims.acr, "Rejected id token without second factor");
            return Err(AuthError::invalid_authentication_method());
        }

        let identity = self.client.fetch_userinfo(&credentials.access_token).await?;

        if let Err(e) = self.client.end_session(&credentials.id_token).await {
            tracing::warn!(error = %e, "Could not end provider session");
        }

        if identity.sub.is_none() || identity.sub != claims.sub {
            tracing::warn!("User info subject does not match id token subject");
            return Err(AuthError::token_subject_mismatch());
        }

        let username = identity
            .user_name
            .clone()
            .ok_or_else(AuthError::bad_credentials)?;
        let principal = self.resolve_user(&username, &identity).await?;

        tracing::info!(username = %principal.username, "User authenticated");

        Ok(AuthenticatedIdentity {
            authorities: principal.roles.clone(),
            principal,
            credentials,
            details,
            claims,
            identity,
        })
    }

    /// Exchanges an authorization code and authenticates the resulting
    /// tokens.
    ///
    /// # Errors
    ///
    /// Returns the code exchange error, `AuthError::ProtocolStep` if the
    /// token response has no id token, or any error from
    /// [`IdentityAuthenticator::authenticate`].
    pub async fn login_with_code(
        &self,
        code: &str,
        redirect_uri: &str,
        scope: &str,
    ) -> AuthResult<AuthenticatedIdentity> {
        let access = self.client.exchange_code(code, redirect_uri, scope).await?;
        let id_token = access.id_token.ok_or_else(|| {
            AuthError::protocol(ProviderStep::ExchangeCode, "token response has no id_token")
        })?;

        self.authenticate(AuthenticationRequest::new(id_token, access.access_token))
            .await
    }

    async fn resolve_user(&self, username: &str, identity: &UserInfo) -> AuthResult<LocalUser> {
        let (user, from_cache) = match self.cache.get(username) {
            Some(user) => (user, true),
            None => (self.load_user(username).await?, false),
        };

        let user = match self.check_user(&user, identity) {
            Ok(()) => user,
            Err(e) if from_cache => {
                tracing::debug!(username, error = %e, "Cached user rejected, reloading");
                self.cache.remove(username);
                let fresh = self.load_user(username).await?;
                self.check_user(&fresh, identity)?;
                return self.finish(fresh, false);
            }
            Err(e) => return Err(e),
        };

        self.finish(user, from_cache)
    }

    fn finish(&self, user: LocalUser, from_cache: bool) -> AuthResult<LocalUser> {
        self.post_checks.check(&user)?;
        if !from_cache {
            self.cache.put(user.clone());
        }
        Ok(user)
    }

    fn check_user(&self, user: &LocalUser, identity: &UserInfo) -> AuthResult<()> {
        self.pre_checks.check(user)?;
        match (user.password.as_deref(), identity.employee_number.as_deref()) {
            (Some(stored), Some(presented)) if stored == presented => Ok(()),
            _ => {
                tracing::debug!(username = %user.username, "Credential comparison failed");
                Err(AuthError::bad_credentials())
            }
        }
    }

    async fn load_user(&self, username: &str) -> AuthResult<LocalUser> {
        match self.store.find_by_username(username).await? {
            Some(user) => Ok(user),
            None => {
                tracing::debug!(username, "User not found in local store");
                Err(AuthError::bad_credentials())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::federation::OpenIdConfiguration;
    use crate::identity::{InMemoryUserCache, InMemoryUserStore, NullUserCache};
    use crate::token::KeySet;
    use std::time::Duration;
    use url::Url;

    fn openid_client() -> OpenIdClient {
        let base = Url::parse("https://idp.example.com/").unwrap();
        let config = OpenIdConfiguration {
            issuer: base.to_string(),
            authorization_endpoint: base.join("authorize").unwrap(),
            token_endpoint: base.join("token").unwrap(),
            userinfo_endpoint: base.join("userinfo").unwrap(),
            end_session_endpoint: base.join("end_session").unwrap(),
            jwks_uri: base.join("jwks").unwrap(),
            clientinfo_endpoint: None,
            validate_token_endpoint: None,
        };
        OpenIdClient::new(reqwest::Client::new(), config, "client", "secret")
    }

    fn authenticator(store: Arc<InMemoryUserStore>, cache: Arc<dyn UserCache>) -> IdentityAuthenticator {
        IdentityAuthenticator::new(
            TokenVerifier::new(Arc::new(KeySet::default())),
            openid_client(),
            store,
            cache,
        )
    }

    fn identity(secret: Option<&str>) -> UserInfo {
        UserInfo {
            user_name: Some("jdoe".to_string()),
            sub: Some("u1".to_string()),
            employee_number: secret.map(str::to_string),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_credential_comparison() {
        let store = Arc::new(InMemoryUserStore::from_users([
            LocalUser::builder("jdoe").password("pw").build(),
        ]));
        let auth = authenticator(store, Arc::new(NullUserCache));

        assert!(auth.resolve_user("jdoe", &identity(Some("pw"))).await.is_ok());

        for presented in [Some("other"), None] {
            let err = auth.resolve_user("jdoe", &identity(presented)).await.unwrap_err();
            assert!(matches!(err, AuthError::BadCredentials { .. }));
        }
    }

    #[tokio::test]
    async fn test_missing_stored_password() {
        let store = Arc::new(InMemoryUserStore::from_users([LocalUser::new("jdoe")]));
        let auth = authenticator(store, Arc::new(NullUserCache));
        let err = auth.resolve_user("jdoe", &identity(Some("pw"))).await.unwrap_err();
        assert_eq!(err.to_string(), "Bad credentials");
    }

    #[tokio::test]
    async fn test_unknown_user_is_bad_credentials() {
        let auth = authenticator(Arc::new(InMemoryUserStore::new()), Arc::new(NullUserCache));
        let err = auth.resolve_user("ghost", &identity(Some("pw"))).await.unwrap_err();
        assert!(matches!(err, AuthError::BadCredentials { .. }));
    }

    #[tokio::test]
    async fn test_stale_cache_is_reloaded() {
        let store = Arc::new(InMemoryUserStore::from_users([
            LocalUser::builder("jdoe").password("new").build(),
        ]));
        let cache = Arc::new(InMemoryUserCache::new(Duration::from_secs(60)));
        cache.put(LocalUser::builder("jdoe").password("old").build());

        let auth = authenticator(store, cache.clone());
        let user = auth.resolve_user("jdoe", &identity(Some("new"))).await.unwrap();
        assert_eq!(user.password.as_deref(), Some("new"));
        assert_eq!(cache.get("jdoe").unwrap().password.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_account_status_reported() {
        let store = Arc::new(InMemoryUserStore::from_users([
            LocalUser::builder("jdoe").password("pw").locked(true).build(),
        ]));
        let auth = authenticator(store, Arc::new(NullUserCache));
        let err = auth.resolve_user("jdoe", &identity(Some("pw"))).await.unwrap_err();
        assert_eq!(err.to_string(), "User account is locked");
    }

    #[test]
    fn test_credentials_debug_redacted() {
        let request = AuthenticationRequest::new("id.token.sig", "access");
        let debug = format!("{request:?}");
        assert!(!debug.contains("id.token.sig"));
    }
}
