//! OpenID provider calls made on behalf of a logging-in user.
//!
//! - [`OpenIdClient::exchange_code`] - authorization code → [`AccessInfo`]
//! - [`OpenIdClient::fetch_userinfo`] - access token → [`UserInfo`]
//! - [`OpenIdClient::end_session`] - invalidates the provider session

use std::fmt;

use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use url::Url;

use super::metadata::OpenIdConfiguration;
use crate::AuthResult;
use crate::error::{AuthError, ProviderStep};

/// Tokens returned by the authorization code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessInfo {
    /// The access token, used for the user-info call.
    pub access_token: String,

    /// The token type (usually "Bearer").
    #[serde(default)]
    pub token_type: String,

    /// Token expiration in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    /// Optional refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Granted scopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// The ID token (compact JWS).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// User-info response.
///
/// `employee_number` carries the shared secret compared against the local
/// user's stored password, so it is redacted from `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Login name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Directory identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Subject identifier, must equal the id token's `sub`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Shared secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_number: Option<String>,

    /// Employee type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee_type: Option<String>,
}

impl fmt::Debug for UserInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserInfo")
            .field("user_name", &self.user_name)
            .field("name", &self.name)
            .field("id", &self.id)
            .field("sub", &self.sub)
            .field("email", &self.email)
            .field(
                "employee_number",
                &self.employee_number.as_ref().map(|_| "[REDACTED]"),
            )
            .field("employee_type", &self.employee_type)
            .finish()
    }
}

/// OAuth error response body.
#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Client for the OpenID endpoints used during login.
#[derive(Debug, Clone)]
pub struct OpenIdClient {
    http_client: reqwest::Client,
    config: OpenIdConfiguration,
    client_id: String,
    client_secret: String,
}

impl OpenIdClient {
    /// Creates a client for the resolved OpenID configuration.
    #[must_use]
    pub fn new(
        http_client: reqwest::Client,
        config: OpenIdConfiguration,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            config,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Returns the OpenID configuration.
    #[must_use]
    pub fn configuration(&self) -> &OpenIdConfiguration {
        &self.config
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ProtocolStep` if the token endpoint rejects the
    /// code or answers with an unusable body, and
    /// `AuthError::UpstreamUnavailable` on transport failure or 5xx.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        scope: &str,
    ) -> AuthResult<AccessInfo> {
        let step = ProviderStep::ExchangeCode;
        let endpoint = &self.config.token_endpoint;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("scope", scope),
        ];

        tracing::debug!("Exchanging authorization code with token endpoint: {}", endpoint);

        let response = self
            .http_client
            .post(endpoint.as_str())
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| AuthError::from_transport(step, &e))?;

        let status = response.status();
        tracing::debug!(%status, "POST {}", endpoint);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(step, status, &body));
        }

        response
            .json::<AccessInfo>()
            .await
            .map_err(|e| AuthError::protocol(step, format!("Failed to parse token response: {e}")))
    }

    /// Fetches the user-info document for an access token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::BadCredentials` if the provider refuses the
    /// token (401/403), `AuthError::UpstreamUnavailable` on transport
    /// failure or 5xx, and `AuthError::ProtocolStep` otherwise.
    pub async fn fetch_userinfo(&self, access_token: &str) -> AuthResult<UserInfo> {
        let step = ProviderStep::FetchUserInfo;
        let mut url = self.config.userinfo_endpoint.clone();
        url.query_pairs_mut().append_pair("access_token", access_token);

        let response = self
            .http_client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| AuthError::from_transport(step, &e))?;

        let status = response.status();
        tracing::debug!(%status, "GET {}", self.config.userinfo_endpoint);

        if status != StatusCode::OK {
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                tracing::warn!(%status, "User info request refused");
                return Err(AuthError::bad_credentials());
            }
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(step, status, &body));
        }

        response.json::<UserInfo>().await.map_err(|e| {
            AuthError::protocol(step, format!("Failed to parse userinfo response: {e}"))
        })
    }

    /// Invalidates the provider session bound to `id_token`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-2xx status. Callers in
    /// the login path log and ignore it.
    pub async fn end_session(&self, id_token: &str) -> AuthResult<()> {
        let step = ProviderStep::EndSession;
        let mut url: Url = self.config.end_session_endpoint.clone();
        url.query_pairs_mut().append_pair("id_token_hint", id_token);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| AuthError::from_transport(step, &e))?;

        let status = response.status();
        tracing::debug!(%status, "GET {}", self.config.end_session_endpoint);

        if !status.is_success() {
            return Err(status_error(step, status, ""));
        }
        Ok(())
    }
}

/// Classifies a non-success response.
///
/// 5xx means the provider is unavailable. Anything else is a failure of the
/// step, described by the OAuth error body when there is one.
pub(crate) fn status_error(step: ProviderStep, status: StatusCode, body: &str) -> AuthError {
    if status.is_server_error() {
        return AuthError::upstream(format!("{step}: HTTP {status}"));
    }

    match serde_json::from_str::<OAuthErrorResponse>(body) {
        Ok(oauth) => match oauth.error_description {
            Some(description) if !description.is_empty() => {
                AuthError::protocol(step, format!("{}: {description}", oauth.error))
            }
            _ => AuthError::protocol(step, oauth.error),
        },
        Err(_) => AuthError::protocol(step, format!("HTTP {status}")),
    }
}
