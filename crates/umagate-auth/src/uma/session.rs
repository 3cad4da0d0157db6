//! Cookie-bound HTTP context for the UMA handshake.
//!
//! The authorization server correlates the permission ticket with the
//! session that requested it, so all four handshake calls must go through
//! the same cookie jar. A [`UmaSession`] owns that jar. It is not `Clone`:
//! sharing it between concurrent handshakes would interleave their cookies.

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::AuthResult;
use crate::config::HttpConfig;
use crate::error::{AuthError, ProviderStep};
use crate::federation::client::status_error;

/// Scope requested for the AAT.
pub const AAT_SCOPE: &str = "uma_authorization";

/// Scope sent with RPT requests.
pub const RPT_SCOPE: &str = "scim_access";

const SCOPE_HEADER: HeaderName = HeaderName::from_static("scope");

#[derive(Deserialize)]
struct AatResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Deserialize)]
struct RptResponse {
    #[serde(default)]
    rpt: Option<String>,
}

#[derive(Deserialize)]
struct TicketResponse {
    #[serde(default)]
    ticket: Option<String>,
}

/// HTTP client with a persistent cookie store.
#[derive(Debug)]
pub struct UmaSession {
    http_client: reqwest::Client,
}

impl UmaSession {
    /// Creates a session with an empty cookie jar.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(http: &HttpConfig) -> reqwest::Result<Self> {
        let http_client = reqwest::Client::builder()
            .cookie_store(true)
            .connect_timeout(http.connect_timeout)
            .timeout(http.request_timeout)
            .build()?;

        Ok(Self { http_client })
    }

    /// Step 1: client-credentials grant for the AAT.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ProtocolStep` on a non-2xx status or a body
    /// without `access_token`.
    pub async fn request_aat(
        &self,
        token_endpoint: &Url,
        client_id: &str,
        client_secret: &str,
    ) -> AuthResult<String> {
        let step = ProviderStep::RequestAat;
        let request = self
            .http_client
            .post(token_endpoint.as_str())
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", AAT_SCOPE)]);

        let response: AatResponse = self.send(step, request).await?;
        tracing::debug!(
            token_type = response.token_type.as_deref().unwrap_or_default(),
            expires_in = response.expires_in,
            "Received AAT"
        );
        required(step, "access_token", response.access_token)
    }

    /// Step 2: bootstrap RPT, bearing the AAT.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ProtocolStep` on a non-2xx status or a body
    /// without `rpt`.
    pub async fn request_bootstrap_rpt(&self, rpt_endpoint: &Url, aat: &str) -> AuthResult<String> {
        let step = ProviderStep::RequestBootstrapRpt;
        let request = self
            .http_client
            .post(rpt_endpoint.as_str())
            .bearer_auth(aat)
            .header(SCOPE_HEADER, HeaderValue::from_static(RPT_SCOPE))
            .header(CONTENT_TYPE, "application/json");

        let response: RptResponse = self.send(step, request).await?;
        required(step, "rpt", response.rpt)
    }

    /// Step 3: call the protected resource with the bootstrap RPT; the
    /// resource server answers with a permission ticket.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ProtocolStep` on a non-2xx status or a body
    /// without `ticket`.
    pub async fn request_ticket(&self, resource: &Url, bootstrap_rpt: &str) -> AuthResult<String> {
        let step = ProviderStep::RequestPermissionTicket;
        let request = self
            .http_client
            .get(resource.as_str())
            .bearer_auth(bootstrap_rpt)
            .header(CONTENT_TYPE, "application/json");

        let response: TicketResponse = self.send(step, request).await?;
        required(step, "ticket", response.ticket)
    }

    /// Step 4: exchange the ticket for the authorized RPT, bearing the AAT.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ProtocolStep` on a non-2xx status or a body
    /// without `rpt`.
    pub async fn request_authorized_rpt(
        &self,
        authorization_endpoint: &Url,
        aat: &str,
        ticket: &str,
    ) -> AuthResult<String> {
        let step = ProviderStep::RequestAuthorizedRpt;
        let request = self
            .http_client
            .post(authorization_endpoint.as_str())
            .bearer_auth(aat)
            .header(SCOPE_HEADER, HeaderValue::from_static(RPT_SCOPE))
            .json(&serde_json::json!({ "ticket": ticket }));

        let response: RptResponse = self.send(step, request).await?;
        required(step, "rpt", response.rpt)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        step: ProviderStep,
        request: RequestBuilder,
    ) -> AuthResult<T> {
        let request = request
            .header(ACCEPT, "application/json")
            .build()
            .map_err(|e| AuthError::protocol(step, e.to_string()))?;
        let method: Method = request.method().clone();
        let url = request.url().clone();

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| AuthError::from_transport(step, &e))?;

        let status = response.status();
        tracing::debug!(%status, "{} {}", method, url);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(step, status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AuthError::protocol(step, format!("unreadable response: {e}")))
    }
}

fn required(step: ProviderStep, field: &str, value: Option<String>) -> AuthResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::protocol(step, format!("response has no '{field}'")))
}
