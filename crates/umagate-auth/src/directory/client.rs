//! SCIM user directory behind UMA.
//!
//! Each operation runs one UMA handshake and uses the resulting RPT for all
//! of its calls: duplicate checks, the id lookup and the write itself.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response};
use url::Url;

use super::DirectoryService;
use super::scim::{ScimUser, SearchResult};
use crate::AuthResult;
use crate::error::{AuthError, ProviderStep};
use crate::federation::client::status_error;
use crate::identity::LocalUser;
use crate::uma::{AuthorizedRpt, UmaAuthorizer};

/// Directory client for the SCIM user endpoint.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    http_client: reqwest::Client,
    authorizer: Arc<UmaAuthorizer>,
    endpoint: Url,
}

impl DirectoryClient {
    /// Creates a client for the authorizer's protected resource.
    #[must_use]
    pub fn new(http_client: reqwest::Client, authorizer: Arc<UmaAuthorizer>) -> Self {
        let endpoint = authorizer.resource().clone();
        Self {
            http_client,
            authorizer,
            endpoint,
        }
    }

    /// Returns the SCIM user endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn search(
        &self,
        rpt: &AuthorizedRpt,
        attribute: &str,
        value: &str,
        count: Option<u32>,
    ) -> AuthResult<SearchResult> {
        let step = ProviderStep::DirectorySearch;
        let mut url = self.endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            if let Some(count) = count {
                query.append_pair("count", &count.to_string());
            }
            query.append_pair("filter", &filter_eq(attribute, value));
        }

        let request = self.http_client.get(url).bearer_auth(rpt.as_str());
        let response = self.send(step, request).await?;
        response
            .json::<SearchResult>()
            .await
            .map_err(|e| AuthError::protocol(step, format!("unreadable search result: {e}")))
    }

    async fn username_exists(&self, rpt: &AuthorizedRpt, username: &str) -> AuthResult<bool> {
        Ok(self.search(rpt, "username", username, None).await?.total_results > 0)
    }

    async fn email_exists(&self, rpt: &AuthorizedRpt, email: &str) -> AuthResult<bool> {
        Ok(self.search(rpt, "mail", email, None).await?.total_results > 0)
    }

    async fn lookup(&self, rpt: &AuthorizedRpt, username: &str) -> AuthResult<Option<ScimUser>> {
        let result = self.search(rpt, "username", username, Some(1)).await?;
        Ok(result.resources.into_iter().next())
    }

    async fn require_user(&self, rpt: &AuthorizedRpt, username: &str) -> AuthResult<(String, ScimUser)> {
        let user = self
            .lookup(rpt, username)
            .await?
            .ok_or_else(|| AuthError::user_not_found(username))?;
        let id = user.id.clone().ok_or_else(|| {
            AuthError::protocol(ProviderStep::DirectorySearch, "directory user has no id")
        })?;
        Ok((id, user))
    }

    fn user_url(&self, id: &str) -> AuthResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                AuthError::configuration(format!("{} cannot be a base URL", self.endpoint))
            })?
            .pop_if_empty()
            .push(id);
        Ok(url)
    }

    async fn check_unique_email(&self, rpt: &AuthorizedRpt, email: Option<&str>) -> AuthResult<()> {
        if let Some(email) = email
            && self.email_exists(rpt, email).await?
        {
            return Err(AuthError::duplicate_user("email", email));
        }
        Ok(())
    }

    async fn send(&self, step: ProviderStep, request: RequestBuilder) -> AuthResult<Response> {
        let request = request
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .build()
            .map_err(|e| AuthError::protocol(step, e.to_string()))?;
        let method = request.method().clone();
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
        Ok(response)
    }
}

#[async_trait]
impl DirectoryService for DirectoryClient {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn find_user(&self, username: &str) -> AuthResult<Option<ScimUser>> {
        let rpt = self.authorizer.authorize().await?;
        self.lookup(&rpt, username).await
    }

    async fn create_user(&self, password: Option<&str>, user: &LocalUser) -> AuthResult<()> {
        let document = ScimUser::from_local_user(password, user);
        let rpt = self.authorizer.authorize().await?;

        if self.username_exists(&rpt, &user.username).await? {
            return Err(AuthError::duplicate_user("username", &user.username));
        }
        self.check_unique_email(&rpt, user.email.as_deref()).await?;

        let request = self
            .http_client
            .post(self.endpoint.as_str())
            .bearer_auth(rpt.as_str())
            .json(&document);
        self.send(ProviderStep::DirectoryWrite, request).await?;

        tracing::info!(username = %user.username, "Created directory user");
        Ok(())
    }

    async fn update_user(
        &self,
        password: Option<&str>,
        original_username: &str,
        user: &LocalUser,
    ) -> AuthResult<()> {
        let document = ScimUser::from_local_user(password, user);
        let rpt = self.authorizer.authorize().await?;

        if original_username != user.username && self.username_exists(&rpt, &user.username).await? {
            return Err(AuthError::duplicate_user("username", &user.username));
        }

        let (id, existing) = self.require_user(&rpt, original_username).await?;
        if existing.first_email() != user.email.as_deref() {
            self.check_unique_email(&rpt, user.email.as_deref()).await?;
        }

        let request = self
            .http_client
            .put(self.user_url(&id)?)
            .bearer_auth(rpt.as_str())
            .json(&document);
        self.send(ProviderStep::DirectoryWrite, request).await?;

        tracing::info!(username = %user.username, "Updated directory user");
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> AuthResult<()> {
        let rpt = self.authorizer.authorize().await?;
        let (id, _) = self.require_user(&rpt, username).await?;

        let request = self
            .http_client
            .delete(self.user_url(&id)?)
            .bearer_auth(rpt.as_str());
        self.send(ProviderStep::DirectoryWrite, request).await?;

        tracing::info!(username, "Deleted directory user");
        Ok(())
    }
}

/// Builds `attribute eq "value"`, escaping the value per SCIM string rules.
fn filter_eq(attribute: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("{attribute} eq \"{escaped}\"")
}
