//! Single-flight UMA handshake.

use std::fmt;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, timeout_at};
use url::Url;

use super::AuthorizedRpt;
use super::session::UmaSession;
use crate::AuthResult;
use crate::error::{AuthError, ProviderStep};
use crate::federation::UmaConfiguration;

/// Progress of one handshake. Each state holds only what the next step
/// needs; values are dropped as soon as they are consumed.
enum Handshake {
    Start,
    HaveAat { aat: String },
    HaveBootstrapRpt { aat: String, rpt: String },
    HaveTicket { aat: String, ticket: String },
    HaveAuthorizedRpt(AuthorizedRpt),
}

impl Handshake {
    fn next_step(&self) -> Option<ProviderStep> {
        match self {
            Self::Start => Some(ProviderStep::RequestAat),
            Self::HaveAat { .. } => Some(ProviderStep::RequestBootstrapRpt),
            Self::HaveBootstrapRpt { .. } => Some(ProviderStep::RequestPermissionTicket),
            Self::HaveTicket { .. } => Some(ProviderStep::RequestAuthorizedRpt),
            Self::HaveAuthorizedRpt(_) => None,
        }
    }
}

/// Obtains authorized RPTs for the directory resource.
///
/// Every call runs the full AAT → bootstrap RPT → ticket → authorized RPT
/// chain. Calls on one authorizer are serialized: a second caller waits for
/// the session lock and never interleaves with a handshake in flight.
pub struct UmaAuthorizer {
    session: Mutex<UmaSession>,
    config: UmaConfiguration,
    client_id: String,
    client_secret: String,
    resource: Url,
    handshake_timeout: Duration,
}

impl fmt::Debug for UmaAuthorizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UmaAuthorizer")
            .field("issuer", &self.config.issuer)
            .field("client_id", &self.client_id)
            .field("resource", &self.resource)
            .field("handshake_timeout", &self.handshake_timeout)
            .finish_non_exhaustive()
    }
}

impl UmaAuthorizer {
    /// Creates an authorizer for the protected `resource`.
    #[must_use]
    pub fn new(
        session: UmaSession,
        config: UmaConfiguration,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        resource: Url,
        handshake_timeout: Duration,
    ) -> Self {
        Self {
            session: Mutex::new(session),
            config,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            resource,
            handshake_timeout,
        }
    }

    /// Returns the protected resource endpoint.
    #[must_use]
    pub fn resource(&self) -> &Url {
        &self.resource
    }

    /// Runs a handshake with the configured deadline.
    ///
    /// # Errors
    ///
    /// See [`UmaAuthorizer::authorize_until`].
    pub async fn authorize(&self) -> AuthResult<AuthorizedRpt> {
        self.authorize_until(Instant::now() + self.handshake_timeout)
            .await
    }

    /// Runs a handshake that must finish before `deadline`.
    ///
    /// Time spent waiting for the session lock counts against the deadline.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error; later steps are not
    /// attempted. Returns `AuthError::DeadlineExceeded` if the deadline
    /// passes while waiting for the lock or for a provider response.
    pub async fn authorize_until(&self, deadline: Instant) -> AuthResult<AuthorizedRpt> {
        let session = timeout_at(deadline, self.session.lock())
            .await
            .map_err(|_| AuthError::deadline_exceeded("waiting for UMA session"))?;

        let mut state = Handshake::Start;
        while let Some(step) = state.next_step() {
            tracing::debug!(%step, "UMA handshake step");

            state = timeout_at(deadline, self.advance(&session, state))
                .await
                .map_err(|_| AuthError::deadline_exceeded(step.to_string()))?
                .inspect_err(|e| tracing::warn!(%step, error = %e, "UMA handshake aborted"))?;
        }

        match state {
            Handshake::HaveAuthorizedRpt(rpt) => Ok(rpt),
            _ => Err(AuthError::protocol(
                ProviderStep::RequestAuthorizedRpt,
                "handshake ended without an RPT",
            )),
        }
    }

    async fn advance(&self, session: &UmaSession, state: Handshake) -> AuthResult<Handshake> {
        Ok(match state {
            Handshake::Start => {
                let aat = session
                    .request_aat(&self.config.token_endpoint, &self.client_id, &self.client_secret)
                    .await?;
                Handshake::HaveAat { aat }
            }
            Handshake::HaveAat { aat } => {
                let rpt = session
                    .request_bootstrap_rpt(&self.config.rpt_endpoint, &aat)
                    .await?;
                Handshake::HaveBootstrapRpt { aat, rpt }
            }
            Handshake::HaveBootstrapRpt { aat, rpt } => {
                let ticket = session.request_ticket(&self.resource, &rpt).await?;
                Handshake::HaveTicket { aat, ticket }
            }
            Handshake::HaveTicket { aat, ticket } => {
                let rpt = session
                    .request_authorized_rpt(&self.config.authorization_endpoint, &aat, &ticket)
                    .await?;
                Handshake::HaveAuthorizedRpt(AuthorizedRpt::new(rpt))
            }
            done @ Handshake::HaveAuthorizedRpt(_) => done,
        })
    }
}
