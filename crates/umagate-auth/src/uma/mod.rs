//! UMA authorization for directory access.
//!
//! # Overview
//!
//! Directory calls must bear an RPT authorized for the SCIM resource. It is
//! obtained with a fixed four-step handshake:
//!
//! ```text
//! Start ──AAT──▶ HaveAat ──RPT──▶ HaveBootstrapRpt ──ticket──▶ HaveTicket ──RPT──▶ HaveAuthorizedRpt
//! ```
//!
//! 1. Client-credentials grant at the token endpoint (scope `uma_authorization`)
//! 2. Bootstrap RPT from the RPT endpoint, bearing the AAT
//! 3. Permission ticket from the protected resource, bearing the bootstrap RPT
//! 4. Authorized RPT from the authorization endpoint, bearing the AAT and ticket
//!
//! Any failed step aborts the chain. There is no partial reuse and no RPT
//! caching: each directory operation runs a fresh handshake.

pub mod authorizer;
pub mod session;

use std::fmt;

pub use authorizer::UmaAuthorizer;
pub use session::UmaSession;

/// An RPT authorized for the protected resource.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizedRpt(String);

impl AuthorizedRpt {
    pub(crate) fn new(rpt: String) -> Self {
        Self(rpt)
    }

    /// Returns the token value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the token value.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for AuthorizedRpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthorizedRpt([REDACTED])")
    }
}
