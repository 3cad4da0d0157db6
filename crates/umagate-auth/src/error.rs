//! Authentication and authorization error types.
//!
//! Every component reports failures through [`AuthError`]. Component-local
//! errors ([`DiscoveryError`], [`JwksError`], [`TokenError`]) carry more detail
//! and are reclassified here before they cross a public boundary, so callers
//! only ever see the taxonomy below.
//!
//! Credential failures share a generic message, so a caller cannot tell
//! whether the subject check or the stored credential comparison rejected a
//! login. Account status failures carry a specific reason.

use std::fmt;

use crate::federation::discovery::DiscoveryError;
use crate::federation::jwks::JwksError;
use crate::token::TokenError;

/// Message surfaced for every token verification failure.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid authentication token";

/// Errors that can occur while authenticating users or authorizing
/// directory operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Startup configuration is missing, malformed or unreachable.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },

    /// An identity token failed parsing or signature verification.
    ///
    /// The underlying cause is logged, never surfaced.
    #[error("Invalid authentication token")]
    InvalidToken,

    /// A provider exchange failed or answered with an unusable body.
    #[error("{step} failed: {message}")]
    ProtocolStep {
        /// The step that failed.
        step: ProviderStep,
        /// Description of the failure.
        message: String,
    },

    /// The supplied credentials were rejected.
    #[error("{message}")]
    BadCredentials {
        /// Non-specific reason shown to the caller.
        message: String,
    },

    /// The local account is not in a usable state.
    #[error("{0}")]
    AccountStatus(AccountStatus),

    /// The identity provider could not be reached or did not answer in time.
    #[error("Identity provider unavailable: {message}")]
    UpstreamUnavailable {
        /// Description of the transport failure.
        message: String,
    },

    /// The caller-supplied deadline elapsed before the operation finished.
    #[error("Deadline exceeded during {operation}")]
    DeadlineExceeded {
        /// The operation that was in flight.
        operation: String,
    },

    /// A directory user with the same unique attribute already exists.
    #[error("User with {field} {value} already exists.")]
    DuplicateUser {
        /// The attribute that collided (`username` or `email`).
        field: &'static str,
        /// The colliding value.
        value: String,
    },

    /// The directory has no user with the given username.
    #[error("Directory user not found: {username}")]
    UserNotFound {
        /// The username that was looked up.
        username: String,
    },

    /// The local user store failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },
}

/// Outbound exchanges with the identity provider, used to attribute failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStep {
    /// Client-credentials grant for the AAT.
    RequestAat,
    /// Bootstrap RPT request bearing the AAT.
    RequestBootstrapRpt,
    /// Protected resource call that issues the permission ticket.
    RequestPermissionTicket,
    /// Ticket exchange for the authorized RPT.
    RequestAuthorizedRpt,
    /// Authorization code exchange at the token endpoint.
    ExchangeCode,
    /// User-info lookup.
    FetchUserInfo,
    /// Identity provider session termination.
    EndSession,
    /// Directory search.
    DirectorySearch,
    /// Directory create, update or delete.
    DirectoryWrite,
}

impl fmt::Display for ProviderStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestAat => write!(f, "AAT request"),
            Self::RequestBootstrapRpt => write!(f, "bootstrap RPT request"),
            Self::RequestPermissionTicket => write!(f, "permission ticket request"),
            Self::RequestAuthorizedRpt => write!(f, "authorized RPT request"),
            Self::ExchangeCode => write!(f, "authorization code exchange"),
            Self::FetchUserInfo => write!(f, "user info request"),
            Self::EndSession => write!(f, "end session"),
            Self::DirectorySearch => write!(f, "directory search"),
            Self::DirectoryWrite => write!(f, "directory write"),
        }
    }
}

/// Reasons a local account may be refused regardless of its credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    /// The account is locked.
    Locked,
    /// The account is disabled.
    Disabled,
    /// The account has expired.
    Expired,
    /// The account credentials have expired.
    CredentialsExpired,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Locked => write!(f, "User account is locked"),
            Self::Disabled => write!(f, "User is disabled"),
            Self::Expired => write!(f, "User account has expired"),
            Self::CredentialsExpired => write!(f, "User credentials have expired"),
        }
    }
}

impl AuthError {
    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `ProtocolStep` error.
    #[must_use]
    pub fn protocol(step: ProviderStep, message: impl Into<String>) -> Self {
        Self::ProtocolStep {
            step,
            message: message.into(),
        }
    }

    /// Creates the generic `BadCredentials` error.
    #[must_use]
    pub fn bad_credentials() -> Self {
        Self::BadCredentials {
            message: "Bad credentials".to_string(),
        }
    }

    /// Rejection for an identity token issued with the wrong
    /// authentication method.
    #[must_use]
    pub fn invalid_authentication_method() -> Self {
        Self::BadCredentials {
            message: "Invalid authentication method".to_string(),
        }
    }

    /// Rejection for an id token and access token that belong to
    /// different subjects.
    #[must_use]
    pub fn token_subject_mismatch() -> Self {
        Self::BadCredentials {
            message: "Invalid authentication tokens".to_string(),
        }
    }

    /// Creates a new `UpstreamUnavailable` error.
    #[must_use]
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            message: message.into(),
        }
    }

    /// Creates a new `DeadlineExceeded` error.
    #[must_use]
    pub fn deadline_exceeded(operation: impl Into<String>) -> Self {
        Self::DeadlineExceeded {
            operation: operation.into(),
        }
    }

    /// Creates a new `DuplicateUser` error.
    #[must_use]
    pub fn duplicate_user(field: &'static str, value: impl Into<String>) -> Self {
        Self::DuplicateUser {
            field,
            value: value.into(),
        }
    }

    /// Creates a new `UserNotFound` error.
    #[must_use]
    pub fn user_not_found(username: impl Into<String>) -> Self {
        Self::UserNotFound {
            username: username.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Classifies a transport failure against the provider.
    ///
    /// Timeouts and connection failures are `UpstreamUnavailable`; anything
    /// else is attributed to the protocol step in flight.
    #[must_use]
    pub fn from_transport(step: ProviderStep, err: &reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() {
            Self::upstream(format!("{step}: {err}"))
        } else {
            Self::protocol(step, err.to_string())
        }
    }

    /// Returns `true` if the caller presented credentials that were refused.
    #[must_use]
    pub fn is_credential_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidToken | Self::BadCredentials { .. } | Self::AccountStatus(_)
        )
    }

    /// Returns `true` if retrying later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. } | Self::DeadlineExceeded { .. }
        )
    }

    /// Returns `true` if this is a startup configuration error.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns the category of this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::InvalidToken | Self::BadCredentials { .. } => ErrorCategory::Authentication,
            Self::AccountStatus(_) => ErrorCategory::AccountStatus,
            Self::ProtocolStep { .. } => ErrorCategory::Protocol,
            Self::UpstreamUnavailable { .. } | Self::DeadlineExceeded { .. } => {
                ErrorCategory::Unavailable
            }
            Self::DuplicateUser { .. } | Self::UserNotFound { .. } => ErrorCategory::Directory,
            Self::Storage { .. } => ErrorCategory::Internal,
        }
    }
}

/// Broad error categories, used for logging and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Startup configuration errors.
    Configuration,
    /// Rejected tokens or credentials.
    Authentication,
    /// Account state errors.
    AccountStatus,
    /// Provider exchange errors.
    Protocol,
    /// Provider unreachable or too slow.
    Unavailable,
    /// Directory data conflicts.
    Directory,
    /// Internal errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Authentication => write!(f, "authentication"),
            Self::AccountStatus => write!(f, "account_status"),
            Self::Protocol => write!(f, "protocol"),
            Self::Unavailable => write!(f, "unavailable"),
            Self::Directory => write!(f, "directory"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

// Discovery and JWKS are only fetched at startup, where any failure,
// unreachable provider included, is fatal.
impl From<DiscoveryError> for AuthError {
    fn from(err: DiscoveryError) -> Self {
        Self::configuration(format!("provider discovery: {err}"))
    }
}

impl From<JwksError> for AuthError {
    fn from(err: JwksError) -> Self {
        Self::configuration(format!("provider JWKS: {err}"))
    }
}

impl From<TokenError> for AuthError {
    fn from(_: TokenError) -> Self {
        Self::InvalidToken
    }
}
