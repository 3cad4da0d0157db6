//! Account status checks run around the credential comparison.

use super::user::LocalUser;
use crate::AuthResult;
use crate::error::{AccountStatus, AuthError};

/// A pass/fail gate on a local account.
pub trait AccountStatusCheck: Send + Sync {
    /// Rejects accounts that must not log in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccountStatus` naming the reason.
    fn check(&self, user: &LocalUser) -> AuthResult<()>;
}

/// Runs before the credential comparison: locked, disabled, expired.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreAuthenticationChecks;

impl AccountStatusCheck for PreAuthenticationChecks {
    fn check(&self, user: &LocalUser) -> AuthResult<()> {
        if user.locked {
            tracing::debug!(username = %user.username, "User account is locked");
            return Err(AuthError::AccountStatus(AccountStatus::Locked));
        }
        if !user.enabled {
            tracing::debug!(username = %user.username, "User account is disabled");
            return Err(AuthError::AccountStatus(AccountStatus::Disabled));
        }
        if user.expired {
            tracing::debug!(username = %user.username, "User account is expired");
            return Err(AuthError::AccountStatus(AccountStatus::Expired));
        }
        Ok(())
    }
}

/// Runs after the credential comparison: credentials expired.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostAuthenticationChecks;

impl AccountStatusCheck for PostAuthenticationChecks {
    fn check(&self, user: &LocalUser) -> AuthResult<()> {
        if user.credentials_expired {
            tracing::debug!(username = %user.username, "User account credentials have expired");
            return Err(AuthError::AccountStatus(AccountStatus::CredentialsExpired));
        }
        Ok(())
    }
}
