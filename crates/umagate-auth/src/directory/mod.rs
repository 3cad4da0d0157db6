//! Provider user directory.
//!
//! Local user administration is mirrored into the provider's SCIM directory
//! through [`DirectoryService`]. With UMA configured this is a
//! [`DirectoryClient`]; without it, a [`DisabledDirectory`] accepts every
//! call and does nothing.

pub mod client;
pub mod scim;

use async_trait::async_trait;

pub use client::DirectoryClient;
pub use scim::{ScimEmail, ScimMeta, ScimName, ScimUser, ScimUserExtension, SearchResult};

use crate::AuthResult;
use crate::identity::LocalUser;

/// Directory mutations triggered by local user administration.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    /// Returns `false` if calls are accepted but not forwarded anywhere.
    fn is_enabled(&self) -> bool;

    /// Looks up a directory user by username.
    ///
    /// # Errors
    ///
    /// Returns an error if authorization or the search fails.
    async fn find_user(&self, username: &str) -> AuthResult<Option<ScimUser>>;

    /// Creates a directory user for a local user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DuplicateUser` if the username or email is taken.
    async fn create_user(&self, password: Option<&str>, user: &LocalUser) -> AuthResult<()>;

    /// Replaces the directory user currently named `original_username`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::DuplicateUser` if a changed username or email is
    /// taken, and `AuthError::UserNotFound` if there is no such user.
    async fn update_user(
        &self,
        password: Option<&str>,
        original_username: &str,
        user: &LocalUser,
    ) -> AuthResult<()>;

    /// Deletes a directory user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if there is no such user.
    async fn delete_user(&self, username: &str) -> AuthResult<()>;
}

/// [`DirectoryService`] used when UMA is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledDirectory;

#[async_trait]
impl DirectoryService for DisabledDirectory {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn find_user(&self, _username: &str) -> AuthResult<Option<ScimUser>> {
        Ok(None)
    }

    async fn create_user(&self, _password: Option<&str>, user: &LocalUser) -> AuthResult<()> {
        tracing::debug!(username = %user.username, "Directory disabled, skipping create");
        Ok(())
    }

    async fn update_user(
        &self,
        _password: Option<&str>,
        original_username: &str,
        _user: &LocalUser,
    ) -> AuthResult<()> {
        tracing::debug!(username = original_username, "Directory disabled, skipping update");
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> AuthResult<()> {
        tracing::debug!(username, "Directory disabled, skipping delete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_directory_is_noop() {
        let directory = DisabledDirectory;
        let user = LocalUser::new("jdoe");

        assert!(!directory.is_enabled());
        assert!(directory.create_user(Some("pw"), &user).await.is_ok());
        assert!(directory.update_user(None, "old", &user).await.is_ok());
        assert!(directory.delete_user("jdoe").await.is_ok());
        assert!(directory.find_user("jdoe").await.unwrap().is_none());
    }
}
