//! Local user records and their store.
//!
//! The identity provider proves who the user is; the local store decides
//! what they may do. A provider login only succeeds for users that also
//! exist locally, with a stored password equal to the provider's shared
//! secret.

use std::fmt;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::AuthResult;

/// A locally stored user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUser {
    /// Username, unique in the local store and the directory.
    pub username: String,

    /// Stored credential, compared against the provider's shared secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Given name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    /// Family name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    /// Granted authorities.
    #[serde(default)]
    pub roles: Vec<String>,

    /// Whether the account is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether the account is locked.
    #[serde(default)]
    pub locked: bool,

    /// Whether the account has expired.
    #[serde(default)]
    pub expired: bool,

    /// Whether the credentials have expired.
    #[serde(default)]
    pub credentials_expired: bool,
}

fn default_true() -> bool {
    true
}

impl fmt::Debug for LocalUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalUser")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("email", &self.email)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("roles", &self.roles)
            .field("enabled", &self.enabled)
            .field("locked", &self.locked)
            .field("expired", &self.expired)
            .field("credentials_expired", &self.credentials_expired)
            .finish()
    }
}

impl LocalUser {
    /// Creates an enabled user with no password.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
            email: None,
            first_name: None,
            last_name: None,
            roles: Vec::new(),
            enabled: true,
            locked: false,
            expired: false,
            credentials_expired: false,
        }
    }

    /// Creates a new user builder.
    #[must_use]
    pub fn builder(username: impl Into<String>) -> LocalUserBuilder {
        LocalUserBuilder {
            user: Self::new(username),
        }
    }

    /// Returns "first last", skipping missing parts.
    #[must_use]
    pub fn display_name(&self) -> String {
        [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Builder for [`LocalUser`].
#[derive(Debug)]
pub struct LocalUserBuilder {
    user: LocalUser,
}

impl LocalUserBuilder {
    /// Sets the stored password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.user.password = Some(password.into());
        self
    }

    /// Sets the email address.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.user.email = Some(email.into());
        self
    }

    /// Sets given and family name.
    #[must_use]
    pub fn name(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.user.first_name = Some(first.into());
        self.user.last_name = Some(last.into());
        self
    }

    /// Adds a role.
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.user.roles.push(role.into());
        self
    }

    /// Sets whether the account is enabled.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.user.enabled = enabled;
        self
    }

    /// Sets whether the account is locked.
    #[must_use]
    pub fn locked(mut self, locked: bool) -> Self {
        self.user.locked = locked;
        self
    }

    /// Sets whether the account has expired.
    #[must_use]
    pub fn expired(mut self, expired: bool) -> Self {
        self.user.expired = expired;
        self
    }

    /// Sets whether the credentials have expired.
    #[must_use]
    pub fn credentials_expired(mut self, expired: bool) -> Self {
        self.user.credentials_expired = expired;
        self
    }

    /// Builds the user.
    #[must_use]
    pub fn build(self) -> LocalUser {
        self.user
    }
}

/// Source of truth for local users.
///
/// # Example
///
/// ```ignore
/// use umagate_auth::identity::UserStore;
///
/// async fn example(store: &impl UserStore) {
///     if let Some(user) = store.find_by_username("jdoe").await? {
///         println!("Found user: {}", user.username);
///     }
/// }
/// ```
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by their username.
    ///
    /// Returns `None` if the user doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<LocalUser>>;
}

/// A [`UserStore`] held in memory.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: DashMap<String, LocalUser>,
}

impl InMemoryUserStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `users`. A later duplicate username wins.
    #[must_use]
    pub fn from_users(users: impl IntoIterator<Item = LocalUser>) -> Self {
        let store = Self::new();
        for user in users {
            store.upsert(user);
        }
        store
    }

    /// Inserts or replaces a user.
    pub fn upsert(&self, user: LocalUser) {
        self.users.insert(user.username.clone(), user);
    }

    /// Removes a user, returning it if it existed.
    pub fn remove(&self, username: &str) -> Option<LocalUser> {
        self.users.remove(username).map(|(_, user)| user)
    }

    /// Returns the number of users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns `true` if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_username(&self, username: &str) -> AuthResult<Option<LocalUser>> {
        Ok(self.users.get(username).map(|entry| entry.value().clone()))
    }
}
