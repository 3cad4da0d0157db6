//! Local user cache.
//!
//! Caching saves a store read per login. A cached copy may be stale; the
//! authenticator recovers by reloading from the store once when a
//! comparison against a cached user fails.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::user::LocalUser;

/// Cache of local users keyed by username.
pub trait UserCache: Send + Sync {
    /// Returns the cached user, if present and fresh.
    fn get(&self, username: &str) -> Option<LocalUser>;

    /// Caches a user.
    fn put(&self, user: LocalUser);

    /// Drops a user from the cache.
    fn remove(&self, username: &str);
}

/// A [`UserCache`] that never holds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullUserCache;

impl UserCache for NullUserCache {
    fn get(&self, _username: &str) -> Option<LocalUser> {
        None
    }

    fn put(&self, _user: LocalUser) {}

    fn remove(&self, _username: &str) {}
}

/// Entry count at which `put` sweeps expired entries first.
const DEFAULT_CLEANUP_THRESHOLD: usize = 1024;

/// In-memory [`UserCache`] with a fixed time-to-live.
///
/// Expired entries are dropped when read, and swept in bulk by `put` once
/// the cache reaches its cleanup threshold.
#[derive(Debug)]
pub struct InMemoryUserCache {
    entries: DashMap<String, CachedUser>,
    ttl: Duration,
    cleanup_threshold: usize,
}

#[derive(Debug)]
struct CachedUser {
    user: LocalUser,
    expires_at: Instant,
}

impl InMemoryUserCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            cleanup_threshold: DEFAULT_CLEANUP_THRESHOLD,
        }
    }

    /// Sets the entry count at which `put` sweeps expired entries.
    #[must_use]
    pub fn with_cleanup_threshold(mut self, threshold: usize) -> Self {
        self.cleanup_threshold = threshold.max(1);
        self
    }

    /// Returns the number of entries, including expired ones not yet evicted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes expired entries.
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, cached| cached.expires_at > now);
    }
}

impl UserCache for InMemoryUserCache {
    fn get(&self, username: &str) -> Option<LocalUser> {
        let now = Instant::now();
        let fresh = self
            .entries
            .get(username)
            .map(|cached| (cached.expires_at > now).then(|| cached.user.clone()))?;

        if fresh.is_none() {
            self.entries
                .remove_if(username, |_, cached| cached.expires_at <= now);
        }
        fresh
    }

    fn put(&self, user: LocalUser) {
        if self.entries.len() >= self.cleanup_threshold {
            self.cleanup_expired();
        }
        let expires_at = Instant::now() + self.ttl;
        self.entries
            .insert(user.username.clone(), CachedUser { user, expires_at });
    }

    fn remove(&self, username: &str) {
        self.entries.remove(username);
    }
}
