use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use umagate_auth::{InMemoryUserStore, LocalUser};

/// Reads a JSON array of local users. No file means an empty store.
pub fn load_users(path: Option<&Path>) -> Result<InMemoryUserStore> {
    let Some(path) = path else {
        return Ok(InMemoryUserStore::new());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("Cannot read users file {}", path.display()))?;
    let users: Vec<LocalUser> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid users file {}", path.display()))?;
    tracing::debug!(count = users.len(), "Loaded local users");
    Ok(InMemoryUserStore::from_users(users))
}
