use anyhow::{Context, Result};
use colored::Colorize;
use umagate_auth::{DirectoryService, LocalUser, UserStore};

use crate::output::{print_json, print_success, print_warning};

async fn local_user(store: &dyn UserStore, username: &str) -> Result<LocalUser> {
    store
        .find_by_username(username)
        .await?
        .with_context(|| format!("No local user named {username} (see --users)"))
}

fn warn_if_disabled(directory: &dyn DirectoryService) {
    if !directory.is_enabled() {
        print_warning("Directory access is not configured; nothing was sent");
    }
}

pub async fn find(directory: &dyn DirectoryService, username: &str) -> Result<()> {
    warn_if_disabled(directory);
    match directory.find_user(username).await? {
        Some(user) => print_json(&user),
        None => {
            println!("No directory user named {}", username.cyan());
            Ok(())
        }
    }
}

pub async fn create(
    directory: &dyn DirectoryService,
    store: &dyn UserStore,
    username: &str,
    password: Option<&str>,
) -> Result<()> {
    let user = local_user(store, username).await?;
    warn_if_disabled(directory);
    directory.create_user(password, &user).await?;
    print_success(&format!("Created directory user {}", username.cyan()));
    Ok(())
}

pub async fn update(
    directory: &dyn DirectoryService,
    store: &dyn UserStore,
    username: &str,
    original: Option<&str>,
    password: Option<&str>,
) -> Result<()> {
    let user = local_user(store, username).await?;
    let original = original.unwrap_or(username);
    warn_if_disabled(directory);
    directory.update_user(password, original, &user).await?;
    print_success(&format!("Updated directory user {}", username.cyan()));
    Ok(())
}

pub async fn delete(directory: &dyn DirectoryService, username: &str) -> Result<()> {
    warn_if_disabled(directory);
    directory.delete_user(username).await?;
    print_success(&format!("Deleted directory user {}", username.cyan()));
    Ok(())
}
