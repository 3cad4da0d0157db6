use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "umagate")]
#[command(about = "umagate CLI: token login and UMA-gated directory administration")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to umagate.toml in the working directory)
    #[arg(short, long, global = true, env = "UMAGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON file with local user records
    #[arg(short, long, global = true, env = "UMAGATE_USERS")]
    pub users: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve discovery documents and the JWKS, print the endpoints
    Check,
    /// Verify an identity token against the provider keys
    VerifyToken(VerifyTokenArgs),
    /// Authenticate a local user with provider tokens
    Login(LoginArgs),
    /// Run the UMA handshake for the directory resource
    Authorize,
    /// Provider user directory
    Directory(DirectoryArgs),
    /// Show the effective configuration
    Config,
}

#[derive(clap::Args)]
pub struct VerifyTokenArgs {
    /// Compact token (reads from stdin if omitted)
    pub token: Option<String>,
}

#[derive(clap::Args)]
pub struct LoginArgs {
    /// Authorization code to exchange
    #[arg(long, conflicts_with_all = ["id_token", "access_token"])]
    pub code: Option<String>,
    /// Redirect URI the code was issued for
    #[arg(long, requires = "code")]
    pub redirect_uri: Option<String>,
    /// Scope requested with the code
    #[arg(long, default_value = "openid")]
    pub scope: String,
    /// Identity token, for logging in with an existing token pair
    #[arg(long, requires = "access_token")]
    pub id_token: Option<String>,
    /// Access token paired with --id-token
    #[arg(long, requires = "id_token")]
    pub access_token: Option<String>,
}

#[derive(clap::Args)]
pub struct DirectoryArgs {
    #[command(subcommand)]
    pub command: DirectoryCommands,
}

#[derive(Subcommand)]
pub enum DirectoryCommands {
    /// Look up a directory user
    Find(FindArgs),
    /// Create the directory user for a local user
    Create(WriteArgs),
    /// Replace a directory user with a local user's data
    Update(UpdateArgs),
    /// Delete a directory user
    Delete(FindArgs),
}

#[derive(clap::Args)]
pub struct FindArgs {
    /// Directory username
    pub username: String,
}

#[derive(clap::Args)]
pub struct WriteArgs {
    /// Local username
    pub username: String,
    /// Plain-text directory password to set
    #[arg(long, env = "UMAGATE_DIRECTORY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(clap::Args)]
pub struct UpdateArgs {
    /// Local username
    pub username: String,
    /// Directory username before the change (defaults to USERNAME)
    #[arg(long)]
    pub original: Option<String>,
    /// Plain-text directory password to set
    #[arg(long, env = "UMAGATE_DIRECTORY_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}
