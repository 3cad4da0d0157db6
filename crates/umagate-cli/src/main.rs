mod cli;
mod commands;
mod config;
mod observability;
mod output;
mod users;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use umagate_auth::{AuthError, ErrorCategory, Gateway};

use cli::{Cli, Commands, DirectoryCommands};
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(exit_code(&e));
    }
}

async fn run() -> Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    observability::init_tracing_with_level("warn");

    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref())?;
    observability::apply_logging_level(&config.logging.level);

    if let Commands::Config = &cli.command {
        println!("{}", toml::to_string_pretty(&config.redacted())?);
        return Ok(());
    }

    let store = Arc::new(users::load_users(cli.users.as_deref())?);
    let gateway = Gateway::initialize(&config.auth, store.clone())
        .await
        .context("Failed to initialize the identity provider integration")?;

    match &cli.command {
        Commands::Check => commands::provider::check(&gateway)?,
        Commands::VerifyToken(args) => {
            commands::provider::verify_token(&gateway, args.token.as_deref())?;
        }
        Commands::Login(args) => commands::login::login(&gateway, args).await?,
        Commands::Authorize => commands::provider::authorize(&gateway).await?,
        Commands::Directory(args) => {
            let directory = gateway.directory();
            match &args.command {
                DirectoryCommands::Find(find) => {
                    commands::directory::find(directory.as_ref(), &find.username).await?;
                }
                DirectoryCommands::Create(create) => {
                    commands::directory::create(
                        directory.as_ref(),
                        store.as_ref(),
                        &create.username,
                        create.password.as_deref(),
                    )
                    .await?;
                }
                DirectoryCommands::Update(update) => {
                    commands::directory::update(
                        directory.as_ref(),
                        store.as_ref(),
                        &update.username,
                        update.original.as_deref(),
                        update.password.as_deref(),
                    )
                    .await?;
                }
                DirectoryCommands::Delete(delete) => {
                    commands::directory::delete(directory.as_ref(), &delete.username).await?;
                }
            }
        }
        Commands::Config => {}
    }

    Ok(())
}

fn exit_code(err: &anyhow::Error) -> i32 {
    let Some(auth) = err.chain().find_map(|e| e.downcast_ref::<AuthError>()) else {
        return 1;
    };
    match auth.category() {
        ErrorCategory::Configuration => 2,
        ErrorCategory::Authentication | ErrorCategory::AccountStatus => 3,
        ErrorCategory::Unavailable => 4,
        _ => 1,
    }
}
