use anyhow::{Context, Result};
use colored::Colorize;
use umagate_auth::{AuthenticationRequest, Gateway};

use crate::cli::LoginArgs;
use crate::output::{print_field, print_success};

pub async fn login(gateway: &Gateway, args: &LoginArgs) -> Result<()> {
    let authenticator = super::authenticator(gateway)?;

    let identity = match (&args.code, &args.id_token, &args.access_token) {
        (Some(code), _, _) => {
            let redirect_uri = args
                .redirect_uri
                .as_deref()
                .context("--redirect-uri is required with --code")?;
            authenticator
                .login_with_code(code, redirect_uri, &args.scope)
                .await?
        }
        (None, Some(id_token), Some(access_token)) => {
            authenticator
                .authenticate(AuthenticationRequest::new(id_token, access_token))
                .await?
        }
        _ => anyhow::bail!("Pass either --code or --id-token with --access-token"),
    };

    print_success(&format!(
        "Authenticated as {}",
        identity.principal.username.cyan()
    ));
    print_field("Name", identity.principal.display_name());
    print_field(
        "Subject",
        identity.claims.sub.as_deref().unwrap_or("-"),
    );
    print_field("ACR", identity.claims.acr.as_deref().unwrap_or("-"));
    print_field(
        "Authorities",
        if identity.authorities.is_empty() {
            "(none)".to_string()
        } else {
            identity.authorities.join(", ")
        },
    );
    Ok(())
}
