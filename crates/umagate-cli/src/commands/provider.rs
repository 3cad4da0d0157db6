use std::io::Read;

use anyhow::{Context, Result};
use colored::Colorize;
use umagate_auth::Gateway;

use crate::output::{print_field, print_json, print_success};

pub fn check(gateway: &Gateway) -> Result<()> {
    let provider = gateway.provider();

    match &provider.openid {
        Some(openid) => {
            println!("{}", "OpenID".bold());
            print_field("  Issuer", &openid.issuer);
            for (name, url) in openid.endpoints() {
                print_field(&format!("  {name}"), url);
            }
        }
        None => println!("{} not configured", "OpenID".bold()),
    }

    match &provider.uma {
        Some(uma) => {
            println!("{}", "UMA".bold());
            print_field("  Issuer", &uma.issuer);
            for (name, url) in uma.endpoints() {
                print_field(&format!("  {name}"), url);
            }
        }
        None => println!("{} not configured", "UMA".bold()),
    }

    if let Some(keys) = gateway.keys() {
        println!("{}", "Keys".bold());
        for key in keys.key_set().keys() {
            print_field(&format!("  {}", key.kid), format!("{} ({})", key.alg, key.kty));
        }
        print_field("  Fetched", keys.fetched_at());
    }

    print_field(
        "Directory",
        if gateway.directory().is_enabled() { "enabled" } else { "disabled" },
    );
    Ok(())
}

pub fn verify_token(gateway: &Gateway, token: Option<&str>) -> Result<()> {
    let keys = gateway
        .keys()
        .context("Token verification is not configured (set auth.provider.openid_config_uri)")?;

    let token = match token {
        Some(token) => token.to_string(),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read token from stdin")?;
            buf
        }
    };

    let claims = keys.verifier().verify(token.trim())?;
    print_success("Token signature verified");
    print_json(&claims)
}

pub async fn authorize(gateway: &Gateway) -> Result<()> {
    let authorizer = super::authorizer(gateway)?;
    authorizer.authorize().await?;
    print_success(&format!(
        "Obtained an authorized RPT for {}",
        authorizer.resource().as_str().cyan()
    ));
    Ok(())
}
