pub mod directory;
pub mod login;
pub mod provider;

use anyhow::{Context, Result};
use umagate_auth::{Gateway, IdentityAuthenticator, UmaAuthorizer};

fn authenticator(gateway: &Gateway) -> Result<&IdentityAuthenticator> {
    gateway
        .authenticator()
        .map(|a| &**a)
        .context("Token login is not configured (set auth.provider.openid_config_uri)")
}

fn authorizer(gateway: &Gateway) -> Result<&UmaAuthorizer> {
    gateway
        .authorizer()
        .map(|a| &**a)
        .context("Directory access is not configured (set auth.provider.uma_config_uri)")
}
