//! OpenID / UMA identity provider integration.
//!
//! This module provides:
//!
//! - Discovery of the provider's OpenID and UMA endpoints
//! - JWK set fetching for id token verification
//! - The login-time calls: code exchange, user info and end session

pub mod client;
pub mod discovery;
pub mod jwks;
pub mod metadata;

pub use client::{AccessInfo, OpenIdClient, UserInfo};
pub use discovery::{DiscoveryClient, DiscoveryError, ProviderConfig, ProviderConfigResolver};
pub use jwks::{JwksError, KeySetCache};
pub use metadata::{OpenIdConfiguration, UmaConfiguration};
