//! # umagate-auth
//!
//! Login and directory administration against an OpenID Connect / UMA
//! identity provider.
//!
//! This crate provides:
//! - Compact token (JWS) verification against the provider's JWKS
//! - Token login bound to local user records
//! - The UMA ticket handshake gating the provider's SCIM user directory
//! - Directory create, update and delete mirrored from local users
//!
//! ## Modules
//!
//! - [`config`] - Provider, HTTP and cache configuration
//! - [`token`] - Token parsing, keys and signature algorithms
//! - [`federation`] - Discovery, JWKS and the OpenID login calls
//! - [`uma`] - The UMA handshake
//! - [`identity`] - The authentication decision and local users
//! - [`directory`] - SCIM directory access
//! - [`bootstrap`] - Startup wiring

pub mod bootstrap;
pub mod config;
pub mod directory;
pub mod error;
pub mod federation;
pub mod identity;
pub mod token;
pub mod uma;

pub use bootstrap::Gateway;
pub use config::{AuthConfig, CacheConfig, ConfigError, HttpConfig, ProviderSettings};
pub use directory::{DirectoryClient, DirectoryService, DisabledDirectory, ScimUser};
pub use error::{AccountStatus, AuthError, ErrorCategory, ProviderStep};
pub use federation::{AccessInfo, KeySetCache, OpenIdClient, ProviderConfig, UserInfo};
pub use identity::{
    AuthenticatedIdentity, AuthenticationRequest, IdentityAuthenticator, InMemoryUserCache,
    InMemoryUserStore, LocalUser, NullUserCache, UserCache, UserStore,
};
pub use token::{IdTokenClaims, JsonWebKey, KeySet, TokenVerifier};
pub use uma::{AuthorizedRpt, UmaAuthorizer, UmaSession};

/// Type alias for authentication/authorization results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use umagate_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::bootstrap::Gateway;
    pub use crate::config::{AuthConfig, ConfigError};
    pub use crate::directory::{DirectoryService, ScimUser};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::identity::{
        AuthenticatedIdentity, AuthenticationRequest, IdentityAuthenticator, LocalUser, UserStore,
    };
    pub use crate::token::{IdTokenClaims, TokenVerifier};
}
