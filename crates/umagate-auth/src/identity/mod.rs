//! Login with provider-issued tokens against local user records.
//!
//! - [`authenticator`] - the authentication decision
//! - [`user`] - local users and the [`UserStore`] trait
//! - [`cache`] - the [`UserCache`] trait and its implementations
//! - [`checks`] - account status gates

pub mod authenticator;
pub mod cache;
pub mod checks;
pub mod user;

pub use authenticator::{
    AuthenticatedIdentity, AuthenticationRequest, IdentityAuthenticator, TokenCredentials, U2F_ACR,
};
pub use cache::{InMemoryUserCache, NullUserCache, UserCache};
pub use checks::{AccountStatusCheck, PostAuthenticationChecks, PreAuthenticationChecks};
pub use user::{InMemoryUserStore, LocalUser, LocalUserBuilder, UserStore};
