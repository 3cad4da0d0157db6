//! Provider discovery documents.
//!
//! Two documents are fetched at startup: the OpenID configuration, which
//! drives token login, and the UMA configuration, which drives the
//! permission ticket handshake. Members this crate does not use are ignored.
//!
//! # References
//!
//! - [OpenID Connect Discovery 1.0](https://openid.net/specs/openid-connect-discovery-1_0.html)
//! - [UMA 1.0 Core, section 1.4](https://docs.kantarainitiative.org/uma/rec-uma-core-v1_0_1.html)

use serde::{Deserialize, Serialize};
use url::Url;

/// OpenID provider configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenIdConfiguration {
    /// Issuer identifier.
    pub issuer: String,

    /// Authorization endpoint.
    pub authorization_endpoint: Url,

    /// Token endpoint, used for the authorization code exchange.
    pub token_endpoint: Url,

    /// User-info endpoint.
    pub userinfo_endpoint: Url,

    /// End-session endpoint.
    pub end_session_endpoint: Url,

    /// Published signing keys.
    pub jwks_uri: Url,

    /// Client info endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clientinfo_endpoint: Option<Url>,

    /// Token validation endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate_token_endpoint: Option<Url>,
}

impl OpenIdConfiguration {
    /// Returns every endpoint with its member name.
    pub fn endpoints(&self) -> impl Iterator<Item = (&'static str, &Url)> {
        [
            ("authorization_endpoint", Some(&self.authorization_endpoint)),
            ("token_endpoint", Some(&self.token_endpoint)),
            ("userinfo_endpoint", Some(&self.userinfo_endpoint)),
            ("end_session_endpoint", Some(&self.end_session_endpoint)),
            ("jwks_uri", Some(&self.jwks_uri)),
            ("clientinfo_endpoint", self.clientinfo_endpoint.as_ref()),
            ("validate_token_endpoint", self.validate_token_endpoint.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, url)| url.map(|u| (name, u)))
    }
}

/// UMA authorization server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UmaConfiguration {
    /// Issuer identifier.
    pub issuer: String,

    /// Requesting party authorization endpoint, exchanges a ticket for an
    /// authorized RPT.
    pub authorization_endpoint: Url,

    /// Token endpoint, issues the AAT.
    pub token_endpoint: Url,

    /// RPT endpoint, issues the bootstrap RPT.
    pub rpt_endpoint: Url,

    /// RPT introspection endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub introspection_endpoint: Option<Url>,

    /// Resource set registration endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_set_registration_endpoint: Option<Url>,

    /// Permission registration endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission_registration_endpoint: Option<Url>,

    /// Scope description endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope_endpoint: Option<Url>,
}

impl UmaConfiguration {
    /// Returns every endpoint with its member name.
    pub fn endpoints(&self) -> impl Iterator<Item = (&'static str, &Url)> {
        [
            ("authorization_endpoint", Some(&self.authorization_endpoint)),
            ("token_endpoint", Some(&self.token_endpoint)),
            ("rpt_endpoint", Some(&self.rpt_endpoint)),
            ("introspection_endpoint", self.introspection_endpoint.as_ref()),
            (
                "resource_set_registration_endpoint",
                self.resource_set_registration_endpoint.as_ref(),
            ),
            (
                "permission_registration_endpoint",
                self.permission_registration_endpoint.as_ref(),
            ),
            ("scope_endpoint", self.scope_endpoint.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, url)| url.map(|u| (name, u)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_openid_configuration() {
        let json = r#"{
            "issuer": "https://idp.example.com",
            "authorization_endpoint": "https://idp.example.com/oxauth/authorize",
            "token_endpoint": "https://idp.example.com/oxauth/token",
            "userinfo_endpoint": "https://idp.example.com/oxauth/userinfo",
            "clientinfo_endpoint": "https://idp.example.com/oxauth/clientinfo",
            "end_session_endpoint": "https://idp.example.com/oxauth/end_session",
            "jwks_uri": "https://idp.example.com/oxauth/jwks",
            "validate_token_endpoint": "https://idp.example.com/oxauth/validate",
            "scopes_supported": ["openid", "profile"]
        }"#;

        let config: OpenIdConfiguration = serde_json::from_str(json).unwrap();
        assert_eq!(config.issuer, "https://idp.example.com");
        assert_eq!(config.jwks_uri.path(), "/oxauth/jwks");
        assert!(config.validate_token_endpoint.is_some());
        assert_eq!(config.endpoints().count(), 7);
    }

    #[test]
    fn test_openid_configuration_requires_userinfo() {
        let json = r#"{
            "issuer": "https://idp.example.com",
            "authorization_endpoint": "https://idp.example.com/authorize",
            "token_endpoint": "https://idp.example.com/token",
            "end_session_endpoint": "https://idp.example.com/end_session",
            "jwks_uri": "https://idp.example.com/jwks"
        }"#;

        let err = serde_json::from_str::<OpenIdConfiguration>(json).unwrap_err();
        assert!(err.to_string().contains("userinfo_endpoint"));
    }

    #[test]
    fn test_parse_uma_configuration() {
        let json = r#"{
            "issuer": "https://idp.example.com",
            "authorization_endpoint": "https://idp.example.com/requester/perm",
            "token_endpoint": "https://idp.example.com/oxauth/token",
            "rpt_endpoint": "https://idp.example.com/requester/rpt",
            "introspection_endpoint": "https://idp.example.com/rpt/status",
            "resource_set_registration_endpoint": "https://idp.example.com/host/rsrc/resource_set",
            "permission_registration_endpoint": "https://idp.example.com/host/rsrc_pr",
            "scope_endpoint": "https://idp.example.com/uma/scopes"
        }"#;

        let config: UmaConfiguration = serde_json::from_str(json).unwrap();
        assert_eq!(config.rpt_endpoint.path(), "/requester/rpt");
        assert_eq!(config.endpoints().count(), 8);
    }

    #[test]
    fn test_uma_optional_endpoints() {
        let json = r#"{
            "issuer": "https://idp.example.com",
            "authorization_endpoint": "https://idp.example.com/perm",
            "token_endpoint": "https://idp.example.com/token",
            "rpt_endpoint": "https://idp.example.com/rpt"
        }"#;

        let config: UmaConfiguration = serde_json::from_str(json).unwrap();
        assert!(config.scope_endpoint.is_none());
        assert_eq!(config.endpoints().count(), 3);
    }
}
