//! Discovery and JWKS fetching against a mock provider.

mod common;

use serde_json::json;
use umagate_auth::HttpConfig;
use umagate_auth::federation::{
    DiscoveryClient, DiscoveryError, JwksError, KeySetCache, ProviderConfigResolver,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use common::{MockProvider, TestKey, jwks};

fn client(allow_http: bool) -> DiscoveryClient {
    DiscoveryClient::new(&HttpConfig::default(), allow_http).unwrap()
}

#[tokio::test]
async fn test_resolve_both_documents() {
    let provider = MockProvider::start().await;
    provider.mount_discovery().await;

    let settings = provider.auth_config().provider;
    let resolved = ProviderConfigResolver::new(client(true), settings)
        .resolve()
        .await
        .unwrap();

    let openid = resolved.openid.unwrap();
    assert_eq!(openid.jwks_uri, provider.url("/oxauth/jwks"));
    assert_eq!(openid.userinfo_endpoint, provider.url("/oxauth/userinfo"));

    let uma = resolved.uma.unwrap();
    assert_eq!(uma.rpt_endpoint, provider.url("/uma/rpt"));
    assert_eq!(uma.authorization_endpoint, provider.url("/uma/perm"));
}

#[tokio::test]
async fn test_unconfigured_documents_not_fetched() {
    let provider = MockProvider::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&provider.server)
        .await;

    let mut settings = provider.auth_config().provider;
    settings.openid_config_uri = None;
    settings.uma_config_uri = None;

    let resolved = ProviderConfigResolver::new(client(true), settings)
        .resolve()
        .await
        .unwrap();
    assert!(resolved.openid.is_none());
    assert!(resolved.uma.is_none());
}

#[tokio::test]
async fn test_missing_required_member() {
    let provider = MockProvider::start().await;
    let mut document = provider.uma_configuration();
    document.as_object_mut().unwrap().remove("rpt_endpoint");
    Mock::given(method("GET"))
        .and(path("/.well-known/uma-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(&provider.server)
        .await;

    let resolver = ProviderConfigResolver::new(client(true), provider.auth_config().provider);
    let err = resolver
        .resolve_uma(&provider.url("/.well-known/uma-configuration"))
        .await
        .unwrap_err();
    assert!(matches!(err, DiscoveryError::ParseError(_)));
}

#[tokio::test]
async fn test_non_success_status() {
    let provider = MockProvider::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&provider.server)
        .await;

    let resolver = ProviderConfigResolver::new(client(true), provider.auth_config().provider);
    let err = resolver.resolve().await.unwrap_err();
    assert!(matches!(err, DiscoveryError::HttpError(503)));
}

#[tokio::test]
async fn test_http_rejected_unless_allowed() {
    let provider = MockProvider::start().await;
    provider.mount_discovery().await;

    let resolver = ProviderConfigResolver::new(client(false), provider.auth_config().provider);
    let err = resolver.resolve().await.unwrap_err();
    assert!(matches!(err, DiscoveryError::InvalidScheme { .. }));
}

#[tokio::test]
async fn test_key_set_fetch() {
    let provider = MockProvider::start().await;
    let rsa = TestKey::rsa("rsa-1", "RS256");
    let ec = TestKey::ec("ec-1", "ES512");
    provider.mount_jwks(jwks(&[&rsa, &ec])).await;

    let jwks_uri = provider.url("/oxauth/jwks");
    let cache = KeySetCache::fetch(&client(true), &jwks_uri).await.unwrap();

    assert_eq!(cache.key_set().len(), 2);
    assert_eq!(cache.source(), &jwks_uri);
    assert_eq!(cache.get("ec-1").unwrap().alg, "ES512");
    assert!(matches!(cache.get("gone"), Err(JwksError::KeyNotFound(_))));

    let token = ec.token(&json!({"sub": "u1"}));
    assert!(cache.verifier().verify(&token).is_ok());
}

#[tokio::test]
async fn test_key_set_without_keys() {
    let provider = MockProvider::start().await;
    provider.mount_jwks(json!({ "keys": [] })).await;

    let err = KeySetCache::fetch(&client(true), &provider.url("/oxauth/jwks"))
        .await
        .unwrap_err();
    assert!(matches!(err, JwksError::NoKeys));
}

#[tokio::test]
async fn test_oversized_key_set_rejected() {
    let provider = MockProvider::start().await;
    Mock::given(method("GET"))
        .and(path("/oxauth/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(4096)))
        .mount(&provider.server)
        .await;

    let http = HttpConfig {
        max_response_size: 1024,
        ..HttpConfig::default()
    };
    let client = DiscoveryClient::new(&http, true).unwrap();
    let err = KeySetCache::fetch(&client, &provider.url("/oxauth/jwks"))
        .await
        .unwrap_err();
    assert!(matches!(err, JwksError::ResponseTooLarge { max_size: 1024 }));
}
