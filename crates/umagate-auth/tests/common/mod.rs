//! Common test utilities for integration tests
//!
//! This module provides signing keys, a token builder and a mock identity
//! provider serving discovery, JWKS, OpenID and UMA endpoints.

#![allow(dead_code)]

use std::sync::LazyLock;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use rsa::RsaPrivateKey;
use rsa::traits::PublicKeyParts;
use serde_json::{Value, json};
use sha2::{Sha256, Sha384, Sha512};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use umagate_auth::AuthConfig;

pub const CLIENT_ID: &str = "@!client";
pub const CLIENT_SECRET: &str = "client-secret";
pub const SCIM_PATH: &str = "/scim/v2/Users";

static RSA_KEY: LazyLock<RsaPrivateKey> = LazyLock::new(|| {
    RsaPrivateKey::new(&mut rand::thread_rng(), 2048).expect("RSA key generation")
});

macro_rules! hmac_sign {
    ($digest:ty, $secret:expr, $input:expr) => {{
        let mut mac = Hmac::<$digest>::new_from_slice($secret).expect("HMAC key");
        mac.update($input);
        mac.finalize().into_bytes().to_vec()
    }};
}

enum Material {
    Rsa(RsaPrivateKey),
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
    P521(p521::ecdsa::SigningKey),
    Hmac(Vec<u8>),
}

/// A private key together with its public JWK.
pub struct TestKey {
    pub kid: String,
    pub alg: String,
    material: Material,
}

impl TestKey {
    /// RSA key (shared 2048-bit modulus) for RS* / PS*.
    pub fn rsa(kid: &str, alg: &str) -> Self {
        Self {
            kid: kid.to_string(),
            alg: alg.to_string(),
            material: Material::Rsa(RSA_KEY.clone()),
        }
    }

    /// EC key on the curve matching `alg`.
    pub fn ec(kid: &str, alg: &str) -> Self {
        let mut rng = rand::rngs::OsRng;
        let material = match alg {
            "ES256" => Material::P256(p256::ecdsa::SigningKey::random(&mut rng)),
            "ES384" => Material::P384(p384::ecdsa::SigningKey::random(&mut rng)),
            "ES512" => Material::P521(p521::ecdsa::SigningKey::random(&mut rng)),
            other => panic!("not an ECDSA algorithm: {other}"),
        };
        Self {
            kid: kid.to_string(),
            alg: alg.to_string(),
            material,
        }
    }

    /// Symmetric key for HS*.
    pub fn hmac(kid: &str, alg: &str, secret: &[u8]) -> Self {
        Self {
            kid: kid.to_string(),
            alg: alg.to_string(),
            material: Material::Hmac(secret.to_vec()),
        }
    }

    /// Any key type, chosen by algorithm family.
    pub fn for_alg(kid: &str, alg: &str) -> Self {
        match &alg[..2] {
            "RS" | "PS" => Self::rsa(kid, alg),
            "ES" => Self::ec(kid, alg),
            "HS" => Self::hmac(kid, alg, b"0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef"),
            _ => panic!("unknown algorithm family: {alg}"),
        }
    }

    /// Public JWK.
    pub fn jwk(&self) -> Value {
        let mut jwk = json!({ "kid": self.kid, "alg": self.alg, "use": "sig" });
        let fields = match &self.material {
            Material::Rsa(key) => json!({
                "kty": "RSA",
                "n": b64(&key.n().to_bytes_be()),
                "e": b64(&key.e().to_bytes_be()),
            }),
            Material::P256(key) => {
                let point = key.verifying_key().to_encoded_point(false);
                ec_fields("P-256", point.x(), point.y())
            }
            Material::P384(key) => {
                let point = key.verifying_key().to_encoded_point(false);
                ec_fields("P-384", point.x(), point.y())
            }
            Material::P521(key) => {
                let point = p521::ecdsa::VerifyingKey::from(key).to_encoded_point(false);
                ec_fields("P-521", point.x(), point.y())
            }
            Material::Hmac(secret) => json!({ "kty": "oct", "k": b64(secret) }),
        };
        if let (Some(jwk), Value::Object(fields)) = (jwk.as_object_mut(), fields) {
            jwk.extend(fields);
        }
        jwk
    }

    /// Signs `input` with `alg`, which may differ from the key's own `alg`.
    pub fn sign(&self, alg: &str, input: &[u8]) -> Vec<u8> {
        use p256::ecdsa::signature::Signer as _;
        use rsa::signature::{RandomizedSigner as _, SignatureEncoding as _};

        let mut rng = rand::thread_rng();
        match (&self.material, alg) {
            (Material::Rsa(key), "RS256") => rsa::pkcs1v15::SigningKey::<Sha256>::new(key.clone())
                .sign(input)
                .to_vec(),
            (Material::Rsa(key), "RS384") => rsa::pkcs1v15::SigningKey::<Sha384>::new(key.clone())
                .sign(input)
                .to_vec(),
            (Material::Rsa(key), "RS512") => rsa::pkcs1v15::SigningKey::<Sha512>::new(key.clone())
                .sign(input)
                .to_vec(),
            (Material::Rsa(key), "PS256") => rsa::pss::BlindedSigningKey::<Sha256>::new(key.clone())
                .sign_with_rng(&mut rng, input)
                .to_vec(),
            (Material::Rsa(key), "PS384") => rsa::pss::BlindedSigningKey::<Sha384>::new(key.clone())
                .sign_with_rng(&mut rng, input)
                .to_vec(),
            (Material::Rsa(key), "PS512") => rsa::pss::BlindedSigningKey::<Sha512>::new(key.clone())
                .sign_with_rng(&mut rng, input)
                .to_vec(),
            (Material::P256(key), "ES256") => {
                let signature: p256::ecdsa::Signature = key.sign(input);
                signature.to_bytes().to_vec()
            }
            (Material::P384(key), "ES384") => {
                let signature: p384::ecdsa::Signature = key.sign(input);
                signature.to_bytes().to_vec()
            }
            (Material::P521(key), "ES512") => {
                let signature: p521::ecdsa::Signature = key.sign(input);
                signature.to_bytes().to_vec()
            }
            (Material::Hmac(secret), "HS256") => hmac_sign!(Sha256, secret, input),
            (Material::Hmac(secret), "HS384") => hmac_sign!(Sha384, secret, input),
            (Material::Hmac(secret), "HS512") => hmac_sign!(Sha512, secret, input),
            (_, other) => panic!("key {} cannot sign {other}", self.kid),
        }
    }

    /// Builds a compact token with this key's `kid` and `alg`.
    pub fn token(&self, claims: &Value) -> String {
        self.token_with_header(&json!({ "alg": self.alg, "kid": self.kid, "typ": "JWT" }), claims)
    }

    /// Builds a compact token with an explicit header, signed with the
    /// header's `alg`.
    pub fn token_with_header(&self, header: &Value, claims: &Value) -> String {
        let alg = header["alg"].as_str().unwrap_or(&self.alg).to_string();
        let signing_input = format!(
            "{}.{}",
            b64(header.to_string().as_bytes()),
            b64(claims.to_string().as_bytes())
        );
        let signature = self.sign(&alg, signing_input.as_bytes());
        format!("{signing_input}.{}", b64(&signature))
    }
}

fn ec_fields<T: AsRef<[u8]>>(crv: &str, x: Option<&T>, y: Option<&T>) -> Value {
    json!({
        "kty": "EC",
        "crv": crv,
        "x": b64(x.expect("x coordinate").as_ref()),
        "y": b64(y.expect("y coordinate").as_ref()),
    })
}

pub fn b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// JWKS document holding the given keys.
pub fn jwks(keys: &[&TestKey]) -> Value {
    json!({ "keys": keys.iter().map(|k| k.jwk()).collect::<Vec<_>>() })
}

/// Flips one bit of the decoded segment `index` and re-encodes the token.
pub fn flip_bit(token: &str, index: usize, bit: usize) -> String {
    let mut parts: Vec<String> = token.split('.').map(str::to_string).collect();
    let mut bytes = URL_SAFE_NO_PAD.decode(&parts[index]).expect("segment");
    let position = bit / 8 % bytes.len();
    bytes[position] ^= 1 << (bit % 8);
    parts[index] = b64(&bytes);
    parts.join(".")
}

/// A wiremock server playing the identity provider.
pub struct MockProvider {
    pub server: MockServer,
}

impl MockProvider {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!("{}{path}", self.server.uri())).expect("mock url")
    }

    pub fn openid_configuration(&self) -> Value {
        json!({
            "issuer": self.server.uri(),
            "authorization_endpoint": self.url("/oxauth/authorize"),
            "token_endpoint": self.url("/oxauth/token"),
            "userinfo_endpoint": self.url("/oxauth/userinfo"),
            "end_session_endpoint": self.url("/oxauth/end_session"),
            "jwks_uri": self.url("/oxauth/jwks"),
        })
    }

    pub fn uma_configuration(&self) -> Value {
        json!({
            "issuer": self.server.uri(),
            "authorization_endpoint": self.url("/uma/perm"),
            "token_endpoint": self.url("/uma/token"),
            "rpt_endpoint": self.url("/uma/rpt"),
            "introspection_endpoint": self.url("/uma/introspect"),
        })
    }

    /// Configuration with both integrations pointing at this server.
    pub fn auth_config(&self) -> AuthConfig {
        let mut config = AuthConfig::default();
        config.provider.openid_config_uri = Some(self.url("/.well-known/openid-configuration"));
        config.provider.uma_config_uri = Some(self.url("/.well-known/uma-configuration"));
        config.provider.scim_user_endpoint = Some(self.url(SCIM_PATH));
        config.provider.client_id = CLIENT_ID.to_string();
        config.provider.client_secret = CLIENT_SECRET.to_string();
        config.provider.allow_http = true;
        config.http.request_timeout = Duration::from_secs(5);
        config
    }

    pub async fn mount_discovery(&self) {
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(self.openid_configuration()))
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path("/.well-known/uma-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(self.uma_configuration()))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_jwks(&self, document: Value) {
        Mock::given(method("GET"))
            .and(path("/oxauth/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(document))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_userinfo(&self, body: Value) {
        Mock::given(method("GET"))
            .and(path("/oxauth/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_end_session(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path("/oxauth/end_session"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Mounts all four handshake steps answering successfully, each
    /// expected exactly `times` times.
    pub async fn mount_uma_handshake(&self, times: u64) {
        Mock::given(method("POST"))
            .and(path("/uma/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "aat-1",
                "token_type": "bearer",
                "expires_in": 299,
                "scope": "uma_authorization"
            })))
            .expect(times)
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/uma/rpt"))
            .and(header("authorization", "Bearer aat-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rpt": "bootstrap-rpt" })))
            .expect(times)
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path(SCIM_PATH))
            .and(header("authorization", "Bearer bootstrap-rpt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ticket": "ticket-1" })))
            .expect(times)
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path("/uma/perm"))
            .and(header("authorization", "Bearer aat-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "rpt": "authorized-rpt" })))
            .expect(times)
            .mount(&self.server)
            .await;
    }
}
