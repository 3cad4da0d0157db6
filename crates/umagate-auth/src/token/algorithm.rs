//! Signature algorithm table.
//!
//! Maps a JWS `alg` name to the function that verifies a signature with a
//! [`JsonWebKey`]. Each function checks that the key type fits the
//! algorithm before touching the key material.
//!
//! | `alg` | key | primitive |
//! |-------|-----|-----------|
//! | RS256/384/512 | RSA | RSASSA-PKCS1-v1_5 |
//! | PS256/384/512 | RSA | RSASSA-PSS |
//! | ES256/384/512 | EC (P-256/P-384/P-521) | ECDSA, raw `r \|\| s` signature |
//! | HS256/384/512 | oct | HMAC |

use hmac::{Hmac, Mac};
use rsa::signature::Verifier;
use rsa::{BigUint, RsaPublicKey};
use sha2::{Sha256, Sha384, Sha512};

use super::TokenError;
use super::jwk::JsonWebKey;

/// Verifies `signature` over `message` with `key`.
pub type VerifyFn = fn(&JsonWebKey, &[u8], &[u8]) -> Result<(), TokenError>;

const ALGORITHMS: &[(&str, VerifyFn)] = &[
    ("RS256", rs256),
    ("RS384", rs384),
    ("RS512", rs512),
    ("PS256", ps256),
    ("PS384", ps384),
    ("PS512", ps512),
    ("ES256", es256),
    ("ES384", es384),
    ("ES512", es512),
    ("HS256", hs256),
    ("HS384", hs384),
    ("HS512", hs512),
];

/// Looks up the verification function for an algorithm name.
#[must_use]
pub fn verifier_for(alg: &str) -> Option<VerifyFn> {
    ALGORITHMS
        .iter()
        .find(|(name, _)| *name == alg)
        .map(|(_, verify)| *verify)
}

/// Returns the names of all supported algorithms.
pub fn supported_algorithms() -> impl Iterator<Item = &'static str> {
    ALGORITHMS.iter().map(|(name, _)| *name)
}

fn expect_kty(key: &JsonWebKey, kty: &str) -> Result<(), TokenError> {
    if key.kty == kty {
        Ok(())
    } else {
        Err(TokenError::InvalidKey(format!(
            "key {} has type {}, expected {kty}",
            key.kid, key.kty
        )))
    }
}

fn rsa_public_key(key: &JsonWebKey) -> Result<RsaPublicKey, TokenError> {
    expect_kty(key, "RSA")?;
    let n = BigUint::from_bytes_be(&key.decoded_param("n")?);
    let e = BigUint::from_bytes_be(&key.decoded_param("e")?);
    RsaPublicKey::new(n, e).map_err(|e| TokenError::InvalidKey(format!("key {}: {e}", key.kid)))
}

/// Uncompressed SEC1 point from the JWK `x`/`y` coordinates.
fn ec_point(key: &JsonWebKey, crv: &str, field_len: usize) -> Result<Vec<u8>, TokenError> {
    expect_kty(key, "EC")?;
    if key.param("crv") != Some(crv) {
        return Err(TokenError::InvalidKey(format!(
            "key {} is not on curve {crv}",
            key.kid
        )));
    }

    let x = key.decoded_param("x")?;
    let y = key.decoded_param("y")?;
    if x.len() != field_len || y.len() != field_len {
        return Err(TokenError::InvalidKey(format!(
            "key {} has coordinates of the wrong length",
            key.kid
        )));
    }

    let mut point = Vec::with_capacity(1 + 2 * field_len);
    point.push(0x04);
    point.extend_from_slice(&x);
    point.extend_from_slice(&y);
    Ok(point)
}

macro_rules! rsa_algorithm {
    ($name:ident, $scheme:ident, $digest:ty) => {
        fn $name(key: &JsonWebKey, message: &[u8], signature: &[u8]) -> Result<(), TokenError> {
            let verifying_key = rsa::$scheme::VerifyingKey::<$digest>::new(rsa_public_key(key)?);
            let signature = rsa::$scheme::Signature::try_from(signature)
                .map_err(|_| TokenError::InvalidSignature)?;
            verifying_key
                .verify(message, &signature)
                .map_err(|_| TokenError::InvalidSignature)
        }
    };
}

macro_rules! ecdsa_algorithm {
    ($name:ident, $curve:ident, $crv:literal, $field_len:literal) => {
        fn $name(key: &JsonWebKey, message: &[u8], signature: &[u8]) -> Result<(), TokenError> {
            use $curve::ecdsa::signature::Verifier as _;
            use $curve::ecdsa::{Signature, VerifyingKey};

            let point = ec_point(key, $crv, $field_len)?;
            let verifying_key = VerifyingKey::from_sec1_bytes(&point)
                .map_err(|e| TokenError::InvalidKey(format!("key {}: {e}", key.kid)))?;
            let signature =
                Signature::from_slice(signature).map_err(|_| TokenError::InvalidSignature)?;
            verifying_key
                .verify(message, &signature)
                .map_err(|_| TokenError::InvalidSignature)
        }
    };
}

macro_rules! hmac_algorithm {
    ($name:ident, $digest:ty) => {
        fn $name(key: &JsonWebKey, message: &[u8], signature: &[u8]) -> Result<(), TokenError> {
            expect_kty(key, "oct")?;
            let secret = key.decoded_param("k")?;
            let mut mac = Hmac::<$digest>::new_from_slice(&secret)
                .map_err(|e| TokenError::InvalidKey(format!("key {}: {e}", key.kid)))?;
            mac.update(message);
            mac.verify_slice(signature)
                .map_err(|_| TokenError::InvalidSignature)
        }
    };
}

rsa_algorithm!(rs256, pkcs1v15, Sha256);
rsa_algorithm!(rs384, pkcs1v15, Sha384);
rsa_algorithm!(rs512, pkcs1v15, Sha512);
rsa_algorithm!(ps256, pss, Sha256);
rsa_algorithm!(ps384, pss, Sha384);
rsa_algorithm!(ps512, pss, Sha512);
ecdsa_algorithm!(es256, p256, "P-256", 32);
ecdsa_algorithm!(es384, p384, "P-384", 48);
ecdsa_algorithm!(es512, p521, "P-521", 66);
hmac_algorithm!(hs256, Sha256);
hmac_algorithm!(hs384, Sha384);
hmac_algorithm!(hs512, Sha512);
