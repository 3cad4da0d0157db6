//! Compact token parsing and signature verification.
//!
//! # Overview
//!
//! [`verify`] is a pure function over a compact token and a [`KeySet`]:
//!
//! 1. Split into exactly three `.`-separated segments
//! 2. Decode header and body as base64url JSON (unknown members ignored)
//! 3. Resolve the key by the header's `kid`
//! 4. Look up the header's `alg` in the algorithm table
//! 5. Require the key's `alg` to equal the header's `alg`
//! 6. Verify the signature over `segment0 "." segment1`
//!
//! Claims are only handed out after step 6 succeeds.
//!
//! [`TokenVerifier`] wraps [`verify`] for callers that must not learn why a
//! token was rejected: the cause is logged and every failure becomes
//! [`AuthError::InvalidToken`].

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::algorithm::verifier_for;
use super::jwk::KeySet;
use super::{TokenError, b64_decode};
use crate::AuthResult;
use crate::error::AuthError;

/// JOSE header of a compact token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Signature algorithm.
    pub alg: String,

    /// Identifier of the signing key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Media type, usually `JWT`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
}

/// ID token claims.
///
/// All registered claims are optional at this layer; callers decide which
/// ones they require.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Subject identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Issuer identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience (a string or an array on the wire).
    #[serde(
        default,
        deserialize_with = "deserialize_audience",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub aud: Vec<String>,

    /// Authentication context class reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acr: Option<String>,

    /// Nonce value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Access token hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_hash: Option<String>,

    /// Expiration time (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued at time (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Time of the end-user authentication (Unix timestamp).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,

    /// Any other claims.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn deserialize_audience<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::One(aud)) => vec![aud],
        Some(OneOrMany::Many(aud)) => aud,
        None => Vec::new(),
    })
}

/// A parsed, not yet verified, compact token.
#[derive(Debug, Clone)]
pub struct SignedToken {
    header: TokenHeader,
    claims: IdTokenClaims,
    signing_input: String,
    signature: Vec<u8>,
}

impl SignedToken {
    /// Parses a compact token without verifying it.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Malformed` if the token does not have exactly
    /// three segments or a segment fails to decode.
    pub fn parse(token: &str) -> Result<Self, TokenError> {
        let parts: Vec<&str> = token.split('.').collect();
        let [header_b64, body_b64, signature_b64] = parts.as_slice() else {
            return Err(TokenError::Malformed(format!(
                "expected 3 segments, found {}",
                parts.len()
            )));
        };

        let header: TokenHeader = decode_segment("header", header_b64)?;
        let claims: IdTokenClaims = decode_segment("body", body_b64)?;
        let signature = b64_decode(signature_b64)
            .map_err(|e| TokenError::Malformed(format!("signature: {e}")))?;

        Ok(Self {
            header,
            claims,
            signing_input: format!("{header_b64}.{body_b64}"),
            signature,
        })
    }

    /// Returns the header.
    #[must_use]
    pub fn header(&self) -> &TokenHeader {
        &self.header
    }

    /// Returns the claims. They are untrusted until verified.
    #[must_use]
    pub fn claims(&self) -> &IdTokenClaims {
        &self.claims
    }

    /// Returns the exact bytes the signature covers.
    #[must_use]
    pub fn signing_input(&self) -> &[u8] {
        self.signing_input.as_bytes()
    }

    /// Returns the decoded signature.
    #[must_use]
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Verifies the signature against `keys` and returns the claims.
    ///
    /// # Errors
    ///
    /// See [`verify`].
    pub fn verify(self, keys: &KeySet) -> Result<IdTokenClaims, TokenError> {
        let kid = self.header.kid.as_deref().ok_or(TokenError::MissingKeyId)?;
        let key = keys
            .find(kid)
            .ok_or_else(|| TokenError::KeyNotFound(kid.to_string()))?;

        let verify_signature = verifier_for(&self.header.alg)
            .ok_or_else(|| TokenError::UnsupportedAlgorithm(self.header.alg.clone()))?;

        if key.alg != self.header.alg {
            return Err(TokenError::AlgorithmMismatch {
                key: key.alg.clone(),
                token: self.header.alg.clone(),
            });
        }
        if !key.is_signing_key() {
            return Err(TokenError::InvalidKey(format!(
                "key {} is not published for signatures",
                key.kid
            )));
        }

        verify_signature(key, self.signing_input(), &self.signature)?;
        Ok(self.claims)
    }
}

fn decode_segment<T: DeserializeOwned>(name: &str, segment: &str) -> Result<T, TokenError> {
    let bytes = b64_decode(segment).map_err(|e| TokenError::Malformed(format!("{name}: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| TokenError::Malformed(format!("{name}: {e}")))
}

/// Parses and verifies a compact token against a key set.
///
/// # Errors
///
/// Returns the detailed [`TokenError`] for the first check that fails. An
/// unknown `kid` is reported before any algorithm or signature work.
pub fn verify(token: &str, keys: &KeySet) -> Result<IdTokenClaims, TokenError> {
    SignedToken::parse(token)?.verify(keys)
}

/// Verifies identity tokens against the provider's key set.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    keys: Arc<KeySet>,
}

impl TokenVerifier {
    /// Creates a verifier over a key set.
    #[must_use]
    pub fn new(keys: Arc<KeySet>) -> Self {
        Self { keys }
    }

    /// Returns the key set in use.
    #[must_use]
    pub fn key_set(&self) -> &KeySet {
        &self.keys
    }

    /// Verifies a compact token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for every failure. The detailed
    /// cause is logged.
    pub fn verify(&self, token: &str) -> AuthResult<IdTokenClaims> {
        verify(token, &self.keys).map_err(|e| {
            tracing::warn!(error = %e, "Could not verify id token");
            AuthError::from(e)
        })
    }
}
