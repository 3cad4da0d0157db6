//! JSON Web Keys and key sets.
//!
//! A [`KeySet`] is parsed once from the provider's published JWKS document
//! and never mutated afterwards. Keys that lack `kid`, `kty` or `alg` are
//! dropped individually; the rest of the document is still usable.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::{TokenError, b64_decode};
use crate::federation::jwks::JwksError;

/// A single JSON Web Key.
///
/// Only the registered header parameters are modelled as fields. Everything
/// else, including the algorithm-specific key material (`n`/`e` for RSA,
/// `crv`/`x`/`y` for EC, `k` for symmetric keys), is kept in `additional`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key identifier.
    pub kid: String,

    /// Key type (`RSA`, `EC`, `oct`).
    pub kty: String,

    /// Algorithm the key is meant to be used with.
    pub alg: String,

    /// Intended use (`sig`, `enc`).
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Permitted operations. Some providers publish a single string.
    #[serde(
        default,
        deserialize_with = "deserialize_key_ops",
        skip_serializing_if = "Option::is_none"
    )]
    pub key_ops: Option<Vec<String>>,

    /// X.509 certificate URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5u: Option<String>,

    /// X.509 certificate chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,

    /// X.509 certificate SHA-1 thumbprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5t: Option<String>,

    /// Remaining members, preserved but not validated.
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

fn deserialize_key_ops<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
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
        Some(OneOrMany::One(op)) => Some(vec![op]),
        Some(OneOrMany::Many(ops)) => Some(ops),
        None => None,
    })
}

impl JsonWebKey {
    /// Returns a string member from the key material.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.additional.get(name).and_then(Value::as_str)
    }

    /// Decodes a base64url member from the key material.
    pub(crate) fn decoded_param(&self, name: &str) -> Result<Vec<u8>, TokenError> {
        let encoded = self.param(name).ok_or_else(|| {
            TokenError::InvalidKey(format!("key {} has no '{name}' member", self.kid))
        })?;
        b64_decode(encoded).map_err(|e| {
            TokenError::InvalidKey(format!("key {} member '{name}': {e}", self.kid))
        })
    }

    /// Returns `true` if the key is published for signature verification.
    #[must_use]
    pub fn is_signing_key(&self) -> bool {
        self.usage.as_deref().is_none_or(|u| u == "sig")
    }
}

/// An ordered, read-only collection of keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeySet {
    keys: Vec<JsonWebKey>,
}

#[derive(Deserialize)]
struct KeySetDocument {
    #[serde(default)]
    keys: Option<Vec<Value>>,
}

impl KeySet {
    /// Creates a key set from already parsed keys.
    #[must_use]
    pub fn new(keys: Vec<JsonWebKey>) -> Self {
        Self { keys }
    }

    /// Parses a JWKS document.
    ///
    /// # Errors
    ///
    /// Returns `JwksError::ParseError` if the document is not JSON and
    /// `JwksError::NoKeys` if the `keys` member is missing, empty, or holds
    /// no usable key.
    pub fn from_json(document: &str) -> Result<Self, JwksError> {
        Self::from_slice(document.as_bytes())
    }

    /// Parses a JWKS document from raw bytes.
    ///
    /// # Errors
    ///
    /// See [`KeySet::from_json`].
    pub fn from_slice(document: &[u8]) -> Result<Self, JwksError> {
        let doc: KeySetDocument =
            serde_json::from_slice(document).map_err(|e| JwksError::ParseError(e.to_string()))?;

        let raw_keys = doc.keys.unwrap_or_default();
        if raw_keys.is_empty() {
            return Err(JwksError::NoKeys);
        }

        let mut keys = Vec::with_capacity(raw_keys.len());
        for (index, raw) in raw_keys.into_iter().enumerate() {
            match serde_json::from_value::<JsonWebKey>(raw) {
                Ok(key) => keys.push(key),
                Err(e) => {
                    tracing::warn!(index, error = %e, "Skipping unusable JWK");
                }
            }
        }

        if keys.is_empty() {
            return Err(JwksError::NoKeys);
        }

        Ok(Self { keys })
    }

    /// Finds a key by its identifier.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&JsonWebKey> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    /// Returns all keys in document order.
    #[must_use]
    pub fn keys(&self) -> &[JsonWebKey] {
        &self.keys
    }

    /// Returns the number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the set holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
