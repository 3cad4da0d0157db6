//! Compact signed tokens (JWS) and their verification keys.
//!
//! - [`jwk`] - JSON Web Keys and the read-only [`KeySet`]
//! - [`algorithm`] - lookup table from `alg` names to verification functions
//! - [`verifier`] - token parsing and [`TokenVerifier`]

pub mod algorithm;
pub mod jwk;
pub mod verifier;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

pub use algorithm::{VerifyFn, supported_algorithms, verifier_for};
pub use jwk::{JsonWebKey, KeySet};
pub use verifier::{IdTokenClaims, SignedToken, TokenHeader, TokenVerifier, verify};

/// base64url without padding on encode, padding optional on decode.
pub(crate) const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

pub(crate) fn b64_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64URL.decode(input)
}

/// Detailed token verification failures.
///
/// These never leave the crate's public authentication contract; they are
/// logged and collapsed into [`AuthError::InvalidToken`](crate::AuthError::InvalidToken).
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token is not three base64url JSON segments.
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// The token header has no `kid`.
    #[error("Token header is missing key ID (kid)")]
    MissingKeyId,

    /// No key in the key set has the token's `kid`.
    #[error("No key found for kid: {0}")]
    KeyNotFound(String),

    /// The `alg` name is not in the algorithm table.
    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The key was published for a different algorithm than the token claims.
    #[error("Algorithm mismatch: key is {key}, token is {token}")]
    AlgorithmMismatch {
        /// The key's declared algorithm.
        key: String,
        /// The token header's algorithm.
        token: String,
    },

    /// The key material is unusable for the algorithm.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// The signature does not verify.
    #[error("Invalid signature")]
    InvalidSignature,
}
