//! JSON Web Key Set (JWKS) types.
//!
//! Implements JWKS as defined in:
//! - [RFC 7517](https://tools.ietf.org/html/rfc7517) (JSON Web Key)
//! - [RFC 7518](https://tools.ietf.org/html/rfc7518) (JSON Web Algorithms)
//!
//! Only EC public keys are published. Keys of other types in a fetched set
//! are kept for display but never used for verification.

use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};
use sso_crypto::SignatureAlgorithm;

/// JSON Web Key Set.
///
/// A set of JSON Web Keys, returned by the JWKS endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// Array of JSON Web Keys.
    pub keys: Vec<JsonWebKey>,
}

impl JsonWebKeySet {
    /// Creates a JWKS with the given keys.
    #[must_use]
    pub const fn with_keys(keys: Vec<JsonWebKey>) -> Self {
        Self { keys }
    }

    /// Finds a key by its ID.
    #[must_use]
    pub fn find_key(&self, kid: &str) -> Option<&JsonWebKey> {
        self.keys.iter().find(|k| k.kid.as_deref() == Some(kid))
    }

    /// Returns the key IDs in publication order.
    #[must_use]
    pub fn key_ids(&self) -> Vec<&str> {
        self.keys.iter().filter_map(|k| k.kid.as_deref()).collect()
    }
}

/// JSON Web Key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key type.
    pub kty: KeyType,

    /// Public key use ("sig" for signature).
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// Algorithm intended for use with the key.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,

    /// Key ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    // === EC Key Parameters ===
    /// EC curve name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,

    /// EC x coordinate (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,

    /// EC y coordinate (base64url encoded).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
}

impl JsonWebKey {
    /// Creates an EC public signing key from base64url coordinates.
    #[must_use]
    pub fn ec_public(
        kid: impl Into<String>,
        algorithm: SignatureAlgorithm,
        x: impl Into<String>,
        y: impl Into<String>,
    ) -> Self {
        Self {
            kty: KeyType::Ec,
            key_use: Some("sig".to_string()),
            alg: Some(algorithm.jwa_name().to_string()),
            kid: Some(kid.into()),
            crv: Some(algorithm.curve().to_string()),
            x: Some(x.into()),
            y: Some(y.into()),
        }
    }

    /// Checks if this key may verify signatures.
    #[must_use]
    pub fn is_signing_key(&self) -> bool {
        self.key_use.as_deref().map_or(true, |u| u == "sig")
    }

    /// Builds a verification key.
    ///
    /// Returns `None` unless this is an EC P-384 signing key with both
    /// coordinates present.
    #[must_use]
    pub fn to_decoding_key(&self) -> Option<DecodingKey> {
        if self.kty != KeyType::Ec || !self.is_signing_key() {
            return None;
        }
        if self.crv.as_deref() != Some(SignatureAlgorithm::Es384.curve()) {
            return None;
        }
        let (x, y) = (self.x.as_deref()?, self.y.as_deref()?);
        DecodingKey::from_ec_components(x, y).ok()
    }
}

/// Key type for JWK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// RSA key.
    #[serde(rename = "RSA")]
    Rsa,

    /// Elliptic Curve key.
    #[serde(rename = "EC")]
    Ec,

    /// Octet sequence (symmetric key).
    #[serde(rename = "oct")]
    Oct,

    /// Octet Key Pair (Ed25519, X25519).
    #[serde(rename = "OKP")]
    Okp,
}
