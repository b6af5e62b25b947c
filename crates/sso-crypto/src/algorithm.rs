//! Signature algorithm definitions.
//!
//! Tokens are signed with ECDSA over P-384 (`ES384`).

use serde::{Deserialize, Serialize};

use crate::error::CryptoError;

/// Supported JWS signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    /// ECDSA using P-384 curve and SHA-384 hash.
    #[default]
    #[serde(rename = "ES384")]
    Es384,
}

impl SignatureAlgorithm {
    /// Returns the JWA algorithm name.
    #[must_use]
    pub const fn jwa_name(self) -> &'static str {
        match self {
            Self::Es384 => "ES384",
        }
    }

    /// Returns the JWK curve name.
    #[must_use]
    pub const fn curve(self) -> &'static str {
        match self {
            Self::Es384 => "P-384",
        }
    }

    /// Returns the length in bytes of one curve coordinate.
    #[must_use]
    pub const fn coordinate_len(self) -> usize {
        match self {
            Self::Es384 => 48,
        }
    }

    /// Parses a JWA algorithm name.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::UnsupportedAlgorithm` for anything but `ES384`.
    pub fn from_jwa(name: &str) -> Result<Self, CryptoError> {
        match name {
            "ES384" => Ok(Self::Es384),
            other => Err(CryptoError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.jwa_name())
    }
}
