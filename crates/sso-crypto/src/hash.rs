//! Hash functions.
//!
//! Client secrets are stored as `base64(SHA-256(secret))` and never kept in
//! clear text. Verification hashes the presented secret and compares the
//! digests in constant time.

use aws_lc_rs::digest;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::compare::constant_time_eq;

/// Computes a SHA-256 hash of the input data.
#[must_use]
pub fn sha256(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA256, data).as_ref().to_vec()
}

/// Computes a SHA-384 hash of the input data.
#[must_use]
pub fn sha384(data: &[u8]) -> Vec<u8> {
    digest::digest(&digest::SHA384, data).as_ref().to_vec()
}

/// Hashes a client secret into its stored form.
#[must_use]
pub fn hash_secret(secret: &str) -> String {
    STANDARD.encode(sha256(secret.as_bytes()))
}

/// Checks a presented secret against a stored hash in constant time.
#[must_use]
pub fn verify_secret(presented: &str, stored_hash: &str) -> bool {
    let presented_hash = hash_secret(presented);
    constant_time_eq(presented_hash.as_bytes(), stored_hash.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_lengths() {
        assert_eq!(sha256(b"test").len(), 32);
        assert_eq!(sha384(b"test").len(), 48);
    }

    #[test]
    fn secret_hash_matches_known_value() {
        // base64(sha256("secret"))
        assert_eq!(hash_secret("secret"), "K7gNU3sdo+OL0wNhqoVWhr3g6s1xYv72ol/pe/Unols=");
    }

    #[test]
    fn verify_secret_accepts_only_matching_secret() {
        let stored = hash_secret("secret");
        assert!(verify_secret("secret", &stored));
        assert!(!verify_secret("secret ", &stored));
        assert!(!verify_secret("", &stored));
    }
}
