//! # sso-crypto
//!
//! Cryptographic primitives for the SSO provider using aws-lc-rs.
//!
//! - SHA-256 for client secret hashes and PKCE `S256`
//! - SHA-384 for token hash claims (`at_hash`) under ES384
//! - ECDSA P-384 key generation for token signing
//! - Constant-time comparison for secrets, credentials and codes
//! - Secure random identifiers

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod compare;
pub mod error;
pub mod hash;
pub mod keys;
pub mod random;

pub use algorithm::SignatureAlgorithm;
pub use compare::constant_time_eq;
pub use error::{CryptoError, CryptoResult};
pub use hash::{hash_secret, sha256, sha384, verify_secret};
pub use keys::EcKeyMaterial;
