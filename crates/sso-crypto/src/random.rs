//! Cryptographically secure random generation.
//!
//! Used for authorization codes, IdP session ids, token ids, relying-party
//! `state` and `nonce` values, and PKCE verifiers.

use rand::distr::{Alphanumeric, SampleString};
use rand::Rng;

/// Generates `len` random bytes from the thread-local CSPRNG.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

/// Generates a random alphanumeric string of `len` characters.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    Alphanumeric.sample_string(&mut rng, len)
}

/// Generates an authorization code.
///
/// 43 base64url characters over 32 random bytes (256 bits of entropy).
#[must_use]
pub fn generate_auth_code() -> String {
    random_base64url(32)
}

/// Generates a token identifier for the `jti` claim.
#[must_use]
pub fn generate_token_id() -> String {
    random_alphanumeric(24)
}

/// Generates an IdP or relying-party session identifier.
#[must_use]
pub fn generate_session_id() -> String {
    random_alphanumeric(32)
}

/// Generates a client secret suitable for registration.
#[must_use]
pub fn generate_client_secret() -> String {
    random_alphanumeric(32)
}

/// Generates a URL-safe base64 string over `byte_len` random bytes.
#[must_use]
pub fn random_base64url(byte_len: usize) -> String {
    let bytes = random_bytes(byte_len);
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}
