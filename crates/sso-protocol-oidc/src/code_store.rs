//! Authorization code storage.
//!
//! Codes are stored under the SHA-256 hash of their value, so a leaked
//! store snapshot cannot be replayed. Redemption is a single
//! compare-and-delete: the entry leaves the map before anything about it is
//! checked, which means two racing redemptions can never both see it.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sso_crypto::sha256;

use crate::error::OidcResult;
use crate::types::CodeChallengeMethod;

/// An issued authorization code, as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAuthCode {
    /// Hash of the code value.
    pub code_hash: String,
    /// Client the code was issued to.
    pub client_id: String,
    /// Subject who authenticated.
    pub subject_id: String,
    /// Redirect URI from the authorization request.
    pub redirect_uri: String,
    /// Granted scopes, in request order.
    pub scopes: Vec<String>,
    /// Nonce from the authorization request.
    pub nonce: Option<String>,
    /// PKCE code challenge.
    pub code_challenge: Option<String>,
    /// PKCE code challenge method.
    pub code_challenge_method: Option<CodeChallengeMethod>,
    /// Provider session the code was issued under.
    pub session_id: Option<String>,
    /// When the subject authenticated (Unix seconds).
    pub auth_time: Option<i64>,
    /// When the code was issued (Unix seconds).
    pub issued_at: i64,
    /// When the code stops being redeemable (Unix seconds).
    pub expires_at: i64,
}

/// Parameters for a new authorization code.
#[derive(Debug, Clone)]
pub struct AuthCodeParams {
    /// Client the code is for.
    pub client_id: String,
    /// Subject who authenticated.
    pub subject_id: String,
    /// Redirect URI from the request.
    pub redirect_uri: String,
    /// Granted scopes.
    pub scopes: Vec<String>,
    /// Lifetime in seconds.
    pub ttl_seconds: i64,
}

impl StoredAuthCode {
    /// Creates a stored code for the raw `code` value.
    #[must_use]
    pub fn new(code: &str, params: AuthCodeParams, now: i64) -> Self {
        Self {
            code_hash: hash_code(code),
            client_id: params.client_id,
            subject_id: params.subject_id,
            redirect_uri: params.redirect_uri,
            scopes: params.scopes,
            nonce: None,
            code_challenge: None,
            code_challenge_method: None,
            session_id: None,
            auth_time: None,
            issued_at: now,
            expires_at: now + params.ttl_seconds,
        }
    }

    /// Sets the nonce.
    #[must_use]
    pub fn with_nonce(mut self, nonce: Option<String>) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets PKCE parameters.
    #[must_use]
    pub fn with_pkce(
        mut self,
        challenge: Option<String>,
        method: Option<CodeChallengeMethod>,
    ) -> Self {
        self.code_challenge = challenge;
        self.code_challenge_method = method;
        self
    }

    /// Binds the code to a provider session.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>, auth_time: i64) -> Self {
        self.session_id = Some(session_id.into());
        self.auth_time = Some(auth_time);
        self
    }

    /// Checks if the code has expired at `now`.
    #[must_use]
    pub const fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Hashes a code value for storage.
#[must_use]
pub fn hash_code(code: &str) -> String {
    URL_SAFE_NO_PAD.encode(sha256(code.as_bytes()))
}

/// Storage for authorization codes.
#[async_trait]
pub trait AuthCodeStore: Send + Sync {
    /// Stores a code.
    async fn store(&self, code: StoredAuthCode) -> OidcResult<()>;

    /// Atomically removes and returns the code with the given raw value.
    ///
    /// At most one caller ever receives a given code. Validation of the
    /// returned entry is the caller's job.
    async fn take(&self, code: &str) -> OidcResult<Option<StoredAuthCode>>;

    /// Removes expired codes. Returns the number removed.
    async fn remove_expired(&self, now: i64) -> OidcResult<usize>;
}

/// In-memory code store.
#[derive(Debug, Default)]
pub struct InMemoryAuthCodeStore {
    codes: DashMap<String, StoredAuthCode>,
}

impl InMemoryAuthCodeStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of codes held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Returns true if no codes are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[async_trait]
impl AuthCodeStore for InMemoryAuthCodeStore {
    async fn store(&self, code: StoredAuthCode) -> OidcResult<()> {
        self.codes.insert(code.code_hash.clone(), code);
        Ok(())
    }

    async fn take(&self, code: &str) -> OidcResult<Option<StoredAuthCode>> {
        Ok(self.codes.remove(&hash_code(code)).map(|(_, stored)| stored))
    }

    async fn remove_expired(&self, now: i64) -> OidcResult<usize> {
        let before = self.codes.len();
        self.codes.retain(|_, c| !c.is_expired_at(now));
        let removed = before.saturating_sub(self.codes.len());
        if removed > 0 {
            tracing::debug!(removed, "Expired authorization codes purged");
        }
        Ok(removed)
    }
}
