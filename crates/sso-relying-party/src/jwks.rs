//! Remote key set cache.
//!
//! Keys are fetched from the provider's `jwks_uri` and indexed by `kid`.
//! An unknown `kid` triggers a refresh, at most once per cooldown window,
//! so a flood of forged tokens cannot turn into a flood of fetches. A set
//! older than its max age is refetched before use, which drops keys the
//! provider no longer publishes. A failed fetch leaves the cached keys in
//! place.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::DecodingKey;
use parking_lot::{Mutex, RwLock};
use sso_protocol_oidc::{JsonWebKey, JsonWebKeySet, KeySource};

use crate::error::{RelyingPartyError, RelyingPartyResult};

/// Default lifetime of a fetched key set.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(300);

/// Key set fetched from a provider and cached in memory.
pub struct RemoteJwks {
    http: reqwest::Client,
    jwks_uri: String,
    cooldown: Duration,
    max_age: Duration,
    keys: RwLock<JsonWebKeySet>,
    fetched_at: Mutex<Option<Instant>>,
    last_attempt: Mutex<Option<Instant>>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for RemoteJwks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteJwks")
            .field("jwks_uri", &self.jwks_uri)
            .field("cooldown", &self.cooldown)
            .field("max_age", &self.max_age)
            .field("cached", &self.keys.read().keys.len())
            .finish_non_exhaustive()
    }
}

impl RemoteJwks {
    /// Creates an empty cache for `jwks_uri` using `http`, whose timeout
    /// bounds every fetch.
    #[must_use]
    pub fn new(http: reqwest::Client, jwks_uri: impl Into<String>, cooldown: Duration) -> Self {
        Self {
            http,
            jwks_uri: jwks_uri.into(),
            cooldown,
            max_age: DEFAULT_MAX_AGE,
            keys: RwLock::new(JsonWebKeySet::default()),
            fetched_at: Mutex::new(None),
            last_attempt: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Creates an empty cache with its own client limited to `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `RelyingPartyError::Http` if the client cannot be built.
    pub fn with_timeout(
        jwks_uri: impl Into<String>,
        timeout: Duration,
        cooldown: Duration,
    ) -> RelyingPartyResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::new(http, jwks_uri, cooldown))
    }

    /// Sets how long a fetched key set is trusted before it is refetched.
    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Returns the key set URL.
    #[must_use]
    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }

    /// Returns the ids of the cached keys.
    #[must_use]
    pub fn key_ids(&self) -> Vec<String> {
        self.keys
            .read()
            .key_ids()
            .into_iter()
            .map(String::from)
            .collect()
    }

    /// Fetches the key set and replaces the cache. Returns the number of
    /// signing keys now cached.
    ///
    /// # Errors
    ///
    /// Returns `RelyingPartyError::Http` when the fetch fails or times out,
    /// and `RelyingPartyError::Discovery` for a non-success status. The
    /// cache is left untouched.
    pub async fn refresh(&self) -> RelyingPartyResult<usize> {
        *self.last_attempt.lock() = Some(Instant::now());

        let response = self.http.get(&self.jwks_uri).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RelyingPartyError::Discovery(format!(
                "key set request returned {status}"
            )));
        }
        let fetched: JsonWebKeySet = response.json().await?;

        let signing: Vec<JsonWebKey> = fetched
            .keys
            .into_iter()
            .filter(JsonWebKey::is_signing_key)
            .collect();
        let count = signing.len();
        *self.keys.write() = JsonWebKeySet::with_keys(signing);
        *self.fetched_at.lock() = Some(Instant::now());
        tracing::debug!(jwks_uri = %self.jwks_uri, keys = count, "Key set refreshed");
        Ok(count)
    }

    fn cached_key(&self, kid: &str) -> Option<DecodingKey> {
        self.keys
            .read()
            .find_key(kid)
            .and_then(JsonWebKey::to_decoding_key)
    }

    fn is_stale(&self) -> bool {
        self.fetched_at
            .lock()
            .map_or(true, |at| at.elapsed() >= self.max_age)
    }

    fn refresh_allowed(&self) -> bool {
        self.last_attempt
            .lock()
            .map_or(true, |at| at.elapsed() >= self.cooldown)
    }
}

#[async_trait]
impl KeySource for RemoteJwks {
    async fn verification_key(&self, kid: &str, _now: i64) -> Option<DecodingKey> {
        if !self.is_stale() {
            if let Some(key) = self.cached_key(kid) {
                return Some(key);
            }
        }

        let _guard = self.refresh_lock.lock().await;
        // Another task may have refreshed while we waited.
        let stale = self.is_stale();
        if !stale {
            if let Some(key) = self.cached_key(kid) {
                return Some(key);
            }
        }
        if !self.refresh_allowed() {
            tracing::debug!(kid, stale, "Key set refresh still cooling down");
            return self.cached_key(kid);
        }
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, jwks_uri = %self.jwks_uri, "Key set refresh failed; serving cached keys");
        }
        self.cached_key(kid)
    }
}
