//! Relying-party application state.

use std::sync::Arc;
use std::time::Duration;

use axum_extra::extract::cookie::{Cookie, SameSite};
use dashmap::DashMap;
use sso_session::{InMemorySessionProvider, SessionProvider, SessionTimeouts};

use crate::client::{OidcClient, PendingSignIn};
use crate::config::RelyingPartyConfig;
use crate::error::RelyingPartyResult;

/// How long a started sign-in may take.
pub const PENDING_SIGN_IN_TTL: Duration = Duration::from_secs(600);

/// Most sign-ins kept awaiting their callback at once.
pub const MAX_PENDING_SIGN_INS: usize = 10_000;

/// Shared state of a relying-party site.
#[derive(Clone)]
pub struct RpState {
    /// Site configuration.
    pub config: Arc<RelyingPartyConfig>,
    /// Provider client.
    pub client: Arc<OidcClient>,
    /// Local sessions, keyed by the session cookie.
    pub sessions: Arc<dyn SessionProvider>,
    /// Sign-ins awaiting their callback, keyed by `state`.
    pub pending: Arc<DashMap<String, PendingSignIn>>,
    /// Bound on `pending`; the oldest sign-in is evicted beyond it.
    pub pending_limit: usize,
}

impl RpState {
    /// Creates state with in-memory sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: RelyingPartyConfig) -> RelyingPartyResult<Self> {
        let config = Arc::new(config);
        let client = Arc::new(OidcClient::new(Arc::clone(&config))?);
        Ok(Self {
            config,
            client,
            sessions: Arc::new(InMemorySessionProvider::new(SessionTimeouts::default())),
            pending: Arc::new(DashMap::new()),
            pending_limit: MAX_PENDING_SIGN_INS,
        })
    }

    /// Remembers a started sign-in. At the limit, expired sign-ins are
    /// dropped first and then the oldest one.
    pub fn remember(&self, pending: PendingSignIn) {
        if self.pending.len() >= self.pending_limit {
            self.purge_pending();
        }
        while self.pending.len() >= self.pending_limit.max(1) {
            let oldest = self
                .pending
                .iter()
                .min_by_key(|entry| entry.value().started)
                .map(|entry| entry.key().clone());
            let Some(oldest) = oldest else { break };
            self.pending.remove(&oldest);
            tracing::warn!(limit = self.pending_limit, "Pending sign-in limit reached; evicted oldest");
        }
        self.pending.insert(pending.state.clone(), pending);
    }

    /// Drops sign-ins older than [`PENDING_SIGN_IN_TTL`]. Returns the number
    /// removed.
    pub fn purge_pending(&self) -> usize {
        let before = self.pending.len();
        self.pending
            .retain(|_, p| p.started.elapsed() < PENDING_SIGN_IN_TTL);
        before.saturating_sub(self.pending.len())
    }

    /// Takes the sign-in started with `state`, if it has not expired.
    #[must_use]
    pub fn take_pending(&self, state: &str) -> Option<PendingSignIn> {
        let (_, pending) = self.pending.remove(state)?;
        (pending.started.elapsed() < PENDING_SIGN_IN_TTL).then_some(pending)
    }

    fn secure(&self) -> bool {
        self.config.base_url.starts_with("https://")
    }

    /// Builds the session cookie for `session_id`.
    #[must_use]
    pub fn session_cookie(&self, session_id: &str) -> Cookie<'static> {
        cookie(self.config.cookie_name(), session_id.to_string(), self.secure())
    }

    /// Builds the cookie tying a pending sign-in to this browser.
    #[must_use]
    pub fn correlation_cookie(&self, state: &str) -> Cookie<'static> {
        let mut cookie = cookie(
            self.config.correlation_cookie_name(),
            state.to_string(),
            self.secure(),
        );
        cookie.set_max_age(time::Duration::seconds(
            i64::try_from(PENDING_SIGN_IN_TTL.as_secs()).unwrap_or(600),
        ));
        cookie
    }

    /// Builds an expired cookie named `name`.
    #[must_use]
    pub fn removal_cookie(&self, name: String) -> Cookie<'static> {
        let mut cookie = cookie(name, String::new(), self.secure());
        cookie.set_max_age(time::Duration::ZERO);
        cookie
    }
}

fn cookie(name: String, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}
