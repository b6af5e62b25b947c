//! Session provider trait.

use async_trait::async_trait;

use crate::error::SessionResult;
use crate::user_session::UserSession;

/// Idle and absolute session timeouts, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimeouts {
    /// Maximum time between requests.
    pub idle: i64,
    /// Maximum session age.
    pub max_lifespan: i64,
}

impl Default for SessionTimeouts {
    fn default() -> Self {
        Self {
            idle: 1800,
            max_lifespan: 36_000,
        }
    }
}

/// Provider for session storage.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Stores a new session.
    async fn create(&self, session: UserSession) -> SessionResult<()>;

    /// Gets an active, unexpired session and refreshes its activity time.
    ///
    /// ## Errors
    ///
    /// Returns `NotFound`, `Expired` or `LoggedOut`.
    async fn get_active(&self, session_id: &str) -> SessionResult<UserSession>;

    /// Replaces a stored session.
    ///
    /// ## Errors
    ///
    /// Returns `NotFound` if the session does not exist.
    async fn update(&self, session: UserSession) -> SessionResult<()>;

    /// Removes a session, returning it.
    ///
    /// ## Errors
    ///
    /// Returns `NotFound` if the session does not exist.
    async fn remove(&self, session_id: &str) -> SessionResult<UserSession>;

    /// Removes every session whose notes hold `key = value`. Returns the
    /// number removed.
    async fn remove_by_note(&self, key: &str, value: &str) -> SessionResult<usize>;

    /// Purges expired and logged-out sessions. Returns the number removed.
    async fn remove_expired(&self) -> SessionResult<usize>;
}
