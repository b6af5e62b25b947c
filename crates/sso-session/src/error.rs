//! Session error types.

use thiserror::Error;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session not found.
    #[error("Session not found")]
    NotFound,

    /// Session expired.
    #[error("Session expired")]
    Expired,

    /// Session has been logged out.
    #[error("Session logged out")]
    LoggedOut,
}

impl SessionError {
    /// Checks if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Checks if this is an expiration error.
    #[must_use]
    pub const fn is_expired(&self) -> bool {
        matches!(self, Self::Expired)
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
