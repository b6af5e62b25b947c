//! Error handling for the SSO workspace.
//!
//! Messages shown to end users are generic; details needed for diagnosis are
//! logged where the error originates, never carried to the response.

use thiserror::Error;

/// Result type alias using the SSO error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for SSO operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Authentication error.
    ///
    /// Uses a generic message to prevent user enumeration.
    #[error("authentication failed")]
    Authentication,

    /// Authorization error.
    #[error("access denied")]
    Authorization,

    /// Cryptographic error.
    #[error("cryptographic error: {0}")]
    Crypto(String),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// I/O error while loading keys or fixtures.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error.
    #[error("internal error")]
    Internal,
}

impl Error {
    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Crypto(_) | Self::Io(_) | Self::Internal)
    }

    /// Returns whether this error represents a client error.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Authentication | Self::Authorization | Self::Validation(_) | Self::NotFound(_)
        )
    }
}
