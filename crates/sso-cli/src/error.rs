//! CLI error types.

use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provider returned an unexpected response.
    #[error("provider error: {status} - {message}")]
    Provider {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Signature verification failed.
    #[error("verification failed: {0}")]
    Verification(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] sso_crypto::CryptoError),

    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
