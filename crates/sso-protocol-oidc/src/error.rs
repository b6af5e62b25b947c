//! OIDC protocol error types.
//!
//! Implements OAuth 2.0 and `OpenID` Connect error responses as defined in:
//! - RFC 6749 (OAuth 2.0)
//! - `OpenID` Connect Core 1.0
//!
//! Two variants deliberately carry no detail on the wire: `InvalidGrant`
//! (so a failed code or refresh exchange never says which check failed) and
//! `ServerError` (so signing or key failures never leak internals). Callers
//! log the detail before constructing them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// OIDC protocol errors.
#[derive(Debug, Error)]
pub enum OidcError {
    /// Invalid request parameters.
    #[error("{0}")]
    InvalidRequest(String),

    /// Client unknown or authentication failed.
    #[error("{0}")]
    InvalidClient(String),

    /// Redirect URI missing or not registered for the client.
    #[error("{0}")]
    InvalidRedirectUri(String),

    /// Invalid, expired, used or mismatched grant.
    #[error("The provided grant is invalid")]
    InvalidGrant,

    /// Client is not authorized for this grant type.
    #[error("{0}")]
    UnauthorizedClient(String),

    /// Unsupported grant type.
    #[error("{0}")]
    UnsupportedGrantType(String),

    /// Requested scope is unknown or not allowed for the client.
    #[error("{0}")]
    InvalidScope(String),

    /// Unsupported response type.
    #[error("{0}")]
    UnsupportedResponseType(String),

    /// The subject declined or failed authentication.
    #[error("{0}")]
    AccessDenied(String),

    /// `prompt=none` without an authenticated session.
    #[error("End-user authentication is required")]
    LoginRequired,

    /// Bearer token missing or invalid.
    #[error("{0}")]
    InvalidToken(String),

    /// Bearer token lacks a scope the resource requires.
    #[error("{0}")]
    InsufficientScope(String),

    /// Signing or key infrastructure failure.
    #[error("An internal error occurred")]
    ServerError,
}

impl OidcError {
    /// Returns the OAuth 2.0 error code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) | Self::InvalidRedirectUri(_) => "invalid_request",
            Self::InvalidClient(_) => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient(_) => "unauthorized_client",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::InvalidScope(_) => "invalid_scope",
            Self::UnsupportedResponseType(_) => "unsupported_response_type",
            Self::AccessDenied(_) => "access_denied",
            Self::LoginRequired => "login_required",
            Self::InvalidToken(_) => "invalid_token",
            Self::InsufficientScope(_) => "insufficient_scope",
            Self::ServerError => "server_error",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest(_)
            | Self::InvalidRedirectUri(_)
            | Self::InvalidScope(_)
            | Self::UnsupportedGrantType(_)
            | Self::UnsupportedResponseType(_)
            | Self::InvalidGrant
            | Self::UnauthorizedClient(_)
            | Self::LoginRequired => 400,
            Self::InvalidClient(_) | Self::InvalidToken(_) => 401,
            Self::AccessDenied(_) | Self::InsufficientScope(_) => 403,
            Self::ServerError => 500,
        }
    }

    /// Returns true if the error must not be redirected to the client,
    /// because the redirect target itself cannot be trusted.
    #[must_use]
    pub const fn is_untrusted_redirect(&self) -> bool {
        matches!(self, Self::InvalidClient(_) | Self::InvalidRedirectUri(_))
    }

    /// Creates an error response for OAuth 2.0/OIDC.
    #[must_use]
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.error_code().to_string(),
            error_description: Some(self.to_string()),
            error_uri: None,
        }
    }
}

/// OAuth 2.0 error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code.
    pub error: String,

    /// Human-readable error description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,

    /// URI with more information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

/// Result type for OIDC operations.
pub type OidcResult<T> = Result<T, OidcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_grant_is_generic() {
        let response = OidcError::InvalidGrant.to_error_response();
        assert_eq!(response.error, "invalid_grant");
        assert_eq!(
            response.error_description.as_deref(),
            Some("The provided grant is invalid")
        );
    }

    #[test]
    fn server_error_leaks_nothing() {
        let err = OidcError::ServerError;
        assert_eq!(err.http_status(), 500);
        assert_eq!(err.to_string(), "An internal error occurred");
    }

    #[test]
    fn redirect_uri_errors_use_invalid_request_code() {
        let err = OidcError::InvalidRedirectUri("not registered".into());
        assert_eq!(err.error_code(), "invalid_request");
        assert!(err.is_untrusted_redirect());
        assert!(!OidcError::InvalidScope("x".into()).is_untrusted_redirect());
    }

    #[test]
    fn status_codes() {
        assert_eq!(OidcError::InvalidClient("x".into()).http_status(), 401);
        assert_eq!(OidcError::AccessDenied("x".into()).http_status(), 403);
        assert_eq!(OidcError::InvalidScope("x".into()).http_status(), 400);
        assert_eq!(OidcError::InsufficientScope("x".into()).http_status(), 403);
    }
}
