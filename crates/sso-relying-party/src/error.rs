//! Relying-party error types.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use sso_protocol_oidc::OidcError;
use thiserror::Error;

/// Relying-party error type.
#[derive(Debug, Error)]
pub enum RelyingPartyError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The discovery document is unusable.
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// The token endpoint refused the request.
    #[error("token endpoint error: {error}")]
    TokenEndpoint {
        /// HTTP status code.
        status: u16,
        /// OAuth error code.
        error: String,
        /// Error description, if any.
        description: Option<String>,
    },

    /// The provider redirected back with an error.
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// The sign-in callback did not match a pending request.
    #[error("invalid callback: {0}")]
    InvalidCallback(String),

    /// A token failed validation.
    #[error("token rejected: {0}")]
    Token(#[from] OidcError),

    /// No bearer token was presented.
    #[error("missing bearer token")]
    MissingBearer,

    /// Session store failure.
    #[error("session error: {0}")]
    Session(#[from] sso_session::SessionError),
}

impl RelyingPartyError {
    /// Returns the HTTP status shown to the browser or API caller.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Token(_) | Self::MissingBearer => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) | Self::InvalidCallback(_) => StatusCode::BAD_REQUEST,
            Self::Http(_) | Self::Discovery(_) | Self::TokenEndpoint { .. } => {
                StatusCode::BAD_GATEWAY
            }
            Self::Config(_) | Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelyingPartyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        let mut response = (status, self.to_string()).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer error=\"invalid_token\""),
            );
        }
        response
    }
}

/// Relying-party result type.
pub type RelyingPartyResult<T> = Result<T, RelyingPartyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_challenge_the_caller() {
        let response = RelyingPartyError::MissingBearer.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[test]
    fn upstream_failures_are_bad_gateway() {
        let err = RelyingPartyError::TokenEndpoint {
            status: 400,
            error: "invalid_grant".into(),
            description: None,
        };
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.to_string(), "token endpoint error: invalid_grant");
    }
}
