//! Common OIDC types and definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// OAuth 2.0 grant types accepted at the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    /// Authorization code grant (RFC 6749 Section 4.1).
    AuthorizationCode,

    /// Refresh token grant (RFC 6749 Section 6).
    RefreshToken,
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AuthorizationCode => "authorization_code",
            Self::RefreshToken => "refresh_token",
        };
        write!(f, "{s}")
    }
}

impl FromStr for GrantType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorization_code" => Ok(Self::AuthorizationCode),
            "refresh_token" => Ok(Self::RefreshToken),
            _ => Err(format!("unsupported grant type: {s}")),
        }
    }
}

/// OAuth 2.0 response types accepted at the authorization endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Authorization code response.
    Code,
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code => write!(f, "code"),
        }
    }
}

impl FromStr for ResponseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Self::Code),
            _ => Err(format!("unsupported response type: {s}")),
        }
    }
}

/// OAuth 2.0 response modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Query string parameters (default for code).
    #[default]
    Query,

    /// Auto-submitting HTML form.
    FormPost,
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Query => "query",
            Self::FormPost => "form_post",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ResponseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(Self::Query),
            "form_post" => Ok(Self::FormPost),
            _ => Err(format!("unsupported response mode: {s}")),
        }
    }
}

/// OIDC `prompt` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Prompt {
    /// No interaction; fail with `login_required` if there is no session.
    None,
    /// Force re-authentication.
    Login,
}

impl FromStr for Prompt {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "login" => Ok(Self::Login),
            _ => Err(format!("unsupported prompt: {s}")),
        }
    }
}

/// PKCE code challenge methods (RFC 7636).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CodeChallengeMethod {
    /// SHA-256 of the verifier, base64url encoded.
    #[default]
    S256,
    /// Verifier sent as-is.
    #[serde(rename = "plain")]
    Plain,
}

impl fmt::Display for CodeChallengeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        };
        write!(f, "{s}")
    }
}

impl FromStr for CodeChallengeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S256" => Ok(Self::S256),
            "plain" => Ok(Self::Plain),
            _ => Err(format!("unsupported code challenge method: {s}")),
        }
    }
}

/// Token types carried in the JWT `typ` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    /// Access token (`at+jwt`).
    Access,
    /// Identity token (`JWT`).
    Id,
    /// Refresh token (`rt+jwt`).
    Refresh,
}

impl TokenType {
    /// Returns the `typ` header value.
    #[must_use]
    pub const fn header_typ(self) -> &'static str {
        match self {
            Self::Access => "at+jwt",
            Self::Id => "JWT",
            Self::Refresh => "rt+jwt",
        }
    }
}

/// Splits a space-delimited scope string, dropping empty entries.
#[must_use]
pub fn split_scopes(scope: &str) -> Vec<String> {
    let mut scopes: Vec<String> = Vec::new();
    for s in scope.split_whitespace() {
        if !scopes.iter().any(|existing| existing == s) {
            scopes.push(s.to_string());
        }
    }
    scopes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grant_type_parsing() {
        assert_eq!(
            "authorization_code".parse::<GrantType>().ok(),
            Some(GrantType::AuthorizationCode)
        );
        assert!("client_credentials".parse::<GrantType>().is_err());
        assert_eq!(GrantType::RefreshToken.to_string(), "refresh_token");
    }

    #[test]
    fn only_code_response_type() {
        assert!("code".parse::<ResponseType>().is_ok());
        assert!("token".parse::<ResponseType>().is_err());
        assert!("code id_token".parse::<ResponseType>().is_err());
    }

    #[test]
    fn split_scopes_dedups_in_order() {
        assert_eq!(
            split_scopes("openid  profile openid WebSite1"),
            vec!["openid", "profile", "WebSite1"]
        );
        assert!(split_scopes("   ").is_empty());
    }

    #[test]
    fn pkce_method_names() {
        assert_eq!("S256".parse::<CodeChallengeMethod>().ok(), Some(CodeChallengeMethod::S256));
        assert!("s256".parse::<CodeChallengeMethod>().is_err());
    }
}
