//! OIDC request types.
//!
//! Every field is optional at the extraction layer so that a missing
//! parameter produces a protocol error rather than a framework rejection.

use serde::{Deserialize, Serialize};

use crate::types::{split_scopes, GrantType, Prompt};

/// Authorization endpoint request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorizationRequest {
    /// Response type (required, must be `code`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,

    /// Client ID (required).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Redirect URI (required, exact match).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// Scope (space-separated).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// State parameter, echoed back unchanged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Response mode (`query` or `form_post`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<String>,

    /// Nonce, copied into the identity token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Prompt values (space-separated).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Login hint (username).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_hint: Option<String>,

    /// PKCE code challenge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,

    /// PKCE code challenge method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<String>,
}

impl AuthorizationRequest {
    /// Parses the prompt parameter, ignoring unknown values.
    #[must_use]
    pub fn prompt_values(&self) -> Vec<Prompt> {
        self.prompt
            .as_deref()
            .map(|p| p.split_whitespace().filter_map(|s| s.parse().ok()).collect())
            .unwrap_or_default()
    }

    /// Checks if the prompt includes "none".
    #[must_use]
    pub fn is_prompt_none(&self) -> bool {
        self.prompt_values().contains(&Prompt::None)
    }

    /// Checks if re-authentication is forced.
    #[must_use]
    pub fn requires_login(&self) -> bool {
        self.prompt_values().contains(&Prompt::Login)
    }

    /// Returns the requested scopes, de-duplicated, in request order.
    #[must_use]
    pub fn scopes(&self) -> Vec<String> {
        self.scope.as_deref().map(split_scopes).unwrap_or_default()
    }

    /// Checks if `openid` scope is requested.
    #[must_use]
    pub fn is_oidc_request(&self) -> bool {
        self.scopes().iter().any(|s| s == "openid")
    }
}

/// Token endpoint request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenRequest {
    /// Grant type (required).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_type: Option<String>,

    /// Authorization code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Redirect URI used at the authorization step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// Client ID (`client_secret_post`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// Client secret (`client_secret_post`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Narrowed scope for refresh.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// PKCE code verifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
}

impl TokenRequest {
    /// Parses the grant type.
    ///
    /// # Errors
    ///
    /// Returns a message if the grant type is missing or unsupported.
    pub fn parsed_grant_type(&self) -> Result<GrantType, String> {
        self.grant_type
            .as_deref()
            .ok_or_else(|| "grant_type is required".to_string())?
            .parse()
    }
}

/// End session (logout) request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EndSessionRequest {
    /// Identity token previously issued to the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token_hint: Option<String>,

    /// Where to send the browser afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_logout_redirect_uri: Option<String>,

    /// State, echoed on the post-logout redirect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Client ID when no `id_token_hint` is given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}
