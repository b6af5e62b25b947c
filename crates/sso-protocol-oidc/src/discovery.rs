//! `OpenID` Connect Discovery.
//!
//! Implements the `OpenID` Provider Metadata document as defined in
//! `OpenID` Connect Discovery 1.0.

use serde::{Deserialize, Serialize};

use crate::types::{CodeChallengeMethod, GrantType, ResponseMode};

/// Path of the discovery document.
pub const WELL_KNOWN_PATH: &str = "/.well-known/openid-configuration";
/// Path of the published key set.
pub const JWKS_PATH: &str = "/.well-known/openid-configuration/jwks";
/// Path of the authorization endpoint.
pub const AUTHORIZE_PATH: &str = "/connect/authorize";
/// Path of the token endpoint.
pub const TOKEN_PATH: &str = "/connect/token";
/// Path of the userinfo endpoint.
pub const USERINFO_PATH: &str = "/connect/userinfo";
/// Path of the end session endpoint.
pub const END_SESSION_PATH: &str = "/connect/endsession";

/// Subject identifier types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectType {
    /// Same subject identifier for all clients.
    Public,
}

/// `OpenID` Provider Metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderMetadata {
    // === Required Fields ===
    /// Issuer identifier URL.
    pub issuer: String,

    /// URL of the authorization endpoint.
    pub authorization_endpoint: String,

    /// URL of the token endpoint.
    pub token_endpoint: String,

    /// URL of the JSON Web Key Set.
    pub jwks_uri: String,

    /// Supported response types.
    pub response_types_supported: Vec<String>,

    /// Supported subject identifier types.
    pub subject_types_supported: Vec<SubjectType>,

    /// Supported signing algorithms for ID tokens.
    pub id_token_signing_alg_values_supported: Vec<String>,

    // === Recommended Fields ===
    /// URL of the `UserInfo` endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userinfo_endpoint: Option<String>,

    /// URL of the end session (logout) endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_session_endpoint: Option<String>,

    /// Supported scopes.
    #[serde(default)]
    pub scopes_supported: Vec<String>,

    /// Supported claims.
    #[serde(default)]
    pub claims_supported: Vec<String>,

    /// Supported response modes.
    #[serde(default)]
    pub response_modes_supported: Vec<ResponseMode>,

    /// Supported grant types.
    #[serde(default)]
    pub grant_types_supported: Vec<String>,

    /// Supported client authentication methods for the token endpoint.
    #[serde(default)]
    pub token_endpoint_auth_methods_supported: Vec<String>,

    /// Supported PKCE methods.
    #[serde(default)]
    pub code_challenge_methods_supported: Vec<CodeChallengeMethod>,

    /// Whether front-channel logout is supported.
    #[serde(default)]
    pub frontchannel_logout_supported: bool,

    /// Whether front-channel logout carries `iss` and `sid`.
    #[serde(default)]
    pub frontchannel_logout_session_supported: bool,
}

/// Builder for creating `ProviderMetadata`.
#[derive(Debug, Clone)]
pub struct ProviderMetadataBuilder {
    issuer: String,
    scopes: Vec<String>,
    claims: Vec<String>,
}

impl ProviderMetadataBuilder {
    /// Creates a new builder for `issuer`.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into().trim_end_matches('/').to_string(),
            scopes: Vec::new(),
            claims: Vec::new(),
        }
    }

    /// Sets the advertised scopes.
    #[must_use]
    pub fn scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Sets the advertised claims.
    #[must_use]
    pub fn claims(mut self, claims: Vec<String>) -> Self {
        self.claims = claims;
        self
    }

    /// Builds the provider metadata.
    #[must_use]
    pub fn build(self) -> ProviderMetadata {
        let base = &self.issuer;
        ProviderMetadata {
            issuer: base.clone(),
            authorization_endpoint: format!("{base}{AUTHORIZE_PATH}"),
            token_endpoint: format!("{base}{TOKEN_PATH}"),
            jwks_uri: format!("{base}{JWKS_PATH}"),
            response_types_supported: vec!["code".to_string()],
            subject_types_supported: vec![SubjectType::Public],
            id_token_signing_alg_values_supported: vec!["ES384".to_string()],
            userinfo_endpoint: Some(format!("{base}{USERINFO_PATH}")),
            end_session_endpoint: Some(format!("{base}{END_SESSION_PATH}")),
            scopes_supported: self.scopes,
            claims_supported: self.claims,
            response_modes_supported: vec![ResponseMode::Query, ResponseMode::FormPost],
            grant_types_supported: vec![
                GrantType::AuthorizationCode.to_string(),
                GrantType::RefreshToken.to_string(),
            ],
            token_endpoint_auth_methods_supported: vec![
                "client_secret_basic".to_string(),
                "client_secret_post".to_string(),
            ],
            code_challenge_methods_supported: vec![
                CodeChallengeMethod::S256,
                CodeChallengeMethod::Plain,
            ],
            frontchannel_logout_supported: true,
            frontchannel_logout_session_supported: true,
        }
    }
}
