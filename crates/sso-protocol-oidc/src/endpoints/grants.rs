//! Grant handlers for the token endpoint.
//!
//! This module implements the two grants the provider supports:
//! - `authorization_code`: exchange a code for tokens
//! - `refresh_token`: exchange a refresh token for fresh tokens
//!
//! Each handler receives an already authenticated client. Any failure of
//! the grant itself surfaces as a bare `invalid_grant`; the reason is only
//! logged.

use sso_core::{Event, EventType};
use sso_crypto::constant_time_eq;
use sso_model::{scope, Client, User};

use crate::claims::RefreshTokenClaims;
use crate::code_store::StoredAuthCode;
use crate::error::{OidcError, OidcResult};
use crate::mapper::{collect_claims, GrantedResources};
use crate::pkce;
use crate::request::TokenRequest;
use crate::token::{TokenGrant, TokenResponse};
use crate::types::{split_scopes, CodeChallengeMethod, TokenType};

use super::state::OidcState;

/// Inputs shared by every grant handler.
pub struct GrantContext<'a> {
    /// Endpoint state.
    pub state: &'a OidcState,
    /// The authenticated client.
    pub client: &'a Client,
    /// The token request.
    pub request: &'a TokenRequest,
    /// Current time (Unix seconds).
    pub now: i64,
}

impl<'a> GrantContext<'a> {
    /// Creates a grant context.
    #[must_use]
    pub const fn new(
        state: &'a OidcState,
        client: &'a Client,
        request: &'a TokenRequest,
        now: i64,
    ) -> Self {
        Self {
            state,
            client,
            request,
            now,
        }
    }

    fn client_id(&self) -> &str {
        &self.client.client_id
    }

    /// Builds the token grant for `user` and `scopes`: audiences and claims
    /// from the granted resources, the claims policy, and refresh issuance.
    async fn grant_for(&self, user: &User, scopes: Vec<String>) -> OidcResult<TokenGrant> {
        let policy = &self.state.policy;
        let granted = GrantedResources::resolve(self.state.resources.as_ref(), &scopes).await?;

        let id_claims = if policy
            .claims_policy
            .embed_in_id_token(self.client.always_include_user_claims_in_id_token)
        {
            collect_claims(user, &granted.identity_claim_types())
        } else {
            serde_json::Map::new()
        };
        let issue_refresh = scopes.iter().any(|s| s == scope::OFFLINE_ACCESS)
            && policy.offline_access.allows(self.client.allow_offline_access);

        Ok(TokenGrant {
            subject: user.subject_id.clone(),
            client_id: self.client.client_id.clone(),
            audiences: granted.audiences(),
            access_claims: collect_claims(user, &granted.api_claim_types()),
            id_claims,
            scopes,
            issue_refresh,
            ..TokenGrant::default()
        })
    }

    async fn load_subject(&self, subject_id: &str) -> OidcResult<User> {
        let user = self
            .state
            .users
            .find_by_subject(subject_id)
            .await
            .map_err(|e| invalid_grant(self.client_id(), &format!("subject lookup: {e}")))?;
        if !user.is_active {
            return Err(invalid_grant(self.client_id(), "subject is disabled"));
        }
        Ok(user)
    }
}

fn invalid_grant(client_id: &str, reason: &str) -> OidcError {
    tracing::debug!(client_id, reason, "Grant rejected");
    OidcError::InvalidGrant
}

/// The `authorization_code` grant.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthorizationCodeGrant;

impl AuthorizationCodeGrant {
    /// Redeems the code and issues tokens.
    ///
    /// The code is removed from the store before it is checked, so it is
    /// spent even when the exchange fails.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` for missing parameters and `InvalidGrant`
    /// for an unknown, spent, expired or mismatched code.
    pub async fn handle(ctx: &GrantContext<'_>) -> OidcResult<TokenResponse> {
        let code = ctx
            .request
            .code
            .as_deref()
            .ok_or_else(|| OidcError::InvalidRequest("code is required".to_string()))?;
        let redirect_uri = ctx
            .request
            .redirect_uri
            .as_deref()
            .ok_or_else(|| OidcError::InvalidRequest("redirect_uri is required".to_string()))?;

        let stored = ctx
            .state
            .codes
            .take(code)
            .await?
            .ok_or_else(|| invalid_grant(ctx.client_id(), "unknown or already redeemed code"))?;

        Self::validate_code(ctx, &stored, redirect_uri)?;

        let user = ctx.load_subject(&stored.subject_id).await?;
        let mut grant = ctx.grant_for(&user, stored.scopes.clone()).await?;
        grant.nonce.clone_from(&stored.nonce);
        grant.session_id.clone_from(&stored.session_id);
        grant.auth_time = stored.auth_time;

        let response = ctx.state.tokens.create_token_response(&grant, ctx.now)?;

        let mut event = Event::builder(EventType::CodeToToken)
            .subject(&user.subject_id)
            .client(ctx.client_id())
            .detail("scope", &response.scope);
        if let Some(sid) = &stored.session_id {
            event = event.session(sid);
        }
        event.emit();
        Ok(response)
    }

    fn validate_code(
        ctx: &GrantContext<'_>,
        code: &StoredAuthCode,
        redirect_uri: &str,
    ) -> OidcResult<()> {
        let client_id = ctx.client_id();
        if code.is_expired_at(ctx.now) {
            return Err(invalid_grant(client_id, "code expired"));
        }
        if code.client_id != client_id {
            return Err(invalid_grant(client_id, "code was issued to another client"));
        }
        if !constant_time_eq(code.redirect_uri.as_bytes(), redirect_uri.as_bytes()) {
            return Err(invalid_grant(client_id, "redirect_uri differs from the request"));
        }

        match (&code.code_challenge, ctx.request.code_verifier.as_deref()) {
            (Some(challenge), Some(verifier)) => {
                let method = code.code_challenge_method.unwrap_or(CodeChallengeMethod::Plain);
                if !pkce::verify(verifier, challenge, method) {
                    return Err(invalid_grant(client_id, "code_verifier does not match"));
                }
            }
            (Some(_), None) => return Err(invalid_grant(client_id, "code_verifier missing")),
            (None, Some(_)) => {
                return Err(invalid_grant(client_id, "code_verifier sent without a challenge"));
            }
            (None, None) => {}
        }
        Ok(())
    }
}

/// The `refresh_token` grant.
#[derive(Debug, Clone, Copy, Default)]
pub struct RefreshTokenGrant;

impl RefreshTokenGrant {
    /// Verifies the refresh token and issues fresh tokens.
    ///
    /// A narrower `scope` may be requested; the new refresh token keeps the
    /// original grant so later refreshes can widen back to it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` without a refresh token, `InvalidScope` for a
    /// scope outside the original grant, and `InvalidGrant` otherwise.
    pub async fn handle(ctx: &GrantContext<'_>) -> OidcResult<TokenResponse> {
        let token = ctx
            .request
            .refresh_token
            .as_deref()
            .ok_or_else(|| OidcError::InvalidRequest("refresh_token is required".to_string()))?;
        let client_id = ctx.client_id();

        let claims: RefreshTokenClaims = ctx
            .state
            .validator(Some(client_id), TokenType::Refresh)
            .validate_at(token, ctx.now)
            .await
            .map_err(|e| invalid_grant(client_id, &e.to_string()))?;

        if !ctx
            .state
            .policy
            .offline_access
            .allows(ctx.client.allow_offline_access)
        {
            return Err(invalid_grant(client_id, "offline access is not allowed"));
        }

        let original = split_scopes(&claims.scope);
        if !original.iter().any(|s| s == scope::OFFLINE_ACCESS) {
            return Err(invalid_grant(client_id, "grant has no offline_access"));
        }
        let requested = ctx.request.scope.as_deref().map(split_scopes);
        let scopes = match requested {
            Some(requested) if !requested.is_empty() => {
                if let Some(extra) = requested.iter().find(|s| !original.contains(s)) {
                    return Err(OidcError::InvalidScope(format!(
                        "scope '{extra}' was not part of the original grant"
                    )));
                }
                requested
            }
            _ => original.clone(),
        };

        let user = ctx.load_subject(&claims.sub).await?;
        let mut grant = ctx.grant_for(&user, scopes).await?;
        grant.session_id.clone_from(&claims.sid);
        grant.auth_time = claims.auth_time;
        grant.issue_refresh = true;
        if grant.scopes != original {
            grant.refresh_scopes = Some(original);
        }

        let response = ctx.state.tokens.create_token_response(&grant, ctx.now)?;

        Event::builder(EventType::RefreshToken)
            .subject(&user.subject_id)
            .client(client_id)
            .detail("scope", &response.scope)
            .emit();
        Ok(response)
    }
}
