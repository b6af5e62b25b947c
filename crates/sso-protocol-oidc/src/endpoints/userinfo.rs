//! `UserInfo` endpoint handler.
//!
//! Implements GET/POST `/connect/userinfo` for returning user claims.

use axum::{
    extract::{rejection::FormRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use sso_core::{Event, EventType};
use sso_model::scope;

use crate::claims::AccessTokenClaims;
use crate::error::{OidcError, OidcResult};
use crate::mapper::{collect_claims, GrantedResources};
use crate::types::TokenType;

use super::response::{error_response, www_authenticate};
use super::state::OidcState;

/// Form body accepted by POST `/connect/userinfo` (RFC 6750 section 2.2).
#[derive(Debug, Default, Deserialize)]
pub struct UserInfoForm {
    /// Access token sent in the body.
    pub access_token: Option<String>,
}

/// GET `/connect/userinfo`
///
/// # Authorization
///
/// Requires `Authorization: Bearer <access_token>`.
///
/// # Responses
///
/// - 200 OK: `UserInfo` JSON
/// - 401 Unauthorized: Invalid or missing token
/// - 403 Forbidden: Token was not granted `openid`
pub async fn userinfo_get(State(state): State<OidcState>, headers: HeaderMap) -> Response {
    respond(handle_userinfo_request(&state, &headers, None).await)
}

/// POST `/connect/userinfo`
///
/// Same as GET; the token may also come from the form body.
pub async fn userinfo_post(
    State(state): State<OidcState>,
    headers: HeaderMap,
    form: Result<Form<UserInfoForm>, FormRejection>,
) -> Response {
    let body_token = form.ok().and_then(|Form(f)| f.access_token);
    respond(handle_userinfo_request(&state, &headers, body_token).await)
}

fn respond(result: OidcResult<Map<String, Value>>) -> Response {
    match result {
        Ok(claims) => (StatusCode::OK, Json(claims)).into_response(),
        Err(ref err) => userinfo_error_response(err),
    }
}

async fn handle_userinfo_request(
    state: &OidcState,
    headers: &HeaderMap,
    body_token: Option<String>,
) -> OidcResult<Map<String, Value>> {
    let access_token = match extract_bearer_token(headers) {
        Ok(token) => token,
        Err(err) => body_token.filter(|t| !t.is_empty()).ok_or(err)?,
    };

    let claims: AccessTokenClaims = match state
        .validator(None, TokenType::Access)
        .validate(&access_token)
        .await
    {
        Ok(claims) => claims,
        Err(err) => {
            Event::builder(EventType::UserInfoRequestError)
                .failure(err.error_code())
                .emit();
            return Err(err);
        }
    };

    let result = claims_for(state, &claims).await;
    match &result {
        Ok(_) => Event::builder(EventType::UserInfoRequest)
            .subject(&claims.sub)
            .client(&claims.client_id)
            .emit(),
        Err(err) => Event::builder(EventType::UserInfoRequestError)
            .subject(&claims.sub)
            .client(&claims.client_id)
            .failure(err.error_code())
            .emit(),
    }
    result
}

async fn claims_for(state: &OidcState, token: &AccessTokenClaims) -> OidcResult<Map<String, Value>> {
    let scopes: Vec<String> = token.scopes().into_iter().map(String::from).collect();
    if !scopes.iter().any(|s| s == scope::OPENID) {
        return Err(OidcError::InsufficientScope(
            "the openid scope is required".to_string(),
        ));
    }

    let user = state.users.find_by_subject(&token.sub).await.map_err(|e| {
        tracing::debug!(subject = %token.sub, error = %e, "Token subject not found");
        OidcError::InvalidToken("unknown subject".to_string())
    })?;
    if !user.is_active {
        return Err(OidcError::InvalidToken("subject is disabled".to_string()));
    }

    let granted = GrantedResources::resolve(state.resources.as_ref(), &scopes).await?;
    let mut body = Map::new();
    body.insert("sub".to_string(), Value::String(user.subject_id.clone()));
    body.extend(collect_claims(&user, &granted.identity_claim_types()));
    Ok(body)
}

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(headers: &HeaderMap) -> OidcResult<String> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| OidcError::InvalidToken("missing authorization header".to_string()))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| OidcError::InvalidToken("invalid authorization header".to_string()))?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or_else(|| OidcError::InvalidToken("expected Bearer token".to_string()))?;

    Ok(token.trim().to_string())
}

/// Adds the RFC 6750 challenge to 401 and 403 responses.
fn userinfo_error_response(err: &OidcError) -> Response {
    let mut response = error_response(err);
    if matches!(
        err,
        OidcError::InvalidToken(_) | OidcError::InsufficientScope(_)
    ) {
        if let Some(challenge) = www_authenticate("Bearer", err) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, challenge);
        }
    }
    response
}
