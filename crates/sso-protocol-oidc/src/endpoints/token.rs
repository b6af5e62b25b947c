//! Token endpoint handler.
//!
//! Implements POST `/connect/token` for the two supported grant types:
//! - `authorization_code`
//! - `refresh_token`
//!
//! Every response carries `Cache-Control: no-store`. A failed client
//! authentication answers 401 with a `Basic` challenge.

use axum::{
    extract::{rejection::FormRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use sso_core::{Event, EventType};

use crate::error::{OidcError, OidcResult};
use crate::request::TokenRequest;
use crate::token::TokenResponse;
use crate::types::GrantType;

use super::client_auth::{authenticate_client, extract_credentials};
use super::grants::{AuthorizationCodeGrant, GrantContext, RefreshTokenGrant};
use super::response::{error_response, no_store, www_authenticate};
use super::state::OidcState;

/// POST `/connect/token`
///
/// # Responses
///
/// - 200 OK: Token response JSON
/// - 400 Bad Request: Invalid request or grant
/// - 401 Unauthorized: Client authentication failed
/// - 500 Internal Server Error: Server error
pub async fn token(
    State(state): State<OidcState>,
    headers: HeaderMap,
    form: Result<Form<TokenRequest>, FormRejection>,
) -> Response {
    let result = match form {
        Ok(Form(request)) => handle_token_request(&state, &headers, &request).await,
        Err(rejection) => Err(OidcError::InvalidRequest(rejection.body_text())),
    };

    let response = match result {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(ref err) => token_error_response(err),
    };
    no_store(response)
}

fn token_error_response(err: &OidcError) -> Response {
    let mut response = error_response(err);
    if matches!(err, OidcError::InvalidClient(_)) {
        if let Some(challenge) = www_authenticate("Basic", err) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, challenge);
        }
    }
    response
}

async fn handle_token_request(
    state: &OidcState,
    headers: &HeaderMap,
    request: &TokenRequest,
) -> OidcResult<TokenResponse> {
    let grant_type = match request.grant_type.as_deref() {
        None | Some("") => {
            return Err(OidcError::InvalidRequest("grant_type is required".to_string()))
        }
        Some(_) => request
            .parsed_grant_type()
            .map_err(OidcError::UnsupportedGrantType)?,
    };

    let credentials = extract_credentials(headers, request)?;
    let client = match authenticate_client(state.clients.as_ref(), &credentials).await {
        Ok(client) => client,
        Err(err) => {
            failure_event(grant_type, Some(&credentials.client_id), &err);
            return Err(err);
        }
    };

    let ctx = GrantContext::new(state, &client, request, OidcState::now());
    let result = match grant_type {
        GrantType::AuthorizationCode => AuthorizationCodeGrant::handle(&ctx).await,
        GrantType::RefreshToken => RefreshTokenGrant::handle(&ctx).await,
    };
    if let Err(ref err) = result {
        failure_event(grant_type, Some(&client.client_id), err);
    }
    result
}

fn failure_event(grant_type: GrantType, client_id: Option<&str>, err: &OidcError) {
    let event_type = match grant_type {
        GrantType::AuthorizationCode => EventType::CodeToTokenError,
        GrantType::RefreshToken => EventType::RefreshTokenError,
    };
    let mut event = Event::builder(event_type).failure(err.error_code());
    if let Some(client_id) = client_id {
        event = event.client(client_id);
    }
    event.emit();
}
