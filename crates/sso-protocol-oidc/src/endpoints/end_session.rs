//! End session endpoint handler.
//!
//! Implements GET/POST `/connect/endsession` (RP-Initiated Logout 1.0).
//!
//! The provider session is removed and its cookie cleared. Every client
//! that took part in the session is notified through a front-channel
//! iframe, then the browser continues to the post-logout redirect URI when
//! it is registered for the requesting client.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use sso_core::{Event, EventType};
use sso_model::Client;
use sso_session::UserSession;

use crate::claims::IdTokenClaims;
use crate::error::{OidcError, OidcResult};
use crate::request::EndSessionRequest;
use crate::types::TokenType;
use crate::validator::{TokenValidator, ValidationOptions};

use super::response::{error_page, html_escape};
use super::session_cookie::{clear_session_cookie, current_session};
use super::state::OidcState;

/// GET `/connect/endsession`
pub async fn end_session_get(
    State(state): State<OidcState>,
    jar: CookieJar,
    Query(request): Query<EndSessionRequest>,
) -> Response {
    handle_end_session(&state, jar, &request).await
}

/// POST `/connect/endsession`
pub async fn end_session_post(
    State(state): State<OidcState>,
    jar: CookieJar,
    Form(request): Form<EndSessionRequest>,
) -> Response {
    handle_end_session(&state, jar, &request).await
}

async fn handle_end_session(
    state: &OidcState,
    jar: CookieJar,
    request: &EndSessionRequest,
) -> Response {
    let hint = match validate_hint(state, request).await {
        Ok(hint) => hint,
        Err(err) => return error_page(&err),
    };

    let client_id = hint
        .as_ref()
        .and_then(|claims| claims.aud.values().first().map(|s| (*s).to_string()))
        .or_else(|| request.client_id.clone());
    let client = match client_id {
        Some(ref id) => state.clients.get_by_client_id(id).await.ok(),
        None => None,
    };

    let session = match current_session(state, &jar).await {
        Some(session) => Some(session),
        None => session_from_hint(state, hint.as_ref()).await,
    };

    let notified = match session {
        Some(session) => end_provider_session(state, &session).await,
        None => Vec::new(),
    };

    let continue_to = post_logout_target(client.as_ref(), request);
    let jar = jar.add(clear_session_cookie(state.secure_cookies));
    (jar, logged_out_page(&notified, continue_to.as_deref())).into_response()
}

/// Validates `id_token_hint`. An expired hint is still accepted.
async fn validate_hint(
    state: &OidcState,
    request: &EndSessionRequest,
) -> OidcResult<Option<IdTokenClaims>> {
    let Some(token) = request.id_token_hint.as_deref().filter(|t| !t.is_empty()) else {
        return Ok(None);
    };
    let options = ValidationOptions::any_audience(state.issuer())
        .with_token_type(TokenType::Id)
        .with_leeway(state.policy.clock_skew_secs)
        .allowing_expired();
    let claims: IdTokenClaims = TokenValidator::new(state.keys(), options)
        .validate(token)
        .await?;

    if let Some(client_id) = request.client_id.as_deref() {
        if !claims.aud.contains(client_id) {
            return Err(OidcError::InvalidRequest(
                "client_id does not match id_token_hint".to_string(),
            ));
        }
    }
    Ok(Some(claims))
}

async fn session_from_hint(state: &OidcState, hint: Option<&IdTokenClaims>) -> Option<UserSession> {
    let claims = hint?;
    let sid = claims.sid.as_deref()?;
    let session = state.sessions.get_active(sid).await.ok()?;
    (session.subject_id == claims.sub).then_some(session)
}

/// Removes the session and returns the front-channel URLs to notify.
async fn end_provider_session(state: &OidcState, session: &UserSession) -> Vec<String> {
    if let Err(e) = state.sessions.remove(&session.id).await {
        tracing::warn!(session_id = %session.id, error = %e, "Failed to remove session");
    }

    let mut urls = Vec::new();
    for client_id in &session.clients {
        let Ok(client) = state.clients.get_by_client_id(client_id).await else {
            continue;
        };
        if let Some(uri) = client.front_channel_logout_uri.as_deref() {
            urls.push(front_channel_url(uri, state.issuer(), &session.id));
        }
    }

    Event::builder(EventType::Logout)
        .subject(&session.subject_id)
        .session(&session.id)
        .detail("clients", session.clients.len().to_string())
        .emit();
    tracing::info!(subject = %session.subject_id, session_id = %session.id, "Session ended");
    urls
}

fn front_channel_url(uri: &str, issuer: &str, sid: &str) -> String {
    let separator = if uri.contains('?') { '&' } else { '?' };
    format!(
        "{uri}{separator}iss={}&sid={}",
        urlencoding::encode(issuer),
        urlencoding::encode(sid)
    )
}

/// The post-logout redirect, only when registered for the client.
fn post_logout_target(client: Option<&Client>, request: &EndSessionRequest) -> Option<String> {
    let uri = request.post_logout_redirect_uri.as_deref()?;
    let Some(client) = client else {
        tracing::debug!(uri, "post_logout_redirect_uri ignored without a known client");
        return None;
    };
    if !client.is_post_logout_uri_registered(uri) {
        tracing::warn!(client_id = %client.client_id, uri, "Unregistered post_logout_redirect_uri");
        return None;
    }
    Some(match request.state.as_deref() {
        Some(state) => {
            let separator = if uri.contains('?') { '&' } else { '?' };
            format!("{uri}{separator}state={}", urlencoding::encode(state))
        }
        None => uri.to_string(),
    })
}

fn logged_out_page(front_channel: &[String], continue_to: Option<&str>) -> Response {
    let frames = front_channel
        .iter()
        .map(|url| {
            format!(
                r#"<iframe src="{}" style="display:none" width="0" height="0"></iframe>"#,
                html_escape(url)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    // Give the iframes a moment before navigating away.
    let (refresh, link) = match continue_to {
        Some(url) => {
            let url = html_escape(url);
            (
                format!(r#"<meta http-equiv="refresh" content="1;url={url}" />"#),
                format!(r#"<p><a href="{url}">Return to the application</a></p>"#),
            )
        }
        None => (String::new(), String::new()),
    };

    let html = format!(
        r"<!DOCTYPE html>
<html>
<head><title>Signed out</title>{refresh}</head>
<body>
<h1>You are now signed out</h1>
{link}
{frames}
</body>
</html>"
    );
    (StatusCode::OK, Html(html)).into_response()
}
