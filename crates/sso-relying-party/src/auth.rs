//! Request authentication for relying-party routes.
//!
//! - [`SignedInUser`] gates browser routes on the site's session cookie and
//!   challenges anonymous visitors with a redirect to the provider.
//! - [`BearerClaims`] authenticates API calls with an access token whose
//!   audience is this site.
//!
//! Routes that take neither extractor stay anonymous.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use sso_protocol_oidc::AccessTokenClaims;
use sso_session::UserSession;

use crate::error::RelyingPartyError;
use crate::state::RpState;

/// The signed-in user's local session.
#[derive(Debug, Clone)]
pub struct SignedInUser(pub UserSession);

impl FromRequestParts<RpState> for SignedInUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &RpState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        if let Some(session) = current_session(state, &jar).await {
            return Ok(Self(session));
        }

        let return_url = parts
            .uri
            .path_and_query()
            .map_or_else(|| "/".to_string(), |pq| pq.as_str().to_string());
        Err(challenge(state, jar, return_url).await)
    }
}

/// Returns the local session named by the site's cookie, if active.
pub async fn current_session(state: &RpState, jar: &CookieJar) -> Option<UserSession> {
    let id = jar.get(&state.config.cookie_name())?.value().to_string();
    if id.is_empty() {
        return None;
    }
    state.sessions.get_active(&id).await.ok()
}

/// Starts a sign-in and redirects the browser to the provider.
pub async fn challenge(state: &RpState, jar: CookieJar, return_url: String) -> Response {
    match state.client.authorization_redirect(return_url).await {
        Ok(redirect) => {
            let jar = jar.add(state.correlation_cookie(&redirect.pending.state));
            state.remember(redirect.pending);
            (jar, Redirect::to(&redirect.url)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// Validated claims of the bearer access token.
#[derive(Debug, Clone)]
pub struct BearerClaims(pub AccessTokenClaims);

impl FromRequestParts<RpState> for BearerClaims {
    type Rejection = RelyingPartyError;

    async fn from_request_parts(parts: &mut Parts, state: &RpState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or(RelyingPartyError::MissingBearer)?;
        let claims = state.client.validate_access_token(token).await?;
        Ok(Self(claims))
    }
}

/// Extracts the token from an `Authorization: Bearer` header value.
fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty()).then_some(token)
}
