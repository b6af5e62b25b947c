//! The provider's session cookie.
//!
//! The cookie holds only the opaque session id; everything else stays in the
//! session provider.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use sso_session::UserSession;
use time::Duration;

use super::state::OidcState;

/// Name of the provider session cookie.
pub const SESSION_COOKIE: &str = "sso.session";

/// Builds the cookie for `session_id`. It lives as long as the browser
/// session; expiry is enforced server-side.
#[must_use]
pub fn session_cookie(session_id: &str, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Builds an expired cookie that clears the session.
#[must_use]
pub fn clear_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, String::new()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// Returns the active session named by the request's cookie, if any.
pub async fn current_session(state: &OidcState, jar: &CookieJar) -> Option<UserSession> {
    let id = jar.get(SESSION_COOKIE)?.value().to_string();
    if id.is_empty() {
        return None;
    }
    match state.sessions.get_active(&id).await {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::debug!(error = %e, "Session cookie does not name an active session");
            None
        }
    }
}
