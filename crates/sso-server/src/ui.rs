//! Login UI handlers.
//!
//! The authorize endpoint sends unauthenticated browsers here with the
//! original request in `returnUrl`. A successful sign-in starts a provider
//! session and resumes that request.

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use sso_core::{Event, EventType};
use sso_protocol_oidc::endpoints::{current_session, session_cookie, DEFAULT_LOGIN_PATH};
use sso_session::UserSession;

use crate::state::AppState;

/// Login page template.
#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    /// Form action URL.
    pub action_url: String,
    /// Where to continue after sign-in.
    pub return_url: String,
    /// Username to prefill.
    pub username: String,
    /// Error message to display.
    pub error: Option<String>,
}

/// Error page template.
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    /// Error code.
    pub error: String,
    /// Error description.
    pub error_description: Option<String>,
}

/// Query parameters of the login page.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    /// Where to continue after sign-in.
    #[serde(rename = "returnUrl")]
    pub return_url: Option<String>,
}

/// Login form submission.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    /// Username.
    #[serde(default)]
    pub username: String,
    /// Password.
    #[serde(default)]
    pub password: String,
    /// Where to continue after sign-in.
    #[serde(rename = "returnUrl")]
    pub return_url: Option<String>,
}

/// GET `/account/login`
pub async fn login_page(Query(query): Query<LoginQuery>) -> Response {
    render_login(
        query.return_url.unwrap_or_default(),
        String::new(),
        None,
        StatusCode::OK,
    )
}

/// POST `/account/login`
pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let return_url = form.return_url.unwrap_or_default();

    let user = match state
        .oidc
        .users
        .validate_credentials(&form.username, &form.password)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!(username = %form.username, error = %e, "Sign-in rejected");
            Event::builder(EventType::LoginError)
                .detail("username", form.username.as_str())
                .failure("invalid_credentials")
                .emit();
            return render_login(
                return_url,
                form.username,
                Some("Invalid username or password".to_string()),
                StatusCode::UNAUTHORIZED,
            );
        }
    };

    // A new sign-in never reuses the previous session id.
    if let Some(previous) = current_session(&state.oidc, &jar).await {
        if let Err(e) = state.oidc.sessions.remove(&previous.id).await {
            tracing::debug!(session_id = %previous.id, error = %e, "Previous session already gone");
        }
    }

    let session = UserSession::new(&user.subject_id);
    if let Err(e) = state.oidc.sessions.create(session.clone()).await {
        tracing::error!(error = %e, "Failed to create session");
        return render_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            Some("The session could not be started"),
        );
    }

    Event::builder(EventType::Login)
        .subject(&user.subject_id)
        .session(&session.id)
        .detail("username", user.username.as_str())
        .emit();
    tracing::info!(subject = %user.subject_id, session_id = %session.id, "User signed in");

    let jar = jar.add(session_cookie(&session.id, state.oidc.secure_cookies));
    (jar, Redirect::to(local_return_url(&return_url))).into_response()
}

/// Only local paths are followed; anything else lands on the root page.
fn local_return_url(return_url: &str) -> &str {
    let local = return_url.starts_with('/')
        && !return_url.starts_with("//")
        && !return_url.starts_with("/\\");
    if local {
        return_url
    } else {
        "/"
    }
}

fn render_login(
    return_url: String,
    username: String,
    error: Option<String>,
    status: StatusCode,
) -> Response {
    let template = LoginTemplate {
        action_url: DEFAULT_LOGIN_PATH.to_string(),
        return_url,
        username,
        error,
    };

    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            tracing::error!("Template render error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

/// Renders an error page.
pub fn render_error(status: StatusCode, error: &str, error_description: Option<&str>) -> Response {
    let template = ErrorTemplate {
        error: error.to_string(),
        error_description: error_description.map(String::from),
    };

    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response(),
    }
}
