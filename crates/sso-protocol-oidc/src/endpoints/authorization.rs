//! Authorization endpoint handler.
//!
//! Implements GET/POST `/connect/authorize` for the authorization code flow.
//!
//! - Requests with an untrusted client or redirect URI get an error page.
//! - Other failures are returned to the client's redirect URI.
//! - Without a provider session the browser is sent to the login page,
//!   which returns here once the subject has signed in.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use sso_core::{Event, EventType};
use sso_session::UserSession;

use crate::authorize::{
    AuthorizationRejection, AuthorizeStage, Authorizer, RedirectTarget, ValidatedAuthorization,
};
use crate::discovery::AUTHORIZE_PATH;
use crate::error::OidcError;
use crate::request::AuthorizationRequest;
use crate::types::ResponseMode;

use super::response::{error_page, form_post_page};
use super::session_cookie::current_session;
use super::state::OidcState;

/// GET `/connect/authorize`
pub async fn authorize_get(
    State(state): State<OidcState>,
    jar: CookieJar,
    Query(request): Query<AuthorizationRequest>,
) -> Response {
    handle_authorization_request(&state, &jar, &request).await
}

/// POST `/connect/authorize`
///
/// Same as GET but accepts form-encoded parameters.
pub async fn authorize_post(
    State(state): State<OidcState>,
    jar: CookieJar,
    Form(request): Form<AuthorizationRequest>,
) -> Response {
    handle_authorization_request(&state, &jar, &request).await
}

async fn handle_authorization_request(
    state: &OidcState,
    jar: &CookieJar,
    request: &AuthorizationRequest,
) -> Response {
    let authorizer = Authorizer::new(
        state.clients.as_ref(),
        state.resources.as_ref(),
        &state.policy,
    );

    let validated = match authorizer.validate(request).await {
        Ok(validated) => validated,
        Err(rejection) => return reject(request.client_id.as_deref(), rejection),
    };

    let session = if validated.force_login {
        None
    } else {
        authenticated_session(state, jar).await
    };

    let Some(mut session) = session else {
        if validated.prompt_none {
            let rejection =
                validated.reject(AuthorizeStage::AuthenticatingUser, OidcError::LoginRequired);
            return reject(request.client_id.as_deref(), rejection);
        }
        tracing::debug!(
            stage = %AuthorizeStage::AuthenticatingUser,
            client_id = %validated.client.client_id,
            "No session, redirecting to login"
        );
        return redirect_to_login(&state.login_path, request);
    };

    let code = match authorizer
        .issue_code(state.codes.as_ref(), &validated, &session, OidcState::now())
        .await
    {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "Failed to issue authorization code");
            let rejection = validated.reject(AuthorizeStage::IssuingCode, err);
            return reject(request.client_id.as_deref(), rejection);
        }
    };

    record_client(state, &mut session, &validated).await;

    Event::builder(EventType::CodeIssued)
        .subject(&session.subject_id)
        .client(&validated.client.client_id)
        .session(&session.id)
        .detail("scope", validated.scopes.join(" "))
        .emit();

    tracing::debug!(
        stage = %AuthorizeStage::Redirecting,
        client_id = %validated.client.client_id,
        "Returning authorization code"
    );
    deliver(&validated.target, &validated.target.success_params(&code))
}

/// Returns the session named by the cookie when its subject may still sign in.
async fn authenticated_session(state: &OidcState, jar: &CookieJar) -> Option<UserSession> {
    let session = current_session(state, jar).await?;
    match state.users.find_by_subject(&session.subject_id).await {
        Ok(user) if user.is_active => Some(session),
        Ok(_) => {
            tracing::info!(subject = %session.subject_id, "Session belongs to a disabled user");
            None
        }
        Err(e) => {
            tracing::debug!(subject = %session.subject_id, error = %e, "Session subject not found");
            None
        }
    }
}

/// Records the client on the session so logout can reach it.
async fn record_client(
    state: &OidcState,
    session: &mut UserSession,
    validated: &ValidatedAuthorization,
) {
    session.add_client(validated.client.client_id.clone());
    session.touch();
    if let Err(e) = state.sessions.update(session.clone()).await {
        tracing::warn!(session_id = %session.id, error = %e, "Failed to record client on session");
    }
}

fn reject(client_id: Option<&str>, rejection: AuthorizationRejection) -> Response {
    let AuthorizationRejection {
        stage,
        error,
        redirect,
    } = rejection;

    let mut event = Event::builder(EventType::AuthorizeError)
        .failure(error.error_code())
        .detail("stage", stage.to_string());
    if let Some(client_id) = client_id {
        event = event.client(client_id);
    }
    event.emit();

    match redirect {
        Some(target) => deliver(&target, &target.error_params(&error)),
        None => error_page(&error),
    }
}

fn deliver(target: &RedirectTarget, params: &[(String, String)]) -> Response {
    match target.response_mode {
        ResponseMode::Query => Redirect::to(&target.query_url(params)).into_response(),
        ResponseMode::FormPost => form_post_page(&target.redirect_uri, params),
    }
}

/// Redirects to the login page with the request as the return URL.
///
/// `prompt` is dropped so the round trip does not force another login.
fn redirect_to_login(login_path: &str, request: &AuthorizationRequest) -> Response {
    let mut resume = request.clone();
    resume.prompt = None;
    let params = serde_urlencoded::to_string(&resume).unwrap_or_default();
    let return_url = format!("{AUTHORIZE_PATH}?{params}");
    let login_url = format!("{login_path}?returnUrl={}", urlencoding::encode(&return_url));
    Redirect::to(&login_url).into_response()
}
