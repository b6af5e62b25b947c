//! Relying-party routes.
//!
//! | Route | Access |
//! |---|---|
//! | `/`, `/home/error` | anonymous |
//! | `/home/privacy` | session, else sign-in challenge |
//! | `/signin-oidc` | authorization response callback |
//! | `/signout-oidc` | front-channel logout from the provider |
//! | `/signout-callback-oidc` | return from provider logout |
//! | `/account/logout` | ends the local and provider sessions |
//! | `/api/identity` | bearer access token for this site |

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sso_session::{notes, UserSession};
use tower_http::trace::TraceLayer;

use crate::auth::{current_session, BearerClaims, SignedInUser};
use crate::client::SignedIn;
use crate::config::{SIGNIN_PATH, SIGNOUT_CALLBACK_PATH, SIGNOUT_PATH};
use crate::error::{RelyingPartyError, RelyingPartyResult};
use crate::state::RpState;

/// Creates the site router.
pub fn rp_router(state: RpState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/home/error", get(error_page))
        .route("/home/privacy", get(privacy))
        .route(SIGNIN_PATH, get(signin_callback_get).post(signin_callback_post))
        .route(SIGNOUT_PATH, get(front_channel_logout))
        .route(SIGNOUT_CALLBACK_PATH, get(signout_callback))
        .route("/account/logout", get(logout).post(logout))
        .route("/api/identity", get(identity))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn home(State(state): State<RpState>, jar: CookieJar) -> Html<String> {
    let greeting = match current_session(&state, &jar).await {
        Some(session) => format!(
            "<p>Signed in as {}. <a href=\"/account/logout\">Sign out</a></p>",
            html_escape(&display_name(&session))
        ),
        None => "<p><a href=\"/home/privacy\">Sign in</a></p>".to_string(),
    };
    Html(page(&state.config.client_id, &greeting))
}

async fn error_page() -> Response {
    let mut response = (
        StatusCode::OK,
        Html(page("Error", "<p>An error occurred while processing your request.</p>")),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

async fn privacy(State(state): State<RpState>, SignedInUser(session): SignedInUser) -> Html<String> {
    let rows: String = session_claims(&session)
        .iter()
        .map(|(k, v)| {
            format!(
                "<tr><td>{}</td><td>{}</td></tr>",
                html_escape(k),
                html_escape(&claim_text(v))
            )
        })
        .collect();

    let saved: Vec<&str> = [notes::ACCESS_TOKEN, notes::ID_TOKEN, notes::REFRESH_TOKEN]
        .into_iter()
        .filter(|k| session.get_note(k).is_some())
        .collect();

    let body = format!(
        "<h2>Claims</h2><table>{rows}</table><h2>Saved tokens</h2><p>{}</p>",
        if saved.is_empty() { "none".to_string() } else { saved.join(", ") }
    );
    Html(page(&format!("{} privacy", state.config.client_id), &body))
}

/// Authorization response parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code.
    pub code: Option<String>,
    /// Echoed `state`.
    pub state: Option<String>,
    /// Error code.
    pub error: Option<String>,
    /// Error description.
    pub error_description: Option<String>,
}

async fn signin_callback_get(
    State(state): State<RpState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    signin_callback(&state, jar, params).await
}

async fn signin_callback_post(
    State(state): State<RpState>,
    jar: CookieJar,
    Form(params): Form<CallbackParams>,
) -> Response {
    signin_callback(&state, jar, params).await
}

async fn signin_callback(state: &RpState, jar: CookieJar, params: CallbackParams) -> Response {
    match complete_sign_in(state, &jar, params).await {
        Ok((session, return_url)) => {
            let jar = jar
                .add(state.session_cookie(&session.id))
                .add(state.removal_cookie(state.config.correlation_cookie_name()));
            (jar, Redirect::to(&return_url)).into_response()
        }
        Err(e) => {
            let jar = jar.add(state.removal_cookie(state.config.correlation_cookie_name()));
            (jar, e).into_response()
        }
    }
}

async fn complete_sign_in(
    state: &RpState,
    jar: &CookieJar,
    params: CallbackParams,
) -> RelyingPartyResult<(UserSession, String)> {
    if let Some(error) = params.error {
        let description = params.error_description.unwrap_or_default();
        return Err(RelyingPartyError::Authorization(
            format!("{error} {description}").trim_end().to_string(),
        ));
    }

    let returned_state = params
        .state
        .ok_or_else(|| RelyingPartyError::InvalidCallback("missing state".to_string()))?;
    let correlated = jar
        .get(&state.config.correlation_cookie_name())
        .is_some_and(|c| c.value() == returned_state);
    if !correlated {
        return Err(RelyingPartyError::InvalidCallback(
            "state does not belong to this browser".to_string(),
        ));
    }
    let pending = state.take_pending(&returned_state).ok_or_else(|| {
        RelyingPartyError::InvalidCallback("unknown or expired state".to_string())
    })?;
    let code = params
        .code
        .ok_or_else(|| RelyingPartyError::InvalidCallback("missing code".to_string()))?;

    let signed_in = state.client.sign_in(&code, &pending).await?;
    let session = local_session(state, &signed_in);
    state.sessions.create(session.clone()).await?;
    tracing::info!(
        subject = %session.subject_id,
        session_id = %session.id,
        "Signed in"
    );

    let return_url = if pending.return_url.starts_with('/') && !pending.return_url.starts_with("//") {
        pending.return_url
    } else {
        "/".to_string()
    };
    Ok((session, return_url))
}

fn local_session(state: &RpState, signed_in: &SignedIn) -> UserSession {
    let claims = &signed_in.id_claims;
    let mut session = UserSession::new(claims.sub.clone());
    if let Ok(json) = serde_json::to_string(claims) {
        session.set_note(notes::CLAIMS, json);
    }
    if let Some(sid) = claims.sid.as_deref() {
        session.set_note(notes::PROVIDER_SESSION_ID, sid);
    }

    if state.config.save_tokens {
        let tokens = &signed_in.tokens;
        session.set_note(notes::ACCESS_TOKEN, tokens.access_token.as_str());
        if let Some(id_token) = tokens.id_token.as_deref() {
            session.set_note(notes::ID_TOKEN, id_token);
        }
        if let Some(refresh_token) = tokens.refresh_token.as_deref() {
            session.set_note(notes::REFRESH_TOKEN, refresh_token);
        }
        let expires_at = chrono::Utc::now().timestamp() + tokens.expires_in;
        session.set_note(notes::EXPIRES_AT, expires_at.to_string());
    }
    session
}

/// Front-channel logout parameters.
#[derive(Debug, Default, Deserialize)]
pub struct FrontChannelParams {
    /// Issuer of the provider session.
    pub iss: Option<String>,
    /// Provider session id.
    pub sid: Option<String>,
}

async fn front_channel_logout(
    State(state): State<RpState>,
    jar: CookieJar,
    Query(params): Query<FrontChannelParams>,
) -> Response {
    if let (Some(iss), Some(sid)) = (params.iss.as_deref(), params.sid.as_deref()) {
        match state.client.issuer().await {
            Ok(issuer) if issuer == iss => match state
                .sessions
                .remove_by_note(notes::PROVIDER_SESSION_ID, sid)
                .await
            {
                Ok(removed) => tracing::info!(sid, removed, "Front-channel logout"),
                Err(e) => tracing::warn!(sid, error = %e, "Front-channel logout failed"),
            },
            Ok(_) => tracing::warn!(iss, "Front-channel logout from a foreign issuer ignored"),
            Err(e) => tracing::warn!(error = %e, "Front-channel logout before discovery"),
        }
    }

    let jar = jar.add(state.removal_cookie(state.config.cookie_name()));
    let mut response = (jar, StatusCode::OK).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
    response
}

async fn logout(State(state): State<RpState>, jar: CookieJar) -> Response {
    let id_token = match current_session(&state, &jar).await {
        Some(session) => {
            if let Err(e) = state.sessions.remove(&session.id).await {
                tracing::debug!(error = %e, "Local session already gone");
            }
            session.get_note(notes::ID_TOKEN).map(String::from)
        }
        None => None,
    };
    let jar = jar.add(state.removal_cookie(state.config.cookie_name()));

    match state.client.end_session_url(id_token.as_deref()).await {
        Ok(Some(url)) => (jar, Redirect::to(&url)).into_response(),
        Ok(None) => (jar, Redirect::to("/")).into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Provider logout unavailable");
            (jar, Redirect::to("/")).into_response()
        }
    }
}

async fn signout_callback() -> Redirect {
    Redirect::to("/")
}

/// One claim of the caller's access token.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimView {
    /// Claim type.
    #[serde(rename = "type")]
    pub claim_type: String,
    /// Claim value.
    pub value: String,
}

async fn identity(BearerClaims(claims): BearerClaims) -> Json<Vec<ClaimView>> {
    let Ok(Value::Object(map)) = serde_json::to_value(&claims) else {
        return Json(Vec::new());
    };
    let views = map
        .into_iter()
        .flat_map(|(claim_type, value)| match value {
            Value::Array(items) => items
                .iter()
                .map(|item| ClaimView {
                    claim_type: claim_type.clone(),
                    value: claim_text(item),
                })
                .collect::<Vec<_>>(),
            other => vec![ClaimView {
                claim_type,
                value: claim_text(&other),
            }],
        })
        .collect();
    Json(views)
}

fn session_claims(session: &UserSession) -> Map<String, Value> {
    session
        .get_note(notes::CLAIMS)
        .and_then(|json| serde_json::from_str(json).ok())
        .unwrap_or_default()
}

fn display_name(session: &UserSession) -> String {
    let claims = session_claims(session);
    claims
        .get("name")
        .and_then(Value::as_str)
        .map_or_else(|| session.subject_id.clone(), String::from)
}

fn claim_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\" /><title>{0}</title></head>\n<body>\n<h1>{0}</h1>\n{1}\n</body>\n</html>",
        html_escape(title),
        body
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use sso_core::TokenLifetimes;
    use sso_protocol_oidc::{KeyRing, ProviderMetadataBuilder, TokenGrant, TokenManager};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::RelyingPartyConfig;

    struct Provider {
        server: MockServer,
        tokens: TokenManager,
    }

    async fn provider() -> Provider {
        let server = MockServer::start().await;
        let keys = Arc::new(KeyRing::generate().unwrap());
        let metadata = ProviderMetadataBuilder::new(server.uri()).build();
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(&metadata))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(keys.jwks(0)))
            .mount(&server)
            .await;
        let tokens = TokenManager::new(server.uri(), TokenLifetimes::default(), keys);
        Provider { server, tokens }
    }

    fn state(provider: &Provider) -> RpState {
        let mut config = RelyingPartyConfig::for_site("WebSite1", 5001);
        config.authority = provider.server.uri();
        RpState::new(config).unwrap()
    }

    fn access_token(provider: &Provider, audience: &str) -> String {
        let grant = TokenGrant {
            subject: "1".into(),
            client_id: audience.into(),
            scopes: vec!["openid".into(), audience.into()],
            audiences: vec![audience.into()],
            ..TokenGrant::default()
        };
        provider
            .tokens
            .create_token_response(&grant, chrono::Utc::now().timestamp())
            .unwrap()
            .access_token
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn bearer(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn anonymous_routes_bypass_the_gate() {
        let provider = provider().await;
        let app = rp_router(state(&provider));

        let response = app.clone().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get("/home/error")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    }

    #[tokio::test]
    async fn protected_route_challenges_to_provider() {
        let provider = provider().await;
        let state = state(&provider);
        let app = rp_router(state.clone());

        let response = app.oneshot(get("/home/privacy")).await.unwrap();
        assert!(response.status().is_redirection());
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with(&format!("{}/connect/authorize?", provider.server.uri())));
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(set_cookie.starts_with("WebSite1.correlation="));
        assert_eq!(state.pending.len(), 1);
    }

    #[tokio::test]
    async fn callback_without_correlation_is_rejected() {
        let provider = provider().await;
        let state = state(&provider);
        let app = rp_router(state.clone());

        let response = app.oneshot(get("/home/privacy")).await.unwrap();
        let pending_state = state.pending.iter().next().unwrap().key().clone();
        drop(response);

        let response = rp_router(state.clone())
            .oneshot(get(&format!("/signin-oidc?code=abc&state={pending_state}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        // The pending sign-in survives a forged callback.
        assert_eq!(state.pending.len(), 1);
    }

    #[tokio::test]
    async fn provider_error_is_reported() {
        let provider = provider().await;
        let app = rp_router(state(&provider));
        let response = app
            .oneshot(get("/signin-oidc?error=access_denied&state=x"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn identity_api_requires_matching_audience() {
        let provider = provider().await;
        let app = rp_router(state(&provider));

        let response = app.clone().oneshot(get("/api/identity")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let foreign = access_token(&provider, "WebSite2");
        let response = app
            .clone()
            .oneshot(bearer("/api/identity", &foreign))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let own = access_token(&provider, "WebSite1");
        let response = app.oneshot(bearer("/api/identity", &own)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let claims: Vec<ClaimView> = serde_json::from_slice(&bytes).unwrap();
        assert!(claims.iter().any(|c| c.claim_type == "sub" && c.value == "1"));
        assert!(claims.iter().any(|c| c.claim_type == "scope"));
    }

    #[tokio::test]
    async fn front_channel_logout_removes_matching_sessions() {
        let provider = provider().await;
        let state = state(&provider);
        let mut session = UserSession::new("1");
        session.set_note(notes::PROVIDER_SESSION_ID, "idp-sid");
        state.sessions.create(session.clone()).await.unwrap();

        let uri = format!(
            "/signout-oidc?iss={}&sid=idp-sid",
            url::form_urlencoded::byte_serialize(provider.server.uri().as_bytes()).collect::<String>()
        );
        let response = rp_router(state.clone()).oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(state.sessions.get_active(&session.id).await.is_err());
    }

    #[tokio::test]
    async fn logout_redirects_to_provider() {
        let provider = provider().await;
        let app = rp_router(state(&provider));
        let response = app.oneshot(get("/account/logout")).await.unwrap();
        assert!(response.status().is_redirection());
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with(&format!("{}/connect/endsession?", provider.server.uri())));
        assert!(location.contains("post_logout_redirect_uri="));
    }
}
