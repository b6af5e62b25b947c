//! Relying-party integration tests against a running provider.
//!
//! The site runs in-process through its router; the provider is reached over
//! HTTP by both the site and the test browser.

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use sso_relying_party::{rp_router, RelyingPartyConfig, RpState};
use sso_session::notes;
use tower::ServiceExt;
use url::Url;

use crate::common::TestEnv;

fn site(env: &TestEnv, name: &str, port: u16) -> anyhow::Result<RpState> {
    let mut config = RelyingPartyConfig::for_site(name, port);
    config.authority = env.issuer.clone();
    Ok(RpState::new(config)?)
}

async fn call(state: &RpState, uri: &str, cookies: &str) -> anyhow::Result<Response<Body>> {
    let mut request = Request::builder().uri(uri);
    if !cookies.is_empty() {
        request = request.header(header::COOKIE, cookies);
    }
    Ok(rp_router(state.clone()).oneshot(request.body(Body::empty())?).await?)
}

/// Returns `name=value` pairs of the non-empty cookies a response sets.
fn set_cookies(response: &Response<Body>) -> String {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter(|pair| !pair.ends_with('='))
        .collect::<Vec<_>>()
        .join("; ")
}

fn location(response: &Response<Body>) -> anyhow::Result<String> {
    Ok(response
        .headers()
        .get(header::LOCATION)
        .ok_or_else(|| anyhow::anyhow!("no Location header"))?
        .to_str()?
        .to_string())
}

/// Local part (`path?query`) of an absolute URL.
fn local_part(url: &str) -> anyhow::Result<String> {
    let url = Url::parse(url)?;
    Ok(match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    })
}

async fn body_text(response: Response<Body>) -> anyhow::Result<String> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(String::from_utf8(bytes.to_vec())?)
}

/// Signs in to `state` as alice and returns the site's session cookie.
async fn sign_in(env: &TestEnv, state: &RpState) -> anyhow::Result<String> {
    let challenge = call(state, "/home/privacy", "").await?;
    assert!(challenge.status().is_redirection());
    let correlation = set_cookies(&challenge);
    let authorize = location(&challenge)?;
    assert!(authorize.starts_with(&env.issuer));

    let callback = env.sign_in(&authorize, "alice").await?;
    let finished = call(state, &local_part(callback.as_str())?, &correlation).await?;
    assert!(
        finished.status().is_redirection(),
        "callback failed with {}",
        finished.status()
    );
    assert_eq!(location(&finished)?, "/home/privacy");
    Ok(set_cookies(&finished))
}

/// Tests the full sign-in: challenge, provider login, callback, gated page.
#[tokio::test]
async fn test_sign_in_reaches_protected_page() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let state = site(&env, "WebSite1", 5001)?;

    let session_cookie = sign_in(&env, &state).await?;
    assert!(session_cookie.starts_with("WebSite1.auth="));

    let page = call(&state, "/home/privacy", &session_cookie).await?;
    assert_eq!(page.status(), StatusCode::OK);
    let html = body_text(page).await?;
    assert!(html.contains("Alice Smith"));
    assert!(html.contains("access_token"));

    let home = body_text(call(&state, "/", &session_cookie).await?).await?;
    assert!(home.contains("Signed in as Alice Smith"));
    Ok(())
}

/// Tests that the saved access token authorizes the site's API and only it.
#[tokio::test]
async fn test_saved_access_token_calls_api() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let site1 = site(&env, "WebSite1", 5001)?;
    let site2 = site(&env, "WebSite2", 5002)?;
    let cookie = sign_in(&env, &site1).await?;

    let session_id = cookie.trim_start_matches("WebSite1.auth=").to_string();
    let session = site1.sessions.get_active(&session_id).await?;
    let access_token = session
        .get_note(notes::ACCESS_TOKEN)
        .ok_or_else(|| anyhow::anyhow!("access token not saved"))?
        .to_string();

    let api = |state: &RpState| {
        rp_router(state.clone()).oneshot(
            Request::builder()
                .uri("/api/identity")
                .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
                .body(Body::empty())
                .expect("request"),
        )
    };

    let own = api(&site1).await?;
    assert_eq!(own.status(), StatusCode::OK);
    let claims: serde_json::Value = serde_json::from_str(&body_text(own).await?)?;
    assert!(claims
        .as_array()
        .is_some_and(|c| c.iter().any(|v| v["type"] == "sub" && v["value"] == "1")));

    let foreign = api(&site2).await?;
    assert_eq!(foreign.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

/// Tests that a callback replayed from another browser is refused.
#[tokio::test]
async fn test_callback_requires_correlation_cookie() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let state = site(&env, "WebSite1", 5001)?;

    let challenge = call(&state, "/home/privacy", "").await?;
    let callback = env.sign_in(&location(&challenge)?, "alice").await?;

    let replayed = call(&state, &local_part(callback.as_str())?, "").await?;
    assert_eq!(replayed.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

/// Tests provider logout reaching the site through its front-channel URL.
#[tokio::test]
async fn test_front_channel_logout_ends_local_session() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let state = site(&env, "WebSite1", 5001)?;
    let cookie = sign_in(&env, &state).await?;

    let page = env
        .client
        .get(env.url("/connect/endsession"))
        .send()
        .await?
        .text()
        .await?;
    let frame = page
        .split("<iframe src=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .ok_or_else(|| anyhow::anyhow!("no front-channel frame in {page}"))?
        .replace("&amp;", "&");
    assert!(frame.starts_with("http://localhost:5001/signout-oidc?"));

    let notified = call(&state, &local_part(&frame)?, "").await?;
    assert_eq!(notified.status(), StatusCode::OK);

    let page = call(&state, "/home/privacy", &cookie).await?;
    assert!(page.status().is_redirection(), "session should be gone");
    Ok(())
}

/// Tests that site logout clears the session and hands off to the provider.
#[tokio::test]
async fn test_logout_redirects_with_id_token_hint() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let state = site(&env, "WebSite1", 5001)?;
    let cookie = sign_in(&env, &state).await?;

    let response = call(&state, "/account/logout", &cookie).await?;
    assert!(response.status().is_redirection());
    let end_session = Url::parse(&location(&response)?)?;
    assert!(end_session.as_str().starts_with(&env.url("/connect/endsession")));
    assert!(end_session.query_pairs().any(|(k, _)| k == "id_token_hint"));

    let page = env.client.get(end_session.as_str()).send().await?;
    assert_eq!(page.status(), reqwest::StatusCode::OK);
    assert!(page
        .text()
        .await?
        .contains("http://localhost:5001/signout-callback-oidc"));

    let gated = call(&state, "/home/privacy", &cookie).await?;
    assert!(gated.status().is_redirection());
    Ok(())
}
