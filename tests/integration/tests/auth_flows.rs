//! Authorization flow integration tests.

use reqwest::StatusCode;
use serde_json::Value;
use url::Url;

use crate::common::{location, query_param, ErrorBody, TestEnv, TokenBody, SITE1_REDIRECT, SITE2_REDIRECT};

/// Tests that discovery advertises endpoints under the issuer.
#[tokio::test]
async fn test_discovery_document() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let doc: Value = env
        .client
        .get(env.url("/.well-known/openid-configuration"))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(doc["issuer"], env.issuer.as_str());
    assert_eq!(doc["token_endpoint"], env.token_url().as_str());

    let jwks: Value = env
        .client
        .get(doc["jwks_uri"].as_str().unwrap_or_default())
        .send()
        .await?
        .json()
        .await?;
    let keys = jwks["keys"].as_array().cloned().unwrap_or_default();
    assert!(!keys.is_empty(), "key set should publish the signing key");
    assert!(keys.iter().all(|k| k["alg"] == "ES384"));
    Ok(())
}

/// Tests the authorization code flow end to end with PKCE and a nonce.
#[tokio::test]
async fn test_authorization_code_flow() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk-long-enough";
    let challenge = sso_protocol_oidc::pkce::challenge_for(
        verifier,
        sso_protocol_oidc::CodeChallengeMethod::S256,
    );

    let code = env
        .site1_code(
            "openid profile WebSite1",
            &[
                ("nonce", "n-0S6_WzA2Mj"),
                ("code_challenge", &challenge),
                ("code_challenge_method", "S256"),
            ],
        )
        .await?;

    let response = env.redeem(&code, &[("code_verifier", verifier)]).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let tokens: TokenBody = response.json().await?;
    assert_eq!(tokens.token_type, "Bearer");
    assert!(tokens.expires_in > 0);
    assert!(tokens.refresh_token.is_none(), "no offline_access requested");
    assert_eq!(tokens.scope, "openid profile WebSite1");

    let id_token = tokens.id_token.expect("openid scope yields an ID token");
    let claims = payload(&id_token)?;
    assert_eq!(claims["iss"], env.issuer.as_str());
    assert_eq!(claims["aud"], "WebSite1");
    assert_eq!(claims["sub"], "1");
    assert_eq!(claims["nonce"], "n-0S6_WzA2Mj");
    assert!(claims["sid"].is_string());

    let access = payload(&tokens.access_token)?;
    assert_eq!(access["aud"], serde_json::json!(["WebSite1"]));
    assert_eq!(access["client_id"], "WebSite1");
    Ok(())
}

/// Tests that a second authorization reuses the provider session.
#[tokio::test]
async fn test_existing_session_skips_login() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.site1_code("openid", &[]).await?;

    let url = env.authorize_url("WebSite2", SITE2_REDIRECT, &[("scope", "openid WebSite2"), ("state", "s2")]);
    let response = env.client.get(&url).send().await?;
    let callback = Url::parse(&location(&response)?)?;
    assert!(callback.as_str().starts_with(SITE2_REDIRECT));
    assert!(query_param(&callback, "code").is_some());
    assert_eq!(query_param(&callback, "state").as_deref(), Some("s2"));
    Ok(())
}

/// Tests that `prompt=none` without a session reports `login_required`.
#[tokio::test]
async fn test_prompt_none_without_session() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let url = env.authorize_url(
        "WebSite1",
        SITE1_REDIRECT,
        &[("scope", "openid"), ("state", "p"), ("prompt", "none")],
    );
    let response = env.client.get(&url).send().await?;
    let callback = Url::parse(&location(&response)?)?;
    assert!(callback.as_str().starts_with(SITE1_REDIRECT));
    assert_eq!(query_param(&callback, "error").as_deref(), Some("login_required"));
    assert_eq!(query_param(&callback, "state").as_deref(), Some("p"));
    Ok(())
}

/// Tests that a scope outside the client's allowance is redirected back as
/// `invalid_scope`.
#[tokio::test]
async fn test_foreign_api_scope_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let url = env.authorize_url(
        "WebSite1",
        SITE1_REDIRECT,
        &[("scope", "openid WebSite2"), ("state", "x")],
    );
    let response = env.client.get(&url).send().await?;
    let callback = Url::parse(&location(&response)?)?;
    assert_eq!(query_param(&callback, "error").as_deref(), Some("invalid_scope"));
    Ok(())
}

/// Tests that an unregistered redirect URI is never redirected to.
#[tokio::test]
async fn test_unregistered_redirect_uri_renders_error() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let url = env.authorize_url(
        "WebSite1",
        "https://attacker.example/callback",
        &[("scope", "openid")],
    );
    let response = env.client.get(&url).send().await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(reqwest::header::LOCATION).is_none());
    Ok(())
}

/// Tests userinfo with the access token from the code flow.
#[tokio::test]
async fn test_userinfo_returns_profile_claims() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let code = env.site1_code("openid profile email", &[]).await?;
    let tokens: TokenBody = env.redeem(&code, &[]).await?.json().await?;

    let response = env
        .client
        .get(env.userinfo_url())
        .bearer_auth(&tokens.access_token)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let info: Value = response.json().await?;
    assert_eq!(info["sub"], "1");
    assert_eq!(info["name"], "Alice Smith");
    assert_eq!(info["email"], "AliceSmith@email.com");
    assert!(info.get("phone_number").is_none(), "phone scope not granted");

    let response = env
        .client
        .get(env.userinfo_url())
        .bearer_auth("not-a-token")
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}

/// Tests that end session notifies the clients of the session.
#[tokio::test]
async fn test_end_session_lists_front_channel_clients() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let code = env.site1_code("openid", &[]).await?;
    let tokens: TokenBody = env.redeem(&code, &[]).await?.json().await?;
    let id_token = tokens.id_token.unwrap_or_default();

    let mut url = Url::parse(&env.url("/connect/endsession"))?;
    url.query_pairs_mut()
        .append_pair("id_token_hint", &id_token)
        .append_pair("post_logout_redirect_uri", "http://localhost:5001/signout-callback-oidc");
    let response = env.client.get(url.as_str()).send().await?;
    assert_eq!(response.status(), StatusCode::OK);
    let page = response.text().await?;
    assert!(page.contains("http://localhost:5001/signout-oidc?iss="));
    assert!(page.contains("http://localhost:5001/signout-callback-oidc"));

    // The provider session is gone, so the next request must log in again.
    let url = env.authorize_url("WebSite1", SITE1_REDIRECT, &[("scope", "openid")]);
    let response = env.client.get(&url).send().await?;
    assert!(location(&response)?.contains("/account/login"));
    Ok(())
}

/// Tests that bad credentials keep the user on the login page.
#[tokio::test]
async fn test_login_with_wrong_password() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let response = env
        .client
        .post(env.url("/account/login"))
        .form(&[("username", "alice"), ("password", "wrong"), ("returnUrl", "/")])
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.text().await?.contains("Invalid username or password"));
    Ok(())
}

/// Tests that the token endpoint rejects a wrong client secret.
#[tokio::test]
async fn test_token_endpoint_rejects_bad_secret() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let code = env.site1_code("openid", &[]).await?;
    let response = env
        .client
        .post(env.token_url())
        .basic_auth("WebSite1", Some("wrong"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", SITE1_REDIRECT),
        ])
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: ErrorBody = response.json().await?;
    assert_eq!(body.error, "invalid_client");
    Ok(())
}

/// Decodes a JWT payload without verification.
pub fn payload(token: &str) -> anyhow::Result<Value> {
    use base64::Engine as _;
    let part = token
        .split('.')
        .nth(1)
        .ok_or_else(|| anyhow::anyhow!("malformed token"))?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(part)?;
    Ok(serde_json::from_slice(&bytes)?)
}
