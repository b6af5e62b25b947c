//! Token operation integration tests (code redemption, refresh).

use std::sync::Arc;

use reqwest::StatusCode;
use sso_relying_party::{OidcClient, RelyingPartyConfig, RelyingPartyError};

use crate::auth_flows::payload;
use crate::common::{ErrorBody, TestEnv, TokenBody};

fn site1_client(env: &TestEnv) -> anyhow::Result<OidcClient> {
    let mut config = RelyingPartyConfig::for_site("WebSite1", 5001);
    config.authority = env.issuer.clone();
    Ok(OidcClient::new(Arc::new(config))?)
}

/// Tests that an authorization code can be redeemed only once.
#[tokio::test]
async fn test_code_is_single_use() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let code = env.site1_code("openid WebSite1", &[]).await?;

    let first = env.redeem(&code, &[]).await?;
    assert_eq!(first.status(), StatusCode::OK);

    let second = env.redeem(&code, &[]).await?;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = second.json().await?;
    assert_eq!(body.error, "invalid_grant");
    Ok(())
}

/// Tests that concurrent redemptions of one code yield exactly one token.
#[tokio::test]
async fn test_concurrent_redemption_has_one_winner() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let code = env.site1_code("openid WebSite1", &[]).await?;

    let attempts = (0..8).map(|_| env.redeem(&code, &[]));
    let statuses: Vec<StatusCode> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|r| r.map(|response| response.status()))
        .collect::<Result<_, _>>()?;

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 1);
    assert!(statuses
        .iter()
        .all(|s| *s == StatusCode::OK || *s == StatusCode::BAD_REQUEST));
    Ok(())
}

/// Tests that a code issued to one client cannot be redeemed by another.
#[tokio::test]
async fn test_code_bound_to_client() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let code = env.site1_code("openid", &[]).await?;

    let response = env
        .client
        .post(env.token_url())
        .basic_auth("WebSite2", Some("secret"))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", "http://localhost:5002/signin-oidc"),
        ])
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = response.json().await?;
    assert_eq!(body.error, "invalid_grant");

    // The failed attempt spent the code.
    let response = env.redeem(&code, &[]).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

/// Tests that `offline_access` yields a refresh token the relying party can use.
#[tokio::test]
async fn test_refresh_through_relying_party_client() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let code = env.site1_code("openid WebSite1 offline_access", &[]).await?;
    let tokens: TokenBody = env.redeem(&code, &[]).await?.json().await?;
    let refresh_token = tokens.refresh_token.expect("offline_access yields a refresh token");

    let client = site1_client(&env)?;
    let refreshed = client.refresh(&refresh_token).await?;
    assert_ne!(refreshed.access_token, tokens.access_token);
    assert!(refreshed.refresh_token.is_some());
    assert_eq!(refreshed.scope, "openid WebSite1 offline_access");

    let claims = client.validate_access_token(&refreshed.access_token).await?;
    assert_eq!(claims.sub, "1");

    let original = payload(&tokens.access_token)?;
    let renewed = payload(&refreshed.access_token)?;
    assert_eq!(original["sid"], renewed["sid"]);
    Ok(())
}

/// Tests that a refresh may narrow but never widen the grant.
#[tokio::test]
async fn test_refresh_scope_cannot_widen() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let code = env.site1_code("openid WebSite1 offline_access", &[]).await?;
    let tokens: TokenBody = env.redeem(&code, &[]).await?.json().await?;
    let refresh_token = tokens.refresh_token.unwrap_or_default();

    let refresh = |scope: &'static str| {
        env.client
            .post(env.token_url())
            .basic_auth("WebSite1", Some("secret"))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("scope", scope),
            ])
            .send()
    };

    let narrowed = refresh("openid offline_access").await?;
    assert_eq!(narrowed.status(), StatusCode::OK);
    let narrowed: TokenBody = narrowed.json().await?;
    assert_eq!(narrowed.scope, "openid offline_access");

    let widened = refresh("openid WebSite1 offline_access profile").await?;
    assert_eq!(widened.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = widened.json().await?;
    assert_eq!(body.error, "invalid_scope");
    Ok(())
}

/// Tests that no refresh token is issued without `offline_access`, and that a
/// refresh token cannot be replayed by another client.
#[tokio::test]
async fn test_refresh_token_bound_to_client() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let code = env.site1_code("openid WebSite1 offline_access", &[]).await?;
    let tokens: TokenBody = env.redeem(&code, &[]).await?.json().await?;
    let refresh_token = tokens.refresh_token.unwrap_or_default();

    let response = env
        .client
        .post(env.token_url())
        .basic_auth("WebSite2", Some("secret"))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
        ])
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = response.json().await?;
    assert_eq!(body.error, "invalid_grant");

    let client = site1_client(&env)?;
    assert!(matches!(
        client.refresh(&tokens.access_token).await,
        Err(RelyingPartyError::TokenEndpoint { .. })
    ));
    Ok(())
}
