//! Common test utilities and fixtures.

use std::time::Duration;

use reqwest::{redirect::Policy, Client, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::oneshot;
use url::Url;

use sso_server::{Server, ServerConfig};

/// Redirect URI registered for `WebSite1`.
pub const SITE1_REDIRECT: &str = "http://localhost:5001/signin-oidc";

/// Redirect URI registered for `WebSite2`.
pub const SITE2_REDIRECT: &str = "http://localhost:5002/signin-oidc";

/// Token response from the token endpoint.
#[derive(Debug, Deserialize)]
pub struct TokenBody {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub scope: String,
}

/// Error response.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub error_description: Option<String>,
}

/// A running provider and a browser-like client pointed at it.
pub struct TestEnv {
    /// Issuer URL of the running provider.
    pub issuer: String,
    /// Client with a cookie store that does not follow redirects.
    pub client: Client,
    _shutdown_tx: oneshot::Sender<()>,
}

impl TestEnv {
    /// Starts the provider on an ephemeral port with the built-in realm.
    pub async fn new() -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("sso_server=debug,sso_protocol_oidc=debug")
            .with_test_writer()
            .try_init();

        let server = Server::bind(ServerConfig::for_testing()).await?;
        let issuer = server.issuer().to_string();

        let (_shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let signal = async {
                let _ = shutdown_rx.await;
            };
            if let Err(e) = server.run_until(signal).await {
                tracing::error!("Server error: {}", e);
            }
        });

        let client = browser()?;
        wait_for_server(&client, &issuer).await?;

        Ok(Self {
            issuer,
            client,
            _shutdown_tx,
        })
    }

    /// Returns `path` on the provider.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.issuer, path)
    }

    /// Returns the token endpoint URL.
    pub fn token_url(&self) -> String {
        self.url("/connect/token")
    }

    /// Returns the userinfo endpoint URL.
    pub fn userinfo_url(&self) -> String {
        self.url("/connect/userinfo")
    }

    /// Returns an authorization URL for `client_id` with `extra` parameters.
    pub fn authorize_url(&self, client_id: &str, redirect_uri: &str, extra: &[(&str, &str)]) -> String {
        let mut url = Url::parse(&self.url("/connect/authorize")).expect("authorize url");
        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code");
        for (k, v) in extra {
            url.query_pairs_mut().append_pair(k, v);
        }
        url.to_string()
    }

    /// Follows an authorization URL through the login page as `username`
    /// and returns the final redirect to the client.
    pub async fn sign_in(&self, authorize_url: &str, username: &str) -> anyhow::Result<Url> {
        let response = self.client.get(authorize_url).send().await?;
        let location = location(&response)?;
        if !location.contains("/account/login") {
            // Already signed in.
            return Ok(Url::parse(&location)?);
        }

        let login = Url::parse(&self.issuer)?.join(&location)?;
        let return_url = query_param(&login, "returnUrl").unwrap_or_default();
        let response = self
            .client
            .post(login.as_str())
            .form(&[
                ("username", username),
                ("password", "password"),
                ("returnUrl", return_url.as_str()),
            ])
            .send()
            .await?;
        anyhow::ensure!(
            response.status() == StatusCode::SEE_OTHER,
            "login returned {}",
            response.status()
        );

        let resume = Url::parse(&self.issuer)?.join(&location_of(&response)?)?;
        let response = self.client.get(resume.as_str()).send().await?;
        Ok(Url::parse(&self::location(&response)?)?)
    }

    /// Signs in to `WebSite1` and returns the authorization code.
    pub async fn site1_code(&self, scope: &str, extra: &[(&str, &str)]) -> anyhow::Result<String> {
        let mut params = vec![("scope", scope), ("state", "s1")];
        params.extend_from_slice(extra);
        let callback = self
            .sign_in(&self.authorize_url("WebSite1", SITE1_REDIRECT, &params), "alice")
            .await?;
        query_param(&callback, "code").ok_or_else(|| anyhow::anyhow!("no code in {callback}"))
    }

    /// Redeems `code` for `WebSite1`.
    pub async fn redeem(&self, code: &str, extra: &[(&str, &str)]) -> anyhow::Result<Response> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", SITE1_REDIRECT),
        ];
        form.extend_from_slice(extra);
        Ok(self
            .client
            .post(self.token_url())
            .basic_auth("WebSite1", Some("secret"))
            .form(&form)
            .send()
            .await?)
    }
}

/// Builds a client with a cookie store that never follows redirects.
pub fn browser() -> anyhow::Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(10))
        .cookie_store(true)
        .redirect(Policy::none())
        .build()?)
}

/// Returns the `Location` header of a redirect.
pub fn location(response: &Response) -> anyhow::Result<String> {
    anyhow::ensure!(
        response.status().is_redirection(),
        "expected a redirect, got {}",
        response.status()
    );
    location_of(response)
}

fn location_of(response: &Response) -> anyhow::Result<String> {
    Ok(response
        .headers()
        .get(reqwest::header::LOCATION)
        .ok_or_else(|| anyhow::anyhow!("no Location header"))?
        .to_str()?
        .to_string())
}

/// Returns a query parameter of `url`.
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Waits for the server to be ready.
async fn wait_for_server(client: &Client, base_url: &str) -> anyhow::Result<()> {
    let health_url = format!("{base_url}/health/live");
    let max_attempts = 50;

    for attempt in 1..=max_attempts {
        match client.get(&health_url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("Server ready after {} attempts", attempt);
                return Ok(());
            }
            Ok(response) => {
                tracing::debug!("Server not ready (status {}), attempt {}", response.status(), attempt);
            }
            Err(e) => {
                tracing::debug!("Server not reachable ({}), attempt {}", e, attempt);
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    anyhow::bail!("Server did not become ready")
}
