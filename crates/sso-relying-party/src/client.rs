//! OpenID Connect client for the authorization code flow.
//!
//! The provider is discovered lazily on first use, so a site can start
//! before its provider does. Every sign-in carries `state`, `nonce` and a
//! PKCE S256 challenge.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use sso_crypto::random::random_base64url;
use sso_protocol_oidc::pkce::challenge_for;
use sso_protocol_oidc::token::compute_at_hash;
use sso_protocol_oidc::{
    AccessTokenClaims, CodeChallengeMethod, IdTokenClaims, ProviderMetadata, TokenResponse,
    TokenType, TokenValidator, ValidationOptions,
};
use tokio::sync::OnceCell;
use url::Url;

use crate::config::RelyingPartyConfig;
use crate::error::{RelyingPartyError, RelyingPartyResult};
use crate::jwks::RemoteJwks;

/// A sign-in started by this site and not yet completed.
#[derive(Debug, Clone)]
pub struct PendingSignIn {
    /// Value of the `state` parameter.
    pub state: String,
    /// Value of the `nonce` parameter.
    pub nonce: String,
    /// PKCE code verifier.
    pub code_verifier: String,
    /// Local URL to return to after sign-in.
    pub return_url: String,
    /// When the sign-in started.
    pub started: Instant,
}

/// Where to send the browser to sign in, and what to remember meanwhile.
#[derive(Debug, Clone)]
pub struct AuthorizationRedirect {
    /// Authorization endpoint URL with every parameter.
    pub url: String,
    /// State kept until the callback.
    pub pending: PendingSignIn,
}

/// Result of a completed sign-in.
#[derive(Debug, Clone)]
pub struct SignedIn {
    /// Validated identity token claims.
    pub id_claims: IdTokenClaims,
    /// Tokens returned by the provider.
    pub tokens: TokenResponse,
}

struct Provider {
    metadata: ProviderMetadata,
    keys: Arc<RemoteJwks>,
}

/// Client of one OpenID provider.
pub struct OidcClient {
    config: Arc<RelyingPartyConfig>,
    http: reqwest::Client,
    provider: OnceCell<Provider>,
}

impl std::fmt::Debug for OidcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OidcClient")
            .field("authority", &self.config.authority)
            .field("client_id", &self.config.client_id)
            .field("discovered", &self.provider.initialized())
            .finish_non_exhaustive()
    }
}

impl OidcClient {
    /// Creates a client. Nothing is fetched until first use.
    ///
    /// # Errors
    ///
    /// Returns `RelyingPartyError::Http` if the HTTP client cannot be built.
    pub fn new(config: Arc<RelyingPartyConfig>) -> RelyingPartyResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self {
            config,
            http,
            provider: OnceCell::new(),
        })
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &RelyingPartyConfig {
        &self.config
    }

    async fn provider(&self) -> RelyingPartyResult<&Provider> {
        self.provider.get_or_try_init(|| self.discover()).await
    }

    async fn discover(&self) -> RelyingPartyResult<Provider> {
        let url = self.config.discovery_url();
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RelyingPartyError::Discovery(format!(
                "{url} returned {status}"
            )));
        }
        let metadata: ProviderMetadata = response.json().await?;
        if metadata.issuer != self.config.authority {
            return Err(RelyingPartyError::Discovery(format!(
                "issuer {} does not match authority {}",
                metadata.issuer, self.config.authority
            )));
        }

        let keys = RemoteJwks::new(
            self.http.clone(),
            metadata.jwks_uri.clone(),
            self.config.jwks_refresh_cooldown,
        )
        .with_max_age(self.config.jwks_cache_ttl);
        if let Err(e) = keys.refresh().await {
            // Unknown kids retry later.
            tracing::warn!(error = %e, "Initial key set fetch failed");
        }
        tracing::info!(issuer = %metadata.issuer, "Provider discovered");
        Ok(Provider {
            metadata,
            keys: Arc::new(keys),
        })
    }

    /// Returns the provider metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails.
    pub async fn metadata(&self) -> RelyingPartyResult<&ProviderMetadata> {
        Ok(&self.provider().await?.metadata)
    }

    /// Returns the provider's key set cache.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails.
    pub async fn keys(&self) -> RelyingPartyResult<Arc<RemoteJwks>> {
        Ok(Arc::clone(&self.provider().await?.keys))
    }

    /// Starts a sign-in that will return to `return_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails or the authorization endpoint
    /// is not a URL.
    pub async fn authorization_redirect(
        &self,
        return_url: impl Into<String>,
    ) -> RelyingPartyResult<AuthorizationRedirect> {
        let metadata = self.metadata().await?;
        let pending = PendingSignIn {
            state: random_base64url(16),
            nonce: random_base64url(16),
            code_verifier: random_base64url(32),
            return_url: return_url.into(),
            started: Instant::now(),
        };

        let mut url = Url::parse(&metadata.authorization_endpoint)
            .map_err(|e| RelyingPartyError::Discovery(format!("authorization_endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", &pending.state)
            .append_pair("nonce", &pending.nonce)
            .append_pair(
                "code_challenge",
                &challenge_for(&pending.code_verifier, CodeChallengeMethod::S256),
            )
            .append_pair("code_challenge_method", "S256");

        Ok(AuthorizationRedirect {
            url: url.into(),
            pending,
        })
    }

    /// Redeems `code` and validates the returned identity token.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails, the identity token is
    /// missing or invalid, or its `nonce` or `at_hash` do not match.
    pub async fn sign_in(&self, code: &str, pending: &PendingSignIn) -> RelyingPartyResult<SignedIn> {
        let tokens = self.exchange_code(code, &pending.code_verifier).await?;
        let id_token = tokens.id_token.as_deref().ok_or_else(|| {
            RelyingPartyError::InvalidCallback("token response has no id_token".to_string())
        })?;
        let id_claims = self
            .validate_id_token(id_token, &pending.nonce, &tokens.access_token)
            .await?;
        Ok(SignedIn { id_claims, tokens })
    }

    /// Exchanges an authorization code at the token endpoint.
    ///
    /// # Errors
    ///
    /// Returns `RelyingPartyError::TokenEndpoint` when the provider refuses.
    pub async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> RelyingPartyResult<TokenResponse> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.config.redirect_uri),
            ("code_verifier", code_verifier),
        ])
        .await
    }

    /// Exchanges a refresh token for a new token set.
    ///
    /// # Errors
    ///
    /// Returns `RelyingPartyError::TokenEndpoint` when the provider refuses.
    pub async fn refresh(&self, refresh_token: &str) -> RelyingPartyResult<TokenResponse> {
        self.token_request(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> RelyingPartyResult<TokenResponse> {
        let metadata = self.metadata().await?;
        let response = self
            .http
            .post(&metadata.token_endpoint)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body: Value = response.json().await.unwrap_or(Value::Null);
        let field = |name: &str| body.get(name).and_then(Value::as_str).map(String::from);
        Err(RelyingPartyError::TokenEndpoint {
            status: status.as_u16(),
            error: field("error").unwrap_or_else(|| "unknown_error".to_string()),
            description: field("error_description"),
        })
    }

    /// Validates an identity token issued to this client.
    ///
    /// # Errors
    ///
    /// Returns `RelyingPartyError::Token` for signature or claim failures
    /// and `RelyingPartyError::InvalidCallback` for a replayed or foreign
    /// token.
    pub async fn validate_id_token(
        &self,
        id_token: &str,
        expected_nonce: &str,
        access_token: &str,
    ) -> RelyingPartyResult<IdTokenClaims> {
        let claims: IdTokenClaims = self
            .validator(&self.config.client_id, TokenType::Id)
            .await?
            .validate(id_token)
            .await?;

        if claims.nonce.as_deref() != Some(expected_nonce) {
            return Err(RelyingPartyError::InvalidCallback(
                "nonce mismatch".to_string(),
            ));
        }
        if let Some(at_hash) = claims.at_hash.as_deref() {
            if at_hash != compute_at_hash(access_token) {
                return Err(RelyingPartyError::InvalidCallback(
                    "at_hash does not match the access token".to_string(),
                ));
            }
        }
        Ok(claims)
    }

    /// Validates a bearer access token presented to this site's API.
    ///
    /// # Errors
    ///
    /// Returns `RelyingPartyError::Token` unless the token was issued by
    /// the provider for this site's audience and is current.
    pub async fn validate_access_token(&self, token: &str) -> RelyingPartyResult<AccessTokenClaims> {
        let claims = self
            .validator(&self.config.audience, TokenType::Access)
            .await?
            .validate(token)
            .await?;
        Ok(claims)
    }

    async fn validator(
        &self,
        audience: &str,
        token_type: TokenType,
    ) -> RelyingPartyResult<TokenValidator<Arc<RemoteJwks>>> {
        let provider = self.provider().await?;
        let options = ValidationOptions::new(&provider.metadata.issuer, audience)
            .with_token_type(token_type)
            .with_leeway(self.config.clock_skew_secs);
        Ok(TokenValidator::new(Arc::clone(&provider.keys), options))
    }

    /// Builds the provider logout URL, returning to this site afterwards.
    ///
    /// Returns `None` when the provider has no end session endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails.
    pub async fn end_session_url(
        &self,
        id_token_hint: Option<&str>,
    ) -> RelyingPartyResult<Option<String>> {
        let metadata = self.metadata().await?;
        let Some(endpoint) = metadata.end_session_endpoint.as_deref() else {
            return Ok(None);
        };
        let mut url = Url::parse(endpoint)
            .map_err(|e| RelyingPartyError::Discovery(format!("end_session_endpoint: {e}")))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(hint) = id_token_hint {
                query.append_pair("id_token_hint", hint);
            }
            query
                .append_pair("client_id", &self.config.client_id)
                .append_pair(
                    "post_logout_redirect_uri",
                    &self.config.post_logout_redirect_uri(),
                );
        }
        Ok(Some(url.into()))
    }

    /// Returns the issuer once discovered.
    ///
    /// # Errors
    ///
    /// Returns an error if discovery fails.
    pub async fn issuer(&self) -> RelyingPartyResult<&str> {
        Ok(&self.metadata().await?.issuer)
    }
}
