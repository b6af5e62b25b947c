//! Authorization request validation and code issuance.
//!
//! A request moves through fixed stages:
//!
//! ```text
//! ReceivedRequest -> ValidatingClient -> ValidatingScopes
//!     -> AuthenticatingUser -> IssuingCode -> Redirecting
//! ```
//!
//! Any stage may end in `Rejected`. Rejections raised while validating the
//! client carry no redirect target: an unknown client or unregistered
//! redirect URI is never trusted with a redirect.

use std::fmt;

use sso_core::config::{MAX_AUTH_CODE_LIFETIME_SECS, MIN_AUTH_CODE_LIFETIME_SECS};
use sso_core::{ProviderPolicy, ScopePolicy};
use sso_model::{scope, Client};
use sso_session::UserSession;
use sso_storage::{ClientProvider, ResourceProvider};

use crate::code_store::{AuthCodeParams, AuthCodeStore, StoredAuthCode};
use crate::error::{OidcError, OidcResult};
use crate::pkce;
use crate::request::AuthorizationRequest;
use crate::types::{CodeChallengeMethod, Prompt, ResponseMode, ResponseType};

/// Stages of an authorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizeStage {
    /// Parameters received, nothing checked.
    ReceivedRequest,
    /// Checking `client_id` and `redirect_uri`.
    ValidatingClient,
    /// Checking response type, scopes, PKCE and prompt.
    ValidatingScopes,
    /// Waiting for the subject to sign in.
    AuthenticatingUser,
    /// Minting and storing the code.
    IssuingCode,
    /// Sending the browser back to the client.
    Redirecting,
    /// Terminal failure.
    Rejected,
}

impl fmt::Display for AuthorizeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ReceivedRequest => "received_request",
            Self::ValidatingClient => "validating_client",
            Self::ValidatingScopes => "validating_scopes",
            Self::AuthenticatingUser => "authenticating_user",
            Self::IssuingCode => "issuing_code",
            Self::Redirecting => "redirecting",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Where and how to send an authorization response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    /// Registered redirect URI.
    pub redirect_uri: String,
    /// How parameters are delivered.
    pub response_mode: ResponseMode,
    /// State to echo back.
    pub state: Option<String>,
}

impl RedirectTarget {
    /// Parameters for a successful response.
    #[must_use]
    pub fn success_params(&self, code: &str) -> Vec<(String, String)> {
        let mut params = vec![("code".to_string(), code.to_string())];
        self.push_state(&mut params);
        params
    }

    /// Parameters for an error response.
    #[must_use]
    pub fn error_params(&self, error: &OidcError) -> Vec<(String, String)> {
        let mut params = vec![
            ("error".to_string(), error.error_code().to_string()),
            ("error_description".to_string(), error.to_string()),
        ];
        self.push_state(&mut params);
        params
    }

    fn push_state(&self, params: &mut Vec<(String, String)>) {
        if let Some(state) = &self.state {
            params.push(("state".to_string(), state.clone()));
        }
    }

    /// Appends `params` to the redirect URI as a query string.
    #[must_use]
    pub fn query_url(&self, params: &[(String, String)]) -> String {
        let encoded = params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let separator = if self.redirect_uri.contains('?') { '&' } else { '?' };
        format!("{}{separator}{encoded}", self.redirect_uri)
    }
}

/// A failed authorization request.
#[derive(Debug)]
pub struct AuthorizationRejection {
    /// Stage at which the request failed.
    pub stage: AuthorizeStage,
    /// Protocol error.
    pub error: OidcError,
    /// Where to report the error; `None` means render it directly.
    pub redirect: Option<RedirectTarget>,
}

/// A request that passed every check that does not need the subject.
#[derive(Debug, Clone)]
pub struct ValidatedAuthorization {
    /// The requesting client.
    pub client: Client,
    /// Response target.
    pub target: RedirectTarget,
    /// Scopes that will be granted.
    pub scopes: Vec<String>,
    /// Nonce to bind into the ID token.
    pub nonce: Option<String>,
    /// PKCE challenge and method.
    pub pkce: Option<(String, CodeChallengeMethod)>,
    /// `prompt=none`.
    pub prompt_none: bool,
    /// `prompt=login`.
    pub force_login: bool,
}

impl ValidatedAuthorization {
    /// Builds a redirectable rejection for this request.
    #[must_use]
    pub fn reject(&self, stage: AuthorizeStage, error: OidcError) -> AuthorizationRejection {
        AuthorizationRejection {
            stage,
            error,
            redirect: Some(self.target.clone()),
        }
    }
}

/// Validates authorization requests and issues codes.
pub struct Authorizer<'a> {
    clients: &'a dyn ClientProvider,
    resources: &'a dyn ResourceProvider,
    policy: &'a ProviderPolicy,
}

impl<'a> Authorizer<'a> {
    /// Creates an authorizer over the given registries.
    #[must_use]
    pub fn new(
        clients: &'a dyn ClientProvider,
        resources: &'a dyn ResourceProvider,
        policy: &'a ProviderPolicy,
    ) -> Self {
        Self {
            clients,
            resources,
            policy,
        }
    }

    /// Runs the client and scope stages.
    ///
    /// # Errors
    ///
    /// Returns the rejection, with a redirect target only once the client
    /// and redirect URI are trusted.
    pub async fn validate(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<ValidatedAuthorization, AuthorizationRejection> {
        tracing::debug!(
            stage = %AuthorizeStage::ReceivedRequest,
            client_id = request.client_id.as_deref().unwrap_or_default(),
            "Authorization request"
        );

        let (client, redirect_uri) =
            self.validate_client(request)
                .await
                .map_err(|error| AuthorizationRejection {
                    stage: AuthorizeStage::ValidatingClient,
                    error,
                    redirect: None,
                })?;

        // An unparseable response_mode falls back to query so the error can
        // still be delivered.
        let parsed_mode = request
            .response_mode
            .as_deref()
            .map(str::parse::<ResponseMode>)
            .transpose();
        let target = RedirectTarget {
            redirect_uri,
            response_mode: parsed_mode.clone().ok().flatten().unwrap_or_default(),
            state: request.state.clone(),
        };
        let reject = |error| AuthorizationRejection {
            stage: AuthorizeStage::ValidatingScopes,
            error,
            redirect: Some(target.clone()),
        };

        if let Err(e) = parsed_mode {
            return Err(reject(OidcError::InvalidRequest(e)));
        }
        Self::validate_response_type(request).map_err(reject)?;
        let scopes = self.validate_scopes(&client, request).await.map_err(reject)?;
        let pkce = Self::validate_pkce(request).map_err(reject)?;

        let prompts = request.prompt_values();
        if prompts.contains(&Prompt::None) && prompts.len() > 1 {
            return Err(reject(OidcError::InvalidRequest(
                "prompt=none cannot be combined with other prompt values".to_string(),
            )));
        }

        Ok(ValidatedAuthorization {
            client,
            target,
            scopes,
            nonce: request.nonce.clone(),
            pkce,
            prompt_none: prompts.contains(&Prompt::None),
            force_login: prompts.contains(&Prompt::Login),
        })
    }

    async fn validate_client(
        &self,
        request: &AuthorizationRequest,
    ) -> OidcResult<(Client, String)> {
        let client_id = request
            .client_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| OidcError::InvalidClient("client_id is required".to_string()))?;

        let client = self.clients.get_by_client_id(client_id).await.map_err(|e| {
            tracing::debug!(client_id, error = %e, "Unknown client");
            OidcError::InvalidClient("unknown client".to_string())
        })?;

        let redirect_uri = request
            .redirect_uri
            .as_deref()
            .ok_or_else(|| OidcError::InvalidRedirectUri("redirect_uri is required".to_string()))?;

        if !client.is_redirect_uri_registered(redirect_uri) {
            tracing::warn!(client_id, redirect_uri, "Unregistered redirect_uri");
            return Err(OidcError::InvalidRedirectUri(
                "redirect_uri is not registered for this client".to_string(),
            ));
        }

        Ok((client, redirect_uri.to_string()))
    }

    fn validate_response_type(request: &AuthorizationRequest) -> OidcResult<()> {
        let response_type = request
            .response_type
            .as_deref()
            .ok_or_else(|| OidcError::InvalidRequest("response_type is required".to_string()))?;
        response_type
            .parse::<ResponseType>()
            .map(|_| ())
            .map_err(OidcError::UnsupportedResponseType)
    }

    /// Resolves requested scopes to granted scopes under the scope policy.
    async fn validate_scopes(
        &self,
        client: &Client,
        request: &AuthorizationRequest,
    ) -> OidcResult<Vec<String>> {
        let requested = request.scopes();
        if requested.is_empty() {
            return Err(OidcError::InvalidScope("scope is required".to_string()));
        }

        let mut granted = Vec::with_capacity(requested.len());
        for name in requested {
            if let Some(reason) = self.disallowed_reason(client, &name).await {
                match self.policy.scope_policy {
                    ScopePolicy::RejectAll => {
                        tracing::debug!(client_id = %client.client_id, scope = %name, reason, "Scope rejected");
                        return Err(OidcError::InvalidScope(format!("scope '{name}' {reason}")));
                    }
                    ScopePolicy::DropDisallowed => {
                        tracing::debug!(client_id = %client.client_id, scope = %name, reason, "Scope dropped");
                        continue;
                    }
                }
            }
            granted.push(name);
        }

        if !granted.iter().any(|s| s == scope::OPENID) {
            return Err(OidcError::InvalidScope("the openid scope is required".to_string()));
        }
        Ok(granted)
    }

    async fn disallowed_reason(&self, client: &Client, name: &str) -> Option<&'static str> {
        if name == scope::OFFLINE_ACCESS {
            let allowed = self
                .policy
                .offline_access
                .allows(client.is_scope_allowed(scope::OFFLINE_ACCESS));
            return (!allowed).then_some("is not allowed for this client");
        }
        if !client.is_scope_allowed(name) {
            return Some("is not allowed for this client");
        }
        if self.resources.find_by_name(name).await.is_err() {
            return Some("is unknown");
        }
        None
    }

    fn validate_pkce(
        request: &AuthorizationRequest,
    ) -> OidcResult<Option<(String, CodeChallengeMethod)>> {
        match (&request.code_challenge, &request.code_challenge_method) {
            (Some(challenge), method) => {
                if !pkce::is_well_formed(challenge) {
                    return Err(OidcError::InvalidRequest(
                        "code_challenge must be 43-128 unreserved characters".to_string(),
                    ));
                }
                // RFC 7636 4.3: an absent method means plain.
                let method = method
                    .as_deref()
                    .map(str::parse)
                    .transpose()
                    .map_err(OidcError::InvalidRequest)?
                    .unwrap_or(CodeChallengeMethod::Plain);
                Ok(Some((challenge.clone(), method)))
            }
            (None, Some(_)) => Err(OidcError::InvalidRequest(
                "code_challenge_method requires code_challenge".to_string(),
            )),
            (None, None) => Ok(None),
        }
    }

    /// Mints a code for an authenticated subject and stores it.
    ///
    /// Returns the raw code value; only its hash is stored.
    ///
    /// # Errors
    ///
    /// Returns `OidcError::ServerError` if the store fails.
    pub async fn issue_code(
        &self,
        codes: &dyn AuthCodeStore,
        validated: &ValidatedAuthorization,
        session: &UserSession,
        now: i64,
    ) -> OidcResult<String> {
        let code = sso_crypto::random::generate_auth_code();
        let ttl_seconds = self
            .policy
            .lifetimes
            .auth_code
            .clamp(MIN_AUTH_CODE_LIFETIME_SECS, MAX_AUTH_CODE_LIFETIME_SECS);

        let (challenge, method) = validated.pkce.clone().unzip();
        let stored = StoredAuthCode::new(
            &code,
            AuthCodeParams {
                client_id: validated.client.client_id.clone(),
                subject_id: session.subject_id.clone(),
                redirect_uri: validated.target.redirect_uri.clone(),
                scopes: validated.scopes.clone(),
                ttl_seconds,
            },
            now,
        )
        .with_nonce(validated.nonce.clone())
        .with_pkce(challenge, method)
        .with_session(&session.id, session.auth_time_unix());

        codes.store(stored).await?;
        tracing::debug!(
            stage = %AuthorizeStage::IssuingCode,
            client_id = %validated.client.client_id,
            subject = %session.subject_id,
            ttl_seconds,
            "Authorization code issued"
        );
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code_store::InMemoryAuthCodeStore;
    use sso_storage::{seed, InMemoryStore};

    fn store() -> InMemoryStore {
        InMemoryStore::from_snapshot(seed::default_realm()).unwrap()
    }

    fn request(client_id: &str, redirect_uri: &str, scope: &str) -> AuthorizationRequest {
        AuthorizationRequest {
            response_type: Some("code".into()),
            client_id: Some(client_id.into()),
            redirect_uri: Some(redirect_uri.into()),
            scope: Some(scope.into()),
            state: Some("xyz".into()),
            ..AuthorizationRequest::default()
        }
    }

    const WS1_CALLBACK: &str = "http://localhost:5001/signin-oidc";

    #[tokio::test]
    async fn own_api_and_identity_scopes_are_granted() {
        let store = store();
        let policy = ProviderPolicy::default();
        let authorizer = Authorizer::new(&store, &store, &policy);

        let validated = authorizer
            .validate(&request("WebSite1", WS1_CALLBACK, "WebSite1 openid profile"))
            .await
            .unwrap();
        assert_eq!(validated.scopes, vec!["WebSite1", "openid", "profile"]);
        assert_eq!(validated.target.state.as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn foreign_api_scope_is_rejected_with_redirect() {
        let store = store();
        let policy = ProviderPolicy::default();
        let authorizer = Authorizer::new(&store, &store, &policy);

        let rejection = authorizer
            .validate(&request("WebSite1", WS1_CALLBACK, "openid WebSite2"))
            .await
            .unwrap_err();
        assert_eq!(rejection.stage, AuthorizeStage::ValidatingScopes);
        assert_eq!(rejection.error.error_code(), "invalid_scope");
        assert!(rejection.redirect.is_some());
    }

    #[tokio::test]
    async fn drop_policy_removes_disallowed_scopes() {
        let store = store();
        let policy = ProviderPolicy {
            scope_policy: ScopePolicy::DropDisallowed,
            ..ProviderPolicy::default()
        };
        let authorizer = Authorizer::new(&store, &store, &policy);

        let validated = authorizer
            .validate(&request("WebSite1", WS1_CALLBACK, "openid WebSite2 nonsense"))
            .await
            .unwrap();
        assert_eq!(validated.scopes, vec!["openid"]);
    }

    #[tokio::test]
    async fn redirect_uri_must_match_exactly() {
        let store = store();
        let policy = ProviderPolicy::default();
        let authorizer = Authorizer::new(&store, &store, &policy);

        for uri in [
            "http://localhost:5001/signin-oidc/",
            "http://localhost:5001/signin-oidc/extra",
            "http://localhost:5001/signin",
            "http://localhost:5002/signin-oidc",
        ] {
            let rejection = authorizer
                .validate(&request("WebSite1", uri, "openid"))
                .await
                .unwrap_err();
            assert_eq!(rejection.stage, AuthorizeStage::ValidatingClient);
            assert!(rejection.redirect.is_none(), "{uri} must not be redirected to");
        }
    }

    #[tokio::test]
    async fn unknown_client_is_not_redirected() {
        let store = store();
        let policy = ProviderPolicy::default();
        let authorizer = Authorizer::new(&store, &store, &policy);

        let rejection = authorizer
            .validate(&request("Evil", WS1_CALLBACK, "openid"))
            .await
            .unwrap_err();
        assert_eq!(rejection.error.error_code(), "invalid_client");
        assert!(rejection.redirect.is_none());
    }

    #[tokio::test]
    async fn openid_is_required_and_response_type_checked() {
        let store = store();
        let policy = ProviderPolicy::default();
        let authorizer = Authorizer::new(&store, &store, &policy);

        let rejection = authorizer
            .validate(&request("WebSite1", WS1_CALLBACK, "WebSite1"))
            .await
            .unwrap_err();
        assert_eq!(rejection.error.error_code(), "invalid_scope");

        let mut token_request = request("WebSite1", WS1_CALLBACK, "openid");
        token_request.response_type = Some("token".into());
        let rejection = authorizer.validate(&token_request).await.unwrap_err();
        assert_eq!(rejection.error.error_code(), "unsupported_response_type");
    }

    #[tokio::test]
    async fn offline_access_follows_policy() {
        let store = store();
        let disabled = ProviderPolicy {
            offline_access: sso_core::OfflineAccessPolicy::Disabled,
            ..ProviderPolicy::default()
        };
        let authorizer = Authorizer::new(&store, &store, &disabled);
        let rejection = authorizer
            .validate(&request("WebSite1", WS1_CALLBACK, "openid offline_access"))
            .await
            .unwrap_err();
        assert_eq!(rejection.error.error_code(), "invalid_scope");

        let default = ProviderPolicy::default();
        let authorizer = Authorizer::new(&store, &store, &default);
        let validated = authorizer
            .validate(&request("WebSite1", WS1_CALLBACK, "openid offline_access"))
            .await
            .unwrap();
        assert!(validated.scopes.iter().any(|s| s == "offline_access"));
    }

    #[tokio::test]
    async fn pkce_method_defaults_to_plain() {
        let store = store();
        let policy = ProviderPolicy::default();
        let authorizer = Authorizer::new(&store, &store, &policy);

        let mut req = request("WebSite1", WS1_CALLBACK, "openid");
        req.code_challenge = Some("a".repeat(43));
        let validated = authorizer.validate(&req).await.unwrap();
        assert_eq!(validated.pkce.unwrap().1, CodeChallengeMethod::Plain);

        req.code_challenge = Some("short".into());
        assert!(authorizer.validate(&req).await.is_err());
    }

    #[tokio::test]
    async fn issued_code_is_bound_to_request() {
        let store = store();
        let policy = ProviderPolicy::default();
        let authorizer = Authorizer::new(&store, &store, &policy);
        let codes = InMemoryAuthCodeStore::new();

        let mut req = request("WebSite1", WS1_CALLBACK, "openid WebSite1");
        req.nonce = Some("n-0S6_WzA2Mj".into());
        let validated = authorizer.validate(&req).await.unwrap();
        let session = UserSession::new("1");

        let code = authorizer
            .issue_code(&codes, &validated, &session, 1_000)
            .await
            .unwrap();
        let stored = codes.take(&code).await.unwrap().unwrap();

        assert_eq!(stored.client_id, "WebSite1");
        assert_eq!(stored.subject_id, "1");
        assert_eq!(stored.redirect_uri, WS1_CALLBACK);
        assert_eq!(stored.nonce.as_deref(), Some("n-0S6_WzA2Mj"));
        assert_eq!(stored.session_id.as_deref(), Some(session.id.as_str()));
        assert_eq!(stored.expires_at - stored.issued_at, 300);
    }

    #[test]
    fn error_redirect_echoes_state() {
        let target = RedirectTarget {
            redirect_uri: WS1_CALLBACK.into(),
            response_mode: ResponseMode::Query,
            state: Some("a b".into()),
        };
        let url = target.query_url(&target.error_params(&OidcError::LoginRequired));
        assert!(url.starts_with("http://localhost:5001/signin-oidc?error=login_required"));
        assert!(url.ends_with("&state=a%20b"));
    }
}
