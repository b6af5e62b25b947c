//! Shared state for OIDC endpoints.

use std::sync::Arc;

use chrono::Utc;
use sso_core::ProviderPolicy;
use sso_session::SessionProvider;
use sso_storage::{ClientProvider, ResourceProvider, UserProvider};

use crate::code_store::{AuthCodeStore, InMemoryAuthCodeStore};
use crate::keys::KeyRing;
use crate::token::TokenManager;
use crate::types::TokenType;
use crate::validator::{TokenValidator, ValidationOptions};

/// Default path of the interactive login page.
pub const DEFAULT_LOGIN_PATH: &str = "/account/login";

/// Shared state for OIDC endpoints.
#[derive(Clone)]
pub struct OidcState {
    /// Client registry.
    pub clients: Arc<dyn ClientProvider>,
    /// Resource registry.
    pub resources: Arc<dyn ResourceProvider>,
    /// User store.
    pub users: Arc<dyn UserProvider>,
    /// Authorization code store.
    pub codes: Arc<dyn AuthCodeStore>,
    /// Provider sessions.
    pub sessions: Arc<dyn SessionProvider>,
    /// Token minting.
    pub tokens: TokenManager,
    /// Deployment policy.
    pub policy: Arc<ProviderPolicy>,
    /// Where unauthenticated authorization requests are sent.
    pub login_path: String,
    /// Whether the session cookie carries the `Secure` attribute.
    pub secure_cookies: bool,
}

impl OidcState {
    /// Creates state over a store implementing every registry, with an
    /// in-memory code store.
    pub fn new<S>(
        store: Arc<S>,
        sessions: Arc<dyn SessionProvider>,
        tokens: TokenManager,
        policy: ProviderPolicy,
    ) -> Self
    where
        S: ClientProvider + ResourceProvider + UserProvider + 'static,
    {
        Self {
            clients: Arc::clone(&store) as Arc<dyn ClientProvider>,
            resources: Arc::clone(&store) as Arc<dyn ResourceProvider>,
            users: store as Arc<dyn UserProvider>,
            codes: Arc::new(InMemoryAuthCodeStore::new()),
            sessions,
            tokens,
            policy: Arc::new(policy),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            secure_cookies: false,
        }
    }

    /// Replaces the code store.
    #[must_use]
    pub fn with_code_store(mut self, codes: Arc<dyn AuthCodeStore>) -> Self {
        self.codes = codes;
        self
    }

    /// Sets the login page path.
    #[must_use]
    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Marks the session cookie `Secure`.
    #[must_use]
    pub const fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    /// Returns the issuer URL.
    #[must_use]
    pub fn issuer(&self) -> &str {
        self.tokens.issuer()
    }

    /// Returns the signing keys.
    #[must_use]
    pub fn keys(&self) -> Arc<KeyRing> {
        Arc::clone(self.tokens.keys())
    }

    /// Builds a validator for tokens of `token_type` this provider issued.
    #[must_use]
    pub fn validator(
        &self,
        audience: Option<&str>,
        token_type: TokenType,
    ) -> TokenValidator<Arc<KeyRing>> {
        let options = match audience {
            Some(aud) => ValidationOptions::new(self.issuer(), aud),
            None => ValidationOptions::any_audience(self.issuer()),
        }
        .with_token_type(token_type)
        .with_leeway(self.policy.clock_skew_secs);
        TokenValidator::new(self.keys(), options)
    }

    /// Current time in Unix seconds.
    #[must_use]
    pub fn now() -> i64 {
        Utc::now().timestamp()
    }
}
