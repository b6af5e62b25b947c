//! Application state.

use std::sync::Arc;

use anyhow::Context;
use sso_protocol_oidc::{KeyRing, OidcState, TokenManager};
use sso_session::InMemorySessionProvider;
use sso_storage::{seed, InMemoryStore, RealmSnapshot};

use crate::config::ServerConfig;
use crate::signing;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Protocol endpoint state.
    pub oidc: OidcState,
}

impl AppState {
    /// Builds the state for a provider published at `issuer`: loads the
    /// realm and the signing key, and starts empty session and code stores.
    ///
    /// # Errors
    ///
    /// Returns an error if the realm file or signing key cannot be loaded.
    pub fn build(config: ServerConfig, issuer: &str) -> anyhow::Result<Self> {
        let realm = load_realm(&config)?;
        let store = Arc::new(InMemoryStore::from_snapshot(realm).context("invalid realm")?);

        let key = signing::signing_key(config.signing_key_file.as_deref())?;
        let keys = Arc::new(KeyRing::new(key));
        let tokens = TokenManager::new(issuer, config.policy.lifetimes, keys);
        let sessions = Arc::new(InMemorySessionProvider::new(config.session_timeouts));

        let oidc = OidcState::new(store, sessions, tokens, config.policy.clone())
            .with_secure_cookies(issuer.starts_with("https://"));

        Ok(Self {
            config: Arc::new(config),
            oidc,
        })
    }
}

fn load_realm(config: &ServerConfig) -> anyhow::Result<RealmSnapshot> {
    match config.realm_file.as_deref() {
        Some(path) => {
            let realm = RealmSnapshot::from_file(path)
                .with_context(|| format!("failed to load realm {}", path.display()))?;
            tracing::info!(
                path = %path.display(),
                clients = realm.clients.len(),
                users = realm.users.len(),
                "Loaded realm"
            );
            Ok(realm)
        }
        None => {
            tracing::info!("Using built-in realm");
            Ok(seed::default_realm())
        }
    }
}
