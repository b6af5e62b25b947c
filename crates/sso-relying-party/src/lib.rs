//! # sso-relying-party
//!
//! OpenID Connect relying party for sites that sign in through the SSO
//! provider.
//!
//! - [`OidcClient`] discovers the provider, starts the authorization code
//!   flow with PKCE and validates the tokens it gets back
//! - [`RemoteJwks`] caches the provider's keys and follows rotation
//! - [`SignedInUser`] and [`BearerClaims`] gate browser and API routes
//! - [`rp_router`] serves the sign-in callback, logout and demo pages
//!
//! ## Usage
//!
//! ```ignore
//! use sso_relying_party::{RelyingPartyConfig, RelyingPartyServer};
//!
//! let config = RelyingPartyConfig::for_site("WebSite1", 5001);
//! RelyingPartyServer::bind(config).await?.run().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod jwks;
pub mod routes;
pub mod state;

pub use auth::{BearerClaims, SignedInUser};
pub use client::{AuthorizationRedirect, OidcClient, PendingSignIn, SignedIn};
pub use config::RelyingPartyConfig;
pub use error::{RelyingPartyError, RelyingPartyResult};
pub use jwks::RemoteJwks;
pub use routes::rp_router;
pub use state::RpState;

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;

/// How often expired local sessions are dropped.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// A relying-party site bound to its listener.
pub struct RelyingPartyServer {
    listener: TcpListener,
    state: RpState,
}

impl RelyingPartyServer {
    /// Validates `config`, binds the listener and builds the site state.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the address
    /// cannot be bound.
    pub async fn bind(config: RelyingPartyConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
        let state = RpState::new(config)?;
        Ok(Self { listener, state })
    }

    /// Returns the bound address.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address is unavailable.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns the site state.
    #[must_use]
    pub const fn state(&self) -> &RpState {
        &self.state
    }

    /// Runs the site until Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown signal received");
        })
        .await
    }

    /// Runs the site until `signal` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn run_until<F>(self, signal: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let purge = tokio::spawn(purge_loop(self.state.clone()));
        tracing::info!(
            addr = %self.listener.local_addr()?,
            client_id = %self.state.config.client_id,
            authority = %self.state.config.authority,
            "Relying party listening"
        );

        let served = axum::serve(self.listener, rp_router(self.state))
            .with_graceful_shutdown(signal)
            .await;
        purge.abort();
        served?;
        Ok(())
    }
}

async fn purge_loop(state: RpState) {
    let mut interval = tokio::time::interval(PURGE_INTERVAL);
    interval.tick().await;
    loop {
        interval.tick().await;
        match state.sessions.remove_expired().await {
            Ok(0) => {}
            Ok(removed) => tracing::debug!(removed, "Expired sessions purged"),
            Err(e) => tracing::warn!(error = %e, "Session purge failed"),
        }
        let abandoned = state.purge_pending();
        if abandoned > 0 {
            tracing::debug!(abandoned, "Abandoned sign-ins purged");
        }
    }
}
