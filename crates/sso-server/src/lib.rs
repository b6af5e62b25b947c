//! # sso-server
//!
//! Axum server for the SSO identity provider.
//!
//! This crate wires the provider together:
//! - OIDC protocol endpoints (discovery, authorize, token, userinfo, end session)
//! - The interactive login page
//! - Health check endpoints
//! - Background purge and signing key rotation
//!
//! ## Usage
//!
//! ```ignore
//! use sso_server::{Server, ServerConfig};
//!
//! let config = ServerConfig::from_env()?;
//! let server = Server::bind(config).await?;
//! server.run().await?;
//! ```

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod config;
pub mod router;
pub mod signing;
pub mod state;
pub mod tasks;
pub mod ui;

pub use config::{Environment, ServerConfig};
pub use router::create_router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;

use crate::tasks::BackgroundTasks;

/// The identity provider server.
pub struct Server {
    listener: TcpListener,
    state: AppState,
    issuer: String,
}

impl Server {
    /// Binds the listener and builds the provider state.
    ///
    /// The issuer defaults to `http://localhost:{port}` of the bound
    /// address, so port `0` yields a consistent issuer.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound or the realm or
    /// signing key cannot be loaded.
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();
        let issuer = config.issuer_for_port(port);
        let state = AppState::build(config, &issuer)?;
        Ok(Self {
            listener,
            state,
            issuer,
        })
    }

    /// Returns the bound address.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address is unavailable.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns the issuer URL.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the application state.
    #[must_use]
    pub const fn state(&self) -> &AppState {
        &self.state
    }

    /// Creates a router over this server's state without serving it.
    #[must_use]
    pub fn test_router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Runs the server until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Runs the server until `signal` completes.
    ///
    /// # Errors
    ///
    /// Returns an error if serving fails.
    pub async fn run_until<F>(self, signal: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let config = &self.state.config;
        let tasks = BackgroundTasks::spawn(
            &self.state.oidc,
            config.purge_interval,
            config.key_rotation_interval,
        );

        let app = create_router(self.state.clone());
        tracing::info!(
            addr = %self.listener.local_addr()?,
            issuer = %self.issuer,
            "Server listening"
        );

        let served = axum::serve(self.listener, app)
            .with_graceful_shutdown(signal)
            .await;
        tasks.shutdown();
        served?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Waits for a shutdown signal.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
