//! # SSO Server
//!
//! Main entry point for the identity provider.

#![forbid(unsafe_code)]
#![deny(warnings)]

use sso_server::{Server, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sso_server=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        environment = ?config.environment,
        rotation = ?config.key_rotation_interval,
        "SSO server starting"
    );

    let server = Server::bind(config).await?;
    server.run().await
}
