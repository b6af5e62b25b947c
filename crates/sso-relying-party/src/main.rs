//! # SSO Relying Party
//!
//! Runs one demo site (`RP_SITE`, default `WebSite1`) against the provider.

#![forbid(unsafe_code)]
#![deny(warnings)]

use sso_relying_party::{RelyingPartyConfig, RelyingPartyServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sso_relying_party=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RelyingPartyConfig::from_env()?;
    tracing::info!(
        client_id = %config.client_id,
        base_url = %config.base_url,
        authority = %config.authority,
        "Relying party starting"
    );

    RelyingPartyServer::bind(config).await?.run().await
}
