//! # SSO CLI
//!
//! Operator tools for the SSO provider.

#![forbid(unsafe_code)]
#![deny(warnings)]

use std::time::Duration;

use clap::Parser;
use sso_cli::{
    cli::{Cli, Command},
    commands::{run_crypto, run_discovery},
    output::error,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout.max(1));

    let result = match cli.command {
        Command::Crypto(cmd) => run_crypto(cmd, cli.output, timeout).await,
        Command::Discovery { authority } => run_discovery(&authority, cli.output, timeout).await,
    };

    if let Err(e) = result {
        error(&e.to_string());
        std::process::exit(1);
    }
}
