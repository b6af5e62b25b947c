//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// SSO CLI - operator tools for the SSO provider.
#[derive(Debug, Parser)]
#[command(name = "sso")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format.
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Timeout for calls to a provider, in seconds.
    #[arg(long, env = "SSO_CLI_TIMEOUT_SECS", default_value = "10", global = true)]
    pub timeout: u64,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Cryptographic utilities.
    #[command(subcommand)]
    Crypto(CryptoCommand),

    /// Fetch and summarize a provider's discovery document.
    Discovery {
        /// Provider (issuer) URL.
        authority: String,
    },
}

/// Crypto commands.
#[derive(Debug, Subcommand)]
pub enum CryptoCommand {
    /// Generate an ES384 signing key.
    GenerateKey {
        /// Write the private key (PKCS#8 PEM) here instead of stdout.
        #[arg(short = 'f', long)]
        file: Option<PathBuf>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Hash a client secret into its stored form.
    HashSecret {
        /// Secret to hash.
        secret: String,
    },

    /// Generate a random client secret.
    GenerateSecret {
        /// Secret length in characters.
        #[arg(short, long, default_value = "32")]
        length: usize,

        /// Also print the stored hash.
        #[arg(long)]
        hashed: bool,
    },

    /// Decode a JWT and optionally verify its signature.
    DecodeToken {
        /// Token to decode.
        token: String,

        /// Verify the signature against this key set URL.
        #[arg(long)]
        jwks_url: Option<String>,
    },
}
