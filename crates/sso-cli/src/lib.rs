//! # sso-cli
//!
//! Operator tools for the SSO provider.
//!
//! - Signing key generation (the PEM file the server loads)
//! - Client secret hashing and generation
//! - Token inspection, optionally verified against a provider's key set
//! - Discovery document fetch

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use error::{CliError, CliResult};
