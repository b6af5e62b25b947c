//! End-to-End Integration Tests
//!
//! Each test starts the provider on an ephemeral port with the built-in
//! realm and drives it over HTTP like a browser and a relying party would.

mod common;
mod auth_flows;
mod relying_party;
mod token_operations;
