//! # sso-model
//!
//! Domain models for the SSO provider.
//!
//! All models are static configuration: they are loaded once at startup and
//! never mutated afterwards.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod client;
pub mod resource;
pub mod scope;
pub mod user;

pub use client::{Client, ClientGrantType};
pub use resource::{ApiResource, IdentityResource, Resource};
pub use user::{ClaimValueType, User, UserClaim};
