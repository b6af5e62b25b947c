//! # sso-core
//!
//! Core utilities, provider policy, and error handling for the SSO workspace.
//!
//! This crate provides foundational types used by every other SSO crate:
//!
//! - [`Error`]: the shared error type with generic, non-leaking messages
//! - [`ProviderPolicy`]: deployment policy (scope handling, claim embedding,
//!   offline access, lifetimes, clock skew)
//! - [`Event`]: structured security events written to the `audit` target

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod config;
pub mod error;
pub mod event;

pub use config::{ClaimsPolicy, OfflineAccessPolicy, ProviderPolicy, ScopePolicy, TokenLifetimes};
pub use error::{Error, Result};
pub use event::{Event, EventOutcome, EventType};
