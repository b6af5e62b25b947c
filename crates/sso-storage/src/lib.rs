//! # sso-storage
//!
//! Registries for the SSO provider.
//!
//! ## Provider Traits
//!
//! - [`ClientProvider`] - lookup of registered clients and secret checks
//! - [`ResourceProvider`] - lookup of identity and API resources by scope
//! - [`UserProvider`] - lookup of subjects and credential checks
//!
//! All lookups are read-only. [`InMemoryStore`] implements every trait over
//! a [`RealmSnapshot`] loaded once at startup, either from the built-in
//! [`seed`] or from a JSON file.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod client;
pub mod error;
pub mod memory;
pub mod resource;
pub mod seed;
pub mod snapshot;
pub mod user;

pub use client::ClientProvider;
pub use error::{StorageError, StorageResult};
pub use memory::InMemoryStore;
pub use resource::ResourceProvider;
pub use snapshot::RealmSnapshot;
pub use user::UserProvider;
