//! # sso-session
//!
//! Session management for the SSO provider and its relying parties.
//!
//! A [`UserSession`] is the server-side half of a session cookie. The
//! provider uses it to remember who signed in (so later authorization
//! requests skip the login form) and which clients were issued codes during
//! the session. Relying parties use it to hold the subject's claims and the
//! tokens obtained at sign-in.

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod error;
pub mod memory;
pub mod provider;
pub mod user_session;

pub use error::{SessionError, SessionResult};
pub use memory::InMemorySessionProvider;
pub use provider::{SessionProvider, SessionTimeouts};
pub use user_session::{notes, SessionState, UserSession};
