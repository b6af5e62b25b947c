//! OIDC endpoint handlers for Axum.
//!
//! This module provides HTTP handlers for the provider's endpoints:
//! - Discovery (`/.well-known/openid-configuration`)
//! - JWKS (`/.well-known/openid-configuration/jwks`)
//! - Authorization (`/connect/authorize`)
//! - Token (`/connect/token`)
//! - `UserInfo` (`/connect/userinfo`)
//! - End session (`/connect/endsession`)
//!
//! ## Router Setup
//!
//! Use [`oidc_router`] to create a configured Axum router with all endpoints.
//!
//! ```rust,ignore
//! use sso_protocol_oidc::endpoints::{oidc_router, OidcState};
//!
//! let app = Router::new()
//!     .merge(oidc_router())
//!     .with_state(state);
//! ```

mod authorization;
pub mod client_auth;
mod discovery;
mod end_session;
pub mod grants;
pub mod response;
mod router;
pub mod session_cookie;
mod state;
mod token;
mod userinfo;

pub use client_auth::{authenticate_client, extract_credentials, ClientCredentials};
pub use grants::{AuthorizationCodeGrant, GrantContext, RefreshTokenGrant};
pub use router::oidc_router;
pub use session_cookie::{clear_session_cookie, current_session, session_cookie, SESSION_COOKIE};
pub use state::{OidcState, DEFAULT_LOGIN_PATH};
pub use userinfo::UserInfoForm;
