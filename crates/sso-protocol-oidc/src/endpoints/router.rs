//! OIDC router configuration.
//!
//! Provides the Axum router for all OIDC endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::discovery::{
    AUTHORIZE_PATH, END_SESSION_PATH, JWKS_PATH, TOKEN_PATH, USERINFO_PATH, WELL_KNOWN_PATH,
};

use super::authorization::{authorize_get, authorize_post};
use super::discovery::{jwks, well_known};
use super::end_session::{end_session_get, end_session_post};
use super::state::OidcState;
use super::token::token;
use super::userinfo::{userinfo_get, userinfo_post};

/// Creates the OIDC protocol router.
///
/// # Endpoints
///
/// | Method   | Path                                     | Handler      | Description          |
/// |----------|------------------------------------------|--------------|----------------------|
/// | GET      | `/.well-known/openid-configuration`      | `well_known` | Discovery document   |
/// | GET      | `/.well-known/openid-configuration/jwks` | `jwks`       | JSON Web Key Set     |
/// | GET/POST | `/connect/authorize`                     | `authorize`  | Authorization        |
/// | POST     | `/connect/token`                         | `token`      | Token endpoint       |
/// | GET/POST | `/connect/userinfo`                      | `userinfo`   | `UserInfo`           |
/// | GET/POST | `/connect/endsession`                    | `end_session`| RP-initiated logout  |
///
/// The login page is not part of this router; the authorization endpoint
/// redirects to [`OidcState::login_path`] and the hosting server serves it.
///
/// # Usage
///
/// ```rust,ignore
/// use sso_protocol_oidc::endpoints::{oidc_router, OidcState};
///
/// let app = Router::new()
///     .merge(oidc_router())
///     .with_state(state);
/// ```
pub fn oidc_router() -> Router<OidcState> {
    Router::new()
        // Discovery endpoints
        .route(WELL_KNOWN_PATH, get(well_known))
        .route(JWKS_PATH, get(jwks))
        // Authorization endpoint
        .route(AUTHORIZE_PATH, get(authorize_get).post(authorize_post))
        // Token endpoint
        .route(TOKEN_PATH, post(token))
        // `UserInfo` endpoint
        .route(USERINFO_PATH, get(userinfo_get).post(userinfo_post))
        // Logout
        .route(END_SESSION_PATH, get(end_session_get).post(end_session_post))
}
