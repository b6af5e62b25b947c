//! # sso-protocol-oidc
//!
//! `OpenID` Connect authorization-code protocol for the SSO provider.
//!
//! This crate implements:
//! - Authorization endpoint, with redirect and `form_post` delivery
//! - Token endpoint (`authorization_code` and `refresh_token` grants)
//! - `UserInfo` and end session endpoints
//! - Discovery document and JWKS publication
//! - Token validation usable by relying parties
//!
//! ## Signing
//!
//! Every token is signed with ES384. Keys rotate through a [`KeyRing`]; a
//! retired key keeps verifying until its overlap window ends.
//!
//! ## Modules
//!
//! - [`authorize`] - Authorization request validation and code issuance
//! - [`claims`] - JWT claim types for access, ID, and refresh tokens
//! - [`code_store`] - Single-use authorization code storage
//! - [`discovery`] - `OpenID` Provider Metadata
//! - [`endpoints`] - Axum HTTP handlers
//! - [`error`] - OIDC error types following RFC 6749
//! - [`jwks`] - JSON Web Key Set types
//! - [`keys`] - Signing keys and rotation
//! - [`mapper`] - Scope to claim mapping
//! - [`pkce`] - Proof Key for Code Exchange (RFC 7636)
//! - [`request`] - Request types for OIDC endpoints
//! - [`token`] - Token minting
//! - [`types`] - Common OIDC types (grant types, response modes, etc.)
//! - [`validator`] - Token validation

#![forbid(unsafe_code)]
#![deny(warnings)]
#![deny(missing_docs)]

pub mod authorize;
pub mod claims;
pub mod code_store;
pub mod discovery;
pub mod endpoints;
pub mod error;
pub mod jwks;
pub mod keys;
pub mod mapper;
pub mod pkce;
pub mod request;
pub mod token;
pub mod types;
pub mod validator;

// Re-export commonly used types
pub use authorize::{AuthorizeStage, Authorizer, RedirectTarget, ValidatedAuthorization};
pub use claims::{AccessTokenClaims, Audience, IdTokenClaims, RefreshTokenClaims, RegisteredClaims};
pub use code_store::{AuthCodeParams, AuthCodeStore, InMemoryAuthCodeStore, StoredAuthCode};
pub use discovery::{ProviderMetadata, ProviderMetadataBuilder};
pub use endpoints::{oidc_router, OidcState};
pub use error::{ErrorResponse, OidcError, OidcResult};
pub use jwks::{JsonWebKey, JsonWebKeySet, KeyType};
pub use keys::{KeyRing, KeySource, SigningKey};
pub use request::{AuthorizationRequest, EndSessionRequest, TokenRequest};
pub use token::{TokenGrant, TokenManager, TokenResponse};
pub use types::{CodeChallengeMethod, GrantType, Prompt, ResponseMode, ResponseType, TokenType};
pub use validator::{TokenValidator, ValidationOptions};
