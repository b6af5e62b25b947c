//! Discovery endpoint handlers.
//!
//! Implements:
//! - GET `/.well-known/openid-configuration` - `OpenID` Provider Metadata
//! - GET `/.well-known/openid-configuration/jwks` - JSON Web Key Set

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::discovery::{ProviderMetadata, ProviderMetadataBuilder};
use crate::error::{OidcError, OidcResult};

use super::response::error_response;
use super::state::OidcState;

/// GET `/.well-known/openid-configuration`
///
/// Scopes and claims are taken from the resource registry, so the document
/// always matches what the provider will grant.
pub async fn well_known(State(state): State<OidcState>) -> Response {
    match provider_metadata(&state).await {
        Ok(metadata) => (StatusCode::OK, Json(metadata)).into_response(),
        Err(ref err) => error_response(err),
    }
}

/// GET `/.well-known/openid-configuration/jwks`
///
/// Publishes the active key and any rotated key still inside its overlap.
pub async fn jwks(State(state): State<OidcState>) -> Response {
    let keys = state.keys().jwks(OidcState::now());
    (StatusCode::OK, Json(keys)).into_response()
}

async fn provider_metadata(state: &OidcState) -> OidcResult<ProviderMetadata> {
    let lookup_failed = |e: sso_storage::StorageError| {
        tracing::error!(error = %e, "Failed to read resource registry");
        OidcError::ServerError
    };
    let scopes = state.resources.scope_names().await.map_err(lookup_failed)?;
    let claims = state.resources.claim_types().await.map_err(lookup_failed)?;

    Ok(ProviderMetadataBuilder::new(state.issuer())
        .scopes(scopes)
        .claims(claims)
        .build())
}
