//! Mapping of user claims into tokens.
//!
//! Granted scopes name resources; each resource declares the claim types it
//! exposes. The identity resources select what goes into the identity token
//! and the userinfo response, the API resources select what goes into the
//! access token and name its audience.

use serde_json::{Map, Value};
use sso_model::scope::claims::SUBJECT;
use sso_model::{Resource, User};
use sso_storage::ResourceProvider;

use crate::error::{OidcError, OidcResult};

/// The resources behind a set of granted scopes.
#[derive(Debug, Clone, Default)]
pub struct GrantedResources {
    /// Identity resources, in scope order.
    pub identity: Vec<Resource>,
    /// API resources, in scope order.
    pub api: Vec<Resource>,
}

impl GrantedResources {
    /// Resolves `scopes` through the resource registry.
    ///
    /// # Errors
    ///
    /// Returns `OidcError::InvalidScope` if a scope names no resource.
    pub async fn resolve(resources: &dyn ResourceProvider, scopes: &[String]) -> OidcResult<Self> {
        let found = resources.find_by_scopes(scopes).await.map_err(|e| {
            tracing::debug!(error = %e, "Scope resolution failed");
            if e.is_not_found() {
                OidcError::InvalidScope("unknown scope".to_string())
            } else {
                OidcError::ServerError
            }
        })?;
        let (identity, api) = found.into_iter().partition(Resource::is_identity);
        Ok(Self { identity, api })
    }

    /// Returns the API resource names, used as the access token audience.
    #[must_use]
    pub fn audiences(&self) -> Vec<String> {
        self.api.iter().map(|r| r.name().to_string()).collect()
    }

    /// Claim types declared by the identity resources.
    #[must_use]
    pub fn identity_claim_types(&self) -> Vec<String> {
        claim_types(&self.identity)
    }

    /// Claim types declared by the API resources.
    #[must_use]
    pub fn api_claim_types(&self) -> Vec<String> {
        claim_types(&self.api)
    }
}

fn claim_types(resources: &[Resource]) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for claim in resources.iter().flat_map(Resource::user_claims) {
        if !types.contains(claim) {
            types.push(claim.clone());
        }
    }
    types
}

/// Collects the user's claims of the given types into a JSON object.
///
/// `sub` is skipped because every token carries it already. A claim type
/// the user holds more than once becomes an array.
#[must_use]
pub fn collect_claims(user: &User, types: &[String]) -> Map<String, Value> {
    let mut out = Map::new();
    for claim in user.claims_of_types(types) {
        if claim.claim_type == SUBJECT {
            continue;
        }
        let value = claim.json_value();
        match out.get_mut(&claim.claim_type) {
            None => {
                out.insert(claim.claim_type.clone(), value);
            }
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    out
}
