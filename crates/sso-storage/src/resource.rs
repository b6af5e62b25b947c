//! Resource registry trait.

use async_trait::async_trait;
use sso_model::Resource;

use crate::error::StorageResult;

/// Provider for identity and API resources.
#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// Gets a resource by its scope name.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` for unknown names.
    async fn find_by_name(&self, name: &str) -> StorageResult<Resource>;

    /// Resolves scope names to resources, preserving request order.
    ///
    /// `offline_access` is not a resource and is skipped.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` for the first unknown scope.
    async fn find_by_scopes(&self, scopes: &[String]) -> StorageResult<Vec<Resource>>;

    /// Returns every scope name the provider knows, for discovery.
    async fn scope_names(&self) -> StorageResult<Vec<String>>;

    /// Returns every claim type any resource declares, for discovery.
    async fn claim_types(&self) -> StorageResult<Vec<String>>;
}
