//! Client registry trait.

use async_trait::async_trait;
use sso_model::Client;

use crate::error::StorageResult;

/// Provider for registered clients.
///
/// Implementations must be thread-safe and support concurrent access.
#[async_trait]
pub trait ClientProvider: Send + Sync {
    /// Gets an enabled client by `client_id`.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` for unknown or disabled clients.
    async fn get_by_client_id(&self, client_id: &str) -> StorageResult<Client>;

    /// Validates a client secret against the stored hashes in constant time.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` for unknown clients.
    async fn validate_secret(&self, client_id: &str, secret: &str) -> StorageResult<bool>;

    /// Lists all registered clients.
    async fn list(&self) -> StorageResult<Vec<Client>>;
}
