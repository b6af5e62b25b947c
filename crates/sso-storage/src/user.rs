//! User store trait.

use async_trait::async_trait;
use sso_model::User;

use crate::error::StorageResult;

/// Provider for subjects.
#[async_trait]
pub trait UserProvider: Send + Sync {
    /// Gets a user by subject id.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` for unknown subjects.
    async fn find_by_subject(&self, subject_id: &str) -> StorageResult<User>;

    /// Gets a user by username.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` for unknown usernames.
    async fn find_by_username(&self, username: &str) -> StorageResult<User>;

    /// Checks a username/password pair and returns the active user.
    ///
    /// Unknown users, inactive users and wrong passwords are
    /// indistinguishable to the caller.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::InvalidCredentials` on any mismatch.
    async fn validate_credentials(&self, username: &str, password: &str) -> StorageResult<User>;
}
