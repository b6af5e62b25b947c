//! Storage error types.

use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Entity not found by key.
    #[error("Entity not found: {entity_type} '{key}'")]
    NotFound {
        /// Type of entity (e.g., "Client", "Resource").
        entity_type: &'static str,
        /// Lookup key.
        key: String,
    },

    /// Username/password pair rejected.
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Duplicate entity in a snapshot.
    #[error("Duplicate {entity_type}: '{key}' already exists")]
    Duplicate {
        /// Type of entity.
        entity_type: &'static str,
        /// Conflicting key.
        key: String,
    },

    /// Snapshot content is inconsistent.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Snapshot could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot could not be parsed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Creates a not found error.
    #[must_use]
    pub fn not_found(entity_type: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            key: key.into(),
        }
    }

    /// Creates a duplicate error.
    #[must_use]
    pub fn duplicate(entity_type: &'static str, key: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type,
            key: key.into(),
        }
    }

    /// Checks if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
