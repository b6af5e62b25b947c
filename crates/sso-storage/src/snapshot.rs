//! Realm snapshots: the full static configuration loaded at startup.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sso_model::scope::OFFLINE_ACCESS;
use sso_model::{ApiResource, Client, IdentityResource, User};

use crate::error::{StorageError, StorageResult};

/// Clients, resources and users of one deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealmSnapshot {
    /// Identity resources.
    #[serde(default)]
    pub identity_resources: Vec<IdentityResource>,
    /// API resources.
    #[serde(default)]
    pub api_resources: Vec<ApiResource>,
    /// Registered clients.
    #[serde(default)]
    pub clients: Vec<Client>,
    /// Test users.
    #[serde(default)]
    pub users: Vec<User>,
}

impl RealmSnapshot {
    /// Parses a snapshot from JSON and validates it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` for malformed JSON or any
    /// validation error from [`RealmSnapshot::validate`].
    pub fn from_json(json: &str) -> StorageResult<Self> {
        let snapshot: Self = serde_json::from_str(json)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Reads a snapshot from a JSON file and validates it.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the file cannot be read, otherwise as
    /// [`RealmSnapshot::from_json`].
    pub fn from_file(path: impl AsRef<Path>) -> StorageResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Checks uniqueness of keys and that every client scope names a resource.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Duplicate` or `StorageError::InvalidData`.
    pub fn validate(&self) -> StorageResult<()> {
        let mut scopes = HashSet::new();
        for name in self
            .identity_resources
            .iter()
            .map(|r| &r.name)
            .chain(self.api_resources.iter().map(|r| &r.name))
        {
            if !scopes.insert(name.as_str()) {
                return Err(StorageError::duplicate("Resource", name.clone()));
            }
        }

        let mut client_ids = HashSet::new();
        for client in &self.clients {
            if !client_ids.insert(client.client_id.as_str()) {
                return Err(StorageError::duplicate("Client", client.client_id.clone()));
            }
            if client.redirect_uris.is_empty() {
                return Err(StorageError::InvalidData(format!(
                    "client '{}' has no redirect URIs",
                    client.client_id
                )));
            }
            if let Some(unknown) = client
                .allowed_scopes
                .iter()
                .find(|s| s.as_str() != OFFLINE_ACCESS && !scopes.contains(s.as_str()))
            {
                return Err(StorageError::InvalidData(format!(
                    "client '{}' allows unknown scope '{unknown}'",
                    client.client_id
                )));
            }
        }

        let mut subjects = HashSet::new();
        let mut usernames = HashSet::new();
        for user in &self.users {
            if !subjects.insert(user.subject_id.as_str()) {
                return Err(StorageError::duplicate("User", user.subject_id.clone()));
            }
            if !usernames.insert(user.username.as_str()) {
                return Err(StorageError::duplicate("User", user.username.clone()));
            }
        }

        Ok(())
    }
}
