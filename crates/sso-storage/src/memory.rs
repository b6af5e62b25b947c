//! In-memory registries.
//!
//! The store is built once from a [`RealmSnapshot`] and never mutated, so
//! lookups need no locking and the store can be shared behind an `Arc`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use sso_crypto::{constant_time_eq, verify_secret};
use sso_model::scope::OFFLINE_ACCESS;
use sso_model::{Client, Resource, User};

use crate::client::ClientProvider;
use crate::error::{StorageError, StorageResult};
use crate::resource::ResourceProvider;
use crate::snapshot::RealmSnapshot;
use crate::user::UserProvider;

/// Compared against when a username is unknown, so both paths do the same work.
const DUMMY_PASSWORD: &str = "\u{0}unknown-user-password\u{0}";

/// In-memory implementation of every registry trait.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    clients: HashMap<String, Client>,
    resources: BTreeMap<String, Resource>,
    users: HashMap<String, User>,
    usernames: HashMap<String, String>,
}

impl InMemoryStore {
    /// Builds the store from a validated snapshot.
    ///
    /// # Errors
    ///
    /// Returns any error from [`RealmSnapshot::validate`].
    pub fn from_snapshot(snapshot: RealmSnapshot) -> StorageResult<Self> {
        snapshot.validate()?;

        let mut resources = BTreeMap::new();
        for r in snapshot.identity_resources {
            resources.insert(r.name.clone(), Resource::Identity(r));
        }
        for r in snapshot.api_resources {
            resources.insert(r.name.clone(), Resource::Api(r));
        }

        let clients: HashMap<String, Client> = snapshot
            .clients
            .into_iter()
            .map(|c| (c.client_id.clone(), c))
            .collect();

        let mut users = HashMap::new();
        let mut usernames = HashMap::new();
        for user in snapshot.users {
            usernames.insert(user.username.clone(), user.subject_id.clone());
            users.insert(user.subject_id.clone(), user);
        }

        tracing::debug!(
            clients = clients.len(),
            resources = resources.len(),
            users = users.len(),
            "Loaded realm"
        );

        Ok(Self {
            clients,
            resources,
            users,
            usernames,
        })
    }
}

#[async_trait]
impl ClientProvider for InMemoryStore {
    async fn get_by_client_id(&self, client_id: &str) -> StorageResult<Client> {
        self.clients
            .get(client_id)
            .filter(|c| c.enabled)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Client", client_id))
    }

    async fn validate_secret(&self, client_id: &str, secret: &str) -> StorageResult<bool> {
        let client = self.get_by_client_id(client_id).await?;
        // Check every hash so the number of registered secrets is the only timing signal.
        let matched = client
            .secret_hashes
            .iter()
            .fold(false, |acc, hash| verify_secret(secret, hash) | acc);
        Ok(matched)
    }

    async fn list(&self) -> StorageResult<Vec<Client>> {
        let mut clients: Vec<Client> = self.clients.values().cloned().collect();
        clients.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        Ok(clients)
    }
}

#[async_trait]
impl ResourceProvider for InMemoryStore {
    async fn find_by_name(&self, name: &str) -> StorageResult<Resource> {
        self.resources
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::not_found("Resource", name))
    }

    async fn find_by_scopes(&self, scopes: &[String]) -> StorageResult<Vec<Resource>> {
        scopes
            .iter()
            .filter(|s| s.as_str() != OFFLINE_ACCESS)
            .map(|s| {
                self.resources
                    .get(s)
                    .cloned()
                    .ok_or_else(|| StorageError::not_found("Resource", s.clone()))
            })
            .collect()
    }

    async fn scope_names(&self) -> StorageResult<Vec<String>> {
        let mut names: Vec<String> = self.resources.keys().cloned().collect();
        names.push(OFFLINE_ACCESS.to_string());
        Ok(names)
    }

    async fn claim_types(&self) -> StorageResult<Vec<String>> {
        let types: BTreeSet<String> = self
            .resources
            .values()
            .flat_map(|r| r.user_claims().iter().cloned())
            .collect();
        Ok(types.into_iter().collect())
    }
}

#[async_trait]
impl UserProvider for InMemoryStore {
    async fn find_by_subject(&self, subject_id: &str) -> StorageResult<User> {
        self.users
            .get(subject_id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("User", subject_id))
    }

    async fn find_by_username(&self, username: &str) -> StorageResult<User> {
        self.usernames
            .get(username)
            .and_then(|subject| self.users.get(subject))
            .cloned()
            .ok_or_else(|| StorageError::not_found("User", username))
    }

    async fn validate_credentials(&self, username: &str, password: &str) -> StorageResult<User> {
        let user = self
            .usernames
            .get(username)
            .and_then(|subject| self.users.get(subject));

        let stored = user.map_or(DUMMY_PASSWORD, |u| u.password.as_str());
        let password_ok = constant_time_eq(stored.as_bytes(), password.as_bytes());

        match user {
            Some(u) if password_ok && u.is_active => Ok(u.clone()),
            _ => Err(StorageError::InvalidCredentials),
        }
    }
}
