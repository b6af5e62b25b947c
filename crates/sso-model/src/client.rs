//! Client domain model.
//!
//! Clients are the relying-party applications allowed to request
//! authentication from the provider.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::scope;

/// Grant types a client may be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientGrantType {
    /// Authorization code flow.
    #[default]
    AuthorizationCode,
}

/// A registered relying-party client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)] // Registration naturally has many flags
pub struct Client {
    /// Unique client identifier (OAuth `client_id`).
    pub client_id: String,
    /// Display name.
    #[serde(default)]
    pub client_name: Option<String>,
    /// Hashed client secrets (`base64(SHA-256(secret))`).
    pub secret_hashes: Vec<String>,
    /// Grant type this client may use.
    #[serde(default)]
    pub allowed_grant_type: ClientGrantType,
    /// Registered redirect URIs, matched exactly.
    pub redirect_uris: BTreeSet<String>,
    /// Registered post-logout redirect URIs, matched exactly.
    #[serde(default)]
    pub post_logout_redirect_uris: BTreeSet<String>,
    /// Front-channel logout URI.
    #[serde(default)]
    pub front_channel_logout_uri: Option<String>,
    /// Scope names the client may request.
    pub allowed_scopes: BTreeSet<String>,
    /// Whether a consent step is required.
    #[serde(default)]
    pub require_consent: bool,
    /// Whether refresh tokens may be issued.
    #[serde(default)]
    pub allow_offline_access: bool,
    /// Whether user claims are embedded in the identity token.
    #[serde(default)]
    pub always_include_user_claims_in_id_token: bool,
    /// Whether the client is enabled.
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

const fn enabled_default() -> bool {
    true
}

impl Client {
    /// Creates an enabled authorization-code client with no URIs or scopes.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_name: None,
            secret_hashes: Vec::new(),
            allowed_grant_type: ClientGrantType::AuthorizationCode,
            redirect_uris: BTreeSet::new(),
            post_logout_redirect_uris: BTreeSet::new(),
            front_channel_logout_uri: None,
            allowed_scopes: BTreeSet::new(),
            require_consent: false,
            allow_offline_access: false,
            always_include_user_claims_in_id_token: false,
            enabled: true,
        }
    }

    /// Adds a hashed secret.
    #[must_use]
    pub fn with_secret_hash(mut self, hash: impl Into<String>) -> Self {
        self.secret_hashes.push(hash.into());
        self
    }

    /// Adds a redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uris.insert(uri.into());
        self
    }

    /// Adds a post-logout redirect URI.
    #[must_use]
    pub fn with_post_logout_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.post_logout_redirect_uris.insert(uri.into());
        self
    }

    /// Sets the front-channel logout URI.
    #[must_use]
    pub fn with_front_channel_logout_uri(mut self, uri: impl Into<String>) -> Self {
        self.front_channel_logout_uri = Some(uri.into());
        self
    }

    /// Adds allowed scopes.
    #[must_use]
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_scopes.extend(scopes.into_iter().map(Into::into));
        self
    }

    /// Sets whether refresh tokens may be issued.
    #[must_use]
    pub const fn with_offline_access(mut self, allow: bool) -> Self {
        self.allow_offline_access = allow;
        self
    }

    /// Sets whether user claims are embedded in the identity token.
    #[must_use]
    pub const fn with_claims_in_id_token(mut self, include: bool) -> Self {
        self.always_include_user_claims_in_id_token = include;
        self
    }

    /// Returns true if `uri` is byte-for-byte one of the registered redirect URIs.
    #[must_use]
    pub fn is_redirect_uri_registered(&self, uri: &str) -> bool {
        self.redirect_uris.contains(uri)
    }

    /// Returns true if `uri` is byte-for-byte one of the registered
    /// post-logout redirect URIs.
    #[must_use]
    pub fn is_post_logout_uri_registered(&self, uri: &str) -> bool {
        self.post_logout_redirect_uris.contains(uri)
    }

    /// Returns true if the client may request `scope`.
    ///
    /// `offline_access` is never listed explicitly; it follows the
    /// client's offline access flag.
    #[must_use]
    pub fn is_scope_allowed(&self, scope: &str) -> bool {
        if scope == scope::OFFLINE_ACCESS {
            return self.allow_offline_access;
        }
        self.allowed_scopes.contains(scope)
    }
}
