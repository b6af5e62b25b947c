//! User domain model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a claim value string is interpreted when emitted in a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimValueType {
    /// Plain string.
    #[default]
    String,
    /// `true` / `false`.
    Boolean,
    /// Signed integer.
    Integer,
    /// Embedded JSON document.
    Json,
}

/// A typed assertion about a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaim {
    /// Claim type (e.g. `email`).
    #[serde(rename = "type")]
    pub claim_type: String,
    /// Raw value.
    pub value: String,
    /// Value interpretation.
    #[serde(default)]
    pub value_type: ClaimValueType,
}

impl UserClaim {
    /// Creates a string claim.
    #[must_use]
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
            value_type: ClaimValueType::String,
        }
    }

    /// Creates a claim with an explicit value type.
    #[must_use]
    pub fn typed(
        claim_type: impl Into<String>,
        value: impl Into<String>,
        value_type: ClaimValueType,
    ) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
            value_type,
        }
    }

    /// Converts the value to JSON according to its value type.
    ///
    /// A value that does not parse as its declared type is emitted as a string.
    #[must_use]
    pub fn json_value(&self) -> Value {
        match self.value_type {
            ClaimValueType::String => Value::String(self.value.clone()),
            ClaimValueType::Boolean => self
                .value
                .parse::<bool>()
                .map_or_else(|_| Value::String(self.value.clone()), Value::Bool),
            ClaimValueType::Integer => self
                .value
                .parse::<i64>()
                .map_or_else(|_| Value::String(self.value.clone()), Value::from),
            ClaimValueType::Json => serde_json::from_str(&self.value)
                .unwrap_or_else(|_| Value::String(self.value.clone())),
        }
    }
}

/// A subject known to the provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique subject identifier.
    pub subject_id: String,
    /// Login name.
    pub username: String,
    /// Login credential.
    pub password: String,
    /// Ordered claims.
    #[serde(default)]
    pub claims: Vec<UserClaim>,
    /// Whether the user may sign in.
    #[serde(default = "active_default")]
    pub is_active: bool,
}

const fn active_default() -> bool {
    true
}

impl User {
    /// Creates an active user with no claims.
    #[must_use]
    pub fn new(
        subject_id: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            username: username.into(),
            password: password.into(),
            claims: Vec::new(),
            is_active: true,
        }
    }

    /// Appends a claim.
    #[must_use]
    pub fn with_claim(mut self, claim: UserClaim) -> Self {
        self.claims.push(claim);
        self
    }

    /// Returns the claims whose type is in `types`, in stored order.
    pub fn claims_of_types<'a>(
        &'a self,
        types: &'a [String],
    ) -> impl Iterator<Item = &'a UserClaim> + 'a {
        self.claims
            .iter()
            .filter(move |c| types.iter().any(|t| *t == c.claim_type))
    }

    /// Returns the first claim value of the given type.
    #[must_use]
    pub fn claim(&self, claim_type: &str) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.claim_type == claim_type)
            .map(|c| c.value.as_str())
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("subject_id", &self.subject_id)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("claims", &self.claims)
            .field("is_active", &self.is_active)
            .finish()
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.username, self.subject_id)
    }
}
