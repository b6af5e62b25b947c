//! JWT claim types for issued tokens.
//!
//! Implements token claims as defined in:
//! - RFC 7519 (JSON Web Token)
//! - RFC 9068 (JWT profile for access tokens)
//! - `OpenID` Connect Core 1.0

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Claims every issued token carries, read by the validator.
pub trait RegisteredClaims {
    /// Issuer.
    fn issuer(&self) -> &str;
    /// Audience.
    fn audience(&self) -> &Audience;
    /// Expiration time (Unix seconds).
    fn expires_at(&self) -> i64;
    /// Not-before time (Unix seconds), if present.
    fn not_before(&self) -> Option<i64>;
}

/// Access token claims.
///
/// The audience is the set of API resources granted; identity-only grants
/// produce an empty audience list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    // === Registered Claims ===
    /// Issuer.
    pub iss: String,

    /// Subject.
    pub sub: String,

    /// Granted API resource names.
    pub aud: Audience,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at time (Unix timestamp).
    pub iat: i64,

    /// Not before time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// JWT ID.
    pub jti: String,

    // === Grant Claims ===
    /// Client the token was issued to.
    pub client_id: String,

    /// Granted scopes, space-separated.
    pub scope: String,

    /// When the subject authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,

    /// Provider session id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    /// Claims declared by the granted API resources.
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

impl AccessTokenClaims {
    /// Creates access token claims valid from `now` for `lifetime` seconds.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        client_id: impl Into<String>,
        now: i64,
        lifetime: i64,
    ) -> Self {
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            aud: Audience::Multiple(Vec::new()),
            exp: now + lifetime,
            iat: now,
            nbf: Some(now),
            jti: Uuid::now_v7().to_string(),
            client_id: client_id.into(),
            scope: String::new(),
            auth_time: None,
            sid: None,
            additional: Map::new(),
        }
    }

    /// Sets the audience.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<Audience>) -> Self {
        self.aud = audience.into();
        self
    }

    /// Sets the granted scopes.
    #[must_use]
    pub fn with_scope(mut self, scopes: &[String]) -> Self {
        self.scope = scopes.join(" ");
        self
    }

    /// Sets the session id and authentication time.
    #[must_use]
    pub fn with_session(mut self, sid: Option<String>, auth_time: Option<i64>) -> Self {
        self.sid = sid;
        self.auth_time = auth_time;
        self
    }

    /// Adds claims to the token.
    #[must_use]
    pub fn with_claims(mut self, claims: Map<String, Value>) -> Self {
        self.additional.extend(claims);
        self
    }

    /// Returns the granted scopes.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scope.split_whitespace().collect()
    }
}

/// ID token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    // === Required Claims ===
    /// Issuer.
    pub iss: String,

    /// Subject.
    pub sub: String,

    /// Client the token was issued to.
    pub aud: Audience,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at time (Unix timestamp).
    pub iat: i64,

    /// Not before time (Unix timestamp).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    // === Conditionally Required Claims ===
    /// When the subject authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,

    /// Nonce from the authorization request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Access token hash.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_hash: Option<String>,

    /// Provider session id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    /// Identity claims (profile, email, ...).
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

impl IdTokenClaims {
    /// Creates ID token claims for `client_id`.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        client_id: impl Into<String>,
        now: i64,
        lifetime: i64,
    ) -> Self {
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            aud: Audience::Single(client_id.into()),
            exp: now + lifetime,
            iat: now,
            nbf: Some(now),
            auth_time: None,
            nonce: None,
            at_hash: None,
            sid: None,
            additional: Map::new(),
        }
    }

    /// Sets the nonce.
    #[must_use]
    pub fn with_nonce(mut self, nonce: Option<String>) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the access token hash.
    #[must_use]
    pub fn with_at_hash(mut self, at_hash: impl Into<String>) -> Self {
        self.at_hash = Some(at_hash.into());
        self
    }

    /// Sets the session id and authentication time.
    #[must_use]
    pub fn with_session(mut self, sid: Option<String>, auth_time: Option<i64>) -> Self {
        self.sid = sid;
        self.auth_time = auth_time;
        self
    }

    /// Adds identity claims.
    #[must_use]
    pub fn with_claims(mut self, claims: Map<String, Value>) -> Self {
        self.additional.extend(claims);
        self
    }

    /// Gets an identity claim as a string.
    #[must_use]
    pub fn claim_str(&self, name: &str) -> Option<&str> {
        self.additional.get(name).and_then(Value::as_str)
    }
}

/// Refresh token claims.
///
/// Refresh tokens are self-contained; they carry everything needed to mint
/// a new access token without server-side grant storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshTokenClaims {
    /// Issuer.
    pub iss: String,

    /// Subject.
    pub sub: String,

    /// Client the token was issued to.
    pub aud: Audience,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at time (Unix timestamp).
    pub iat: i64,

    /// JWT ID.
    pub jti: String,

    /// Originally granted scopes, space-separated.
    pub scope: String,

    /// Provider session id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,

    /// When the subject authenticated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_time: Option<i64>,
}

impl RefreshTokenClaims {
    /// Creates refresh token claims for `client_id`.
    #[must_use]
    pub fn new(
        issuer: impl Into<String>,
        subject: impl Into<String>,
        client_id: impl Into<String>,
        now: i64,
        lifetime: i64,
    ) -> Self {
        Self {
            iss: issuer.into(),
            sub: subject.into(),
            aud: Audience::Single(client_id.into()),
            exp: now + lifetime,
            iat: now,
            jti: Uuid::now_v7().to_string(),
            scope: String::new(),
            sid: None,
            auth_time: None,
        }
    }

    /// Sets the granted scopes.
    #[must_use]
    pub fn with_scope(mut self, scopes: &[String]) -> Self {
        self.scope = scopes.join(" ");
        self
    }

    /// Sets the session id and authentication time.
    #[must_use]
    pub fn with_session(mut self, sid: Option<String>, auth_time: Option<i64>) -> Self {
        self.sid = sid;
        self.auth_time = auth_time;
        self
    }

    /// Returns the client the token belongs to.
    #[must_use]
    pub fn client_id(&self) -> Option<&str> {
        match &self.aud {
            Audience::Single(aud) => Some(aud),
            Audience::Multiple(auds) => auds.first().map(String::as_str),
        }
    }
}

macro_rules! impl_registered_claims {
    ($($ty:ty => $nbf:expr),* $(,)?) => {
        $(
            impl RegisteredClaims for $ty {
                fn issuer(&self) -> &str {
                    &self.iss
                }
                fn audience(&self) -> &Audience {
                    &self.aud
                }
                fn expires_at(&self) -> i64 {
                    self.exp
                }
                fn not_before(&self) -> Option<i64> {
                    let nbf: fn(&Self) -> Option<i64> = $nbf;
                    nbf(self)
                }
            }
        )*
    };
}

impl_registered_claims! {
    AccessTokenClaims => |c| c.nbf,
    IdTokenClaims => |c| c.nbf,
    RefreshTokenClaims => |_| None,
}

/// Audience claim (single value or array).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// Single audience.
    Single(String),
    /// Multiple audiences.
    Multiple(Vec<String>),
}

impl Audience {
    /// Checks if the audience contains `value`.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        match self {
            Self::Single(s) => s == value,
            Self::Multiple(v) => v.iter().any(|s| s == value),
        }
    }

    /// Returns the audience values.
    #[must_use]
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::Multiple(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

impl From<String> for Audience {
    fn from(s: String) -> Self {
        Self::Single(s)
    }
}

impl From<&str> for Audience {
    fn from(s: &str) -> Self {
        Self::Single(s.to_string())
    }
}

impl From<Vec<String>> for Audience {
    fn from(v: Vec<String>) -> Self {
        Self::Multiple(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audience_serialization() {
        let single = Audience::from("WebSite1");
        assert_eq!(serde_json::to_string(&single).unwrap(), r#""WebSite1""#);

        let multiple = Audience::from(vec!["WebSite1".to_string(), "WebSite2".to_string()]);
        let json = serde_json::to_string(&multiple).unwrap();
        assert_eq!(json, r#"["WebSite1","WebSite2"]"#);
        assert!(multiple.contains("WebSite2"));
        assert!(!multiple.contains("WebSite3"));
    }

    #[test]
    fn access_token_claims_flatten_resource_claims() {
        let mut extra = Map::new();
        extra.insert("role".to_string(), Value::from("admin"));
        let claims = AccessTokenClaims::new("http://localhost:5000", "1", "WebSite1", 1000, 3600)
            .with_audience(vec!["WebSite1".to_string()])
            .with_scope(&["openid".to_string(), "WebSite1".to_string()])
            .with_claims(extra);

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["role"], "admin");
        assert_eq!(json["scope"], "openid WebSite1");
        assert_eq!(json["exp"], 4600);
        assert_eq!(json["aud"], serde_json::json!(["WebSite1"]));
        assert_eq!(claims.scopes(), vec!["openid", "WebSite1"]);
    }

    #[test]
    fn id_token_claims_omit_absent_fields() {
        let claims = IdTokenClaims::new("iss", "1", "WebSite1", 0, 300);
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("nonce").is_none());
        assert!(json.get("at_hash").is_none());
        assert_eq!(json["aud"], "WebSite1");
    }

    #[test]
    fn refresh_token_knows_its_client() {
        let claims = RefreshTokenClaims::new("iss", "1", "WebSite2", 0, 60);
        assert_eq!(claims.client_id(), Some("WebSite2"));
        assert_eq!(claims.not_before(), None);
    }
}
