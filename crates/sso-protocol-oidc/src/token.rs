//! Token manager for minting signed tokens.
//!
//! Access, identity and refresh tokens are all JWTs signed with the key
//! ring's active key. The `typ` header tells them apart so that one kind can
//! never be replayed as another.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{encode, Header};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sso_core::TokenLifetimes;
use sso_crypto::sha384;

use crate::claims::{AccessTokenClaims, IdTokenClaims, RefreshTokenClaims};
use crate::error::{OidcError, OidcResult};
use crate::keys::KeyRing;
use crate::types::TokenType;

/// Everything decided about a grant before tokens are minted.
#[derive(Debug, Clone, Default)]
pub struct TokenGrant {
    /// Subject identifier.
    pub subject: String,
    /// Client the tokens are issued to.
    pub client_id: String,
    /// Granted scopes, in request order.
    pub scopes: Vec<String>,
    /// Granted API resource names (access token audience).
    pub audiences: Vec<String>,
    /// Claims declared by the granted API resources.
    pub access_claims: Map<String, Value>,
    /// Identity claims for the ID token.
    pub id_claims: Map<String, Value>,
    /// Nonce from the authorization request.
    pub nonce: Option<String>,
    /// Provider session id.
    pub session_id: Option<String>,
    /// When the subject authenticated.
    pub auth_time: Option<i64>,
    /// Whether to mint a refresh token.
    pub issue_refresh: bool,
    /// Scopes the refresh token carries when they differ from `scopes`, as
    /// after a refresh that narrowed the request.
    pub refresh_scopes: Option<Vec<String>>,
}

impl TokenGrant {
    /// Checks if an identity token is due (the `openid` scope was granted).
    #[must_use]
    pub fn includes_id_token(&self) -> bool {
        self.scopes.iter().any(|s| s == sso_model::scope::OPENID)
    }
}

/// Token manager.
#[derive(Debug, Clone)]
pub struct TokenManager {
    issuer: String,
    lifetimes: TokenLifetimes,
    keys: Arc<KeyRing>,
}

impl TokenManager {
    /// Creates a token manager signing with `keys`.
    #[must_use]
    pub fn new(issuer: impl Into<String>, lifetimes: TokenLifetimes, keys: Arc<KeyRing>) -> Self {
        Self {
            issuer: issuer.into(),
            lifetimes,
            keys,
        }
    }

    /// Returns the issuer URL.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the configured lifetimes.
    #[must_use]
    pub const fn lifetimes(&self) -> &TokenLifetimes {
        &self.lifetimes
    }

    /// Returns the key ring.
    #[must_use]
    pub const fn keys(&self) -> &Arc<KeyRing> {
        &self.keys
    }

    /// Signs `claims` with the active key.
    ///
    /// # Errors
    ///
    /// Returns `OidcError::ServerError` if signing fails; the cause is logged.
    pub fn sign<T: Serialize>(&self, claims: &T, token_type: TokenType) -> OidcResult<String> {
        let key = self.keys.active();

        let mut header = Header::new(key.jwt_algorithm());
        header.kid = Some(key.kid().to_string());
        header.typ = Some(token_type.header_typ().to_string());

        encode(&header, claims, key.encoding_key()).map_err(|e| {
            tracing::error!(error = %e, kid = %key.kid(), "Token signing failed");
            OidcError::ServerError
        })
    }

    /// Mints the token set for `grant` at `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns `OidcError::ServerError` if signing fails.
    pub fn create_token_response(&self, grant: &TokenGrant, now: i64) -> OidcResult<TokenResponse> {
        let lifetimes = &self.lifetimes;

        let access_claims = AccessTokenClaims::new(
            &self.issuer,
            &grant.subject,
            &grant.client_id,
            now,
            lifetimes.access_token,
        )
        .with_audience(grant.audiences.clone())
        .with_scope(&grant.scopes)
        .with_session(grant.session_id.clone(), grant.auth_time)
        .with_claims(grant.access_claims.clone());
        let access_token = self.sign(&access_claims, TokenType::Access)?;

        let id_token = if grant.includes_id_token() {
            let id_claims = IdTokenClaims::new(
                &self.issuer,
                &grant.subject,
                &grant.client_id,
                now,
                lifetimes.id_token,
            )
            .with_nonce(grant.nonce.clone())
            .with_at_hash(compute_at_hash(&access_token))
            .with_session(grant.session_id.clone(), grant.auth_time)
            .with_claims(grant.id_claims.clone());
            Some(self.sign(&id_claims, TokenType::Id)?)
        } else {
            None
        };

        let refresh_token = if grant.issue_refresh {
            let refresh_claims = RefreshTokenClaims::new(
                &self.issuer,
                &grant.subject,
                &grant.client_id,
                now,
                lifetimes.refresh_token,
            )
            .with_scope(grant.refresh_scopes.as_deref().unwrap_or(&grant.scopes))
            .with_session(grant.session_id.clone(), grant.auth_time);
            Some(self.sign(&refresh_claims, TokenType::Refresh)?)
        } else {
            None
        };

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: lifetimes.access_token,
            id_token,
            refresh_token,
            scope: grant.scopes.join(" "),
        })
    }
}

/// Computes `at_hash`: the left half of the SHA-384 digest of the access
/// token, base64url encoded.
#[must_use]
pub fn compute_at_hash(access_token: &str) -> String {
    let hash = sha384(access_token.as_bytes());
    URL_SAFE_NO_PAD.encode(&hash[..hash.len() / 2])
}

/// Token endpoint response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The access token.
    pub access_token: String,

    /// Token type (always "Bearer").
    pub token_type: String,

    /// Access token lifetime in seconds.
    pub expires_in: i64,

    /// ID token (if `openid` scope granted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Refresh token (if offline access granted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Granted scope.
    pub scope: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::decode_header;

    fn manager() -> TokenManager {
        let keys = Arc::new(KeyRing::generate().unwrap());
        TokenManager::new("http://localhost:5000", TokenLifetimes::default(), keys)
    }

    fn grant(scopes: &[&str]) -> TokenGrant {
        TokenGrant {
            subject: "1".into(),
            client_id: "WebSite1".into(),
            scopes: scopes.iter().map(ToString::to_string).collect(),
            audiences: vec!["WebSite1".into()],
            ..TokenGrant::default()
        }
    }

    #[test]
    fn headers_carry_kid_and_typ() {
        let manager = manager();
        let mut g = grant(&["openid", "WebSite1", "offline_access"]);
        g.issue_refresh = true;
        let response = manager.create_token_response(&g, 1_000).unwrap();

        let kid = manager.keys().active().kid().to_string();
        let access = decode_header(&response.access_token).unwrap();
        assert_eq!(access.kid.as_deref(), Some(kid.as_str()));
        assert_eq!(access.typ.as_deref(), Some("at+jwt"));

        let id = decode_header(response.id_token.as_deref().unwrap()).unwrap();
        assert_eq!(id.typ.as_deref(), Some("JWT"));

        let refresh = decode_header(response.refresh_token.as_deref().unwrap()).unwrap();
        assert_eq!(refresh.typ.as_deref(), Some("rt+jwt"));

        assert_eq!(response.scope, "openid WebSite1 offline_access");
        assert_eq!(response.expires_in, 3600);
    }

    #[test]
    fn no_id_token_without_openid() {
        let response = manager().create_token_response(&grant(&["WebSite1"]), 0).unwrap();
        assert!(response.id_token.is_none());
        assert!(response.refresh_token.is_none());
    }

    #[test]
    fn at_hash_is_half_of_sha384() {
        // 24 bytes of digest encode to 32 base64url characters.
        assert_eq!(compute_at_hash("token").len(), 32);
        assert_ne!(compute_at_hash("a"), compute_at_hash("b"));
    }
}
