//! Token validation.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. signature, against the key named by the `kid` header
//! 2. `typ` header, when a token type is expected
//! 3. issuer equality
//! 4. audience membership
//! 5. expiry (`now < exp`)
//! 6. not-before (`now >= nbf`)
//!
//! Steps 5 and 6 allow the configured clock skew. `jsonwebtoken` is only
//! asked to verify the signature; every claim check happens here so the
//! order and the clock are under our control.

use std::collections::HashSet;

use chrono::Utc;
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::de::DeserializeOwned;
use sso_core::config::MAX_CLOCK_SKEW_SECS;

use crate::claims::RegisteredClaims;
use crate::error::{OidcError, OidcResult};
use crate::keys::KeySource;
use crate::types::TokenType;

/// Default clock skew tolerance, in seconds.
pub const DEFAULT_LEEWAY_SECS: u64 = 60;

/// What a token must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Expected issuer.
    pub issuer: String,
    /// Required audience member; `None` skips the audience check.
    pub audience: Option<String>,
    /// Expected `typ` header.
    pub token_type: Option<TokenType>,
    /// Clock skew tolerance, in seconds.
    pub leeway_secs: u64,
    /// Skip the expiry check. Used for logout hints, which may outlive
    /// the token they name.
    pub allow_expired: bool,
}

impl ValidationOptions {
    /// Creates options for tokens from `issuer` intended for `audience`.
    #[must_use]
    pub fn new(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: Some(audience.into()),
            token_type: None,
            leeway_secs: DEFAULT_LEEWAY_SECS,
            allow_expired: false,
        }
    }

    /// Creates options that accept any audience.
    #[must_use]
    pub fn any_audience(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
            audience: None,
            token_type: None,
            leeway_secs: DEFAULT_LEEWAY_SECS,
            allow_expired: false,
        }
    }

    /// Sets the expected token type.
    #[must_use]
    pub const fn with_token_type(mut self, token_type: TokenType) -> Self {
        self.token_type = Some(token_type);
        self
    }

    /// Accepts tokens past their expiry.
    #[must_use]
    pub const fn allowing_expired(mut self) -> Self {
        self.allow_expired = true;
        self
    }

    /// Sets the clock skew tolerance, capped at 300 seconds.
    #[must_use]
    pub fn with_leeway(mut self, secs: u64) -> Self {
        if secs == 0 {
            tracing::warn!("Clock skew tolerance disabled; tokens are checked against the exact local clock");
        }
        if secs > MAX_CLOCK_SKEW_SECS {
            tracing::warn!(
                requested = secs,
                max = MAX_CLOCK_SKEW_SECS,
                "Clock skew tolerance capped"
            );
        }
        self.leeway_secs = secs.min(MAX_CLOCK_SKEW_SECS);
        self
    }

    fn leeway(&self) -> i64 {
        i64::try_from(self.leeway_secs).unwrap_or(i64::MAX)
    }
}

/// Validates tokens against keys from `K`.
#[derive(Debug, Clone)]
pub struct TokenValidator<K> {
    keys: K,
    options: ValidationOptions,
}

impl<K: KeySource> TokenValidator<K> {
    /// Creates a validator.
    #[must_use]
    pub const fn new(keys: K, options: ValidationOptions) -> Self {
        Self { keys, options }
    }

    /// Returns the key source.
    #[must_use]
    pub const fn keys(&self) -> &K {
        &self.keys
    }

    /// Returns the options.
    #[must_use]
    pub const fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Validates `token` against the current time.
    ///
    /// # Errors
    ///
    /// Returns `OidcError::InvalidToken` naming the first failed check.
    pub async fn validate<T>(&self, token: &str) -> OidcResult<T>
    where
        T: DeserializeOwned + RegisteredClaims,
    {
        self.validate_at(token, Utc::now().timestamp()).await
    }

    /// Validates `token` as of `now` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns `OidcError::InvalidToken` naming the first failed check.
    pub async fn validate_at<T>(&self, token: &str, now: i64) -> OidcResult<T>
    where
        T: DeserializeOwned + RegisteredClaims,
    {
        let claims: T = self.verify_signature(token, now).await?;
        let opts = &self.options;
        let leeway = opts.leeway();

        if claims.issuer() != opts.issuer {
            return Err(reject("issuer mismatch"));
        }
        if let Some(audience) = &opts.audience {
            if !claims.audience().contains(audience) {
                return Err(reject("audience mismatch"));
            }
        }
        if !opts.allow_expired && now >= claims.expires_at().saturating_add(leeway) {
            return Err(reject("token expired"));
        }
        if let Some(nbf) = claims.not_before() {
            if now.saturating_add(leeway) < nbf {
                return Err(reject("token not yet valid"));
            }
        }
        Ok(claims)
    }

    async fn verify_signature<T: DeserializeOwned>(&self, token: &str, now: i64) -> OidcResult<T> {
        let header = decode_header(token).map_err(|_| reject("malformed token"))?;
        if header.alg != Algorithm::ES384 {
            return Err(reject("unsupported signing algorithm"));
        }
        let kid = header.kid.ok_or_else(|| reject("missing kid"))?;
        let key = self
            .keys
            .verification_key(&kid, now)
            .await
            .ok_or_else(|| reject("unknown signing key"))?;

        let mut validation = Validation::new(Algorithm::ES384);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims = HashSet::new();

        let data = decode::<T>(token, &key, &validation).map_err(|e| {
            tracing::debug!(kid = %kid, error = %e, "Token signature rejected");
            reject("invalid signature")
        })?;

        if let Some(expected) = self.options.token_type {
            if data.header.typ.as_deref() != Some(expected.header_typ()) {
                return Err(reject("unexpected token type"));
            }
        }
        Ok(data.claims)
    }
}

fn reject(reason: &str) -> OidcError {
    tracing::debug!(reason, "Token rejected");
    OidcError::InvalidToken(reason.to_string())
}
