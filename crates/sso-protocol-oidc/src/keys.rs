//! Signing key ring with rotation overlap.
//!
//! One key signs; rotated-out keys keep verifying until their overlap
//! window closes, so tokens issued just before a rotation stay valid for
//! their whole lifetime. Readers take the lock briefly and clone what they
//! need, so a rotation never blocks behind an in-flight validation.

use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use parking_lot::RwLock;
use sso_crypto::{EcKeyMaterial, SignatureAlgorithm};

use crate::error::{OidcError, OidcResult};
use crate::jwks::{JsonWebKey, JsonWebKeySet};

/// Source of verification keys, looked up by `kid`.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Returns the verification key for `kid` if it is trusted at `now`
    /// (Unix seconds).
    async fn verification_key(&self, kid: &str, now: i64) -> Option<DecodingKey>;
}

#[async_trait]
impl<K: KeySource + ?Sized> KeySource for Arc<K> {
    async fn verification_key(&self, kid: &str, now: i64) -> Option<DecodingKey> {
        (**self).verification_key(kid, now).await
    }
}

/// A signing key and its derived JWT keys.
#[derive(Clone)]
pub struct SigningKey {
    material: EcKeyMaterial,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid())
            .field("algorithm", &self.material.algorithm())
            .field("encoding_key", &"[REDACTED]")
            .finish()
    }
}

impl SigningKey {
    /// Builds JWT keys from key material.
    ///
    /// # Errors
    ///
    /// Returns `OidcError::ServerError` if the public coordinates cannot be
    /// turned into a verification key.
    pub fn from_material(material: EcKeyMaterial) -> OidcResult<Self> {
        let encoding_key = EncodingKey::from_ec_der(material.pkcs8_der());
        let decoding_key = DecodingKey::from_ec_components(&material.x(), &material.y())
            .map_err(|e| {
                tracing::error!(error = %e, "Signing key has unusable public coordinates");
                OidcError::ServerError
            })?;
        Ok(Self {
            material,
            encoding_key,
            decoding_key,
        })
    }

    /// Generates a fresh key.
    ///
    /// # Errors
    ///
    /// Returns `OidcError::ServerError` if key generation fails.
    pub fn generate() -> OidcResult<Self> {
        let material = EcKeyMaterial::generate().map_err(|e| {
            tracing::error!(error = %e, "Signing key generation failed");
            OidcError::ServerError
        })?;
        Self::from_material(material)
    }

    /// Returns the key ID.
    #[must_use]
    pub fn kid(&self) -> &str {
        self.material.key_id()
    }

    /// Returns the key material.
    #[must_use]
    pub const fn material(&self) -> &EcKeyMaterial {
        &self.material
    }

    /// Returns the `jsonwebtoken` algorithm.
    #[must_use]
    pub const fn jwt_algorithm(&self) -> Algorithm {
        match self.material.algorithm() {
            SignatureAlgorithm::Es384 => Algorithm::ES384,
        }
    }

    /// Returns the key used to sign.
    #[must_use]
    pub const fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// Returns the public key as a JWK.
    #[must_use]
    pub fn jwk(&self) -> JsonWebKey {
        JsonWebKey::ec_public(
            self.kid(),
            self.material.algorithm(),
            self.material.x(),
            self.material.y(),
        )
    }
}

#[derive(Debug)]
struct RetiredKey {
    key: Arc<SigningKey>,
    verify_until: i64,
}

#[derive(Debug)]
struct KeyRingInner {
    active: Arc<SigningKey>,
    retired: Vec<RetiredKey>,
}

/// The provider's signing keys.
#[derive(Debug)]
pub struct KeyRing {
    inner: RwLock<KeyRingInner>,
}

impl KeyRing {
    /// Creates a ring whose only key is `active`.
    #[must_use]
    pub fn new(active: SigningKey) -> Self {
        Self {
            inner: RwLock::new(KeyRingInner {
                active: Arc::new(active),
                retired: Vec::new(),
            }),
        }
    }

    /// Creates a ring with a freshly generated key.
    ///
    /// # Errors
    ///
    /// Returns `OidcError::ServerError` if key generation fails.
    pub fn generate() -> OidcResult<Self> {
        SigningKey::generate().map(Self::new)
    }

    /// Returns the key currently used for signing.
    #[must_use]
    pub fn active(&self) -> Arc<SigningKey> {
        Arc::clone(&self.inner.read().active)
    }

    /// Makes `next` the signing key. The previous key keeps verifying for
    /// `overlap_secs` after `now`.
    pub fn rotate(&self, next: SigningKey, overlap_secs: i64, now: i64) {
        let next = Arc::new(next);
        let mut inner = self.inner.write();
        let previous = std::mem::replace(&mut inner.active, Arc::clone(&next));
        inner.retired.retain(|r| r.verify_until > now);
        inner.retired.push(RetiredKey {
            key: previous,
            verify_until: now + overlap_secs,
        });
        tracing::info!(
            kid = %next.kid(),
            retired = inner.retired.len(),
            overlap_secs,
            "Signing key rotated"
        );
    }

    /// Drops retired keys whose overlap has ended. Returns the number
    /// removed.
    pub fn prune(&self, now: i64) -> usize {
        let mut inner = self.inner.write();
        let before = inner.retired.len();
        inner.retired.retain(|r| r.verify_until > now);
        before - inner.retired.len()
    }

    /// Returns the verification key for `kid` if it is active or still
    /// inside its overlap window.
    #[must_use]
    pub fn decoding_key(&self, kid: &str, now: i64) -> Option<DecodingKey> {
        let inner = self.inner.read();
        if inner.active.kid() == kid {
            return Some(inner.active.decoding_key.clone());
        }
        inner
            .retired
            .iter()
            .find(|r| r.key.kid() == kid && now < r.verify_until)
            .map(|r| r.key.decoding_key.clone())
    }

    /// Returns the published key set: the active key first, then retired
    /// keys still inside their overlap window.
    #[must_use]
    pub fn jwks(&self, now: i64) -> JsonWebKeySet {
        let inner = self.inner.read();
        let keys = std::iter::once(inner.active.jwk())
            .chain(
                inner
                    .retired
                    .iter()
                    .filter(|r| now < r.verify_until)
                    .map(|r| r.key.jwk()),
            )
            .collect();
        JsonWebKeySet::with_keys(keys)
    }
}

#[async_trait]
impl KeySource for KeyRing {
    async fn verification_key(&self, kid: &str, now: i64) -> Option<DecodingKey> {
        self.decoding_key(kid, now)
    }
}

/// A fixed key set, such as one fetched once by an operator tool.
#[async_trait]
impl KeySource for JsonWebKeySet {
    async fn verification_key(&self, kid: &str, _now: i64) -> Option<DecodingKey> {
        self.find_key(kid).and_then(JsonWebKey::to_decoding_key)
    }
}
