//! Signing key bootstrap.
//!
//! In development the key is kept in a PEM file so tokens survive a restart.
//! Without a file a fresh key is generated on every start.

use std::path::Path;

use anyhow::Context;
use sso_crypto::EcKeyMaterial;
use sso_protocol_oidc::SigningKey;

/// Loads the signing key from `path`, creating the file when it is missing.
///
/// # Errors
///
/// Returns an error if the file cannot be read or written, or does not hold
/// a usable key.
pub fn load_or_create(path: &Path) -> anyhow::Result<SigningKey> {
    if path.exists() {
        let pem = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read signing key {}", path.display()))?;
        let material = EcKeyMaterial::from_pem(&pem)
            .with_context(|| format!("invalid signing key in {}", path.display()))?;
        let key = SigningKey::from_material(material)?;
        tracing::info!(path = %path.display(), kid = %key.kid(), "Loaded signing key");
        return Ok(key);
    }

    let key = SigningKey::generate()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, key.material().to_pem())
        .with_context(|| format!("failed to write signing key {}", path.display()))?;
    tracing::info!(path = %path.display(), kid = %key.kid(), "Created signing key");
    Ok(key)
}

/// Returns the configured key, or an ephemeral one when no file is set.
///
/// # Errors
///
/// See [`load_or_create`].
pub fn signing_key(path: Option<&Path>) -> anyhow::Result<SigningKey> {
    match path {
        Some(path) => load_or_create(path),
        None => {
            let key = SigningKey::generate()?;
            tracing::warn!(kid = %key.kid(), "Using an ephemeral signing key");
            Ok(key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_file_is_created_then_reused() {
        let dir = std::env::temp_dir().join(format!("sso-key-{}", uuid::Uuid::new_v4()));
        let path = dir.join("tempkey.p8");

        let first = load_or_create(&path).unwrap();
        assert!(path.exists());
        let second = load_or_create(&path).unwrap();
        assert_eq!(first.kid(), second.kid());

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn corrupt_key_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("sso-key-{}.p8", uuid::Uuid::new_v4()));
        std::fs::write(&path, "not a key").unwrap();
        assert!(load_or_create(&path).is_err());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn ephemeral_keys_differ() {
        let a = signing_key(None).unwrap();
        let b = signing_key(None).unwrap();
        assert_ne!(a.kid(), b.kid());
    }
}
