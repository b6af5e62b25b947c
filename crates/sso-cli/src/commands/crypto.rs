//! Cryptographic utility commands.

use std::path::Path;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, Validation};
use serde::Serialize;
use serde_json::Value;
use sso_crypto::{hash_secret, random::random_alphanumeric, EcKeyMaterial};
use sso_protocol_oidc::{JsonWebKeySet, KeySource, SigningKey};

use crate::cli::{CryptoCommand, OutputFormat};
use crate::commands::{get_json, http_client};
use crate::output::{error, field, heading, info, output_single, success, timestamp};
use crate::CliError;

/// Runs a crypto command.
///
/// # Errors
///
/// Returns the first failure of the command.
pub async fn run_crypto(
    cmd: CryptoCommand,
    format: OutputFormat,
    timeout: std::time::Duration,
) -> crate::CliResult<()> {
    match cmd {
        CryptoCommand::GenerateKey { file, force } => generate_key(file.as_deref(), force, format),
        CryptoCommand::HashSecret { secret } => {
            let hashed = SecretOutput {
                secret: None,
                hash: hash_secret(&secret),
            };
            print_secret(&hashed, format)
        }
        CryptoCommand::GenerateSecret { length, hashed } => {
            if length == 0 {
                return Err(CliError::InvalidArgument(
                    "secret length must be positive".to_string(),
                ));
            }
            let secret = random_alphanumeric(length);
            let hash = if hashed { hash_secret(&secret) } else { String::new() };
            print_secret(
                &SecretOutput {
                    secret: Some(secret),
                    hash,
                },
                format,
            )
        }
        CryptoCommand::DecodeToken { token, jwks_url } => {
            let decoded = decode_token(&token)?;
            print_decoded(&decoded, format)?;
            if let Some(url) = jwks_url {
                info(&format!("Fetching key set from: {url}"));
                let keys: JsonWebKeySet = get_json(&http_client(timeout)?, &url).await?;
                let kid = verify_signature(&token, &keys).await?;
                success(&format!("Signature valid (kid {kid})"));
            }
            Ok(())
        }
    }
}

/// A generated signing key.
#[derive(Debug, Serialize)]
struct GeneratedKey {
    kid: String,
    algorithm: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pem: Option<String>,
    jwk: sso_protocol_oidc::JsonWebKey,
}

fn generate_key(file: Option<&Path>, force: bool, format: OutputFormat) -> crate::CliResult<()> {
    let material = EcKeyMaterial::generate()?;
    let key = SigningKey::from_material(material.clone())
        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;

    let pem = material.to_pem();
    let written = match file {
        Some(path) => {
            write_key_file(path, &pem, force)?;
            Some(path.display().to_string())
        }
        None => None,
    };

    let generated = GeneratedKey {
        kid: key.kid().to_string(),
        algorithm: "ES384",
        pem: written.is_none().then_some(pem),
        file: written,
        jwk: key.jwk(),
    };
    match format {
        OutputFormat::Json => output_single(&generated, format)?,
        OutputFormat::Text => {
            if let Some(pem) = &generated.pem {
                print!("{pem}");
            }
            if let Some(file) = &generated.file {
                success(&format!("Signing key written to {file}"));
            }
            field("Key ID", &generated.kid);
            field("Algorithm", generated.algorithm);
        }
    }
    Ok(())
}

/// Writes a PEM key file, refusing to clobber an existing one unless `force`.
fn write_key_file(path: &Path, pem: &str, force: bool) -> crate::CliResult<()> {
    if path.exists() && !force {
        return Err(CliError::InvalidArgument(format!(
            "{} already exists; pass --force to overwrite",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, pem)?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct SecretOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    secret: Option<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    hash: String,
}

fn print_secret(out: &SecretOutput, format: OutputFormat) -> crate::CliResult<()> {
    match format {
        OutputFormat::Json => output_single(out, format),
        OutputFormat::Text => {
            if let Some(secret) = &out.secret {
                println!("{secret}");
            }
            if !out.hash.is_empty() {
                println!("{}", out.hash);
            }
            Ok(())
        }
    }
}

/// Header and payload of a JWT.
#[derive(Debug, Serialize)]
pub struct DecodedToken {
    /// JOSE header.
    pub header: Value,
    /// Claims.
    pub payload: Value,
}

impl DecodedToken {
    fn time_claim(&self, name: &str) -> Option<i64> {
        self.payload.get(name).and_then(Value::as_i64)
    }
}

/// Decodes a JWT without verifying it.
///
/// # Errors
///
/// Returns `CliError::InvalidArgument` unless `token` has three
/// base64url segments with JSON header and payload.
pub fn decode_token(token: &str) -> crate::CliResult<DecodedToken> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(CliError::InvalidArgument(
            "Invalid JWT format: expected 3 parts separated by '.'".to_string(),
        ));
    }

    let segment = |name: &str, part: &str| -> crate::CliResult<Value> {
        let bytes = URL_SAFE_NO_PAD
            .decode(part)
            .map_err(|e| CliError::InvalidArgument(format!("Invalid {name} base64: {e}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    };

    Ok(DecodedToken {
        header: segment("header", parts[0])?,
        payload: segment("payload", parts[1])?,
    })
}

fn print_decoded(decoded: &DecodedToken, format: OutputFormat) -> crate::CliResult<()> {
    if format == OutputFormat::Json {
        return output_single(decoded, format);
    }

    heading("Header");
    println!("{}", serde_json::to_string_pretty(&decoded.header)?);
    println!();
    heading("Payload");
    println!("{}", serde_json::to_string_pretty(&decoded.payload)?);

    if let Some(iat) = decoded.time_claim("iat") {
        info(&format!("Token issued at: {}", timestamp(iat)));
    }
    if let Some(exp) = decoded.time_claim("exp") {
        if exp < chrono::Utc::now().timestamp() {
            error(&format!("Token EXPIRED at: {}", timestamp(exp)));
        } else {
            info(&format!("Token expires at: {}", timestamp(exp)));
        }
    }
    Ok(())
}

/// Verifies the token signature against `keys`. Returns the signing key id.
///
/// Only the signature is checked; issuer, audience and expiry are left to
/// the reader of the decoded claims.
///
/// # Errors
///
/// Returns `CliError::Verification` if the header names no known key or the
/// signature does not match.
pub async fn verify_signature(token: &str, keys: &JsonWebKeySet) -> crate::CliResult<String> {
    let header = jsonwebtoken::decode_header(token)
        .map_err(|e| CliError::Verification(format!("unreadable header: {e}")))?;
    if header.alg != Algorithm::ES384 {
        return Err(CliError::Verification(format!(
            "unsupported algorithm {:?}",
            header.alg
        )));
    }
    let kid = header
        .kid
        .ok_or_else(|| CliError::Verification("token header has no kid".to_string()))?;
    let key = keys
        .verification_key(&kid, chrono::Utc::now().timestamp())
        .await
        .ok_or_else(|| CliError::Verification(format!("no key with kid {kid} in the key set")))?;

    let mut validation = Validation::new(Algorithm::ES384);
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    jsonwebtoken::decode::<Value>(token, &key, &validation)
        .map_err(|e| CliError::Verification(e.to_string()))?;
    Ok(kid)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sso_core::TokenLifetimes;
    use sso_protocol_oidc::{KeyRing, TokenGrant, TokenManager};

    use super::*;

    fn signed_token(ring: Arc<KeyRing>) -> String {
        let manager = TokenManager::new("http://localhost:5000", TokenLifetimes::default(), ring);
        let grant = TokenGrant {
            subject: "1".into(),
            client_id: "WebSite1".into(),
            scopes: vec!["WebSite1".into()],
            audiences: vec!["WebSite1".into()],
            ..TokenGrant::default()
        };
        manager
            .create_token_response(&grant, chrono::Utc::now().timestamp())
            .unwrap()
            .access_token
    }

    #[test]
    fn decodes_header_and_payload() {
        let ring = Arc::new(KeyRing::generate().unwrap());
        let token = signed_token(Arc::clone(&ring));
        let decoded = decode_token(&token).unwrap();
        assert_eq!(decoded.header["alg"], "ES384");
        assert_eq!(decoded.header["kid"], ring.active().kid());
        assert_eq!(decoded.payload["sub"], "1");
        assert!(decoded.time_claim("exp").is_some());
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(matches!(
            decode_token("not-a-jwt"),
            Err(CliError::InvalidArgument(_))
        ));
        assert!(matches!(
            decode_token("@@@.e30.sig"),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn verifies_against_the_issuing_key_set() {
        let ring = Arc::new(KeyRing::generate().unwrap());
        let token = signed_token(Arc::clone(&ring));
        let kid = verify_signature(&token, &ring.jwks(0)).await.unwrap();
        assert_eq!(kid, ring.active().kid());

        let other = KeyRing::generate().unwrap();
        assert!(matches!(
            verify_signature(&token, &other.jwks(0)).await,
            Err(CliError::Verification(_))
        ));
    }

    #[test]
    fn key_file_is_not_overwritten_without_force() {
        let path = std::env::temp_dir().join(format!("sso-cli-{}.pem", uuid::Uuid::new_v4()));
        write_key_file(&path, "first", false).unwrap();
        assert!(write_key_file(&path, "second", false).is_err());
        write_key_file(&path, "second", true).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        let _ = std::fs::remove_file(&path);
    }
}
