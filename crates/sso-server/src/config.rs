//! Server configuration.
//!
//! Configuration is loaded from environment variables (and a `.env` file,
//! if present) with defaults matching the built-in realm: the provider
//! listens on `localhost:5000`.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use sso_core::config::{MAX_AUTH_CODE_LIFETIME_SECS, MIN_AUTH_CODE_LIFETIME_SECS};
use sso_core::{ClaimsPolicy, OfflineAccessPolicy, ProviderPolicy, ScopePolicy};
use sso_session::SessionTimeouts;

/// Default signing key file used in development.
pub const DEFAULT_SIGNING_KEY_FILE: &str = "tempkey.p8";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    /// Local development: the signing key is persisted and reused.
    #[default]
    Development,
    /// Production: a fresh key per start unless a key file is configured.
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => anyhow::bail!("unknown environment: {other}"),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server host to bind to.
    pub host: String,

    /// Server port. `0` picks a free port.
    pub port: u16,

    /// Issuer URL. Defaults to `http://localhost:{port}` once bound.
    pub issuer: Option<String>,

    /// Deployment environment.
    pub environment: Environment,

    /// Protocol policy and lifetimes.
    pub policy: ProviderPolicy,

    /// IdP session timeouts.
    pub session_timeouts: SessionTimeouts,

    /// Signing key rotation interval; `None` disables rotation.
    pub key_rotation_interval: Option<Duration>,

    /// How often expired codes, sessions and retired keys are purged.
    pub purge_interval: Duration,

    /// PEM file holding the signing key.
    pub signing_key_file: Option<PathBuf>,

    /// JSON realm file replacing the built-in realm.
    pub realm_file: Option<PathBuf>,

    /// CORS allowed origins; `*` allows any.
    pub cors_origins: Vec<String>,
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed values or an invalid policy.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from a variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed values or an invalid policy.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let host = var("SSO_HOST").unwrap_or(defaults.host);
        let port = parse_or(var("SSO_PORT"), "SSO_PORT", defaults.port)?;
        let issuer = var("SSO_ISSUER").map(|i| i.trim_end_matches('/').to_string());
        let environment = parse_or(var("SSO_ENVIRONMENT"), "SSO_ENVIRONMENT", defaults.environment)?;

        let mut policy = ProviderPolicy::default();
        let auth_code = parse_or(
            var("SSO_AUTH_CODE_LIFETIME_SECS"),
            "SSO_AUTH_CODE_LIFETIME_SECS",
            policy.lifetimes.auth_code,
        )?;
        policy.lifetimes.auth_code = clamp_auth_code_lifetime(auth_code);
        policy.lifetimes.access_token = parse_or(
            var("SSO_ACCESS_TOKEN_LIFETIME_SECS"),
            "SSO_ACCESS_TOKEN_LIFETIME_SECS",
            policy.lifetimes.access_token,
        )?;
        policy.lifetimes.id_token = parse_or(
            var("SSO_ID_TOKEN_LIFETIME_SECS"),
            "SSO_ID_TOKEN_LIFETIME_SECS",
            policy.lifetimes.id_token,
        )?;
        policy.lifetimes.refresh_token = parse_or(
            var("SSO_REFRESH_TOKEN_LIFETIME_SECS"),
            "SSO_REFRESH_TOKEN_LIFETIME_SECS",
            policy.lifetimes.refresh_token,
        )?;
        policy.key_overlap_secs = parse_or(
            var("SSO_KEY_OVERLAP_SECS"),
            "SSO_KEY_OVERLAP_SECS",
            policy.key_overlap_secs,
        )?;
        policy.clock_skew_secs = parse_or(
            var("SSO_CLOCK_SKEW_SECS"),
            "SSO_CLOCK_SKEW_SECS",
            policy.clock_skew_secs,
        )?;
        policy.scope_policy =
            parse_or::<ScopePolicy>(var("SSO_SCOPE_POLICY"), "SSO_SCOPE_POLICY", policy.scope_policy)?;
        if let Some(value) = var("SSO_ALWAYS_INCLUDE_USER_CLAIMS") {
            policy.claims_policy = parse_claims_policy(&value)?;
        }
        if let Some(value) = var("SSO_ALLOW_OFFLINE_ACCESS") {
            policy.offline_access = parse_offline_access(&value)?;
        }
        policy.validate().context("invalid provider policy")?;

        let session_timeouts = SessionTimeouts {
            idle: parse_or(
                var("SSO_SESSION_IDLE_TIMEOUT_SECS"),
                "SSO_SESSION_IDLE_TIMEOUT_SECS",
                defaults.session_timeouts.idle,
            )?,
            max_lifespan: parse_or(
                var("SSO_SESSION_MAX_LIFESPAN_SECS"),
                "SSO_SESSION_MAX_LIFESPAN_SECS",
                defaults.session_timeouts.max_lifespan,
            )?,
        };

        let rotation_secs: u64 = parse_or(
            var("SSO_KEY_ROTATION_INTERVAL_SECS"),
            "SSO_KEY_ROTATION_INTERVAL_SECS",
            0,
        )?;
        let key_rotation_interval = (rotation_secs > 0).then(|| Duration::from_secs(rotation_secs));

        let signing_key_file = var("SSO_SIGNING_KEY_FILE").map(PathBuf::from).or_else(|| {
            (environment == Environment::Development)
                .then(|| PathBuf::from(DEFAULT_SIGNING_KEY_FILE))
        });
        let realm_file = var("SSO_REALM_FILE").map(PathBuf::from);

        let cors_origins = var("SSO_CORS_ORIGINS")
            .map(|s| s.split(',').map(str::trim).map(String::from).collect())
            .unwrap_or(defaults.cors_origins);

        Ok(Self {
            host,
            port,
            issuer,
            environment,
            policy,
            session_timeouts,
            key_rotation_interval,
            purge_interval: defaults.purge_interval,
            signing_key_file,
            realm_file,
            cors_origins,
        })
    }

    /// Creates a configuration for testing: loopback, random port, no key
    /// file, no rotation.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0, // Random port
            signing_key_file: None,
            ..Self::default()
        }
    }

    /// Returns the issuer for a server bound to `port`.
    #[must_use]
    pub fn issuer_for_port(&self, port: u16) -> String {
        self.issuer
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{port}"))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            issuer: None,
            environment: Environment::Development,
            policy: ProviderPolicy::default(),
            session_timeouts: SessionTimeouts::default(),
            key_rotation_interval: None,
            purge_interval: Duration::from_secs(60),
            signing_key_file: None,
            realm_file: None,
            cors_origins: vec!["*".to_string()],
        }
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}")),
        None => Ok(default),
    }
}

fn clamp_auth_code_lifetime(secs: i64) -> i64 {
    let clamped = secs.clamp(MIN_AUTH_CODE_LIFETIME_SECS, MAX_AUTH_CODE_LIFETIME_SECS);
    if clamped != secs {
        tracing::warn!(
            requested = secs,
            used = clamped,
            "Authorization code lifetime clamped"
        );
    }
    clamped
}

/// Accepts a boolean or a named claims policy.
fn parse_claims_policy(value: &str) -> anyhow::Result<ClaimsPolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(ClaimsPolicy::AlwaysInIdToken),
        "false" | "0" => Ok(ClaimsPolicy::UserInfoOnly),
        other => other.parse().context("SSO_ALWAYS_INCLUDE_USER_CLAIMS"),
    }
}

fn parse_offline_access(value: &str) -> anyhow::Result<OfflineAccessPolicy> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "per_client" => Ok(OfflineAccessPolicy::PerClient),
        "false" | "0" | "disabled" => Ok(OfflineAccessPolicy::Disabled),
        other => anyhow::bail!("invalid value for SSO_ALLOW_OFFLINE_ACCESS: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> anyhow::Result<ServerConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_match_builtin_realm() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(
            config.signing_key_file.as_deref(),
            Some(std::path::Path::new(DEFAULT_SIGNING_KEY_FILE))
        );
        assert_eq!(config.issuer_for_port(5000), "http://localhost:5000");
        assert!(config.key_rotation_interval.is_none());
    }

    #[test]
    fn production_has_no_default_key_file() {
        let config = config(&[("SSO_ENVIRONMENT", "production")]).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert!(config.signing_key_file.is_none());
    }

    #[test]
    fn auth_code_lifetime_is_clamped() {
        let long = config(&[("SSO_AUTH_CODE_LIFETIME_SECS", "3600")]).unwrap();
        assert_eq!(long.policy.lifetimes.auth_code, 300);
        let short = config(&[("SSO_AUTH_CODE_LIFETIME_SECS", "5")]).unwrap();
        assert_eq!(short.policy.lifetimes.auth_code, 60);
    }

    #[test]
    fn policies_are_parsed() {
        let config = config(&[
            ("SSO_SCOPE_POLICY", "drop_disallowed"),
            ("SSO_ALWAYS_INCLUDE_USER_CLAIMS", "false"),
            ("SSO_ALLOW_OFFLINE_ACCESS", "false"),
            ("SSO_KEY_ROTATION_INTERVAL_SECS", "3600"),
            ("SSO_ISSUER", "https://sso.example.com/"),
        ])
        .unwrap();
        assert_eq!(config.policy.scope_policy, ScopePolicy::DropDisallowed);
        assert_eq!(config.policy.claims_policy, ClaimsPolicy::UserInfoOnly);
        assert_eq!(config.policy.offline_access, OfflineAccessPolicy::Disabled);
        assert_eq!(config.key_rotation_interval, Some(Duration::from_secs(3600)));
        assert_eq!(config.issuer_for_port(1), "https://sso.example.com");
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(config(&[("SSO_PORT", "http")]).is_err());
        assert!(config(&[("SSO_SCOPE_POLICY", "maybe")]).is_err());
        assert!(config(&[("SSO_CLOCK_SKEW_SECS", "900")]).is_err());
    }
}
