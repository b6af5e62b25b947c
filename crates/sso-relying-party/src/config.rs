//! Relying-party configuration.
//!
//! Loaded from `RP_*` environment variables. [`RelyingPartyConfig::for_site`]
//! gives the preset for one of the built-in web sites, which every variable
//! then overrides.

use std::str::FromStr;
use std::time::Duration;

use crate::error::{RelyingPartyError, RelyingPartyResult};

/// Default provider address.
pub const DEFAULT_AUTHORITY: &str = "http://localhost:5000";

/// Callback path receiving the authorization response.
pub const SIGNIN_PATH: &str = "/signin-oidc";

/// Front-channel logout path.
pub const SIGNOUT_PATH: &str = "/signout-oidc";

/// Where the provider returns the browser after logout.
pub const SIGNOUT_CALLBACK_PATH: &str = "/signout-callback-oidc";

/// Relying-party configuration.
#[derive(Debug, Clone)]
pub struct RelyingPartyConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
    /// Public base URL of this site.
    pub base_url: String,
    /// Provider (issuer) URL.
    pub authority: String,
    /// Client id registered at the provider.
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
    /// Redirect URI registered at the provider.
    pub redirect_uri: String,
    /// Scopes requested at sign-in.
    pub scopes: Vec<String>,
    /// Audience required of bearer tokens presented to the API.
    pub audience: String,
    /// Clock skew tolerance for token validation, in seconds.
    pub clock_skew_secs: u64,
    /// Timeout of every call to the provider.
    pub http_timeout: Duration,
    /// Minimum time between key set refreshes triggered by unknown keys.
    pub jwks_refresh_cooldown: Duration,
    /// How long a fetched key set is trusted before it is fetched again.
    pub jwks_cache_ttl: Duration,
    /// Keep the tokens from sign-in in the session.
    pub save_tokens: bool,
}

impl RelyingPartyConfig {
    /// Preset for a built-in site: client `name` on `localhost:{port}`.
    #[must_use]
    pub fn for_site(name: &str, port: u16) -> Self {
        let base_url = format!("http://localhost:{port}");
        Self {
            host: "0.0.0.0".to_string(),
            port,
            redirect_uri: format!("{base_url}{SIGNIN_PATH}"),
            base_url,
            authority: DEFAULT_AUTHORITY.to_string(),
            client_id: name.to_string(),
            client_secret: "secret".to_string(),
            scopes: [name, "openid", "profile", "email", "address", "phone", "offline_access"]
                .into_iter()
                .map(String::from)
                .collect(),
            audience: name.to_string(),
            clock_skew_secs: 60,
            http_timeout: Duration::from_secs(5),
            jwks_refresh_cooldown: Duration::from_secs(30),
            jwks_cache_ttl: crate::jwks::DEFAULT_MAX_AGE,
            save_tokens: true,
        }
    }

    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `RelyingPartyError::Config` for malformed values.
    pub fn from_env() -> RelyingPartyResult<Self> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from a variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `RelyingPartyError::Config` for malformed values.
    pub fn from_lookup<F>(lookup: F) -> RelyingPartyResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let site = var("RP_SITE").unwrap_or_else(|| "WebSite1".to_string());
        let port = parse_or(var("RP_PORT"), "RP_PORT", 5001)?;
        let mut config = Self::for_site(&site, port);

        if let Some(host) = var("RP_HOST") {
            config.host = host;
        }
        if let Some(base_url) = var("RP_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
            config.redirect_uri = format!("{}{SIGNIN_PATH}", config.base_url);
        }
        if let Some(authority) = var("RP_AUTHORITY") {
            config.authority = authority.trim_end_matches('/').to_string();
        }
        if let Some(client_id) = var("RP_CLIENT_ID") {
            config.client_id = client_id;
        }
        if let Some(secret) = var("RP_CLIENT_SECRET") {
            config.client_secret = secret;
        }
        if let Some(redirect_uri) = var("RP_REDIRECT_URI") {
            config.redirect_uri = redirect_uri;
        }
        if let Some(scopes) = var("RP_SCOPES") {
            config.scopes = scopes.split_whitespace().map(String::from).collect();
        }
        if let Some(audience) = var("RP_AUDIENCE") {
            config.audience = audience;
        }
        config.clock_skew_secs =
            parse_or(var("RP_CLOCK_SKEW_SECS"), "RP_CLOCK_SKEW_SECS", config.clock_skew_secs)?;
        config.http_timeout = Duration::from_secs(parse_or(
            var("RP_JWKS_TIMEOUT_SECS"),
            "RP_JWKS_TIMEOUT_SECS",
            config.http_timeout.as_secs(),
        )?);
        config.jwks_refresh_cooldown = Duration::from_secs(parse_or(
            var("RP_JWKS_REFRESH_COOLDOWN_SECS"),
            "RP_JWKS_REFRESH_COOLDOWN_SECS",
            config.jwks_refresh_cooldown.as_secs(),
        )?);
        config.jwks_cache_ttl = Duration::from_secs(parse_or(
            var("RP_JWKS_CACHE_TTL_SECS"),
            "RP_JWKS_CACHE_TTL_SECS",
            config.jwks_cache_ttl.as_secs(),
        )?);
        config.save_tokens = parse_or(var("RP_SAVE_TOKENS"), "RP_SAVE_TOKENS", config.save_tokens)?;

        config.validate()?;
        Ok(config)
    }

    /// Checks required values.
    ///
    /// # Errors
    ///
    /// Returns `RelyingPartyError::Config` naming the first problem.
    pub fn validate(&self) -> RelyingPartyResult<()> {
        if !self.scopes.iter().any(|s| s == "openid") {
            return Err(RelyingPartyError::Config(
                "RP_SCOPES must include openid".to_string(),
            ));
        }
        if self.http_timeout.is_zero() {
            return Err(RelyingPartyError::Config(
                "RP_JWKS_TIMEOUT_SECS must be positive".to_string(),
            ));
        }
        url::Url::parse(&self.authority)
            .map_err(|e| RelyingPartyError::Config(format!("invalid RP_AUTHORITY: {e}")))?;
        url::Url::parse(&self.redirect_uri)
            .map_err(|e| RelyingPartyError::Config(format!("invalid redirect URI: {e}")))?;
        Ok(())
    }

    /// URL of the provider's discovery document.
    #[must_use]
    pub fn discovery_url(&self) -> String {
        format!("{}/.well-known/openid-configuration", self.authority)
    }

    /// Where the provider returns the browser after logout.
    #[must_use]
    pub fn post_logout_redirect_uri(&self) -> String {
        format!("{}{SIGNOUT_CALLBACK_PATH}", self.base_url)
    }

    /// Name of this site's session cookie. Sites on one host share cookies
    /// across ports, so the name carries the client id.
    #[must_use]
    pub fn cookie_name(&self) -> String {
        format!("{}.auth", self.client_id)
    }

    /// Name of the cookie binding a pending sign-in to this browser.
    #[must_use]
    pub fn correlation_cookie_name(&self) -> String {
        format!("{}.correlation", self.client_id)
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> RelyingPartyResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| RelyingPartyError::Config(format!("invalid value for {key}: {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> RelyingPartyResult<RelyingPartyConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        RelyingPartyConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn site_preset() {
        let config = RelyingPartyConfig::for_site("WebSite2", 5002);
        assert_eq!(config.redirect_uri, "http://localhost:5002/signin-oidc");
        assert_eq!(
            config.post_logout_redirect_uri(),
            "http://localhost:5002/signout-callback-oidc"
        );
        assert_eq!(config.audience, "WebSite2");
        assert_eq!(config.scopes[0], "WebSite2");
        assert!(config.scopes.iter().any(|s| s == "offline_access"));
        assert_eq!(config.cookie_name(), "WebSite2.auth");
    }

    #[test]
    fn defaults_to_website1() {
        let config = config(&[]).unwrap();
        assert_eq!(config.client_id, "WebSite1");
        assert_eq!(config.port, 5001);
        assert_eq!(
            config.discovery_url(),
            "http://localhost:5000/.well-known/openid-configuration"
        );
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.jwks_cache_ttl, Duration::from_secs(300));
    }

    #[test]
    fn variables_override_preset() {
        let config = config(&[
            ("RP_SITE", "WebSite2"),
            ("RP_PORT", "6002"),
            ("RP_AUTHORITY", "https://sso.example.com/"),
            ("RP_SCOPES", "openid profile"),
            ("RP_CLOCK_SKEW_SECS", "0"),
            ("RP_JWKS_CACHE_TTL_SECS", "120"),
        ])
        .unwrap();
        assert_eq!(config.client_id, "WebSite2");
        assert_eq!(config.redirect_uri, "http://localhost:6002/signin-oidc");
        assert_eq!(config.authority, "https://sso.example.com");
        assert_eq!(config.scopes, vec!["openid", "profile"]);
        assert_eq!(config.clock_skew_secs, 0);
        assert_eq!(config.jwks_cache_ttl, Duration::from_secs(120));
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(config(&[("RP_SCOPES", "profile")]).is_err());
        assert!(config(&[("RP_PORT", "web")]).is_err());
        assert!(config(&[("RP_AUTHORITY", "not a url")]).is_err());
        assert!(config(&[("RP_JWKS_TIMEOUT_SECS", "0")]).is_err());
    }
}
