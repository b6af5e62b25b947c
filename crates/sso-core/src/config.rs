//! Provider policy configuration.
//!
//! Everything a deployment may want to tighten or relax lives here rather
//! than being hard-coded in the protocol crate: how disallowed scopes are
//! handled, where user claims are delivered, whether refresh tokens are
//! issued, token lifetimes, and the clock skew window.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Shortest authorization code lifetime accepted, in seconds.
pub const MIN_AUTH_CODE_LIFETIME_SECS: i64 = 60;

/// Longest authorization code lifetime accepted, in seconds.
pub const MAX_AUTH_CODE_LIFETIME_SECS: i64 = 300;

/// Largest clock skew tolerance accepted, in seconds.
pub const MAX_CLOCK_SKEW_SECS: u64 = 300;

/// How the authorization endpoint treats scopes outside a client's allowed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopePolicy {
    /// Reject the whole request with `invalid_scope`.
    #[default]
    RejectAll,
    /// Silently drop the disallowed scopes and continue with the rest.
    DropDisallowed,
}

impl std::str::FromStr for ScopePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "reject_all" | "reject" => Ok(Self::RejectAll),
            "drop_disallowed" | "drop" => Ok(Self::DropDisallowed),
            other => Err(Error::Config(format!("unknown scope policy: {other}"))),
        }
    }
}

/// Where the subject's resource-declared claims are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimsPolicy {
    /// Follow each client's `always_include_user_claims_in_id_token` flag.
    #[default]
    PerClient,
    /// Always embed claims in the identity token.
    AlwaysInIdToken,
    /// Never embed; relying parties must call the userinfo endpoint.
    UserInfoOnly,
}

impl ClaimsPolicy {
    /// Resolves the policy against a client's own flag.
    #[must_use]
    pub const fn embed_in_id_token(self, client_flag: bool) -> bool {
        match self {
            Self::PerClient => client_flag,
            Self::AlwaysInIdToken => true,
            Self::UserInfoOnly => false,
        }
    }
}

impl std::str::FromStr for ClaimsPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "per_client" => Ok(Self::PerClient),
            "always" | "always_in_id_token" => Ok(Self::AlwaysInIdToken),
            "userinfo" | "userinfo_only" => Ok(Self::UserInfoOnly),
            other => Err(Error::Config(format!("unknown claims policy: {other}"))),
        }
    }
}

/// Whether `offline_access` (refresh tokens) may be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfflineAccessPolicy {
    /// Follow each client's `allow_offline_access` flag.
    #[default]
    PerClient,
    /// Never issue refresh tokens.
    Disabled,
}

impl OfflineAccessPolicy {
    /// Resolves the policy against a client's own flag.
    #[must_use]
    pub const fn allows(self, client_flag: bool) -> bool {
        match self {
            Self::PerClient => client_flag,
            Self::Disabled => false,
        }
    }
}

/// Token and code lifetimes, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLifetimes {
    /// Authorization code lifetime (60..=300).
    pub auth_code: i64,
    /// Access token lifetime.
    pub access_token: i64,
    /// Identity token lifetime.
    pub id_token: i64,
    /// Refresh token lifetime.
    pub refresh_token: i64,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            auth_code: 300,
            access_token: 3600,
            id_token: 300,
            refresh_token: 2_592_000,
        }
    }
}

/// Deployment policy for the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderPolicy {
    /// Disallowed scope handling.
    pub scope_policy: ScopePolicy,
    /// Claim delivery.
    pub claims_policy: ClaimsPolicy,
    /// Refresh token issuance.
    pub offline_access: OfflineAccessPolicy,
    /// Lifetimes.
    pub lifetimes: TokenLifetimes,
    /// Clock skew tolerance used when validating tokens, in seconds.
    pub clock_skew_secs: u64,
    /// How long a rotated-out signing key keeps verifying, in seconds.
    pub key_overlap_secs: i64,
}

impl Default for ProviderPolicy {
    fn default() -> Self {
        Self {
            scope_policy: ScopePolicy::default(),
            claims_policy: ClaimsPolicy::default(),
            offline_access: OfflineAccessPolicy::default(),
            lifetimes: TokenLifetimes::default(),
            clock_skew_secs: 60,
            key_overlap_secs: 86_400,
        }
    }
}

impl ProviderPolicy {
    /// Checks that every value is inside its permitted range.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming the first out-of-range value.
    pub fn validate(&self) -> Result<()> {
        let code = self.lifetimes.auth_code;
        if !(MIN_AUTH_CODE_LIFETIME_SECS..=MAX_AUTH_CODE_LIFETIME_SECS).contains(&code) {
            return Err(Error::Config(format!(
                "authorization code lifetime must be between {MIN_AUTH_CODE_LIFETIME_SECS} and {MAX_AUTH_CODE_LIFETIME_SECS} seconds, got {code}"
            )));
        }
        if self.lifetimes.access_token <= 0 || self.lifetimes.id_token <= 0 {
            return Err(Error::Config("token lifetimes must be positive".to_string()));
        }
        if self.lifetimes.refresh_token <= 0 {
            return Err(Error::Config("refresh token lifetime must be positive".to_string()));
        }
        if self.clock_skew_secs > MAX_CLOCK_SKEW_SECS {
            return Err(Error::Config(format!(
                "clock skew must not exceed {MAX_CLOCK_SKEW_SECS} seconds"
            )));
        }
        if self.key_overlap_secs < 0 {
            return Err(Error::Config("key overlap must not be negative".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_valid_and_strict() {
        let policy = ProviderPolicy::default();
        assert!(policy.validate().is_ok());
        assert_eq!(policy.scope_policy, ScopePolicy::RejectAll);
        assert!(policy.clock_skew_secs > 0);
    }

    #[test]
    fn auth_code_lifetime_is_bounded() {
        let mut policy = ProviderPolicy::default();
        policy.lifetimes.auth_code = 30;
        assert!(policy.validate().is_err());
        policy.lifetimes.auth_code = 301;
        assert!(policy.validate().is_err());
        policy.lifetimes.auth_code = 60;
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn clock_skew_is_bounded() {
        let policy = ProviderPolicy {
            clock_skew_secs: 3600,
            ..ProviderPolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn claims_policy_resolution() {
        assert!(ClaimsPolicy::PerClient.embed_in_id_token(true));
        assert!(!ClaimsPolicy::PerClient.embed_in_id_token(false));
        assert!(ClaimsPolicy::AlwaysInIdToken.embed_in_id_token(false));
        assert!(!ClaimsPolicy::UserInfoOnly.embed_in_id_token(true));
    }

    #[test]
    fn offline_access_policy_resolution() {
        assert!(OfflineAccessPolicy::PerClient.allows(true));
        assert!(!OfflineAccessPolicy::Disabled.allows(true));
    }

    #[test]
    fn policies_parse_from_env_strings() {
        assert_eq!("drop".parse::<ScopePolicy>().ok(), Some(ScopePolicy::DropDisallowed));
        assert_eq!(
            "userinfo".parse::<ClaimsPolicy>().ok(),
            Some(ClaimsPolicy::UserInfoOnly)
        );
        assert!("sometimes".parse::<ClaimsPolicy>().is_err());
    }

    #[test]
    fn policy_serializes_snake_case() {
        let json = serde_json::to_value(ScopePolicy::DropDisallowed).unwrap();
        assert_eq!(json, "drop_disallowed");
    }
}
