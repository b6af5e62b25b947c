//! Identity and API resources.
//!
//! A resource is what a scope name refers to. Identity resources bundle user
//! claims (`profile`, `email`, ...); API resources name an audience for
//! access tokens (`WebSite1`, ...). Both declare the claim types they expose.

use serde::{Deserialize, Serialize};

use crate::scope::{self, claims};

/// A claims bundle requested through an identity scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityResource {
    /// Scope name.
    pub name: String,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Human description.
    #[serde(default)]
    pub description: Option<String>,
    /// Claim types exposed when this scope is granted.
    pub user_claims: Vec<String>,
}

impl IdentityResource {
    fn standard(name: &str, display: &str, user_claims: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            display_name: Some(display.to_string()),
            description: None,
            user_claims: user_claims.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    /// The `openid` resource.
    #[must_use]
    pub fn openid() -> Self {
        Self::standard(scope::OPENID, "Your user identifier", &[claims::SUBJECT])
    }

    /// The `profile` resource.
    #[must_use]
    pub fn profile() -> Self {
        Self::standard(
            scope::PROFILE,
            "User profile",
            &[
                claims::NAME,
                claims::FAMILY_NAME,
                claims::GIVEN_NAME,
                claims::MIDDLE_NAME,
                claims::NICKNAME,
                claims::PREFERRED_USERNAME,
                claims::PROFILE,
                claims::PICTURE,
                claims::WEBSITE,
                claims::GENDER,
                claims::BIRTHDATE,
                claims::ZONEINFO,
                claims::LOCALE,
                claims::UPDATED_AT,
            ],
        )
    }

    /// The `email` resource.
    #[must_use]
    pub fn email() -> Self {
        Self::standard(
            scope::EMAIL,
            "Your email address",
            &[claims::EMAIL, claims::EMAIL_VERIFIED],
        )
    }

    /// The `phone` resource.
    #[must_use]
    pub fn phone() -> Self {
        Self::standard(
            scope::PHONE,
            "Your phone number",
            &[claims::PHONE_NUMBER, claims::PHONE_NUMBER_VERIFIED],
        )
    }

    /// The `address` resource.
    #[must_use]
    pub fn address() -> Self {
        Self::standard(scope::ADDRESS, "Your postal address", &[claims::ADDRESS])
    }
}

/// A protected API, named as an access-token audience.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResource {
    /// Scope and audience name.
    pub name: String,
    /// Human description.
    #[serde(default)]
    pub description: Option<String>,
    /// User claim types added to access tokens for this API.
    #[serde(default)]
    pub user_claims: Vec<String>,
}

impl ApiResource {
    /// Creates an API resource.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            user_claims: Vec::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A resource referenced by scope name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Resource {
    /// Identity resource (claims bundle).
    Identity(IdentityResource),
    /// API resource (audience).
    Api(ApiResource),
}

impl Resource {
    /// Returns the scope name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Identity(r) => &r.name,
            Self::Api(r) => &r.name,
        }
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        match self {
            Self::Identity(r) => r.description.as_deref(),
            Self::Api(r) => r.description.as_deref(),
        }
    }

    /// Returns the declared claim types.
    #[must_use]
    pub fn user_claims(&self) -> &[String] {
        match self {
            Self::Identity(r) => &r.user_claims,
            Self::Api(r) => &r.user_claims,
        }
    }

    /// Returns true for an identity resource.
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        matches!(self, Self::Identity(_))
    }

    /// Returns true for an API resource.
    #[must_use]
    pub const fn is_api(&self) -> bool {
        matches!(self, Self::Api(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_resources_declare_claims() {
        assert_eq!(IdentityResource::openid().user_claims, vec!["sub"]);
        assert!(IdentityResource::profile()
            .user_claims
            .contains(&"website".to_string()));
        assert_eq!(IdentityResource::address().user_claims, vec!["address"]);
    }

    #[test]
    fn resource_serializes_tagged() {
        let api = Resource::Api(ApiResource::new("WebSite1").with_description("WebSite1 描述"));
        let json = serde_json::to_value(&api).unwrap();
        assert_eq!(json["kind"], "api");
        assert_eq!(json["name"], "WebSite1");

        let back: Resource = serde_json::from_value(json).unwrap();
        assert!(back.is_api());
        assert_eq!(back.description(), Some("WebSite1 描述"));
    }
}
