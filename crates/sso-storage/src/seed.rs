//! Built-in realm used when no snapshot file is configured.
//!
//! Two web sites share one provider. Each may request its own API scope plus
//! the standard identity scopes, and both authenticate with the secret
//! `secret`. Two test users, alice and bob, can sign in.

use sso_crypto::hash_secret;
use sso_model::scope::{ADDRESS, EMAIL, OPENID, PHONE, PROFILE};
use sso_model::{ApiResource, ClaimValueType, Client, IdentityResource, User, UserClaim};

use crate::snapshot::RealmSnapshot;

/// Secret shared by the built-in clients.
pub const DEFAULT_CLIENT_SECRET: &str = "secret";

const ADDRESS_JSON: &str = r#"{ "street_address": "One Hacker Way", "locality": "Heidelberg", "postal_code": 69118, "country": "Germany" }"#;

/// Returns the built-in realm.
#[must_use]
pub fn default_realm() -> RealmSnapshot {
    RealmSnapshot {
        identity_resources: vec![
            IdentityResource::openid(),
            IdentityResource::profile(),
            IdentityResource::email(),
            IdentityResource::phone(),
            IdentityResource::address(),
        ],
        api_resources: vec![
            ApiResource::new("WebSite1").with_description("WebSite1 描述"),
            ApiResource::new("WebSite2").with_description("WebSite2 描述"),
        ],
        clients: vec![web_site("WebSite1", 5001), web_site("WebSite2", 5002)],
        users: vec![
            test_user("1", "alice", "Alice", "http://alice.com"),
            test_user("2", "bob", "Bob", "http://bob.com")
                .with_claim(UserClaim::new("location", "somewhere")),
        ],
    }
}

/// Builds a web-site client listening on `localhost:{port}`.
#[must_use]
pub fn web_site(name: &str, port: u16) -> Client {
    let base = format!("http://localhost:{port}");
    let mut client = Client::new(name)
        .with_secret_hash(hash_secret(DEFAULT_CLIENT_SECRET))
        .with_redirect_uri(format!("{base}/signin-oidc"))
        .with_front_channel_logout_uri(format!("{base}/signout-oidc"))
        .with_post_logout_redirect_uri(format!("{base}/signout-callback-oidc"))
        .with_scopes([name, OPENID, PROFILE, EMAIL, ADDRESS, PHONE])
        .with_offline_access(true)
        .with_claims_in_id_token(true);
    client.client_name = Some(format!("{name} 描述"));
    client
}

fn test_user(subject: &str, username: &str, given_name: &str, website: &str) -> User {
    User::new(subject, username, "password")
        .with_claim(UserClaim::new("name", format!("{given_name} Smith")))
        .with_claim(UserClaim::new("given_name", given_name))
        .with_claim(UserClaim::new("family_name", "Smith"))
        .with_claim(UserClaim::new("email", format!("{given_name}Smith@email.com")))
        .with_claim(UserClaim::typed("email_verified", "true", ClaimValueType::Boolean))
        .with_claim(UserClaim::new("phone_number", "123456789"))
        .with_claim(UserClaim::typed(
            "phone_number_verified",
            "true",
            ClaimValueType::Boolean,
        ))
        .with_claim(UserClaim::new("website", website))
        .with_claim(UserClaim::typed("address", ADDRESS_JSON, ClaimValueType::Json))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_sites_allow_only_their_own_api() {
        let realm = default_realm();
        let site1 = &realm.clients[0];
        assert!(site1.is_scope_allowed("WebSite1"));
        assert!(!site1.is_scope_allowed("WebSite2"));
        assert!(site1.is_scope_allowed("offline_access"));
        assert!(site1.is_redirect_uri_registered("http://localhost:5001/signin-oidc"));
    }

    #[test]
    fn users_have_typed_claims() {
        let realm = default_realm();
        let alice = &realm.users[0];
        assert_eq!(alice.claim("email"), Some("AliceSmith@email.com"));
        let address = alice
            .claims
            .iter()
            .find(|c| c.claim_type == "address")
            .map(UserClaim::json_value)
            .unwrap();
        assert_eq!(address["postal_code"], 69118);

        let bob = &realm.users[1];
        assert_eq!(bob.claim("location"), Some("somewhere"));
    }
}
