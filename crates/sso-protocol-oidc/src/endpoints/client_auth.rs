//! Client authentication for the token endpoint.
//!
//! Implements the two shared-secret methods of RFC 6749 section 2.3.1:
//! - `client_secret_basic` - HTTP Basic authentication
//! - `client_secret_post` - credentials in the request body
//!
//! Failures are reported with one generic message so a caller cannot tell
//! an unknown client from a wrong secret.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine};
use sso_model::Client;
use sso_storage::ClientProvider;

use crate::error::{OidcError, OidcResult};
use crate::request::TokenRequest;

const INVALID_CLIENT: &str = "client authentication failed";

/// Client credentials presented with a token request.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// Client identifier.
    pub client_id: String,
    /// Client secret, if one was sent.
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Extracts client credentials from the `Authorization` header or the form
/// body. The header wins when both are present.
///
/// # Errors
///
/// Returns `OidcError::InvalidClient` for a malformed Basic header or when
/// no `client_id` is present at all.
pub fn extract_credentials(
    headers: &HeaderMap,
    request: &TokenRequest,
) -> OidcResult<ClientCredentials> {
    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value
            .to_str()
            .map_err(|_| OidcError::InvalidClient("invalid authorization header".to_string()))?;
        if let Some(encoded) = value.strip_prefix("Basic ") {
            return parse_basic(encoded.trim());
        }
    }

    let client_id = request
        .client_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| OidcError::InvalidClient("client_id is required".to_string()))?;
    Ok(ClientCredentials {
        client_id,
        client_secret: request.client_secret.clone(),
    })
}

fn parse_basic(encoded: &str) -> OidcResult<ClientCredentials> {
    let malformed = || OidcError::InvalidClient("invalid basic auth encoding".to_string());

    let decoded = STANDARD.decode(encoded).map_err(|_| malformed())?;
    let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
    let (id, secret) = decoded.split_once(':').ok_or_else(malformed)?;

    // RFC 6749 2.3.1: both parts are form-urlencoded before encoding.
    let client_id = urlencoding::decode(id).map_err(|_| malformed())?.into_owned();
    let client_secret = urlencoding::decode(secret).map_err(|_| malformed())?.into_owned();
    Ok(ClientCredentials {
        client_id,
        client_secret: Some(client_secret),
    })
}

/// Authenticates `credentials` against the client registry.
///
/// # Errors
///
/// Returns `OidcError::InvalidClient` with a generic message for an unknown
/// client, a missing secret, or a wrong secret.
pub async fn authenticate_client(
    clients: &dyn ClientProvider,
    credentials: &ClientCredentials,
) -> OidcResult<Client> {
    let client_id = credentials.client_id.as_str();
    let fail = |reason: &str| {
        tracing::debug!(client_id, reason, "Client authentication failed");
        OidcError::InvalidClient(INVALID_CLIENT.to_string())
    };

    let client = clients
        .get_by_client_id(client_id)
        .await
        .map_err(|_| fail("unknown client"))?;
    let secret = credentials
        .client_secret
        .as_deref()
        .ok_or_else(|| fail("no secret presented"))?;
    let valid = clients
        .validate_secret(client_id, secret)
        .await
        .map_err(|_| fail("secret lookup failed"))?;
    if !valid {
        return Err(fail("wrong secret"));
    }
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sso_storage::{seed, InMemoryStore};

    fn basic(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            format!("Basic {}", STANDARD.encode(value)).parse().unwrap(),
        );
        headers
    }

    #[test]
    fn basic_credentials_are_url_decoded() {
        let creds = extract_credentials(&basic("Web%20Site:s%3Acret"), &TokenRequest::default())
            .unwrap();
        assert_eq!(creds.client_id, "Web Site");
        assert_eq!(creds.client_secret.as_deref(), Some("s:cret"));
    }

    #[test]
    fn form_credentials_are_the_fallback() {
        let request = TokenRequest {
            client_id: Some("WebSite1".into()),
            client_secret: Some("secret".into()),
            ..TokenRequest::default()
        };
        let creds = extract_credentials(&HeaderMap::new(), &request).unwrap();
        assert_eq!(creds.client_id, "WebSite1");
        assert!(format!("{creds:?}").contains("[REDACTED]"));
    }

    #[test]
    fn missing_client_id_is_invalid_client() {
        let err = extract_credentials(&HeaderMap::new(), &TokenRequest::default()).unwrap_err();
        assert_eq!(err.error_code(), "invalid_client");
    }

    #[tokio::test]
    async fn wrong_secret_and_unknown_client_look_the_same() {
        let store = InMemoryStore::from_snapshot(seed::default_realm()).unwrap();
        let creds = |id: &str, secret: &str| ClientCredentials {
            client_id: id.into(),
            client_secret: Some(secret.into()),
        };

        let ok = authenticate_client(&store, &creds("WebSite1", "secret")).await.unwrap();
        assert_eq!(ok.client_id, "WebSite1");

        let wrong = authenticate_client(&store, &creds("WebSite1", "nope")).await.unwrap_err();
        let unknown = authenticate_client(&store, &creds("WebSite9", "secret")).await.unwrap_err();
        assert_eq!(wrong.to_string(), unknown.to_string());
        assert_eq!(wrong.http_status(), 401);
    }
}
