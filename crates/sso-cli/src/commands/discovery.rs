//! Discovery document fetch.

use serde::Serialize;
use sso_protocol_oidc::{JsonWebKeySet, ProviderMetadata};

use crate::cli::OutputFormat;
use crate::commands::{get_json, http_client};
use crate::output::{field, heading, output_single, success, warning};

/// Discovery document path below the authority.
const WELL_KNOWN_PATH: &str = "/.well-known/openid-configuration";

/// A provider's metadata together with its published key ids.
#[derive(Debug, Serialize)]
pub struct DiscoveryReport {
    /// The discovery document.
    pub metadata: ProviderMetadata,
    /// Key ids published at `jwks_uri`.
    pub key_ids: Vec<String>,
    /// Whether the document's issuer equals the authority that was asked.
    pub issuer_matches: bool,
}

/// Fetches the discovery document and key set of `authority`.
///
/// # Errors
///
/// Returns `CliError::Http` or `CliError::Provider` if either document
/// cannot be fetched.
pub async fn discover(client: &reqwest::Client, authority: &str) -> crate::CliResult<DiscoveryReport> {
    let authority = authority.trim_end_matches('/');
    let metadata: ProviderMetadata = get_json(client, &format!("{authority}{WELL_KNOWN_PATH}")).await?;
    let keys: JsonWebKeySet = get_json(client, &metadata.jwks_uri).await?;
    Ok(DiscoveryReport {
        issuer_matches: metadata.issuer == authority,
        key_ids: keys.key_ids().into_iter().map(String::from).collect(),
        metadata,
    })
}

/// Runs the discovery command.
///
/// # Errors
///
/// Returns the fetch failure, if any.
pub async fn run_discovery(
    authority: &str,
    format: OutputFormat,
    timeout: std::time::Duration,
) -> crate::CliResult<()> {
    let report = discover(&http_client(timeout)?, authority).await?;

    if format == OutputFormat::Json {
        return output_single(&report, format);
    }

    let m = &report.metadata;
    heading("Provider");
    field("Issuer", &m.issuer);
    field("Authorization endpoint", &m.authorization_endpoint);
    field("Token endpoint", &m.token_endpoint);
    if let Some(userinfo) = &m.userinfo_endpoint {
        field("Userinfo endpoint", userinfo);
    }
    if let Some(end_session) = &m.end_session_endpoint {
        field("End session endpoint", end_session);
    }
    field("JWKS URI", &m.jwks_uri);
    field("Scopes", &m.scopes_supported.join(" "));
    field("Signing keys", &report.key_ids.join(", "));

    if report.issuer_matches {
        success("Issuer matches the authority");
    } else {
        warning(&format!(
            "Issuer {} differs from the authority {authority}; relying parties will refuse it",
            m.issuer
        ));
    }
    Ok(())
}
