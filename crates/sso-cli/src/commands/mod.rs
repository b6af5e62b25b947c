//! Command implementations.

pub mod crypto;
pub mod discovery;

pub use crypto::run_crypto;
pub use discovery::run_discovery;

use std::time::Duration;

use serde::de::DeserializeOwned;

/// Builds the HTTP client used to reach a provider.
///
/// # Errors
///
/// Returns `CliError::Http` if the client cannot be built.
pub fn http_client(timeout: Duration) -> crate::CliResult<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Fetches a JSON document.
///
/// # Errors
///
/// Returns `CliError::Http` on transport failure and `CliError::Provider`
/// for a non-success status.
pub async fn get_json<T: DeserializeOwned>(client: &reqwest::Client, url: &str) -> crate::CliResult<T> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if status.is_success() {
        Ok(response.json().await?)
    } else {
        let message = response.text().await.unwrap_or_default();
        Err(crate::CliError::Provider {
            status: status.as_u16(),
            message,
        })
    }
}
