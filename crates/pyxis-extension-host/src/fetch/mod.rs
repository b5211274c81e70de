//! Package ingestion
//!
//! Two ingest paths with identical post-conditions: HTTP fetch relative to a
//! base derived from the manifest id, and upload of a ZIP archive. Both
//! produce an entry source plus a map of additional assets, with binary
//! assets carried as data URLs until the store converts them to blobs.

mod archive;
mod code;
mod registry;

pub use archive::{ZipPackage, install_from_zip};
pub use code::{CodeFetcher, FetchedCode};
pub use registry::RegistryClient;

use crate::config::RuntimeConfig;
use pyxis_extension_sdk::error::{ExtensionError, Result};
use std::time::Duration;

/// Build the shared HTTP client from runtime configuration.
pub(crate) fn build_client(config: &RuntimeConfig) -> Result<reqwest::Client> {
    let mut builder =
        reqwest::Client::builder().timeout(Duration::from_secs(config.http_timeout_secs));

    if let Some(ref ua) = config.user_agent {
        builder = builder.user_agent(ua.clone());
    } else {
        builder = builder.user_agent(format!("pyxis-extension-host/{}", env!("CARGO_PKG_VERSION")));
    }

    builder
        .build()
        .map_err(|e| ExtensionError::fetch(format!("failed to create HTTP client: {}", e)))
}

/// Fetch a URL body as text, mapping HTTP failures to fetch errors.
pub(crate) async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ExtensionError::fetch(format!("request to {} failed: {}", url, e)))?;
    if !response.status().is_success() {
        return Err(ExtensionError::fetch(format!(
            "{} returned HTTP {}",
            url,
            response.status()
        )));
    }
    response
        .text()
        .await
        .map_err(|e| ExtensionError::fetch(format!("failed to read {}: {}", url, e)))
}

/// Fetch a URL body as bytes, mapping HTTP failures to fetch errors.
pub(crate) async fn fetch_bytes(client: &reqwest::Client, url: &str) -> Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ExtensionError::fetch(format!("request to {} failed: {}", url, e)))?;
    if !response.status().is_success() {
        return Err(ExtensionError::fetch(format!(
            "{} returned HTTP {}",
            url,
            response.status()
        )));
    }
    response
        .bytes()
        .await
        .map(|b| b.to_vec())
        .map_err(|e| ExtensionError::fetch(format!("failed to read {}: {}", url, e)))
}
