//! HTTP ingestion of extension code and assets.

use crate::binary;
use crate::config::RuntimeConfig;
use pyxis_extension_sdk::error::Result;
use pyxis_extension_sdk::manifest::ExtensionManifest;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Fetched package contents
///
/// Binary assets are carried as data-URL strings at this stage; the store
/// converts them to blobs at persistence time.
#[derive(Debug, Clone, Default)]
pub struct FetchedCode {
    /// Entry module source
    pub entry_code: String,
    /// Additional assets keyed by package-relative path
    pub files: HashMap<String, String>,
}

/// Fetches extension packages published under the extensions base URL
pub struct CodeFetcher {
    config: RuntimeConfig,
    client: reqwest::Client,
}

impl CodeFetcher {
    /// Create a fetcher from runtime configuration.
    pub fn new(config: RuntimeConfig) -> Result<Self> {
        let client = super::build_client(&config)?;
        Ok(Self { config, client })
    }

    /// Fetch the entry and declared files for a manifest.
    ///
    /// The package directory is derived from the manifest id. A missing
    /// entry is fatal and yields `None`; missing declared files are skipped
    /// with a warning.
    pub async fn fetch(&self, manifest: &ExtensionManifest) -> Option<FetchedCode> {
        let dir = manifest.package_dir();
        let entry_url = self
            .config
            .extensions_url(&format!("{}/{}", dir, manifest.entry.trim_start_matches('/')));

        let entry_code = match super::fetch_text(&self.client, &entry_url).await {
            Ok(code) => code,
            Err(e) => {
                warn!("Entry fetch for {} failed: {}", manifest.id, e);
                return None;
            }
        };
        debug!("Fetched entry for {} from {}", manifest.id, entry_url);

        let mut files = HashMap::new();
        for path in &manifest.files {
            let url = self
                .config
                .extensions_url(&format!("{}/{}", dir, path.trim_start_matches('/')));
            let fetched = if binary::is_binary(path) {
                super::fetch_bytes(&self.client, &url)
                    .await
                    .map(|bytes| binary::bytes_to_data_url(&bytes, Some(path)))
            } else {
                super::fetch_text(&self.client, &url).await
            };
            match fetched {
                Ok(content) => {
                    files.insert(path.clone(), content);
                }
                Err(e) => warn!("Skipping declared file '{}' for {}: {}", path, manifest.id, e),
            }
        }

        Some(FetchedCode { entry_code, files })
    }
}
