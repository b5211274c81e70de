//! Registry catalog fetching with a TTL cache.

use crate::config::RuntimeConfig;
use pyxis_extension_sdk::manifest::{ExtensionKind, ExtensionManifest};
use pyxis_extension_sdk::registry::RegistryIndex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Client for the extension registry catalog
///
/// Fetches the registry JSON from the configured URL and caches it in memory
/// for the configured TTL. Network or parse failures surface as `None` (or
/// an empty list from the derived queries), never as errors.
pub struct RegistryClient {
    config: RuntimeConfig,
    client: reqwest::Client,
    cached: RwLock<Option<(Arc<RegistryIndex>, Instant)>>,
}

impl RegistryClient {
    /// Create a client from runtime configuration.
    pub fn new(config: RuntimeConfig) -> pyxis_extension_sdk::error::Result<Self> {
        let client = super::build_client(&config)?;
        Ok(Self {
            config,
            client,
            cached: RwLock::new(None),
        })
    }

    /// Resolve a manifest URL against the extensions base.
    ///
    /// Catalog entries use base-relative URLs which may begin with `/`;
    /// absolute URLs pass through untouched.
    pub fn resolve_url(&self, manifest_url: &str) -> String {
        if manifest_url.starts_with("http://") || manifest_url.starts_with("https://") {
            return manifest_url.to_string();
        }
        self.config.extensions_url(manifest_url)
    }

    /// Fetch the registry, honoring the TTL cache unless `force_refresh`.
    pub async fn fetch_registry(&self, force_refresh: bool) -> Option<Arc<RegistryIndex>> {
        if !force_refresh {
            let cached = self.cached.read().await;
            if let Some((index, at)) = cached.as_ref() {
                if at.elapsed() < Duration::from_secs(self.config.registry_ttl_secs) {
                    debug!("Registry served from cache");
                    return Some(index.clone());
                }
            }
        }

        let body = match super::fetch_text(&self.client, &self.config.registry_url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Registry fetch failed: {}", e);
                return None;
            }
        };
        let index: RegistryIndex = match serde_json::from_str(&body) {
            Ok(index) => index,
            Err(e) => {
                warn!("Registry did not parse: {}", e);
                return None;
            }
        };

        let index = Arc::new(index);
        *self.cached.write().await = Some((index.clone(), Instant::now()));
        debug!("Registry refreshed, {} extensions", index.extensions.len());
        Some(index)
    }

    /// Fetch one manifest by catalog URL.
    pub async fn fetch_manifest(&self, manifest_url: &str) -> Option<ExtensionManifest> {
        let url = self.resolve_url(manifest_url);
        let body = match super::fetch_text(&self.client, &url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Manifest fetch failed: {}", e);
                return None;
            }
        };
        match serde_json::from_str::<ExtensionManifest>(&body) {
            Ok(manifest) => match manifest.validate() {
                Ok(()) => Some(manifest),
                Err(e) => {
                    warn!("Manifest at {} failed validation: {}", url, e);
                    None
                }
            },
            Err(e) => {
                warn!("Manifest at {} did not parse: {}", url, e);
                None
            }
        }
    }

    /// Fetch every catalog entry's manifest in parallel.
    pub async fn fetch_all_manifests(&self) -> Vec<ExtensionManifest> {
        self.fetch_manifests_where(|_| true).await
    }

    /// Fetch manifests for catalog entries of one kind, in parallel.
    pub async fn fetch_manifests_by_kind(&self, kind: ExtensionKind) -> Vec<ExtensionManifest> {
        self.fetch_manifests_where(move |entry_kind| entry_kind == kind)
            .await
    }

    async fn fetch_manifests_where(
        &self,
        keep: impl Fn(ExtensionKind) -> bool,
    ) -> Vec<ExtensionManifest> {
        let Some(index) = self.fetch_registry(false).await else {
            return Vec::new();
        };

        let mut tasks = JoinSet::new();
        for entry in index.extensions.iter().filter(|e| keep(e.kind)) {
            let client = self.client.clone();
            let url = self.resolve_url(&entry.manifest_url);
            tasks.spawn(async move {
                let body = super::fetch_text(&client, &url).await.ok()?;
                let manifest: ExtensionManifest = serde_json::from_str(&body).ok()?;
                manifest.validate().ok()?;
                Some(manifest)
            });
        }

        let mut manifests = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(manifest)) => manifests.push(manifest),
                Ok(None) => {}
                Err(e) => warn!("Manifest fetch task failed: {}", e),
            }
        }
        manifests.sort_by(|a, b| a.id.cmp(&b.id));
        manifests
    }

    /// Manifest URLs flagged `defaultEnabled` in the catalog.
    pub async fn default_enabled_manifest_urls(&self) -> Vec<String> {
        match self.fetch_registry(false).await {
            Some(index) => index
                .default_enabled()
                .map(|e| e.manifest_url.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    /// Manifest URLs flagged `recommended` in the catalog.
    pub async fn recommended_manifest_urls(&self) -> Vec<String> {
        match self.fetch_registry(false).await {
            Some(index) => index.recommended().map(|e| e.manifest_url.clone()).collect(),
            None => Vec::new(),
        }
    }
}
