//! Runtime configuration for the extension host.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the extension runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// URL of the registry catalog JSON.
    #[serde(default = "default_registry_url")]
    pub registry_url: String,

    /// Base URL under which extension packages are published.
    #[serde(default = "default_extensions_base_url")]
    pub extensions_base_url: String,

    /// In-memory TTL for the fetched registry, in seconds.
    #[serde(default = "default_registry_ttl")]
    pub registry_ttl_secs: u64,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub http_timeout_secs: u64,

    /// Time bound on extension `activate`/`deactivate`, in seconds.
    #[serde(default = "default_timeout")]
    pub activation_timeout_secs: u64,

    /// Locale override for first-run language-pack selection.
    pub locale: Option<String>,

    /// User agent string.
    pub user_agent: Option<String>,

    /// Directory for the disk-backed store (defaults under the user cache dir).
    pub store_directory: Option<PathBuf>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            registry_url: default_registry_url(),
            extensions_base_url: default_extensions_base_url(),
            registry_ttl_secs: default_registry_ttl(),
            http_timeout_secs: default_timeout(),
            activation_timeout_secs: default_timeout(),
            locale: None,
            user_agent: None,
            store_directory: None,
        }
    }
}

fn default_registry_url() -> String {
    "https://pyxis.dev/extensions/registry.json".to_string()
}

fn default_extensions_base_url() -> String {
    "https://pyxis.dev/extensions".to_string()
}

fn default_registry_ttl() -> u64 {
    60
}

fn default_timeout() -> u64 {
    30
}

impl RuntimeConfig {
    /// Create a new config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// The store directory, using the platform cache dir if not specified.
    pub fn store_directory(&self) -> PathBuf {
        self.store_directory.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("pyxis")
                .join("extensions")
        })
    }

    /// Join a package-relative path onto the extensions base.
    pub fn extensions_url(&self, rel: &str) -> String {
        format!(
            "{}/{}",
            self.extensions_base_url.trim_end_matches('/'),
            rel.trim_start_matches('/')
        )
    }
}
