//! Persisted installation records
//!
//! One `InstalledExtension` record exists per installed id. The manifest id
//! doubles as the storage key; two records with the same id must not coexist.

use crate::manifest::ExtensionManifest;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Lifecycle status of an installed extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtensionStatus {
    /// Known but not installed
    Available,
    /// Install in progress
    Installing,
    /// Installed, not active
    Installed,
    /// Installed and activated
    Enabled,
    /// Last lifecycle operation failed
    Error,
    /// Update in progress
    Updating,
}

/// An opaque binary payload with its MIME type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    /// MIME type (e.g. "image/png")
    pub mime_type: String,
    /// Raw bytes
    pub bytes: Vec<u8>,
}

impl Blob {
    /// Create a blob from a MIME type and bytes.
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A cached package asset: text source or an opaque byte container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum CachedAsset {
    /// UTF-8 text content
    Text(String),
    /// Binary content stored as bytes, never as base64 text
    Binary(Blob),
}

impl CachedAsset {
    /// The text content, if this asset is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CachedAsset::Text(s) => Some(s),
            CachedAsset::Binary(_) => None,
        }
    }

    /// The blob, if this asset is binary.
    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            CachedAsset::Text(_) => None,
            CachedAsset::Binary(b) => Some(b),
        }
    }
}

/// Cached code and assets for an installed extension
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeCache {
    /// Entry module source; non-empty for a valid record
    pub entry_code: String,
    /// Additional assets keyed by package-relative path
    #[serde(default)]
    pub files: HashMap<String, CachedAsset>,
    /// When the cache was populated (unix seconds)
    #[serde(default)]
    pub cached_at: u64,
}

/// Mutable record persisted per installed extension
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledExtension {
    /// The extension manifest; its id is the storage key
    pub manifest: ExtensionManifest,
    /// Lifecycle status
    pub status: ExtensionStatus,
    /// Authoritative "should be active at startup" flag
    pub enabled: bool,
    /// Install time (unix seconds)
    pub installed_at: u64,
    /// Last update time (unix seconds)
    pub updated_at: u64,
    /// Cached code and assets
    pub cache: CodeCache,
    /// Failure message when status is `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InstalledExtension {
    /// Create a freshly-installed record with the given cache.
    pub fn new(manifest: ExtensionManifest, cache: CodeCache) -> Self {
        let now = unix_now();
        Self {
            manifest,
            status: ExtensionStatus::Installed,
            enabled: false,
            installed_at: now,
            updated_at: now,
            cache,
            error: None,
        }
    }

    /// The extension id (storage key).
    pub fn id(&self) -> &str {
        &self.manifest.id
    }
}

/// Current time as unix seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ExtensionKind;

    #[test]
    fn test_record_roundtrip() {
        let manifest = ExtensionManifest {
            id: "pyxis.hello".to_string(),
            name: "Hello".to_string(),
            version: "0.1.0".to_string(),
            kind: ExtensionKind::Tool,
            description: None,
            author: None,
            entry: "index.js".to_string(),
            files: Vec::new(),
            dependencies: Vec::new(),
            only_one: None,
            pack_group: None,
            metadata: None,
        };
        let mut cache = CodeCache {
            entry_code: "export const x = 1;".to_string(),
            ..Default::default()
        };
        cache.files.insert(
            "logo.png".to_string(),
            CachedAsset::Binary(Blob::new("image/png", vec![1, 2, 3])),
        );

        let record = InstalledExtension::new(manifest, cache);
        let json = serde_json::to_string(&record).unwrap();
        let parsed: InstalledExtension = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.id(), "pyxis.hello");
        assert_eq!(parsed.status, ExtensionStatus::Installed);
        let blob = parsed.cache.files["logo.png"].as_blob().unwrap();
        assert_eq!(blob.bytes, vec![1, 2, 3]);
    }
}
