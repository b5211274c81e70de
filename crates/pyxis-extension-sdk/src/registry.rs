//! Registry catalog wire format
//!
//! The registry is an externally-authored JSON catalog of available
//! extensions. Entries point at manifests via URLs relative to the
//! extensions base; a `manifestUrl` may begin with `/`.

use crate::manifest::ExtensionKind;
use serde::{Deserialize, Serialize};

/// One catalog entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    /// Extension identifier
    pub id: String,
    /// Manifest location relative to the extensions base
    pub manifest_url: String,
    /// Extension kind
    #[serde(rename = "type")]
    pub kind: ExtensionKind,
    /// Installed and enabled on first run
    #[serde(default)]
    pub default_enabled: bool,
    /// Surfaced as recommended in the UI
    #[serde(default)]
    pub recommended: bool,
}

/// The extension catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryIndex {
    /// Catalog format version
    pub version: String,
    /// Last catalog update (ISO 8601)
    pub updated_at: String,
    /// Available extensions
    #[serde(default)]
    pub extensions: Vec<RegistryEntry>,
}

impl RegistryIndex {
    /// Entries flagged for first-run installation.
    pub fn default_enabled(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.extensions.iter().filter(|e| e.default_enabled)
    }

    /// Entries flagged as recommended.
    pub fn recommended(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.extensions.iter().filter(|e| e.recommended)
    }

    /// Find an entry by extension id.
    pub fn find(&self, id: &str) -> Option<&RegistryEntry> {
        self.extensions.iter().find(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_wire_format() {
        let json = r#"{
            "version": "1",
            "updatedAt": "2025-01-01T00:00:00Z",
            "extensions": [
                {"id": "a.hello", "manifestUrl": "a.hello/manifest.json", "type": "tool", "defaultEnabled": true},
                {"id": "pyxis.lang.ja", "manifestUrl": "/lang-packs/ja/manifest.json", "type": "service", "recommended": true}
            ]
        }"#;
        let index: RegistryIndex = serde_json::from_str(json).unwrap();
        assert_eq!(index.extensions.len(), 2);
        assert_eq!(index.default_enabled().count(), 1);
        assert_eq!(index.recommended().count(), 1);
        assert!(index.find("a.hello").is_some());
        assert!(index.find("missing.ext").is_none());
    }
}
