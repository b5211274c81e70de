//! Key-value persistence of installed-extension records
//!
//! One record per extension id. Binary cache entries are persisted as opaque
//! byte containers; a data-URL string arriving for a binary asset is
//! converted to a blob before it is written.

mod fs;
mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

use crate::binary;
use async_trait::async_trait;
use pyxis_extension_sdk::error::Result;
use pyxis_extension_sdk::record::{CachedAsset, InstalledExtension};
use tracing::warn;

/// Durable mapping from extension id to installed record
#[async_trait]
pub trait ExtensionStore: Send + Sync {
    /// Fetch one record by id.
    async fn get(&self, id: &str) -> Result<Option<InstalledExtension>>;

    /// Fetch all records. Corrupt entries are skipped, not returned.
    async fn get_all(&self) -> Result<Vec<InstalledExtension>>;

    /// Insert or replace a record, keyed by its manifest id.
    async fn set(&self, record: InstalledExtension) -> Result<()>;

    /// Delete a record by id.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete every record.
    async fn clear(&self) -> Result<()>;
}

/// Convert data-URL strings held for binary assets into blobs.
///
/// Applied by every store implementation on write so that binary payloads
/// are persisted as byte containers rather than base64 text.
pub(crate) fn normalize_binary_assets(record: &mut InstalledExtension) {
    for (path, asset) in record.cache.files.iter_mut() {
        let CachedAsset::Text(text) = asset else {
            continue;
        };
        if !binary::is_binary(path) || !text.starts_with("data:") {
            continue;
        }
        match binary::data_url_to_blob(text) {
            Ok(blob) => *asset = CachedAsset::Binary(blob),
            Err(e) => warn!(
                "Keeping '{}' for {} as text, data URL did not parse: {}",
                path,
                record.manifest.id,
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyxis_extension_sdk::manifest::{ExtensionKind, ExtensionManifest};
    use pyxis_extension_sdk::record::CodeCache;

    pub(crate) fn sample_record(id: &str) -> InstalledExtension {
        let manifest = ExtensionManifest {
            id: id.to_string(),
            name: "Sample".to_string(),
            version: "1.0.0".to_string(),
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
        InstalledExtension::new(
            manifest,
            CodeCache {
                entry_code: "export const activate = () => ({});".to_string(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_normalize_converts_binary_data_urls() {
        let mut record = sample_record("pyxis.icons");
        let url = binary::bytes_to_data_url(&[9, 8, 7], Some("logo.png"));
        record
            .cache
            .files
            .insert("logo.png".to_string(), CachedAsset::Text(url));
        record.cache.files.insert(
            "readme.md".to_string(),
            CachedAsset::Text("data: not really".to_string()),
        );

        normalize_binary_assets(&mut record);

        let blob = record.cache.files["logo.png"].as_blob().unwrap();
        assert_eq!(blob.bytes, vec![9, 8, 7]);
        assert_eq!(blob.mime_type, "image/png");
        // Text assets stay text even when they start with "data:"
        assert!(record.cache.files["readme.md"].as_text().is_some());
    }
}
