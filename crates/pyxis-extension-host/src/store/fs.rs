//! Disk-backed store
//!
//! Layout: one directory per extension id under the store root, holding
//! `record.json` plus a `blobs/` directory with one raw file per binary
//! asset. Keeping blobs out of the JSON record is what makes binary payloads
//! byte containers on disk instead of encoded text.

use super::{ExtensionStore, normalize_binary_assets};
use async_trait::async_trait;
use pyxis_extension_sdk::error::{ExtensionError, Result};
use pyxis_extension_sdk::manifest::ExtensionManifest;
use pyxis_extension_sdk::record::{Blob, CachedAsset, ExtensionStatus, InstalledExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Durable `ExtensionStore` rooted at a directory
pub struct FsStore {
    root: PathBuf,
}

/// On-disk record shape; binary assets are references into `blobs/`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    manifest: ExtensionManifest,
    status: ExtensionStatus,
    enabled: bool,
    installed_at: u64,
    updated_at: u64,
    entry_code: String,
    cached_at: u64,
    #[serde(default)]
    files: HashMap<String, StoredAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum StoredAsset {
    Text { content: String },
    Binary { mime_type: String, file: String },
}

impl FsStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)
            .map_err(|e| ExtensionError::store(format!("cannot create {:?}: {}", root, e)))?;
        debug!("Extension store opened at {:?}", root);
        Ok(Self { root })
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_dir(&self, id: &str) -> Result<PathBuf> {
        // Ids are dotted identifiers; anything path-like is refused outright.
        if id.is_empty() || id.contains('/') || id.contains('\\') || id.contains("..") {
            return Err(ExtensionError::store(format!("invalid record id '{}'", id)));
        }
        Ok(self.root.join(id))
    }

    async fn read_record(&self, dir: &Path) -> Result<InstalledExtension> {
        let json = tokio::fs::read_to_string(dir.join("record.json")).await?;
        let stored: StoredRecord = serde_json::from_str(&json)?;

        let mut files = HashMap::new();
        for (path, asset) in stored.files {
            let asset = match asset {
                StoredAsset::Text { content } => CachedAsset::Text(content),
                StoredAsset::Binary { mime_type, file } => {
                    let bytes = tokio::fs::read(dir.join("blobs").join(&file)).await?;
                    CachedAsset::Binary(Blob::new(mime_type, bytes))
                }
            };
            files.insert(path, asset);
        }

        Ok(InstalledExtension {
            manifest: stored.manifest,
            status: stored.status,
            enabled: stored.enabled,
            installed_at: stored.installed_at,
            updated_at: stored.updated_at,
            cache: pyxis_extension_sdk::record::CodeCache {
                entry_code: stored.entry_code,
                files,
                cached_at: stored.cached_at,
            },
            error: stored.error,
        })
    }

    async fn write_record(&self, record: &InstalledExtension) -> Result<()> {
        let dir = self.record_dir(&record.manifest.id)?;
        // Rewrite from scratch so stale blobs do not accumulate.
        if dir.exists() {
            tokio::fs::remove_dir_all(&dir).await?;
        }
        tokio::fs::create_dir_all(dir.join("blobs")).await?;

        let mut files = HashMap::new();
        let mut blob_index = 0u32;
        for (path, asset) in &record.cache.files {
            let stored = match asset {
                CachedAsset::Text(content) => StoredAsset::Text {
                    content: content.clone(),
                },
                CachedAsset::Binary(blob) => {
                    let file = format!("{:04}.bin", blob_index);
                    blob_index += 1;
                    tokio::fs::write(dir.join("blobs").join(&file), &blob.bytes).await?;
                    StoredAsset::Binary {
                        mime_type: blob.mime_type.clone(),
                        file,
                    }
                }
            };
            files.insert(path.clone(), stored);
        }

        let stored = StoredRecord {
            manifest: record.manifest.clone(),
            status: record.status,
            enabled: record.enabled,
            installed_at: record.installed_at,
            updated_at: record.updated_at,
            entry_code: record.cache.entry_code.clone(),
            cached_at: record.cache.cached_at,
            files,
            error: record.error.clone(),
        };
        let json = serde_json::to_string_pretty(&stored)?;
        tokio::fs::write(dir.join("record.json"), json).await?;
        Ok(())
    }
}

#[async_trait]
impl ExtensionStore for FsStore {
    async fn get(&self, id: &str) -> Result<Option<InstalledExtension>> {
        let dir = self.record_dir(id)?;
        if !dir.join("record.json").exists() {
            return Ok(None);
        }
        Ok(Some(self.read_record(&dir).await?))
    }

    async fn get_all(&self) -> Result<Vec<InstalledExtension>> {
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            match self.read_record(&dir).await {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping corrupt extension record at {:?}: {}", dir, e),
            }
        }
        records.sort_by(|a, b| a.manifest.id.cmp(&b.manifest.id));
        Ok(records)
    }

    async fn set(&self, mut record: InstalledExtension) -> Result<()> {
        normalize_binary_assets(&mut record);
        self.write_record(&record).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let dir = self.record_dir(id)?;
        if dir.exists() {
            tokio::fs::remove_dir_all(&dir).await?;
        }
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_dir() {
                tokio::fs::remove_dir_all(&path).await?;
            } else {
                tokio::fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::sample_record;
    use super::*;
    use crate::binary;

    fn test_store() -> (FsStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path().join("store")).unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_roundtrip_with_blob() {
        let (store, _dir) = test_store();

        let mut record = sample_record("pyxis.assets");
        record.cache.files.insert(
            "icon.png".to_string(),
            CachedAsset::Binary(Blob::new("image/png", vec![1, 2, 3, 4])),
        );
        record.cache.files.insert(
            "main.css".to_string(),
            CachedAsset::Text("body {}".to_string()),
        );
        store.set(record).await.unwrap();

        let loaded = store.get("pyxis.assets").await.unwrap().unwrap();
        assert_eq!(
            loaded.cache.files["icon.png"].as_blob().unwrap().bytes,
            vec![1, 2, 3, 4]
        );
        assert_eq!(loaded.cache.files["main.css"].as_text(), Some("body {}"));
    }

    #[tokio::test]
    async fn test_blob_persisted_as_raw_bytes() {
        let (store, _dir) = test_store();

        let mut record = sample_record("pyxis.assets");
        let data_url = binary::bytes_to_data_url(&[7, 7, 7], Some("icon.png"));
        record
            .cache
            .files
            .insert("icon.png".to_string(), CachedAsset::Text(data_url));
        store.set(record).await.unwrap();

        // The data-URL string was converted; bytes land raw in blobs/.
        let blob_dir = store.root().join("pyxis.assets").join("blobs");
        let blob_file = std::fs::read_dir(&blob_dir).unwrap().next().unwrap().unwrap();
        assert_eq!(std::fs::read(blob_file.path()).unwrap(), vec![7, 7, 7]);
    }

    #[tokio::test]
    async fn test_get_all_skips_corrupt_records() {
        let (store, _dir) = test_store();
        store.set(sample_record("a.good")).await.unwrap();

        let bad_dir = store.root().join("b.bad");
        std::fs::create_dir_all(&bad_dir).unwrap();
        std::fs::write(bad_dir.join("record.json"), "{\"manifest\": null}").unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].manifest.id, "a.good");
    }

    #[tokio::test]
    async fn test_invalid_id_refused() {
        let (store, _dir) = test_store();
        assert!(store.get("../escape").await.is_err());
    }
}
