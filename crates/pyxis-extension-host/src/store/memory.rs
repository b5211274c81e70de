//! In-memory store for tests and hosts without durable storage.

use super::{ExtensionStore, normalize_binary_assets};
use async_trait::async_trait;
use pyxis_extension_sdk::error::Result;
use pyxis_extension_sdk::record::InstalledExtension;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Volatile `ExtensionStore` backed by a map
#[derive(Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, InstalledExtension>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ExtensionStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<InstalledExtension>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<InstalledExtension>> {
        let records = self.records.read().await;
        let mut all: Vec<_> = records.values().cloned().collect();
        all.sort_by(|a, b| a.manifest.id.cmp(&b.manifest.id));
        Ok(all)
    }

    async fn set(&self, mut record: InstalledExtension) -> Result<()> {
        normalize_binary_assets(&mut record);
        self.records
            .write()
            .await
            .insert(record.manifest.id.clone(), record);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.records.write().await.remove(id);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.records.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::sample_record;
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = MemoryStore::new();
        store.set(sample_record("a.one")).await.unwrap();
        store.set(sample_record("a.two")).await.unwrap();

        assert!(store.get("a.one").await.unwrap().is_some());
        assert_eq!(store.get_all().await.unwrap().len(), 2);

        store.delete("a.one").await.unwrap();
        assert!(store.get("a.one").await.unwrap().is_none());

        store.clear().await.unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_replaces_by_id() {
        let store = MemoryStore::new();
        store.set(sample_record("a.one")).await.unwrap();
        let mut updated = sample_record("a.one");
        updated.enabled = true;
        store.set(updated).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].enabled);
    }
}
