//! In-process secret store
//!
//! Same contract as the Vault store (empty-on-absence, merge-on-write),
//! kept in memory. Used for dry runs and tests.

use crate::store::{merge_entry, require_plugin, SecretStore, StoreEntry};
use async_trait::async_trait;
use freeds_core::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, StoreEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with entries
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, StoreEntry)>,
    {
        Self {
            entries: Arc::new(RwLock::new(entries.into_iter().collect())),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn read(&self, plugin: &str) -> Result<StoreEntry> {
        require_plugin(plugin)?;
        Ok(self
            .entries
            .read()
            .await
            .get(plugin)
            .cloned()
            .unwrap_or_default())
    }

    async fn write(&self, plugin: &str, data: StoreEntry) -> Result<()> {
        require_plugin(plugin)?;
        let mut entries = self.entries.write().await;
        let existing = entries.remove(plugin).unwrap_or_default();
        entries.insert(plugin.to_string(), merge_entry(existing, data));
        debug!("Wrote memory store entry: {}", plugin);
        Ok(())
    }

    async fn delete(&self, plugin: &str) -> Result<()> {
        require_plugin(plugin)?;
        self.entries.write().await.remove(plugin);
        Ok(())
    }

    async fn list_plugins(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(value: serde_json::Value) -> StoreEntry {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_read_missing_is_empty() {
        let store = MemoryStore::new();
        assert!(store.read("nonexistent").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_write_merges() {
        let store = MemoryStore::new();
        store
            .write("kafka", entry(json!({"config": {"a": 1}, "meta": {}})))
            .await
            .unwrap();
        store
            .write("kafka", entry(json!({"config": {"b": 2}})))
            .await
            .unwrap();

        let stored = store.read("kafka").await.unwrap();
        assert_eq!(stored["config"], json!({"b": 2}));
        assert!(stored.contains_key("meta"));
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let store = MemoryStore::new();
        store.write("b", entry(json!({"x": 1}))).await.unwrap();
        store.write("a", entry(json!({"x": 1}))).await.unwrap();
        assert_eq!(store.list_plugins().await.unwrap(), vec!["a", "b"]);

        store.delete("a").await.unwrap();
        store.delete("a").await.unwrap();
        assert_eq!(store.list_plugins().await.unwrap(), vec!["b"]);
    }
}
