//! Secret store trait

use async_trait::async_trait;
use freeds_core::types::ConfigMap;
use freeds_core::{Error, Result};

/// The raw fields of one persisted manifest
pub type StoreEntry = ConfigMap;

/// Durable, per-plugin key-value persistence
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Read a plugin's entry
    ///
    /// Returns an empty map when no entry exists; absence is not an error.
    async fn read(&self, plugin: &str) -> Result<StoreEntry>;

    /// Merge `data` into the stored entry and persist it
    async fn write(&self, plugin: &str, data: StoreEntry) -> Result<()>;

    /// Remove every version of a plugin's entry; absence is not an error
    async fn delete(&self, plugin: &str) -> Result<()>;

    /// Names of all plugins currently stored, sorted
    async fn list_plugins(&self) -> Result<Vec<String>>;

    /// Store name for log and error messages
    fn name(&self) -> &'static str;
}

/// Shallow merge: keys in `data` replace same-named keys in `existing`
pub fn merge_entry(mut existing: StoreEntry, data: StoreEntry) -> StoreEntry {
    for (key, value) in data {
        existing.insert(key, value);
    }
    existing
}

pub(crate) fn require_plugin(plugin: &str) -> Result<()> {
    if plugin.trim().is_empty() {
        return Err(Error::configuration("plugin name required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_entry_preserves_absent_keys() {
        let existing = json!({"config": {"a": 1}, "meta": {"readme": "x"}});
        let data = json!({"config": {"b": 2}});
        let merged = merge_entry(
            existing.as_object().unwrap().clone(),
            data.as_object().unwrap().clone(),
        );
        assert_eq!(
            serde_json::Value::Object(merged),
            json!({"config": {"b": 2}, "meta": {"readme": "x"}})
        );
    }

    #[test]
    fn test_require_plugin() {
        assert!(require_plugin("kafka").is_ok());
        assert!(matches!(
            require_plugin("  "),
            Err(Error::Configuration { .. })
        ));
    }
}
