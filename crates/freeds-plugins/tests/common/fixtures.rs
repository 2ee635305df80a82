//! Plugin directory fixtures

use freeds_plugins::PluginManifest;
use freeds_store::{MemoryStore, SecretStore, StoreEntry};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A temporary FreeDS root with `plugins/` and `data/` below it
pub struct PluginFixture {
    temp_dir: TempDir,
}

impl PluginFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::create_dir_all(temp_dir.path().join("plugins")).unwrap();
        std::fs::create_dir_all(temp_dir.path().join("data")).unwrap();
        Self { temp_dir }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.root().join("plugins")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root().join("data")
    }

    /// Write `plugins/<name>/plugin.yaml` and return the plugin directory
    pub fn write_plugin(&self, name: &str, yaml: &str) -> PathBuf {
        let dir = self.plugins_dir().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("plugin.yaml"), yaml).unwrap();
        dir
    }

    /// Write a sibling file next to a plugin's manifest
    pub fn write_sibling(&self, name: &str, file: &str, content: &str) {
        std::fs::write(self.plugins_dir().join(name).join(file), content).unwrap();
    }
}

/// A plugin.yaml body depending on the given plugins
pub fn manifest_with_dependencies(deps: &[&str]) -> String {
    if deps.is_empty() {
        return "plugin:\n  config: {}\n".to_string();
    }
    let mut yaml = String::from("plugin:\n  dependencies:\n");
    for dep in deps {
        yaml.push_str(&format!("    {}: {{}}\n", dep));
    }
    yaml
}

/// An in-memory manifest with the given dependencies
pub fn manifest_named(name: &str, deps: &[&str]) -> PluginManifest {
    let mut manifest = PluginManifest::new(name);
    for dep in deps {
        manifest
            .dependencies_mut()
            .insert(dep.to_string(), Value::Object(Default::default()));
    }
    manifest
}

/// A store entry claiming a Ui port
pub fn ui_claim_entry(name: &str, port: u16) -> (String, StoreEntry) {
    let entry = serde_json::json!({
        "config": {"name": name},
        "resources": {"web": {"type": "Ui", "description": "", "params": {"number": port}}}
    });
    (name.to_string(), entry.as_object().cloned().unwrap())
}

pub fn memory_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

pub fn as_store(store: &Arc<MemoryStore>) -> Arc<dyn SecretStore> {
    store.clone()
}
