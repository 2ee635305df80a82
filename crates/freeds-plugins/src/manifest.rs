//! Plugin manifest model
//!
//! A manifest is loaded either from a plugin directory holding
//! `plugin.yaml`, or from the secret store by plugin name:
//! ```yaml
//! plugin:
//!   config: {}
//!   meta: {}
//!   dependencies:
//!     postgres: {}
//!   resources:
//!     web:
//!       type: Ui
//!       description: Admin ui
//!       params:
//!         uri: http://127.0.0.1:${FDS_KAFKA_UI_PORT}
//!   deployments: {}
//! ```
//! Mutating a manifest never persists it; call [`PluginManifest::persist`].

use freeds_core::environment::DEFAULT_ENV_PREFIX;
use freeds_core::types::{
    ConfigMap, DeploymentSpec, PluginDocument, ResourceSpec, CONFIG_ID_KEY, CONFIG_NAME_KEY,
    CONFIG_PATH_KEY, PLUGIN_ROOT_KEY,
};
use freeds_core::{Error, PluginEnvironment, Result};
use freeds_store::{SecretStore, StoreEntry};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::ports::ports_claimed_by;

/// Manifest file name inside a plugin directory
pub const MANIFEST_FILE_NAME: &str = "plugin.yaml";

/// Optional readme sibling, recorded as `meta.readme`
pub const README_FILE_NAME: &str = "README.md";

/// Optional compose descriptor sibling, recorded as `meta.dc`
pub const COMPOSE_FILE_NAME: &str = "docker-compose.yaml";

const META_README_KEY: &str = "readme";
const META_COMPOSE_KEY: &str = "dc";

/// Where to load a manifest from; exactly one form per load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    /// A plugin directory containing plugin.yaml
    Directory(PathBuf),
    /// A plugin name resolved through the secret store
    Store(String),
}

impl ManifestSource {
    /// Build a source from optional path and name inputs
    pub fn from_options(path: Option<PathBuf>, name: Option<String>) -> Result<Self> {
        match (path, name) {
            (Some(path), None) => Ok(Self::Directory(path)),
            (None, Some(name)) => Ok(Self::Store(name)),
            (Some(_), Some(_)) => Err(Error::configuration(
                "Specify either a plugin path or a plugin name, not both",
            )),
            (None, None) => Err(Error::configuration(
                "Specify a plugin path or a plugin name",
            )),
        }
    }
}

/// A plugin's declared configuration, dependencies, resources and deployments
#[derive(Debug, Clone, PartialEq)]
pub struct PluginManifest {
    name: String,
    path: Option<PathBuf>,
    document: PluginDocument,
}

impl PluginManifest {
    /// Create an empty manifest carrying only its name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut document = PluginDocument::default();
        document
            .config
            .insert(CONFIG_NAME_KEY.to_string(), Value::String(name.clone()));
        Self {
            name,
            path: None,
            document,
        }
    }

    /// Load a manifest from a directory or from the store
    ///
    /// The directory form keeps the persistent id of an existing store
    /// entry of the same name, so re-importing never changes identity.
    pub async fn load(source: ManifestSource, store: &dyn SecretStore) -> Result<Self> {
        match source {
            ManifestSource::Directory(dir) => {
                let (mut manifest, has_id) = Self::read_dir(&dir)?;
                if !has_id {
                    let stored = store.read(&manifest.name).await?;
                    let stored_id = stored
                        .get("config")
                        .and_then(|c| c.get(CONFIG_ID_KEY))
                        .cloned();
                    let id = stored_id.unwrap_or_else(new_id);
                    manifest.document.config.insert(CONFIG_ID_KEY.to_string(), id);
                }
                Ok(manifest)
            }
            ManifestSource::Store(name) => {
                let entry = store.read(&name).await?;
                Self::from_store_entry(&name, entry)
            }
        }
    }

    /// Load a manifest from a plugin directory without consulting the store
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let (mut manifest, has_id) = Self::read_dir(dir)?;
        if !has_id {
            manifest
                .document
                .config
                .insert(CONFIG_ID_KEY.to_string(), new_id());
        }
        Ok(manifest)
    }

    fn read_dir(dir: &Path) -> Result<(Self, bool)> {
        let manifest_path = dir.join(MANIFEST_FILE_NAME);
        if !manifest_path.is_file() {
            return Err(Error::not_found(format!(
                "{} not found in {}",
                MANIFEST_FILE_NAME,
                dir.display()
            )));
        }

        let dir = dir.canonicalize()?;
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::configuration(format!(
                    "Cannot derive a plugin name from {}",
                    dir.display()
                ))
            })?;

        let content = std::fs::read_to_string(&manifest_path)?;
        let document = parse_manifest(&content, &manifest_path.display().to_string())?;
        let has_id = document.config.contains_key(CONFIG_ID_KEY);

        let mut manifest = Self {
            name: name.clone(),
            path: Some(dir.clone()),
            document,
        };

        for (file, key) in [
            (README_FILE_NAME, META_README_KEY),
            (COMPOSE_FILE_NAME, META_COMPOSE_KEY),
        ] {
            let sibling = dir.join(file);
            if sibling.is_file() {
                manifest
                    .document
                    .meta
                    .insert(key.to_string(), path_value(&sibling));
            }
        }

        let config = &mut manifest.document.config;
        config.insert(CONFIG_PATH_KEY.to_string(), path_value(&dir));
        config.insert(CONFIG_NAME_KEY.to_string(), Value::String(name));

        info!("Loaded plugin {} from {}", manifest.name, dir.display());
        Ok((manifest, has_id))
    }

    /// Rebuild a manifest from a store entry
    ///
    /// An empty entry, or one without `config.name`, means the plugin is not known.
    pub fn from_store_entry(name: &str, entry: StoreEntry) -> Result<Self> {
        if entry.is_empty() {
            return Err(Error::not_found(format!("plugin '{}' in secret store", name)));
        }

        let document: PluginDocument = serde_json::from_value(Value::Object(entry))
            .map_err(|e| Error::validation(format!("store entry '{}'", name), e.to_string()))?;

        if !document.config.contains_key(CONFIG_NAME_KEY) {
            return Err(Error::not_found(format!(
                "plugin '{}' in secret store (entry has no identity)",
                name
            )));
        }

        let path = document
            .config
            .get(CONFIG_PATH_KEY)
            .and_then(Value::as_str)
            .map(PathBuf::from);

        debug!("Loaded plugin {} from secret store", name);
        Ok(Self {
            name: name.to_string(),
            path,
            document,
        })
    }

    /// The raw fields written to the store
    pub fn to_store_entry(&self) -> Result<StoreEntry> {
        match serde_json::to_value(&self.document)? {
            Value::Object(map) => Ok(map),
            _ => Err(Error::validation(&self.name, "manifest did not serialize to a mapping")),
        }
    }

    /// Write the current state back to the store (merge on write)
    pub async fn persist(&self, store: &dyn SecretStore) -> Result<()> {
        store.write(&self.name, self.to_store_entry()?).await?;
        info!("Persisted plugin {} to {} store", self.name, store.name());
        Ok(())
    }

    /// Exported environment with the default `FDS` prefix
    pub fn export_environment(&self) -> PluginEnvironment {
        self.export_environment_with_prefix(DEFAULT_ENV_PREFIX)
    }

    /// Exported environment: one `<PREFIX>_<PLUGIN>_<KEY>` variable per config key
    pub fn export_environment_with_prefix(&self, prefix: &str) -> PluginEnvironment {
        PluginEnvironment::from_config(prefix, &self.name, &self.document.config)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filesystem origin, when loaded from (or originally imported from) a directory
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Directory the process collaborator runs the plugin from
    pub fn plugin_dir(&self) -> Option<&Path> {
        self.path()
    }

    /// Persistent opaque id, assigned on first file-based load
    pub fn id(&self) -> Option<&str> {
        self.document.config.get(CONFIG_ID_KEY).and_then(Value::as_str)
    }

    pub fn document(&self) -> &PluginDocument {
        &self.document
    }

    pub fn config(&self) -> &ConfigMap {
        &self.document.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigMap {
        &mut self.document.config
    }

    pub fn meta(&self) -> &ConfigMap {
        &self.document.meta
    }

    pub fn meta_mut(&mut self) -> &mut ConfigMap {
        &mut self.document.meta
    }

    pub fn dependencies(&self) -> &IndexMap<String, Value> {
        &self.document.dependencies
    }

    pub fn dependencies_mut(&mut self) -> &mut IndexMap<String, Value> {
        &mut self.document.dependencies
    }

    pub fn resources(&self) -> &IndexMap<String, ResourceSpec> {
        &self.document.resources
    }

    pub fn resources_mut(&mut self) -> &mut IndexMap<String, ResourceSpec> {
        &mut self.document.resources
    }

    pub fn deployments(&self) -> &IndexMap<String, DeploymentSpec> {
        &self.document.deployments
    }

    pub fn deployments_mut(&mut self) -> &mut IndexMap<String, DeploymentSpec> {
        &mut self.document.deployments
    }

    /// Names of the plugins this one depends on
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.document.dependencies.keys().map(String::as_str)
    }

    /// Ports reserved by this manifest's Ui and KnownPort resources
    pub fn claimed_ports(&self) -> BTreeSet<u16> {
        ports_claimed_by(&self.document.resources)
    }

    /// Whether a compose descriptor was found next to the manifest
    pub fn has_services(&self) -> bool {
        self.document.meta.contains_key(META_COMPOSE_KEY)
    }
}

/// Parse a plugin.yaml document and extract the `plugin` root element
pub fn parse_manifest(content: &str, source_name: &str) -> Result<PluginDocument> {
    let root: serde_yaml_ng::Value = serde_yaml_ng::from_str(content)
        .map_err(|e| Error::validation(source_name, e.to_string()))?;

    if root.is_null() {
        return Err(Error::validation(source_name, "document is empty"));
    }

    let plugin = root
        .as_mapping()
        .and_then(|m| m.get(PLUGIN_ROOT_KEY))
        .cloned()
        .ok_or_else(|| {
            Error::validation(
                source_name,
                format!("root element '{}' not found", PLUGIN_ROOT_KEY),
            )
        })?;

    if plugin.is_null() {
        return Ok(PluginDocument::default());
    }

    serde_yaml_ng::from_value(plugin).map_err(|e| Error::validation(source_name, e.to_string()))
}

fn path_value(path: &Path) -> Value {
    Value::String(path.display().to_string())
}

fn new_id() -> Value {
    Value::String(uuid::Uuid::new_v4().to_string())
}
