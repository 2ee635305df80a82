//! Import workflow
//!
//! load → provision → stamp → persist → reload → (optionally) start.
//! Plugins are imported one at a time; the first failure stops the run.

use freeds_core::{Error, PluginEnvironment, Result};
use freeds_store::SecretStore;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::dependency::{sort_manifests, DependencyResolver};
use crate::manifest::{ManifestSource, PluginManifest};
use crate::provision::Provisioner;
use crate::runner::ServiceRunner;

/// Meta key recording the last import time (RFC 3339)
pub const IMPORTED_AT_KEY: &str = "imported_at";

pub struct Importer {
    store: Arc<dyn SecretStore>,
    provisioner: Provisioner,
    runner: Option<Arc<dyn ServiceRunner>>,
    autostart: bool,
}

impl Importer {
    pub fn new(store: Arc<dyn SecretStore>, provisioner: Provisioner) -> Self {
        Self {
            store,
            provisioner,
            runner: None,
            autostart: false,
        }
    }

    /// Use `runner` for start/stop; also starts services after each import
    pub fn with_runner(mut self, runner: Arc<dyn ServiceRunner>) -> Self {
        self.runner = Some(runner);
        self.autostart = true;
        self
    }

    pub fn with_autostart(mut self, autostart: bool) -> Self {
        self.autostart = autostart;
        self
    }

    pub fn store(&self) -> &dyn SecretStore {
        self.store.as_ref()
    }

    /// Import the plugin in `dir`
    pub async fn import_plugin(&self, dir: &Path) -> Result<PluginManifest> {
        let manifest =
            PluginManifest::load(ManifestSource::Directory(dir.to_path_buf()), self.store()).await?;
        self.import_manifest(manifest).await
    }

    /// Provision, persist and reload an already loaded manifest
    pub async fn import_manifest(&self, mut manifest: PluginManifest) -> Result<PluginManifest> {
        info!("Importing plugin {}", manifest.name());
        self.provisioner.provision_all(&mut manifest).await?;
        manifest.meta_mut().insert(
            IMPORTED_AT_KEY.to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        manifest.persist(self.store()).await?;

        let reloaded = self.load(manifest.name()).await?;
        if self.autostart && self.runner.is_some() {
            if reloaded.has_services() {
                self.start_manifest(&reloaded).await?;
            } else {
                debug!("Plugin {} has no compose descriptor, not starting", reloaded.name());
            }
        }
        info!("Imported plugin {}", reloaded.name());
        Ok(reloaded)
    }

    /// Import several plugin directories in deploy order
    pub async fn import_all(&self, dirs: &[PathBuf]) -> Result<Vec<PluginManifest>> {
        let mut manifests = Vec::with_capacity(dirs.len());
        for dir in dirs {
            manifests.push(
                PluginManifest::load(ManifestSource::Directory(dir.clone()), self.store()).await?,
            );
        }

        for (plugin, missing) in self.unresolved_dependencies(&manifests).await? {
            warn!(
                "Plugin {} depends on {} which is neither being imported nor stored",
                plugin,
                missing.join(", ")
            );
        }

        let mut imported = Vec::with_capacity(manifests.len());
        for manifest in sort_manifests(manifests)? {
            imported.push(self.import_manifest(manifest).await?);
        }
        Ok(imported)
    }

    /// Dependencies of each manifest found neither in the batch nor in the store
    pub async fn unresolved_dependencies(
        &self,
        manifests: &[PluginManifest],
    ) -> Result<BTreeMap<String, Vec<String>>> {
        let mut available: BTreeSet<String> = self.store.list_plugins().await?.into_iter().collect();
        available.extend(manifests.iter().map(|m| m.name().to_string()));

        let resolver = DependencyResolver::new(manifests);
        Ok(manifests
            .iter()
            .map(|m| (m.name().to_string(), resolver.missing_dependencies(m.name(), &available)))
            .filter(|(_, missing)| !missing.is_empty())
            .collect())
    }

    /// Load a stored plugin by name
    pub async fn load(&self, name: &str) -> Result<PluginManifest> {
        PluginManifest::load(ManifestSource::Store(name.to_string()), self.store()).await
    }

    /// Exported environment of a stored plugin
    pub async fn environment(&self, name: &str) -> Result<PluginEnvironment> {
        let manifest = self.load(name).await?;
        Ok(manifest.export_environment_with_prefix(self.provisioner.env_prefix()))
    }

    pub async fn start_plugin(&self, name: &str) -> Result<()> {
        let manifest = self.load(name).await?;
        self.start_manifest(&manifest).await
    }

    pub async fn stop_plugin(&self, name: &str) -> Result<()> {
        let manifest = self.load(name).await?;
        let (runner, dir) = self.runner_for(&manifest)?;
        let env = manifest.export_environment_with_prefix(self.provisioner.env_prefix());
        runner.stop(&env, dir).await
    }

    async fn start_manifest(&self, manifest: &PluginManifest) -> Result<()> {
        let (runner, dir) = self.runner_for(manifest)?;
        let env = manifest.export_environment_with_prefix(self.provisioner.env_prefix());
        runner.start(&env, dir).await
    }

    fn runner_for<'a>(
        &'a self,
        manifest: &'a PluginManifest,
    ) -> Result<(&'a dyn ServiceRunner, &'a Path)> {
        let runner = self
            .runner
            .as_deref()
            .ok_or_else(|| Error::configuration("No service runner configured"))?;
        let dir = manifest.plugin_dir().ok_or_else(|| {
            Error::not_found(format!("plugin directory of {}", manifest.name()))
        })?;
        Ok((runner, dir))
    }
}
