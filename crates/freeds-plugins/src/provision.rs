//! Provisioning orchestrator
//!
//! `provision_all` expands dependencies into implied resources, then
//! provisions every declared resource in declaration order and merges each
//! config fragment into the manifest (last write wins). Nothing is persisted.

use freeds_core::config::PortRange;
use freeds_core::environment::DEFAULT_ENV_PREFIX;
use freeds_core::types::ResourceSpec;
use freeds_core::{FreedsConfig, Result};
use freeds_store::SecretStore;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use crate::manifest::PluginManifest;
use crate::ports::PortAllocator;
use crate::registry::ResourceRegistry;
use crate::resource::{ProvisionContext, Resource, ResourceKind};

/// Dependency name that implies a database user and database
pub const POSTGRES_DEPENDENCY: &str = "postgres";

pub struct Provisioner {
    registry: ResourceRegistry,
    store: Arc<dyn SecretStore>,
    data_root: PathBuf,
    ports: PortRange,
    env_prefix: String,
}

impl Provisioner {
    pub fn new(store: Arc<dyn SecretStore>, data_root: impl Into<PathBuf>) -> Self {
        Self {
            registry: ResourceRegistry::new(),
            store,
            data_root: data_root.into(),
            ports: PortRange::default(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Build from the layered configuration (data root, port range, prefix)
    pub fn from_config(store: Arc<dyn SecretStore>, config: &FreedsConfig) -> Self {
        Self::new(store, config.data_path().into_std_path_buf())
            .with_port_range(config.ports)
            .with_env_prefix(config.env_prefix.clone())
    }

    pub fn with_port_range(mut self, ports: PortRange) -> Self {
        self.ports = ports;
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    fn context(&self) -> ProvisionContext {
        ProvisionContext {
            data_root: self.data_root.clone(),
            env_prefix: self.env_prefix.clone(),
            ports: PortAllocator::new(Arc::clone(&self.store), self.ports),
        }
    }

    /// Expand dependencies and provision every declared resource
    ///
    /// Every type is resolved before anything is provisioned, so an unknown
    /// type leaves `config` untouched.
    pub async fn provision_all(&self, manifest: &mut PluginManifest) -> Result<()> {
        expand_dependencies(manifest);

        let plugin = manifest.name().to_string();
        let mut pending = Vec::with_capacity(manifest.resources().len());
        for (name, spec) in manifest.resources() {
            let kind = self.registry.resolve(&plugin, &spec.kind)?;
            pending.push(Resource::new(kind, &plugin, name, spec));
        }

        let ctx = self.context();
        for mut resource in pending {
            let fragment = resource.provision(manifest, &ctx).await?;
            if let Some(spec) = manifest.resources_mut().get_mut(&resource.name) {
                spec.params = resource.params;
            }
            debug!(
                "Resource {} of plugin {} produced {} config keys",
                resource.name,
                plugin,
                fragment.len()
            );
            manifest.config_mut().extend(fragment);
        }

        info!(
            "Provisioned {} resources for plugin {}",
            manifest.resources().len(),
            plugin
        );
        Ok(())
    }
}

/// Resources implied by a dependency on another plugin
pub fn dependency_resources(plugin: &str, dependency: &str) -> Vec<(String, ResourceSpec)> {
    match dependency {
        POSTGRES_DEPENDENCY => vec![
            (
                format!("{}_pguser", plugin),
                ResourceSpec::new(
                    ResourceKind::PostgresUser.type_name(),
                    format!("Postgres user for plugin {}", plugin),
                ),
            ),
            (
                format!("{}_pgdb", plugin),
                ResourceSpec::new(
                    ResourceKind::PostgresDatabase.type_name(),
                    format!("Postgres database for plugin {}", plugin),
                ),
            ),
        ],
        _ => Vec::new(),
    }
}

/// Insert implied resources; existing same-named resources are kept as is
pub fn expand_dependencies(manifest: &mut PluginManifest) {
    let plugin = manifest.name().to_string();
    let implied: Vec<_> = manifest
        .dependency_names()
        .flat_map(|dep| dependency_resources(&plugin, dep))
        .collect();

    for (name, spec) in implied {
        if manifest.resources().contains_key(&name) {
            continue;
        }
        debug!("Adding implied resource {} to plugin {}", name, plugin);
        manifest.resources_mut().insert(name, spec);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_postgres_implies_user_and_database() {
        let resources = dependency_resources("airflow", "postgres");
        let names: Vec<_> = resources.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["airflow_pguser", "airflow_pgdb"]);
        assert_eq!(resources[0].1.kind, "PostgresUser");
        assert_eq!(resources[1].1.kind, "PostgresDatabase");
    }

    #[test]
    fn test_other_dependencies_imply_nothing() {
        assert!(dependency_resources("airflow", "kafka").is_empty());
    }

    #[test]
    fn test_expansion_is_set_if_absent() {
        let mut manifest = PluginManifest::new("airflow");
        manifest
            .dependencies_mut()
            .insert("postgres".into(), Value::Null);
        manifest.resources_mut().insert(
            "airflow_pguser".into(),
            ResourceSpec::new("PostgresUser", "custom").with_param("role", "owner"),
        );

        expand_dependencies(&mut manifest);
        expand_dependencies(&mut manifest);

        assert_eq!(manifest.resources().len(), 2);
        assert_eq!(manifest.resources()["airflow_pguser"].description, "custom");
        assert_eq!(
            manifest.resources()["airflow_pguser"].params["role"],
            "owner"
        );
    }
}
