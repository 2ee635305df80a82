//! Resource kinds and their provisioning strategies
//!
//! A [`Resource`] lives only for one provisioning pass: it is built from a
//! manifest's `resources[name]` declaration, provisioned once, and its config
//! fragment is merged into the manifest by the orchestrator.

use freeds_core::environment::value_to_env_string;
use freeds_core::types::{ConfigMap, ResourceSpec};
use freeds_core::{substitute, Error, PluginEnvironment, Result};
use rand::Rng;
use serde_json::Value;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::manifest::PluginManifest;
use crate::ports::{port_param, PortAllocator};

/// Fixed admin user name issued by `AdminAccount`
pub const ADMIN_USER: &str = "freeds";

/// Length of generated admin passwords
pub const ADMIN_PASSWORD_LENGTH: usize = 10;

const PASSWORD_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// The closed set of resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    AdminAccount,
    DataDir,
    Ui,
    KnownPort,
    PostgresDatabase,
    PostgresUser,
    S3,
    S3Bucket,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 8] = [
        ResourceKind::AdminAccount,
        ResourceKind::DataDir,
        ResourceKind::Ui,
        ResourceKind::KnownPort,
        ResourceKind::PostgresDatabase,
        ResourceKind::PostgresUser,
        ResourceKind::S3,
        ResourceKind::S3Bucket,
    ];

    /// Declared type name as written in manifests
    pub fn type_name(self) -> &'static str {
        match self {
            ResourceKind::AdminAccount => "AdminAccount",
            ResourceKind::DataDir => "DataDir",
            ResourceKind::Ui => "Ui",
            ResourceKind::KnownPort => "KnownPort",
            ResourceKind::PostgresDatabase => "PostgresDatabase",
            ResourceKind::PostgresUser => "PostgresUser",
            ResourceKind::S3 => "S3",
            ResourceKind::S3Bucket => "S3Bucket",
        }
    }

    /// Case-insensitive lookup
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.type_name().eq_ignore_ascii_case(name))
    }

    /// Whether declarations of this kind reserve a port
    pub fn claims_port(self) -> bool {
        matches!(self, ResourceKind::Ui | ResourceKind::KnownPort)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Inputs shared by every resource in a provisioning pass
#[derive(Clone)]
pub struct ProvisionContext {
    pub data_root: PathBuf,
    pub env_prefix: String,
    pub ports: PortAllocator,
}

impl fmt::Debug for ProvisionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvisionContext")
            .field("data_root", &self.data_root)
            .field("env_prefix", &self.env_prefix)
            .field("ports", &self.ports.range())
            .finish()
    }
}

/// A transient provisioning unit
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub plugin_name: String,
    pub name: String,
    pub description: String,
    pub kind: ResourceKind,
    pub params: ConfigMap,
}

impl Resource {
    pub fn new(kind: ResourceKind, plugin_name: &str, name: &str, spec: &ResourceSpec) -> Self {
        Self {
            plugin_name: plugin_name.to_string(),
            name: name.to_string(),
            description: spec.description.clone(),
            kind,
            params: spec.params.clone(),
        }
    }

    /// Provision the resource and return its config fragment
    ///
    /// May update `params` (a `Ui` records its allocated port as `number`);
    /// the caller writes them back into the manifest.
    pub async fn provision(
        &mut self,
        manifest: &PluginManifest,
        ctx: &ProvisionContext,
    ) -> Result<ConfigMap> {
        debug!(
            "Provisioning {} resource {} for plugin {}",
            self.kind, self.name, self.plugin_name
        );
        match self.kind {
            ResourceKind::AdminAccount => Ok(self.provision_admin_account()),
            ResourceKind::DataDir => self.provision_data_dir(&ctx.data_root).await,
            ResourceKind::Ui => self.provision_ui(manifest, ctx).await,
            ResourceKind::KnownPort
            | ResourceKind::PostgresDatabase
            | ResourceKind::PostgresUser
            | ResourceKind::S3
            | ResourceKind::S3Bucket => Ok(ConfigMap::new()),
        }
    }

    fn provision_admin_account(&self) -> ConfigMap {
        let mut fragment = ConfigMap::new();
        fragment.insert("admin_user".into(), Value::String(ADMIN_USER.to_string()));
        fragment.insert(
            "admin_password".into(),
            Value::String(generate_password(ADMIN_PASSWORD_LENGTH)),
        );
        fragment
    }

    async fn provision_data_dir(&self, data_root: &Path) -> Result<ConfigMap> {
        let sub_name = self.param_str("name");
        let mut dir = data_root.join(&self.plugin_name);
        if !sub_name.is_empty() {
            dir.push(self.relative_sub_dir(&sub_name)?);
        }
        tokio::fs::create_dir_all(&dir).await?;
        let dir = dir.canonicalize()?;

        let mut fragment = ConfigMap::new();
        fragment.insert(
            suffixed("datadir", &sub_name),
            Value::String(dir.display().to_string()),
        );
        Ok(fragment)
    }

    async fn provision_ui(
        &mut self,
        manifest: &PluginManifest,
        ctx: &ProvisionContext,
    ) -> Result<ConfigMap> {
        let sub_name = self.param_str("name");
        let port = match self.declared_port()? {
            Some(port) => port,
            None => {
                let port = ctx
                    .ports
                    .get_free_port_number(&self.plugin_name, &manifest.claimed_ports())
                    .await?;
                self.params.insert("number".into(), Value::from(port));
                port
            }
        };

        let mut fragment = ConfigMap::new();
        fragment.insert(suffixed("ui_port", &sub_name), Value::from(port));

        let mut env = manifest.export_environment_with_prefix(&ctx.env_prefix);
        env.extend(PluginEnvironment::from_config(
            &ctx.env_prefix,
            &self.plugin_name,
            &fragment,
        ));
        let uri = substitute(&self.param_str("uri"), &env);
        fragment.insert(suffixed("ui_uri", &sub_name), Value::String(uri));
        Ok(fragment)
    }

    /// A data sub-directory must stay below `<data_root>/<plugin>`
    fn relative_sub_dir<'a>(&self, sub_name: &'a str) -> Result<&'a Path> {
        let path = Path::new(sub_name);
        if path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Ok(path);
        }
        Err(Error::validation(
            format!("{}.resources.{}", self.plugin_name, self.name),
            format!("data dir name must be a relative path without '..': {}", sub_name),
        ))
    }

    /// Fixed `number`, else `known_port`; present but unparseable is a validation error
    fn declared_port(&self) -> Result<Option<u16>> {
        for key in ["number", "known_port"] {
            match self.params.get(key) {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) if s.is_empty() => continue,
                Some(value) => {
                    return port_param(value).map(Some).ok_or_else(|| {
                        Error::validation(
                            format!("{}.resources.{}", self.plugin_name, self.name),
                            format!("invalid port {}: {}", key, value),
                        )
                    })
                }
            }
        }
        Ok(None)
    }

    fn param_str(&self, key: &str) -> String {
        self.params
            .get(key)
            .map(value_to_env_string)
            .unwrap_or_default()
    }
}

fn suffixed(key: &str, sub_name: &str) -> String {
    if sub_name.is_empty() {
        key.to_string()
    } else {
        format!("{}_{}", key, sub_name)
    }
}

/// Uniformly drawn password over letters, digits and punctuation
pub fn generate_password(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| PASSWORD_ALPHABET[rng.random_range(0..PASSWORD_ALPHABET.len())] as char)
        .collect()
}
