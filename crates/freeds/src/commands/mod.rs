//! CLI command implementations

pub mod config;
pub mod import;
pub mod plugin;

use anyhow::{Context, Result};
use freeds_core::FreedsConfig;
use freeds_plugins::{ComposeRunner, Importer, Provisioner};
use freeds_store::{SecretStore, VaultStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Loaded configuration plus a secret store client
pub struct Session {
    pub config: FreedsConfig,
    pub store: Arc<dyn SecretStore>,
}

impl Session {
    pub fn open() -> Result<Self> {
        let config = FreedsConfig::load().context("Failed to load FreeDS configuration")?;
        if config.vault.token.is_none() {
            warn!(
                "No vault token found (set FDS_VAULT_TOKEN or create {})",
                config.token_file()
            );
        }
        let store =
            VaultStore::from_settings(&config.vault).context("Failed to create vault client")?;
        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    pub fn importer(&self) -> Importer {
        let provisioner = Provisioner::from_config(Arc::clone(&self.store), &self.config);
        Importer::new(Arc::clone(&self.store), provisioner)
            .with_runner(Arc::new(ComposeRunner::new()))
    }
}

/// Plugin directory argument, defaulting to `<root>/plugins`
pub fn plugins_dir(config: &FreedsConfig, path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(|| config.plugins_path().into_std_path_buf())
}
