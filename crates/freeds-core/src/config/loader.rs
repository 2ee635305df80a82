//! Layered root configuration
//!
//! Precedence (low to high):
//! 1. Built-in defaults
//! 2. Config file (~/.freeds/config.yaml)
//! 3. Environment variables (FDS_* prefix)

use crate::environment::DEFAULT_ENV_PREFIX;
use crate::error::{Error, Result};
use crate::utils::get_home_dir;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::ops::RangeInclusive;
use std::time::Duration;
use tracing::debug;

/// Config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// File holding the secret store root token
const TOKEN_FILE_NAME: &str = ".bao_root";

const DEFAULT_VAULT_URI: &str = "http://127.0.0.1:8200";
const DEFAULT_VAULT_MOUNT: &str = "config";
const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_PORT_START: u16 = 8000;
const DEFAULT_PORT_END: u16 = 8999;

/// Secret store connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultSettings {
    pub uri: String,
    pub mount: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl VaultSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            uri: DEFAULT_VAULT_URI.to_string(),
            mount: DEFAULT_VAULT_MOUNT.to_string(),
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Candidate port range for UI port allocation (inclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn new(start: u16, end: u16) -> Result<Self> {
        if start > end {
            return Err(Error::configuration(format!(
                "Invalid port range {}-{}: start is after end",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn iter(&self) -> RangeInclusive<u16> {
        self.start..=self.end
    }
}

impl Default for PortRange {
    fn default() -> Self {
        Self {
            start: DEFAULT_PORT_START,
            end: DEFAULT_PORT_END,
        }
    }
}

/// On-disk shape of config.yaml; every field optional
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConfigFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root: Option<Utf8PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vault_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vault_mount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vault_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ports: Option<PortRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    env_prefix: Option<String>,
}

/// Loaded FreeDS root configuration
#[derive(Debug, Clone)]
pub struct FreedsConfig {
    /// FreeDS root directory (holds plugins/ and data/)
    pub root: Utf8PathBuf,

    /// Secret store connection
    pub vault: VaultSettings,

    /// UI port allocation range
    pub ports: PortRange,

    /// Environment variable prefix
    pub env_prefix: String,

    /// Directory holding config.yaml and the token file
    config_dir: Utf8PathBuf,
}

impl FreedsConfig {
    /// Load configuration from the standard location (~/.freeds)
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_config_dir()?)
    }

    /// Load configuration from a custom config directory
    pub fn load_from(config_dir: Utf8PathBuf) -> Result<Self> {
        let mut config = Self::defaults(config_dir)?;

        let config_path = config.config_file();
        if config_path.exists() {
            debug!("Loading config from {}", config_path);
            let content = fs::read_to_string(&config_path)?;
            let file: ConfigFile = serde_yaml_ng::from_str(&content).map_err(|e| {
                Error::configuration(format!("Failed to parse {}: {}", config_path, e))
            })?;
            config.apply_file(file)?;
        }

        config.apply_env_overrides()?;

        if config.vault.token.is_none() {
            config.vault.token = config.read_token_file()?;
        }

        Ok(config)
    }

    /// Built-in defaults rooted at the current directory
    pub fn defaults(config_dir: Utf8PathBuf) -> Result<Self> {
        let cwd = env::current_dir()?;
        let root = Utf8PathBuf::try_from(cwd)
            .map_err(|_| Error::configuration("Current directory path is not valid UTF-8"))?;

        Ok(Self {
            root,
            vault: VaultSettings::default(),
            ports: PortRange::default(),
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            config_dir,
        })
    }

    /// Get the standard config directory (~/.freeds)
    pub fn default_config_dir() -> Result<Utf8PathBuf> {
        let home = get_home_dir()?;
        let home = Utf8PathBuf::try_from(home)
            .map_err(|_| Error::configuration("Home directory path is not valid UTF-8"))?;
        Ok(home.join(".freeds"))
    }

    fn apply_file(&mut self, file: ConfigFile) -> Result<()> {
        if let Some(root) = file.root {
            self.root = root;
        }
        if let Some(uri) = file.vault_uri {
            self.vault.uri = uri;
        }
        if let Some(mount) = file.vault_mount {
            self.vault.mount = mount;
        }
        if let Some(secs) = file.vault_timeout_secs {
            self.vault.timeout_secs = secs;
        }
        if let Some(ports) = file.ports {
            self.ports = PortRange::new(ports.start, ports.end)?;
        }
        if let Some(prefix) = file.env_prefix {
            self.env_prefix = prefix;
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = env::var("FDS_ROOT_PATH") {
            self.root = Utf8PathBuf::from(val);
        }

        if let Ok(val) = env::var("FDS_VAULT_URI") {
            self.vault.uri = val;
        }

        if let Ok(val) = env::var("FDS_VAULT_TOKEN") {
            self.vault.token = Some(val);
        }

        if let Ok(val) = env::var("FDS_VAULT_TIMEOUT_SECS") {
            self.vault.timeout_secs = val.parse().map_err(|_| {
                Error::configuration("FDS_VAULT_TIMEOUT_SECS must be a valid number")
            })?;
        }

        Ok(())
    }

    fn read_token_file(&self) -> Result<Option<String>> {
        let path = self.token_file();
        if !path.exists() {
            return Ok(None);
        }
        let token = fs::read_to_string(&path)?.trim().to_string();
        Ok((!token.is_empty()).then_some(token))
    }

    /// Persist the file layer (root, vault address, ports, prefix)
    ///
    /// The token is never written to config.yaml.
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        let file = ConfigFile {
            root: Some(self.root.clone()),
            vault_uri: Some(self.vault.uri.clone()),
            vault_mount: Some(self.vault.mount.clone()),
            vault_timeout_secs: Some(self.vault.timeout_secs),
            ports: Some(self.ports),
            env_prefix: Some(self.env_prefix.clone()),
        };
        let content = serde_yaml_ng::to_string(&file)?;
        fs::write(self.config_file(), content)?;
        debug!("Saved config to {}", self.config_file());
        Ok(())
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn config_file(&self) -> Utf8PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    pub fn token_file(&self) -> Utf8PathBuf {
        self.config_dir.join(TOKEN_FILE_NAME)
    }

    pub fn plugins_path(&self) -> Utf8PathBuf {
        self.root.join("plugins")
    }

    pub fn data_path(&self) -> Utf8PathBuf {
        self.root.join("data")
    }

    pub fn assets_path(&self) -> Utf8PathBuf {
        self.root.join("assets")
    }
}
