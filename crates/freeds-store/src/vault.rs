//! Vault / OpenBao KV v2 secret store over HTTP
//!
//! Paths under `<address>/v1/<mount>/`:
//! - `data/<plugin>` for reading and writing current values
//! - `metadata/<plugin>` for hard deletes and listing

use crate::store::{merge_entry, require_plugin, SecretStore, StoreEntry};
use async_trait::async_trait;
use freeds_core::config::VaultSettings;
use freeds_core::{Error, Result};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

const TOKEN_HEADER: &str = "X-Vault-Token";

#[derive(Debug, Clone)]
pub struct VaultStoreConfig {
    pub address: String,
    pub mount: String,
    pub token: Option<String>,
    pub timeout: Duration,
}

impl VaultStoreConfig {
    pub fn new(address: impl Into<String>) -> Self {
        let defaults = VaultSettings::default();
        let timeout = defaults.timeout();
        Self {
            address: address.into(),
            mount: defaults.mount,
            token: None,
            timeout,
        }
    }

    pub fn from_settings(settings: &VaultSettings) -> Self {
        Self {
            address: settings.uri.clone(),
            mount: settings.mount.clone(),
            token: settings.token.clone(),
            timeout: settings.timeout(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// URL layout of the KV v2 mount
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    v1: String,
    mount: String,
}

impl VaultPaths {
    pub fn new(address: &str, mount: &str) -> Self {
        Self {
            v1: format!("{}/v1", address.trim_end_matches('/')),
            mount: mount.trim_matches('/').to_string(),
        }
    }

    /// Current values of a plugin's entry (no trailing slash)
    pub fn data(&self, plugin: &str) -> String {
        format!("{}/{}/data/{}", self.v1, self.mount, plugin)
    }

    /// Version metadata of a plugin's entry (no trailing slash)
    pub fn metadata(&self, plugin: &str) -> String {
        format!("{}/{}/metadata/{}", self.v1, self.mount, plugin)
    }

    /// Listing of every entry in the mount
    pub fn list(&self) -> String {
        format!("{}/{}/metadata?list=true", self.v1, self.mount)
    }

    pub fn health(&self) -> String {
        format!("{}/sys/health", self.v1)
    }
}

pub struct VaultStore {
    config: VaultStoreConfig,
    paths: VaultPaths,
    client: reqwest::Client,
}

impl VaultStore {
    pub fn new(config: VaultStoreConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::configuration(format!("Failed to build HTTP client: {}", e)))?;
        let paths = VaultPaths::new(&config.address, &config.mount);

        Ok(Self {
            config,
            paths,
            client,
        })
    }

    pub fn from_settings(settings: &VaultSettings) -> Result<Self> {
        Self::new(VaultStoreConfig::from_settings(settings))
    }

    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    pub fn is_configured(&self) -> bool {
        !self.config.address.is_empty()
    }

    /// Check whether the store answers its health endpoint
    pub async fn check_health(&self) -> Result<bool> {
        let response = self.send(self.client.get(self.paths.health())).await?;
        Ok(response.status().is_success())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match &self.config.token {
            Some(token) => request.header(TOKEN_HEADER, token),
            None => request,
        };
        request.send().await.map_err(transport_error)
    }

    async fn body_text(response: Response) -> Result<String> {
        response.text().await.map_err(transport_error)
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::store_unavailable(format!("request timed out: {}", err))
    } else {
        Error::store_unavailable(err.to_string())
    }
}

#[async_trait]
impl SecretStore for VaultStore {
    async fn read(&self, plugin: &str) -> Result<StoreEntry> {
        require_plugin(plugin)?;
        let response = self.send(self.client.get(self.paths.data(plugin))).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!("No store entry for plugin: {}", plugin);
            return Ok(StoreEntry::new());
        }

        let body = Self::body_text(response).await?;
        if !status.is_success() {
            return Err(Error::store_read(plugin, status.as_u16(), body));
        }

        let document: Value = serde_json::from_str(&body)?;
        let entry = document
            .get("data")
            .and_then(|d| d.get("data"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        debug!("Read store entry for plugin: {}", plugin);
        Ok(entry)
    }

    async fn write(&self, plugin: &str, data: StoreEntry) -> Result<()> {
        require_plugin(plugin)?;
        let existing = self.read(plugin).await.map_err(|err| match err {
            Error::StoreRead {
                plugin,
                status,
                body,
            } => Error::store_write(plugin, status, body),
            other => other,
        })?;
        let merged = merge_entry(existing, data);

        let request = self
            .client
            .post(self.paths.data(plugin))
            .json(&json!({ "data": merged }));
        let response = self.send(request).await?;
        let status = response.status();

        if !status.is_success() {
            let body = Self::body_text(response).await?;
            return Err(Error::store_write(plugin, status.as_u16(), body));
        }

        debug!("Wrote store entry for plugin: {}", plugin);
        Ok(())
    }

    async fn delete(&self, plugin: &str) -> Result<()> {
        require_plugin(plugin)?;
        let response = self
            .send(self.client.delete(self.paths.metadata(plugin)))
            .await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            warn!("Nothing to delete for plugin: {}", plugin);
            return Ok(());
        }
        if !status.is_success() {
            let body = Self::body_text(response).await?;
            return Err(Error::store_write(plugin, status.as_u16(), body));
        }

        debug!("Deleted store entry for plugin: {}", plugin);
        Ok(())
    }

    async fn list_plugins(&self) -> Result<Vec<String>> {
        let response = self.send(self.client.get(self.paths.list())).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let body = Self::body_text(response).await?;
        if !status.is_success() {
            return Err(Error::store_read(&self.config.mount, status.as_u16(), body));
        }

        let document: Value = serde_json::from_str(&body)?;
        let mut names: Vec<String> = document
            .get("data")
            .and_then(|d| d.get("keys"))
            .and_then(Value::as_array)
            .map(|keys| {
                keys.iter()
                    .filter_map(Value::as_str)
                    .filter(|key| !key.ends_with('/'))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        names.sort();

        Ok(names)
    }

    fn name(&self) -> &'static str {
        "vault"
    }
}
