//! Plugin manifest document types matching plugin.yaml
//!
//! ```yaml
//! plugin:
//!   config:
//!     broker_url: kafka:9092
//!   dependencies:
//!     postgres: {}
//!   resources:
//!     admin:
//!       type: AdminAccount
//!       description: Admin login for the web ui
//!   deployments:
//!     dags:
//!       type: AirflowDags
//!       params:
//!         dir: dags
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Flat, insertion-ordered mapping of scalar values (config, meta, params)
pub type ConfigMap = serde_json::Map<String, Value>;

/// Root key of a plugin.yaml document
pub const PLUGIN_ROOT_KEY: &str = "plugin";

/// Config key holding the plugin name
pub const CONFIG_NAME_KEY: &str = "name";

/// Config key holding the plugin's filesystem origin
pub const CONFIG_PATH_KEY: &str = "path";

/// Config key holding the persistent plugin id
pub const CONFIG_ID_KEY: &str = "id";

/// The body of a plugin manifest (everything under the `plugin` root key)
///
/// All five sections are always present; YAML `null` sections read as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginDocument {
    /// Materialized values exported to the plugin as environment variables
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: ConfigMap,

    /// Discovered auxiliary facts; never exported
    #[serde(default, deserialize_with = "null_as_default")]
    pub meta: ConfigMap,

    /// Dependency plugin name -> per-edge overrides (reserved)
    #[serde(default, deserialize_with = "null_as_default")]
    pub dependencies: IndexMap<String, Value>,

    /// Declared resources in declaration order
    #[serde(default, deserialize_with = "null_as_default")]
    pub resources: IndexMap<String, ResourceSpec>,

    /// Declared deployments, passed through untouched
    #[serde(default, deserialize_with = "null_as_default")]
    pub deployments: IndexMap<String, DeploymentSpec>,
}

/// A resource declaration: `{type, description, params}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSpec {
    /// Resource type name, resolved case-insensitively
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub params: ConfigMap,
}

impl ResourceSpec {
    pub fn new(kind: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            description: description.into(),
            params: ConfigMap::new(),
        }
    }

    /// Attach a parameter, builder style
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

/// A deployment declaration (file copies, SQL runs, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub params: ConfigMap,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
