//! Environment variable naming and materialization
//!
//! Every config key of a plugin is exported as `<PREFIX>_<PLUGIN>_<KEY>`.
//! This module only produces values; writing them into a process
//! environment is left to the process-execution adapter.

use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::types::ConfigMap;

/// Default environment variable prefix
pub const DEFAULT_ENV_PREFIX: &str = "FDS";

static TEMPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:(\$)|\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("template regex is valid")
});

/// Build the namespaced variable name for a plugin config key
///
/// Names are upper-cased and anything outside `[A-Z0-9_]` becomes `_`.
pub fn env_var_name(prefix: &str, plugin: &str, key: &str) -> String {
    format!(
        "{}_{}_{}",
        sanitize(prefix),
        sanitize(plugin),
        sanitize(key)
    )
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Coerce a config value to its exported string form
pub fn value_to_env_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// The exported environment view of one or more plugins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginEnvironment {
    prefix: String,
    vars: BTreeMap<String, String>,
}

impl PluginEnvironment {
    /// Create an empty environment for a prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            vars: BTreeMap::new(),
        }
    }

    /// Project a plugin's config map; one variable per key
    pub fn from_config(prefix: &str, plugin: &str, config: &ConfigMap) -> Self {
        let mut env = Self::new(prefix);
        for (key, value) in config {
            env.vars
                .insert(env_var_name(prefix, plugin, key), value_to_env_string(value));
        }
        env
    }

    /// Re-import variables (e.g. from `std::env::vars()`), keeping only prefixed names
    pub fn from_vars<I>(prefix: &str, vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let wanted = format!("{}_", sanitize(prefix));
        let mut env = Self::new(prefix);
        env.vars = vars
            .into_iter()
            .filter(|(name, _)| name.starts_with(&wanted))
            .collect();
        env
    }

    /// Look up a value by plugin name and config key
    pub fn get(&self, plugin: &str, key: &str) -> Option<&str> {
        self.get_var(&env_var_name(&self.prefix, plugin, key))
    }

    /// Look up a value by full variable name
    pub fn get_var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Set a variable by plugin name and config key
    pub fn set(&mut self, plugin: &str, key: &str, value: impl Into<String>) {
        let name = env_var_name(&self.prefix, plugin, key);
        self.vars.insert(name, value.into());
    }

    /// Merge another environment into this one (other wins)
    pub fn extend(&mut self, other: PluginEnvironment) {
        self.vars.extend(other.vars);
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.vars
    }
}

/// Substitute `${VAR}` and `$VAR` references from an environment
///
/// Unknown names are left as written and `$$` yields a literal `$`.
pub fn substitute(template: &str, env: &PluginEnvironment) -> String {
    TEMPLATE_RE
        .replace_all(template, |caps: &Captures<'_>| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }
            let name = caps
                .get(2)
                .or_else(|| caps.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match env.get_var(name) {
                Some(value) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("FDS", "kafka", "broker_url"), "FDS_KAFKA_BROKER_URL");
        assert_eq!(
            env_var_name("FDS", "the-free-data-stack", "ui.port"),
            "FDS_THE_FREE_DATA_STACK_UI_PORT"
        );
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(value_to_env_string(&json!("x")), "x");
        assert_eq!(value_to_env_string(&json!(8080)), "8080");
        assert_eq!(value_to_env_string(&json!(true)), "true");
        assert_eq!(value_to_env_string(&Value::Null), "");
        assert_eq!(value_to_env_string(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_from_config_and_round_trip() {
        let mut config = ConfigMap::new();
        config.insert("broker_url".into(), json!("x"));

        let env = PluginEnvironment::from_config("FDS", "kafka", &config);
        let expected: BTreeMap<String, String> =
            [("FDS_KAFKA_BROKER_URL".to_string(), "x".to_string())].into();
        assert_eq!(env.as_map(), &expected);

        let reimported = PluginEnvironment::from_vars(
            "FDS",
            vec![
                ("FDS_KAFKA_BROKER_URL".to_string(), "x".to_string()),
                ("PATH".to_string(), "/usr/bin".to_string()),
            ],
        );
        assert_eq!(reimported.len(), 1);
        assert_eq!(reimported.get("kafka", "broker_url"), Some("x"));
    }

    #[test]
    fn test_substitute() {
        let mut env = PluginEnvironment::new("FDS");
        env.set("kafka", "ui_port", "8004");

        assert_eq!(
            substitute("http://127.0.0.1:${FDS_KAFKA_UI_PORT}/ui", &env),
            "http://127.0.0.1:8004/ui"
        );
        assert_eq!(substitute("port $FDS_KAFKA_UI_PORT", &env), "port 8004");
        assert_eq!(substitute("cost $$5", &env), "cost $5");
        assert_eq!(substitute("${UNKNOWN} stays", &env), "${UNKNOWN} stays");
        assert_eq!(substitute("no refs", &env), "no refs");
    }
}
