//! Error types for freeds-core

use thiserror::Error;

/// Result type alias using freeds-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for FreeDS
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed invocation, e.g. conflicting load-source arguments
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Missing manifest file or missing store entry
    #[error("Not found: {what}")]
    NotFound { what: String },

    /// Manifest present but structurally invalid
    #[error("Invalid manifest {source_name}: {message}")]
    Validation {
        source_name: String,
        message: String,
    },

    /// Resource type name not present in the registry
    #[error("Unknown resource type: {resource_type} found in plugin {plugin}")]
    UnknownResourceType {
        plugin: String,
        resource_type: String,
    },

    /// Candidate range exhausted (ports)
    #[error("Resource exhausted: {message}")]
    ResourceExhausted { message: String },

    /// Cycle in the plugin dependency graph
    #[error("Circular dependency detected between plugins: {}", plugins.join(", "))]
    CyclicDependency { plugins: Vec<String> },

    /// Secret store rejected a read
    #[error("Secret store read failed for '{plugin}': HTTP {status}: {body}")]
    StoreRead {
        plugin: String,
        status: u16,
        body: String,
    },

    /// Secret store rejected a write or delete
    #[error("Secret store write failed for '{plugin}': HTTP {status}: {body}")]
    StoreWrite {
        plugin: String,
        status: u16,
        body: String,
    },

    /// Secret store unreachable or timed out
    #[error("Secret store unavailable: {message}")]
    StoreUnavailable { message: String },

    /// External command (docker compose, ...) exited unsuccessfully
    #[error("Command failed: {command}: {stderr}")]
    CommandFailed { command: String, stderr: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a validation error for a named manifest source
    pub fn validation(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create an unknown resource type error
    pub fn unknown_resource_type(
        plugin: impl Into<String>,
        resource_type: impl Into<String>,
    ) -> Self {
        Self::UnknownResourceType {
            plugin: plugin.into(),
            resource_type: resource_type.into(),
        }
    }

    /// Create a resource exhausted error
    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            message: message.into(),
        }
    }

    /// Create a cyclic dependency error; plugin names are reported sorted
    pub fn cyclic_dependency(mut plugins: Vec<String>) -> Self {
        plugins.sort();
        plugins.dedup();
        Self::CyclicDependency { plugins }
    }

    /// Create a store read error
    pub fn store_read(plugin: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::StoreRead {
            plugin: plugin.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a store write error
    pub fn store_write(plugin: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::StoreWrite {
            plugin: plugin.into(),
            status,
            body: body.into(),
        }
    }

    /// Create a store unavailable error
    pub fn store_unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            stderr: stderr.into(),
        }
    }

    /// True for the "absence" outcome, which callers use to decide whether to bootstrap
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
