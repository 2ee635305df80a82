//! Plugin management for FreeDS
//!
//! This crate handles:
//! - Plugin manifest loading (plugin.yaml or secret store)
//! - Resource type registry and provisioning
//! - Free UI port allocation
//! - Dependency expansion and deploy ordering
//! - Plugin discovery on disk
//! - Import workflow and service start/stop

pub mod dependency;
pub mod discovery;
pub mod import;
pub mod manifest;
pub mod ports;
pub mod provision;
pub mod registry;
pub mod resource;
pub mod runner;

pub use dependency::{resolve_order, sort_manifests, DependencyResolver, SECRET_STORE_PLUGIN};
pub use discovery::{discover_plugins, scan};
pub use import::Importer;
pub use manifest::{ManifestSource, PluginManifest};
pub use ports::{get_free_port_number, PortAllocator};
pub use provision::{expand_dependencies, Provisioner};
pub use registry::ResourceRegistry;
pub use resource::{ProvisionContext, Resource, ResourceKind};
pub use runner::{ComposeRunner, ServiceRunner};
