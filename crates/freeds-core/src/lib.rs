//! # freeds-core
//!
//! Core library for FreeDS providing:
//! - The error taxonomy shared by every crate
//! - Plugin manifest document types (plugin.yaml)
//! - Layered root configuration (~/.freeds/config.yaml + FDS_* overrides)
//! - Environment variable naming and `${VAR}` substitution

pub mod config;
pub mod environment;
pub mod error;
pub mod types;
pub mod utils;

pub use config::FreedsConfig;
pub use environment::{env_var_name, substitute, PluginEnvironment};
pub use error::{Error, Result};
pub use utils::get_home_dir;
