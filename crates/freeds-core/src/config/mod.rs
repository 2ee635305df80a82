//! Root configuration management

mod loader;

pub use loader::{FreedsConfig, PortRange, VaultSettings, CONFIG_FILE_NAME};
