//! Secret store client for FreeDS
//!
//! Every plugin manifest is persisted as exactly one entry in a KV v2
//! secret store (Vault / OpenBao), addressed by plugin name:
//! - **Absence is empty**: reading a missing entry yields an empty map
//! - **Merge on write**: top-level keys not present in a write are preserved
//! - **Hard delete**: deletes go through the metadata path (all versions)
//! - **Bounded requests**: every call has a timeout and fails fast

pub mod memory;
pub mod store;
pub mod vault;

pub use memory::MemoryStore;
pub use store::{merge_entry, SecretStore, StoreEntry};
pub use vault::{VaultPaths, VaultStore, VaultStoreConfig};
