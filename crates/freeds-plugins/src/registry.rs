//! Resource type registry
//!
//! A fixed table from lower-cased type names to [`ResourceKind`], built once
//! from [`ResourceKind::ALL`].

use freeds_core::{Error, Result};
use std::collections::BTreeMap;

use crate::resource::ResourceKind;

#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    kinds: BTreeMap<String, ResourceKind>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        let kinds = ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind.type_name().to_ascii_lowercase(), kind))
            .collect();
        Self { kinds }
    }

    /// Resolve a declared type name for a plugin
    pub fn resolve(&self, plugin: &str, type_name: &str) -> Result<ResourceKind> {
        self.kinds
            .get(&type_name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| Error::unknown_resource_type(plugin, type_name))
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.kinds.contains_key(&type_name.to_ascii_lowercase())
    }

    /// Registered type names, lower-cased
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.kinds.keys().map(String::as_str)
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
