//! Free-port allocation
//!
//! Claims are the `number`/`known_port` params of `Ui` and `KnownPort`
//! resources across every stored plugin. Allocation reads all claims first
//! and is not safe under concurrent provisioning.

use freeds_core::config::PortRange;
use freeds_core::types::ResourceSpec;
use freeds_core::{Error, Result};
use freeds_store::SecretStore;
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::resource::ResourceKind;

const PORT_PARAMS: [&str; 2] = ["number", "known_port"];

/// Parse a port param given as an integer or a numeric string
pub fn port_param(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Ports reserved by a resource section; unparseable values are skipped
pub fn ports_claimed_by(resources: &IndexMap<String, ResourceSpec>) -> BTreeSet<u16> {
    resources
        .values()
        .filter(|spec| {
            ResourceKind::from_type_name(&spec.kind).is_some_and(ResourceKind::claims_port)
        })
        .flat_map(|spec| PORT_PARAMS.iter().filter_map(move |key| spec.params.get(*key)))
        .filter_map(port_param)
        .collect()
}

/// Allocates ports against the claims recorded in the secret store
#[derive(Clone)]
pub struct PortAllocator {
    store: Arc<dyn SecretStore>,
    range: PortRange,
}

impl PortAllocator {
    pub fn new(store: Arc<dyn SecretStore>, range: PortRange) -> Self {
        Self { store, range }
    }

    pub fn range(&self) -> PortRange {
        self.range
    }

    /// Every port claimed by a stored plugin
    pub async fn claimed(&self) -> Result<BTreeSet<u16>> {
        stored_claims(self.store.as_ref(), None).await
    }

    /// First port in range not claimed by another stored plugin nor in `extra`
    ///
    /// The stored entry of `plugin` itself is skipped; its live claims come in
    /// through `extra`, so re-importing a plugin can reuse its previous port.
    pub async fn get_free_port_number(&self, plugin: &str, extra: &BTreeSet<u16>) -> Result<u16> {
        let mut claimed = stored_claims(self.store.as_ref(), Some(plugin)).await?;
        claimed.extend(extra);
        let port = first_free(self.range, &claimed)?;
        debug!("Allocated port {}", port);
        Ok(port)
    }
}

/// First free port in `range` given the claims of every stored plugin
pub async fn get_free_port_number(store: &dyn SecretStore, range: PortRange) -> Result<u16> {
    let claimed = stored_claims(store, None).await?;
    first_free(range, &claimed)
}

async fn stored_claims(store: &dyn SecretStore, skip: Option<&str>) -> Result<BTreeSet<u16>> {
    let mut claimed = BTreeSet::new();
    for plugin in store.list_plugins().await? {
        if skip == Some(plugin.as_str()) {
            continue;
        }
        let entry = store.read(&plugin).await?;
        let Some(resources) = entry.get("resources") else {
            continue;
        };
        match serde_json::from_value::<IndexMap<String, ResourceSpec>>(resources.clone()) {
            Ok(resources) => claimed.extend(ports_claimed_by(&resources)),
            Err(e) => warn!("Skipping port claims of plugin {}: {}", plugin, e),
        }
    }
    Ok(claimed)
}

fn first_free(range: PortRange, claimed: &BTreeSet<u16>) -> Result<u16> {
    range
        .iter()
        .find(|port| !claimed.contains(port))
        .ok_or_else(|| {
            Error::resource_exhausted(format!(
                "no free port in range {}-{}",
                range.start, range.end
            ))
        })
}
