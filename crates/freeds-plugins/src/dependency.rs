//! Deploy ordering using Kahn's topological sort
//!
//! Dependencies deploy before their dependents; ties break by plugin name.
//! The secret-store plugin is always first.

use freeds_core::{Error, Result};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::manifest::PluginManifest;

/// The plugin hosting the secret store; deployed before anything else
pub const SECRET_STORE_PLUGIN: &str = "vault";

/// Dependency resolver over a set of plugins
pub struct DependencyResolver {
    dependencies: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyResolver {
    /// Create a resolver from loaded manifests
    pub fn new(manifests: &[PluginManifest]) -> Self {
        Self::from_edges(manifests.iter().map(|m| {
            (
                m.name().to_string(),
                m.dependency_names().map(str::to_string).collect::<Vec<_>>(),
            )
        }))
    }

    /// Create a resolver from `(plugin, dependencies)` pairs
    pub fn from_edges<I, D>(edges: I) -> Self
    where
        I: IntoIterator<Item = (String, D)>,
        D: IntoIterator<Item = String>,
    {
        let mut dependencies: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (plugin, deps) in edges {
            dependencies.entry(plugin).or_default().extend(deps);
        }
        Self { dependencies }
    }

    /// Resolve the deploy order of every plugin
    pub fn resolve_order(&self) -> Result<Vec<String>> {
        let graph = self.build_graph();

        let mut order = Vec::with_capacity(self.dependencies.len());
        if self.dependencies.contains_key(SECRET_STORE_PLUGIN) {
            order.push(SECRET_STORE_PLUGIN.to_string());
        }

        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        for (plugin, deps) in &graph {
            in_degree.insert(*plugin, deps.len());
        }

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(plugin, _)| *plugin)
            .collect();

        while let Some(plugin) = ready.pop_first() {
            order.push(plugin.to_string());
            for (dependent, deps) in &graph {
                if !deps.contains(&plugin) {
                    continue;
                }
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }

        if order.len() < self.dependencies.len() {
            return Err(Error::cyclic_dependency(cycle_members(&graph, &order)));
        }

        debug!("Resolved deploy order: {:?}", order);
        Ok(order)
    }

    /// Dependencies of `plugin` that are not in `installed`
    pub fn missing_dependencies(&self, plugin: &str, installed: &BTreeSet<String>) -> Vec<String> {
        self.dependencies
            .get(plugin)
            .map(|deps| {
                deps.iter()
                    .filter(|d| !installed.contains(*d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Known-plugin edges, without the secret-store plugin
    fn build_graph(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        let mut graph = BTreeMap::new();
        for (plugin, deps) in &self.dependencies {
            if plugin == SECRET_STORE_PLUGIN {
                continue;
            }
            let mut known = BTreeSet::new();
            for dep in deps {
                if dep == SECRET_STORE_PLUGIN {
                    continue;
                }
                if self.dependencies.contains_key(dep) {
                    known.insert(dep.as_str());
                } else {
                    warn!(
                        "Plugin {} depends on unknown plugin {}, ignoring for ordering",
                        plugin, dep
                    );
                }
            }
            graph.insert(plugin.as_str(), known);
        }
        graph
    }
}

/// Members of strongly connected components of size > 1, plus self-loops
fn cycle_members(graph: &BTreeMap<&str, BTreeSet<&str>>, ordered: &[String]) -> Vec<String> {
    let mut remaining: DiGraphMap<&str, ()> = DiGraphMap::new();
    for (plugin, deps) in graph {
        if ordered.iter().any(|o| o == plugin) {
            continue;
        }
        remaining.add_node(*plugin);
        for dep in deps {
            if !ordered.iter().any(|o| o == dep) {
                remaining.add_edge(*dep, *plugin, ());
            }
        }
    }

    tarjan_scc(&remaining)
        .into_iter()
        .filter(|scc| scc.len() > 1 || remaining.contains_edge(scc[0], scc[0]))
        .flatten()
        .map(str::to_string)
        .collect()
}

/// Deploy order of a set of manifests, by name
pub fn resolve_order(manifests: &[PluginManifest]) -> Result<Vec<String>> {
    DependencyResolver::new(manifests).resolve_order()
}

/// Reorder manifests into deploy order
pub fn sort_manifests(manifests: Vec<PluginManifest>) -> Result<Vec<PluginManifest>> {
    let order = resolve_order(&manifests)?;
    let mut by_name: BTreeMap<String, PluginManifest> = BTreeMap::new();
    for manifest in manifests {
        if let Some(previous) = by_name.insert(manifest.name().to_string(), manifest) {
            warn!("Duplicate plugin {}, keeping the last one", previous.name());
        }
    }
    Ok(order
        .into_iter()
        .filter_map(|name| by_name.remove(&name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_resolver(plugins: Vec<(&str, Vec<&str>)>) -> DependencyResolver {
        DependencyResolver::from_edges(plugins.into_iter().map(|(name, deps)| {
            (
                name.to_string(),
                deps.into_iter().map(str::to_string).collect::<Vec<_>>(),
            )
        }))
    }

    #[test]
    fn test_simple_dependency_chain() {
        // c -> b -> a
        let resolver = create_test_resolver(vec![("c", vec!["b"]), ("b", vec!["a"]), ("a", vec![])]);
        assert_eq!(resolver.resolve_order().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_vault_is_forced_first() {
        let resolver = create_test_resolver(vec![
            ("a", vec![]),
            ("vault", vec!["a"]),
            ("b", vec!["vault"]),
        ]);
        assert_eq!(resolver.resolve_order().unwrap(), vec!["vault", "a", "b"]);
    }

    #[test]
    fn test_diamond_dependency() {
        let resolver = create_test_resolver(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["a"]),
            ("d", vec!["b", "c"]),
        ]);
        assert_eq!(resolver.resolve_order().unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_ties_break_by_name() {
        let resolver = create_test_resolver(vec![("zeta", vec![]), ("alpha", vec![]), ("mid", vec![])]);
        assert_eq!(
            resolver.resolve_order().unwrap(),
            vec!["alpha", "mid", "zeta"]
        );
    }

    #[test]
    fn test_cycle_reports_only_members() {
        let resolver = create_test_resolver(vec![
            ("a", vec!["b"]),
            ("b", vec!["a"]),
            ("c", vec!["a"]),
            ("d", vec![]),
        ]);
        match resolver.resolve_order().unwrap_err() {
            Error::CyclicDependency { plugins } => assert_eq!(plugins, vec!["a", "b"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let resolver = create_test_resolver(vec![("a", vec!["a"])]);
        match resolver.resolve_order().unwrap_err() {
            Error::CyclicDependency { plugins } => assert_eq!(plugins, vec!["a"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_dependencies() {
        let resolver = create_test_resolver(vec![("a", vec![]), ("b", vec!["a"])]);

        let mut installed = BTreeSet::new();
        assert_eq!(resolver.missing_dependencies("b", &installed), vec!["a"]);

        installed.insert("a".to_string());
        assert!(resolver.missing_dependencies("b", &installed).is_empty());
    }

    #[test]
    fn test_no_dependencies() {
        let resolver = create_test_resolver(vec![("a", vec![])]);
        assert_eq!(resolver.resolve_order().unwrap(), vec!["a"]);
    }
}
