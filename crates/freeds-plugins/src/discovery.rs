//! Plugin discovery on disk

use freeds_core::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::manifest::{PluginManifest, MANIFEST_FILE_NAME};

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
}

/// Every directory under `root` holding a plugin.yaml, sorted
pub fn discover_plugins(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::not_found(format!(
            "plugin directory {}",
            root.display()
        )));
    }

    let mut dirs = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable path during discovery: {}", e);
                continue;
            }
        };
        if entry.file_type().is_dir() && entry.path().join(MANIFEST_FILE_NAME).is_file() {
            debug!("Discovered plugin at {}", entry.path().display());
            dirs.push(entry.into_path());
        }
    }

    dirs.sort();
    Ok(dirs)
}

/// Discover and load every plugin under `root` (file form, no store lookup)
pub fn scan(root: &Path) -> Result<Vec<PluginManifest>> {
    discover_plugins(root)?
        .iter()
        .map(|dir| PluginManifest::from_dir(dir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_plugin(root: &Path, rel: &str) {
        let dir = root.join(rel);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MANIFEST_FILE_NAME), "plugin:\n  config: {}\n").unwrap();
    }

    #[test]
    fn test_discovers_nested_plugins_sorted() {
        let temp = TempDir::new().unwrap();
        write_plugin(temp.path(), "spark");
        write_plugin(temp.path(), "group/airflow");
        write_plugin(temp.path(), ".hidden/secret");
        std::fs::create_dir_all(temp.path().join("not-a-plugin")).unwrap();

        let found = discover_plugins(temp.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(temp.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![PathBuf::from("group/airflow"), PathBuf::from("spark")]
        );
    }

    #[test]
    fn test_scan_loads_manifests() {
        let temp = TempDir::new().unwrap();
        write_plugin(temp.path(), "kafka");
        let manifests = scan(temp.path()).unwrap();
        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].name(), "kafka");
    }

    #[test]
    fn test_missing_root_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = discover_plugins(&temp.path().join("absent")).unwrap_err();
        assert!(err.is_not_found());
    }
}
