//! Plugin inspection and lifecycle commands

use anyhow::{Context, Result};
use freeds_core::FreedsConfig;
use freeds_plugins::{scan as scan_plugins, sort_manifests, DependencyResolver, PluginManifest};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tabled::{settings::Style, Table, Tabled};

use super::{plugins_dir, Session};
use crate::cli::{ListArgs, PluginArgs, PluginOutputArgs, ScanArgs};
use crate::output;

#[derive(Tabled, serde::Serialize)]
struct DiscoveredRow {
    name: String,
    dependencies: String,
    resources: usize,
    path: String,
}

#[derive(Tabled, serde::Serialize)]
struct StoredRow {
    name: String,
    id: String,
    #[tabled(rename = "imported at")]
    imported_at: String,
    path: String,
}

fn load_disk(args: ScanArgs) -> Result<Vec<PluginManifest>> {
    let config = FreedsConfig::load().context("Failed to load FreeDS configuration")?;
    let root = plugins_dir(&config, args.path);
    scan_plugins(&root).with_context(|| format!("Failed to scan {}", root.display()))
}

pub fn scan(args: ScanArgs) -> Result<()> {
    let manifests = load_disk(args)?;
    if manifests.is_empty() {
        output::info("No plugins found");
        return Ok(());
    }

    let rows: Vec<_> = manifests
        .iter()
        .map(|m| DiscoveredRow {
            name: m.name().to_string(),
            dependencies: m.dependency_names().collect::<Vec<_>>().join(", "),
            resources: m.resources().len(),
            path: m
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::sharp());
    println!("\n{}", table);
    output::info(&format!("{} plugin(s) found", rows.len()));
    Ok(())
}

pub fn order(args: ScanArgs) -> Result<()> {
    let manifests = load_disk(args)?;
    let found: BTreeSet<String> = manifests.iter().map(|m| m.name().to_string()).collect();
    let resolver = DependencyResolver::new(&manifests);
    for manifest in &manifests {
        let missing = resolver.missing_dependencies(manifest.name(), &found);
        if !missing.is_empty() {
            output::warning(&format!(
                "{} depends on {} which was not found",
                manifest.name(),
                missing.join(", ")
            ));
        }
    }

    let sorted = sort_manifests(manifests).context("Failed to resolve deploy order")?;
    output::header("Deploy order");
    for (i, manifest) in sorted.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, manifest.name());
    }
    Ok(())
}

pub async fn list(args: ListArgs) -> Result<()> {
    let session = Session::open()?;
    let importer = session.importer();

    let mut rows = Vec::new();
    for name in session.store.list_plugins().await? {
        let manifest = importer.load(&name).await?;
        let meta_str = |key: &str| {
            manifest
                .meta()
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        rows.push(StoredRow {
            name: name.clone(),
            id: manifest.id().unwrap_or_default().to_string(),
            imported_at: meta_str("imported_at"),
            path: manifest
                .path()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        });
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if rows.is_empty() {
        output::info("No plugins imported");
    } else {
        let mut table = Table::new(&rows);
        table.with(Style::sharp());
        println!("\n{}", table);
    }
    Ok(())
}

pub async fn env(args: PluginOutputArgs) -> Result<()> {
    let session = Session::open()?;
    let env = session
        .importer()
        .environment(&args.plugin)
        .await
        .with_context(|| format!("Failed to load plugin {}", args.plugin))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(env.as_map())?);
    } else {
        for (name, value) in env.iter() {
            println!("{}={}", name, value);
        }
    }
    Ok(())
}

pub async fn show(args: PluginOutputArgs) -> Result<()> {
    let session = Session::open()?;
    let manifest = session
        .importer()
        .load(&args.plugin)
        .await
        .with_context(|| format!("Failed to load plugin {}", args.plugin))?;

    let mut root = BTreeMap::new();
    root.insert("plugin", manifest.document());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&root)?);
    } else {
        print!("{}", serde_yaml_ng::to_string(&root)?);
    }
    Ok(())
}

pub async fn start(args: PluginArgs) -> Result<()> {
    let session = Session::open()?;
    let spinner = output::spinner(&format!("Starting {}...", args.plugin));
    let result = session.importer().start_plugin(&args.plugin).await;
    spinner.finish_and_clear();
    result.with_context(|| format!("Failed to start {}", args.plugin))?;
    output::success(&format!("Started {}", args.plugin));
    Ok(())
}

pub async fn stop(args: PluginArgs) -> Result<()> {
    let session = Session::open()?;
    let spinner = output::spinner(&format!("Stopping {}...", args.plugin));
    let result = session.importer().stop_plugin(&args.plugin).await;
    spinner.finish_and_clear();
    result.with_context(|| format!("Failed to stop {}", args.plugin))?;
    output::success(&format!("Stopped {}", args.plugin));
    Ok(())
}

pub async fn remove(args: PluginArgs) -> Result<()> {
    let session = Session::open()?;
    session
        .store
        .delete(&args.plugin)
        .await
        .with_context(|| format!("Failed to remove {}", args.plugin))?;
    output::success(&format!("Removed {}", args.plugin));
    Ok(())
}
