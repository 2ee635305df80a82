//! Plugin import command

use anyhow::{Context, Result};
use freeds_plugins::discover_plugins;

use super::{plugins_dir, Session};
use crate::cli::ImportArgs;
use crate::output;

pub async fn run(args: ImportArgs) -> Result<()> {
    let session = Session::open()?;

    let dirs = if args.paths.is_empty() {
        let root = plugins_dir(&session.config, None);
        discover_plugins(&root)
            .with_context(|| format!("Failed to discover plugins in {}", root.display()))?
    } else {
        args.paths
    };

    if dirs.is_empty() {
        output::warning("No plugins to import");
        return Ok(());
    }

    let importer = session.importer().with_autostart(!args.no_start);

    let spinner = output::spinner(&format!("Importing {} plugin(s)...", dirs.len()));
    let result = importer.import_all(&dirs).await;
    spinner.finish_and_clear();

    let imported = result.context("Plugin import failed")?;
    for manifest in &imported {
        output::success(&format!("Imported {}", manifest.name()));
    }
    Ok(())
}
