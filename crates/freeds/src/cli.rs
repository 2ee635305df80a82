//! CLI argument parsing with clap

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub use crate::commands::config::ConfigCommands;

/// FreeDS - import, provision and run data stack plugins
#[derive(Parser, Debug)]
#[command(name = "freeds")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import plugins: provision resources, persist, and start services
    Import(ImportArgs),

    /// Discover plugins on disk
    Scan(ScanArgs),

    /// Show the deploy order of plugins on disk
    Order(ScanArgs),

    /// List plugins in the secret store
    List(ListArgs),

    /// Print a plugin's exported environment
    Env(PluginOutputArgs),

    /// Show a stored plugin manifest
    Show(PluginOutputArgs),

    /// Start a plugin's services
    Start(PluginArgs),

    /// Stop a plugin's services
    Stop(PluginArgs),

    /// Remove a plugin from the secret store
    Remove(PluginArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Plugin directories (default: every plugin under <root>/plugins)
    pub paths: Vec<PathBuf>,

    /// Do not start services after import
    #[arg(long)]
    pub no_start: bool,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Directory to scan (default: <root>/plugins)
    pub path: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PluginArgs {
    /// Plugin name
    pub plugin: String,
}

#[derive(Args, Debug)]
pub struct PluginOutputArgs {
    /// Plugin name
    pub plugin: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
