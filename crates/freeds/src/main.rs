//! FreeDS CLI - plugin import, provisioning and lifecycle
//!
//! This is the main entry point for the freeds command-line interface.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Import(args) => commands::import::run(args).await,
        Commands::Scan(args) => commands::plugin::scan(args),
        Commands::Order(args) => commands::plugin::order(args),
        Commands::List(args) => commands::plugin::list(args).await,
        Commands::Env(args) => commands::plugin::env(args).await,
        Commands::Show(args) => commands::plugin::show(args).await,
        Commands::Start(args) => commands::plugin::start(args).await,
        Commands::Stop(args) => commands::plugin::stop(args).await,
        Commands::Remove(args) => commands::plugin::remove(args).await,
        Commands::Config(cmd) => commands::config::run(cmd).await,
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
