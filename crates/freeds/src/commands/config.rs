//! Configuration commands

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Args, Subcommand};
use freeds_core::FreedsConfig;
use freeds_store::VaultStore;

use crate::output;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration
    Show(ShowArgs),

    /// Set the FreeDS root directory
    SetRoot(SetRootArgs),

    /// Set the vault address
    SetVaultUri(SetVaultUriArgs),

    /// Check that the vault answers
    TestVault,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct SetRootArgs {
    /// Root directory holding plugins/ and data/
    pub path: Utf8PathBuf,
}

#[derive(Args, Debug)]
pub struct SetVaultUriArgs {
    /// Vault address, e.g. http://127.0.0.1:8200
    pub uri: String,
}

pub async fn run(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => show(args),
        ConfigCommands::SetRoot(args) => set_root(args),
        ConfigCommands::SetVaultUri(args) => set_vault_uri(args),
        ConfigCommands::TestVault => test_vault().await,
    }
}

fn load() -> Result<FreedsConfig> {
    FreedsConfig::load().context("Failed to load FreeDS configuration")
}

fn show(args: ShowArgs) -> Result<()> {
    let config = load()?;
    let token = if config.vault.token.is_some() { "set" } else { "not set" };

    if args.json {
        let value = serde_json::json!({
            "root": config.root,
            "plugins": config.plugins_path(),
            "data": config.data_path(),
            "assets": config.assets_path(),
            "vault_uri": config.vault.uri,
            "vault_mount": config.vault.mount,
            "vault_timeout_secs": config.vault.timeout_secs,
            "vault_token": token,
            "ports": config.ports,
            "env_prefix": config.env_prefix,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    output::header("FreeDS configuration");
    output::kv("Config file", config.config_file().as_str());
    output::kv("Root", config.root.as_str());
    output::kv("Plugins", config.plugins_path().as_str());
    output::kv("Data", config.data_path().as_str());
    output::kv("Assets", config.assets_path().as_str());
    output::kv("Vault", &config.vault.uri);
    output::kv("Vault mount", &config.vault.mount);
    output::kv("Vault token", token);
    output::kv(
        "Ports",
        &format!("{}-{}", config.ports.start, config.ports.end),
    );
    output::kv("Env prefix", &config.env_prefix);
    Ok(())
}

fn set_root(args: SetRootArgs) -> Result<()> {
    let mut config = load()?;
    config.root = args.path;
    config.save().context("Failed to save configuration")?;
    output::success(&format!("Root set to {}", config.root));
    Ok(())
}

fn set_vault_uri(args: SetVaultUriArgs) -> Result<()> {
    let mut config = load()?;
    config.vault.uri = args.uri;
    config.save().context("Failed to save configuration")?;
    output::success(&format!("Vault address set to {}", config.vault.uri));
    Ok(())
}

async fn test_vault() -> Result<()> {
    let config = load()?;
    output::header("Testing Vault Connection");
    output::kv("Address", &config.vault.uri);

    let store = VaultStore::from_settings(&config.vault).context("Failed to create vault client")?;
    let spinner = output::spinner("Connecting to Vault...");
    let healthy = store.check_health().await;
    spinner.finish_and_clear();

    if healthy.context("Vault is unreachable")? {
        output::success("Vault connection successful");
        Ok(())
    } else {
        anyhow::bail!("Vault answered but reports itself unhealthy")
    }
}
