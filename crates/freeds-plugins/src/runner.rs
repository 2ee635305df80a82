//! Process-execution collaborator
//!
//! The only place the exported environment reaches a child process. Runners
//! receive the [`PluginEnvironment`], never the manifest.

use async_trait::async_trait;
use freeds_core::{Error, PluginEnvironment, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::manifest::COMPOSE_FILE_NAME;

/// Starts and stops a plugin's services
#[async_trait]
pub trait ServiceRunner: Send + Sync {
    async fn start(&self, env: &PluginEnvironment, plugin_dir: &Path) -> Result<()>;

    async fn stop(&self, env: &PluginEnvironment, plugin_dir: &Path) -> Result<()>;
}

/// Runs a plugin's docker-compose.yaml with `docker compose`
#[derive(Debug, Clone, Default)]
pub struct ComposeRunner {
    docker: Option<PathBuf>,
}

impl ComposeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an explicit docker binary instead of searching PATH
    pub fn with_docker(mut self, docker: impl Into<PathBuf>) -> Self {
        self.docker = Some(docker.into());
        self
    }

    fn docker(&self) -> Result<PathBuf> {
        if let Some(docker) = &self.docker {
            return Ok(docker.clone());
        }
        which::which("docker")
            .map_err(|e| Error::configuration(format!("docker not found on PATH: {}", e)))
    }

    async fn docker_compose(
        &self,
        args: &[&str],
        env: &PluginEnvironment,
        plugin_dir: &Path,
    ) -> Result<()> {
        let compose_file = plugin_dir.join(COMPOSE_FILE_NAME);
        if !compose_file.is_file() {
            return Err(Error::not_found(format!(
                "{} in {}",
                COMPOSE_FILE_NAME,
                plugin_dir.display()
            )));
        }

        let mut cmd = Command::new(self.docker()?);
        cmd.arg("compose")
            .arg("-f")
            .arg(&compose_file)
            .args(args)
            .current_dir(plugin_dir)
            .envs(env.iter())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let rendered = format!(
            "docker compose -f {} {}",
            compose_file.display(),
            args.join(" ")
        );
        debug!("Running: {} ({} exported variables)", rendered, env.len());
        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Docker compose command failed: {}", stderr);
            return Err(Error::command_failed(rendered, stderr.trim()));
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceRunner for ComposeRunner {
    async fn start(&self, env: &PluginEnvironment, plugin_dir: &Path) -> Result<()> {
        self.docker_compose(&["up", "-d"], env, plugin_dir).await?;
        info!("Started services in {}", plugin_dir.display());
        Ok(())
    }

    async fn stop(&self, env: &PluginEnvironment, plugin_dir: &Path) -> Result<()> {
        self.docker_compose(&["down"], env, plugin_dir).await?;
        info!("Stopped services in {}", plugin_dir.display());
        Ok(())
    }
}
