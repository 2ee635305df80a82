//! Mock service runner

use async_trait::async_trait;
use freeds_core::{PluginEnvironment, Result};
use freeds_plugins::ServiceRunner;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Record of a start/stop invocation
#[derive(Clone, Debug, PartialEq)]
pub struct RunnerInvocation {
    pub action: &'static str,
    pub plugin_dir: PathBuf,
    pub env: BTreeMap<String, String>,
}

/// Runner that records invocations instead of running processes
#[derive(Clone, Default)]
pub struct RecordingRunner {
    invocations: Arc<Mutex<Vec<RunnerInvocation>>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invocations(&self) -> Vec<RunnerInvocation> {
        self.invocations.lock().unwrap().clone()
    }

    fn record(&self, action: &'static str, env: &PluginEnvironment, plugin_dir: &Path) {
        self.invocations.lock().unwrap().push(RunnerInvocation {
            action,
            plugin_dir: plugin_dir.to_path_buf(),
            env: env.as_map().clone(),
        });
    }
}

#[async_trait]
impl ServiceRunner for RecordingRunner {
    async fn start(&self, env: &PluginEnvironment, plugin_dir: &Path) -> Result<()> {
        self.record("start", env, plugin_dir);
        Ok(())
    }

    async fn stop(&self, env: &PluginEnvironment, plugin_dir: &Path) -> Result<()> {
        self.record("stop", env, plugin_dir);
        Ok(())
    }
}
