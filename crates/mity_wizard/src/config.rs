//! Client configuration.
//!
//! Resolved in layers: defaults, then `<workspace>/.mity/wizard.toml`, then
//! `MITY_*` environment variables. Command-line flags are applied last by the
//! binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{WizardError, WizardResult};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8888";
pub const DEFAULT_KEEPALIVE_SECS: u64 = 30;

/// Where wizard checkpoints are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointBackend {
    /// Factory server wizard-status resource
    #[default]
    Server,
    /// JSON files under `.mity/wizard/`
    File,
}

impl CheckpointBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "server" => Some(Self::Server),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    /// Seconds between keepalive pings; 0 disables them.
    pub keepalive_secs: u64,
    pub yolo_mode: bool,
    pub checkpoint_backend: CheckpointBackend,
    #[serde(skip)]
    pub workspace_root: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            keepalive_secs: DEFAULT_KEEPALIVE_SECS,
            yolo_mode: false,
            checkpoint_backend: CheckpointBackend::Server,
            workspace_root: PathBuf::from("."),
        }
    }
}

impl ClientConfig {
    /// Path of the optional config file for a workspace.
    pub fn config_path(workspace_root: &Path) -> PathBuf {
        workspace_root.join(".mity").join("wizard.toml")
    }

    /// Load the file layer and the process environment.
    pub fn load(workspace_root: impl AsRef<Path>) -> WizardResult<Self> {
        let mut config = Self::from_file(workspace_root.as_ref())?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Defaults overlaid with the workspace config file, if present.
    pub fn from_file(workspace_root: &Path) -> WizardResult<Self> {
        let path = Self::config_path(workspace_root);
        let mut config = if path.exists() {
            debug!(path = %path.display(), "Loading client config");
            let content = std::fs::read_to_string(&path)?;
            toml::from_str::<Self>(&content)?
        } else {
            Self::default()
        };
        config.workspace_root = workspace_root.to_path_buf();
        Ok(config)
    }

    /// Apply `MITY_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> WizardResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("MITY_SERVER_URL") {
            self.server_url = url;
        }

        if let Some(secs) = lookup("MITY_KEEPALIVE_SECS") {
            self.keepalive_secs = secs.trim().parse().map_err(|_| {
                WizardError::Config(format!("MITY_KEEPALIVE_SECS must be a number, got '{}'", secs))
            })?;
        }

        if let Some(yolo) = lookup("MITY_YOLO") {
            self.yolo_mode = matches!(yolo.to_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }

        if let Some(backend) = lookup("MITY_CHECKPOINTS") {
            self.checkpoint_backend = CheckpointBackend::parse(&backend).ok_or_else(|| {
                WizardError::Config(format!("MITY_CHECKPOINTS must be 'server' or 'file', got '{}'", backend))
            })?;
        }

        Ok(())
    }

    /// Keepalive interval, `None` when disabled.
    pub fn keepalive(&self) -> Option<Duration> {
        (self.keepalive_secs > 0).then(|| Duration::from_secs(self.keepalive_secs))
    }
}
