//! CLI command definitions.
//!
//! This module defines the command structure for the mITyFactory CLI.
//! Each subcommand maps to a wizard workflow.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mity_wizard::{CheckpointBackend, CheckpointStore, ClientConfig, FileCheckpointStore, HttpApi};

pub mod chat;
pub mod checkpoint;
pub mod new;
pub mod resume;
pub mod wizard;

/// mITyFactory - project wizard and spec chat
#[derive(Parser)]
#[command(name = "mity")]
#[command(version, about = "mITyFactory - project wizard and spec chat")]
#[command(long_about = r#"
Create or register mITyFactory projects and write their initial spec together
with the factory agent.

WORKFLOWS:
  new         → Start the project wizard
  resume      → Continue an interrupted wizard from its checkpoint
  checkpoint  → Inspect or remove a stored wizard checkpoint

CONFIGURATION:
  .mity/wizard.toml, then MITY_SERVER_URL / MITY_KEEPALIVE_SECS / MITY_YOLO /
  MITY_CHECKPOINTS, then command-line flags.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - Connection error
  5 - Aborted (progress kept in the checkpoint)
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Workspace root holding the .mity directory
    #[arg(short, long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Factory server URL
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Seconds between keepalive pings (0 disables)
    #[arg(long, global = true)]
    pub keepalive: Option<u64>,

    /// Start the agent without interactive approvals
    #[arg(long, global = true)]
    pub yolo: bool,

    /// Keep checkpoints in local files instead of on the server
    #[arg(long, global = true)]
    pub local_checkpoints: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the project wizard
    New(new::NewArgs),

    /// Resume an interrupted wizard
    Resume(resume::ResumeArgs),

    /// Inspect or clear a wizard checkpoint
    Checkpoint(checkpoint::CheckpointArgs),
}

impl Cli {
    /// Resolve configuration: file, environment, then flags.
    pub fn config(&self) -> Result<ClientConfig> {
        self.config_with_env(|key| std::env::var(key).ok())
    }

    fn config_with_env<F>(&self, lookup: F) -> Result<ClientConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let workspace = match &self.workspace {
            Some(path) => path.clone(),
            None => std::env::current_dir()?,
        };

        let mut config = ClientConfig::from_file(&workspace).context("Failed to load configuration")?;
        config
            .apply_env(lookup)
            .context("Invalid MITY_* environment override")?;

        if let Some(server) = &self.server {
            config.server_url = server.clone();
        }
        if let Some(secs) = self.keepalive {
            config.keepalive_secs = secs;
        }
        if self.yolo {
            config.yolo_mode = true;
        }
        if self.local_checkpoints {
            config.checkpoint_backend = CheckpointBackend::File;
        }
        Ok(config)
    }
}

/// Checkpoint backend selected by the configuration.
pub fn checkpoint_store(config: &ClientConfig) -> Arc<dyn CheckpointStore> {
    match config.checkpoint_backend {
        CheckpointBackend::Server => Arc::new(HttpApi::new(&config.server_url)),
        CheckpointBackend::File => Arc::new(FileCheckpointStore::new(&config.workspace_root)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mity_wizard::WizardStatus;
    use tempfile::TempDir;

    fn workspace_with_config(content: &str) -> TempDir {
        let temp = TempDir::new().unwrap();
        let path = ClientConfig::config_path(temp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
        temp
    }

    fn parse(temp: &TempDir, extra: &[&str]) -> Cli {
        let workspace = temp.path().to_string_lossy().to_string();
        let mut args = vec!["mity", "--workspace", workspace.as_str()];
        args.extend_from_slice(extra);
        args.push("new");
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_flags_override_env_and_file() {
        let temp = workspace_with_config(
            "server_url = \"http://file:1\"\nkeepalive_secs = 10\ncheckpoint_backend = \"server\"\n",
        );

        let cli = parse(&temp, &[]);
        let config = cli.config_with_env(|_| None).unwrap();
        assert_eq!(config.server_url, "http://file:1");
        assert_eq!(config.keepalive_secs, 10);
        assert_eq!(config.workspace_root, temp.path());

        let env = |key: &str| match key {
            "MITY_SERVER_URL" => Some("http://env:2".to_string()),
            "MITY_KEEPALIVE_SECS" => Some("20".to_string()),
            _ => None,
        };
        let config = cli.config_with_env(env).unwrap();
        assert_eq!(config.server_url, "http://env:2");
        assert_eq!(config.keepalive_secs, 20);
        assert!(!config.yolo_mode);

        let cli = parse(
            &temp,
            &["--server", "http://flag:3", "--keepalive", "0", "--yolo", "--local-checkpoints"],
        );
        let config = cli.config_with_env(env).unwrap();
        assert_eq!(config.server_url, "http://flag:3");
        assert_eq!(config.keepalive_secs, 0);
        assert!(config.yolo_mode);
        assert_eq!(config.checkpoint_backend, CheckpointBackend::File);
    }

    #[test]
    fn test_bad_env_override_is_an_error() {
        let temp = TempDir::new().unwrap();
        let cli = parse(&temp, &[]);
        let env = |key: &str| (key == "MITY_CHECKPOINTS").then(|| "cloud".to_string());
        assert!(cli.config_with_env(env).is_err());
    }

    #[tokio::test]
    async fn test_file_backend_writes_under_workspace() {
        let temp = TempDir::new().unwrap();
        let config = parse(&temp, &["--local-checkpoints"])
            .config_with_env(|_| None)
            .unwrap();
        let store = checkpoint_store(&config);

        let status: WizardStatus = serde_json::from_str(r#"{"step":"method"}"#).unwrap();
        store.save("demo-app", &status).await.unwrap();

        assert!(temp.path().join(".mity/wizard/demo-app.json").exists());
        assert!(store.load("demo-app").await.unwrap().is_some());
    }
}
