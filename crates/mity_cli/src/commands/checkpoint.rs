//! Checkpoint command - Inspect or clear stored wizard progress.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use super::{checkpoint_store, Cli};

#[derive(Args)]
pub struct CheckpointArgs {
    #[command(subcommand)]
    action: CheckpointAction,
}

#[derive(Subcommand)]
enum CheckpointAction {
    /// Print the stored checkpoint as JSON
    Show {
        /// Project name
        project: String,
    },
    /// Delete the stored checkpoint
    Clear {
        /// Project name
        project: String,
    },
}

pub async fn execute(cli: &Cli, args: &CheckpointArgs) -> Result<()> {
    let config = cli.config()?;
    let store = checkpoint_store(&config);

    match &args.action {
        CheckpointAction::Show { project } => {
            let status = store
                .load(project)
                .await
                .with_context(|| format!("Failed to load checkpoint for {}", project))?;
            match status {
                Some(status) => println!("{}", serde_json::to_string_pretty(&status)?),
                None => println!("No checkpoint for {}", project),
            }
        }
        CheckpointAction::Clear { project } => {
            store
                .clear(project)
                .await
                .with_context(|| format!("Failed to clear checkpoint for {}", project))?;
            println!("🧹 Cleared checkpoint for {}", project);
        }
    }

    Ok(())
}
