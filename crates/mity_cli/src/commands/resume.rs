//! Resume command - Continue an interrupted wizard.

use anyhow::{Context, Result};
use clap::Args;

use mity_wizard::{validate_project_name, ResumeReconciler};

use super::{checkpoint_store, wizard, Cli};

#[derive(Args)]
pub struct ResumeArgs {
    /// Project whose wizard should be resumed
    project: String,
}

pub async fn execute(cli: &Cli, args: &ResumeArgs) -> Result<()> {
    validate_project_name(&args.project)
        .map_err(|reason| anyhow::anyhow!(reason))
        .with_context(|| format!("Invalid project argument '{}'", args.project))?;

    let config = cli.config()?;
    let store = checkpoint_store(&config);
    let ctx = ResumeReconciler::fetch(store.as_ref(), &args.project).await;

    if ctx.resuming {
        println!("🔁 Resuming wizard for {} at step {}", args.project, ctx.step);
    } else {
        println!("ℹ️  No checkpoint for {}, starting a new wizard", args.project);
    }

    wizard::run(ctx, &config).await
}
