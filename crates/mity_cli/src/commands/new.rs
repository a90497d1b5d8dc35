//! New command - Run the project wizard from the start.

use anyhow::Result;
use clap::Args;
use tracing::info;

use mity_wizard::WizardContext;

use super::{wizard, Cli};

#[derive(Args)]
pub struct NewArgs {}

pub async fn execute(cli: &Cli, _args: &NewArgs) -> Result<()> {
    let config = cli.config()?;
    info!(server = %config.server_url, "Starting project wizard");

    println!("🏭 mITyFactory project wizard");
    wizard::run(WizardContext::fresh(), &config).await
}
