//! mITyFactory CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 4: Connection error
//! - 5: Aborted (input closed, progress kept in the checkpoint)

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod prompt;

use commands::{Cli, Commands};
use mity_chat::ChatError;
use mity_wizard::WizardError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const CONNECTION_ERROR: u8 = 4;
    pub const ABORTED: u8 = 5;
}

const DEFAULT_FILTER: &str = "mity_cli=info,mity_chat=info,mity_wizard=info,warn";
const VERBOSE_FILTER: &str = "mity_cli=debug,mity_chat=debug,mity_wizard=debug,warn";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = if cli.verbose {
        VERBOSE_FILTER
    } else if cli.quiet {
        "warn"
    } else {
        DEFAULT_FILTER
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let result = match &cli.command {
        Commands::New(args) => commands::new::execute(&cli, args).await,
        Commands::Resume(args) => commands::resume::execute(&cli, args).await,
        Commands::Checkpoint(args) => commands::checkpoint::execute(&cli, args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if e.downcast_ref::<prompt::InputClosed>().is_some() {
        return ExitCodes::ABORTED;
    }

    for cause in e.chain() {
        if let Some(err) = cause.downcast_ref::<WizardError>() {
            return match err {
                WizardError::Validation(_) => ExitCodes::VALIDATION_FAILURE,
                WizardError::Config(_) | WizardError::Toml(_) => ExitCodes::INVALID_ARGS,
                WizardError::Http(_) | WizardError::Api { .. } => ExitCodes::CONNECTION_ERROR,
                _ => ExitCodes::GENERAL_ERROR,
            };
        }
        if let Some(err) = cause.downcast_ref::<ChatError>() {
            return match err {
                ChatError::ConnectFailed { .. }
                | ChatError::NotConnected
                | ChatError::ChannelClosed
                | ChatError::SendFailed { .. } => ExitCodes::CONNECTION_ERROR,
                _ => ExitCodes::GENERAL_ERROR,
            };
        }
    }

    let msg = e.to_string().to_lowercase();
    if msg.contains("argument") || msg.contains("not found") {
        ExitCodes::INVALID_ARGS
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
