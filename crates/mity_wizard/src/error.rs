//! Error types for the wizard module.

use thiserror::Error;

use crate::step::Step;
use crate::validation::FieldErrors;

/// Result type alias for wizard operations.
pub type WizardResult<T> = Result<T, WizardError>;

/// Errors that can occur while driving the wizard.
#[derive(Error, Debug)]
pub enum WizardError {
    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    #[error("Cannot {action} from step {from}")]
    InvalidTransition { from: Step, action: &'static str },

    #[error("Project registration failed: {0}")]
    Registration(String),

    #[error("Agent start failed: {0}")]
    AgentStart(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
}
