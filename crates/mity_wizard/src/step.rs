//! Wizard step vocabulary.
//!
//! `Step` is the internal state set. `WizardStep` is the subset that gets
//! persisted in checkpoints; `Complete` is transient and never stored.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Internal wizard state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Mode,
    Details,
    Method,
    Chat,
    Complete,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mode => "mode",
            Self::Details => "details",
            Self::Method => "method",
            Self::Chat => "chat",
            Self::Complete => "complete",
        }
    }

    /// Persistable form of this step, if any.
    pub fn persisted(&self) -> Option<WizardStep> {
        match self {
            Self::Mode => Some(WizardStep::Mode),
            Self::Details => Some(WizardStep::Details),
            Self::Method => Some(WizardStep::Method),
            Self::Chat => Some(WizardStep::Chat),
            Self::Complete => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step as stored in a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    Mode,
    Details,
    Method,
    Chat,
}

impl From<WizardStep> for Step {
    fn from(step: WizardStep) -> Self {
        match step {
            WizardStep::Mode => Step::Mode,
            WizardStep::Details => Step::Details,
            WizardStep::Method => Step::Method,
            WizardStep::Chat => Step::Chat,
        }
    }
}

/// Checkpoint step field; keeps values written by newer clients readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersistedStep {
    Known(WizardStep),
    Other(String),
}

impl From<WizardStep> for PersistedStep {
    fn from(step: WizardStep) -> Self {
        Self::Known(step)
    }
}

/// Whether the wizard creates a new project or registers an existing repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectMode {
    New,
    Existing,
}

/// How the initial spec gets written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpecMethod {
    /// Conversational authoring with the agent
    #[serde(rename = "claude", alias = "assisted")]
    Assisted,
    /// The user writes the spec files themselves
    #[serde(rename = "manual")]
    Manual,
}

impl SpecMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Assisted => "claude",
            Self::Manual => "manual",
        }
    }

    /// Parse a stored value, accepting both wire names for the assisted path.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "claude" | "assisted" => Some(Self::Assisted),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

impl fmt::Display for SpecMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_is_never_persisted() {
        assert_eq!(Step::Complete.persisted(), None);
        for step in [Step::Mode, Step::Details, Step::Method, Step::Chat] {
            let persisted = step.persisted().unwrap();
            assert_eq!(Step::from(persisted), step);
        }
    }

    #[test]
    fn test_persisted_step_tolerates_unknown_values() {
        let known: PersistedStep = serde_json::from_str("\"chat\"").unwrap();
        assert_eq!(known, PersistedStep::Known(WizardStep::Chat));

        let other: PersistedStep = serde_json::from_str("\"review\"").unwrap();
        assert_eq!(other, PersistedStep::Other("review".to_string()));
    }

    #[test]
    fn test_spec_method_wire_names() {
        assert_eq!(serde_json::to_string(&SpecMethod::Assisted).unwrap(), "\"claude\"");
        assert_eq!(serde_json::to_string(&SpecMethod::Manual).unwrap(), "\"manual\"");

        let alias: SpecMethod = serde_json::from_str("\"assisted\"").unwrap();
        assert_eq!(alias, SpecMethod::Assisted);
        assert_eq!(SpecMethod::parse("claude"), Some(SpecMethod::Assisted));
        assert_eq!(SpecMethod::parse("robot"), None);
    }
}
