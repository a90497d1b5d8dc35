//! # mity_wizard - Project Creation Wizard for mITyFactory
//!
//! Step controller for creating or registering a project, with resumable
//! checkpoints:
//!
//! ```text
//! mode ──▶ details ──▶ method ──▶ chat ──▶ complete
//!   ▲         │  ▲        │  ▲       │
//!   └─────────┘  └────────┘  └───────┘ (back / cancel)
//!             │           │
//!             └─(existing)└─(manual)──▶ complete
//! ```
//!
//! A checkpoint is written on every step change once a new project has a
//! name, and removed when the wizard finishes. [`ResumeReconciler`] turns a
//! stored checkpoint back into a [`WizardContext`].

pub mod api;
pub mod checkpoint;
pub mod config;
pub mod controller;
pub mod error;
pub mod resume;
pub mod step;
pub mod validation;

pub use api::{AgentLauncher, HttpApi, NewProject, ProjectRegistry};
pub use checkpoint::{
    CheckpointStore, CheckpointWriter, FileCheckpointStore, MemoryCheckpointStore, WizardStatus,
};
pub use config::{CheckpointBackend, ClientConfig};
pub use controller::{StepError, WizardContext, WizardController, WizardExit};
pub use error::{WizardError, WizardResult};
pub use resume::ResumeReconciler;
pub use step::{PersistedStep, ProjectMode, SpecMethod, Step, WizardStep};
pub use validation::{validate_details, validate_project_name, validate_repo_url, FieldErrors};
