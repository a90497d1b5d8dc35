//! Rebuild wizard context from a stored checkpoint.

use tracing::{info, warn};

use crate::checkpoint::{CheckpointStore, WizardStatus};
use crate::controller::WizardContext;
use crate::step::ProjectMode;

/// Turns a checkpoint into the context a resumed wizard starts from.
pub struct ResumeReconciler;

impl ResumeReconciler {
    /// `None` yields a fresh flow at mode selection.
    pub fn reconcile(project: &str, checkpoint: Option<WizardStatus>) -> WizardContext {
        let Some(status) = checkpoint else {
            info!(project, "No checkpoint, starting a fresh wizard");
            return WizardContext::fresh();
        };

        let step = status.resume_step();
        info!(project, step = %step, spec_method = ?status.spec_method, "Resuming wizard");

        WizardContext {
            step,
            // Checkpoints are only written for new projects.
            mode: Some(ProjectMode::New),
            project_name: Some(project.to_string()),
            repo_url: None,
            spec_method: status.spec_method,
            resuming: true,
            registered_as: Some((project.to_string(), ProjectMode::New)),
            has_checkpoint: true,
            started_at: status.started_at,
        }
    }

    /// Load the checkpoint for `project` and reconcile it.
    ///
    /// A failed load is logged and treated as no checkpoint.
    pub async fn fetch(store: &dyn CheckpointStore, project: &str) -> WizardContext {
        let checkpoint = match store.load(project).await {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                warn!(project, error = %e, "Failed to load wizard checkpoint");
                None
            }
        };
        Self::reconcile(project, checkpoint)
    }
}
