//! Wizard step controller.
//!
//! Drives `mode -> details -> method -> chat -> complete` and owns the side
//! effects attached to each transition: project registration, agent start and
//! checkpoint writes. Whether registration runs is decided in one place,
//! [`WizardContext::needs_registration`], which compares the current name and
//! mode with the identity the server already knows about.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::api::{AgentLauncher, NewProject, ProjectRegistry};
use crate::checkpoint::{CheckpointWriter, WizardStatus};
use crate::error::{WizardError, WizardResult};
use crate::step::{ProjectMode, SpecMethod, Step};
use crate::validation::{validate_details, FieldErrors};

/// Everything the wizard knows about the flow in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct WizardContext {
    pub step: Step,
    pub mode: Option<ProjectMode>,
    pub project_name: Option<String>,
    pub repo_url: Option<String>,
    pub spec_method: Option<SpecMethod>,
    /// Re-entered from a checkpoint.
    pub resuming: bool,
    /// Name and mode the server has a project for. Seeded from the checkpoint
    /// on resume, set after each successful registration.
    pub registered_as: Option<(String, ProjectMode)>,
    /// A checkpoint exists for `project_name` and tracks step changes.
    pub has_checkpoint: bool,
    pub started_at: DateTime<Utc>,
}

impl WizardContext {
    /// Fresh flow starting at mode selection.
    pub fn fresh() -> Self {
        Self {
            step: Step::Mode,
            mode: None,
            project_name: None,
            repo_url: None,
            spec_method: None,
            resuming: false,
            registered_as: None,
            has_checkpoint: false,
            started_at: Utc::now(),
        }
    }

    /// `true` unless the current project name and mode are already registered.
    pub fn needs_registration(&self) -> bool {
        match (&self.registered_as, self.project_name.as_deref(), self.mode) {
            (Some((name, registered_mode)), Some(current), Some(mode)) => {
                name != current || *registered_mode != mode
            }
            _ => true,
        }
    }
}

impl Default for WizardContext {
    fn default() -> Self {
        Self::fresh()
    }
}

/// Failure of a step's side effect. The wizard stays on `step`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepError {
    pub step: Step,
    pub message: String,
}

/// How a finished wizard ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardExit {
    Completed {
        project: String,
        spec_method: Option<SpecMethod>,
        spec_path: Option<String>,
    },
    ExitedToProject {
        project: String,
    },
}

impl WizardExit {
    pub fn project(&self) -> &str {
        match self {
            Self::Completed { project, .. } | Self::ExitedToProject { project } => project,
        }
    }
}

/// Step controller for the project creation wizard.
pub struct WizardController {
    ctx: WizardContext,
    registry: Arc<dyn ProjectRegistry>,
    launcher: Arc<dyn AgentLauncher>,
    checkpoints: CheckpointWriter,
    yolo_mode: bool,
    field_errors: FieldErrors,
    step_error: Option<StepError>,
    pending_completion: Option<String>,
    exit: Option<WizardExit>,
}

impl WizardController {
    pub fn new(
        ctx: WizardContext,
        registry: Arc<dyn ProjectRegistry>,
        launcher: Arc<dyn AgentLauncher>,
        checkpoints: CheckpointWriter,
    ) -> Self {
        Self {
            ctx,
            registry,
            launcher,
            checkpoints,
            yolo_mode: false,
            field_errors: FieldErrors::new(),
            step_error: None,
            pending_completion: None,
            exit: None,
        }
    }

    /// Start agents without interactive approvals.
    pub fn with_yolo_mode(mut self, yolo_mode: bool) -> Self {
        self.yolo_mode = yolo_mode;
        self
    }

    pub fn context(&self) -> &WizardContext {
        &self.ctx
    }

    pub fn step(&self) -> Step {
        self.ctx.step
    }

    pub fn project_name(&self) -> Option<&str> {
        self.ctx.project_name.as_deref()
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn step_error(&self) -> Option<&StepError> {
        self.step_error.as_ref()
    }

    /// Completion payload waiting on a successful agent start.
    pub fn pending_completion(&self) -> Option<&str> {
        self.pending_completion.as_deref()
    }

    pub fn exit(&self) -> Option<&WizardExit> {
        self.exit.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.exit.is_some()
    }

    /// Writer used for checkpoint side effects.
    pub fn checkpoints(&self) -> &CheckpointWriter {
        &self.checkpoints
    }

    /// `mode -> details`.
    pub fn select_mode(&mut self, mode: ProjectMode) -> WizardResult<Step> {
        self.require_step(Step::Mode, "select a mode")?;
        self.ctx.mode = Some(mode);
        Ok(self.advance(Step::Details))
    }

    /// `details -> mode` or `method -> details`.
    pub fn back(&mut self) -> WizardResult<Step> {
        self.require_active("go back")?;
        let previous = match self.ctx.step {
            Step::Details => Step::Mode,
            Step::Method => Step::Details,
            from => {
                return Err(WizardError::InvalidTransition {
                    from,
                    action: "go back",
                })
            }
        };
        Ok(self.advance(previous))
    }

    /// Validate and submit project details.
    ///
    /// Existing repositories are registered and finish the wizard; new
    /// projects move on to method selection.
    pub async fn submit_details(&mut self, project_name: &str, repo_url: &str) -> WizardResult<Step> {
        self.require_step(Step::Details, "submit details")?;

        let errors = validate_details(project_name, repo_url);
        if !errors.is_empty() {
            self.field_errors = errors.clone();
            return Err(WizardError::Validation(errors));
        }
        self.field_errors = FieldErrors::new();

        let project_name = project_name.trim().to_string();
        let repo_url = repo_url.trim().to_string();
        self.rename_project(&project_name);
        self.ctx.repo_url = Some(repo_url.clone());

        match self.ctx.mode.unwrap_or(ProjectMode::New) {
            ProjectMode::Existing => {
                if self.ctx.needs_registration() {
                    let result = self.registry.register_existing(&project_name, &repo_url).await;
                    if let Err(e) = result {
                        return Err(self.step_failed(WizardError::Registration(e.to_string())));
                    }
                    self.ctx.registered_as = Some((project_name, ProjectMode::Existing));
                }
                Ok(self.complete(None))
            }
            ProjectMode::New => {
                self.ctx.has_checkpoint = true;
                Ok(self.advance(Step::Method))
            }
        }
    }

    /// Choose how the spec gets written.
    ///
    /// Manual finishes the wizard; assisted moves to the chat step.
    pub async fn choose_method(&mut self, method: SpecMethod) -> WizardResult<Step> {
        self.require_step(Step::Method, "choose a method")?;
        let project_name = self.require_project("choose a method")?;

        if self.ctx.needs_registration() {
            let project = NewProject {
                name: project_name.clone(),
                repo_url: self.ctx.repo_url.clone().unwrap_or_default(),
                spec_method: Some(method),
            };
            let result = self.registry.create_project(&project).await;
            if let Err(e) = result {
                return Err(self.step_failed(WizardError::Registration(e.to_string())));
            }
            self.ctx.registered_as = Some((project_name, ProjectMode::New));
        }

        self.ctx.spec_method = Some(method);
        match method {
            SpecMethod::Manual => Ok(self.complete(None)),
            SpecMethod::Assisted => {
                self.ctx.has_checkpoint = true;
                Ok(self.advance(Step::Chat))
            }
        }
    }

    /// The chat session reported a written spec; start the agent.
    pub async fn on_chat_complete(&mut self, spec_path: &str) -> WizardResult<Step> {
        self.require_step(Step::Chat, "complete the chat")?;
        self.pending_completion = Some(spec_path.to_string());
        self.start_agent().await
    }

    /// Replay the last completion after a failed agent start.
    pub async fn retry_agent_start(&mut self) -> WizardResult<Step> {
        self.require_step(Step::Chat, "retry agent start")?;
        if self.pending_completion.is_none() {
            return Err(WizardError::InvalidTransition {
                from: self.ctx.step,
                action: "retry agent start",
            });
        }
        self.start_agent().await
    }

    /// `chat -> method`. The server-side project is left in place.
    pub fn cancel_chat(&mut self) -> WizardResult<Step> {
        self.require_step(Step::Chat, "cancel the chat")?;
        self.ctx.spec_method = None;
        self.pending_completion = None;
        Ok(self.advance(Step::Method))
    }

    /// Leave the chat for the project view without completing the wizard.
    pub fn exit_to_project(&mut self) -> WizardResult<String> {
        self.require_step(Step::Chat, "exit to project")?;
        let project = self.require_project("exit to project")?;

        self.clear_checkpoint();
        info!(project = %project, "Exited wizard to project");
        self.exit = Some(WizardExit::ExitedToProject {
            project: project.clone(),
        });
        Ok(project)
    }

    async fn start_agent(&mut self) -> WizardResult<Step> {
        let project = self.require_project("start the agent")?;

        let result = self.launcher.start_agent(&project, self.yolo_mode).await;
        if let Err(e) = result {
            return Err(self.step_failed(WizardError::AgentStart(e.to_string())));
        }

        let spec_path = self.pending_completion.take();
        Ok(self.complete(spec_path))
    }

    fn complete(&mut self, spec_path: Option<String>) -> Step {
        self.clear_checkpoint();
        let step = self.advance(Step::Complete);
        if let Some(project) = self.ctx.project_name.clone() {
            self.exit = Some(WizardExit::Completed {
                project,
                spec_method: self.ctx.spec_method,
                spec_path,
            });
        }
        step
    }

    fn advance(&mut self, next: Step) -> Step {
        let previous = self.ctx.step;
        self.ctx.step = next;
        self.step_error = None;
        info!(
            from = %previous,
            to = %next,
            project = self.ctx.project_name.as_deref().unwrap_or(""),
            "Wizard step changed"
        );
        self.save_checkpoint();
        next
    }

    fn rename_project(&mut self, project_name: &str) {
        if self.ctx.project_name.as_deref() == Some(project_name) {
            return;
        }
        self.clear_checkpoint();
        self.ctx.project_name = Some(project_name.to_string());
    }

    fn save_checkpoint(&self) {
        if !self.ctx.has_checkpoint {
            return;
        }
        let (Some(project), Some(step)) = (self.ctx.project_name.as_deref(), self.ctx.step.persisted())
        else {
            return;
        };
        self.checkpoints.save(
            project,
            WizardStatus::new(step, self.ctx.spec_method, self.ctx.started_at),
        );
    }

    fn clear_checkpoint(&mut self) {
        if !self.ctx.has_checkpoint {
            return;
        }
        if let Some(project) = self.ctx.project_name.as_deref() {
            self.checkpoints.clear(project);
        }
        self.ctx.has_checkpoint = false;
    }

    fn step_failed(&mut self, error: WizardError) -> WizardError {
        warn!(step = %self.ctx.step, error = %error, "Wizard step failed");
        self.step_error = Some(StepError {
            step: self.ctx.step,
            message: error.to_string(),
        });
        error
    }

    fn require_step(&self, step: Step, action: &'static str) -> WizardResult<()> {
        self.require_active(action)?;
        if self.ctx.step == step {
            Ok(())
        } else {
            Err(WizardError::InvalidTransition {
                from: self.ctx.step,
                action,
            })
        }
    }

    fn require_active(&self, action: &'static str) -> WizardResult<()> {
        if self.exit.is_some() {
            return Err(WizardError::InvalidTransition {
                from: self.ctx.step,
                action,
            });
        }
        Ok(())
    }

    fn require_project(&self, action: &'static str) -> WizardResult<String> {
        self.ctx
            .project_name
            .clone()
            .ok_or(WizardError::InvalidTransition {
                from: self.ctx.step,
                action,
            })
    }
}
