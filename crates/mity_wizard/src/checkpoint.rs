//! Wizard checkpoints.
//!
//! A checkpoint records how far the creation wizard got for one project so an
//! interrupted flow can pick up where it left off. Checkpoints live on the
//! factory server (see [`crate::api::HttpApi`]) or, offline, in the workspace:
//!
//! ```text
//! .mity/wizard/<project>.json
//! ```
//!
//! Writes are issued from the controller without waiting on them. The
//! [`CheckpointWriter`] funnels them through one background task so they hit
//! the store in the order they were issued.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{WizardError, WizardResult};
use crate::step::{PersistedStep, SpecMethod, Step, WizardStep};
use crate::validation::validate_project_name;

/// Persisted wizard progress for one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WizardStatus {
    pub step: PersistedStep,
    #[serde(default, deserialize_with = "lenient_spec_method")]
    pub spec_method: Option<SpecMethod>,
    #[serde(default = "Utc::now")]
    pub started_at: DateTime<Utc>,
    /// Reserved; always written empty.
    #[serde(default)]
    pub chat_messages: Vec<serde_json::Value>,
}

impl WizardStatus {
    pub fn new(step: WizardStep, spec_method: Option<SpecMethod>, started_at: DateTime<Utc>) -> Self {
        Self {
            step: step.into(),
            spec_method,
            started_at,
            chat_messages: Vec::new(),
        }
    }

    /// Step to resume at. Unrecognized values fall back to method selection.
    pub fn resume_step(&self) -> Step {
        match &self.step {
            PersistedStep::Known(step) => (*step).into(),
            PersistedStep::Other(value) => {
                debug!(step = %value, "Unknown checkpoint step, resuming at method");
                Step::Method
            }
        }
    }
}

fn lenient_spec_method<'de, D>(deserializer: D) -> Result<Option<SpecMethod>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(|v| v.as_str()).and_then(SpecMethod::parse))
}

/// Storage backend for checkpoints, keyed by project identity.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// `Ok(None)` when no checkpoint exists.
    async fn load(&self, project: &str) -> WizardResult<Option<WizardStatus>>;

    /// Create or overwrite the checkpoint.
    async fn save(&self, project: &str, status: &WizardStatus) -> WizardResult<()>;

    /// Remove the checkpoint. Clearing a missing checkpoint succeeds.
    async fn clear(&self, project: &str) -> WizardResult<()>;
}

/// Checkpoints stored as JSON files in the workspace.
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    workspace_root: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(workspace_root: impl AsRef<Path>) -> Self {
        Self {
            workspace_root: workspace_root.as_ref().to_path_buf(),
        }
    }

    fn wizard_dir(&self) -> PathBuf {
        self.workspace_root.join(".mity").join("wizard")
    }

    /// File holding the checkpoint for `project`.
    pub fn checkpoint_path(&self, project: &str) -> WizardResult<PathBuf> {
        validate_project_name(project)
            .map_err(|reason| WizardError::Checkpoint(format!("{}: {}", project, reason)))?;
        Ok(self.wizard_dir().join(format!("{}.json", project)))
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self, project: &str) -> WizardResult<Option<WizardStatus>> {
        let path = self.checkpoint_path(project)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, project: &str, status: &WizardStatus) -> WizardResult<()> {
        let path = self.checkpoint_path(project)?;
        tokio::fs::create_dir_all(self.wizard_dir()).await?;

        let content = serde_json::to_string_pretty(status)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn clear(&self, project: &str) -> WizardResult<()> {
        let path = self.checkpoint_path(project)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process checkpoint store.
#[derive(Debug, Clone, Default)]
pub struct MemoryCheckpointStore {
    entries: Arc<RwLock<HashMap<String, WizardStatus>>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the checkpoint for `project`.
    pub fn get(&self, project: &str) -> Option<WizardStatus> {
        self.entries.read().get(project).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn load(&self, project: &str) -> WizardResult<Option<WizardStatus>> {
        Ok(self.get(project))
    }

    async fn save(&self, project: &str, status: &WizardStatus) -> WizardResult<()> {
        self.entries.write().insert(project.to_string(), status.clone());
        Ok(())
    }

    async fn clear(&self, project: &str) -> WizardResult<()> {
        self.entries.write().remove(project);
        Ok(())
    }
}

enum CheckpointOp {
    Save { project: String, status: WizardStatus },
    Clear { project: String },
    Flush(oneshot::Sender<()>),
}

/// Ordered, fire-and-forget checkpoint writes.
///
/// Failures are logged and never reach the caller.
#[derive(Clone)]
pub struct CheckpointWriter {
    tx: mpsc::UnboundedSender<CheckpointOp>,
}

impl CheckpointWriter {
    /// Start the writer task. Must be called within a tokio runtime.
    pub fn spawn(store: Arc<dyn CheckpointStore>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<CheckpointOp>();

        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                match op {
                    CheckpointOp::Save { project, status } => {
                        if let Err(e) = store.save(&project, &status).await {
                            warn!(project = %project, error = %e, "Failed to save wizard checkpoint");
                        } else {
                            debug!(project = %project, step = ?status.step, "Saved wizard checkpoint");
                        }
                    }
                    CheckpointOp::Clear { project } => {
                        if let Err(e) = store.clear(&project).await {
                            warn!(project = %project, error = %e, "Failed to clear wizard checkpoint");
                        } else {
                            debug!(project = %project, "Cleared wizard checkpoint");
                        }
                    }
                    CheckpointOp::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        Self { tx }
    }

    pub fn save(&self, project: &str, status: WizardStatus) {
        self.enqueue(CheckpointOp::Save {
            project: project.to_string(),
            status,
        });
    }

    pub fn clear(&self, project: &str) {
        self.enqueue(CheckpointOp::Clear {
            project: project.to_string(),
        });
    }

    /// Wait until every write issued so far has been applied.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(CheckpointOp::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    fn enqueue(&self, op: CheckpointOp) {
        if self.tx.send(op).is_err() {
            warn!("Checkpoint writer stopped, dropping write");
        }
    }
}
