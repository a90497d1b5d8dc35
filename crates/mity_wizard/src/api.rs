//! Factory server collaborators.
//!
//! The wizard talks to three server-side concerns: project registration,
//! agent start, and checkpoint storage. Each is a trait so the controller can
//! be driven against doubles; [`HttpApi`] implements all of them over REST.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::checkpoint::{CheckpointStore, WizardStatus};
use crate::error::{WizardError, WizardResult};
use crate::step::SpecMethod;

/// Request body for creating a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub repo_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spec_method: Option<SpecMethod>,
}

/// Registers projects with the factory.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectRegistry: Send + Sync {
    /// Create a brand-new project.
    async fn create_project(&self, project: &NewProject) -> WizardResult<()>;

    /// Register an already existing repository as a project.
    async fn register_existing(&self, name: &str, repo_url: &str) -> WizardResult<()>;
}

/// Starts the implementation agent for a project.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentLauncher: Send + Sync {
    /// `yolo_mode` skips interactive approvals on the agent side.
    async fn start_agent(&self, project: &str, yolo_mode: bool) -> WizardResult<()>;
}

#[derive(Serialize)]
struct RegisterExisting<'a> {
    name: &'a str,
    repo_url: &'a str,
}

#[derive(Serialize)]
struct StartAgent {
    yolo_mode: bool,
}

/// REST client for the factory server.
#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn projects_url(&self) -> String {
        format!("{}/api/projects", self.base_url)
    }

    fn project_url(&self, project: &str, tail: &str) -> String {
        format!(
            "{}/api/projects/{}/{}",
            self.base_url,
            urlencoding::encode(project),
            tail
        )
    }

    async fn check(response: reqwest::Response) -> WizardResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(WizardError::Api {
            status: status.as_u16(),
            message: body,
        })
    }
}

#[async_trait]
impl ProjectRegistry for HttpApi {
    async fn create_project(&self, project: &NewProject) -> WizardResult<()> {
        let response = self
            .client
            .post(self.projects_url())
            .json(project)
            .send()
            .await?;
        Self::check(response).await?;
        info!(project = %project.name, "Project created");
        Ok(())
    }

    async fn register_existing(&self, name: &str, repo_url: &str) -> WizardResult<()> {
        let response = self
            .client
            .post(format!("{}/register", self.projects_url()))
            .json(&RegisterExisting { name, repo_url })
            .send()
            .await?;
        Self::check(response).await?;
        info!(project = name, "Existing project registered");
        Ok(())
    }
}

#[async_trait]
impl AgentLauncher for HttpApi {
    async fn start_agent(&self, project: &str, yolo_mode: bool) -> WizardResult<()> {
        let response = self
            .client
            .post(self.project_url(project, "agent/start"))
            .json(&StartAgent { yolo_mode })
            .send()
            .await?;
        Self::check(response).await?;
        info!(project, yolo_mode, "Agent started");
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for HttpApi {
    async fn load(&self, project: &str) -> WizardResult<Option<WizardStatus>> {
        let response = self
            .client
            .get(self.project_url(project, "wizard-status"))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            debug!(project, "No wizard checkpoint on server");
            return Ok(None);
        }
        let response = Self::check(response).await?;

        // Some servers answer `null` rather than 404 for "nothing saved".
        let status: Option<WizardStatus> = response.json().await?;
        Ok(status)
    }

    async fn save(&self, project: &str, status: &WizardStatus) -> WizardResult<()> {
        let response = self
            .client
            .put(self.project_url(project, "wizard-status"))
            .json(status)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn clear(&self, project: &str) -> WizardResult<()> {
        let response = self
            .client
            .delete(self.project_url(project, "wizard-status"))
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check(response).await?;
        Ok(())
    }
}
