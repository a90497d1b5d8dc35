//! Project detail validation.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

const IDENTITY_PATTERN: &str = r"^[A-Za-z0-9_-]+$";

/// URL prefixes accepted for a project repository.
pub const REPO_URL_SCHEMES: &[&str] = &["https://", "http://", "ssh://", "git://", "git@"];

static IDENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(IDENTITY_PATTERN).expect("valid project identity regex"));

/// Per-field validation messages for the details step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub project_name: Option<String>,
    pub repo_url: Option<String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.project_name.is_none() && self.repo_url.is_none()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = [
            self.project_name.as_ref().map(|m| format!("project name: {}", m)),
            self.repo_url.as_ref().map(|m| format!("repository URL: {}", m)),
        ]
        .into_iter()
        .flatten()
        .collect();
        write!(f, "{}", messages.join("; "))
    }
}

/// Check a project identity. Returns the reason when invalid.
pub fn validate_project_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Project name is required".to_string());
    }
    if IDENTITY_RE.is_match(name) {
        Ok(())
    } else {
        Err("Use only letters, numbers, hyphens and underscores".to_string())
    }
}

/// Check a repository URL. Returns the reason when invalid.
pub fn validate_repo_url(url: &str) -> Result<(), String> {
    let url = url.trim();
    if url.is_empty() {
        return Err("Repository URL is required".to_string());
    }
    if REPO_URL_SCHEMES.iter().any(|scheme| url.starts_with(scheme)) {
        Ok(())
    } else {
        Err(format!(
            "URL must start with one of: {}",
            REPO_URL_SCHEMES.join(", ")
        ))
    }
}

/// Validate both detail fields together, collecting every message.
pub fn validate_details(name: &str, repo_url: &str) -> FieldErrors {
    FieldErrors {
        project_name: validate_project_name(name).err(),
        repo_url: validate_repo_url(repo_url).err(),
    }
}
