//! Sandbox provider traits

use async_trait::async_trait;
use sandlease_util::SandboxId;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::SandboxHandle;

/// Errors from provider operations
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Create failed: {0}")]
    CreateFailed(String),

    #[error("Execute failed: {0}")]
    ExecuteFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("Close failed: {0}")]
    CloseFailed(String),

    #[error("Sandbox not found: {0}")]
    SandboxNotFound(SandboxId),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Options for creating a sandbox
#[derive(Clone)]
pub struct CreateOptions {
    /// Credential for the provisioning service (opaque to the core)
    pub api_key: String,

    /// How long the provider should keep the sandbox alive
    pub time_budget: Duration,
}

impl fmt::Debug for CreateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateOptions")
            .field("api_key", &"<redacted>")
            .field("time_budget", &self.time_budget)
            .finish()
    }
}

/// Captured result of running code in a sandbox
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutput {
    pub stdout_lines: Vec<String>,
    pub stderr_lines: Vec<String>,

    /// Language-level error (exception, non-zero exit), if any
    pub error_detail: Option<String>,
}

impl ExecutionOutput {
    pub fn stdout(lines: &[&str]) -> Self {
        Self {
            stdout_lines: lines.iter().map(|l| l.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stdout_lines.is_empty() && self.stderr_lines.is_empty() && self.error_detail.is_none()
    }
}

/// Provider trait - implemented by each sandbox backend
#[async_trait]
pub trait SandboxProvider: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Provision a new sandbox with the given time budget
    async fn create(&self, options: CreateOptions) -> ProviderResult<SandboxHandle>;

    /// Run a code snippet inside the sandbox
    async fn execute(&self, handle: &SandboxHandle, code: &str) -> ProviderResult<ExecutionOutput>;

    /// List the entry names under `path`
    async fn list_files(&self, handle: &SandboxHandle, path: &str) -> ProviderResult<Vec<String>>;

    /// Tear the sandbox down
    async fn close(&self, handle: &SandboxHandle) -> ProviderResult<()>;
}
