//! HTTP provider for a remote sandbox REST service
//!
//! Talks to a service exposing:
//! - `POST   /sessions`          create a sandbox session
//! - `POST   /sessions/{id}/run` run a command, returns captured output
//! - `DELETE /sessions/{id}`     destroy the session

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use sandlease_util::SandboxId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::{
    CreateOptions, ExecutionOutput, HandlePayload, ProviderError, ProviderResult, SandboxHandle,
    SandboxProvider,
};

/// Connection settings for [`HttpSandboxProvider`]
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
    /// Service root, e.g. `https://sandbox.example.com`
    pub base_url: String,

    /// Interpreter used to run snippets (`python3`, `node`, ...)
    pub language: String,

    /// Per-request timeout enforced by the HTTP client
    pub request_timeout: Duration,
}

#[derive(Debug, Serialize)]
struct CreateSessionRequest {
    env: HashMap<String, String>,
    timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    session_id: String,
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    command: Vec<&'a str>,
    time: u64,
}

#[derive(Debug, Deserialize)]
struct RunResult {
    #[serde(default)]
    stdout: String,
    #[serde(default)]
    stderr: String,
    exit_code: Option<i32>,
    signal: Option<i32>,
}

impl RunResult {
    fn succeeded(&self) -> bool {
        self.signal.is_none() && self.exit_code.unwrap_or(0) == 0
    }

    fn into_output(self) -> ExecutionOutput {
        let error_detail = match (self.exit_code, self.signal) {
            (_, Some(signal)) => Some(format!("terminated by signal {}", signal)),
            (Some(code), None) if code != 0 => Some(format!("exited with code {}", code)),
            _ => None,
        };

        ExecutionOutput {
            stdout_lines: split_lines(&self.stdout),
            stderr_lines: split_lines(&self.stderr),
            error_detail,
        }
    }
}

fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// `ls` invocation for a user-supplied path. The path always follows
/// `--` so a leading dash is never read as an option.
fn list_command(path: &str) -> Vec<&str> {
    vec!["ls", "-1A", "--", path]
}

/// Provider backed by a remote sandbox REST service
pub struct HttpSandboxProvider {
    client: Client,
    config: HttpProviderConfig,
}

impl HttpSandboxProvider {
    pub fn new(config: HttpProviderConfig) -> ProviderResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout)
            .build()?;

        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn session_parts<'a>(&self, handle: &'a SandboxHandle) -> ProviderResult<(&'a str, &'a str)> {
        match handle.payload() {
            HandlePayload::Http { session_id, token } => Ok((session_id, token)),
            HandlePayload::Mock { .. } => Err(ProviderError::SandboxNotFound(handle.id.clone())),
        }
    }

    fn authorized(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        if token.is_empty() {
            builder
        } else {
            builder.bearer_auth(token)
        }
    }

    async fn run(&self, handle: &SandboxHandle, command: Vec<&str>) -> ProviderResult<RunResult> {
        let (session_id, token) = self.session_parts(handle)?;
        let request = RunRequest {
            command,
            time: self.config.request_timeout.as_millis() as u64,
        };

        let response = self
            .authorized(
                self.client
                    .post(self.url(&format!("/sessions/{}/run", session_id))),
                token,
            )
            .json(&request)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => response
                .json::<RunResult>()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string())),
            StatusCode::NOT_FOUND => Err(ProviderError::SandboxNotFound(handle.id.clone())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ProviderError::ExecuteFailed(format!("{}: {}", status, body)))
            }
        }
    }
}

#[async_trait]
impl SandboxProvider for HttpSandboxProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn create(&self, options: CreateOptions) -> ProviderResult<SandboxHandle> {
        let request = CreateSessionRequest {
            env: HashMap::new(),
            timeout_ms: options.time_budget.as_millis() as u64,
        };

        let response = self
            .authorized(self.client.post(self.url("/sessions")), &options.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::CreateFailed(format!("{}: {}", status, body)));
        }

        let created: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        debug!(session_id = %created.session_id, "Remote sandbox session created");

        Ok(SandboxHandle::new(
            SandboxId::new(created.session_id.clone()),
            HandlePayload::Http {
                session_id: created.session_id,
                token: options.api_key,
            },
        ))
    }

    async fn execute(&self, handle: &SandboxHandle, code: &str) -> ProviderResult<ExecutionOutput> {
        let result = self
            .run(handle, vec![self.config.language.as_str(), "-c", code])
            .await?;
        Ok(result.into_output())
    }

    async fn list_files(&self, handle: &SandboxHandle, path: &str) -> ProviderResult<Vec<String>> {
        let result = self.run(handle, list_command(path)).await?;
        if !result.succeeded() {
            return Err(ProviderError::ListFailed(result.stderr.trim().to_string()));
        }
        Ok(split_lines(&result.stdout))
    }

    async fn close(&self, handle: &SandboxHandle) -> ProviderResult<()> {
        let (session_id, token) = self.session_parts(handle)?;

        let response = self
            .authorized(
                self.client
                    .delete(self.url(&format!("/sessions/{}", session_id))),
                token,
            )
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(ProviderError::SandboxNotFound(handle.id.clone())),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ProviderError::CloseFailed(format!("{}: {}", status, body)))
            }
        }
    }
}
