// ABOUTME: Typed RPC wrapper over the sandbox HTTP surface
// ABOUTME: Marshals uploads as multipart and everything else as JSON; contains no retry logic

pub mod error;

pub use error::{ExecutionError, Result};

use bytes::Bytes;
use crucible_config::constants;
use crucible_config::env::{env_or, parse_env};
use crucible_core::protocol::{
    CompileLatexRequest, CreatedExecution, ExecuteRequest, ExecutionListing, ExecutionOutput,
    LATEX_WARNINGS_HEADER,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5000";
/// Slack added on top of the sandbox's own execution timeout so the server
/// side times out first and reports the fault as error text.
const REQUEST_TIMEOUT_SLACK_SECS: u64 = 30;
const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 300;

/// A PDF produced by the sandbox plus the compiler warnings it reported.
#[derive(Debug)]
pub struct CompiledPdf {
    pub pdf: Bytes,
    pub warnings: Vec<String>,
}

/// HTTP client for the sandbox service.
///
/// Retrying is deliberately left to callers; every non-success status is
/// surfaced as a typed [`ExecutionError`] carrying the response body.
#[derive(Debug, Clone)]
pub struct ExecutionClient {
    client: Client,
    base_url: String,
}

impl ExecutionClient {
    fn create_client(timeout: Duration) -> Client {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client")
    }

    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(
            base_url,
            Duration::from_secs(DEFAULT_EXECUTION_TIMEOUT_SECS + REQUEST_TIMEOUT_SLACK_SECS),
        )
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into();
        Self {
            client: Self::create_client(timeout),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build a client from `CRUCIBLE_EXECUTION_SERVICE_URL` and the shared
    /// execution timeout.
    pub fn from_env() -> Self {
        let base_url = env_or(constants::CRUCIBLE_EXECUTION_SERVICE_URL, DEFAULT_SERVICE_URL);
        let timeout_secs = parse_env(
            constants::CRUCIBLE_EXECUTION_TIMEOUT_SECS,
            DEFAULT_EXECUTION_TIMEOUT_SECS,
        );
        Self::with_timeout(
            base_url,
            Duration::from_secs(timeout_secs + REQUEST_TIMEOUT_SLACK_SECS),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload local files into a fresh execution directory.
    pub async fn create_execution(&self, files: &[PathBuf]) -> Result<CreatedExecution> {
        let mut form = Form::new();
        for path in files {
            let data = tokio::fs::read(path)
                .await
                .map_err(|source| ExecutionError::Upload {
                    path: path.display().to_string(),
                    source,
                })?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("file")
                .to_string();
            form = form.part("files", Part::bytes(data).file_name(name));
        }

        debug!("Uploading {} file(s) to create an execution", files.len());
        let response = self
            .client
            .post(format!("{}/create-execution", self.base_url))
            .multipart(form)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Run code in the sandbox, optionally inside an execution directory.
    pub async fn execute(&self, code: &str, execution_id: Option<&str>) -> Result<ExecutionOutput> {
        let request = ExecuteRequest {
            code: code.to_string(),
            execution_id: execution_id.map(str::to_string),
        };
        let response = self
            .client
            .post(format!("{}/execute", self.base_url))
            .json(&request)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Fetch the recursive file snapshot of an execution directory.
    pub async fn list_files(&self, execution_id: &str) -> Result<ExecutionListing> {
        let response = self
            .client
            .get(format!(
                "{}/list-execution-files/{}",
                self.base_url, execution_id
            ))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Fetch one artifact's raw bytes.
    pub async fn get_file(&self, execution_id: &str, path: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(format!(
                "{}/app/uploads/{}/{}",
                self.base_url, execution_id, path
            ))
            .send()
            .await?;
        Ok(Self::check(response).await?.bytes().await?)
    }

    /// Compile a `.tex` file already present in an execution directory.
    pub async fn compile_latex(&self, execution_id: &str, filename: &str) -> Result<CompiledPdf> {
        let request = CompileLatexRequest {
            execution_id: execution_id.to_string(),
            filename: filename.to_string(),
        };
        let response = self
            .client
            .post(format!("{}/compile-existing-latex", self.base_url))
            .json(&request)
            .send()
            .await?;
        let response = Self::check(response).await?;

        let warnings = response
            .headers()
            .get(LATEX_WARNINGS_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|raw| raw.split("; ").map(str::to_string).collect())
            .unwrap_or_default();

        Ok(CompiledPdf {
            pdf: response.bytes().await?,
            warnings,
        })
    }

    /// Turn a non-success response into a typed error carrying the body.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        warn!("Execution service returned {}: {}", status, body);
        Err(ExecutionError::Status { status, body })
    }
}
