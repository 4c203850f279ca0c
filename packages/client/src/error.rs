// ABOUTME: Typed errors for the execution service client
// ABOUTME: Separates transport faults from non-success statuses carrying the response body

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Request to execution service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Execution service returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Failed to read upload {path}: {source}")]
    Upload {
        path: String,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ExecutionError>;

impl ExecutionError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ExecutionError::Status {
                status: StatusCode::NOT_FOUND,
                ..
            }
        )
    }

    /// Whether a caller-side retry could plausibly help: transport faults
    /// and server errors, never 4xx responses.
    pub fn is_retriable(&self) -> bool {
        match self {
            ExecutionError::Transport(_) => true,
            ExecutionError::Status { status, .. } => status.is_server_error(),
            ExecutionError::Upload { .. } => false,
        }
    }
}
