// ABOUTME: Error types for the sandbox service
// ABOUTME: Maps every failure onto the HTTP status and JSON error body of the wire surface

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crucible_core::protocol::ErrorBody;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("No files provided")]
    NoFilesProvided,

    #[error("No LaTeX content provided")]
    NoLatexProvided,

    #[error("LaTeX file not found or invalid: {filename}")]
    InvalidLatexFile { filename: String },

    #[error("Invalid execution id: {execution_id}")]
    InvalidExecutionId { execution_id: String },

    #[error("Execution directory not found: {execution_id}")]
    ExecutionNotFound { execution_id: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Access denied: path outside execution directory")]
    PathOutsideExecution,

    #[error("Invalid upload: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("LaTeX compilation failed: {details}")]
    LatexFailed { details: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SandboxError>;

impl SandboxError {
    fn status_code(&self) -> StatusCode {
        match self {
            SandboxError::NoFilesProvided
            | SandboxError::NoLatexProvided
            | SandboxError::InvalidExecutionId { .. }
            | SandboxError::Multipart(_) => StatusCode::BAD_REQUEST,
            SandboxError::ExecutionNotFound { .. }
            | SandboxError::FileNotFound { .. }
            | SandboxError::InvalidLatexFile { .. } => StatusCode::NOT_FOUND,
            SandboxError::PathOutsideExecution => StatusCode::FORBIDDEN,
            SandboxError::LatexFailed { .. } | SandboxError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for SandboxError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            error!("Sandbox error: {} - {}", status, message);
        } else {
            warn!("Sandbox error: {} - {}", status, message);
        }

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_wire_contract() {
        assert_eq!(
            SandboxError::NoFilesProvided.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            SandboxError::ExecutionNotFound {
                execution_id: "missing".to_string()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            SandboxError::PathOutsideExecution.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            SandboxError::LatexFailed {
                details: "no pdf".to_string()
            }
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_message_carries_execution_id() {
        let err = SandboxError::ExecutionNotFound {
            execution_id: "abc-123".to_string(),
        };
        assert_eq!(err.to_string(), "Execution directory not found: abc-123");
    }
}
