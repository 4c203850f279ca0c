// ABOUTME: Wire types for the sandbox HTTP surface
// ABOUTME: Request and response bodies shared by the service and the typed client

use crate::tree::{FileNode, TreeStats};
use serde::{Deserialize, Serialize};

/// Response header carrying LaTeX compiler warnings, first five joined by "; ".
pub const LATEX_WARNINGS_HEADER: &str = "x-latex-warnings";

/// Body of `POST /execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub code: String,
    /// When present and known, the code runs inside that execution's
    /// directory instead of the upload root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
}

/// Captured result of running submitted code.
///
/// Runtime faults of the code (nonzero exit, timeout, spawn failure) are
/// reported as text in `error`, never as an HTTP-level failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutput {
    pub output: String,
    pub error: String,
}

impl ExecutionOutput {
    /// Failure classification used by the verify-repair loop: any error text
    /// or any stdout marks the run as failed.
    pub fn indicates_failure(&self) -> bool {
        !self.error.is_empty() || !self.output.is_empty()
    }
}

/// Body of a successful `POST /create-execution`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedExecution {
    pub execution_id: String,
    pub directory: String,
    pub saved_files: Vec<String>,
}

/// Body of `GET /list-execution-files/{execution_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionListing {
    pub structure: FileNode,
    pub stats: TreeStats,
    pub directory: String,
}

/// Body of `POST /compile-existing-latex`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileLatexRequest {
    pub execution_id: String,
    pub filename: String,
}

/// JSON error body used by every non-2xx sandbox response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_output_and_error_is_success() {
        let out = ExecutionOutput::default();
        assert!(!out.indicates_failure());
    }

    #[test]
    fn any_error_text_is_failure() {
        let out = ExecutionOutput {
            output: String::new(),
            error: "Traceback (most recent call last): ...".to_string(),
        };
        assert!(out.indicates_failure());
    }

    #[test]
    fn any_stdout_is_failure() {
        // Stdout from generated code is treated as suspect by the loop.
        let out = ExecutionOutput {
            output: "debug print\n".to_string(),
            error: String::new(),
        };
        assert!(out.indicates_failure());
    }

    #[test]
    fn execute_request_omits_absent_execution_id() {
        let req = ExecuteRequest {
            code: "pass".to_string(),
            execution_id: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("execution_id").is_none());

        let parsed: ExecuteRequest = serde_json::from_str(r#"{"code": "pass"}"#).unwrap();
        assert!(parsed.execution_id.is_none());
    }
}
