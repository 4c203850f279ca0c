// ABOUTME: Error taxonomy for the execution-verify-repair loop
// ABOUTME: Terminal cycle outcomes; per-attempt failures surface only as RetriesExhausted

use crucible_ai::GeneratorError;
use crucible_client::ExecutionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CycleError {
    /// Transport failure that outlived the transport retry budget.
    #[error("Execution service unreachable after {attempts} attempts: {last_error}")]
    SandboxUnreachable {
        attempts: u32,
        #[source]
        last_error: ExecutionError,
    },

    /// Unknown execution id or path; surfaced immediately, never retried.
    #[error("Not found: {0}")]
    NotFound(#[source] ExecutionError),

    /// The initial generation produced no usable code block. Terminal.
    #[error("No code blocks generated")]
    NoCodeGenerated,

    /// The attempt budget ran out, or a repair round produced no code.
    #[error("Attempt budget exhausted after {attempts} executions; last failure: {last_failure}")]
    RetriesExhausted { attempts: u32, last_failure: String },

    #[error("Code generation failed: {0}")]
    Generator(#[from] GeneratorError),

    /// Non-retriable client failure outside the taxonomy above.
    #[error("Execution service request failed: {0}")]
    Client(#[source] ExecutionError),

    #[error("Failed to write audit trail: {0}")]
    Audit(#[from] std::io::Error),
}

impl CycleError {
    /// Map a client error that will not be retried to its terminal form.
    pub(crate) fn from_client(err: ExecutionError) -> Self {
        if err.is_not_found() {
            CycleError::NotFound(err)
        } else {
            CycleError::Client(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, CycleError>;
