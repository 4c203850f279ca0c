// ABOUTME: Typed errors for the code generation backend
// ABOUTME: Distinguishes transport faults, API rejections, and unusable responses

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("ANTHROPIC_API_KEY is not set")]
    NoApiKey,

    #[error("Response contained no content")]
    EmptyResponse,
}

pub type Result<T> = std::result::Result<T, GeneratorError>;
