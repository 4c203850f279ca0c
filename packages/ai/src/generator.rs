// ABOUTME: Capability trait for producing code from prompts
// ABOUTME: Backends supply completions; block extraction is shared by default

use crate::error::Result;
use crate::parser::{CodeBlock, CodeBlockParser};
use async_trait::async_trait;

/// A backend that turns prompts into completion text.
///
/// Conversation context travels inside the prompt itself; implementations
/// hold no per-test state and may be shared across cycles.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Produce a completion for an initial prompt.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Produce a completion for a repair prompt. The prompt carries the
    /// original context and the failure being repaired.
    async fn generate_followup(&self, prompt: &str) -> Result<String>;

    /// Lift fenced code blocks out of completion text, in document order.
    fn extract_code_blocks(&self, text: &str) -> Vec<CodeBlock> {
        CodeBlockParser::new().extract_code_blocks(text)
    }
}
