// ABOUTME: Code generation capability and its Anthropic Claude backend
// ABOUTME: Prompt-in, completion-out, with shared fenced-code-block extraction

pub mod claude;
pub mod error;
pub mod generator;
pub mod parser;

pub use claude::ClaudeGenerator;
pub use error::{GeneratorError, Result};
pub use generator::CodeGenerator;
pub use parser::{CodeBlock, CodeBlockParser};
