// ABOUTME: Extracts fenced code blocks from model output
// ABOUTME: Line-anchored triple-backtick fences with an optional language tag

use once_cell::sync::Lazy;
use regex::Regex;

// Matches: ```language (optional) \n content \n```
static CODE_BLOCK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?ms)^```\s*([a-zA-Z0-9+#_-]*)\s*\n(.*?)\n\s*```")
        .expect("code block pattern is valid")
});

/// A fenced code block lifted out of markdown text.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub content: String,
}

impl CodeBlock {
    /// Blocks the model left untagged are assumed to be the Python it was
    /// asked for; anything tagged otherwise is prose or shell noise.
    pub fn is_python_or_untagged(&self) -> bool {
        match &self.language {
            None => true,
            Some(language) => language.eq_ignore_ascii_case("python"),
        }
    }
}

/// Parser for extracting code blocks from markdown text.
#[derive(Debug, Default, Clone, Copy)]
pub struct CodeBlockParser;

impl CodeBlockParser {
    pub fn new() -> Self {
        Self
    }

    /// Extract every fenced block in document order. Matches never overlap;
    /// scanning resumes after each closing fence.
    pub fn extract_code_blocks(&self, text: &str) -> Vec<CodeBlock> {
        CODE_BLOCK_PATTERN
            .captures_iter(text)
            .map(|caps| {
                let tag = caps[1].trim();
                CodeBlock {
                    language: if tag.is_empty() {
                        None
                    } else {
                        Some(tag.to_string())
                    },
                    content: caps[2].to_string(),
                }
            })
            .collect()
    }
}
