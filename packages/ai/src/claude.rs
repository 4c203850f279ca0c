// ABOUTME: Anthropic Claude backend for the CodeGenerator capability
// ABOUTME: Owns its own transport retry policy with exponential backoff and jitter

use crate::error::{GeneratorError, Result};
use crate::generator::CodeGenerator;
use async_trait::async_trait;
use crucible_config::constants;
use crucible_config::env::{env_or, parse_env};
use rand::Rng;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const DEFAULT_MAX_TOKENS: u32 = 4096;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_MAX_RETRIES: u32 = 3;

const RETRIABLE_STATUS_CODES: [u16; 7] = [408, 429, 500, 502, 503, 504, 529];
const OVERLOADED_MESSAGES: [&str; 3] = [
    "claude is currently overloaded",
    "service temporarily unavailable",
    "too many requests",
];

const INITIAL_RETRY_DELAY_SECS: f64 = 1.0;
const MAX_RETRY_DELAY_SECS: f64 = 60.0;
const RETRY_EXPONENTIAL_BASE: f64 = 2.0;

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

impl Message {
    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: String,
}

/// Claude-backed code generator.
///
/// Stateless between calls; repair context is embedded in the prompts the
/// loop sends rather than accumulated here.
pub struct ClaudeGenerator {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_retries: u32,
}

impl ClaudeGenerator {
    fn create_client(timeout: Duration) -> Client {
        Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client")
    }

    /// Build a generator with an explicit API key; model, timeout, and retry
    /// budget still come from the environment.
    pub fn new(api_key: impl Into<String>) -> Self {
        let model = env_or(constants::CRUCIBLE_LLM_MODEL, DEFAULT_MODEL);
        if model != DEFAULT_MODEL {
            info!("Using custom Anthropic model: {}", model);
        }
        let timeout_secs = parse_env(constants::CRUCIBLE_LLM_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS);
        let max_retries = parse_env(constants::CRUCIBLE_LLM_MAX_RETRIES, DEFAULT_MAX_RETRIES);

        Self {
            client: Self::create_client(Duration::from_secs(timeout_secs)),
            api_key: api_key.into(),
            model,
            base_url: ANTHROPIC_API_URL.to_string(),
            max_retries,
        }
    }

    /// Build a generator from `ANTHROPIC_API_KEY`. A missing key is a typed
    /// error so callers can degrade instead of panicking at first use.
    pub fn from_env() -> Result<Self> {
        let api_key =
            std::env::var(constants::ANTHROPIC_API_KEY).map_err(|_| GeneratorError::NoApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Point the generator at a different endpoint, e.g. a proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, prompt: &str) -> Result<String> {
        let request = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            messages: vec![Message::user(prompt)],
        };

        let mut attempt = 0u32;
        loop {
            match self.send_once(&request).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    if attempt >= self.max_retries || !is_retriable(&err) {
                        return Err(err);
                    }
                    let delay = retry_delay(attempt);
                    warn!(
                        "Anthropic request failed (attempt {}/{}), retrying in {:.2}s: {}",
                        attempt + 1,
                        self.max_retries + 1,
                        delay.as_secs_f64(),
                        err
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn send_once(&self, request: &AnthropicRequest) -> Result<String> {
        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Anthropic API error: {} - {}", status, body);
            return Err(GeneratorError::Api { status, body });
        }

        let parsed: AnthropicResponse = response.json().await?;
        parsed
            .content
            .first()
            .map(|block| block.text.trim().to_string())
            .ok_or(GeneratorError::EmptyResponse)
    }
}

#[async_trait]
impl CodeGenerator for ClaudeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.request(prompt).await
    }

    async fn generate_followup(&self, prompt: &str) -> Result<String> {
        // Context travels inside the prompt; the wire call is identical.
        self.request(prompt).await
    }
}

fn is_retriable(err: &GeneratorError) -> bool {
    match err {
        GeneratorError::RequestFailed(_) => true,
        GeneratorError::Api { status, body } => {
            if RETRIABLE_STATUS_CODES.contains(&status.as_u16()) {
                return true;
            }
            let lowered = body.to_lowercase();
            OVERLOADED_MESSAGES.iter().any(|msg| lowered.contains(msg))
        }
        GeneratorError::NoApiKey | GeneratorError::EmptyResponse => false,
    }
}

/// Exponential backoff capped at the max delay, then jittered upward by as
/// much as 25% to spread concurrent retries.
fn retry_delay(attempt: u32) -> Duration {
    let exponential = INITIAL_RETRY_DELAY_SECS * RETRY_EXPONENTIAL_BASE.powi(attempt as i32);
    let capped = exponential.min(MAX_RETRY_DELAY_SECS);
    let jittered = capped * (1.0 + rand::thread_rng().gen::<f64>() * 0.25);
    Duration::from_secs_f64(jittered)
}
