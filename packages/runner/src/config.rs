// ABOUTME: Runner configuration for attempt budgets, workspace, and audit paths
// ABOUTME: Loaded from the environment with defaults for everything unset

use crucible_config::constants;
use crucible_config::env::{env_or, parse_env};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;
pub const DEFAULT_REQUEST_RETRIES: u32 = 3;
pub const DEFAULT_WORKSPACE_ROOT: &str = "/app/uploads";
pub const DEFAULT_AUDIT_DIR: &str = "logs/interactions";
pub const DEFAULT_CONVERSATION_TTL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Total executions allowed per cycle (N). Repair prompts are bounded
    /// by N - 1. Always at least 1.
    pub max_attempts: u32,
    /// Transport-level retries per sandbox call, with no backoff. Distinct
    /// from the repair budget above.
    pub request_retries: u32,
    /// Where attempted code is persisted before execution.
    pub workspace_root: PathBuf,
    /// Where the interaction audit trail is written.
    pub audit_dir: PathBuf,
    /// Idle lifetime of conversation entries before eviction.
    pub conversation_ttl: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            request_retries: DEFAULT_REQUEST_RETRIES,
            workspace_root: PathBuf::from(DEFAULT_WORKSPACE_ROOT),
            audit_dir: PathBuf::from(DEFAULT_AUDIT_DIR),
            conversation_ttl: Duration::from_secs(DEFAULT_CONVERSATION_TTL_SECS),
        }
    }
}

impl RunnerConfig {
    pub fn from_env() -> Self {
        Self {
            max_attempts: parse_env(constants::CRUCIBLE_MAX_ATTEMPTS, DEFAULT_MAX_ATTEMPTS).max(1),
            request_retries: parse_env(
                constants::CRUCIBLE_EXECUTION_MAX_RETRIES,
                DEFAULT_REQUEST_RETRIES,
            )
            .max(1),
            workspace_root: PathBuf::from(env_or(
                constants::CRUCIBLE_WORKSPACE_ROOT,
                DEFAULT_WORKSPACE_ROOT,
            )),
            audit_dir: PathBuf::from(env_or(constants::CRUCIBLE_AUDIT_DIR, DEFAULT_AUDIT_DIR)),
            conversation_ttl: Duration::from_secs(parse_env(
                constants::CRUCIBLE_CONVERSATION_TTL_SECS,
                DEFAULT_CONVERSATION_TTL_SECS,
            )),
        }
    }
}
