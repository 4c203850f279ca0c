// ABOUTME: Sandbox service configuration loaded from the environment
// ABOUTME: Covers bind address, upload root, interpreter, and compiler knobs

use crucible_config::constants;
use crucible_config::env::{env_or, parse_env};
use std::num::ParseIntError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_UPLOAD_ROOT: &str = "/app/uploads";
pub const DEFAULT_INTERPRETER: &str = "python3";
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_LATEX_PROGRAM: &str = "pdflatex";
pub const DEFAULT_LATEX_TIMEOUT_SECS: u64 = 120;
/// 32 GiB, sized for large model file uploads.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid port number: {0}")]
    InvalidPort(#[from] ParseIntError),

    #[error("Port {0} is out of valid range (1-65535)")]
    PortOutOfRange(u16),
}

#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub host: String,
    pub port: u16,
    pub upload_root: PathBuf,
    pub interpreter: String,
    pub execution_timeout: Duration,
    pub latex_program: String,
    pub latex_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            upload_root: PathBuf::from(DEFAULT_UPLOAD_ROOT),
            interpreter: DEFAULT_INTERPRETER.to_string(),
            execution_timeout: Duration::from_secs(DEFAULT_EXECUTION_TIMEOUT_SECS),
            latex_program: DEFAULT_LATEX_PROGRAM.to_string(),
            latex_timeout: Duration::from_secs(DEFAULT_LATEX_TIMEOUT_SECS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl SandboxConfig {
    /// Load configuration from environment variables, with defaults for
    /// everything unset. A malformed port fails startup; the remaining knobs
    /// fall back to their defaults with a warning.
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = std::env::var(constants::CRUCIBLE_SANDBOX_PORT)
            .unwrap_or_else(|_| DEFAULT_PORT.to_string())
            .parse::<u16>()?;

        if port == 0 {
            return Err(ConfigError::PortOutOfRange(port));
        }

        Ok(Self {
            host: env_or(constants::CRUCIBLE_SANDBOX_HOST, DEFAULT_HOST),
            port,
            upload_root: PathBuf::from(env_or(
                constants::CRUCIBLE_UPLOAD_ROOT,
                DEFAULT_UPLOAD_ROOT,
            )),
            interpreter: env_or(constants::CRUCIBLE_INTERPRETER, DEFAULT_INTERPRETER),
            execution_timeout: Duration::from_secs(parse_env(
                constants::CRUCIBLE_EXECUTION_TIMEOUT_SECS,
                DEFAULT_EXECUTION_TIMEOUT_SECS,
            )),
            latex_program: env_or(constants::CRUCIBLE_LATEX_PROGRAM, DEFAULT_LATEX_PROGRAM),
            latex_timeout: Duration::from_secs(parse_env(
                constants::CRUCIBLE_LATEX_TIMEOUT_SECS,
                DEFAULT_LATEX_TIMEOUT_SECS,
            )),
            max_upload_bytes: parse_env(
                constants::CRUCIBLE_MAX_UPLOAD_BYTES,
                DEFAULT_MAX_UPLOAD_BYTES,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_reference_values() {
        let config = SandboxConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.interpreter, "python3");
        assert_eq!(config.execution_timeout, Duration::from_secs(300));
        assert_eq!(config.upload_root, PathBuf::from("/app/uploads"));
    }
}
