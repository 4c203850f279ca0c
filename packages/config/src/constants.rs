// ABOUTME: Environment variable name constants
// ABOUTME: Centralized definitions of all environment variable names used across Crucible

// Sandbox Service Configuration
pub const CRUCIBLE_SANDBOX_HOST: &str = "CRUCIBLE_SANDBOX_HOST";
pub const CRUCIBLE_SANDBOX_PORT: &str = "CRUCIBLE_SANDBOX_PORT";
pub const CRUCIBLE_UPLOAD_ROOT: &str = "CRUCIBLE_UPLOAD_ROOT";
pub const CRUCIBLE_MAX_UPLOAD_BYTES: &str = "CRUCIBLE_MAX_UPLOAD_BYTES";

// Code Execution
pub const CRUCIBLE_INTERPRETER: &str = "CRUCIBLE_INTERPRETER";
pub const CRUCIBLE_EXECUTION_TIMEOUT_SECS: &str = "CRUCIBLE_EXECUTION_TIMEOUT_SECS";

// LaTeX Compilation
pub const CRUCIBLE_LATEX_PROGRAM: &str = "CRUCIBLE_LATEX_PROGRAM";
pub const CRUCIBLE_LATEX_TIMEOUT_SECS: &str = "CRUCIBLE_LATEX_TIMEOUT_SECS";

// Execution Service Client
pub const CRUCIBLE_EXECUTION_SERVICE_URL: &str = "CRUCIBLE_EXECUTION_SERVICE_URL";
pub const CRUCIBLE_EXECUTION_MAX_RETRIES: &str = "CRUCIBLE_EXECUTION_MAX_RETRIES";

// Verify-Repair Loop
pub const CRUCIBLE_MAX_ATTEMPTS: &str = "CRUCIBLE_MAX_ATTEMPTS";
pub const CRUCIBLE_WORKSPACE_ROOT: &str = "CRUCIBLE_WORKSPACE_ROOT";
pub const CRUCIBLE_AUDIT_DIR: &str = "CRUCIBLE_AUDIT_DIR";
pub const CRUCIBLE_CONVERSATION_TTL_SECS: &str = "CRUCIBLE_CONVERSATION_TTL_SECS";

// Code Generation (LLM)
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const CRUCIBLE_LLM_MODEL: &str = "CRUCIBLE_LLM_MODEL";
pub const CRUCIBLE_LLM_TIMEOUT_SECS: &str = "CRUCIBLE_LLM_TIMEOUT_SECS";
pub const CRUCIBLE_LLM_MAX_RETRIES: &str = "CRUCIBLE_LLM_MAX_RETRIES";
