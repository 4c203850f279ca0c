// ABOUTME: Execution-verify-repair loop over the sandbox and a code generator
// ABOUTME: Cycle coordination, conversation state, report collection, and audit trail

pub mod audit;
pub mod config;
pub mod conversation;
pub mod cycle;
pub mod error;
pub mod reports;

pub use audit::InteractionLogger;
pub use config::RunnerConfig;
pub use conversation::{Conversation, ConversationStore, Role, TestAttempt, Turn};
pub use cycle::{CycleRunner, TestRun};
pub use error::{CycleError, Result};
pub use reports::{collect_reports, TestReport};
