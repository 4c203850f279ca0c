// ABOUTME: The execution-verify-repair loop
// ABOUTME: Generates code, executes it, verifies the report contract, and repairs on failure

use crate::audit::InteractionLogger;
use crate::config::RunnerConfig;
use crate::conversation::ConversationStore;
use crate::error::{CycleError, Result};
use crate::reports::{collect_reports, TestReport};
use crucible_ai::CodeGenerator;
use crucible_client::ExecutionClient;
use crucible_core::protocol::ExecutionOutput;
use crucible_core::tree::find_directory;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

const TEST_COMPLETED_MESSAGE: &str =
    "Test execution completed. Results have been generated and can be viewed in the results tab.";

/// Outcome of a full conversational test run.
#[derive(Debug)]
pub struct TestRun {
    pub code: String,
    pub reports: Vec<TestReport>,
}

/// Why one attempt did not pass; feeds the repair prompt for the next one.
enum AttemptFailure {
    /// The run produced error text, or printed to stdout (any stdout counts
    /// as failure alongside stderr).
    Execution(String),
    /// The run was clean but `test_{n}/report.md` never appeared.
    MissingArtifact,
}

impl AttemptFailure {
    fn describe(&self, folder_name: &str) -> String {
        match self {
            AttemptFailure::Execution(details) => details.clone(),
            AttemptFailure::MissingArtifact => format!(
                "execution succeeded but {}/report.md was not created",
                folder_name
            ),
        }
    }
}

/// Drives ask -> execute -> verify -> repair cycles against the sandbox.
///
/// Owns the typed client, the generation capability, the audit trail, and the
/// dependency-injected conversation store. One runner serves many tests;
/// per-test state lives in the store, keyed by test id.
pub struct CycleRunner {
    client: ExecutionClient,
    generator: Arc<dyn CodeGenerator>,
    audit: InteractionLogger,
    conversations: Arc<ConversationStore>,
    config: RunnerConfig,
}

impl CycleRunner {
    pub fn new(
        client: ExecutionClient,
        generator: Arc<dyn CodeGenerator>,
        audit: InteractionLogger,
        conversations: Arc<ConversationStore>,
        config: RunnerConfig,
    ) -> Self {
        Self {
            client,
            generator,
            audit,
            conversations,
            config,
        }
    }

    pub fn conversations(&self) -> &Arc<ConversationStore> {
        &self.conversations
    }

    /// Run one conversational turn of a logical test: record the user
    /// message, render the full-context prompt from the store, run a cycle,
    /// and record the outcome either way.
    pub async fn run_test(
        &self,
        test_id: &str,
        message: &str,
        execution_id: &str,
        validation_id: &str,
    ) -> Result<TestRun> {
        self.conversations.record_user_turn(test_id, message).await;
        let prompt = self.conversations.build_prompt(test_id).await;

        match self
            .run_cycle(&prompt, execution_id, test_id, validation_id)
            .await
        {
            Ok(code) => {
                let reports = collect_reports(&self.client, execution_id, test_id)
                    .await
                    .map_err(CycleError::from_client)?;
                self.conversations
                    .record_assistant_turn(test_id, TEST_COMPLETED_MESSAGE)
                    .await;
                self.conversations
                    .record_attempt(test_id, &code, reports.clone())
                    .await;
                Ok(TestRun { code, reports })
            }
            Err(err) => {
                self.conversations
                    .record_assistant_turn(test_id, &format!("Error executing test: {}", err))
                    .await;
                Err(err)
            }
        }
    }

    /// One full cycle. Returns the code that produced a verified
    /// `test_{test_number}/report.md`, or a terminal error.
    ///
    /// At most `max_attempts` executions and `max_attempts - 1` repair
    /// prompts happen per cycle. Only the first Python-or-untagged code
    /// block of any answer is ever executed.
    pub async fn run_cycle(
        &self,
        prompt: &str,
        execution_id: &str,
        test_number: &str,
        validation_id: &str,
    ) -> Result<String> {
        let interaction_id = Uuid::new_v4().to_string();
        let folder_name = format!("test_{}", test_number);

        self.audit
            .log_llm_interaction(
                &interaction_id,
                prompt,
                None,
                None,
                json!({
                    "test_number": test_number,
                    "execution_id": execution_id,
                    "type": "initial_prompt",
                }),
            )
            .await?;

        let response = self.generator.generate(prompt).await?;
        self.audit
            .log_llm_interaction(
                &interaction_id,
                prompt,
                Some(&response),
                None,
                json!({"type": "llm_response"}),
            )
            .await?;

        let Some(mut code) = first_python_block(self.generator.as_ref(), &response) else {
            self.audit
                .log_execution(
                    &interaction_id,
                    "",
                    None,
                    Some("No code blocks generated"),
                    json!({"type": "error"}),
                )
                .await?;
            return Err(CycleError::NoCodeGenerated);
        };
        self.audit
            .log_llm_interaction(
                &interaction_id,
                prompt,
                Some(&response),
                Some(&code),
                json!({"type": "code_extraction"}),
            )
            .await?;

        let mut executions = 0u32;
        loop {
            // Persist intent: the attempted code must be recoverable even if
            // the process dies mid-execution.
            self.persist_attempt(validation_id, &folder_name, &code)
                .await?;

            let result = self.execute_with_retries(&code, execution_id).await?;
            executions += 1;
            self.audit
                .log_execution(
                    &interaction_id,
                    &code,
                    Some(&result.output),
                    Some(&result.error),
                    json!({
                        "attempt": executions - 1,
                        "execution_id": execution_id,
                    }),
                )
                .await?;

            let failure = if result.indicates_failure() {
                AttemptFailure::Execution(format!("{}{}", result.error, result.output))
            } else if self.artifacts_present(execution_id, &folder_name).await? {
                info!(
                    "Cycle for {} verified after {} execution(s)",
                    folder_name, executions
                );
                return Ok(code);
            } else {
                AttemptFailure::MissingArtifact
            };

            let last_failure = failure.describe(&folder_name);
            if executions >= self.config.max_attempts {
                warn!(
                    "Attempt budget exhausted for {}: {}",
                    folder_name, last_failure
                );
                return Err(CycleError::RetriesExhausted {
                    attempts: executions,
                    last_failure,
                });
            }

            let repair_prompt = match &failure {
                AttemptFailure::Execution(details) => {
                    repair_execution_prompt(details, prompt, &code)
                }
                AttemptFailure::MissingArtifact => {
                    repair_artifact_prompt(prompt, &folder_name, &code)
                }
            };
            let repair_response = self.generator.generate_followup(&repair_prompt).await?;
            let repaired = first_python_block(self.generator.as_ref(), &repair_response);
            self.audit
                .log_llm_interaction(
                    &interaction_id,
                    &repair_prompt,
                    Some(&repair_response),
                    repaired.as_deref(),
                    json!({"type": "repair", "attempt": executions}),
                )
                .await?;

            match repaired {
                Some(fixed) => code = fixed,
                // A repair round with no code ends the cycle even with
                // attempts remaining.
                None => {
                    return Err(CycleError::RetriesExhausted {
                        attempts: executions,
                        last_failure: format!("repair produced no code block; {}", last_failure),
                    })
                }
            }
        }
    }

    async fn persist_attempt(
        &self,
        validation_id: &str,
        folder_name: &str,
        code: &str,
    ) -> Result<()> {
        let dir = self
            .config
            .workspace_root
            .join(validation_id)
            .join("tests")
            .join(folder_name);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join("test_code.py"), code).await?;
        Ok(())
    }

    async fn artifacts_present(&self, execution_id: &str, folder_name: &str) -> Result<bool> {
        let listing = self.list_files_with_retries(execution_id).await?;
        Ok(find_directory(&listing.structure, folder_name)
            .and_then(|folder| folder.child_file("report.md"))
            .is_some())
    }

    async fn execute_with_retries(
        &self,
        code: &str,
        execution_id: &str,
    ) -> Result<ExecutionOutput> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.client.execute(code, Some(execution_id)).await {
                Ok(output) => return Ok(output),
                Err(err) if err.is_retriable() && attempt < self.config.request_retries => {
                    warn!(
                        "Execute request failed (attempt {}/{}): {}",
                        attempt, self.config.request_retries, err
                    );
                }
                Err(err) if err.is_retriable() => {
                    return Err(CycleError::SandboxUnreachable {
                        attempts: attempt,
                        last_error: err,
                    })
                }
                Err(err) => return Err(CycleError::from_client(err)),
            }
        }
    }

    async fn list_files_with_retries(
        &self,
        execution_id: &str,
    ) -> Result<crucible_core::protocol::ExecutionListing> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.client.list_files(execution_id).await {
                Ok(listing) => return Ok(listing),
                Err(err) if err.is_retriable() && attempt < self.config.request_retries => {
                    warn!(
                        "List request failed (attempt {}/{}): {}",
                        attempt, self.config.request_retries, err
                    );
                }
                Err(err) if err.is_retriable() => {
                    return Err(CycleError::SandboxUnreachable {
                        attempts: attempt,
                        last_error: err,
                    })
                }
                Err(err) => return Err(CycleError::from_client(err)),
            }
        }
    }
}

fn first_python_block(generator: &dyn CodeGenerator, text: &str) -> Option<String> {
    generator
        .extract_code_blocks(text)
        .into_iter()
        .find(|block| block.is_python_or_untagged())
        .map(|block| block.content)
}

fn repair_execution_prompt(details: &str, context: &str, code: &str) -> String {
    format!(
        "The code generated had the following error:\n{}\n\n\
         Original conversation and context:\n{}\n\n\
         Please provide a corrected version of this code:\n{}",
        details, context, code
    )
}

fn repair_artifact_prompt(context: &str, folder_name: &str, code: &str) -> String {
    format!(
        "The code executed successfully but did not create the required test folder.\n\n\
         Original conversation and context:\n{}\n\n\
         The code should create a '{}' folder and write results to '{}/report.md'.\n\n\
         Current code:\n{}\n\n\
         Please modify the code to ensure it creates the folder and report file.",
        context, folder_name, folder_name, code
    )
}
