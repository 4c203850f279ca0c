// ABOUTME: Append-only audit trail for LLM interactions and code executions
// ABOUTME: Content files plus one JSON record per step, keyed by interaction id

use chrono::Utc;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// Writes every loop step to disk as it happens.
///
/// Nothing is ever rewritten: each file name carries a UTC timestamp and a
/// short random id, so repeated steps of one interaction never collide.
#[derive(Debug, Clone)]
pub struct InteractionLogger {
    log_dir: PathBuf,
}

impl InteractionLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> io::Result<Self> {
        let log_dir = log_dir.into();
        std::fs::create_dir_all(&log_dir)?;
        Ok(Self { log_dir })
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Save content under `{YYYYmmdd_HHMMSS}_{8-char-id}_{label}` and return
    /// the path written.
    async fn save_content(&self, content: &str, label: &str) -> io::Result<PathBuf> {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let unique_id = Uuid::new_v4().simple().to_string()[..8].to_string();
        let path = self.log_dir.join(format!("{}_{}_{}", timestamp, unique_id, label));

        tokio::fs::write(&path, content).await?;
        Ok(path)
    }

    async fn save_entry(&self, entry: &Value, label: &str) -> io::Result<()> {
        let rendered = serde_json::to_string_pretty(entry)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.save_content(&rendered, label).await?;
        Ok(())
    }

    /// Record one LLM round: the prompt, and whatever of the response and
    /// extracted code exists at this step.
    pub async fn log_llm_interaction(
        &self,
        interaction_id: &str,
        prompt: &str,
        response: Option<&str>,
        extracted_code: Option<&str>,
        metadata: Value,
    ) -> io::Result<()> {
        let prompt_path = self.save_content(prompt, "prompt.txt").await?;
        let response_path = match response {
            Some(text) => Some(self.save_content(text, "response.txt").await?),
            None => None,
        };
        let code_path = match extracted_code {
            Some(code) => Some(self.save_content(code, "code.py").await?),
            None => None,
        };

        info!("LLM interaction {}:", interaction_id);
        info!("- Prompt saved to: {}", prompt_path.display());
        if let Some(path) = &response_path {
            info!("- Response saved to: {}", path.display());
        }
        if let Some(path) = &code_path {
            info!("- Extracted code saved to: {}", path.display());
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "interaction_id": interaction_id,
            "type": "llm_interaction",
            "prompt_file": prompt_path.display().to_string(),
            "response_file": response_path.map(|p| p.display().to_string()),
            "extracted_code_file": code_path.map(|p| p.display().to_string()),
            "metadata": metadata,
        });
        self.save_entry(&entry, &format!("interaction_{}.json", interaction_id))
            .await
    }

    /// Record one execution round: the code that ran and what came back.
    pub async fn log_execution(
        &self,
        interaction_id: &str,
        code: &str,
        output: Option<&str>,
        error: Option<&str>,
        metadata: Value,
    ) -> io::Result<()> {
        let code_path = self.save_content(code, "executed_code.py").await?;
        let output_path = match output.filter(|text| !text.is_empty()) {
            Some(text) => Some(self.save_content(text, "execution_output.txt").await?),
            None => None,
        };
        let error_path = match error.filter(|text| !text.is_empty()) {
            Some(text) => Some(self.save_content(text, "execution_error.txt").await?),
            None => None,
        };

        info!("Code execution for interaction {}:", interaction_id);
        info!("- Code saved to: {}", code_path.display());
        if let Some(path) = &output_path {
            info!("- Output saved to: {}", path.display());
        }
        if let Some(path) = &error_path {
            warn!("- Error saved to: {}", path.display());
        }

        let entry = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "interaction_id": interaction_id,
            "type": "execution",
            "code_file": code_path.display().to_string(),
            "output_file": output_path.map(|p| p.display().to_string()),
            "error_file": error_path.map(|p| p.display().to_string()),
            "metadata": metadata,
        });
        self.save_entry(&entry, &format!("execution_{}.json", interaction_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn list_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn llm_interaction_writes_content_files_and_record() {
        let dir = tempfile::tempdir().unwrap();
        let logger = InteractionLogger::new(dir.path()).unwrap();

        logger
            .log_llm_interaction(
                "abc-1",
                "write a test",
                Some("```python\npass\n```"),
                Some("pass"),
                json!({"type": "code_extraction", "test_number": "1"}),
            )
            .await
            .unwrap();

        let names = list_files(dir.path());
        assert_eq!(names.len(), 4);
        assert!(names.iter().any(|n| n.ends_with("_prompt.txt")));
        assert!(names.iter().any(|n| n.ends_with("_response.txt")));
        assert!(names.iter().any(|n| n.ends_with("_code.py")));
        assert!(names.iter().any(|n| n.ends_with("_interaction_abc-1.json")));
    }

    #[tokio::test]
    async fn record_points_at_saved_content() {
        let dir = tempfile::tempdir().unwrap();
        let logger = InteractionLogger::new(dir.path()).unwrap();

        logger
            .log_execution(
                "abc-2",
                "print('x')",
                Some("x\n"),
                Some(""),
                json!({"attempt": 0}),
            )
            .await
            .unwrap();

        let names = list_files(dir.path());
        // Empty error text produces no error file.
        assert_eq!(names.len(), 3);

        let record_name = names
            .iter()
            .find(|n| n.ends_with("_execution_abc-2.json"))
            .unwrap();
        let record: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join(record_name)).unwrap())
                .unwrap();

        assert_eq!(record["type"], "execution");
        assert_eq!(record["interaction_id"], "abc-2");
        assert_eq!(record["metadata"]["attempt"], 0);
        assert!(record["error_file"].is_null());

        let code_file = record["code_file"].as_str().unwrap();
        assert_eq!(std::fs::read_to_string(code_file).unwrap(), "print('x')");
    }

    #[tokio::test]
    async fn repeated_steps_never_collide() {
        let dir = tempfile::tempdir().unwrap();
        let logger = InteractionLogger::new(dir.path()).unwrap();

        for attempt in 0..3 {
            logger
                .log_execution("abc-3", "code", Some("out"), None, json!({"attempt": attempt}))
                .await
                .unwrap();
        }

        let records = list_files(dir.path())
            .into_iter()
            .filter(|n| n.ends_with("_execution_abc-3.json"))
            .count();
        assert_eq!(records, 3);
    }
}
