// ABOUTME: Runs submitted code as one isolated subprocess per call
// ABOUTME: Captures stdout/stderr as text; code faults become error text, never HTTP failures

use crucible_core::protocol::ExecutionOutput;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Executes submitted code with the configured interpreter program.
#[derive(Debug, Clone)]
pub struct Interpreter {
    program: String,
    timeout: Duration,
}

impl Interpreter {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Run `code` with `workdir` as the working directory.
    ///
    /// Every fault of the submitted code (nonzero exit, timeout, failure to
    /// start the interpreter) is reported as `error` text; the call itself
    /// never fails.
    pub async fn run(&self, code: &str, workdir: &Path) -> ExecutionOutput {
        let script = match tempfile::Builder::new()
            .prefix("crucible-")
            .suffix(".py")
            .tempfile()
        {
            Ok(file) => file,
            Err(e) => return fault(format!("Failed to stage code for execution: {}", e)),
        };
        if let Err(e) = std::fs::write(script.path(), code) {
            return fault(format!("Failed to stage code for execution: {}", e));
        }

        debug!(
            "Running {} {} in {}",
            self.program,
            script.path().display(),
            workdir.display()
        );

        let child = Command::new(&self.program)
            .arg(script.path())
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                return fault(format!(
                    "Failed to start interpreter {}: {}",
                    self.program, e
                ))
            }
        };

        match timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(out)) => {
                let output = String::from_utf8_lossy(&out.stdout).into_owned();
                let mut error = String::from_utf8_lossy(&out.stderr).into_owned();
                if !out.status.success() && error.is_empty() {
                    error = format!("Process exited with {}", out.status);
                }
                ExecutionOutput { output, error }
            }
            Ok(Err(e)) => fault(format!("Failed to collect process output: {}", e)),
            Err(_) => {
                warn!(
                    "Execution timed out after {} seconds",
                    self.timeout.as_secs()
                );
                fault(format!(
                    "Execution timed out after {} seconds",
                    self.timeout.as_secs()
                ))
            }
        }
    }
}

fn fault(error: String) -> ExecutionOutput {
    ExecutionOutput {
        output: String::new(),
        error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    // Tests drive the interpreter with `sh` so they run without Python.
    fn sh() -> Interpreter {
        Interpreter::new("sh", Duration::from_secs(10))
    }

    #[tokio::test]
    async fn captures_stdout() {
        let temp = TempDir::new().expect("temp dir");
        let out = sh().run("echo ok", temp.path()).await;
        assert_eq!(out.output, "ok\n");
        assert_eq!(out.error, "");
    }

    #[tokio::test]
    async fn captures_stderr_from_failing_code() {
        let temp = TempDir::new().expect("temp dir");
        let out = sh().run("echo broken >&2; exit 3", temp.path()).await;
        assert!(out.error.contains("broken"));
    }

    #[tokio::test]
    async fn silent_success_produces_empty_output_and_error() {
        let temp = TempDir::new().expect("temp dir");
        let out = sh().run("true", temp.path()).await;
        assert_eq!(out.output, "");
        assert_eq!(out.error, "");
        assert!(!out.indicates_failure());
    }

    #[tokio::test]
    async fn nonzero_exit_without_stderr_is_still_reported() {
        let temp = TempDir::new().expect("temp dir");
        let out = sh().run("exit 9", temp.path()).await;
        assert!(out.error.contains("exit"));
    }

    #[tokio::test]
    async fn runs_in_the_given_working_directory() {
        let temp = TempDir::new().expect("temp dir");
        std::fs::write(temp.path().join("marker.txt"), "from workdir").unwrap();
        let out = sh().run("cat marker.txt", temp.path()).await;
        assert_eq!(out.output, "from workdir");
    }

    #[tokio::test]
    async fn code_can_write_artifacts_into_the_working_directory() {
        let temp = TempDir::new().expect("temp dir");
        let out = sh()
            .run("mkdir -p test_1 && printf done > test_1/report.md", temp.path())
            .await;
        assert!(!out.indicates_failure());
        assert_eq!(
            std::fs::read_to_string(temp.path().join("test_1/report.md")).unwrap(),
            "done"
        );
    }

    #[tokio::test]
    async fn timeout_is_reported_as_error_text() {
        let temp = TempDir::new().expect("temp dir");
        let out = Interpreter::new("sh", Duration::from_millis(200))
            .run("sleep 5", temp.path())
            .await;
        assert!(out.error.contains("timed out"));
    }

    #[tokio::test]
    async fn missing_interpreter_is_reported_as_error_text() {
        let temp = TempDir::new().expect("temp dir");
        let out = Interpreter::new("crucible-no-such-interpreter", Duration::from_secs(1))
            .run("echo hi", temp.path())
            .await;
        assert!(out.error.contains("Failed to start interpreter"));
    }
}
