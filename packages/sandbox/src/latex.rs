// ABOUTME: LaTeX-to-PDF compilation engine shared by both LaTeX routes
// ABOUTME: Injects a UTF-8 preamble, runs two compiler passes, and prefers PDF-on-disk over exit status

use crate::error::{Result, SandboxError};
use crate::executions::{sanitize_filename, UploadedFile};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const DOCUMENT_CLASS: &str = r"\documentclass{article}";
const INPUTENC: &str = r"\usepackage[utf8]{inputenc}";
const FONTENC: &str = r"\usepackage[T1]{fontenc}";

/// A compiled document plus the warning/error lines collected from the log.
#[derive(Debug)]
pub struct CompiledLatex {
    pub pdf: Vec<u8>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LatexCompiler {
    program: String,
    timeout: Duration,
}

impl LatexCompiler {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Compile inline LaTeX source in a fresh scratch directory, writing any
    /// uploaded resource files next to it first.
    pub async fn compile_source(
        &self,
        latex: &str,
        resources: Vec<UploadedFile>,
    ) -> Result<CompiledLatex> {
        let scratch = tempfile::TempDir::new()?;
        for resource in resources {
            let Some(name) = sanitize_filename(&resource.name) else {
                warn!("Skipping resource with unusable filename: {:?}", resource.name);
                continue;
            };
            debug!("Saving LaTeX resource {}", name);
            tokio::fs::write(scratch.path().join(&name), &resource.data).await?;
        }
        self.compile_in(scratch.path(), latex).await
    }

    /// Compile a `.tex` file that already lives in an execution directory.
    /// The compiler runs in place, so its `document.*` byproducts stay in the
    /// execution directory like any other artifact.
    pub async fn compile_file(&self, execution_dir: &Path, filename: &str) -> Result<CompiledLatex> {
        let name = sanitize_filename(filename).ok_or_else(|| SandboxError::InvalidLatexFile {
            filename: filename.to_string(),
        })?;
        let path = execution_dir.join(&name);
        let is_tex = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("tex"))
            .unwrap_or(false);
        if !is_tex || !path.is_file() {
            return Err(SandboxError::InvalidLatexFile { filename: name });
        }

        info!("Compiling existing LaTeX file {}", path.display());
        let source = tokio::fs::read_to_string(&path).await?;
        self.compile_in(execution_dir, &source).await
    }

    async fn compile_in(&self, dir: &Path, source: &str) -> Result<CompiledLatex> {
        let prepared = ensure_utf8_preamble(source);
        tokio::fs::write(dir.join("document.tex"), prepared).await?;

        let mut warnings = Vec::new();
        let mut faults = Vec::new();

        // Two passes so references and the table of contents resolve.
        for pass in 1..=2u8 {
            debug!("LaTeX compilation pass {}", pass);
            let run = Command::new(&self.program)
                .arg("-interaction=nonstopmode")
                .arg("-file-line-error")
                .arg("document.tex")
                .current_dir(dir)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output();

            match timeout(self.timeout, run).await {
                Ok(Ok(out)) => {
                    if !out.status.success() {
                        faults.push(format!("pass {} exited with {}", pass, out.status));
                    }
                }
                Ok(Err(e)) => faults.push(format!("pass {} failed to run: {}", pass, e)),
                Err(_) => faults.push(format!(
                    "pass {} timed out after {} seconds",
                    pass,
                    self.timeout.as_secs()
                )),
            }

            // The log is re-read after every pass, like the warnings surface
            // of the compiler itself. It is frequently not valid UTF-8.
            if let Ok(raw) = std::fs::read(dir.join("document.log")) {
                warnings.extend(collect_log_issues(&String::from_utf8_lossy(&raw)));
            }
        }

        // PDF-on-disk wins over exit status: degraded output beats no output.
        match tokio::fs::read(dir.join("document.pdf")).await {
            Ok(pdf) => {
                if !faults.is_empty() {
                    warn!(
                        "Returning PDF despite compiler faults: {}",
                        faults.join("; ")
                    );
                }
                Ok(CompiledLatex { pdf, warnings })
            }
            Err(_) => {
                let mut details = faults;
                if details.is_empty() {
                    details.push("PDF file was not generated".to_string());
                }
                details.extend(warnings.into_iter().take(5));
                Err(SandboxError::LatexFailed {
                    details: details.join("; "),
                })
            }
        }
    }
}

/// Inject UTF-8 input handling right after `\documentclass{article}` unless
/// the source already loads `inputenc`.
fn ensure_utf8_preamble(source: &str) -> String {
    if source.contains(INPUTENC) {
        return source.to_string();
    }
    source.replace(
        DOCUMENT_CLASS,
        &format!("{}\n{}\n{}", DOCUMENT_CLASS, INPUTENC, FONTENC),
    )
}

/// Warning and error lines from a compiler log, excluding package chatter.
fn collect_log_issues(log: &str) -> Vec<String> {
    log.lines()
        .map(str::trim)
        .filter(|line| {
            let lower = line.to_lowercase();
            (lower.contains("warning") || lower.contains("error"))
                && !line.starts_with("Package")
        })
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn preamble_injected_after_documentclass() {
        let source = "\\documentclass{article}\n\\begin{document}ü\\end{document}";
        let prepared = ensure_utf8_preamble(source);
        assert!(prepared.contains(
            "\\documentclass{article}\n\\usepackage[utf8]{inputenc}\n\\usepackage[T1]{fontenc}"
        ));
    }

    #[test]
    fn preamble_untouched_when_inputenc_present() {
        let source = "\\documentclass{article}\n\\usepackage[utf8]{inputenc}\n";
        assert_eq!(ensure_utf8_preamble(source), source);
    }

    #[test]
    fn preamble_untouched_without_article_class() {
        let source = "\\documentclass{report}\n\\begin{document}x\\end{document}";
        assert_eq!(ensure_utf8_preamble(source), source);
    }

    #[test]
    fn log_issues_skip_package_lines() {
        let log = "This is pdfTeX\nLaTeX Warning: Reference undefined\nPackage hyperref Warning: draft mode\n! Undefined control sequence error\nplain line\n";
        let issues = collect_log_issues(log);
        assert_eq!(
            issues,
            vec![
                "LaTeX Warning: Reference undefined",
                "! Undefined control sequence error"
            ]
        );
    }

    // A stand-in compiler script keeps these tests independent of TeX.
    fn fake_compiler(dir: &TempDir, script_body: &str) -> String {
        let path = dir.path().join("fake-pdflatex");
        std::fs::write(&path, format!("#!/bin/sh\n{}", script_body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn article(body: &str) -> String {
        format!("\\documentclass{{article}}\\begin{{document}}{}\\end{{document}}", body)
    }

    #[tokio::test]
    async fn pdf_on_disk_wins_over_nonzero_exit() {
        let tools = TempDir::new().expect("tools dir");
        let program = fake_compiler(
            &tools,
            "printf fake-pdf > document.pdf\nprintf 'LaTeX Warning: degraded\\nPackage noise Warning: skip me\\n' > document.log\nexit 1\n",
        );

        let compiler = LatexCompiler::new(program, Duration::from_secs(10));
        let compiled = compiler
            .compile_source(&article("x"), vec![])
            .await
            .expect("pdf should win over exit status");

        assert_eq!(compiled.pdf, b"fake-pdf");
        assert!(compiled
            .warnings
            .iter()
            .any(|w| w.contains("LaTeX Warning: degraded")));
        assert!(!compiled.warnings.iter().any(|w| w.starts_with("Package")));
    }

    #[tokio::test]
    async fn missing_pdf_is_a_compilation_failure() {
        let tools = TempDir::new().expect("tools dir");
        let program = fake_compiler(
            &tools,
            "printf '! Emergency stop error\\n' > document.log\nexit 1\n",
        );

        let compiler = LatexCompiler::new(program, Duration::from_secs(10));
        let err = compiler
            .compile_source(&article("x"), vec![])
            .await
            .unwrap_err();

        match err {
            SandboxError::LatexFailed { details } => {
                assert!(details.contains("exited with"));
                assert!(details.contains("Emergency stop"));
            }
            other => panic!("expected LatexFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn resources_are_written_into_the_scratch_directory() {
        let tools = TempDir::new().expect("tools dir");
        // The fake compiler proves the resource landed next to document.tex.
        let program = fake_compiler(&tools, "cp extra.bin document.pdf\n");

        let compiler = LatexCompiler::new(program, Duration::from_secs(10));
        let compiled = compiler
            .compile_source(
                &article("x"),
                vec![UploadedFile {
                    name: "extra.bin".to_string(),
                    data: Bytes::from_static(b"resource-bytes"),
                }],
            )
            .await
            .expect("compile with resource");

        assert_eq!(compiled.pdf, b"resource-bytes");
    }

    #[tokio::test]
    async fn compile_file_requires_an_existing_tex_file() {
        let tools = TempDir::new().expect("tools dir");
        let program = fake_compiler(&tools, "printf pdf > document.pdf\n");
        let compiler = LatexCompiler::new(program, Duration::from_secs(10));

        let execution = TempDir::new().expect("execution dir");
        let err = compiler
            .compile_file(execution.path(), "missing.tex")
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::InvalidLatexFile { .. }));

        std::fs::write(execution.path().join("notes.txt"), "not tex").unwrap();
        let err = compiler
            .compile_file(execution.path(), "notes.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, SandboxError::InvalidLatexFile { .. }));

        std::fs::write(execution.path().join("paper.tex"), article("ok")).unwrap();
        let compiled = compiler
            .compile_file(execution.path(), "paper.tex")
            .await
            .expect("compile existing tex");
        assert_eq!(compiled.pdf, b"pdf");
        // Compilation byproducts stay in the execution directory.
        assert!(execution.path().join("document.tex").exists());
    }
}
