// ABOUTME: HTTP handlers for the sandbox wire surface
// ABOUTME: Thin extractor/response layer over the store, interpreter, and LaTeX engine

use crate::config::SandboxConfig;
use crate::error::{Result, SandboxError};
use crate::executions::{ExecutionStore, UploadedFile};
use crate::interpreter::Interpreter;
use crate::latex::{CompiledLatex, LatexCompiler};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use crucible_core::protocol::{
    CompileLatexRequest, CreatedExecution, ExecuteRequest, ExecutionListing, ExecutionOutput,
    LATEX_WARNINGS_HEADER,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared state for every sandbox route.
#[derive(Clone)]
pub struct SandboxState {
    pub store: Arc<ExecutionStore>,
    pub interpreter: Arc<Interpreter>,
    pub latex: Arc<LatexCompiler>,
}

impl SandboxState {
    pub fn from_config(config: &SandboxConfig) -> Self {
        Self {
            store: Arc::new(ExecutionStore::new(config.upload_root.clone())),
            interpreter: Arc::new(Interpreter::new(
                config.interpreter.clone(),
                config.execution_timeout,
            )),
            latex: Arc::new(LatexCompiler::new(
                config.latex_program.clone(),
                config.latex_timeout,
            )),
        }
    }
}

pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "crucible-sandbox" }))
}

/// `POST /execute` - run submitted code in its own subprocess.
///
/// Always responds 200: faults of the submitted code come back as `error`
/// text in the body, not as an HTTP failure.
pub async fn execute(
    State(state): State<SandboxState>,
    Json(request): Json<ExecuteRequest>,
) -> Json<ExecutionOutput> {
    let workdir = request
        .execution_id
        .as_deref()
        .and_then(|id| state.store.execution_dir(id).ok())
        .unwrap_or_else(|| state.store.upload_root().to_path_buf());

    debug!("Executing submitted code in {}", workdir.display());
    let output = state.interpreter.run(&request.code, &workdir).await;
    Json(output)
}

/// `POST /create-execution` - allocate a directory and store the uploads.
pub async fn create_execution(
    State(state): State<SandboxState>,
    mut multipart: Multipart,
) -> Result<Json<CreatedExecution>> {
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("files") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        files.push(UploadedFile { name, data });
    }

    let created = state.store.create_execution(files).await?;
    Ok(Json(created))
}

/// `GET /list-execution-files/{execution_id}` - recursive snapshot plus stats.
pub async fn list_execution_files(
    State(state): State<SandboxState>,
    Path(execution_id): Path<String>,
) -> Result<Json<ExecutionListing>> {
    let listing = state.store.snapshot(&execution_id).await?;
    Ok(Json(listing))
}

/// `GET /app/uploads/{execution_id}/{*path}` - raw bytes of one artifact.
pub async fn serve_upload(
    State(state): State<SandboxState>,
    Path((execution_id, path)): Path<(String, String)>,
) -> Result<Response> {
    let resolved = state.store.resolve_file(&execution_id, &path)?;
    let bytes = tokio::fs::read(&resolved).await?;
    let content_type = content_type_for(&resolved);
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type)],
        bytes,
    )
        .into_response())
}

/// `POST /latex-to-pdf` - compile inline LaTeX with optional resource files.
pub async fn latex_to_pdf(
    State(state): State<SandboxState>,
    mut multipart: Multipart,
) -> Result<Response> {
    let mut latex = None;
    let mut resources = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        if field_name == "latex" {
            latex = Some(field.text().await?);
        } else if field_name.starts_with("files_") {
            let name = field.file_name().unwrap_or_default().to_string();
            let data = field.bytes().await?;
            resources.push(UploadedFile { name, data });
        }
    }

    let latex = latex.ok_or(SandboxError::NoLatexProvided)?;
    info!("Starting PDF generation");
    let compiled = state.latex.compile_source(&latex, resources).await?;
    Ok(pdf_response("document.pdf", compiled))
}

/// `POST /compile-existing-latex` - compile a `.tex` file already uploaded to
/// an execution directory. The download name follows the source file's stem.
pub async fn compile_existing_latex(
    State(state): State<SandboxState>,
    Json(request): Json<CompileLatexRequest>,
) -> Result<Response> {
    let dir = state.store.execution_dir(&request.execution_id)?;
    let compiled = state.latex.compile_file(&dir, &request.filename).await?;

    let stem = std::path::Path::new(&request.filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    Ok(pdf_response(&format!("{}.pdf", stem), compiled))
}

fn pdf_response(download_name: &str, compiled: CompiledLatex) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    if let Ok(value) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", download_name))
    {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    if !compiled.warnings.is_empty() {
        // First five only; the header is a summary, the log has the rest.
        let joined = compiled
            .warnings
            .iter()
            .take(5)
            .cloned()
            .collect::<Vec<_>>()
            .join("; ");
        if let Ok(value) = HeaderValue::from_str(&joined) {
            headers.insert(HeaderName::from_static(LATEX_WARNINGS_HEADER), value);
        }
    }

    (StatusCode::OK, headers, compiled.pdf).into_response()
}

/// MIME content type from the file extension.
fn content_type_for(path: &std::path::Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        Some("txt") | Some("log") => "text/plain; charset=utf-8",
        Some("md") => "text/markdown; charset=utf-8",
        Some("csv") => "text/csv; charset=utf-8",
        Some("tex") => "text/x-tex; charset=utf-8",
        Some("py") => "text/x-python; charset=utf-8",
        Some("stl") => "model/stl",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn content_types_cover_artifact_formats() {
        assert_eq!(
            content_type_for(Path::new("report.md")),
            "text/markdown; charset=utf-8"
        );
        assert_eq!(content_type_for(Path::new("doc.pdf")), "application/pdf");
        assert_eq!(content_type_for(Path::new("model.stl")), "model/stl");
        assert_eq!(
            content_type_for(Path::new("unknown.xyz")),
            "application/octet-stream"
        );
    }

    #[test]
    fn pdf_response_carries_warning_header() {
        let compiled = CompiledLatex {
            pdf: b"pdf".to_vec(),
            warnings: (0..7).map(|i| format!("warning {}", i)).collect(),
        };
        let response = pdf_response("document.pdf", compiled);
        let header = response
            .headers()
            .get(LATEX_WARNINGS_HEADER)
            .expect("warnings header")
            .to_str()
            .unwrap();
        // Limited to the first five.
        assert_eq!(
            header,
            "warning 0; warning 1; warning 2; warning 3; warning 4"
        );
    }

    #[test]
    fn pdf_response_without_warnings_has_no_header() {
        let compiled = CompiledLatex {
            pdf: b"pdf".to_vec(),
            warnings: vec![],
        };
        let response = pdf_response("paper.pdf", compiled);
        assert!(response.headers().get(LATEX_WARNINGS_HEADER).is_none());
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_DISPOSITION)
                .unwrap()
                .to_str()
                .unwrap(),
            "attachment; filename=\"paper.pdf\""
        );
    }
}
