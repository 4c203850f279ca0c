// ABOUTME: Crucible sandbox service crate
// ABOUTME: Wires the execution store, interpreter, and LaTeX engine into an axum router

pub mod config;
pub mod error;
pub mod executions;
pub mod handlers;
pub mod interpreter;
pub mod latex;

// Re-export key types for easier use
pub use config::{ConfigError, SandboxConfig};
pub use error::{Result, SandboxError};
pub use executions::{ExecutionStore, UploadedFile};
pub use handlers::SandboxState;
pub use interpreter::Interpreter;
pub use latex::{CompiledLatex, LatexCompiler};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the sandbox router exposing the full wire surface.
pub fn create_router(state: SandboxState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/execute", post(handlers::execute))
        .route("/create-execution", post(handlers::create_execution))
        .route(
            "/list-execution-files/{execution_id}",
            get(handlers::list_execution_files),
        )
        .route(
            "/app/uploads/{execution_id}/{*path}",
            get(handlers::serve_upload),
        )
        .route("/latex-to-pdf", post(handlers::latex_to_pdf))
        .route(
            "/compile-existing-latex",
            post(handlers::compile_existing_latex),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
