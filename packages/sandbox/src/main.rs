// ABOUTME: Binary entry point for the Crucible sandbox service
// ABOUTME: Loads configuration, binds the listener, and serves the router

use clap::Parser;
use crucible_sandbox::{create_router, SandboxConfig, SandboxState};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "crucible-sandboxd",
    about = "Isolated code execution sandbox service",
    version
)]
struct Cli {
    /// Port to listen on (overrides CRUCIBLE_SANDBOX_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Host address to bind (overrides CRUCIBLE_SANDBOX_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Root directory for execution uploads (overrides CRUCIBLE_UPLOAD_ROOT)
    #[arg(long)]
    upload_root: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    let mut config = SandboxConfig::from_env()?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(upload_root) = cli.upload_root {
        config.upload_root = upload_root;
    }

    tokio::fs::create_dir_all(&config.upload_root).await?;

    let state = SandboxState::from_config(&config);
    let app = create_router(state, config.max_upload_bytes);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!(
        "Crucible sandbox listening on {} (uploads in {})",
        addr,
        config.upload_root.display()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
