// Standalone MCP server binary

use anyhow::{Context, Result};
use sast_sca_core::ScanConfig;
use sast_sca_mcp::server::McpServer;
use sast_sca_mcp::tools::ToolRegistry;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries protocol frames, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::info!("SAST/SCA MCP server starting...");

    let config = ScanConfig::from_env().context("Failed to load configuration")?;

    let registry = ToolRegistry::with_default_tools(&config);
    tracing::info!("Registered {} tools", registry.len());

    // Ctrl-C kills any running scan and ends the loop
    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
            signal.cancel();
        }
    });

    let server = McpServer::new(registry)
        .with_max_frame_bytes(config.server.max_frame_bytes)
        .with_shutdown(shutdown);
    server.start().await?;

    Ok(())
}
