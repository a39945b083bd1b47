//! PDF Stamp MCP Server - Entry point
//!
//! Positional arguments name the directories path sources may read from
//! and output paths may write to.

use pdf_stamp_mcp_server::{run_server_with_config, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_stamp_mcp_server=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting PDF Stamp MCP Server");

    let mut config = ServerConfig::from_env();
    let dirs: Vec<String> = std::env::args().skip(1).collect();
    if !dirs.is_empty() {
        config.resource_dirs = dirs;
    }

    run_server_with_config(config).await
}
