//! mcp-lanhu server entry point.
//!
//! Loads configuration, builds the shared caches and board, and serves MCP on
//! stdio. Logging goes to stderr to avoid interfering with the JSON-RPC
//! protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

use lanhu_core::AppConfig;

mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        data_dir = %config.data_dir.display(),
        render_enabled = config.render_enabled,
        user = %config.user_name,
        "Starting mcp-lanhu server on stdio transport"
    );

    let state = state::AppState::new(config).await?;
    let handler = handler::LanhuServer::new(Arc::new(state));
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
