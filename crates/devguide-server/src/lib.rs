//! devguide Server
//!
//! Serves the guideline documents to AI coding agents over MCP (stdio).

pub mod config;
pub mod context;
pub mod mcp;
pub mod service;

pub use config::Config;
pub use context::AppContext;
pub use mcp::GuidelinesServer;
pub use service::GuidelinesService;

use anyhow::Result;
use rmcp::transport::stdio;
use rmcp::ServiceExt;
use std::sync::Arc;
use tracing::info;

/// Run the MCP server on stdio until the client disconnects or ctrl-c
pub async fn serve_stdio(config: Config) -> Result<()> {
    let context = Arc::new(AppContext::initialize(&config).await?);
    let server = GuidelinesServer::new(GuidelinesService::new(context.clone()));

    info!(
        "Starting {} v{} MCP server on stdio",
        context.server_name, context.version
    );
    let running = server.serve(stdio()).await?;

    tokio::select! {
        reason = running.waiting() => {
            info!("MCP session ended: {:?}", reason?);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    context.shutdown().await;
    Ok(())
}
