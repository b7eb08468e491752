//! Market data MCP server on stdio

use crypto_advisor::{MarketDataServer, init_server_logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_server_logging();
    tracing::info!("Starting PumpPie Market Data MCP server...");

    agent_mcp::serve_stdio(MarketDataServer::default()).await?;
    Ok(())
}
