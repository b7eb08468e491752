//! Test MCP server on stdio

use crypto_advisor::{TestServer, init_server_logging};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_server_logging();
    tracing::info!("Starting PumpPie test MCP server...");

    agent_mcp::serve_stdio(TestServer).await?;
    Ok(())
}
