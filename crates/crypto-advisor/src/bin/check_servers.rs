//! Start every tool server this host can run and report what it exposes

use std::process::ExitCode;

use agent_mcp::{McpMode, ServerCapabilities, get_mcp_servers};
use crypto_advisor::diagnostics::check_servers;
use crypto_advisor::init_server_logging;

#[tokio::main]
async fn main() -> ExitCode {
    init_server_logging();

    let capabilities = ServerCapabilities::detect().await;
    if capabilities.nodejs {
        tracing::info!("✓ npx found, official Node.js servers will be checked");
    } else {
        tracing::warn!("✗ npx not found, only bundled servers will be checked");
    }

    let specs = get_mcp_servers(0, McpMode::Auto, capabilities.nodejs);
    let checks = check_servers(&specs).await;

    let mut failed = 0;
    for check in &checks {
        match &check.info {
            Some(info) if check.is_available() => tracing::info!(
                server = %info.name,
                tools = info.tools_count,
                "✓ {} ({})",
                info.tools.join(", "),
                check.command_line
            ),
            _ => {
                failed += 1;
                tracing::error!(
                    server = check.kind.prefix(),
                    error = check.error.as_deref().unwrap_or("unknown error"),
                    "✗ {}: {}",
                    check.command_line,
                    check.install_hint()
                );
            }
        }
    }

    let setup = capabilities.recommended_setup();
    tracing::info!(mode = %setup.mode, "Recommended setup: {}", setup.description);
    for limitation in &setup.limitations {
        tracing::warn!("Limitation: {}", limitation);
    }

    tracing::info!("{}/{} servers available", checks.len() - failed, checks.len());
    if failed == 0 && capabilities.nodejs {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
