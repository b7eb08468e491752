//! # crypto-advisor
//!
//! PumpPie: a DCA assistant for crypto investors.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  PumpPieAgent (per Telegram user)                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  conversation │ dca │ portfolio │ market   (agent_core::Agent)│
//! │        │                                                     │
//! │        └── tools: MCP servers chosen by McpMode              │
//! │              ├── server-memory / server-fetch / db / fs (npx)│
//! │              └── market  (pumppie-market-data, bundled)      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Market data, portfolio math and strategies are placeholders: the bundled
//! servers and the `test` model return fixed data.

pub mod agent;
pub mod config;
pub mod dependencies;
pub mod diagnostics;
pub mod error;
pub mod market;
pub mod market_server;
pub mod outputs;
pub mod prompts;
pub mod test_server;

pub use agent::{HealthStatus, PumpPieAgent, SetupInfo};
pub use config::{AgentConfig, DcaConfig, McpServerConfig, RiskManagementConfig};
pub use dependencies::AgentDependencies;
pub use error::{AdvisorError, Result};
pub use market::{MarketDataSource, MockMarketData};
pub use market_server::MarketDataServer;
pub use outputs::{
    AgentResponseOutput, DCAStrategyOutput, DCAStrategyStatus, DcaInterval,
    InvestmentRecommendation, MarketAnalysisOutput, PortfolioPosition, PortfolioStatusOutput,
    PriceLevel, RiskLevel, StrategyState, TechnicalIndicator, TrendDirection,
};
pub use test_server::TestServer;

/// Re-exported so callers can pick a model and mode without extra deps
pub use agent_core::AgentError;
pub use agent_mcp::McpMode;
pub use agent_runtime::LlmModel;

/// Log to stderr; stdout of the server binaries carries protocol messages
pub fn init_server_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
