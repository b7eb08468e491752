//! System prompts for the four PumpPie agents
//!
//! Each role lists the tools it may use. A tool line is only shown when the
//! server that provides it is connected, so prompts never advertise tools the
//! agent cannot call.

use std::fmt::Write as _;

use agent_mcp::{McpMode, ServerKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Conversation,
    Dca,
    Portfolio,
    Market,
}

impl AgentRole {
    pub const ALL: [Self; 4] = [Self::Conversation, Self::Dca, Self::Portfolio, Self::Market];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::Dca => "dca",
            Self::Portfolio => "portfolio",
            Self::Market => "market",
        }
    }
}

/// A tool mention gated on a server prefix
struct ToolLine {
    requires: &'static str,
    text: &'static str,
}

const fn line(requires: &'static str, text: &'static str) -> ToolLine {
    ToolLine { requires, text }
}

const DCA_TOOLS: &[ToolLine] = &[
    line("market", "market_get_asset_price: Get current crypto prices"),
    line("market", "market_calculate_technical_indicators: Technical analysis"),
    line("market", "market_analyze_volatility: Risk assessment"),
    line("db", "db_*: Save/retrieve DCA strategies"),
    line("server-fetch", "server-fetch_fetch: API calls to exchanges/data providers"),
    line("server-memory", "server-memory_*: Cache analysis results"),
];

const PORTFOLIO_TOOLS: &[ToolLine] = &[
    line("market", "market_*: Current market prices and analysis"),
    line("db", "db_*: Get user portfolio data and positions"),
    line("server-fetch", "server-fetch_fetch: Get additional market data"),
    line("server-memory", "server-memory_*: Cache portfolio calculations"),
    line("fs", "fs_write_file: Export portfolio reports"),
];

const MARKET_TOOLS: &[ToolLine] = &[
    line("market", "market_get_asset_price: Current prices and basic info"),
    line("market", "market_get_price_history: Historical data"),
    line("market", "market_calculate_technical_indicators: RSI, SMA, EMA analysis"),
    line("market", "market_get_market_sentiment: Fear/greed index"),
    line("server-fetch", "server-fetch_fetch: Additional API calls to data providers"),
    line("server-memory", "server-memory_*: Cache analysis for performance"),
];

const CONVERSATION_INTRO: &str = "\
You are PumpPie, a friendly and professional AI assistant specialized in \
cryptocurrency investment and Dollar Cost Averaging (DCA) strategies.

Your role:
- Help users understand DCA investment strategies
- Provide market insights and analysis
- Guide users through portfolio management
- Always prioritize user financial safety and education";

const DCA_INTRO: &str = "\
You are a DCA strategy specialist within PumpPie. Your expertise is creating \
and analyzing Dollar Cost Averaging investment strategies for cryptocurrency assets.

Your responsibilities:
- Analyze market conditions for DCA suitability using market_* tools
- Create detailed DCA strategy recommendations
- Calculate risk metrics and position sizing
- Provide entry/exit conditions and risk management rules

Always include proper risk assessment and never recommend investments beyond user's means.";

const PORTFOLIO_INTRO: &str = "\
You are a portfolio management specialist within PumpPie. You analyze and \
optimize cryptocurrency investment portfolios.

Your responsibilities:
- Analyze current portfolio performance
- Calculate risk metrics and diversification scores
- Provide rebalancing recommendations
- Monitor active DCA strategies performance";

const MARKET_INTRO: &str = "\
You are a market analysis specialist within PumpPie. You provide comprehensive \
cryptocurrency market analysis and insights.

Your responsibilities:
- Analyze market trends using available tools
- Assess market sentiment and volatility
- Provide investment timing recommendations
- Identify support/resistance levels and entry points";

/// Build the system prompt for a role given the connected server prefixes
pub fn system_prompt(role: AgentRole, mode: McpMode, active_prefixes: &[&str]) -> String {
    let (intro, outro) = match role {
        AgentRole::Conversation => (
            CONVERSATION_INTRO,
            Some("Always be helpful, educational, and emphasize risk management."),
        ),
        AgentRole::Dca => (DCA_INTRO, None),
        AgentRole::Portfolio => (
            PORTFOLIO_INTRO,
            Some("Focus on risk management, diversification, and long-term wealth building."),
        ),
        AgentRole::Market => (
            MARKET_INTRO,
            Some("Base your analysis on technical indicators, market data, and sentiment analysis."),
        ),
    };

    let tools = tool_lines(role, active_prefixes);

    let mut prompt = format!("{intro}\n\nAvailable tools ({mode} mode):\n");
    if tools.is_empty() {
        prompt.push_str("- none\n");
    }
    for tool in tools {
        let _ = writeln!(prompt, "- {tool}");
    }
    if let Some(outro) = outro {
        let _ = write!(prompt, "\n{outro}");
    }
    prompt
}

fn tool_lines(role: AgentRole, active_prefixes: &[&str]) -> Vec<String> {
    let table = match role {
        // Everything connected, described by capability
        AgentRole::Conversation => {
            return ServerKind::ALL
                .into_iter()
                .filter(|kind| active_prefixes.contains(&kind.prefix()))
                .map(|kind| format!("{}_*: {}", kind.prefix(), kind.capability().1))
                .collect();
        }
        AgentRole::Dca => DCA_TOOLS,
        AgentRole::Portfolio => PORTFOLIO_TOOLS,
        AgentRole::Market => MARKET_TOOLS,
    };

    table
        .iter()
        .filter(|l| active_prefixes.contains(&l.requires))
        .map(|l| l.text.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_servers_lists_none() {
        for role in AgentRole::ALL {
            let prompt = system_prompt(role, McpMode::Test, &[]);
            assert!(prompt.contains("Available tools (test mode):\n- none"), "{prompt}");
        }
    }

    #[test]
    fn test_dca_lines_follow_prefixes() {
        let bundled = system_prompt(AgentRole::Dca, McpMode::Python, &["market"]);
        assert!(bundled.contains("market_analyze_volatility"));
        assert!(!bundled.contains("db_*"));

        let full = system_prompt(
            AgentRole::Dca,
            McpMode::Auto,
            &["server-memory", "server-fetch", "db", "fs", "market"],
        );
        assert!(full.contains("(auto mode)"));
        assert!(full.contains("db_*: Save/retrieve DCA strategies"));
        assert!(full.contains("server-memory_*"));
        assert!(!full.contains("fs_write_file"));
    }

    #[test]
    fn test_portfolio_exports_need_fs() {
        let with_fs = system_prompt(AgentRole::Portfolio, McpMode::Nodejs, &["fs"]);
        assert!(with_fs.contains("fs_write_file"));
        assert!(with_fs.ends_with("long-term wealth building."));
    }

    #[test]
    fn test_conversation_describes_connected_servers() {
        let prompt = system_prompt(AgentRole::Conversation, McpMode::Auto, &["market", "db"]);
        assert!(prompt.contains("- db_*:"));
        assert!(prompt.contains("- market_*:"));
        assert!(!prompt.contains("server-fetch"));
        assert!(prompt.starts_with("You are PumpPie"));
    }
}
