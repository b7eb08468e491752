//! Tool-server table
//!
//! Every server an agent may use is a row of a static table: its runtime, the
//! prefix its tools are exposed under, a capability description and how to
//! launch it. Selecting servers for a mode is a filter over that table.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::mode::McpMode;

/// Binary name of the bundled market data server
pub const MARKET_SERVER_BIN: &str = "pumppie-market-data";

/// How a server process is provided
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    /// Official servers launched through `npx`
    Node,
    /// Servers shipped with this workspace
    Native,
}

/// Known tool servers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerKind {
    Memory,
    Fetch,
    Db,
    Filesystem,
    Market,
}

impl ServerKind {
    /// Table order is launch order
    pub const ALL: [Self; 5] = [
        Self::Memory,
        Self::Fetch,
        Self::Db,
        Self::Filesystem,
        Self::Market,
    ];

    pub const fn runtime(self) -> Runtime {
        match self {
            Self::Market => Runtime::Native,
            _ => Runtime::Node,
        }
    }

    /// Prefix the server's tools are exposed under
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Memory => "server-memory",
            Self::Fetch => "server-fetch",
            Self::Db => "db",
            Self::Filesystem => "fs",
            Self::Market => "market",
        }
    }

    /// Capability key and description
    pub const fn capability(self) -> (&'static str, &'static str) {
        match self {
            Self::Memory => ("memory", "Temporary data storage and caching"),
            Self::Fetch => ("http", "HTTP requests to external APIs"),
            Self::Db => ("sqlite", "SQLite database for data persistence"),
            Self::Filesystem => ("file", "File system operations for logs and exports"),
            Self::Market => ("crypto_market_analysis", "Cryptocurrency market analysis"),
        }
    }

    /// Launch spec for a given user
    pub fn spec(self, user_id: i64) -> McpServerSpec {
        let (command, args) = match self {
            Self::Memory => npx("@modelcontextprotocol/server-memory", &[]),
            Self::Fetch => npx("@modelcontextprotocol/server-fetch", &[]),
            Self::Db => npx(
                "@modelcontextprotocol/server-sqlite",
                &[&format!("data/pumppie_user_{user_id}.db")],
            ),
            Self::Filesystem => npx("@modelcontextprotocol/server-filesystem", &["data/"]),
            Self::Market => (market_server_command(), Vec::new()),
        };

        McpServerSpec {
            kind: self,
            command,
            args,
            tool_prefix: self.prefix().to_string(),
        }
    }
}

fn npx(package: &str, extra: &[&str]) -> (String, Vec<String>) {
    let mut args = vec!["-y".to_string(), package.to_string()];
    args.extend(extra.iter().map(ToString::to_string));
    ("npx".to_string(), args)
}

/// The market server binary next to the running executable, else from `PATH`
fn market_server_command() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(MARKET_SERVER_BIN)))
        .filter(|path: &PathBuf| path.is_file())
        .map_or_else(
            || MARKET_SERVER_BIN.to_string(),
            |path| path.to_string_lossy().into_owned(),
        )
}

/// How to start one tool server
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerSpec {
    pub kind: ServerKind,
    pub command: String,
    pub args: Vec<String>,
    pub tool_prefix: String,
}

/// Select the servers a user's agents may call.
///
/// `npx_available` is only consulted for modes that include Node servers.
pub fn get_mcp_servers(user_id: i64, mode: McpMode, npx_available: bool) -> Vec<McpServerSpec> {
    if mode == McpMode::Test {
        return Vec::new();
    }

    if mode == McpMode::Nodejs && !npx_available {
        tracing::error!("Node.js servers requested but npx not available");
        return Vec::new();
    }

    let node_enabled = mode.allows(Runtime::Node) && npx_available;
    if node_enabled {
        tracing::info!("Adding official Node.js MCP servers");
    }
    if mode.allows(Runtime::Native) {
        tracing::info!("Adding bundled MCP servers");
    }

    ServerKind::ALL
        .into_iter()
        .filter(|kind| match kind.runtime() {
            Runtime::Node => node_enabled,
            Runtime::Native => mode.allows(Runtime::Native),
        })
        .map(|kind| kind.spec(user_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes(specs: &[McpServerSpec]) -> Vec<&str> {
        specs.iter().map(|s| s.tool_prefix.as_str()).collect()
    }

    #[test]
    fn test_mode_yields_no_servers() {
        for npx in [true, false] {
            assert!(get_mcp_servers(7, McpMode::Test, npx).is_empty());
        }
    }

    #[test]
    fn test_auto_with_npx() {
        let servers = get_mcp_servers(7, McpMode::Auto, true);
        assert_eq!(
            prefixes(&servers),
            ["server-memory", "server-fetch", "db", "fs", "market"]
        );
    }

    #[test]
    fn test_auto_without_npx_keeps_bundled() {
        let servers = get_mcp_servers(7, McpMode::Auto, false);
        assert_eq!(prefixes(&servers), ["market"]);
    }

    #[test]
    fn test_nodejs_without_npx_is_empty() {
        assert!(get_mcp_servers(7, McpMode::Nodejs, false).is_empty());
        assert_eq!(get_mcp_servers(7, McpMode::Nodejs, true).len(), 4);
    }

    #[test]
    fn test_python_ignores_npx() {
        assert_eq!(prefixes(&get_mcp_servers(7, McpMode::Python, true)), ["market"]);
    }

    #[test]
    fn test_db_path_is_per_user() {
        let spec = ServerKind::Db.spec(42);
        assert_eq!(spec.command, "npx");
        assert_eq!(
            spec.args,
            ["-y", "@modelcontextprotocol/server-sqlite", "data/pumppie_user_42.db"]
        );
    }
}
