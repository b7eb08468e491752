//! Host capability detection
//!
//! Probes whether Node servers can run and derives a recommended mode.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::mode::McpMode;
use crate::server::{Runtime, ServerKind};

const NPX_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Check if npx is available for running Node.js MCP servers
pub async fn check_npx() -> bool {
    let status = Command::new("npx")
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status();

    match tokio::time::timeout(NPX_PROBE_TIMEOUT, status).await {
        Ok(Ok(status)) => status.success(),
        Ok(Err(e)) => {
            tracing::debug!("npx not found: {}", e);
            false
        }
        Err(_) => {
            tracing::warn!("⚠ npx probe timed out");
            false
        }
    }
}

/// What kinds of tool servers this host can run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerCapabilities {
    /// False when npx is missing or was not probed
    pub nodejs: bool,

    /// Whether `nodejs` comes from an actual npx probe
    pub npx_probed: bool,

    /// Bundled servers are always available
    pub python: bool,

    /// Node servers keyed by capability (empty without npx)
    pub supported_servers: BTreeMap<String, String>,

    /// Bundled servers keyed by capability
    pub custom: BTreeMap<String, String>,
}

impl ServerCapabilities {
    pub fn from_probe(npx_available: bool) -> Self {
        Self {
            nodejs: npx_available,
            npx_probed: true,
            python: true,
            supported_servers: if npx_available {
                describe(Runtime::Node)
            } else {
                BTreeMap::new()
            },
            custom: describe(Runtime::Native),
        }
    }

    /// Bundled servers only; Node.js support is unknown
    pub fn unprobed() -> Self {
        Self {
            nodejs: false,
            npx_probed: false,
            python: true,
            supported_servers: BTreeMap::new(),
            custom: describe(Runtime::Native),
        }
    }

    pub async fn detect() -> Self {
        Self::from_probe(check_npx().await)
    }

    /// Probe npx only when the mode can use Node servers
    pub async fn for_mode(mode: McpMode) -> Self {
        if mode.needs_npx() {
            Self::detect().await
        } else {
            Self::unprobed()
        }
    }

    /// The mode that uses everything this host supports
    pub fn recommended_setup(&self) -> RecommendedSetup {
        if !self.npx_probed {
            return RecommendedSetup {
                mode: McpMode::Python,
                description: "Bundled market data server; Node.js support was not checked".into(),
                features: vec!["Real-time market data".into()],
                limitations: vec![
                    "Node.js (npx) is not probed in this mode, run pumppie-check-servers".into(),
                ],
            };
        }

        if self.nodejs {
            RecommendedSetup {
                mode: McpMode::Auto,
                description: "Full setup with official Node.js servers and bundled market data"
                    .into(),
                features: vec![
                    "Real-time market data".into(),
                    "Per-user SQLite persistence".into(),
                    "HTTP access to external APIs".into(),
                    "In-memory caching".into(),
                    "File exports".into(),
                ],
                limitations: Vec::new(),
            }
        } else {
            RecommendedSetup {
                mode: McpMode::Python,
                description: "Bundled market data server only".into(),
                features: vec!["Real-time market data".into()],
                limitations: vec![
                    "No persistence between sessions".into(),
                    "No external HTTP requests".into(),
                    "Install Node.js (npx) to enable the official servers".into(),
                ],
            }
        }
    }
}

fn describe(runtime: Runtime) -> BTreeMap<String, String> {
    ServerKind::ALL
        .into_iter()
        .filter(|kind| kind.runtime() == runtime)
        .map(|kind| {
            let (key, description) = kind.capability();
            (key.to_string(), description.to_string())
        })
        .collect()
}

/// Suggested mode for this host
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendedSetup {
    pub mode: McpMode,
    pub description: String,
    pub features: Vec<String>,
    pub limitations: Vec<String>,
}
