//! # agent-mcp
//!
//! Model Context Protocol plumbing for PumpPie agents.
//!
//! ```text
//! McpMode ──► get_mcp_servers ──► [McpServerSpec] ──► McpToolset::connect
//!                                                          │
//!                         McpSession (JSON-RPC over stdio) ◄┘
//!                                │
//!                          McpTool (agent_core::Tool, "{prefix}_{tool}")
//! ```
//!
//! The server side ([`serve`]) lets a binary expose a [`ToolHandler`] over
//! its own stdin/stdout.

pub mod bridge;
pub mod capabilities;
pub mod client;
pub mod error;
pub mod mode;
pub mod protocol;
pub mod serve;
pub mod server;

pub use bridge::{McpTool, McpToolset};
pub use capabilities::{RecommendedSetup, ServerCapabilities, check_npx};
pub use client::{McpClient, McpSession, ServerInfo};
pub use error::{McpError, Result};
pub use mode::McpMode;
pub use serve::{ToolHandler, serve, serve_stdio};
pub use server::{McpServerSpec, Runtime, ServerKind, get_mcp_servers};
