//! Error Types for Crypto Advisor

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {
    /// Agent or provider failure
    #[error(transparent)]
    Agent(#[from] agent_core::AgentError),

    #[error(transparent)]
    Mcp(#[from] agent_mcp::McpError),

    /// Input rejected before reaching an agent
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
