//! Error Types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, McpError>;

#[derive(Error, Debug)]
pub enum McpError {
    /// No session registered under this name
    #[error("Server {0} not connected")]
    NotConnected(String),

    #[error("Unknown MCP mode '{0}', expected one of test, auto, nodejs, python")]
    UnknownMode(String),

    /// Server process could not be started
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Malformed or unexpected message
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON-RPC error object returned by the server
    #[error("Server error {code}: {message}")]
    Remote { code: i64, message: String },

    /// No response within the request timeout
    #[error("Request '{method}' timed out after {secs}s")]
    Timeout { method: String, secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
