//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider did not answer within the configured timeout
    #[error("Provider timed out after {0}s")]
    Timeout(u64),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool validation failed
    #[error("Tool validation error: {0}")]
    ToolValidation(String),

    /// Tool execution failed
    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    /// Final answer does not satisfy the agent's output schema
    #[error("Output validation error ({schema}): {reason}")]
    OutputValidation { schema: &'static str, reason: String },

    /// Maximum iterations reached in reasoning loop
    #[error("Maximum iterations ({0}) reached")]
    MaxIterations(usize),

    /// Parse error (e.g., tool call parsing)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Build an output validation error for the given schema
    pub fn invalid_output(schema: &'static str, reason: impl Into<String>) -> Self {
        Self::OutputValidation {
            schema,
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::Timeout(_) | Self::RateLimited(_)
        )
    }

    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) | Self::Timeout(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::ToolValidation(msg) => format!("Invalid tool input: {msg}"),
            Self::ToolExecution(msg) => format!("Tool error: {msg}"),
            Self::MaxIterations(_) => {
                "The request took too long to process. Please try a simpler query.".into()
            }
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AgentError::RateLimited("slow down".into()).is_retryable());
        assert!(AgentError::Timeout(30).is_retryable());
        assert!(!AgentError::invalid_output("X", "bad").is_retryable());
    }

    #[test]
    fn test_output_validation_display() {
        let err = AgentError::invalid_output("DCAStrategyOutput", "confidence out of range");
        assert_eq!(
            err.to_string(),
            "Output validation error (DCAStrategyOutput): confidence out of range"
        );
    }
}
