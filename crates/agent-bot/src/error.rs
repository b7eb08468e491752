//! Bot Error Types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Environment variable {0} is not set.")]
    MissingEnv(&'static str),

    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database connection timed out after {0}s")]
    ConnectTimeout(u64),

    #[error("Telegram API error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    #[error(transparent)]
    Advisor(#[from] crypto_advisor::AdvisorError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BotError {
    /// Text safe to show a Telegram user, when the error has one
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::Advisor(crypto_advisor::AdvisorError::Agent(e)) => Some(e.user_message()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_advisor::{AdvisorError, AgentError};

    #[test]
    fn test_agent_errors_have_user_text() {
        let err = BotError::from(AdvisorError::Agent(AgentError::RateLimited(
            "slow down".into(),
        )));
        assert_eq!(
            err.user_message().as_deref(),
            Some("You've made too many requests. Please wait a moment.")
        );
    }

    #[test]
    fn test_internal_errors_stay_internal() {
        assert!(BotError::ConnectTimeout(10).user_message().is_none());
        assert!(
            BotError::from(AdvisorError::Config("bad".into()))
                .user_message()
                .is_none()
        );
    }
}
