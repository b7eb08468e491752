//! Supported LLM models

use std::fmt;
use std::str::FromStr;

use agent_core::AgentError;
use serde::{Deserialize, Serialize};

/// Model an agent runs on
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LlmModel {
    /// Offline deterministic model, no API calls
    #[default]
    #[serde(rename = "test")]
    Test,
    #[serde(rename = "gpt-4.1-mini")]
    Gpt41Mini,
}

impl LlmModel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::Gpt41Mini => "gpt-4.1-mini",
        }
    }

    /// All accepted model identifiers
    pub const fn values() -> [&'static str; 2] {
        [Self::Test.as_str(), Self::Gpt41Mini.as_str()]
    }

    pub const fn is_test(self) -> bool {
        matches!(self, Self::Test)
    }
}

impl fmt::Display for LlmModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmModel {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "test" => Ok(Self::Test),
            "gpt-4.1-mini" => Ok(Self::Gpt41Mini),
            other => Err(AgentError::Config(format!(
                "Unknown model '{other}', expected one of {:?}",
                Self::values()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_models() {
        assert_eq!("test".parse::<LlmModel>().unwrap(), LlmModel::Test);
        assert_eq!(
            "gpt-4.1-mini".parse::<LlmModel>().unwrap(),
            LlmModel::Gpt41Mini
        );
    }

    #[test]
    fn test_parse_unknown_model() {
        assert!(matches!(
            "llama3".parse::<LlmModel>(),
            Err(AgentError::Config(_))
        ));
    }

    #[test]
    fn test_values_roundtrip_through_display() {
        for value in LlmModel::values() {
            let model: LlmModel = value.parse().unwrap();
            assert_eq!(model.to_string(), value);
        }
    }
}
