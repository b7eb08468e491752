//! Structured Outputs
//!
//! Every agent declares the type its final answer must deserialize into.
//! The reasoning loop extracts JSON from the model reply, deserializes it and
//! runs field-level validation before handing the value back.

use serde::de::DeserializeOwned;

use crate::error::{AgentError, Result};

/// A typed agent answer
pub trait StructuredOutput: DeserializeOwned + Send + Sync + 'static {
    /// Schema name used in prompts and errors
    const SCHEMA_NAME: &'static str;

    /// Example JSON object shown to the model
    fn shape_hint() -> serde_json::Value;

    /// Field-level constraints that serde cannot express
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Prompt section telling the model what to answer with
    fn prompt_section() -> String {
        let hint = serde_json::to_string_pretty(&Self::shape_hint()).unwrap_or_default();
        format!(
            "## Final Answer Format\n\nWhen you are done, answer with a single JSON object \
             matching `{}` inside a ```json block:\n\n```json\n{hint}\n```",
            Self::SCHEMA_NAME
        )
    }

    /// Extract, deserialize and validate a model reply
    fn parse_reply(content: &str) -> Result<Self> {
        let json = extract_json(content).ok_or_else(|| {
            AgentError::invalid_output(Self::SCHEMA_NAME, "no JSON object in reply")
        })?;
        let value: Self = serde_json::from_str(json)
            .map_err(|e| AgentError::invalid_output(Self::SCHEMA_NAME, e.to_string()))?;
        value.validate()?;
        Ok(value)
    }
}

/// Check that a score lies in `[0.0, 1.0]`
pub fn ensure_unit_interval(schema: &'static str, field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(AgentError::invalid_output(
            schema,
            format!("{field} must be between 0.0 and 1.0, got {value}"),
        ))
    }
}

/// Find the JSON payload in a model reply: a ```json fence first, then the
/// outermost brace pair.
pub fn extract_json(content: &str) -> Option<&str> {
    const FENCE: &str = "```json";

    if let Some(start) = content.find(FENCE) {
        let body = &content[start + FENCE.len()..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }

    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Score {
        value: f64,
    }

    impl StructuredOutput for Score {
        const SCHEMA_NAME: &'static str = "Score";

        fn shape_hint() -> serde_json::Value {
            serde_json::json!({"value": 0.5})
        }

        fn validate(&self) -> Result<()> {
            ensure_unit_interval(Self::SCHEMA_NAME, "value", self.value)
        }
    }

    #[test]
    fn test_extract_fenced_json() {
        let reply = "Here you go:\n```json\n{\"value\": 0.3}\n```\nThanks";
        assert_eq!(extract_json(reply), Some("{\"value\": 0.3}"));
    }

    #[test]
    fn test_extract_bare_json() {
        assert_eq!(extract_json("ok {\"a\": {\"b\": 1}} done"), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn test_parse_reply_validates() {
        assert!(Score::parse_reply("{\"value\": 0.9}").is_ok());

        let err = Score::parse_reply("{\"value\": 1.5}").unwrap_err();
        assert!(matches!(err, AgentError::OutputValidation { schema: "Score", .. }));
    }

    #[test]
    fn test_prompt_section_names_schema() {
        assert!(Score::prompt_section().contains("`Score`"));
    }
}
