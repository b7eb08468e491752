//! Offline Test Provider
//!
//! Deterministic provider backing the `test` model. It never calls a tool and
//! answers with the example object from the agent's answer-format section, so
//! every agent gets a schema-valid reply without network access.

use agent_core::{
    error::Result,
    message::{Message, Role},
    output::extract_json,
    provider::{Completion, GenerationOptions, LlmProvider},
};
use async_trait::async_trait;

const ANSWER_SECTION: &str = "## Final Answer Format";

/// Provider that echoes the requested answer shape
#[derive(Clone, Copy, Debug, Default)]
pub struct TestProvider;

impl TestProvider {
    pub const fn new() -> Self {
        Self
    }

    fn answer_for(messages: &[Message]) -> String {
        let example = messages
            .iter()
            .find(|m| m.role == Role::System)
            .and_then(|m| {
                let start = m.content.find(ANSWER_SECTION)?;
                extract_json(&m.content[start..])
            });

        if let Some(example) = example {
            return example.to_string();
        }

        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map_or("", |m| m.content.as_str());
        serde_json::json!({ "response": format!("Test response to: {prompt}") }).to_string()
    }
}

#[async_trait]
impl LlmProvider for TestProvider {
    fn name(&self) -> &str {
        "test"
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        tracing::trace!(messages = messages.len(), "Test provider completion");
        Ok(Completion::text(
            Self::answer_for(messages),
            options.model.clone(),
        ))
    }
}
