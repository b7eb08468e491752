//! Reasoning Loop
//!
//! ReAct (Reason + Act) loop with a typed final answer. The agent asks the
//! provider, runs any requested tool, feeds the result back and repeats until
//! the model produces a reply that parses into the agent's output type.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};
use crate::output::StructuredOutput;
use crate::provider::{GenerationOptions, LlmProvider};
use crate::tool::{Tool, ToolCall, ToolRegistry, ToolResult};

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Agent name used in logs
    pub name: String,

    /// System prompt template
    pub system_prompt: String,

    /// Maximum reasoning iterations (tool calls + output retries)
    pub max_iterations: usize,

    pub generation: GenerationOptions,

    /// Whether to append tool descriptions to system prompt
    pub inject_tool_descriptions: bool,

    /// Per-completion timeout
    pub request_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: "agent".into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: 10,
            generation: GenerationOptions::default(),
            inject_tool_descriptions: true,
            request_timeout: Duration::from_secs(120),
        }
    }
}

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Be concise and accurate.";

/// An LLM-driven agent producing values of type `O`
pub struct Agent<O: StructuredOutput> {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
    _output: PhantomData<fn() -> O>,
}

impl<O: StructuredOutput> Agent<O> {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
            _output: PhantomData,
        }
    }

    /// Full system prompt: template, tool section, answer format
    pub fn system_prompt(&self) -> String {
        let mut prompt = self.config.system_prompt.clone();

        if self.config.inject_tool_descriptions && !self.tools.is_empty() {
            prompt.push_str("\n\n");
            prompt.push_str(&self.tools.generate_prompt_section());
        }

        prompt.push_str("\n\n");
        prompt.push_str(&O::prompt_section());
        prompt
    }

    /// Run the agent on a single user prompt
    pub async fn run(&self, prompt: &str) -> Result<O> {
        let mut conversation = Conversation::with_system_prompt(self.system_prompt());
        conversation.push(Message::user(prompt));
        self.run_conversation(&mut conversation).await
    }

    /// Continue an existing conversation until a valid answer is produced
    pub async fn run_conversation(&self, conversation: &mut Conversation) -> Result<O> {
        let mut iterations = 0;

        loop {
            iterations += 1;
            if iterations > self.config.max_iterations {
                return Err(AgentError::MaxIterations(self.config.max_iterations));
            }

            conversation.truncate_to_fit();
            let completion = tokio::time::timeout(
                self.config.request_timeout,
                self.provider
                    .complete(conversation.messages(), &self.config.generation),
            )
            .await
            .map_err(|_| AgentError::Timeout(self.config.request_timeout.as_secs()))??;

            let content = completion.content;
            conversation.push(Message::assistant(&content));

            if let Some(tool_call) = parse_tool_call(&content) {
                tracing::debug!(agent = %self.config.name, tool = %tool_call.name, "Executing tool");

                let result = self.execute_tool(&tool_call).await;
                conversation.push(Message::tool(format_tool_result(&result), tool_call.id));
                continue;
            }

            match O::parse_reply(&content) {
                Ok(output) => return Ok(output),
                Err(e) => {
                    tracing::debug!(agent = %self.config.name, error = %e, "Retrying invalid output");
                    conversation.push(Message::user(format!(
                        "Your answer was rejected: {e}. Reply again with only the JSON object."
                    )));
                }
            }
        }
    }

    async fn execute_tool(&self, call: &ToolCall) -> ToolResult {
        match self.tools.execute(call).await {
            Ok(mut result) => {
                result.id.clone_from(&call.id);
                result
            }
            Err(e) => ToolResult {
                name: call.name.clone(),
                id: call.id.clone(),
                success: false,
                output: format!("Error: {e}"),
                data: None,
            },
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Name of the output schema this agent produces
    pub const fn output_schema(&self) -> &'static str {
        O::SCHEMA_NAME
    }
}

/// Parse a tool call from a model reply: a ```tool block, or inline JSON with
/// a `"tool"` key.
fn parse_tool_call(content: &str) -> Option<ToolCall> {
    const TOOL_FENCE: &str = "```tool";

    let mut call = if let Some(start) = content.find(TOOL_FENCE) {
        let after_marker = &content[start + TOOL_FENCE.len()..];
        let end = after_marker.find("```")?;
        serde_json::from_str::<ToolCall>(after_marker[..end].trim()).ok()?
    } else {
        if !content.contains(r#""tool""#) {
            return None;
        }
        let start = content.find('{')?;
        let end = content.rfind('}')?;
        if end <= start {
            return None;
        }
        serde_json::from_str::<ToolCall>(&content[start..=end]).ok()?
    };

    if call.id.is_none() {
        call.id = Some(uuid::Uuid::new_v4().to_string());
    }
    Some(call)
}

fn format_tool_result(result: &ToolResult) -> String {
    if result.success {
        format!("[Tool '{}' returned]\n{}", result.name, result.output)
    } else {
        format!("[Tool '{}' failed]\n{}", result.name, result.output)
    }
}

/// Builder for [`Agent`]
pub struct AgentBuilder<O: StructuredOutput> {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
    _output: PhantomData<fn() -> O>,
}

impl<O: StructuredOutput> Default for AgentBuilder<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: StructuredOutput> AgentBuilder<O> {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: Arc::new(ToolRegistry::new()),
            config: AgentConfig::default(),
            _output: PhantomData,
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        Arc::make_mut(&mut self.tools).register(tool);
        self
    }

    /// Share an existing registry
    #[must_use]
    pub fn tools(mut self, tools: Arc<ToolRegistry>) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    #[must_use]
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    #[must_use]
    pub fn generation(mut self, generation: GenerationOptions) -> Self {
        self.config.generation = generation;
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    #[must_use]
    pub const fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    #[must_use]
    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Agent<O>> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        Ok(Agent::new(provider, self.tools, self.config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Completion;
    use crate::tool::{ParameterSchema, ToolSchema};
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::Mutex;

    /// Replays canned replies in order
    struct ScriptedProvider {
        replies: Mutex<Vec<String>>,
        seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedProvider {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().map(|s| (*s).to_string()).collect()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn complete(
            &self,
            messages: &[Message],
            options: &GenerationOptions,
        ) -> Result<Completion> {
            self.seen.lock().unwrap().push(messages.to_vec());
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| AgentError::Provider("script exhausted".into()))?;
            Ok(Completion::text(reply, options.model.clone()))
        }
    }

    #[derive(Debug, Deserialize)]
    struct Answer {
        response: String,
    }

    impl StructuredOutput for Answer {
        const SCHEMA_NAME: &'static str = "Answer";

        fn shape_hint() -> serde_json::Value {
            serde_json::json!({"response": "text"})
        }
    }

    struct PriceTool;

    #[async_trait]
    impl Tool for PriceTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "market_get_asset_price".into(),
                description: "Get current crypto prices".into(),
                parameters: vec![ParameterSchema::required("symbol", "string", "Asset symbol")],
            }
        }

        async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
            let symbol = call.str_arg("symbol").unwrap_or("BTC");
            Ok(ToolResult::success(
                "market_get_asset_price",
                format!("{symbol}: 43250.50"),
            ))
        }
    }

    #[test]
    fn test_parse_tool_call_block() {
        let content = r#"Let me check that for you.
```tool
{"tool": "market_get_asset_price", "arguments": {"symbol": "BTC"}}
```"#;
        let call = parse_tool_call(content).unwrap();
        assert_eq!(call.name, "market_get_asset_price");
        assert_eq!(call.str_arg("symbol"), Some("BTC"));
        assert!(call.id.is_some());
    }

    #[test]
    fn test_plain_answer_is_not_a_tool_call() {
        assert!(parse_tool_call(r#"{"response": "hello"}"#).is_none());
    }

    #[tokio::test]
    async fn test_run_returns_typed_answer() {
        let provider = Arc::new(ScriptedProvider::new(&[r#"{"response": "hi there"}"#]));
        let agent: Agent<Answer> = AgentBuilder::new().provider(provider).build().unwrap();

        let answer = agent.run("hello").await.unwrap();
        assert_eq!(answer.response, "hi there");
    }

    #[tokio::test]
    async fn test_run_executes_tool_then_answers() {
        let provider = Arc::new(ScriptedProvider::new(&[
            "```tool\n{\"tool\": \"market_get_asset_price\", \"arguments\": {\"symbol\": \"ETH\"}}\n```",
            "```json\n{\"response\": \"ETH looks fine\"}\n```",
        ]));
        let agent: Agent<Answer> = AgentBuilder::new()
            .provider(provider.clone())
            .tool(PriceTool)
            .build()
            .unwrap();

        let answer = agent.run("price of eth?").await.unwrap();
        assert_eq!(answer.response, "ETH looks fine");

        let seen = provider.seen.lock().unwrap();
        let second_call = &seen[1];
        let tool_msg = second_call.last().unwrap();
        assert_eq!(tool_msg.role, crate::message::Role::Tool);
        assert!(tool_msg.content.contains("ETH: 43250.50"));
    }

    #[tokio::test]
    async fn test_invalid_output_is_retried() {
        let provider = Arc::new(ScriptedProvider::new(&[
            "I think the answer is nice",
            r#"{"response": "fixed"}"#,
        ]));
        let agent: Agent<Answer> = AgentBuilder::new().provider(provider).build().unwrap();

        assert_eq!(agent.run("q").await.unwrap().response, "fixed");
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let provider = Arc::new(ScriptedProvider::new(&["nope", "still nope", "never"]));
        let agent: Agent<Answer> = AgentBuilder::new()
            .provider(provider)
            .max_iterations(2)
            .build()
            .unwrap();

        let err = agent.run("q").await.unwrap_err();
        assert!(matches!(err, AgentError::MaxIterations(2)));
    }

    #[test]
    fn test_build_requires_provider() {
        let result: Result<Agent<Answer>> = AgentBuilder::new().build();
        assert!(matches!(result, Err(AgentError::Config(_))));
    }

    #[test]
    fn test_system_prompt_includes_tools_and_format() {
        let provider = Arc::new(ScriptedProvider::new(&[]));
        let agent: Agent<Answer> = AgentBuilder::new()
            .provider(provider)
            .system_prompt("You are PumpPie.")
            .tool(PriceTool)
            .build()
            .unwrap();

        let prompt = agent.system_prompt();
        assert!(prompt.starts_with("You are PumpPie."));
        assert!(prompt.contains("### market_get_asset_price"));
        assert!(prompt.contains("`Answer`"));
    }
}
