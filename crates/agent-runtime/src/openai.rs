//! OpenAI LLM Provider
//!
//! Implementation of `LlmProvider` for OpenAI-compatible chat completion APIs.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, TokenUsage},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// OpenAI provider configuration
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: String,

    /// API base URL, without trailing slash
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.into(),
            timeout_secs: 120,
        }
    }

    /// Read `OPENAI_API_KEY` and optional `OPENAI_BASE_URL`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AgentError::Config("OPENAI_API_KEY is not set".into()))?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        Ok(config)
    }
}

/// OpenAI chat completions provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop: &'a [String],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl OpenAiProvider {
    pub fn from_config(config: OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(OpenAiConfig::from_env()?)
    }

    /// Convert agent messages to chat format
    fn convert_messages(messages: &[Message]) -> Vec<ChatMessage<'_>> {
        messages
            .iter()
            .map(|m| ChatMessage {
                role: match m.role {
                    Role::System => "system",
                    // Tool output is plain context for the model
                    Role::User | Role::Tool => "user",
                    Role::Assistant => "assistant",
                },
                content: &m.content,
            })
            .collect()
    }

    fn convert_finish_reason(reason: Option<&str>) -> Option<FinishReason> {
        reason.map(|r| match r {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "tool_calls" | "function_call" => FinishReason::ToolUse,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Error,
        })
    }

    fn map_send_error(&self, err: &reqwest::Error) -> AgentError {
        if err.is_timeout() {
            AgentError::Timeout(self.config.timeout_secs)
        } else if err.is_connect() {
            AgentError::ProviderUnavailable(err.to_string())
        } else {
            AgentError::Provider(err.to_string())
        }
    }

    fn map_status(status: StatusCode, body: String) -> AgentError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AgentError::Auth(body),
            StatusCode::TOO_MANY_REQUESTS => AgentError::RateLimited(body),
            s if s.is_server_error() => AgentError::ProviderUnavailable(format!("HTTP {s}: {body}")),
            s => AgentError::Provider(format!("HTTP {s}: {body}")),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/models", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => Ok(true),
            Ok(r) => {
                tracing::warn!(status = %r.status(), "OpenAI health check failed");
                Ok(false)
            }
            Err(e) => {
                tracing::warn!("OpenAI health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = ChatRequest {
            model: &options.model,
            messages: Self::convert_messages(messages),
            temperature: options.temperature,
            top_p: options.top_p,
            max_tokens: options.max_tokens,
            stop: &options.stop_sequences,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::map_status(status, body));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(e.to_string()))?;

        let choice = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("Empty choices in response".into()))?;

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            model: body.model,
            usage: body.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: Self::convert_finish_reason(choice.finish_reason.as_deref()),
        })
    }
}
