//! # agent-core
//!
//! Core agent logic with provider-agnostic LLM abstraction, an extensible tool
//! system and typed (validated) agent outputs.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Agent<O>                              │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────────┐  │
//! │  │  Reasoning  │  │    Tools    │  │   LlmProvider        │  │
//! │  │    Loop     │──│   Registry  │──│   (Strategy)         │  │
//! │  └──────┬──────┘  └─────────────┘  └──────────────────────┘  │
//! │         ▼                                                    │
//! │  StructuredOutput (parse + validate final answer into O)     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! An agent is a system prompt, the set of tools it may call and the output
//! schema its final answer must satisfy.

pub mod agent;
pub mod error;
pub mod message;
pub mod output;
pub mod provider;
pub mod tool;

pub use agent::{Agent, AgentBuilder, AgentConfig};
pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use output::StructuredOutput;
pub use provider::{GenerationOptions, LlmProvider};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
