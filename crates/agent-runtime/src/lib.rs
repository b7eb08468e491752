//! # agent-runtime
//!
//! Runtime providers for PumpPie agents.
//!
//! ## Providers
//!
//! - **Test** (default): deterministic offline provider, no network
//! - **OpenAI**: chat completions API (`gpt-4.1-mini`)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{LlmModel, provider_for};
//!
//! let provider = provider_for("gpt-4.1-mini".parse()?)?;
//! let agent = AgentBuilder::<Reply>::new()
//!     .provider(provider)
//!     .build()?;
//! ```

use std::sync::Arc;

pub mod model;
pub mod offline;

#[cfg(feature = "openai")]
pub mod openai;

pub use model::LlmModel;
pub use offline::TestProvider;

#[cfg(feature = "openai")]
pub use openai::{OpenAiConfig, OpenAiProvider};

// Re-export core types for convenience
pub use agent_core::{AgentError, LlmProvider, Message, Result, Role};

/// Build the provider backing a model
pub fn provider_for(model: LlmModel) -> Result<Arc<dyn LlmProvider>> {
    match model {
        LlmModel::Test => Ok(Arc::new(TestProvider::new())),
        #[cfg(feature = "openai")]
        LlmModel::Gpt41Mini => Ok(Arc::new(OpenAiProvider::from_env()?)),
        #[cfg(not(feature = "openai"))]
        LlmModel::Gpt41Mini => Err(AgentError::Config(format!(
            "Model '{model}' requires the openai feature"
        ))),
    }
}
