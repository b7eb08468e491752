//! Remote tools as agent tools
//!
//! Every tool a server advertises becomes an [`agent_core::Tool`] named
//! `{prefix}_{tool}`, so agents call MCP tools the same way they call local
//! ones.

use std::sync::Arc;

use agent_core::{
    error::{AgentError, Result as AgentResult},
    tool::{ParameterSchema, Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema},
};
use async_trait::async_trait;
use serde_json::Value;

use crate::client::{McpClient, McpSession};
use crate::protocol::RemoteTool;
use crate::server::McpServerSpec;

/// One remote tool bound to its session
pub struct McpTool {
    session: Arc<McpSession>,
    prefix: String,
    remote: RemoteTool,
}

impl McpTool {
    pub fn new(session: Arc<McpSession>, prefix: impl Into<String>, remote: RemoteTool) -> Self {
        Self {
            session,
            prefix: prefix.into(),
            remote,
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}_{}", self.prefix, self.remote.name)
    }

    /// Flatten the remote JSON Schema into parameter descriptors
    fn parameters(&self) -> Vec<ParameterSchema> {
        let schema = &self.remote.input_schema;
        let required: Vec<&str> = schema["required"]
            .as_array()
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let Some(properties) = schema["properties"].as_object() else {
            return Vec::new();
        };

        properties
            .iter()
            .map(|(name, prop)| ParameterSchema {
                name: name.clone(),
                param_type: prop["type"].as_str().unwrap_or("string").to_string(),
                description: prop["description"].as_str().unwrap_or_default().to_string(),
                required: required.contains(&name.as_str()),
                default: prop.get("default").cloned(),
            })
            .collect()
    }
}

#[async_trait]
impl Tool for McpTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.qualified_name(),
            description: self.remote.description.clone().unwrap_or_default(),
            parameters: self.parameters(),
        }
    }

    async fn execute(&self, call: &ToolCall) -> AgentResult<ToolResult> {
        let arguments: serde_json::Map<String, Value> = call
            .arguments
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let result = self
            .session
            .call_tool(&self.remote.name, arguments)
            .await
            .map_err(|e| AgentError::ToolExecution(format!("{}: {e}", self.qualified_name())))?;

        let text = result.joined_text();
        Ok(if result.is_error {
            ToolResult::failure(self.qualified_name(), text)
        } else {
            ToolResult::success(self.qualified_name(), text)
        })
    }
}

/// Connected servers and the tools they expose
#[derive(Default)]
pub struct McpToolset {
    client: McpClient,
    tools: Vec<Arc<dyn Tool>>,
}

impl McpToolset {
    /// Connect to every server; servers that fail are logged and skipped
    pub async fn connect(specs: &[McpServerSpec]) -> Self {
        let mut toolset = Self::default();

        for spec in specs {
            let session = match toolset
                .client
                .add_server(&spec.tool_prefix, &spec.command, &spec.args)
                .await
            {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!("⚠ Skipping MCP server {}: {}", spec.tool_prefix, e);
                    continue;
                }
            };

            toolset.add_session_tools(session, &spec.tool_prefix).await;
        }

        toolset
    }

    /// Register an already connected session under a prefix
    pub async fn attach(&mut self, session: McpSession, prefix: &str) {
        let session = self.client.insert_session(session);
        self.add_session_tools(session, prefix).await;
    }

    /// Register the session's tools, or drop the session if it cannot list them
    async fn add_session_tools(&mut self, session: Arc<McpSession>, prefix: &str) {
        match session.list_tools().await {
            Ok(remote_tools) => {
                tracing::info!("Registered {} tools from {}", remote_tools.len(), prefix);
                for remote in remote_tools {
                    let tool = McpTool::new(Arc::clone(&session), prefix, remote);
                    tracing::debug!("  • {}", tool.qualified_name());
                    self.tools.push(Arc::new(tool));
                }
            }
            Err(e) => {
                tracing::warn!("⚠ Could not list tools from {}, dropping it: {}", prefix, e);
                self.client.remove_server(session.name()).await;
            }
        }
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    /// Prefixes of connected servers
    pub fn active_prefixes(&self) -> Vec<&str> {
        self.client.server_names()
    }

    /// Registry holding every tool of this set
    pub fn registry(&self) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        for tool in &self.tools {
            registry.register_shared(Arc::clone(tool));
        }
        registry
    }

    pub const fn client(&self) -> &McpClient {
        &self.client
    }

    pub async fn close(&mut self) {
        self.tools.clear();
        self.client.close().await;
    }
}
