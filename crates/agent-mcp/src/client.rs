//! MCP Client
//!
//! A [`McpSession`] owns one server connection; [`McpClient`] keeps named
//! sessions for callers that address servers by name.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::error::{McpError, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, PROTOCOL_VERSION, RemoteTool,
};

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

struct Transport {
    writer: BoxedWriter,
    lines: Lines<BufReader<BoxedReader>>,
}

/// A live connection to one MCP server
pub struct McpSession {
    name: String,
    transport: Mutex<Transport>,
    child: Mutex<Option<Child>>,
    next_id: AtomicU64,
    timeout: Duration,
    server_info: Option<Implementation>,
}

impl McpSession {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Start a server process and initialize the session
    pub async fn spawn(name: impl Into<String>, command: &str, args: &[String]) -> Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| McpError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::Protocol("child stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::Protocol("child stdout unavailable".into()))?;

        let mut session = Self::from_io(name, stdout, stdin);
        session.child = Mutex::new(Some(child));
        session.initialize().await?;
        Ok(session)
    }

    /// Initialize a session over an existing byte stream
    pub async fn connect_io<R, W>(name: impl Into<String>, reader: R, writer: W) -> Result<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let mut session = Self::from_io(name, reader, writer);
        session.initialize().await?;
        Ok(session)
    }

    fn from_io<R, W>(name: impl Into<String>, reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let reader: BoxedReader = Box::new(reader);
        Self {
            name: name.into(),
            transport: Mutex::new(Transport {
                writer: Box::new(writer),
                lines: BufReader::new(reader).lines(),
            }),
            child: Mutex::new(None),
            next_id: AtomicU64::new(1),
            timeout: Self::DEFAULT_TIMEOUT,
            server_info: None,
        }
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Server name and version reported during initialization
    pub const fn server_info(&self) -> Option<&Implementation> {
        self.server_info.as_ref()
    }

    async fn initialize(&mut self) -> Result<()> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: serde_json::json!({}),
            client_info: Implementation {
                name: "pumppie".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
        };

        let result: InitializeResult = serde_json::from_value(
            self.request("initialize", Some(serde_json::to_value(params)?))
                .await?,
        )?;

        if result.protocol_version != PROTOCOL_VERSION {
            tracing::debug!(
                server = %self.name,
                version = %result.protocol_version,
                "Server negotiated a different protocol version"
            );
        }

        self.notify("notifications/initialized", None).await?;
        self.server_info = Some(result.server_info);
        Ok(())
    }

    /// Send a request and wait for its response
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);

        let mut guard = self.transport.lock().await;
        let transport = &mut *guard;

        let exchange = async {
            write_message(&mut transport.writer, &request).await?;
            read_response(&mut transport.lines, id).await
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| McpError::Timeout {
                method: method.to_string(),
                secs: self.timeout.as_secs(),
            })?
    }

    /// Send a notification (no response expected)
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        let notification = JsonRpcRequest::notification(method, params);
        let mut transport = self.transport.lock().await;
        write_message(&mut transport.writer, &notification).await
    }

    /// All tools the server exposes, following pagination cursors
    pub async fn list_tools(&self) -> Result<Vec<RemoteTool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let params = cursor.take().map(|c| serde_json::json!({ "cursor": c }));
            let page: ListToolsResult =
                serde_json::from_value(self.request("tools/list", params).await?)?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(tools)
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Map<String, Value>,
    ) -> Result<CallToolResult> {
        let params = CallToolParams {
            name: name.to_string(),
            arguments,
        };
        let result = self
            .request("tools/call", Some(serde_json::to_value(params)?))
            .await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Close stdin and reap the server process
    pub async fn close(&self) -> Result<()> {
        self.transport.lock().await.writer.shutdown().await?;

        if let Some(mut child) = self.child.lock().await.take() {
            if tokio::time::timeout(Duration::from_secs(2), child.wait())
                .await
                .is_err()
            {
                tracing::debug!(server = %self.name, "Server did not exit, killing");
                child.kill().await?;
            }
        }
        Ok(())
    }
}

async fn write_message<T: Serialize>(writer: &mut BoxedWriter, message: &T) -> Result<()> {
    let mut line = serde_json::to_vec(message)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// Read lines until the response for `id` arrives. Notifications, server
/// requests and non-JSON output are skipped.
async fn read_response(lines: &mut Lines<BufReader<BoxedReader>>, id: u64) -> Result<Value> {
    loop {
        let line = lines
            .next_line()
            .await?
            .ok_or_else(|| McpError::Protocol("server closed the connection".into()))?;

        if line.trim().is_empty() {
            continue;
        }

        let Ok(message) = serde_json::from_str::<Value>(&line) else {
            tracing::trace!("Skipping non-JSON line from server");
            continue;
        };

        if message.get("method").is_some() || message.get("id").and_then(Value::as_u64) != Some(id)
        {
            tracing::trace!("Skipping unrelated message");
            continue;
        }

        let response: JsonRpcResponse = serde_json::from_value(message)?;
        if let Some(error) = response.error {
            return Err(McpError::Remote {
                code: error.code,
                message: error.message,
            });
        }
        return Ok(response.result.unwrap_or(Value::Null));
    }
}

// ============================================================================
// Named sessions
// ============================================================================

/// Command line a server was started with
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdioServerParams {
    pub command: String,
    pub args: Vec<String>,
}

/// Summary of a connected server
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub connected: bool,
    #[serde(default)]
    pub tools_count: usize,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// MCP client addressing servers by name
#[derive(Default)]
pub struct McpClient {
    sessions: HashMap<String, Arc<McpSession>>,
    servers: HashMap<String, StdioServerParams>,
}

impl McpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start and connect to a server
    pub async fn add_server(
        &mut self,
        name: impl Into<String>,
        command: &str,
        args: &[String],
    ) -> Result<Arc<McpSession>> {
        let name = name.into();

        match McpSession::spawn(name.clone(), command, args).await {
            Ok(session) => {
                tracing::info!("✓ Connected to MCP server: {}", name);
                let session = Arc::new(session);
                self.servers.insert(
                    name.clone(),
                    StdioServerParams {
                        command: command.to_string(),
                        args: args.to_vec(),
                    },
                );
                self.sessions.insert(name, Arc::clone(&session));
                Ok(session)
            }
            Err(e) => {
                tracing::error!("Failed to connect to MCP server {}: {}", name, e);
                Err(e)
            }
        }
    }

    /// Register an already connected session
    pub fn insert_session(&mut self, session: McpSession) -> Arc<McpSession> {
        let session = Arc::new(session);
        self.sessions
            .insert(session.name().to_string(), Arc::clone(&session));
        session
    }

    /// Forget a server and close its session
    pub async fn remove_server(&mut self, server_name: &str) {
        self.servers.remove(server_name);
        if let Some(session) = self.sessions.remove(server_name) {
            if let Err(e) = session.close().await {
                tracing::debug!("Error closing connection to {}: {}", server_name, e);
            }
        }
    }

    pub fn session(&self, server_name: &str) -> Result<Arc<McpSession>> {
        self.sessions
            .get(server_name)
            .cloned()
            .ok_or_else(|| McpError::NotConnected(server_name.to_string()))
    }

    pub fn server_params(&self, server_name: &str) -> Option<&StdioServerParams> {
        self.servers.get(server_name)
    }

    /// Connected server names in sorted order
    pub fn server_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.sessions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn list_tools(&self, server_name: &str) -> Result<Vec<RemoteTool>> {
        let session = self.session(server_name)?;
        session.list_tools().await.inspect_err(|e| {
            tracing::error!("Failed to list tools from {}: {}", server_name, e);
        })
    }

    pub async fn call_tool(
        &self,
        server_name: &str,
        tool_name: &str,
        arguments: Option<serde_json::Map<String, Value>>,
    ) -> Result<CallToolResult> {
        let session = self.session(server_name)?;
        session
            .call_tool(tool_name, arguments.unwrap_or_default())
            .await
            .inspect_err(|e| {
                tracing::error!("Failed to call tool {} on {}: {}", tool_name, server_name, e);
            })
    }

    /// Tools summary; listing failures are reported, not raised
    pub async fn get_server_info(&self, server_name: &str) -> Result<ServerInfo> {
        let session = self.session(server_name)?;

        Ok(match session.list_tools().await {
            Ok(tools) => ServerInfo {
                name: server_name.to_string(),
                connected: true,
                tools_count: tools.len(),
                tools: tools.into_iter().map(|t| t.name).collect(),
                error: None,
            },
            Err(e) => {
                tracing::error!("Failed to get info for {}: {}", server_name, e);
                ServerInfo {
                    name: server_name.to_string(),
                    connected: false,
                    tools_count: 0,
                    tools: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        })
    }

    /// Close all sessions
    pub async fn close(&mut self) {
        for (name, session) in self.sessions.drain() {
            match session.close().await {
                Ok(()) => tracing::info!("Closed connection to {}", name),
                Err(e) => tracing::error!("Error closing connection to {}: {}", name, e),
            }
        }
        self.servers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serve::{ToolHandler, serve};
    use agent_core::tool::{ParameterSchema, ToolSchema};
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        fn info(&self) -> Implementation {
            Implementation {
                name: "echo-server".into(),
                version: "1.0.0".into(),
            }
        }

        fn tools(&self) -> Vec<ToolSchema> {
            vec![ToolSchema {
                name: "echo".into(),
                description: "Echo back the input message".into(),
                parameters: vec![ParameterSchema::required("message", "string", "Message")],
            }]
        }

        async fn call(
            &self,
            name: &str,
            arguments: &serde_json::Map<String, Value>,
        ) -> CallToolResult {
            match name {
                "echo" => CallToolResult::text(format!(
                    "Echo: {}",
                    arguments.get("message").and_then(Value::as_str).unwrap_or_default()
                )),
                other => CallToolResult::error(format!("Unknown tool: {other}")),
            }
        }
    }

    async fn connected_client() -> McpClient {
        let (client_io, server_io) = tokio::io::duplex(8192);
        let (server_read, server_write) = tokio::io::split(server_io);
        tokio::spawn(async move {
            let handler = Echo;
            serve(&handler, server_read, server_write).await
        });

        let (client_read, client_write) = tokio::io::split(client_io);
        let session = McpSession::connect_io("echo", client_read, client_write)
            .await
            .unwrap();

        let mut client = McpClient::new();
        client.insert_session(session);
        client
    }

    #[tokio::test]
    async fn test_initialize_records_server_info() {
        let client = connected_client().await;
        let session = client.session("echo").unwrap();
        assert_eq!(session.server_info().unwrap().name, "echo-server");
    }

    #[tokio::test]
    async fn test_list_and_call_tools() {
        let client = connected_client().await;

        let tools = client.list_tools("echo").await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].input_schema["required"][0], "message");

        let mut args = serde_json::Map::new();
        args.insert("message".into(), Value::from("hi"));
        let result = client.call_tool("echo", "echo", Some(args)).await.unwrap();
        assert_eq!(result.joined_text(), "Echo: hi");
        assert!(!result.is_error);

        let unknown = client.call_tool("echo", "nope", None).await.unwrap();
        assert!(unknown.is_error);
    }

    #[tokio::test]
    async fn test_server_info() {
        let client = connected_client().await;
        let info = client.get_server_info("echo").await.unwrap();
        assert!(info.connected);
        assert_eq!(info.tools, ["echo"]);
        assert_eq!(info.tools_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_server_is_not_connected() {
        let client = McpClient::new();
        assert!(matches!(
            client.list_tools("ghost").await,
            Err(McpError::NotConnected(name)) if name == "ghost"
        ));
        assert!(matches!(
            client.get_server_info("ghost").await,
            Err(McpError::NotConnected(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_server() {
        let mut client = connected_client().await;
        client.remove_server("echo").await;
        assert!(client.server_names().is_empty());
        assert!(matches!(client.session("echo"), Err(McpError::NotConnected(_))));
    }

    #[tokio::test]
    async fn test_failed_spawn_records_nothing() {
        let mut client = McpClient::new();
        let result = client
            .add_server("ghost", "pumppie-definitely-not-installed", &["--stdio".into()])
            .await;
        assert!(matches!(result, Err(McpError::Spawn { .. })));
        assert!(client.server_params("ghost").is_none());
        assert!(client.server_names().is_empty());
    }

    #[tokio::test]
    async fn test_spawn_missing_binary() {
        let err = McpSession::spawn("missing", "pumppie-definitely-not-installed", &[])
            .await
            .err()
            .unwrap();
        assert!(matches!(err, McpError::Spawn { .. }));
    }
}
