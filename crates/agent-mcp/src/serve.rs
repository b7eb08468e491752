//! MCP Server Loop
//!
//! Serves a [`ToolHandler`] over newline-delimited JSON-RPC. Binaries call
//! [`serve_stdio`]; stdout carries protocol messages only, so logging must go
//! to stderr.

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use agent_core::tool::ToolSchema;

use crate::error::Result;
use crate::protocol::{
    CallToolParams, CallToolResult, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST,
    Implementation, JSONRPC_VERSION, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND,
    PARSE_ERROR, PROTOCOL_VERSION,
};

/// Tools exposed by an MCP server
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Server name and version sent during initialization
    fn info(&self) -> Implementation;

    fn tools(&self) -> Vec<ToolSchema>;

    /// Run a tool. Failures are reported in the result, not as RPC errors.
    async fn call(&self, name: &str, arguments: &serde_json::Map<String, Value>)
    -> CallToolResult;
}

/// Serve a handler on this process's stdin/stdout until stdin closes
pub async fn serve_stdio<H: ToolHandler>(handler: H) -> Result<()> {
    let info = handler.info();
    tracing::info!("🚀 {} v{} serving MCP on stdio", info.name, info.version);
    serve(&handler, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serve a handler over any byte stream until the reader is exhausted
pub async fn serve<H, R, W>(handler: &H, reader: R, mut writer: W) -> Result<()>
where
    H: ToolHandler + ?Sized,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
            Ok(request) => handle_request(handler, request).await,
            Err(e) => {
                tracing::warn!("Invalid JSON-RPC message: {}", e);
                Some(JsonRpcResponse::failure(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {e}"),
                ))
            }
        };

        if let Some(response) = response {
            let mut out = serde_json::to_vec(&response)?;
            out.push(b'\n');
            writer.write_all(&out).await?;
            writer.flush().await?;
        }
    }

    tracing::info!("Client disconnected, shutting down");
    Ok(())
}

/// Dispatch one message. Notifications produce no response.
pub async fn handle_request<H: ToolHandler + ?Sized>(
    handler: &H,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    let Some(id) = request.id else {
        tracing::debug!(method = %request.method, "Notification received");
        return None;
    };

    if request.jsonrpc != JSONRPC_VERSION {
        return Some(JsonRpcResponse::failure(
            id,
            INVALID_REQUEST,
            "Unsupported JSON-RPC version",
        ));
    }

    let response = match request.method.as_str() {
        "initialize" => JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": handler.info(),
            }),
        ),
        "ping" => JsonRpcResponse::success(id, json!({})),
        "tools/list" => {
            let tools: Vec<Value> = handler
                .tools()
                .iter()
                .map(|schema| {
                    json!({
                        "name": schema.name,
                        "description": schema.description,
                        "inputSchema": schema.input_schema(),
                    })
                })
                .collect();
            JsonRpcResponse::success(id, json!({ "tools": tools }))
        }
        "tools/call" => {
            let params = request
                .params
                .map(serde_json::from_value::<CallToolParams>)
                .transpose();

            match params {
                Ok(Some(params)) => {
                    tracing::debug!(tool = %params.name, "Tool call");
                    let result = handler.call(&params.name, &params.arguments).await;
                    match serde_json::to_value(result) {
                        Ok(value) => JsonRpcResponse::success(id, value),
                        Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
                    }
                }
                Ok(None) => JsonRpcResponse::failure(id, INVALID_PARAMS, "Missing params"),
                Err(e) => JsonRpcResponse::failure(id, INVALID_PARAMS, e.to_string()),
            }
        }
        other => JsonRpcResponse::failure(
            id,
            METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        ),
    };

    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::tool::ParameterSchema;

    struct Adder;

    #[async_trait]
    impl ToolHandler for Adder {
        fn info(&self) -> Implementation {
            Implementation {
                name: "adder".into(),
                version: "0.1.0".into(),
            }
        }

        fn tools(&self) -> Vec<ToolSchema> {
            vec![ToolSchema {
                name: "add".into(),
                description: "Add two numbers".into(),
                parameters: vec![
                    ParameterSchema::required("a", "number", "First"),
                    ParameterSchema::required("b", "number", "Second"),
                ],
            }]
        }

        async fn call(
            &self,
            _name: &str,
            arguments: &serde_json::Map<String, Value>,
        ) -> CallToolResult {
            let get = |k: &str| arguments.get(k).and_then(Value::as_f64).unwrap_or(0.0);
            CallToolResult::text(format!("{}", get("a") + get("b")))
        }
    }

    fn request(id: u64, method: &str, params: Option<Value>) -> JsonRpcRequest {
        JsonRpcRequest::new(id, method, params)
    }

    #[tokio::test]
    async fn test_initialize_reports_server_info() {
        let response = handle_request(&Adder, request(1, "initialize", None))
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], "adder");
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_notification_has_no_response() {
        let note = JsonRpcRequest::notification("notifications/initialized", None);
        assert!(handle_request(&Adder, note).await.is_none());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = handle_request(&Adder, request(2, "resources/list", None))
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_serve_over_byte_stream() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
            "\n",
            "not json\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"add","arguments":{"a":2,"b":3}}}"#,
            "\n",
        );
        let mut output = Vec::new();
        serve(&Adder, input.as_bytes(), &mut output).await.unwrap();

        let responses: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["result"]["tools"][0]["name"], "add");
        assert_eq!(responses[1]["error"]["code"], PARSE_ERROR);
        assert_eq!(responses[2]["result"]["content"][0]["text"], "5");
    }
}
