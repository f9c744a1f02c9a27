//! MCP Server implementation
//!
//! Implements the Model Context Protocol server for stdio transport.
//! Requests are handled one at a time, in arrival order.

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::Result;
use crate::mcp::tools::ToolRegistry;
use crate::mcp::types::*;

/// MCP Server info
const SERVER_NAME: &str = "label-studio-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// MCP Server for Label Studio
pub struct McpServer {
    /// Tool registry
    registry: ToolRegistry,

    /// Whether the client sent `notifications/initialized`
    initialized: bool,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry,
            initialized: false,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Run the server on stdio
    pub async fn run_stdio(&mut self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut stdout = tokio::io::stdout();
        let mut lines = stdin.lines();

        while let Some(line) = lines.next_line().await? {
            self.process_line(&line, &mut stdout).await?;
        }

        tracing::info!("stdin closed, shutting down");
        Ok(())
    }

    /// Handle one input line and write the response, if any
    pub async fn process_line<W: AsyncWrite + Unpin>(&mut self, line: &str, out: &mut W) -> Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        if let Some(response) = self.handle_message(line).await {
            let response_str = serde_json::to_string(&response)?;
            out.write_all(response_str.as_bytes()).await?;
            out.write_all(b"\n").await?;
            out.flush().await?;
        }

        Ok(())
    }

    /// Handle an incoming JSON-RPC message
    pub async fn handle_message(&mut self, message: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(req) => req,
            Err(e) => {
                return Some(JsonRpcResponse::error_without_id(
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        // Notifications carry no id and get no response
        let Some(id) = request.id.clone() else {
            if request.method == methods::INITIALIZED {
                self.initialized = true;
            } else {
                tracing::debug!("Ignoring notification {}", request.method);
            }
            return None;
        };

        let outcome = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(),
            methods::PING => Ok(serde_json::json!({})),
            methods::LIST_TOOLS => self.handle_list_tools(),
            methods::CALL_TOOL => self.handle_call_tool(&request).await,
            _ => {
                return Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::method_not_found(&request.method),
                ))
            }
        };

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::error(id, JsonRpcError::internal_error(e.to_string())),
        })
    }

    /// Handle initialize request
    fn handle_initialize(&self) -> Result<Value> {
        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle list tools request
    fn handle_list_tools(&self) -> Result<Value> {
        let result = ListToolsResult {
            tools: self.registry.list_tools(),
        };

        Ok(serde_json::to_value(result)?)
    }

    /// Handle call tool request
    async fn handle_call_tool(&self, request: &JsonRpcRequest) -> Result<Value> {
        let result = match request.params.clone() {
            Some(p) => match serde_json::from_value::<CallToolParams>(p) {
                Ok(params) => self.registry.call_tool(&params.name, params.arguments).await,
                Err(e) => CallToolResult::error(format!("Invalid tool parameters: {}", e)),
            },
            None => CallToolResult::error("Missing tool parameters"),
        };

        Ok(serde_json::to_value(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn server() -> McpServer {
        McpServer::new(ToolRegistry::new(Config::default(), None))
    }

    #[tokio::test]
    async fn test_initialized_notification() {
        let mut server = server();
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
        assert!(server.is_initialized());
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let mut server = server();
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":4,"method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_parse_error() {
        let mut server = server();
        let response = server.handle_message("{not json").await.unwrap();
        assert!(response.id.is_none());
        assert_eq!(response.error.unwrap().code, -32700);

        let mut out: Vec<u8> = Vec::new();
        server.process_line("{not json", &mut out).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"id\":null"));
    }

    #[tokio::test]
    async fn test_process_line_writes_one_line() {
        let mut server = server();
        let mut out: Vec<u8> = Vec::new();
        server
            .process_line(r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#, &mut out)
            .await
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.ends_with('\n'));
        assert!(text.contains("\"id\":\"a\""));
    }
}
