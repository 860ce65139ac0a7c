//! MCP Server Implementation
//!
//! Handles MCP protocol requests and routes tool calls to the index handlers.

use super::protocol::*;
use super::tools::{self, get_all_tools};
use super::transport::{AsyncStdioTransport, Incoming};
use crate::backend::FlexdexBackend;
use crate::error::{ServerError, ServerResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufRead, AsyncWrite};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "flexdex";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const INSTRUCTIONS: &str = "Index of a three-tier API surface. Start with search_by_capability \
or list_categories, inspect objects with get_object_api, and check generated code with \
validate_script before running it.";

/// MCP Server - handles protocol messages
pub struct McpServer {
    backend: Arc<FlexdexBackend>,
    initialized: bool,
}

impl McpServer {
    pub fn new(backend: Arc<FlexdexBackend>) -> Self {
        Self {
            backend,
            initialized: false,
        }
    }

    /// Serve over stdio until the client disconnects.
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.serve(AsyncStdioTransport::new()).await
    }

    /// Run the event loop over any transport.
    pub async fn serve<R, W>(&mut self, mut transport: AsyncStdioTransport<R, W>) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!("MCP server starting...");

        loop {
            match transport.read_message().await? {
                Some(Incoming::Request(request)) => {
                    let notification = request.is_notification();
                    let response = self.handle_request(request).await;
                    if !notification {
                        transport.write_response(&response).await?;
                    }
                }
                Some(Incoming::Malformed(message)) => {
                    let response = JsonRpcResponse::error(
                        None,
                        JsonRpcError::parse_error(format!("Parse error: {}", message)),
                    );
                    transport.write_response(&response).await?;
                }
                Some(Incoming::Empty) => continue,
                None => {
                    tracing::info!("Client disconnected");
                    break;
                }
            }
        }

        let stats = self.backend.cache.stats();
        tracing::debug!(
            "Result cache: {} entries, {} hits, {} misses",
            stats.entries,
            stats.hits,
            stats.misses
        );
        Ok(())
    }

    /// Handle a JSON-RPC request
    pub async fn handle_request(&mut self, request: JsonRpcRequest) -> JsonRpcResponse {
        tracing::debug!("Handling request: {}", request.method);

        if request.jsonrpc != "2.0" {
            return JsonRpcResponse::error(
                request.id,
                JsonRpcError::invalid_request(format!(
                    "Unsupported jsonrpc version: {}",
                    request.jsonrpc
                )),
            );
        }

        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id, request.params),
            "initialized" | "notifications/initialized" | "notifications/cancelled" => {
                JsonRpcResponse::success(request.id, Value::Null)
            }
            "ping" => JsonRpcResponse::from_serializable(request.id, &PingResult {}),
            "tools/list" => JsonRpcResponse::from_serializable(
                request.id,
                &ToolsListResult {
                    tools: get_all_tools(),
                },
            ),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            _ => {
                JsonRpcResponse::error(request.id, JsonRpcError::method_not_found(&request.method))
            }
        }
    }

    fn handle_initialize(&mut self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: InitializeParams = params
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();
        if let Some(client) = &params.client_info {
            tracing::info!(
                "Client: {} {}",
                client.name,
                client.version.as_deref().unwrap_or("")
            );
        }

        let snapshot = self.backend.snapshot();
        tracing::info!(
            "Serving index generation {} ({} entities, {} members)",
            snapshot.generation(),
            snapshot.entities().len(),
            snapshot.members().len()
        );
        self.initialized = true;

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                logging: Some(LoggingCapability {}),
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: Some(SERVER_VERSION.to_string()),
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        };
        JsonRpcResponse::from_serializable(id, &result)
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(format!("Invalid params: {}", e)),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(id, JsonRpcError::invalid_params("Missing params"));
            }
        };

        let started = Instant::now();
        let outcome = self.execute_tool(&params.name, params.arguments);
        tracing::debug!(
            "Tool {} finished in {:?} (ok: {})",
            params.name,
            started.elapsed(),
            outcome.is_ok()
        );

        let result = match outcome {
            Ok(value) => ToolCallResult::text(
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
            ),
            Err(e @ ServerError::UnknownTool(_)) => return JsonRpcResponse::error(id, e.into()),
            Err(e) => {
                if !e.is_client_error() {
                    tracing::warn!("Tool {} failed: {}", params.name, e);
                }
                ToolCallResult::failure(format!("Error: {}", e))
            }
        };
        JsonRpcResponse::from_serializable(id, &result)
    }

    /// Execute a tool by name, answering from the result cache when possible
    fn execute_tool(&self, name: &str, args: Option<Value>) -> ServerResult<Value> {
        let args = match args {
            Some(Value::Null) | None => Value::Object(serde_json::Map::new()),
            Some(args) => args,
        };

        let generation = self.backend.store.generation();
        if let Some(cached) = self.backend.cache.get(generation, name, &args) {
            return Ok(cached);
        }

        let backend = &self.backend;
        let result = match name {
            tools::GET_OBJECT_API => {
                to_json(backend.handle_get_object_api(parse_args(name, &args)?)?)?
            }
            tools::SEARCH_BY_CAPABILITY => {
                to_json(backend.handle_search_by_capability(parse_args(name, &args)?)?)?
            }
            tools::GET_NAVIGATION_PATH => {
                to_json(backend.handle_get_navigation_path(parse_args(name, &args)?)?)?
            }
            tools::VALIDATE_SCRIPT => {
                to_json(backend.handle_validate_script(parse_args(name, &args)?)?)?
            }
            tools::FIND_EXAMPLES => {
                to_json(backend.handle_find_examples(parse_args(name, &args)?)?)?
            }
            tools::LIST_CATEGORIES => to_json(backend.handle_list_categories()?)?,
            tools::LIST_ENTITIES_IN_CATEGORY => {
                to_json(backend.handle_list_entities_in_category(parse_args(name, &args)?)?)?
            }
            _ => return Err(ServerError::UnknownTool(name.to_string())),
        };

        self.backend
            .cache
            .put(generation, name, &args, result.clone());
        Ok(result)
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: &Value) -> ServerResult<T> {
    T::deserialize(args).map_err(|e| ServerError::BadArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

fn to_json<T: serde::Serialize>(value: T) -> ServerResult<Value> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_support::loaded_backend;
    use serde_json::json;

    fn request(id: i64, method: &str, params: Value) -> JsonRpcRequest {
        serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": id, "method": method, "params": params
        }))
        .unwrap()
    }

    fn server(dir: &std::path::Path) -> McpServer {
        McpServer::new(Arc::new(loaded_backend(dir)))
    }

    /// Text payload of a successful tools/call, parsed back to JSON
    fn tool_payload(response: &JsonRpcResponse) -> (Value, bool) {
        let result = response.result.as_ref().expect("tools/call result");
        let text = result["content"][0]["text"].as_str().unwrap();
        let is_error = result.get("isError").and_then(Value::as_bool).unwrap_or(false);
        let payload = serde_json::from_str(text).unwrap_or(Value::String(text.to_string()));
        (payload, is_error)
    }

    #[tokio::test]
    async fn test_initialize_and_list_tools() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = server(dir.path());

        let response = server
            .handle_request(request(1, "initialize", json!({"clientInfo": {"name": "test"}})))
            .await;
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "flexdex");
        assert!(server.initialized);

        let response = server.handle_request(request(2, "tools/list", json!({}))).await;
        let tools = response.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 7);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = server(dir.path());
        let response = server.handle_request(request(1, "resources/list", json!({}))).await;
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_tool_call_routes_to_handler() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = server(dir.path());

        let response = server
            .handle_request(request(
                1,
                "tools/call",
                json!({"name": "get_navigation_path",
                       "arguments": {"from_object": "Entry", "to_object": "Example"}}),
            ))
            .await;
        let (payload, is_error) = tool_payload(&response);
        assert!(!is_error);
        assert_eq!(payload["hops"], 2);
    }

    #[tokio::test]
    async fn test_query_error_is_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = server(dir.path());

        let response = server
            .handle_request(request(
                1,
                "tools/call",
                json!({"name": "get_navigation_path",
                       "arguments": {"from_object": "Entry", "to_object": "Nonexistent"}}),
            ))
            .await;
        assert!(response.error.is_none());
        let (payload, is_error) = tool_payload(&response);
        assert!(is_error);
        assert!(payload.as_str().unwrap().contains("Nonexistent"));
    }

    #[tokio::test]
    async fn test_missing_argument_is_tool_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = server(dir.path());

        let response = server
            .handle_request(request(
                1,
                "tools/call",
                json!({"name": "search_by_capability", "arguments": {}}),
            ))
            .await;
        let (payload, is_error) = tool_payload(&response);
        assert!(is_error);
        assert!(payload.as_str().unwrap().contains("query"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_protocol_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = server(dir.path());

        let response = server
            .handle_request(request(1, "tools/call", json!({"name": "no_such_tool"})))
            .await;
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_repeated_call_hits_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = server(dir.path());
        let call = json!({"name": "list_categories"});

        server.handle_request(request(1, "tools/call", call.clone())).await;
        server.handle_request(request(2, "tools/call", call)).await;
        let stats = server.backend.cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_serve_skips_notifications() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = server(dir.path());
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"ping\"}\n",
            "garbage\n"
        );
        let mut output = Vec::new();
        let transport = AsyncStdioTransport::with_io(input.as_bytes(), &mut output);
        server.serve(transport).await.unwrap();

        let written = String::from_utf8(output).unwrap();
        let lines: Vec<Value> = written
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["id"], 7);
        assert_eq!(lines[1]["error"]["code"], PARSE_ERROR);
    }
}
