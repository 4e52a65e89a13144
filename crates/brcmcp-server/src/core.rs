//! Transport-independent MCP request handling.

use crate::protocol::{
    CallToolParams, InitializeResult, JsonRpcRequest, JsonRpcResponse, ListToolsResult, McpTool,
    ServerInfo, ToolCallResult, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION,
    METHOD_NOT_FOUND, PROTOCOL_VERSION,
};
use brcmcp_auth::{TokenContext, TokenProvider};
use brcmcp_tools::{DispatchError, ToolContext, ToolRegistry};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// The request core shared by the HTTP and stdio shims.
pub struct McpServer {
    registry: Arc<ToolRegistry>,
    provider: Arc<TokenProvider>,
}

impl McpServer {
    pub fn new(registry: Arc<ToolRegistry>, provider: Arc<TokenProvider>) -> Self {
        Self { registry, provider }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Handle one request. Notifications return `None`; everything else
    /// returns exactly one response envelope. Tool failures become
    /// error-kind invocation results, so the serving loop survives any
    /// request.
    pub async fn handle_request(
        &self,
        request: JsonRpcRequest,
        token: TokenContext,
    ) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!(method = %request.method, "ignoring notification");
            return None;
        }
        let id = request.id;

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::failure(
                id,
                INVALID_REQUEST,
                format!("unsupported jsonrpc version: {}", request.jsonrpc),
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => {
                let result = InitializeResult {
                    protocol_version: PROTOCOL_VERSION.to_string(),
                    capabilities: json!({"tools": {}}),
                    server_info: ServerInfo {
                        name: "brcmcp".to_string(),
                        version: env!("CARGO_PKG_VERSION").to_string(),
                    },
                };
                match serde_json::to_value(result) {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
                }
            }
            "tools/list" => {
                let tools = self
                    .registry
                    .all()
                    .into_iter()
                    .map(|tool| McpTool {
                        name: tool.id().to_string(),
                        description: tool.description().to_string(),
                        input_schema: tool.parameters_schema(),
                    })
                    .collect();
                match serde_json::to_value(ListToolsResult { tools }) {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
                }
            }
            "tools/call" => self.handle_tool_call(id, request.params, token).await,
            other => {
                JsonRpcResponse::failure(id, METHOD_NOT_FOUND, format!("unknown method: {other}"))
            }
        };
        Some(response)
    }

    async fn handle_tool_call(
        &self,
        id: Option<u64>,
        params: serde_json::Value,
        token: TokenContext,
    ) -> JsonRpcResponse {
        let params: CallToolParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("invalid params: {e}"))
            }
        };

        let args = if params.arguments.is_null() {
            json!({})
        } else {
            params.arguments
        };
        let ctx = ToolContext::new(token, Arc::clone(&self.provider));

        match self.registry.dispatch(&params.name, args, &ctx).await {
            Ok(Ok(output)) => match serde_json::to_value(ToolCallResult::text(output)) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
            },
            Ok(Err(tool_err)) => {
                let result = ToolCallResult::error(tool_err.to_string());
                match serde_json::to_value(result) {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(e) => JsonRpcResponse::failure(id, INTERNAL_ERROR, e.to_string()),
                }
            }
            Err(err @ DispatchError::UnknownTool(_)) => {
                JsonRpcResponse::failure(id, INVALID_PARAMS, err.to_string())
            }
            Err(err @ DispatchError::InvalidArguments(_)) => {
                JsonRpcResponse::failure(id, INVALID_PARAMS, err.to_string())
            }
        }
    }
}
