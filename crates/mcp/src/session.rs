//! Per-request MCP session servers.
//!
//! A [`SessionServer`] answers JSON-RPC messages for exactly one
//! [`SessionConfig`]. The [`SessionServerFactory`] builds a fresh one for
//! every request so concurrent sessions share nothing but the immutable
//! tool registry.

use crate::normalize::{normalize, RawToolResult};
use crate::protocol::{
    negotiate_version, CallToolParams, CallToolResult, InitializeParams, InitializeResult,
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, ListToolsResult, ServerCapabilities,
    ServerInfo, ToolsCapability,
};
use crate::tools::{RegistryError, ToolRegistry, ToolSet};
use serde_json::Value;
use solx402_core::SessionConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to register tools: {0}")]
    Registry(#[from] RegistryError),
    #[error("session {0} is closed")]
    Closed(Uuid),
}

/// Builds isolated session servers from the shared tool registry.
#[derive(Clone)]
pub struct SessionServerFactory {
    registry: Arc<ToolRegistry>,
    info: ServerInfo,
}

impl SessionServerFactory {
    pub fn new(registry: Arc<ToolRegistry>, info: ServerInfo) -> Self {
        Self { registry, info }
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// Build a server bound to `config`. Fails without a partial server if
    /// the tool set cannot be composed.
    pub fn create(&self, config: SessionConfig) -> Result<SessionServer, SessionError> {
        let tools = self.registry.compose(config.use_solana_mcp_server)?;
        let server = SessionServer {
            id: Uuid::new_v4(),
            info: self.info.clone(),
            config,
            tools,
            closed: AtomicBool::new(false),
        };

        info!(
            session = %server.id,
            config = %server.config.summary(),
            tools = server.tools.len(),
            "Created MCP session server"
        );
        Ok(server)
    }
}

/// MCP server instance serving a single session.
pub struct SessionServer {
    id: Uuid,
    info: ServerInfo,
    config: SessionConfig,
    tools: ToolSet,
    closed: AtomicBool,
}

impl SessionServer {
    /// Identifier used in logs only; it is never sent to clients.
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Close the server. Returns `true` only for the call that closed it.
    pub fn close(&self) -> bool {
        let first = !self.closed.swap(true, Ordering::SeqCst);
        if first {
            debug!(session = %self.id, "Closed MCP session server");
        }
        first
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Handle one JSON-RPC message. Notifications yield no response.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!(session = %self.id, method = %request.method, "Received notification");
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);

        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(id, JsonRpcError::invalid_request()));
        }
        if self.is_closed() {
            let err = SessionError::Closed(self.id);
            return Some(JsonRpcResponse::error(id, JsonRpcError::internal_error(err.to_string())));
        }

        let response = match request.method.as_str() {
            "initialize" => self.initialize(id, request.params),
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "tools/list" => JsonRpcResponse::success(
                id,
                ListToolsResult {
                    tools: self.tools.schemas(),
                },
            ),
            "tools/call" => match parse_params::<CallToolParams>(request.params) {
                Ok(params) => match self.call_tool(params).await {
                    Ok(result) => JsonRpcResponse::success(id, result),
                    Err(error) => JsonRpcResponse::error(id, error),
                },
                Err(error) => JsonRpcResponse::error(id, error),
            },
            other => JsonRpcResponse::error(id, JsonRpcError::method_not_found(other)),
        };
        Some(response)
    }

    fn initialize(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let requested = params
            .and_then(|p| serde_json::from_value::<InitializeParams>(p).ok())
            .map(|p| p.protocol_version);

        JsonRpcResponse::success(
            id,
            InitializeResult {
                protocol_version: negotiate_version(requested.as_deref()).to_string(),
                capabilities: ServerCapabilities {
                    tools: Some(ToolsCapability {
                        list_changed: false,
                    }),
                },
                server_info: self.info.clone(),
            },
        )
    }

    /// Run a tool against this session's configuration and normalize its
    /// output. Only an unknown tool is a protocol error; everything else
    /// comes back as a (possibly error-flagged) result.
    pub async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult, JsonRpcError> {
        let tool = self
            .tools
            .get(&params.name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Tool {} not found", params.name)))?;

        debug!(session = %self.id, tool = %params.name, "Calling tool");
        let raw = match tool.execute(params.arguments, &self.config).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(session = %self.id, tool = %params.name, error = %e, "Tool call failed");
                RawToolResult::failure("Invalid tool call", format!("{:#}", e))
            }
        };
        Ok(normalize(raw))
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> Result<T, JsonRpcError> {
    let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}
