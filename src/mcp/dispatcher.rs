//! JSON-RPC Method Dispatch
//!
//! Routes decoded requests to lifecycle handlers or the tool registry and
//! shapes results and errors. Transport-agnostic: the stdio loop and the SSE
//! POST workers both feed requests through here.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::context::ToolContext;
use super::protocol::{
    methods, InitializeResult, McpError, McpRequest, McpResponse, ServerCapabilities, ServerInfo,
    ToolsCallParams, ToolsCapability, ToolsListResult, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use super::registry::ToolRegistry;
use crate::record_store::RecordStore;

/// Deadline applied to every tool call, on both transports.
pub const TOOL_CALL_TIMEOUT: Duration = Duration::from_secs(300);

/// Routes requests to the registry and lifecycle handlers.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    record_store: Arc<dyn RecordStore>,
    server_version: String,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, record_store: Arc<dyn RecordStore>) -> Self {
        Self {
            registry,
            record_store,
            server_version: format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("GIT_HASH")),
        }
    }

    /// Handle a single request. Returns `None` for notifications, which must
    /// not produce a frame on any transport.
    ///
    /// `cancel` is the caller's scope (the SSE session token, or a fresh token
    /// on stdio); each tool call runs under a child of it.
    pub async fn dispatch(
        &self,
        request: McpRequest,
        cancel: &CancellationToken,
    ) -> Option<McpResponse> {
        self.dispatch_with_deadline(request, cancel, TOOL_CALL_TIMEOUT)
            .await
    }

    pub(crate) async fn dispatch_with_deadline(
        &self,
        request: McpRequest,
        cancel: &CancellationToken,
        deadline: Duration,
    ) -> Option<McpResponse> {
        if request.is_notification() {
            // Everything without an id is dropped silently, including
            // requests that would otherwise be errors.
            debug!("Dropping notification: {}", request.method);
            return None;
        }
        let id = request.id.clone()?;

        let result = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(),
            methods::INITIALIZED => return None,
            methods::TOOLS_LIST => self.handle_tools_list(),
            methods::TOOLS_CALL => {
                self.handle_tools_call(request.params, cancel, deadline)
                    .await
            }
            other => Err(McpError::MethodNotFound(format!("Method '{}'", other))),
        };

        Some(match result {
            Ok(value) => McpResponse::success(id, value),
            Err(error) => McpResponse::error(Some(id), error),
        })
    }

    fn handle_initialize(&self) -> Result<Value, McpError> {
        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {},
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: self.server_version.clone(),
            },
        };

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    fn handle_tools_list(&self) -> Result<Value, McpError> {
        let result = ToolsListResult {
            tools: self.registry.tools(),
        };

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_tools_call(
        &self,
        params: Option<Value>,
        cancel: &CancellationToken,
        deadline: Duration,
    ) -> Result<Value, McpError> {
        let params: ToolsCallParams = params
            .ok_or_else(|| McpError::ParseError("missing params".to_string()))
            .and_then(|p| {
                serde_json::from_value(p).map_err(|e| McpError::ParseError(e.to_string()))
            })?;

        let tool = self
            .registry
            .get_tool(&params.name)
            .ok_or_else(|| McpError::MethodNotFound(format!("Tool '{}'", params.name)))?;

        let call_cancel = cancel.child_token();
        let ctx = ToolContext::new(call_cancel.clone(), self.record_store.clone());
        let arguments = params.arguments.unwrap_or_else(|| serde_json::json!({}));

        let result = match tokio::time::timeout(deadline, (tool.handler)(ctx, arguments)).await {
            Ok(result) => result?,
            Err(_) => {
                // Cancel the call's scope so any subprocess dies with it.
                call_cancel.cancel();
                warn!("Tool call '{}' hit the {}s deadline", params.name, deadline.as_secs());
                return Err(McpError::RequestTimeout);
            }
        };

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }
}
