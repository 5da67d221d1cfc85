//! Tool Execution Context
//!
//! Provides handlers with the shared resources and the per-request
//! cancellation scope.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::record_store::RecordStore;

/// Context provided to tool handlers during execution.
#[derive(Clone)]
pub struct ToolContext {
    /// Per-request cancellation scope. Cancelled on client disconnect and on
    /// the request deadline; handlers must propagate it into subprocesses.
    pub cancellation: CancellationToken,

    /// Access to the execution record log.
    pub record_store: Arc<dyn RecordStore>,
}

impl ToolContext {
    pub fn new(cancellation: CancellationToken, record_store: Arc<dyn RecordStore>) -> Self {
        Self {
            cancellation,
            record_store,
        }
    }

    /// Best-effort persistence: a failed insert is logged and never fails the
    /// tool call.
    pub fn persist(&self, tool_name: &str, output: &str) {
        if let Err(e) = self.record_store.save(tool_name, output) {
            warn!("Failed to record {} output: {}", tool_name, e);
        }
    }
}
