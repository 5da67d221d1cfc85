//! MCP (Model Context Protocol) Server Core
//!
//! JSON-RPC 2.0 dialect with the MCP method surface: `initialize`,
//! `notifications/initialized`, `tools/list`, `tools/call`.
//!
//! ## Architecture
//!
//! - Transports: line-delimited stdio, or SSE + HTTP POST (see `server`)
//! - Tools: registered once at startup, dispatched by name
//! - Errors: protocol faults are JSON-RPC errors; handler-level failures are
//!   `isError: true` results so agents can display the diagnostic

pub mod context;
pub mod dispatcher;
pub mod protocol;
pub mod registry;

pub use context::ToolContext;
pub use dispatcher::Dispatcher;
pub use protocol::{McpError, McpRequest, McpResponse};
pub use registry::ToolRegistry;
