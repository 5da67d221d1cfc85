//! mcp-netutil Library
//!
//! Exposes the internal modules for integration tests and potential reuse.

pub mod api_key;
pub mod mcp;
pub mod record_store;
pub mod runner;
pub mod server;
pub mod tools;

// Re-export commonly used types for convenience
pub use mcp::{Dispatcher, ToolRegistry};
pub use record_store::{NullRecordStore, RecordStore, SqliteRecordStore};
pub use server::{make_app, run_sse_server, run_stdio_server, ServerConfig};
