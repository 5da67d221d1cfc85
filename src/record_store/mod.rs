//! Execution Record Store
//!
//! Append-only log of tool outputs, queried by time range and tool name.
//! Persistence is best-effort: callers log a warning on a failed save and
//! carry on with the tool call.

mod null_record_store;
mod sqlite_record_store;

pub use null_record_store::NullRecordStore;
pub use sqlite_record_store::SqliteRecordStore;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A persisted snapshot of one tool invocation's output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: i64,
    /// Local time formatted as YYYYMMDDhhmmss; lexicographic order is the
    /// query order.
    pub timestamp: String,
    pub tool_name: String,
    pub output: String,
}

/// Storage for execution records.
pub trait RecordStore: Send + Sync {
    /// Append a record, stamping it with the current local time.
    fn save(&self, tool_name: &str, output: &str) -> Result<()>;

    /// Fetch records filtered by tool name and half-open `[start, end)`
    /// timestamp interval, newest first.
    fn query(
        &self,
        tool_name: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<Record>>;
}

/// Current local time formatted as YYYYMMDDhhmmss.
pub fn local_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}
