use anyhow::{bail, Result};

use super::{Record, RecordStore};

/// Record store used when no record directory is configured.
///
/// Saves silently succeed so tool calls never fail on persistence; queries
/// report that the store is disabled.
pub struct NullRecordStore;

impl RecordStore for NullRecordStore {
    fn save(&self, _tool_name: &str, _output: &str) -> Result<()> {
        Ok(())
    }

    fn query(
        &self,
        _tool_name: Option<&str>,
        _start: Option<&str>,
        _end: Option<&str>,
    ) -> Result<Vec<Record>> {
        bail!("record store is not configured (start the server with -D <dir>)")
    }
}
