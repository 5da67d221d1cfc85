use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{params_from_iter, Connection};
use tracing::info;

use super::{local_timestamp, Record, RecordStore};

/// Name of the database file inside the configured directory.
const DB_FILE_NAME: &str = "cache.db";

/// SQLite-backed record store.
///
/// The connection is serialized behind a mutex; every method is safe for
/// concurrent use from multiple tasks.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    /// Open (or create) the store rooted at `dir`.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create record directory {:?}", dir))?;

        let db_path = dir.join(DB_FILE_NAME);
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open record database {:?}", db_path))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT,
                tool_name TEXT,
                output TEXT
            )",
            [],
        )
        .context("Failed to create records table")?;

        info!("Record store initialized at {:?}", db_path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<Record> {
        Ok(Record {
            id: row.get("id")?,
            timestamp: row.get("timestamp")?,
            tool_name: row.get("tool_name")?,
            output: row.get("output")?,
        })
    }
}

impl RecordStore for SqliteRecordStore {
    fn save(&self, tool_name: &str, output: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO records (timestamp, tool_name, output) VALUES (?1, ?2, ?3)",
            rusqlite::params![local_timestamp(), tool_name, output],
        )?;
        Ok(())
    }

    fn query(
        &self,
        tool_name: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<Record>> {
        let mut sql =
            String::from("SELECT id, timestamp, tool_name, output FROM records WHERE 1=1");
        let mut args: Vec<String> = Vec::new();

        if let Some(tool_name) = tool_name {
            sql.push_str(" AND tool_name = ?");
            args.push(tool_name.to_string());
        }
        if let Some(start) = start {
            sql.push_str(" AND timestamp >= ?");
            args.push(start.to_string());
        }
        if let Some(end) = end {
            sql.push_str(" AND timestamp < ?");
            args.push(end.to_string());
        }

        // Ties on timestamp fall back to insertion order.
        sql.push_str(" ORDER BY timestamp DESC, id DESC");

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_from_iter(args.iter()), Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }
}
