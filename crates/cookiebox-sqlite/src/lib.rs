//! SQLite record store for the cookiebox session engine.
//!
//! Persists session records in a single table using rusqlite. Uses WAL mode
//! so request flows and the cleanup sweeper can hit the database
//! concurrently. The table name is configurable per instance; distinct
//! tables are fully isolated.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OpenFlags};
use tracing::{debug, trace};

use cookiebox::{Error, RecordStore, Result, SessionRecord, DEFAULT_TABLE_NAME};

/// A [`RecordStore`] backed by a SQLite database.
///
/// The connection is serialized behind a mutex; SQLite's own locking covers
/// cross-connection concurrency (e.g. a second store instance or an
/// inspection tool on the same file).
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    table: String,
}

impl std::fmt::Debug for SqliteRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRecordStore")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl SqliteRecordStore {
    /// Open or create a database at the given path, using the default table.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_table(path, DEFAULT_TABLE_NAME)
    }

    /// Open or create a database at the given path with an explicit table.
    pub fn open_with_table(path: impl AsRef<Path>, table: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| Error::Backend(format!("create {}: {}", parent.display(), e)))?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )
        .map_err(db_err)?;

        conn.pragma_update(None, "journal_mode", "WAL").map_err(db_err)?;
        conn.pragma_update(None, "synchronous", "NORMAL").map_err(db_err)?;
        conn.busy_timeout(std::time::Duration::from_secs(5)).map_err(db_err)?;

        Self::from_connection(conn, table)
    }

    /// Create a store over an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        Self::open_in_memory_with_table(DEFAULT_TABLE_NAME)
    }

    /// Create an in-memory store with an explicit table.
    pub fn open_in_memory_with_table(table: impl Into<String>) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        Self::from_connection(conn, table)
    }

    /// Wrap an existing connection.
    ///
    /// The table name is validated here because it is interpolated into
    /// SQL; only bare identifiers are accepted.
    pub fn from_connection(conn: Connection, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self {
            conn: Mutex::new(conn),
            table,
        })
    }

    /// The table this store reads and writes.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Whether the backing table exists.
    pub fn table_exists(&self) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![self.table],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(count > 0)
    }

    /// Drop the backing table if it exists. Intended for tests and tooling.
    pub fn drop_table(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {}", self.table))
            .map_err(db_err)?;
        Ok(())
    }
}

impl RecordStore for SqliteRecordStore {
    fn ensure_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                expires_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_expires_at ON {table}(expires_at);
            "#,
            table = self.table
        ))
        .map_err(db_err)?;

        debug!(table = %self.table, "Session table ready");
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<SessionRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, data, expires_at FROM {} WHERE id = ?1",
                self.table
            ))
            .map_err(db_err)?;

        let mut rows = stmt.query(params![id]).map_err(db_err)?;
        match rows.next().map_err(db_err)? {
            Some(row) => Ok(Some(row_to_record(row)?)),
            None => Ok(None),
        }
    }

    fn insert(&self, record: &SessionRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (id, data, expires_at) VALUES (?1, ?2, ?3)",
                self.table
            ),
            params![record.id, record.data, record.expires_at.timestamp()],
        )
        .map_err(db_err)?;

        trace!(table = %self.table, id = %record.id, "Inserted session record");
        Ok(())
    }

    fn update(&self, record: &SessionRecord) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let rows_affected = conn
            .execute(
                &format!(
                    "UPDATE {} SET data = ?2, expires_at = ?3 WHERE id = ?1",
                    self.table
                ),
                params![record.id, record.data, record.expires_at.timestamp()],
            )
            .map_err(db_err)?;

        if rows_affected == 0 {
            return Err(Error::NotFound(record.id.clone()));
        }
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", self.table),
            params![id],
        )
        .map_err(db_err)?;
        Ok(())
    }

    fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let swept = conn
            .execute(
                &format!("DELETE FROM {} WHERE expires_at <= ?1", self.table),
                params![now.timestamp()],
            )
            .map_err(db_err)?;

        if swept > 0 {
            debug!(table = %self.table, swept, "Swept expired session records");
        }
        Ok(swept)
    }
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::Backend(e.to_string())
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<SessionRecord> {
    let id: String = row.get(0).map_err(db_err)?;
    let data: String = row.get(1).map_err(db_err)?;
    let ts: i64 = row.get(2).map_err(db_err)?;
    // An out-of-range timestamp falls back to the epoch, which simply reads
    // as expired.
    let expires_at = DateTime::from_timestamp(ts, 0).unwrap_or_default();
    Ok(SessionRecord::new(id, data, expires_at))
}

/// Only bare identifiers may name the table; it is spliced into SQL text.
fn validate_table_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    if valid_start && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(())
    } else {
        Err(Error::Backend(format!("invalid table name: {:?}", name)))
    }
}
