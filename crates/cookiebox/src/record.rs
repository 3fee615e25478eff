//! Persisted session records and the record store seam.
//!
//! This module defines the trait that decouples the session lifecycle from
//! a concrete storage engine. Implementations live in sibling crates (e.g.
//! `cookiebox-sqlite`) or in [`MemoryRecordStore`](crate::MemoryRecordStore).

use chrono::{DateTime, Utc};

use crate::error::Result;

/// A session record as held by the backing store.
///
/// The `data` column is opaque to the store: it carries the sealed values
/// payload and is only interpreted by the orchestrator's codec.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Unique identifier within the store's table. Immutable once assigned;
    /// a record re-created after expiry gets a fresh id.
    pub id: String,

    /// Sealed session payload.
    pub data: String,

    /// Absolute expiry. Records past this point are invalid for lookup even
    /// while they still physically exist.
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a new record.
    pub fn new(id: impl Into<String>, data: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
            expires_at,
        }
    }

    /// Whether the record's expiry has passed.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Trait for persistent keyed stores of session records.
///
/// All operations are scoped to the table the implementation was configured
/// with. Implementations must tolerate concurrent reads, writes, and sweeps;
/// the lifecycle layer adds no locking of its own.
pub trait RecordStore: Send + Sync {
    /// Idempotently create the backing table.
    ///
    /// Called at store construction unless table creation is skipped;
    /// a failure there is fatal to construction.
    fn ensure_schema(&self) -> Result<()>;

    /// Fetch a record by id. `Ok(None)` when absent.
    fn get(&self, id: &str) -> Result<Option<SessionRecord>>;

    /// Insert a new record. The id must be unique within the table.
    fn insert(&self, record: &SessionRecord) -> Result<()>;

    /// Update an existing record's data and expiry.
    ///
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) if the id no
    /// longer exists, e.g. because a sweep removed it concurrently.
    fn update(&self, record: &SessionRecord) -> Result<()>;

    /// Delete a record by id. Idempotent; absent ids are not an error.
    fn delete(&self, id: &str) -> Result<()>;

    /// Delete every record with `expires_at <= now`, returning the count.
    ///
    /// Must never touch non-expired records, so concurrent inserts of live
    /// sessions are unaffected by a sweep in progress.
    fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize>;
}
