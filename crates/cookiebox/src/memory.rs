//! In-memory record store for tests and ephemeral deployments.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::error::{Error, Result};
use crate::record::{RecordStore, SessionRecord};

/// A [`RecordStore`] backed by a mutex-guarded hash map.
///
/// Durable only for the process lifetime. Useful as a test double and for
/// deployments that accept losing sessions on restart.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, SessionRecord>>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held, expired ones included.
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.lock().unwrap().is_empty()
    }
}

impl RecordStore for MemoryRecordStore {
    fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<SessionRecord>> {
        Ok(self.records.lock().unwrap().get(id).cloned())
    }

    fn insert(&self, record: &SessionRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        if records.contains_key(&record.id) {
            return Err(Error::Backend(format!("duplicate record id: {}", record.id)));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn update(&self, record: &SessionRecord) -> Result<()> {
        let mut records = self.records.lock().unwrap();
        match records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(Error::NotFound(record.id.clone())),
        }
    }

    fn delete(&self, id: &str) -> Result<()> {
        self.records.lock().unwrap().remove(id);
        Ok(())
    }

    fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, record| record.expires_at > now);
        let swept = before - records.len();
        if swept > 0 {
            trace!(swept, "Swept expired records");
        }
        Ok(swept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, offset_secs: i64) -> SessionRecord {
        SessionRecord::new(id, "data", Utc::now() + chrono::Duration::seconds(offset_secs))
    }

    #[test]
    fn test_insert_and_get() {
        let store = MemoryRecordStore::new();
        store.insert(&record("a", 60)).unwrap();

        let fetched = store.get("a").unwrap().unwrap();
        assert_eq!(fetched.id, "a");
        assert_eq!(fetched.data, "data");
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let store = MemoryRecordStore::new();
        store.insert(&record("a", 60)).unwrap();
        assert!(matches!(store.insert(&record("a", 60)), Err(Error::Backend(_))));
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = MemoryRecordStore::new();
        let result = store.update(&record("ghost", 60));
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = MemoryRecordStore::new();
        store.insert(&record("a", 60)).unwrap();
        store.delete("a").unwrap();
        store.delete("a").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_delete_expired_spares_live_records() {
        let store = MemoryRecordStore::new();
        store.insert(&record("old", -60)).unwrap();
        store.insert(&record("live", 60)).unwrap();

        let swept = store.delete_expired(Utc::now()).unwrap();
        assert_eq!(swept, 1);
        assert!(store.get("old").unwrap().is_none());
        assert!(store.get("live").unwrap().is_some());
    }
}
