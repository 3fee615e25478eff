//! The in-memory session entity, scoped to one request.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::SessionOptions;
use crate::error::Result;

/// One session during a single request.
///
/// Created by [`Store::get`](crate::Store::get), mutated by the caller, and
/// written back by [`Store::save`](crate::Store::save). The values map holds
/// arbitrary JSON-representable data; typed accessors convert through
/// [`serde_json::Value`].
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    name: String,

    /// The key/value mapping the application reads and writes.
    pub values: HashMap<String, Value>,

    /// Policy applied on the next save. Set `max_age` negative to delete.
    pub options: SessionOptions,

    is_new: bool,
}

impl Session {
    /// Create a fresh session with no persisted record behind it.
    pub(crate) fn fresh(name: &str, options: SessionOptions) -> Self {
        Self {
            id: String::new(),
            name: name.to_string(),
            values: HashMap::new(),
            options,
            is_new: true,
        }
    }

    /// Materialize a session from a persisted record's values.
    pub(crate) fn loaded(
        name: &str,
        id: String,
        values: HashMap<String, Value>,
        options: SessionOptions,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            values,
            options,
            is_new: false,
        }
    }

    /// Record id backing this session. Empty until the first save.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.id = id;
    }

    /// The token name this session was loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the session has no persisted record yet.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    pub(crate) fn mark_saved(&mut self) {
        self.is_new = false;
    }

    /// Get a value, deserialized into the requested type.
    ///
    /// Returns `None` when the key is absent or the value has a different
    /// shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Insert a value, replacing any previous entry for the key.
    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.values.insert(key.into(), value);
        Ok(())
    }

    /// Remove a value, returning the raw entry if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }
}
