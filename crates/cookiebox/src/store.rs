//! The store orchestrator: the public session lifecycle API.

use std::collections::HashMap;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::codec::{Key, TokenCodec};
use crate::config::{SessionOptions, StoreOptions, DEFAULT_MAX_AGE, DEFAULT_MAX_LENGTH};
use crate::error::{Error, Result};
use crate::record::{RecordStore, SessionRecord};
use crate::session::Session;
use crate::transport::TokenTransport;

/// Session store tying the token codec and a record store together.
///
/// One instance per logical store; configuration is fixed at construction,
/// so multiple differently configured stores can coexist. All lifecycle
/// methods take `&self` and the store is `Send + Sync` whenever its backend
/// is, so it can be shared across request flows behind an `Arc`.
pub struct Store<B> {
    backend: B,
    codec: TokenCodec,
    opts: StoreOptions,
    max_length: usize,
}

impl<B: RecordStore> Store<B> {
    /// Create a store with default options.
    ///
    /// Fails if the key material is unusable or schema creation fails.
    pub fn new(backend: B, keys: Vec<Key>) -> Result<Self> {
        Self::with_options(backend, StoreOptions::default(), keys)
    }

    /// Create a store with explicit options.
    pub fn with_options(backend: B, opts: StoreOptions, keys: Vec<Key>) -> Result<Self> {
        let codec = TokenCodec::new(keys)?;
        if !opts.skip_create_table {
            backend.ensure_schema()?;
        }
        Ok(Self {
            backend,
            codec,
            opts,
            max_length: DEFAULT_MAX_LENGTH,
        })
    }

    /// The store's configuration.
    pub fn options(&self) -> &StoreOptions {
        &self.opts
    }

    /// Direct access to the backing record store.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Set the maximum allowed length of a sealed session payload.
    ///
    /// The bound counts the sealed (signed, optionally encrypted) value
    /// that would be persisted, not the raw values map.
    pub fn set_max_length(&mut self, max_length: usize) {
        self.max_length = max_length;
    }

    /// Replace the default options handed to fresh sessions.
    pub fn set_default_options(&mut self, options: SessionOptions) {
        self.opts.session_options = options;
    }

    /// Fetch the session for `name`, or a fresh one.
    ///
    /// A missing token, a token that fails verification, a missing record,
    /// or an expired record all degrade to a fresh session; none of them is
    /// an error. Only backend I/O failures are surfaced. This method never
    /// mutates persisted state.
    pub fn get(&self, transport: &impl TokenTransport, name: &str) -> Result<Session> {
        let Some(token) = transport.read_token(name) else {
            trace!(name, "No inbound token, starting fresh session");
            return Ok(self.fresh(name));
        };

        let id = match self.codec.open(name, &token) {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(id) => id,
                Err(_) => return Ok(self.fresh(name)),
            },
            Err(_) => {
                debug!(name, "Inbound token failed verification, starting fresh session");
                return Ok(self.fresh(name));
            }
        };

        let Some(record) = self.backend.get(&id)? else {
            debug!(name, id, "No record behind token, starting fresh session");
            return Ok(self.fresh(name));
        };

        if record.is_expired() {
            debug!(name, id, "Record expired, starting fresh session");
            return Ok(self.fresh(name));
        }

        let values = match self.open_values(name, &record.data) {
            Some(values) => values,
            // Unreadable data is treated like a tampered token.
            None => return Ok(self.fresh(name)),
        };

        trace!(name, id, "Loaded session");
        Ok(Session::loaded(name, id, values, self.opts.session_options.clone()))
    }

    /// Persist the session and write its token to the transport.
    ///
    /// A negative `max_age` deletes the record and clears the client token.
    /// Otherwise the values are sealed, the size bound enforced, the record
    /// inserted or updated, and only then the token written, so a failed
    /// persistence never leaves a partial transport write.
    pub fn save(
        &self,
        transport: &mut impl TokenTransport,
        session: &mut Session,
    ) -> Result<()> {
        if session.options.max_age < 0 {
            if !session.id().is_empty() {
                self.backend.delete(session.id())?;
                debug!(name = session.name(), id = session.id(), "Deleted session record");
            }
            transport.write_token(session.name(), "", &session.options);
            return Ok(());
        }

        let json = serde_json::to_vec(&session.values)?;
        let sealed = self.codec.seal(session.name(), &json)?;
        if sealed.len() > self.max_length {
            return Err(Error::TooLarge {
                len: sealed.len(),
                max: self.max_length,
            });
        }

        let expires_at = Utc::now() + chrono::Duration::seconds(self.horizon(&session.options));

        if session.id().is_empty() {
            session.set_id(Uuid::new_v4().to_string());
            let record = SessionRecord::new(session.id(), sealed, expires_at);
            self.backend.insert(&record)?;
            session.mark_saved();
            debug!(name = session.name(), id = session.id(), "Inserted session record");
        } else {
            let record = SessionRecord::new(session.id(), sealed, expires_at);
            self.backend.update(&record)?;
            trace!(name = session.name(), id = session.id(), "Updated session record");
        }

        let token = self.codec.seal(session.name(), session.id().as_bytes())?;
        transport.write_token(session.name(), &token, &session.options);
        Ok(())
    }

    /// Delete the session: equivalent to a save with `max_age = -1`.
    pub fn delete(
        &self,
        transport: &mut impl TokenTransport,
        session: &mut Session,
    ) -> Result<()> {
        session.options.max_age = -1;
        self.save(transport, session)
    }

    /// Sweep expired records once, synchronously. Returns the sweep count.
    pub fn cleanup(&self) -> Result<usize> {
        let swept = self.backend.delete_expired(Utc::now())?;
        if swept > 0 {
            debug!(swept, table = %self.opts.table_name, "Cleaned up expired session records");
        }
        Ok(swept)
    }

    fn fresh(&self, name: &str) -> Session {
        Session::fresh(name, self.opts.session_options.clone())
    }

    /// Expiry horizon in seconds for a save: the session's own max age if
    /// positive, else the store default, else the library default.
    fn horizon(&self, options: &SessionOptions) -> i64 {
        if options.max_age > 0 {
            options.max_age
        } else if self.opts.session_options.max_age > 0 {
            self.opts.session_options.max_age
        } else {
            DEFAULT_MAX_AGE
        }
    }

    fn open_values(&self, name: &str, data: &str) -> Option<HashMap<String, Value>> {
        let bytes = self.codec.open(name, data).ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

impl<B: std::fmt::Debug> std::fmt::Debug for Store<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("backend", &self.backend)
            .field("opts", &self.opts)
            .field("max_length", &self.max_length)
            .finish_non_exhaustive()
    }
}
