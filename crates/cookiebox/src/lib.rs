//! Server-side session store with signed, optionally encrypted client tokens.
//!
//! This crate implements the session lifecycle engine: it seals a small
//! identifier into a token handed to the client, persists the session's
//! key/value data in a durable record store, and reclaims expired records
//! on demand or on a cancellable schedule.
//!
//! Storage and transport are seams, not dependencies: any type implementing
//! [`RecordStore`] can hold records (a SQLite implementation ships in the
//! `cookiebox-sqlite` crate, an in-memory one here), and any type
//! implementing [`TokenTransport`] can carry tokens.
//!
//! # Example
//!
//! ```rust
//! use cookiebox::{Key, MemoryRecordStore, MemoryTransport, Store};
//!
//! # fn example() -> cookiebox::Result<()> {
//! let store = Store::new(MemoryRecordStore::new(), vec![Key::new("secret")?])?;
//!
//! let mut transport = MemoryTransport::new();
//! let mut session = store.get(&transport, "session")?;
//! session.insert("user_id", 42)?;
//! store.save(&mut transport, &mut session)?;
//!
//! // The outbound token round-trips to the same values.
//! let transport = transport.into_next_request();
//! let session = store.get(&transport, "session")?;
//! assert_eq!(session.get::<i64>("user_id"), Some(42));
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod cleanup;
mod codec;
mod config;
mod error;
mod memory;
mod record;
mod session;
mod store;
mod transport;

pub use cleanup::periodic_cleanup;
pub use codec::{Key, TokenCodec};
pub use config::{
    SessionOptions, StoreOptions, DEFAULT_MAX_AGE, DEFAULT_MAX_LENGTH, DEFAULT_TABLE_NAME,
};
pub use error::{Error, Result};
pub use memory::MemoryRecordStore;
pub use record::{RecordStore, SessionRecord};
pub use session::Session;
pub use store::Store;
pub use transport::{MemoryTransport, TokenTransport};
