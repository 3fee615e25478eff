//! Background sweep of expired session records.
//!
//! The scheduler shares nothing with request flows except the record store
//! itself; cancellation is observed cooperatively between sweeps, so an
//! in-progress sweep is allowed to finish but no further sweep starts.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::record::RecordStore;
use crate::store::Store;

/// Sweep expired records immediately and then on every `interval` tick
/// until `cancel` fires.
///
/// Sweep errors are logged and do not terminate the loop; the backing store
/// may simply be unavailable for a while.
pub async fn periodic_cleanup<B: RecordStore>(
    store: Arc<Store<B>>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Periodic cleanup cancelled");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = store.cleanup() {
                    warn!(error = %e, "Periodic cleanup sweep failed");
                }
            }
        }
    }
}

impl<B: RecordStore + 'static> Store<B> {
    /// Spawn [`periodic_cleanup`] on the current runtime.
    ///
    /// Returns the task handle and the token that stops it.
    pub fn spawn_periodic_cleanup(
        self: &Arc<Self>,
        interval: Duration,
    ) -> (JoinHandle<()>, CancellationToken) {
        let cancel = CancellationToken::new();
        let task = periodic_cleanup(Arc::clone(self), interval, cancel.clone());
        (tokio::spawn(task), cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Key;
    use crate::config::{SessionOptions, StoreOptions};
    use crate::memory::MemoryRecordStore;
    use crate::transport::MemoryTransport;

    fn short_lived_store() -> Arc<Store<MemoryRecordStore>> {
        let opts = StoreOptions::new()
            .with_session_options(SessionOptions::new().with_max_age(1));
        Arc::new(
            Store::with_options(
                MemoryRecordStore::new(),
                opts,
                vec![Key::new("secret").unwrap()],
            )
            .unwrap(),
        )
    }

    fn save_one(store: &Store<MemoryRecordStore>) -> String {
        let mut transport = MemoryTransport::new();
        let mut session = store.get(&transport, "session").unwrap();
        session.insert("k", 1).unwrap();
        store.save(&mut transport, &mut session).unwrap();
        session.id().to_string()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_periodic_cleanup_sweeps_expired_records() {
        let store = short_lived_store();
        let (handle, cancel) = store.spawn_periodic_cleanup(Duration::from_millis(200));

        let id = save_one(&store);
        assert!(store.backend().get(&id).unwrap().is_some());

        // max_age is 1s; within ~2s the sweep must have removed it.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(store.backend().get(&id).unwrap().is_none());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancelled_cleanup_stops_sweeping() {
        let store = short_lived_store();
        let (handle, cancel) = store.spawn_periodic_cleanup(Duration::from_millis(200));

        cancel.cancel();
        handle.await.unwrap();

        let id = save_one(&store);
        tokio::time::sleep(Duration::from_secs(2)).await;

        // Expired by now, but nothing swept it.
        assert!(store.backend().get(&id).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_first_sweep_is_immediate() {
        let store = short_lived_store();

        // Plant an already-expired record before the task starts.
        let id = save_one(&store);
        let mut record = store.backend().get(&id).unwrap().unwrap();
        record.expires_at = chrono::Utc::now() - chrono::Duration::seconds(5);
        store.backend().update(&record).unwrap();

        let (handle, cancel) = store.spawn_periodic_cleanup(Duration::from_secs(3600));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(store.backend().get(&id).unwrap().is_none());

        cancel.cancel();
        handle.await.unwrap();
    }
}
