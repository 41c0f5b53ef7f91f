//! Replay protection for signed webhook deliveries.
//!
//! Every accepted signature is remembered until its expiry so that the same
//! signature cannot be accepted twice inside the window. The live set is
//! held in memory and mirrored to one of two backends:
//! - [`FileReplayStore`]: flat JSON object `{ "<signature>": <expiryMs> }`
//! - [`SqliteReplayStore`]: `replay_signatures(signature, expiry)` table
//!
//! Writes to the backend are debounced by [`FlushScheduler`] and forced on
//! shutdown.

mod cache;
mod file;
mod flush;
mod guard;
mod sqlite;
mod sweep;

pub use cache::{ReplayCache, ReplayEntry};
pub use file::FileReplayStore;
pub use flush::FlushScheduler;
pub use guard::ReplayGuard;
pub use sqlite::SqliteReplayStore;
pub use sweep::spawn_replay_sweeper;

use crate::config::{ReceiverConfig, ReplayBackend};
use anyhow::Result;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Storage contract for seen signatures.
///
/// The request path only uses the synchronous methods, which operate on the
/// in-memory live set; `flush` mirrors that set to durable storage.
pub trait ReplayStore: Send + Sync {
    fn cache(&self) -> &ReplayCache;

    fn backend(&self) -> ReplayBackend;

    /// Upper bound on entries written by `flush`.
    fn max_entries(&self) -> usize;

    fn flush(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    fn has(&self, signature: &str, now_ms: i64) -> bool {
        self.cache().has(signature, now_ms)
    }

    fn put(&self, signature: &str, expires_at_ms: i64) {
        self.cache().put(signature, expires_at_ms);
    }

    /// Atomic `has` + `put`; `false` means the signature is a replay.
    fn claim(&self, signature: &str, expires_at_ms: i64, now_ms: i64) -> bool {
        self.cache().claim(signature, expires_at_ms, now_ms)
    }

    fn purge_expired(&self, now_ms: i64) -> usize {
        self.cache().purge_expired(now_ms)
    }

    fn prune(&self, max_entries: usize) -> usize {
        self.cache().prune(max_entries)
    }

    fn len(&self) -> usize {
        self.cache().len()
    }

    fn is_empty(&self) -> bool {
        self.cache().is_empty()
    }
}

/// Open the backend selected by `config`, loading persisted entries and
/// dropping any that expired while the process was down.
pub async fn open_replay_store(
    config: &ReceiverConfig,
    now_ms: i64,
) -> Result<Arc<dyn ReplayStore>> {
    let store: Arc<dyn ReplayStore> = match config.replay_backend {
        ReplayBackend::Json => Arc::new(
            FileReplayStore::open(
                &config.replay_snapshot_path(),
                config.replay_max_entries,
                now_ms,
            )
            .await?,
        ),
        ReplayBackend::Sqlite => Arc::new(
            SqliteReplayStore::open(&config.replay_db_path(), config.replay_max_entries, now_ms)
                .await?,
        ),
    };
    tracing::info!(
        backend = %store.backend(),
        entries = store.len(),
        "replay store loaded"
    );
    Ok(store)
}
