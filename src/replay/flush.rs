use super::ReplayStore;
use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

/// Debounces replay-store writes.
///
/// `schedule_flush` (re)starts a short timer so a burst of accepted requests
/// produces one write. `flush_now` cancels the timer and writes immediately;
/// it is what shutdown calls.
///
/// A timer is only ever cancelled while it sleeps. Once it owns the write
/// lock it runs to completion, and every write happens under that lock, so
/// no two writes overlap.
pub struct FlushScheduler {
    store: Arc<dyn ReplayStore>,
    delay: Duration,
    pending: Mutex<Option<PendingFlush>>,
    generation: Arc<AtomicU64>,
    write_lock: Arc<tokio::sync::Mutex<()>>,
}

struct PendingFlush {
    handle: JoinHandle<()>,
    cancel: Arc<Notify>,
}

impl PendingFlush {
    fn cancel(self) {
        // A permit left behind by a timer that already woke is never read.
        self.cancel.notify_one();
    }
}

/// Prune then write. The caller holds the write lock.
async fn persist_locked(store: &dyn ReplayStore) -> Result<()> {
    let dropped = store.prune(store.max_entries());
    if dropped > 0 {
        tracing::debug!(dropped, "replay cache truncated to max entries");
    }
    store.flush().await
}

impl FlushScheduler {
    pub fn new(store: Arc<dyn ReplayStore>, delay: Duration) -> Self {
        Self {
            store,
            delay,
            pending: Mutex::new(None),
            generation: Arc::new(AtomicU64::new(0)),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn store(&self) -> &Arc<dyn ReplayStore> {
        &self.store
    }

    /// Start (or restart) the debounce timer.
    pub fn schedule_flush(&self) {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = Arc::new(Notify::new());

        let store = Arc::clone(&self.store);
        let write_lock = Arc::clone(&self.write_lock);
        let generation = Arc::clone(&self.generation);
        let delay = self.delay;
        let cancelled = Arc::clone(&cancel);
        let handle = tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = cancelled.notified() => return,
            }
            let _guard = write_lock.lock().await;
            // Superseded by a newer timer or by `flush_now` while waiting.
            if generation.load(Ordering::SeqCst) != ticket {
                return;
            }
            if let Err(error) = persist_locked(store.as_ref()).await {
                tracing::warn!(
                    backend = %store.backend(),
                    "replay flush failed: {error:#}"
                );
            }
        });

        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(PendingFlush { handle, cancel });
        if let Some(previous) = previous {
            previous.cancel();
        }
    }

    /// Cancel any sleeping timer, wait for an in-flight write, then write.
    pub async fn flush_now(&self) -> Result<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pending) = pending {
            pending.cancel();
        }
        let _guard = self.write_lock.lock().await;
        persist_locked(self.store.as_ref()).await
    }

    /// True while a scheduled flush has not yet completed.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|pending| !pending.handle.is_finished())
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(pending) = self
            .pending
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            pending.cancel();
        }
    }
}

impl std::fmt::Debug for FlushScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlushScheduler")
            .field("backend", &self.store.backend())
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}
