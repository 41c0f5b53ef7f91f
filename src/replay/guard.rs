//! Replay protection for the webhook endpoint.
//!
//! Tracks accepted signature strings within a TTL window. A signature is
//! recorded in memory before the request is acknowledged; persistence is
//! handed to the debounced flush scheduler.

use super::{FlushScheduler, ReplayStore};
use crate::error::HookError;
use std::sync::Arc;
use std::time::Duration;

pub struct ReplayGuard {
    scheduler: Arc<FlushScheduler>,
    ttl: Duration,
}

impl ReplayGuard {
    pub fn new(scheduler: Arc<FlushScheduler>, ttl: Duration) -> Self {
        Self { scheduler, ttl }
    }

    pub fn store(&self) -> &Arc<dyn ReplayStore> {
        self.scheduler.store()
    }

    pub fn scheduler(&self) -> &Arc<FlushScheduler> {
        &self.scheduler
    }

    /// `Ok` if new (process), `Err(HookError::Replay)` if seen inside the
    /// window (reject).
    pub fn check_and_record(&self, signature: &str, now_ms: i64) -> Result<(), HookError> {
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let expires_at_ms = now_ms.saturating_add(ttl_ms);
        if !self.store().claim(signature, expires_at_ms, now_ms) {
            return Err(HookError::Replay);
        }
        self.scheduler.schedule_flush();
        Ok(())
    }
}

impl std::fmt::Debug for ReplayGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayGuard")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
