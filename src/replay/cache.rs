use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One remembered signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayEntry {
    pub signature: String,
    pub expires_at_ms: i64,
}

/// In-memory live set of seen signatures, keyed by the signature string.
///
/// An entry is live while `expires_at_ms > now_ms`. Both persistence
/// backends sit on top of this map, so a claimed signature is visible to
/// the next request before any flush happens.
#[derive(Debug, Default)]
pub struct ReplayCache {
    entries: Mutex<HashMap<String, i64>>,
}

impl ReplayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from persisted entries, discarding those already expired.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, i64)>, now_ms: i64) -> Self {
        let live = entries
            .into_iter()
            .filter(|(_, expires_at_ms)| *expires_at_ms > now_ms)
            .collect();
        Self {
            entries: Mutex::new(live),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, i64>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has(&self, signature: &str, now_ms: i64) -> bool {
        self.lock()
            .get(signature)
            .is_some_and(|expires_at_ms| *expires_at_ms > now_ms)
    }

    pub fn put(&self, signature: &str, expires_at_ms: i64) {
        self.lock().insert(signature.to_string(), expires_at_ms);
    }

    /// Record `signature` unless a live entry already holds it.
    ///
    /// Returns `false` on replay and leaves the existing entry untouched.
    pub fn claim(&self, signature: &str, expires_at_ms: i64, now_ms: i64) -> bool {
        let mut entries = self.lock();
        if entries
            .get(signature)
            .is_some_and(|existing| *existing > now_ms)
        {
            return false;
        }
        entries.insert(signature.to_string(), expires_at_ms);
        true
    }

    pub fn purge_expired(&self, now_ms: i64) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, expires_at_ms| *expires_at_ms > now_ms);
        before - entries.len()
    }

    /// Keep the `max_entries` latest-expiring entries; returns how many were
    /// dropped.
    pub fn prune(&self, max_entries: usize) -> usize {
        let mut entries = self.lock();
        if entries.len() <= max_entries {
            return 0;
        }
        let mut ranked: Vec<(String, i64)> = entries.drain().collect();
        sort_latest_first(&mut ranked);
        let dropped = ranked.len() - max_entries;
        ranked.truncate(max_entries);
        entries.extend(ranked);
        dropped
    }

    /// Live entries, latest-expiring first, capped at `limit`.
    pub fn live_entries(&self, now_ms: i64, limit: usize) -> Vec<ReplayEntry> {
        let mut live: Vec<(String, i64)> = self
            .lock()
            .iter()
            .filter(|(_, expires_at_ms)| **expires_at_ms > now_ms)
            .map(|(signature, expires_at_ms)| (signature.clone(), *expires_at_ms))
            .collect();
        sort_latest_first(&mut live);
        live.truncate(limit);
        live.into_iter()
            .map(|(signature, expires_at_ms)| ReplayEntry {
                signature,
                expires_at_ms,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn sort_latest_first(entries: &mut [(String, i64)]) {
    entries.sort_by(|a, b| {
        Reverse(a.1)
            .cmp(&Reverse(b.1))
            .then_with(|| a.0.cmp(&b.0))
    });
}
