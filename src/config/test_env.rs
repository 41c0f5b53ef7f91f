use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Every variable `apply_env_overrides` reads.
const RECEIVER_ENV_KEYS: [&str; 9] = [
    "PORT",
    "HOST",
    "PRIVATE_LOG_TOKEN",
    "PRIVATE_LOG_HMAC_SECRET",
    "PRIVATE_LOG_HMAC_TTL",
    "PRIVATE_LOG_REPLAY_MAX_ENTRIES",
    "PRIVATE_LOG_USE_SQLITE",
    "DEBUG_PRIVATE_RECEIVER",
    "PRIVATE_LOG_DATA_DIR",
];

/// Holds the process-wide env lock and restores every touched variable on
/// drop. Starts with all receiver variables unset so ambient values from the
/// test runner cannot leak into assertions.
pub(super) struct EnvScope {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvScope {
    pub(super) fn isolated() -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let mut scope = Self {
            saved: Vec::new(),
            _lock: lock,
        };
        for key in RECEIVER_ENV_KEYS {
            scope.unset(key);
        }
        scope
    }

    pub(super) fn set(&mut self, key: &'static str, value: &str) -> &mut Self {
        self.remember(key);
        // SAFETY: ENV_LOCK is held for the lifetime of the scope, so no
        // other test mutates the environment concurrently.
        unsafe {
            std::env::set_var(key, value);
        }
        self
    }

    pub(super) fn unset(&mut self, key: &'static str) -> &mut Self {
        self.remember(key);
        // SAFETY: see `set`.
        unsafe {
            std::env::remove_var(key);
        }
        self
    }

    fn remember(&mut self, key: &'static str) {
        if !self.saved.iter().any(|(saved, _)| *saved == key) {
            self.saved.push((key, std::env::var(key).ok()));
        }
    }
}

impl Drop for EnvScope {
    fn drop(&mut self) {
        for (key, previous) in self.saved.drain(..).rev() {
            // SAFETY: restoration runs before the lock guard field drops.
            unsafe {
                match previous {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
