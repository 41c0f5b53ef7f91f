use crate::security::HookSecrets;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Persistence backend for the replay cache.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReplayBackend {
    /// In-memory map snapshotted to a flat JSON object file.
    #[default]
    Json,
    /// Embedded SQLite table.
    Sqlite,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ReceiverConfig {
    /// Bind host (default: 0.0.0.0)
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port (default: 3001)
    #[serde(default = "default_port")]
    pub port: u16,
    /// Static bearer secret checked against `Authorization: Bearer <token>`
    #[serde(default)]
    pub token: Option<String>,
    /// Shared HMAC-SHA256 secret for signature verification
    #[serde(default)]
    pub hmac_secret: Option<String>,
    /// Timestamp window and replay-entry lifetime, in seconds (default: 300)
    #[serde(default = "default_hmac_ttl_secs")]
    pub hmac_ttl_secs: u64,
    /// Maximum replay entries retained when persisting (default: 2000)
    #[serde(default = "default_replay_max_entries")]
    pub replay_max_entries: usize,
    #[serde(default)]
    pub replay_backend: ReplayBackend,
    /// Verbose diagnostics on signature and replay failures
    #[serde(default)]
    pub debug: bool,
    /// Root for `received/` and the replay cache files (default: .)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Quiet period before a scheduled replay flush runs (default: 500ms)
    #[serde(default = "default_flush_debounce_ms")]
    pub flush_debounce_ms: u64,
    /// Interval of the expired-entry sweep (default: 60s)
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    3001
}

fn default_hmac_ttl_secs() -> u64 {
    300
}

fn default_replay_max_entries() -> usize {
    2000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_flush_debounce_ms() -> u64 {
    500
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            token: None,
            hmac_secret: None,
            hmac_ttl_secs: default_hmac_ttl_secs(),
            replay_max_entries: default_replay_max_entries(),
            replay_backend: ReplayBackend::default(),
            debug: false,
            data_dir: default_data_dir(),
            flush_debounce_ms: default_flush_debounce_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl std::fmt::Debug for ReceiverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("hmac_secret", &self.hmac_secret.as_ref().map(|_| "<redacted>"))
            .field("hmac_ttl_secs", &self.hmac_ttl_secs)
            .field("replay_max_entries", &self.replay_max_entries)
            .field("replay_backend", &self.replay_backend)
            .field("debug", &self.debug)
            .field("data_dir", &self.data_dir)
            .field("flush_debounce_ms", &self.flush_debounce_ms)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .finish()
    }
}

impl ReceiverConfig {
    pub fn received_dir(&self) -> PathBuf {
        self.data_dir.join("received")
    }

    pub fn replay_snapshot_path(&self) -> PathBuf {
        self.data_dir.join("replay-cache.json")
    }

    pub fn replay_db_path(&self) -> PathBuf {
        self.data_dir.join("replay-cache.db")
    }

    pub fn hmac_ttl(&self) -> Duration {
        Duration::from_secs(self.hmac_ttl_secs)
    }

    pub fn flush_debounce(&self) -> Duration {
        Duration::from_millis(self.flush_debounce_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn secrets(&self) -> HookSecrets {
        HookSecrets::new(self.token.as_deref(), self.hmac_secret.as_deref())
    }
}
