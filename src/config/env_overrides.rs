use super::{ReceiverConfig, ReplayBackend};
use crate::security::normalize_secret;
use std::path::PathBuf;

fn env_flag(key: &str) -> Option<bool> {
    std::env::var(key).ok().map(|raw| {
        let raw = raw.trim();
        raw == "1" || raw.eq_ignore_ascii_case("true")
    })
}

impl ReceiverConfig {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(port_str) = std::env::var("PORT")
            && let Ok(port) = port_str.trim().parse::<u16>()
        {
            self.port = port;
        }

        if let Ok(host) = std::env::var("HOST")
            && !host.trim().is_empty()
        {
            self.host = host.trim().to_string();
        }

        if let Ok(token) = std::env::var("PRIVATE_LOG_TOKEN") {
            self.token = normalize_secret(&token);
        }

        if let Ok(secret) = std::env::var("PRIVATE_LOG_HMAC_SECRET") {
            self.hmac_secret = normalize_secret(&secret);
        }

        if let Ok(ttl_str) = std::env::var("PRIVATE_LOG_HMAC_TTL")
            && let Ok(ttl) = ttl_str.trim().parse::<u64>()
        {
            self.hmac_ttl_secs = ttl;
        }

        if let Ok(max_str) = std::env::var("PRIVATE_LOG_REPLAY_MAX_ENTRIES")
            && let Ok(max) = max_str.trim().parse::<usize>()
        {
            self.replay_max_entries = max;
        }

        if let Some(use_sqlite) = env_flag("PRIVATE_LOG_USE_SQLITE") {
            self.replay_backend = if use_sqlite {
                ReplayBackend::Sqlite
            } else {
                ReplayBackend::Json
            };
        }

        if let Some(debug) = env_flag("DEBUG_PRIVATE_RECEIVER") {
            self.debug = debug;
        }

        if let Ok(dir) = std::env::var("PRIVATE_LOG_DATA_DIR")
            && !dir.trim().is_empty()
        {
            self.data_dir = PathBuf::from(dir.trim());
        }
    }
}
