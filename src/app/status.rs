use private_receiver::ReceiverConfig;
use private_receiver::transport::gateway::{HOOK_PATH, MAX_BODY_SIZE};

fn on_off(enabled: bool) -> &'static str {
    if enabled { "on" } else { "off" }
}

pub fn render_status(config: &ReceiverConfig) -> String {
    let mut lines = vec![
        "◆ private-receiver".to_string(),
        String::new(),
        format!("  version        {}", env!("CARGO_PKG_VERSION")),
        format!("  listen         {}:{}", config.host, config.port),
        format!("  endpoint       POST {HOOK_PATH}"),
        format!("  body limit     {MAX_BODY_SIZE} bytes"),
        String::new(),
        "Authentication".to_string(),
        format!("  bearer token   {}", on_off(config.token.is_some())),
        format!("  hmac secret    {}", on_off(config.hmac_secret.is_some())),
        format!("  signature ttl  {}s", config.hmac_ttl_secs),
        String::new(),
        "Storage".to_string(),
        format!("  data dir       {}", config.data_dir.display()),
        format!("  received dir   {}", config.received_dir().display()),
        format!("  replay backend {}", config.replay_backend),
    ];

    let replay_path = match config.replay_backend {
        private_receiver::ReplayBackend::Json => config.replay_snapshot_path(),
        private_receiver::ReplayBackend::Sqlite => config.replay_db_path(),
    };
    lines.push(format!("  replay file    {}", replay_path.display()));
    lines.push(format!(
        "  replay cap     {} entries",
        config.replay_max_entries
    ));
    lines.push(format!(
        "  flush          debounce {}ms, sweep every {}s",
        config.flush_debounce_ms,
        config.sweep_interval().as_secs()
    ));
    lines.push(String::new());
    lines.push(format!("  debug logging  {}", on_off(config.debug)));

    if config.token.is_none() && config.hmac_secret.is_none() {
        lines.push(String::new());
        lines.push("! deliveries are accepted without authentication".to_string());
    }

    lines.join("\n")
}
