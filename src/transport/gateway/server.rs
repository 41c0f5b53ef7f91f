use super::handlers::{handle_health, handle_not_found, handle_root, handle_ticket_hook};
use super::{AppState, HOOK_PATH, PayloadArchive};

use crate::config::ReceiverConfig;
use crate::platform::shutdown::shutdown_signal;
use crate::replay::{FlushScheduler, ReplayGuard, now_ms, open_replay_store, spawn_replay_sweeper};
use anyhow::{Context, Result};
use axum::{
    Router,
    routing::{get, post},
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Bind `config.host:config.port`. The host may be an IPv4/IPv6 literal
/// (`::` included) or a resolvable name such as `localhost`.
pub async fn bind_listener(config: &ReceiverConfig) -> Result<tokio::net::TcpListener> {
    tokio::net::TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("bind receiver socket {}:{}", config.host, config.port))
}

/// Run the receiver on `config.host:config.port` until SIGINT/SIGTERM.
pub async fn run_receiver(config: Arc<ReceiverConfig>) -> Result<()> {
    let listener = bind_listener(&config).await?;
    run_receiver_with_listener(listener, config, shutdown_signal()).await
}

/// Run the receiver from a pre-bound listener until `shutdown` resolves,
/// then force a final replay-store flush.
pub async fn run_receiver_with_listener<F>(
    listener: tokio::net::TcpListener,
    config: Arc<ReceiverConfig>,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener
        .local_addr()
        .context("get receiver listener local address")?;

    let store = open_replay_store(&config, now_ms()).await?;
    let scheduler = Arc::new(FlushScheduler::new(store, config.flush_debounce()));
    let sweeper = spawn_replay_sweeper(Arc::clone(&scheduler), config.sweep_interval());

    let state = build_state(&config, Arc::clone(&scheduler));
    log_receiver_banner(&local_addr, &config, &state);

    let served = axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("serve webhook receiver");

    sweeper.abort();
    match scheduler.flush_now().await {
        Ok(()) => tracing::info!(
            entries = scheduler.store().len(),
            "replay store flushed on shutdown"
        ),
        Err(error) => tracing::warn!("replay store shutdown flush failed: {error:#}"),
    }

    served
}

pub fn build_state(config: &ReceiverConfig, scheduler: Arc<FlushScheduler>) -> AppState {
    AppState {
        secrets: Arc::new(config.secrets()),
        hmac_ttl: config.hmac_ttl(),
        replay_guard: Arc::new(ReplayGuard::new(scheduler, config.hmac_ttl())),
        archive: Arc::new(PayloadArchive::new(config.received_dir())),
        debug: config.debug,
    }
}

fn log_receiver_banner(addr: &SocketAddr, config: &ReceiverConfig, state: &AppState) {
    tracing::info!(
        %addr,
        token = state.secrets.token().is_some(),
        hmac = state.secrets.hmac_secret().is_some(),
        ttl_secs = config.hmac_ttl_secs,
        replay_backend = %config.replay_backend,
        received_dir = %state.archive.dir().display(),
        "private receiver listening"
    );
    if state.secrets.token().is_none() && state.secrets.hmac_secret().is_none() {
        tracing::warn!("no token or HMAC secret configured; deliveries are unauthenticated");
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handle_root).fallback(handle_not_found))
        .route("/health", get(handle_health).fallback(handle_not_found))
        .route(HOOK_PATH, post(handle_ticket_hook).fallback(handle_not_found))
        .fallback(handle_not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
