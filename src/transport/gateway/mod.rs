//! Axum-based webhook receiver.
//!
//! - `POST /hooks/tickets`: authenticated, replay-protected delivery intake
//! - `GET /`: plaintext liveness string
//! - `GET /health`: replay-store summary
//!
//! Request bodies are capped at 5 MiB and buffered chunk by chunk. There is
//! no request timeout; the only time window is the signature TTL.

mod archive;
mod body;
mod handlers;
mod server;

pub use archive::PayloadArchive;
pub use server::{
    bind_listener, build_app, build_state, run_receiver, run_receiver_with_listener,
};

use crate::replay::ReplayGuard;
use crate::security::HookSecrets;
use std::sync::Arc;
use std::time::Duration;

/// Maximum request body size (5 MiB)
pub const MAX_BODY_SIZE: usize = 5 * 1024 * 1024;
/// Delivery endpoint
pub const HOOK_PATH: &str = "/hooks/tickets";
/// Body of `GET /`
pub const LIVENESS_TEXT: &str = "Private receiver running";

/// Shared state for all axum handlers
#[derive(Clone)]
pub struct AppState {
    pub secrets: Arc<HookSecrets>,
    pub hmac_ttl: Duration,
    pub replay_guard: Arc<ReplayGuard>,
    pub archive: Arc<PayloadArchive>,
    pub debug: bool,
}
