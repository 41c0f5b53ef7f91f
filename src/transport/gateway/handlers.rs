use crate::error::{HookError, SignatureError};
use crate::replay::now_ms;
use crate::security::{
    SignedParts, compute_signature, extract_signed_parts, replay_key, token_authorized,
    verify_signature,
};
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use std::path::PathBuf;

use super::body::read_capped;
use super::{AppState, LIVENESS_TEXT, MAX_BODY_SIZE};

/// GET /: liveness
pub(super) async fn handle_root() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        LIVENESS_TEXT,
    )
}

/// GET /health: replay store summary, no secrets
pub(super) async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let store = state.replay_guard.store();
    Json(serde_json::json!({
        "ok": true,
        "replay_backend": store.backend().to_string(),
        "replay_entries": store.len(),
    }))
}

/// Any other path or method
pub(super) async fn handle_not_found() -> HookError {
    HookError::NotFound
}

/// POST /hooks/tickets: authenticated delivery intake
pub(super) async fn handle_ticket_hook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    match receive_delivery(&state, &headers, body).await {
        Ok(path) => {
            let path = path.map(|p| p.display().to_string());
            (
                StatusCode::OK,
                Json(serde_json::json!({"ok": true, "path": path})),
            )
                .into_response()
        }
        Err(error) => {
            tracing::warn!(
                reason = error.reason(),
                status = error.status().as_u16(),
                "webhook delivery rejected"
            );
            error.into_response()
        }
    }
}

/// Run one delivery through token check, body buffering, signature and
/// replay checks, JSON parsing and archiving. Returns the archive path, or
/// `None` when archiving failed (logged, not fatal).
async fn receive_delivery(
    state: &AppState,
    headers: &HeaderMap,
    body: Body,
) -> Result<Option<PathBuf>, HookError> {
    if !token_authorized(state.secrets.token(), headers) {
        return Err(HookError::Unauthorized);
    }

    let raw = read_capped(headers, body, MAX_BODY_SIZE).await?;

    if let Some(secret) = state.secrets.hmac_secret() {
        let now = now_ms();
        let parts = extract_signed_parts(headers)?;
        if let Err(error) = verify_signature(secret, &parts, &raw, state.hmac_ttl, now) {
            if state.debug {
                log_signature_failure(secret, &parts, &raw, now, error);
            }
            return Err(error.into());
        }
        if let Err(error) = state
            .replay_guard
            .check_and_record(&replay_key(parts.signature), now)
        {
            if state.debug {
                tracing::debug!(
                    signature = parts.signature,
                    timestamp = ?parts.timestamp,
                    "replayed signature"
                );
            }
            return Err(error);
        }
    }

    let data: serde_json::Value =
        serde_json::from_slice(&raw).map_err(HookError::MalformedJson)?;

    match state.archive.store(headers, &data, Utc::now()).await {
        Ok(path) => {
            tracing::info!(path = %path.display(), bytes = raw.len(), "webhook delivery stored");
            Ok(Some(path))
        }
        Err(error) => {
            tracing::warn!("failed to archive webhook delivery: {error:#}");
            Ok(None)
        }
    }
}

fn log_signature_failure(
    secret: &str,
    parts: &SignedParts<'_>,
    raw: &[u8],
    now: i64,
    error: SignatureError,
) {
    let expected = compute_signature(secret, parts.timestamp, raw);
    tracing::debug!(
        %error,
        provided = parts.signature,
        expected_prefix = &expected[..8],
        timestamp = ?parts.timestamp,
        now,
        body_len = raw.len(),
        "signature verification failed"
    );
}
