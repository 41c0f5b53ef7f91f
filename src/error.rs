use axum::{
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

// ─── Request errors ──────────────────────────────────────────────────────────

/// Terminal rejection of a webhook delivery.
///
/// Every variant maps to a fixed HTTP status and a short message that is
/// returned verbatim as `{"ok": false, "message": ...}`. Nothing here is
/// retried by the receiver; a sender that retries must mint a fresh
/// signature, since an identical one is rejected as a replay.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("Unauthorized (token)")]
    Unauthorized,

    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("Replay detected")]
    Replay,

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Invalid JSON")]
    MalformedJson(#[source] serde_json::Error),

    #[error("Request error")]
    Stream(#[source] axum::Error),

    #[error("Not found")]
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Missing signature header")]
    Missing,

    #[error("Invalid timestamp header")]
    InvalidTimestamp,

    #[error("Signature timestamp expired")]
    Expired,

    #[error("Invalid signature format")]
    Malformed,

    #[error("Invalid signature")]
    Mismatch,
}

impl SignatureError {
    pub fn status(self) -> StatusCode {
        match self {
            Self::InvalidTimestamp => StatusCode::BAD_REQUEST,
            Self::Missing | Self::Expired | Self::Malformed | Self::Mismatch => {
                StatusCode::UNAUTHORIZED
            }
        }
    }
}

impl HookError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::Replay => StatusCode::UNAUTHORIZED,
            Self::Signature(error) => error.status(),
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::MalformedJson(_) => StatusCode::BAD_REQUEST,
            Self::Stream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Short machine-readable reason used in logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Unauthorized => "token",
            Self::Signature(SignatureError::Missing) => "signature_missing",
            Self::Signature(SignatureError::InvalidTimestamp) => "timestamp_invalid",
            Self::Signature(SignatureError::Expired) => "timestamp_expired",
            Self::Signature(SignatureError::Malformed) => "signature_malformed",
            Self::Signature(SignatureError::Mismatch) => "signature_mismatch",
            Self::Replay => "replay",
            Self::PayloadTooLarge => "payload_too_large",
            Self::MalformedJson(_) => "invalid_json",
            Self::Stream(_) => "stream",
            Self::NotFound => "not_found",
        }
    }
}

impl IntoResponse for HookError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({"ok": false, "message": self.to_string()});
        let mut response = (self.status(), Json(body)).into_response();
        // The unread remainder of an oversized upload is not drained.
        if matches!(self, Self::PayloadTooLarge) {
            response
                .headers_mut()
                .insert(header::CONNECTION, HeaderValue::from_static("close"));
        }
        response
    }
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
