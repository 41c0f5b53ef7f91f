//! HMAC-SHA256 request signatures.
//!
//! A sender signs either the raw body (legacy mode) or `"<timestamp>." + body`
//! when it also sends a timestamp header, and transmits the lowercase hex
//! digest, optionally prefixed with `sha256=`.

use crate::error::SignatureError;
use axum::http::{HeaderMap, HeaderValue};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;

type HmacSha256 = Hmac<Sha256>;

/// Signature headers, in lookup priority order.
pub const SIGNATURE_HEADERS: [&str; 3] = ["x-signature", "x-hub-signature-256", "x-signature-256"];
/// Timestamp headers, in lookup priority order.
pub const TIMESTAMP_HEADERS: [&str; 2] = ["x-timestamp", "x-signature-timestamp"];

const SIGNATURE_PREFIX: &str = "sha256=";

/// Signature material pulled off an inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedParts<'a> {
    /// Header value exactly as presented. See [`replay_key`] for dedupe.
    pub signature: &'a str,
    pub timestamp: Option<&'a str>,
}

fn first_header<'a>(headers: &'a HeaderMap, names: &[&str]) -> Option<&'a HeaderValue> {
    names.iter().find_map(|name| headers.get(*name))
}

pub fn extract_signed_parts(headers: &HeaderMap) -> Result<SignedParts<'_>, SignatureError> {
    let signature = first_header(headers, &SIGNATURE_HEADERS)
        .ok_or(SignatureError::Missing)?
        .to_str()
        .map_err(|_| SignatureError::Malformed)?;
    let timestamp = first_header(headers, &TIMESTAMP_HEADERS)
        .map(|value| value.to_str().map_err(|_| SignatureError::InvalidTimestamp))
        .transpose()?;
    Ok(SignedParts {
        signature,
        timestamp,
    })
}

fn keyed_mac(secret: &str) -> HmacSha256 {
    match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        // HMAC hashes over-long keys and pads short ones.
        Err(_) => unreachable!("HMAC accepts keys of any length"),
    }
}

fn signing_mac(secret: &str, timestamp: Option<&str>, body: &[u8]) -> HmacSha256 {
    let mut mac = keyed_mac(secret);
    if let Some(timestamp) = timestamp {
        mac.update(timestamp.as_bytes());
        mac.update(b".");
    }
    mac.update(body);
    mac
}

/// Lowercase hex HMAC-SHA256 a sender attaches for `body`.
pub fn compute_signature(secret: &str, timestamp: Option<&str>, body: &[u8]) -> String {
    hex::encode(signing_mac(secret, timestamp, body).finalize().into_bytes())
}

/// Epoch milliseconds as any finite decimal number (`1700000000000`,
/// `1.7e12`, `1700000000000.0`). The signed message still uses the header
/// text verbatim.
fn parse_timestamp_ms(raw: &str) -> Result<f64, SignatureError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|ms| ms.is_finite())
        .ok_or(SignatureError::InvalidTimestamp)
}

fn digest_hex(signature: &str) -> &str {
    signature
        .strip_prefix(SIGNATURE_PREFIX)
        .unwrap_or(signature)
}

/// Replay dedupe key for a verified signature: the bare lowercase hex digest.
///
/// `sha256=<hex>`, `<hex>` and `<HEX>` of one digest all verify, so they
/// must collapse to the same key.
pub fn replay_key(signature: &str) -> String {
    digest_hex(signature).to_ascii_lowercase()
}

/// Verify `parts` against `body`.
///
/// Timestamp checks run before the digest is decoded, so a stale request
/// reports `Expired` even when its signature is also malformed.
pub fn verify_signature(
    secret: &str,
    parts: &SignedParts<'_>,
    body: &[u8],
    ttl: Duration,
    now_ms: i64,
) -> Result<(), SignatureError> {
    if let Some(raw) = parts.timestamp {
        let timestamp_ms = parse_timestamp_ms(raw)?;
        #[allow(clippy::cast_precision_loss)]
        let age_ms = (now_ms as f64 - timestamp_ms).abs();
        #[allow(clippy::cast_precision_loss)]
        let ttl_ms = ttl.as_millis() as f64;
        if age_ms > ttl_ms {
            return Err(SignatureError::Expired);
        }
    }

    let provided =
        hex::decode(digest_hex(parts.signature)).map_err(|_| SignatureError::Malformed)?;

    signing_mac(secret, parts.timestamp, body)
        .verify_slice(&provided)
        .map_err(|_| SignatureError::Mismatch)
}
