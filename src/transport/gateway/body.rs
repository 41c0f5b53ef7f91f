use crate::error::HookError;
use axum::body::Body;
use axum::http::{HeaderMap, header};
use futures_util::StreamExt;

/// Buffer the raw request body, enforcing `limit` on every chunk so an
/// oversized upload is abandoned before it is fully read.
///
/// A declared `Content-Length` above the limit is rejected without reading.
pub(super) async fn read_capped(
    headers: &HeaderMap,
    body: Body,
    limit: usize,
) -> Result<Vec<u8>, HookError> {
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(HookError::PayloadTooLarge);
    }

    let capacity = declared.map_or(0, |len| usize::try_from(len).unwrap_or(limit).min(limit));
    let mut raw = Vec::with_capacity(capacity);
    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(HookError::Stream)?;
        if raw.len() + chunk.len() > limit {
            return Err(HookError::PayloadTooLarge);
        }
        raw.extend_from_slice(&chunk);
    }
    Ok(raw)
}
