use reqwest::Response;

use crate::errors::{ProxyError, ProxyResult};

/// Default maximum body size for proxied images (5 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Read a response body with a hard size limit.
///
/// - Checks the `Content-Length` header first; rejects immediately if over limit.
/// - Streams via `chunk()` with a running counter; the moment the total passes
///   `max_bytes` the response is dropped, which cancels the underlying stream.
/// - A body of exactly `max_bytes` is accepted.
pub async fn read_body_with_limit(resp: Response, max_bytes: usize) -> ProxyResult<Vec<u8>> {
    if let Some(cl) = resp.content_length()
        && cl > max_bytes as u64
    {
        return Err(ProxyError::PayloadTooLarge { limit: max_bytes });
    }

    let mut buf = Vec::with_capacity(
        resp.content_length()
            .map_or(0, |cl| cl as usize)
            .min(max_bytes),
    );
    let mut stream = resp;
    while let Some(chunk) = stream
        .chunk()
        .await
        .map_err(|e| ProxyError::Network(format!("body stream error: {}", e)))?
    {
        if buf.len() + chunk.len() > max_bytes {
            return Err(ProxyError::PayloadTooLarge { limit: max_bytes });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}
