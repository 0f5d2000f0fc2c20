use std::time::Duration;

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Typed error hierarchy for the image proxy pipeline.
///
/// Every stage (inbound validation, resolution, fetch, body read, content
/// check, governor) reports through this enum. The `Display` text carries
/// internal detail for logs; callers only ever see [`ProxyError::public_message`].
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Malformed or disallowed inbound URL. Holds the public message.
    #[error("invalid request: {0}")]
    Validation(&'static str),

    /// Target is, or resolves to, a private/internal address.
    #[error("target not allowed: {0}")]
    Policy(String),

    #[error("DNS resolution failed for {host}: {reason}")]
    Resolution { host: String, reason: String },

    /// Non-HTTPS scheme encountered while fetching (including redirect hops).
    #[error("scheme not allowed: {0}")]
    Protocol(String),

    #[error("redirect rejected: {0}")]
    Redirect(String),

    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    #[error("response body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("content type not allowed: {0}")]
    UnsupportedType(String),

    #[error("body does not match declared content type {0}")]
    ContentMismatch(String),

    #[error("upstream returned HTTP {0}")]
    Upstream(u16),

    #[error("upstream request failed: {0}")]
    Network(String),

    #[error("rate limit exceeded")]
    RateLimit { retry_after_secs: u64 },

    #[error("concurrency limit reached")]
    Capacity,
}

/// Convenience alias for results using `ProxyError`.
pub type ProxyResult<T> = std::result::Result<T, ProxyError>;

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Policy(_) => StatusCode::BAD_REQUEST,
            Self::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Capacity => StatusCode::SERVICE_UNAVAILABLE,
            Self::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::Resolution { .. }
            | Self::Protocol(_)
            | Self::Redirect(_)
            | Self::PayloadTooLarge { .. }
            | Self::UnsupportedType(_)
            | Self::ContentMismatch(_)
            | Self::Upstream(_)
            | Self::Network(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short, fixed message safe to return to the caller.
    ///
    /// Policy failures are reported with the same vague text regardless of
    /// which rule matched, so the endpoint is not an oracle for internal
    /// address layout.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::Validation(msg) => msg,
            Self::Policy(_) => "URL not allowed",
            Self::RateLimit { .. } => "Too many requests",
            Self::Capacity => "Server busy",
            Self::Timeout(_) => "Upstream timeout",
            Self::PayloadTooLarge { .. } => "Image too large",
            Self::UnsupportedType(_) => "Unsupported image type",
            Self::ContentMismatch(_) => "Invalid image data",
            Self::Upstream(_) => "Upstream returned an error",
            Self::Resolution { .. } | Self::Protocol(_) | Self::Redirect(_) | Self::Network(_) => {
                "Failed to fetch image"
            }
        }
    }

    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimit { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Whether the rejection happened before any upstream traffic.
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let mut response = (
            self.status_code(),
            Json(serde_json::json!({ "error": self.public_message() })),
        )
            .into_response();
        let headers = response.headers_mut();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        if let Some(secs) = self.retry_after_secs() {
            headers.insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

/// Configuration loading/validation failure.
#[derive(Debug, Error)]
#[error("Configuration error: {0}")]
pub struct ConfigError(pub String);

#[cfg(test)]
mod tests;
