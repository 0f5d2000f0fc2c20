use super::*;

#[test]
fn validation_error_uses_its_own_message() {
    let err = ProxyError::Validation("Only HTTPS URLs allowed");
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(err.public_message(), "Only HTTPS URLs allowed");
    assert!(err.is_client_error());
}

#[test]
fn policy_error_hides_detail() {
    let err = ProxyError::Policy("10.0.0.7 is private".into());
    assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(err.public_message(), "URL not allowed");
    assert!(err.to_string().contains("10.0.0.7"));
}

#[test]
fn upstream_failures_map_to_bad_gateway() {
    let errors = [
        ProxyError::Resolution {
            host: "example.com".into(),
            reason: "NXDOMAIN".into(),
        },
        ProxyError::Protocol("http".into()),
        ProxyError::Redirect("too many redirects".into()),
        ProxyError::PayloadTooLarge { limit: 10 },
        ProxyError::UnsupportedType("image/svg+xml".into()),
        ProxyError::ContentMismatch("image/png".into()),
        ProxyError::Upstream(404),
        ProxyError::Network("connection reset".into()),
    ];
    for err in errors {
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY, "{err}");
        assert!(!err.is_client_error());
    }
}

#[test]
fn timeout_and_capacity_statuses() {
    assert_eq!(
        ProxyError::Timeout(Duration::from_secs(10)).status_code(),
        StatusCode::GATEWAY_TIMEOUT
    );
    assert_eq!(
        ProxyError::Capacity.status_code(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[test]
fn rate_limit_carries_retry_after() {
    let err = ProxyError::RateLimit {
        retry_after_secs: 60,
    };
    assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(err.retry_after_secs(), Some(60));
    assert_eq!(ProxyError::Capacity.retry_after_secs(), None);
}

#[tokio::test]
async fn into_response_sets_no_store_and_json_body() {
    let resp = ProxyError::RateLimit {
        retry_after_secs: 60,
    }
    .into_response();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-store");
    assert_eq!(resp.headers()[header::RETRY_AFTER], "60");

    let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json, serde_json::json!({"error": "Too many requests"}));
}

#[tokio::test]
async fn into_response_never_leaks_internal_detail() {
    let resp = ProxyError::Network("tcp connect error: 203.0.113.9:443".into()).into_response();
    let body = axum::body::to_bytes(resp.into_body(), 1024).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(!text.contains("203.0.113.9"));
    assert!(text.contains("Failed to fetch image"));
}

#[test]
fn config_error_display() {
    let err = ConfigError("fetch.timeoutSecs must be > 0".into());
    assert_eq!(
        err.to_string(),
        "Configuration error: fetch.timeoutSecs must be > 0"
    );
}
