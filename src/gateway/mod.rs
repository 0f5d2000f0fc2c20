//! HTTP surface of the image proxy.
//!
//! `GET /api/news-image?url=` runs admission control and the upstream
//! pipeline and returns the validated bytes with locked-down headers.
//! `GET /api/health` reports liveness.

pub mod governor;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{ConnectInfo, RawQuery, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::{Json, Router};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::Config;
use crate::errors::{ConfigError, ProxyError, ProxyResult};
use crate::proxy::resolver::DnsLookup;
use crate::proxy::{FetchedImage, ImageFetcher};
use governor::{Governor, client_ip, validate_request_url};

const CROSS_ORIGIN_RESOURCE_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-resource-policy");

/// Shared state for the handlers.
#[derive(Clone)]
pub struct AppState {
    governor: Arc<Governor>,
    fetcher: Arc<ImageFetcher>,
    cache_control: HeaderValue,
    url_check: fn(&str) -> ProxyResult<Url>,
}

impl AppState {
    pub fn new(config: &Config, lookup: Arc<dyn DnsLookup>) -> Result<Self, ConfigError> {
        let fetcher = ImageFetcher::new(&config.fetch, lookup);
        Self::from_parts(config, fetcher, validate_request_url)
    }

    /// State whose fetcher may reach plain-HTTP loopback servers.
    #[cfg(test)]
    pub(crate) fn for_loopback(config: &Config, lookup: Arc<dyn DnsLookup>) -> Self {
        let fetcher = ImageFetcher::new(&config.fetch, lookup).allow_loopback();
        Self::from_parts(config, fetcher, governor::validate_loopback_url).unwrap()
    }

    fn from_parts(
        config: &Config,
        fetcher: ImageFetcher,
        url_check: fn(&str) -> ProxyResult<Url>,
    ) -> Result<Self, ConfigError> {
        let cache_control = HeaderValue::from_str(&config.cache.header_value())
            .map_err(|e| ConfigError(format!("invalid cache header: {}", e)))?;
        Ok(Self {
            governor: Arc::new(Governor::from_config(&config.limits)),
            fetcher: Arc::new(fetcher),
            cache_control,
            url_check,
        })
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/news-image", any(news_image_handler))
        .route("/api/health", get(health_handler))
        .with_state(state)
}

/// GET /api/news-image: fetch and re-serve a remote image.
async fn news_image_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    method: Method,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    if method != Method::GET {
        return method_not_allowed();
    }

    let client = client_ip(peer, &headers);
    match proxy_image(&state, client, query.as_deref()).await {
        Ok(image) => image_response(&state, image),
        Err(e) => {
            if e.is_client_error() {
                warn!("rejected image request from {}: {}", client, e);
            } else {
                warn!("image fetch for {} failed: {}", client, e);
            }
            e.into_response()
        }
    }
}

async fn proxy_image(
    state: &AppState,
    client: std::net::IpAddr,
    query: Option<&str>,
) -> ProxyResult<FetchedImage> {
    let _permit = state.governor.admit(client)?;

    let raw = query
        .and_then(|q| {
            form_urlencoded::parse(q.as_bytes())
                .find(|(k, _)| k == "url")
                .map(|(_, v)| v.into_owned())
        })
        .ok_or(ProxyError::Validation("Missing url parameter"))?;
    let url = (state.url_check)(&raw)?;
    debug!("image request from {} for {}", client, url);

    state.fetcher.fetch_image(url).await
}

fn image_response(state: &AppState, image: FetchedImage) -> Response {
    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static(image.format.mime_type()),
        ),
        (header::CONTENT_LENGTH, HeaderValue::from(image.bytes.len())),
        (header::CACHE_CONTROL, state.cache_control.clone()),
        (
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ),
        (
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static("inline; filename=\"image\""),
        ),
        (
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; style-src 'none'; script-src 'none'"),
        ),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        (
            CROSS_ORIGIN_RESOURCE_POLICY,
            HeaderValue::from_static("same-site"),
        ),
        (
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ),
    ];
    (StatusCode::OK, headers, Body::from(image.bytes)).into_response()
}

fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [
            (header::ALLOW, "GET"),
            (header::CACHE_CONTROL, "no-store"),
        ],
        Json(serde_json::json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

/// GET /api/health: health check endpoint.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION
    }))
}

/// Bind and start serving. Returns the server task and the bound address.
///
/// The server stops accepting once `shutdown` resolves and exits after
/// in-flight requests finish.
pub async fn start(
    config: &Config,
    lookup: Arc<dyn DnsLookup>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr)> {
    let state = AppState::new(config, lookup)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    serve_on(listener, state, shutdown)
}

fn serve_on(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr)> {
    let local = listener.local_addr()?;
    info!("image proxy listening on {}", local);

    let app = build_router(state).into_make_service_with_connect_info::<SocketAddr>();
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            error!("HTTP server error: {}", e);
        }
        info!("image proxy stopped");
    });
    Ok((handle, local))
}
