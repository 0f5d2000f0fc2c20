//! Admission control in front of the fetch pipeline.
//!
//! Per request, in order: rate limit by client IP, then a concurrency slot,
//! then inbound URL validation. Nothing here touches the network.

use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use lru::LruCache;
use tracing::debug;
use url::Url;

use crate::config::LimitsConfig;
use crate::errors::{ProxyError, ProxyResult};

/// Longest inbound URL accepted, in bytes.
pub const MAX_URL_LENGTH: usize = 2048;

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

/// Sliding-window request counter per client IP.
///
/// Each client keeps the instants of its admitted requests; entries older
/// than `window` are dropped before counting. Tracks at most `max_clients`
/// addresses and evicts the least recently seen first, which at worst
/// forgets that client's history.
pub struct RateLimiter {
    clients: Mutex<LruCache<IpAddr, VecDeque<Instant>>>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration, max_clients: usize) -> Self {
        let capacity = NonZeroUsize::new(max_clients).unwrap_or(NonZeroUsize::MIN);
        Self {
            clients: Mutex::new(LruCache::new(capacity)),
            limit,
            window,
        }
    }

    /// Count one request from `ip`, failing once `limit` requests were
    /// admitted within the trailing window.
    pub fn check(&self, ip: IpAddr) -> ProxyResult<()> {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> ProxyResult<()> {
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        let admitted = clients.get_or_insert_mut(ip, VecDeque::new);
        while admitted
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= self.window)
        {
            admitted.pop_front();
        }
        if admitted.len() >= self.limit as usize {
            debug!("rate limit hit for {}", ip);
            return Err(ProxyError::RateLimit {
                retry_after_secs: self.window.as_secs(),
            });
        }
        admitted.push_back(now);
        Ok(())
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

/// Caps in-flight fetches. Over the cap, requests fail immediately.
pub struct ConcurrencyLimiter {
    in_flight: Arc<AtomicUsize>,
    max: usize,
}

/// A held concurrency slot, released on drop.
#[derive(Debug)]
pub struct FetchPermit {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for FetchPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

impl ConcurrencyLimiter {
    pub fn new(max: usize) -> Self {
        Self {
            in_flight: Arc::new(AtomicUsize::new(0)),
            max,
        }
    }

    pub fn try_acquire(&self) -> ProxyResult<FetchPermit> {
        let max = self.max;
        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < max).then_some(n + 1)
            })
            .map_err(|_| ProxyError::Capacity)?;
        Ok(FetchPermit {
            in_flight: Arc::clone(&self.in_flight),
        })
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Governor
// ---------------------------------------------------------------------------

pub struct Governor {
    pub rate: RateLimiter,
    pub concurrency: ConcurrencyLimiter,
}

impl Governor {
    pub fn from_config(limits: &LimitsConfig) -> Self {
        Self {
            rate: RateLimiter::new(
                limits.rate_limit_per_window,
                Duration::from_secs(limits.rate_limit_window_secs),
                limits.rate_limit_max_clients,
            ),
            concurrency: ConcurrencyLimiter::new(limits.max_concurrent_fetches),
        }
    }

    /// Rate limit, then take a concurrency slot.
    ///
    /// A rate-limited request never occupies a slot.
    pub fn admit(&self, client: IpAddr) -> ProxyResult<FetchPermit> {
        self.rate.check(client)?;
        self.concurrency.try_acquire()
    }
}

// ---------------------------------------------------------------------------
// Client identity and inbound URL
// ---------------------------------------------------------------------------

/// The address requests are counted against.
///
/// `X-Forwarded-For` is only believed when the socket peer is loopback
/// (a local reverse proxy). Its first entry wins; if that does not parse
/// as an IP, the peer address is used.
pub fn client_ip(peer: SocketAddr, headers: &HeaderMap) -> IpAddr {
    let peer_ip = peer.ip().to_canonical();
    if !peer_ip.is_loopback() {
        return peer_ip;
    }
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok())
        .map_or(peer_ip, |ip| ip.to_canonical())
}

fn has_control_chars(raw: &str) -> bool {
    raw.chars().any(|c| c <= '\u{1f}' || c == '\u{7f}')
}

/// Checks shared by every inbound URL: length, control characters, syntax.
fn parse_request_url(raw: &str) -> ProxyResult<Url> {
    if raw.is_empty() {
        return Err(ProxyError::Validation("Invalid URL"));
    }
    if raw.len() > MAX_URL_LENGTH {
        return Err(ProxyError::Validation("URL too long"));
    }
    // url::Url::parse silently strips tabs and newlines
    if has_control_chars(raw) {
        return Err(ProxyError::Validation("Invalid URL"));
    }
    Url::parse(raw).map_err(|_| ProxyError::Validation("Invalid URL"))
}

fn reject_credentials(url: &Url) -> ProxyResult<()> {
    if !url.username().is_empty() || url.password().is_some() {
        return Err(ProxyError::Validation("Credentials in URL not allowed"));
    }
    Ok(())
}

fn require_host(url: Url) -> ProxyResult<Url> {
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ProxyError::Validation("Invalid URL"));
    }
    Ok(url)
}

/// Structural checks on the caller-supplied URL, before any DNS or socket.
pub fn validate_request_url(raw: &str) -> ProxyResult<Url> {
    let url = parse_request_url(raw)?;
    if url.scheme() != "https" {
        return Err(ProxyError::Validation("Only HTTPS URLs allowed"));
    }
    reject_credentials(&url)?;
    if url.port().is_some_and(|p| p != 443) {
        return Err(ProxyError::Validation("Port not allowed"));
    }
    require_host(url)
}

/// Like [`validate_request_url`] but also admits `http` and any port, so
/// gateway tests can target a local mock server.
#[cfg(test)]
pub(crate) fn validate_loopback_url(raw: &str) -> ProxyResult<Url> {
    let url = parse_request_url(raw)?;
    if !matches!(url.scheme(), "https" | "http") {
        return Err(ProxyError::Validation("Only HTTPS URLs allowed"));
    }
    reject_credentials(&url)?;
    require_host(url)
}
