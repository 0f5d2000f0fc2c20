use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ConfigError;

/// Upper bound on `fetch.timeoutSecs`.
const MAX_TIMEOUT_SECS: u64 = 300;
/// Upper bound on `fetch.maxBodyBytes` (100 MiB).
const MAX_BODY_BYTES_CEILING: usize = 100 * 1024 * 1024;
/// Upper bound on `fetch.maxRedirects`.
const MAX_REDIRECTS_CEILING: u32 = 10;

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8790
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// ---------------------------------------------------------------------------
// Fetch
// ---------------------------------------------------------------------------

fn default_max_body_bytes() -> usize {
    crate::utils::http::DEFAULT_MAX_BODY_BYTES
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_redirects() -> u32 {
    3
}

/// Limits applied to every upstream fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_max_body_bytes", rename = "maxBodyBytes")]
    pub max_body_bytes: usize,
    /// Overall budget for resolution, connect, headers and body, across all redirect hops.
    #[serde(default = "default_timeout_secs", rename = "timeoutSecs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_redirects", rename = "maxRedirects")]
    pub max_redirects: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Cache headers
// ---------------------------------------------------------------------------

fn default_max_age_secs() -> u64 {
    86_400
}

fn default_stale_while_revalidate_secs() -> u64 {
    172_800
}

/// Values for the `Cache-Control` header on successful responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_max_age_secs", rename = "maxAgeSecs")]
    pub max_age_secs: u64,
    #[serde(
        default = "default_stale_while_revalidate_secs",
        rename = "staleWhileRevalidateSecs"
    )]
    pub stale_while_revalidate_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age_secs(),
            stale_while_revalidate_secs: default_stale_while_revalidate_secs(),
        }
    }
}

impl CacheConfig {
    pub fn header_value(&self) -> String {
        format!(
            "public, max-age={}, stale-while-revalidate={}",
            self.max_age_secs, self.stale_while_revalidate_secs
        )
    }
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

fn default_max_concurrent_fetches() -> usize {
    20
}

fn default_rate_limit_per_window() -> u32 {
    60
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

fn default_rate_limit_max_clients() -> usize {
    10_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(
        default = "default_max_concurrent_fetches",
        rename = "maxConcurrentFetches"
    )]
    pub max_concurrent_fetches: usize,
    #[serde(
        default = "default_rate_limit_per_window",
        rename = "rateLimitPerWindow"
    )]
    pub rate_limit_per_window: u32,
    #[serde(
        default = "default_rate_limit_window_secs",
        rename = "rateLimitWindowSecs"
    )]
    pub rate_limit_window_secs: u64,
    /// Distinct client IPs tracked at once; least recently seen are evicted.
    #[serde(
        default = "default_rate_limit_max_clients",
        rename = "rateLimitMaxClients"
    )]
    pub rate_limit_max_clients: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: default_max_concurrent_fetches(),
            rate_limit_per_window: default_rate_limit_per_window(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
            rate_limit_max_clients: default_rate_limit_max_clients(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_fetch()?;
        self.validate_limits()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError("server.host must not be empty".into()));
        }
        if self.server.port == 0 {
            return Err(ConfigError("server.port must be > 0".into()));
        }
        Ok(())
    }

    fn validate_fetch(&self) -> Result<(), ConfigError> {
        let f = &self.fetch;
        if f.max_body_bytes == 0 {
            return Err(ConfigError("fetch.maxBodyBytes must be > 0".into()));
        }
        if f.max_body_bytes > MAX_BODY_BYTES_CEILING {
            return Err(ConfigError(format!(
                "fetch.maxBodyBytes is unreasonably large (> {MAX_BODY_BYTES_CEILING})"
            )));
        }
        if f.timeout_secs == 0 {
            return Err(ConfigError("fetch.timeoutSecs must be > 0".into()));
        }
        if f.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError(format!(
                "fetch.timeoutSecs is unreasonably large (> {MAX_TIMEOUT_SECS})"
            )));
        }
        if f.max_redirects > MAX_REDIRECTS_CEILING {
            return Err(ConfigError(format!(
                "fetch.maxRedirects is unreasonably large (> {MAX_REDIRECTS_CEILING})"
            )));
        }
        Ok(())
    }

    fn validate_limits(&self) -> Result<(), ConfigError> {
        let l = &self.limits;
        if l.max_concurrent_fetches == 0 {
            return Err(ConfigError("limits.maxConcurrentFetches must be > 0".into()));
        }
        if l.rate_limit_per_window == 0 {
            return Err(ConfigError("limits.rateLimitPerWindow must be > 0".into()));
        }
        if l.rate_limit_window_secs == 0 {
            return Err(ConfigError("limits.rateLimitWindowSecs must be > 0".into()));
        }
        if l.rate_limit_max_clients == 0 {
            return Err(ConfigError("limits.rateLimitMaxClients must be > 0".into()));
        }
        Ok(())
    }
}
