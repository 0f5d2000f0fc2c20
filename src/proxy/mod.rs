//! The upstream half of the proxy: pinned fetch, bounded read, content check.

pub mod fetch;
pub mod resolver;

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tracing::info;
use url::Url;

use crate::config::FetchConfig;
use crate::errors::{ProxyError, ProxyResult};
use crate::utils::http::read_body_with_limit;
use crate::utils::media::{self, ImageFormat};

use fetch::PinnedFetcher;
use resolver::{DnsLookup, HostValidator};

/// A validated image ready to be served.
#[derive(Debug)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub final_url: Url,
    pub redirects: usize,
}

/// Runs the whole upstream pipeline under one deadline.
pub struct ImageFetcher {
    fetcher: PinnedFetcher,
    max_body_bytes: usize,
    max_redirects: u32,
    timeout: Duration,
}

impl ImageFetcher {
    pub fn new(config: &FetchConfig, lookup: Arc<dyn DnsLookup>) -> Self {
        let timeout = config.timeout();
        Self {
            fetcher: PinnedFetcher::new(HostValidator::new(lookup), timeout),
            max_body_bytes: config.max_body_bytes,
            max_redirects: config.max_redirects,
            timeout,
        }
    }

    #[cfg(test)]
    pub(crate) fn allow_loopback(mut self) -> Self {
        self.fetcher = self.fetcher.allow_loopback();
        self
    }

    /// Fetch `url` and return its body if it is an allow-listed image.
    ///
    /// The deadline covers every redirect hop and the body read. On expiry
    /// the in-flight future is dropped, which closes the connection.
    pub async fn fetch_image(&self, url: Url) -> ProxyResult<FetchedImage> {
        tokio::time::timeout(self.timeout, self.fetch_unbounded(url))
            .await
            .unwrap_or(Err(ProxyError::Timeout(self.timeout)))
    }

    async fn fetch_unbounded(&self, url: Url) -> ProxyResult<FetchedImage> {
        let pinned = self.fetcher.fetch(url, self.max_redirects).await?;

        let content_type = pinned
            .response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let format = ImageFormat::from_content_type(&content_type)
            .ok_or_else(|| ProxyError::UnsupportedType(content_type.clone()))?;

        let final_url = pinned.final_url().clone();
        let redirects = pinned.redirects();
        let bytes = read_body_with_limit(pinned.response, self.max_body_bytes).await?;

        if !media::validate(&bytes, &content_type) {
            return Err(ProxyError::ContentMismatch(content_type));
        }

        info!(
            "proxied {} ({}, {} bytes, {} redirects)",
            final_url,
            format.mime_type(),
            bytes.len(),
            redirects
        );
        Ok(FetchedImage {
            bytes,
            format,
            final_url,
            redirects,
        })
    }
}
