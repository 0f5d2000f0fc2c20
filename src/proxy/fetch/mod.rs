use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{Client, Response, StatusCode};
use tracing::debug;
use url::Url;

use crate::errors::{ProxyError, ProxyResult};
use crate::proxy::resolver::HostValidator;

/// A successful (2xx) upstream response plus the URLs visited to reach it.
#[derive(Debug)]
pub struct PinnedResponse {
    pub response: Response,
    /// Every URL requested, origin first. `chain.len() - 1` redirects were followed.
    pub chain: Vec<Url>,
}

impl PinnedResponse {
    pub fn final_url(&self) -> &Url {
        // chain always holds at least the origin URL
        &self.chain[self.chain.len() - 1]
    }

    pub fn redirects(&self) -> usize {
        self.chain.len() - 1
    }
}

/// Fetches over HTTPS with DNS pinned to validated addresses.
///
/// Each hop resolves the host once through [`HostValidator`] and builds a
/// one-shot client whose resolver override points at the first validated
/// address, so the transport never performs its own lookup. Redirects are
/// never followed by reqwest; they are walked here, and each target goes
/// through the full scheme and address validation again.
pub struct PinnedFetcher {
    validator: HostValidator,
    user_agent: String,
    connect_timeout: Duration,
    #[cfg(test)]
    allow_loopback: bool,
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

impl PinnedFetcher {
    pub fn new(validator: HostValidator, connect_timeout: Duration) -> Self {
        Self {
            validator,
            user_agent: format!("imageguard/{}", crate::VERSION),
            connect_timeout,
            #[cfg(test)]
            allow_loopback: false,
        }
    }

    /// Accept plain-HTTP targets that resolve to loopback (local mock servers).
    #[cfg(test)]
    pub(crate) fn allow_loopback(mut self) -> Self {
        self.validator = self.validator.allow_loopback();
        self.allow_loopback = true;
        self
    }

    /// Fetch `url`, following at most `max_redirects` redirects.
    pub async fn fetch(&self, url: Url, max_redirects: u32) -> ProxyResult<PinnedResponse> {
        let mut chain = vec![url];
        let mut remaining = max_redirects;

        loop {
            let current = &chain[chain.len() - 1];
            let response = self.send_pinned(current).await?;
            let status = response.status();

            if !is_redirect(status) {
                if !status.is_success() {
                    return Err(ProxyError::Upstream(status.as_u16()));
                }
                return Ok(PinnedResponse { response, chain });
            }

            if remaining == 0 {
                return Err(ProxyError::Redirect(format!(
                    "more than {} redirects",
                    max_redirects
                )));
            }
            remaining -= 1;

            let next = redirect_target(current, &response)?;
            debug!(
                "following {} redirect {} -> {} ({} left)",
                status.as_u16(),
                current,
                next,
                remaining
            );
            chain.push(next);
        }
    }

    /// One request to one URL over a freshly pinned connection.
    async fn send_pinned(&self, url: &Url) -> ProxyResult<Response> {
        let plain_http = match url.scheme() {
            "https" => false,
            #[cfg(test)]
            "http" if self.allow_loopback => true,
            other => return Err(ProxyError::Protocol(other.to_string())),
        };

        let host = url
            .host_str()
            .ok_or_else(|| ProxyError::Policy("URL has no host".to_string()))?;
        let addrs = self.validator.resolve_and_validate(host).await?;
        let pinned = addrs[0];
        if plain_http && !addrs.iter().all(IpAddr::is_loopback) {
            return Err(ProxyError::Protocol("http".to_string()));
        }

        let client = self.pinned_client(url, pinned)?;
        debug!("fetching {} via pinned address {}", url, pinned);

        client
            .get(url.clone())
            .header(ACCEPT, "image/*")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProxyError::Timeout(self.connect_timeout)
                } else {
                    ProxyError::Network(format!("request to {} failed: {}", host, e))
                }
            })
    }

    /// Build a one-shot client with DNS pinned to `ip`.
    ///
    /// Proxies are disabled as well: an environment proxy would resolve the
    /// hostname itself and defeat the pin.
    fn pinned_client(&self, url: &Url, ip: IpAddr) -> ProxyResult<Client> {
        let mut builder = Client::builder()
            .user_agent(&self.user_agent)
            .redirect(reqwest::redirect::Policy::none())
            .no_proxy()
            .connect_timeout(self.connect_timeout);
        if let Some(url::Host::Domain(domain)) = url.host() {
            let port = url.port_or_known_default().unwrap_or(443);
            builder = builder.resolve(domain, SocketAddr::new(ip, port));
        }
        builder
            .build()
            .map_err(|e| ProxyError::Network(format!("failed to build pinned HTTP client: {}", e)))
    }
}

/// Resolve a redirect's `Location` against the URL that produced it.
fn redirect_target(current: &Url, response: &Response) -> ProxyResult<Url> {
    let location = response
        .headers()
        .get(LOCATION)
        .ok_or_else(|| ProxyError::Redirect("redirect without Location header".to_string()))?
        .to_str()
        .map_err(|_| ProxyError::Redirect("undecodable Location header".to_string()))?;
    current
        .join(location)
        .map_err(|e| ProxyError::Redirect(format!("invalid Location {:?}: {}", location, e)))
}
