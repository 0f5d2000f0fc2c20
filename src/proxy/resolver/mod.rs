//! Hostname resolution with SSRF validation of every returned address.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use tracing::{debug, warn};

use crate::errors::{ProxyError, ProxyResult};
use crate::utils::url_security::{is_internal_hostname, is_private_addr};

/// Record-level DNS lookups. Errors are plain strings: they only ever reach logs.
#[async_trait]
pub trait DnsLookup: Send + Sync {
    async fn lookup_a(&self, host: &str) -> Result<Vec<Ipv4Addr>, String>;
    async fn lookup_aaaa(&self, host: &str) -> Result<Vec<Ipv6Addr>, String>;
}

/// Production lookup backed by hickory-resolver.
pub struct HickoryLookup {
    resolver: TokioAsyncResolver,
}

impl HickoryLookup {
    /// Use the system resolver configuration, falling back to hickory's
    /// defaults when it cannot be read (e.g. no `/etc/resolv.conf`).
    pub fn from_system() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            warn!("failed to read system DNS config, using defaults: {}", e);
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { resolver }
    }
}

#[async_trait]
impl DnsLookup for HickoryLookup {
    async fn lookup_a(&self, host: &str) -> Result<Vec<Ipv4Addr>, String> {
        let lookup = self
            .resolver
            .ipv4_lookup(host)
            .await
            .map_err(|e| e.to_string())?;
        Ok(lookup.iter().map(|a| a.0).collect())
    }

    async fn lookup_aaaa(&self, host: &str) -> Result<Vec<Ipv6Addr>, String> {
        let lookup = self
            .resolver
            .ipv6_lookup(host)
            .await
            .map_err(|e| e.to_string())?;
        Ok(lookup.iter().map(|aaaa| aaaa.0).collect())
    }
}

/// Resolves hostnames and refuses any target that is, or could be, internal.
#[derive(Clone)]
pub struct HostValidator {
    lookup: Arc<dyn DnsLookup>,
    #[cfg(test)]
    allow_loopback: bool,
}

impl HostValidator {
    pub fn new(lookup: Arc<dyn DnsLookup>) -> Self {
        Self {
            lookup,
            #[cfg(test)]
            allow_loopback: false,
        }
    }

    /// Let loopback addresses through so tests can target a local mock server.
    #[cfg(test)]
    pub(crate) fn allow_loopback(mut self) -> Self {
        self.allow_loopback = true;
        self
    }

    fn check_addr(&self, host: &str, ip: IpAddr) -> ProxyResult<()> {
        #[cfg(test)]
        if self.allow_loopback && ip.is_loopback() {
            return Ok(());
        }
        if is_private_addr(ip) {
            return Err(ProxyError::Policy(format!(
                "{} resolves to blocked address {}",
                host, ip
            )));
        }
        Ok(())
    }

    /// Resolve `host` and validate every address it maps to.
    ///
    /// Literal IPs skip DNS. If any resolved address is private the whole
    /// lookup fails: the socket could end up on any of them. The returned
    /// list is non-empty and the caller pins to its first element.
    pub async fn resolve_and_validate(&self, host: &str) -> ProxyResult<Vec<IpAddr>> {
        let bare = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if let Ok(ip) = bare.parse::<IpAddr>() {
            self.check_addr(host, ip)?;
            return Ok(vec![ip]);
        }

        if is_internal_hostname(host) {
            return Err(ProxyError::Policy(format!("internal hostname {}", host)));
        }

        let mut addrs: Vec<IpAddr> = match self.lookup.lookup_a(host).await {
            Ok(v4) => v4.into_iter().map(IpAddr::V4).collect(),
            Err(e) => {
                debug!("A lookup for {} failed: {}", host, e);
                Vec::new()
            }
        };
        if addrs.is_empty() {
            addrs = match self.lookup.lookup_aaaa(host).await {
                Ok(v6) => v6.into_iter().map(IpAddr::V6).collect(),
                Err(e) => {
                    return Err(ProxyError::Resolution {
                        host: host.to_string(),
                        reason: e,
                    });
                }
            };
        }
        if addrs.is_empty() {
            return Err(ProxyError::Resolution {
                host: host.to_string(),
                reason: "no A or AAAA records".to_string(),
            });
        }

        for ip in &addrs {
            self.check_addr(host, *ip)?;
        }
        Ok(addrs)
    }
}

/// Fixed host → address table for tests.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct StaticLookup {
    v4: std::collections::HashMap<String, Vec<Ipv4Addr>>,
    v6: std::collections::HashMap<String, Vec<Ipv6Addr>>,
}

#[cfg(test)]
impl StaticLookup {
    pub(crate) fn with_a(mut self, host: &str, addrs: &[&str]) -> Self {
        self.v4.insert(
            host.to_string(),
            addrs.iter().map(|a| a.parse().unwrap()).collect(),
        );
        self
    }

    pub(crate) fn with_aaaa(mut self, host: &str, addrs: &[&str]) -> Self {
        self.v6.insert(
            host.to_string(),
            addrs.iter().map(|a| a.parse().unwrap()).collect(),
        );
        self
    }
}

#[cfg(test)]
#[async_trait]
impl DnsLookup for StaticLookup {
    async fn lookup_a(&self, host: &str) -> Result<Vec<Ipv4Addr>, String> {
        self.v4
            .get(host)
            .cloned()
            .ok_or_else(|| format!("no A record for {host}"))
    }

    async fn lookup_aaaa(&self, host: &str) -> Result<Vec<Ipv6Addr>, String> {
        self.v6
            .get(host)
            .cloned()
            .ok_or_else(|| format!("no AAAA record for {host}"))
    }
}
