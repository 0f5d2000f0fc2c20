// Shared test helpers; not every item is used by every test binary.
#![allow(unused)]

use async_trait::async_trait;
use imageguard::proxy::resolver::DnsLookup;
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// DNS table for integration tests. Counts lookups so tests can assert
/// that a rejection happened before any resolution.
#[derive(Default)]
pub struct FixedLookup {
    a: HashMap<String, Vec<Ipv4Addr>>,
    aaaa: HashMap<String, Vec<Ipv6Addr>>,
    lookups: AtomicUsize,
}

impl FixedLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn a(mut self, host: &str, addrs: &[&str]) -> Self {
        self.a.insert(
            host.to_string(),
            addrs.iter().map(|s| s.parse().unwrap()).collect(),
        );
        self
    }

    pub fn aaaa(mut self, host: &str, addrs: &[&str]) -> Self {
        self.aaaa.insert(
            host.to_string(),
            addrs.iter().map(|s| s.parse().unwrap()).collect(),
        );
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DnsLookup for FixedLookup {
    async fn lookup_a(&self, host: &str) -> Result<Vec<Ipv4Addr>, String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.a
            .get(host)
            .cloned()
            .ok_or_else(|| format!("NXDOMAIN {host}"))
    }

    async fn lookup_aaaa(&self, host: &str) -> Result<Vec<Ipv6Addr>, String> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.aaaa
            .get(host)
            .cloned()
            .ok_or_else(|| format!("NXDOMAIN {host}"))
    }
}
