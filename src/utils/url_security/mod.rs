//! Address and hostname classification to prevent SSRF attacks.
//!
//! Everything here is pure and fail-closed: input that cannot be parsed or
//! does not match a known public form is reported as private.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Hostname suffixes that only make sense inside a private network.
const INTERNAL_SUFFIXES: &[&str] = &[
    ".local",
    ".internal",
    ".corp",
    ".lan",
    ".intranet",
    ".home",
    ".localhost",
];

/// Whether a textual IP address points at a private/internal destination.
///
/// Handles:
/// - IPv4-mapped IPv6 (`::ffff:a.b.c.d`), classified as the embedded IPv4
/// - IPv6 loopback, unspecified, ULA (`fc00::/7`), link-local (`fe80::/10`)
/// - 6to4 (`2002::/16`), classified as the embedded IPv4
/// - Teredo (`2001:0::/32`), always private
/// - Any other IPv6 is private unless it ends in an IPv4 literal
/// - Malformed input of any kind is private
pub fn is_private_ip(raw: &str) -> bool {
    let ip = raw.trim();
    let ip = ip
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(ip);

    if !ip.contains(':') {
        return match ip.parse::<Ipv4Addr>() {
            Ok(v4) => is_private_ipv4(v4),
            Err(_) => true,
        };
    }

    let lower = ip.to_ascii_lowercase();
    if let Some(embedded) = lower.strip_prefix("::ffff:")
        && embedded.contains('.')
    {
        return is_private_ip(embedded);
    }

    let Ok(v6) = lower.parse::<Ipv6Addr>() else {
        return true;
    };
    if let Some(verdict) = classify_known_ipv6(v6) {
        return verdict;
    }

    // Unrecognised IPv6 form: only a trailing dotted quad gets a second look.
    match lower.rsplit_once(':') {
        Some((_, tail)) if tail.contains('.') => is_private_ip(tail),
        _ => true,
    }
}

/// Same rules as [`is_private_ip`] for an already-parsed address.
pub fn is_private_addr(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(v4),
        IpAddr::V6(_) => is_private_ip(&ip.to_string()),
    }
}

pub fn is_private_ipv4(v4: Ipv4Addr) -> bool {
    let [a, b, _, _] = v4.octets();
    a == 0 // 0.0.0.0/8
        || a == 10
        || a == 127
        || (a == 169 && b == 254)
        || (a == 172 && (16..=31).contains(&b))
        || (a == 192 && b == 168)
        || (a == 100 && (64..=127).contains(&b)) // CGNAT
        || (a == 198 && (b == 18 || b == 19)) // benchmarking
        || a >= 224 // multicast and reserved
}

/// Verdict for the IPv6 ranges with explicit rules, `None` for anything else.
fn classify_known_ipv6(v6: Ipv6Addr) -> Option<bool> {
    if let Some(v4) = v6.to_ipv4_mapped() {
        return Some(is_private_ipv4(v4));
    }
    if v6.is_loopback() || v6.is_unspecified() {
        return Some(true);
    }
    let segments = v6.segments();
    // fc00::/7 unique local
    if segments[0] & 0xfe00 == 0xfc00 {
        return Some(true);
    }
    // fe80::/10 link-local
    if segments[0] & 0xffc0 == 0xfe80 {
        return Some(true);
    }
    // 6to4: 2002:AABB:CCDD:: carries AA.BB.CC.DD
    if segments[0] == 0x2002 {
        let [a, b] = segments[1].to_be_bytes();
        let [c, d] = segments[2].to_be_bytes();
        return Some(is_private_ipv4(Ipv4Addr::new(a, b, c, d)));
    }
    // Teredo: the embedded client address is obfuscated, never trust it
    if segments[0] == 0x2001 && segments[1] == 0 {
        return Some(true);
    }
    None
}

/// Whether a hostname is an obvious internal name (`localhost`, `*.local`, ...).
pub fn is_internal_hostname(host: &str) -> bool {
    let host = host.trim().to_ascii_lowercase();
    let host = host.strip_suffix('.').unwrap_or(&host);
    host == "localhost" || INTERNAL_SUFFIXES.iter().any(|s| host.ends_with(s))
}

#[cfg(test)]
mod tests;
