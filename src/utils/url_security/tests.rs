use super::*;
use proptest::prelude::*;

// --- IPv4 ---

#[test]
fn blocks_loopback() {
    assert!(is_private_ip("127.0.0.1"));
    assert!(is_private_ip("127.255.255.254"));
}

#[test]
fn blocks_rfc1918() {
    assert!(is_private_ip("10.0.0.1"));
    assert!(is_private_ip("172.16.0.1"));
    assert!(is_private_ip("172.31.255.255"));
    assert!(is_private_ip("192.168.1.1"));
}

#[test]
fn blocks_metadata_endpoint() {
    assert!(is_private_ip("169.254.169.254"));
}

#[test]
fn blocks_zero_network() {
    assert!(is_private_ip("0.0.0.0"));
    assert!(is_private_ip("0.1.2.3"));
}

#[test]
fn blocks_cgnat_and_benchmarking() {
    assert!(is_private_ip("100.64.0.1"));
    assert!(is_private_ip("100.127.255.255"));
    assert!(is_private_ip("198.18.0.1"));
    assert!(is_private_ip("198.19.255.255"));
}

#[test]
fn blocks_multicast_and_reserved() {
    assert!(is_private_ip("224.0.0.1"));
    assert!(is_private_ip("239.255.255.250"));
    assert!(is_private_ip("255.255.255.255"));
}

#[test]
fn range_boundaries_are_public() {
    assert!(!is_private_ip("172.15.255.255"));
    assert!(!is_private_ip("172.32.0.0"));
    assert!(!is_private_ip("100.63.255.255"));
    assert!(!is_private_ip("100.128.0.0"));
    assert!(!is_private_ip("198.17.255.255"));
    assert!(!is_private_ip("198.20.0.0"));
    assert!(!is_private_ip("169.253.0.1"));
    assert!(!is_private_ip("223.255.255.255"));
}

#[test]
fn allows_public_ipv4() {
    assert!(!is_private_ip("8.8.8.8"));
    assert!(!is_private_ip("93.184.216.34"));
    assert!(!is_private_ip("1.1.1.1"));
}

#[test]
fn malformed_ipv4_is_private() {
    assert!(is_private_ip(""));
    assert!(is_private_ip("1.2.3"));
    assert!(is_private_ip("1.2.3.4.5"));
    assert!(is_private_ip("256.1.1.1"));
    assert!(is_private_ip("1.2.3.-4"));
    assert!(is_private_ip("a.b.c.d"));
    assert!(is_private_ip("8.8.8.8x"));
    assert!(is_private_ip("010.0.0.1"));
    assert!(is_private_ip("2130706433"));
}

// --- IPv6 ---

#[test]
fn blocks_ipv6_loopback_and_unspecified() {
    assert!(is_private_ip("::1"));
    assert!(is_private_ip("::"));
    assert!(is_private_ip("[::1]"));
}

#[test]
fn blocks_ipv6_ula_and_link_local() {
    assert!(is_private_ip("fc00::1"));
    assert!(is_private_ip("fd12:3456:789a::1"));
    assert!(is_private_ip("fe80::1"));
    assert!(is_private_ip("febf::1"));
}

#[test]
fn zone_id_is_private() {
    assert!(is_private_ip("fe80::1%eth0"));
}

#[test]
fn ipv4_mapped_follows_embedded_address() {
    assert!(is_private_ip("::ffff:127.0.0.1"));
    assert!(is_private_ip("::ffff:10.1.2.3"));
    assert!(is_private_ip("::FFFF:169.254.169.254"));
    assert!(!is_private_ip("::ffff:8.8.8.8"));
    // hex form of ::ffff:8.8.8.8
    assert!(!is_private_ip("::ffff:808:808"));
    assert!(is_private_ip("::ffff:7f00:1"));
}

#[test]
fn six_to_four_decodes_embedded_ipv4() {
    // 2002:0a00:0001:: embeds 10.0.0.1
    assert!(is_private_ip("2002:0a00:0001::"));
    // 2002:7f00:0001:: embeds 127.0.0.1
    assert!(is_private_ip("2002:7f00:1::1"));
    // 2002:c0a8:0101:: embeds 192.168.1.1
    assert!(is_private_ip("2002:c0a8:0101::"));
    // 2002:0808:0808:: embeds 8.8.8.8
    assert!(!is_private_ip("2002:0808:0808::"));
}

#[test]
fn teredo_is_always_private() {
    assert!(is_private_ip("2001:0000:4136:e378:8000:63bf:3fff:fdd2"));
    assert!(is_private_ip("2001:0:53aa:64c:0:0:0:1"));
}

#[test]
fn unknown_ipv6_fails_closed() {
    assert!(is_private_ip("2606:4700:4700::1111"));
    assert!(is_private_ip("2001:db8::1"));
    assert!(is_private_ip("not:an:address"));
    assert!(is_private_ip(":::"));
}

#[test]
fn trailing_ipv4_literal_is_classified() {
    assert!(!is_private_ip("64:ff9b::8.8.8.8"));
    assert!(is_private_ip("64:ff9b::10.0.0.1"));
    assert!(is_private_ip("::127.0.0.1"));
}

#[test]
fn parsed_addresses_use_same_rules() {
    assert!(is_private_addr("10.0.0.1".parse().unwrap()));
    assert!(!is_private_addr("8.8.8.8".parse().unwrap()));
    assert!(is_private_addr("::ffff:192.168.0.1".parse().unwrap()));
    assert!(!is_private_addr("::ffff:1.1.1.1".parse().unwrap()));
    assert!(is_private_addr("2002:a00:1::".parse().unwrap()));
    assert!(is_private_addr("2606:4700::1111".parse().unwrap()));
}

// --- hostnames ---

#[test]
fn internal_hostnames() {
    assert!(is_internal_hostname("localhost"));
    assert!(is_internal_hostname("LOCALHOST"));
    assert!(is_internal_hostname("localhost."));
    assert!(is_internal_hostname("api.localhost"));
    assert!(is_internal_hostname("printer.local"));
    assert!(is_internal_hostname("db.internal"));
    assert!(is_internal_hostname("wiki.corp"));
    assert!(is_internal_hostname("nas.lan"));
    assert!(is_internal_hostname("portal.intranet"));
    assert!(is_internal_hostname("router.home"));
}

#[test]
fn public_hostnames() {
    assert!(!is_internal_hostname("example.com"));
    assert!(!is_internal_hostname("homepage.example.com"));
    assert!(!is_internal_hostname("local.example.org"));
    assert!(!is_internal_hostname("cdn.lanterns.io"));
}

// --- properties ---

fn private_ipv4() -> impl Strategy<Value = Ipv4Addr> {
    prop_oneof![
        any::<[u8; 3]>().prop_map(|[b, c, d]| Ipv4Addr::new(10, b, c, d)),
        any::<[u8; 3]>().prop_map(|[b, c, d]| Ipv4Addr::new(127, b, c, d)),
        any::<[u8; 2]>().prop_map(|[c, d]| Ipv4Addr::new(169, 254, c, d)),
        (16u8..=31, any::<[u8; 2]>()).prop_map(|(b, [c, d])| Ipv4Addr::new(172, b, c, d)),
        any::<[u8; 2]>().prop_map(|[c, d]| Ipv4Addr::new(192, 168, c, d)),
        (64u8..=127, any::<[u8; 2]>()).prop_map(|(b, [c, d])| Ipv4Addr::new(100, b, c, d)),
        (18u8..=19, any::<[u8; 2]>()).prop_map(|(b, [c, d])| Ipv4Addr::new(198, b, c, d)),
        (224u8..=255, any::<[u8; 3]>()).prop_map(|(a, [b, c, d])| Ipv4Addr::new(a, b, c, d)),
    ]
}

proptest! {
    #[test]
    fn every_private_range_member_is_private(ip in private_ipv4()) {
        prop_assert!(is_private_ip(&ip.to_string()));
    }

    #[test]
    fn mapped_matches_plain(octets in any::<[u8; 4]>()) {
        let v4 = Ipv4Addr::from(octets);
        prop_assert_eq!(
            is_private_ip(&format!("::ffff:{v4}")),
            is_private_ip(&v4.to_string())
        );
    }

    #[test]
    fn out_of_range_octet_is_private(octet in 256u32..100_000, pos in 0usize..4) {
        let mut parts = vec!["8".to_string(); 4];
        parts[pos] = octet.to_string();
        prop_assert!(is_private_ip(&parts.join(".")));
    }

    #[test]
    fn wrong_octet_count_is_private(parts in proptest::collection::vec(0u8..=255, 0..8)) {
        prop_assume!(parts.len() != 4);
        let text = parts.iter().map(u8::to_string).collect::<Vec<_>>().join(".");
        prop_assert!(is_private_ip(&text));
    }
}
