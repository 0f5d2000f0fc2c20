#![no_main]

use imageguard::fuzz_api::{is_internal_hostname, is_private_ip};
use libfuzzer_sys::fuzz_target;
use std::net::Ipv4Addr;

fuzz_target!(|data: &str| {
    let private = is_private_ip(data);
    // Colon-free, bracket-free input that is not a dotted quad must classify as private.
    let bare = data.trim();
    if !bare.contains([':', '[']) && bare.parse::<Ipv4Addr>().is_err() {
        assert!(private, "unparseable input classified public: {data:?}");
    }
    let _ = is_internal_hostname(data);
});
