#![no_main]

use imageguard::fuzz_api::validate_request_url;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Anything accepted must be a plain https URL with no credentials and the default port.
    if let Ok(url) = validate_request_url(data) {
        assert_eq!(url.scheme(), "https");
        assert!(url.username().is_empty() && url.password().is_none());
        assert!(url.port().is_none());
        assert!(data.len() <= 2048);
    }
});
