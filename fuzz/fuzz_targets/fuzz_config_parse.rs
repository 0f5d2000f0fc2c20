#![no_main]

use imageguard::config::Config;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(v) = serde_json::from_slice::<serde_json::Value>(data)
        && let Ok(config) = serde_json::from_value::<Config>(v)
    {
        let _ = config.validate();
    }
});
