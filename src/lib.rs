#![warn(clippy::pedantic)]
// Noisy doc/signature lints
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// format!("{}", x) is used throughout
#![allow(clippy::uninlined_format_args)]
// Byte counts move between usize and u64 (Content-Length, config sizes)
#![allow(clippy::cast_possible_truncation)]
// gateway::governor::Governor and friends
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod proxy;
pub mod utils;

/// Re-exports for fuzz targets. Not part of the public API.
#[doc(hidden)]
pub mod fuzz_api {
    pub use crate::gateway::governor::validate_request_url;
    pub use crate::utils::url_security::{is_internal_hostname, is_private_ip};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
