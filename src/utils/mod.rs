pub mod http;
pub mod media;
pub mod url_security;

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Overrides the data directory (`~/.imageguard` by default).
pub const ENV_HOME: &str = "IMAGEGUARD_HOME";

pub fn get_imageguard_home() -> Result<PathBuf> {
    if let Some(home) = std::env::var_os(ENV_HOME) {
        return Ok(PathBuf::from(home));
    }
    Ok(dirs::home_dir()
        .context("Could not determine home directory")?
        .join(".imageguard"))
}
