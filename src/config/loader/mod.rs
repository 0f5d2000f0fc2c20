use crate::config::Config;
use crate::errors::ConfigError;
use crate::utils::get_imageguard_home;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Overrides `server.host`.
pub const ENV_HOST: &str = "IMAGEGUARD_HOST";
/// Overrides `server.port`.
pub const ENV_PORT: &str = "IMAGEGUARD_PORT";

pub fn get_config_path() -> Result<PathBuf> {
    Ok(get_imageguard_home()?.join("config.json"))
}

/// Load, override from the environment, and validate.
///
/// A missing file is not an error: every field has a default.
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    load_config_with_env(config_path, |key| std::env::var(key).ok())
}

pub(crate) fn load_config_with_env(
    config_path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Config> {
    let default_path = get_config_path().unwrap_or_else(|_| PathBuf::from("config.json"));
    let path = config_path.unwrap_or(default_path.as_path());

    let mut config = if path.exists() {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON from {}", path.display()))?
    } else {
        debug!("no config at {}, using defaults", path.display());
        Config::default()
    };

    apply_env_overrides(&mut config, env)?;

    config
        .validate()
        .with_context(|| "Configuration validation failed")?;
    Ok(config)
}

fn apply_env_overrides(
    config: &mut Config,
    env: impl Fn(&str) -> Option<String>,
) -> Result<(), ConfigError> {
    if let Some(host) = env(ENV_HOST).filter(|h| !h.trim().is_empty()) {
        config.server.host = host.trim().to_string();
    }
    if let Some(port) = env(ENV_PORT) {
        config.server.port = port
            .trim()
            .parse()
            .map_err(|_| ConfigError(format!("{ENV_PORT} is not a valid port: {port:?}")))?;
    }
    Ok(())
}
