//! Locating and loading the configuration file for the `reckon` binary

use anyhow::{Context, Result};
use reckon_core::EngineConfig;
use std::env;
use std::fs;
use tracing::{info, warn};

/// Read the config file, falling back to defaults, then apply environment overrides
pub fn load_config(explicit_path: Option<&str>) -> Result<EngineConfig> {
    let path = explicit_path
        .map(str::to_string)
        .or_else(|| env::var("RECKON_CONFIG_PATH").ok())
        .unwrap_or_else(|| "reckon.toml".to_string());

    let config = match fs::read_to_string(&path) {
        Ok(text) => EngineConfig::from_toml_str(&text)
            .with_context(|| format!("Failed to load configuration file '{path}'"))?,
        Err(_) if explicit_path.is_some() => {
            anyhow::bail!("Configuration file '{path}' could not be read");
        }
        Err(_) => {
            warn!("Configuration file '{}' not found. Using default configuration.", path);
            EngineConfig::default()
        }
    };

    let config = config.with_overrides(|key| env::var(key).ok())?;
    info!(
        default_locale = %config.locale.default_locale,
        currency = %config.formatting.currency,
        "Configuration loaded"
    );
    Ok(config)
}
