// Configuration loader
// Reads ~/.haven/config.toml (or $HAVEN_CONFIG), then applies environment overrides

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::settings::Config;
use crate::errors::config_parse_error;

/// Location of the config file
pub fn config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("HAVEN_CONFIG") {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".haven/config.toml"))
}

/// Load configuration from the default location or environment
pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    let mut config = load_config_from(&path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Parse a config file; a missing file yields defaults
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No config file, using defaults");
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow!(config_parse_error(&path.display().to_string(), &e.to_string())))?;

    tracing::debug!(path = %path.display(), "Loaded config");
    Ok(config)
}

fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(bind) = var("HAVEN_BIND").filter(|v| !v.is_empty()) {
        config.server.bind_address = bind;
    }
    if let Some(dir) = var("HAVEN_DATA_DIR").filter(|v| !v.is_empty()) {
        config.storage.data_dir = PathBuf::from(dir);
    }
    if let Some(country) = var("HAVEN_COUNTRY").filter(|v| !v.is_empty()) {
        config.resources.default_country = country.to_uppercase();
    }
}
