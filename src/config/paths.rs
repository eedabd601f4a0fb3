use std::path::PathBuf;

use anyhow::{Context, Result};

/// Returns the defaults file path: ~/.config/tailf/default.toml
pub fn default_config_path() -> Result<PathBuf> {
    let config = dirs::config_dir().context("Could not determine config directory")?;
    Ok(config.join("tailf").join("default.toml"))
}
