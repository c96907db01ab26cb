use anyhow::{Context, Result};
use std::path::PathBuf;

/// Get the slidecast config directory, creating it when missing
pub fn slidecast_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("slidecast");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Default location of the narration config file
pub fn narration_config_path() -> Result<PathBuf> {
    Ok(slidecast_config_dir()?.join("narration.toml"))
}
