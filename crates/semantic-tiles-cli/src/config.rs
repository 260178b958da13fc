//! Configuration loading for the CLI.

use std::path::PathBuf;

use anyhow::{Context, Result};
use semantic_tiles_ops::Config;

/// Load configuration from `.env`, the config file and the environment,
/// with an explicit `--store` taking precedence.
pub fn load(store: Option<PathBuf>) -> Result<Config> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(root) = store {
        config.store_root = root;
    }
    Ok(config)
}
