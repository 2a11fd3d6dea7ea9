// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ExecutorConfig, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file and return the raw [`RawConfigFile`].
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawConfigFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Load a configuration file and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ExecutorConfig> {
    let raw = load_from_path(path)?;
    ExecutorConfig::try_from(raw)
}

/// Parse and validate configuration held in memory.
pub fn parse_str(contents: &str) -> Result<ExecutorConfig> {
    let raw: RawConfigFile = toml::from_str(contents)?;
    ExecutorConfig::try_from(raw)
}

/// Conventional config file name in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Buildgraph.toml")
}
