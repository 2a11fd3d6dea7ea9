// src/logging.rs

//! Logging setup for `buildgraph` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. the explicit level passed by the caller (e.g. from `[logging].level`)
//! 2. `BUILDGRAPH_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that build tools can keep stdout for their own
//! output.

use anyhow::{anyhow, Result};
use tracing_subscriber::fmt;

use crate::types::LogLevel;

/// Environment variable consulted when no explicit level is given.
pub const LOG_ENV_VAR: &str = "BUILDGRAPH_LOG";

/// Initialise the global logging subscriber.
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(level: Option<LogLevel>) -> Result<()> {
    let level = resolve_level(level, std::env::var(LOG_ENV_VAR).ok().as_deref());

    fmt()
        .with_max_level(tracing::Level::from(level))
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

/// Pick the effective level from an explicit value and the env var contents.
///
/// Unparseable env values fall back to the default.
pub fn resolve_level(explicit: Option<LogLevel>, env_value: Option<&str>) -> LogLevel {
    explicit
        .or_else(|| env_value.and_then(|s| s.parse().ok()))
        .unwrap_or_default()
}
