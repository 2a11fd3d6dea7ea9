// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

use crate::types::LogLevel;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [executor]
/// timeout = "10m"
///
/// [logging]
/// level = "debug"
/// ```
///
/// Every section and key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub executor: ExecutorSection,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// `[executor]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorSection {
    /// Overall deadline for one execution, e.g. `"90s"`, `"10m"`.
    ///
    /// Supported suffixes: `ms`, `s`, `m`, `h`.
    #[serde(default)]
    pub timeout: Option<String>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Overrides `BUILDGRAPH_LOG` when set.
    #[serde(default)]
    pub level: Option<LogLevel>,
}

/// Validated configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub timeout: Option<Duration>,
    pub log_level: Option<LogLevel>,
}
