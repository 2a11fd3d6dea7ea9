// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ExecutorConfig, RawConfigFile};
use crate::errors::{BuildgraphError, Result};

impl TryFrom<RawConfigFile> for ExecutorConfig {
    type Error = BuildgraphError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let timeout = raw
            .executor
            .timeout
            .as_deref()
            .map(validate_timeout)
            .transpose()?;

        Ok(ExecutorConfig {
            timeout,
            log_level: raw.logging.level,
        })
    }
}

fn validate_timeout(s: &str) -> Result<Duration> {
    let timeout = parse_duration(s).map_err(|e| {
        BuildgraphError::ConfigError(format!("[executor].timeout: {e}"))
    })?;
    if timeout.is_zero() {
        return Err(BuildgraphError::ConfigError(
            "[executor].timeout must be greater than zero".to_string(),
        ));
    }
    Ok(timeout)
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;

    let secs = |mult: u64| {
        value
            .checked_mul(mult)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration '{s}' is too large"))
    };

    match unit_part.trim().to_lowercase().as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => secs(60),
        "h" => secs(60 * 60),
        unit => Err(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m, or h"
        )),
    }
}
