//! Parsing helpers for environment-style settings.
//!
//! An unset variable and a blank one are both "not configured".

use crate::error::ConfigError;
use std::time::Duration;

/// Reads `key` through `lookup`, trimming it and dropping blank values.
pub(crate) fn read_var<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parses a boolean flag (`true/false`, `1/0`, `yes/no`, `on/off`).
pub(crate) fn parse_flag(key: &'static str, raw: Option<String>) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(Some(true)),
        "false" | "0" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::Invalid {
            key,
            message: format!("expected true or false, got '{}'", raw),
        }),
    }
}

/// Parses a TCP port, rejecting zero.
pub(crate) fn parse_port(key: &'static str, raw: Option<String>) -> Result<Option<u16>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.parse::<u16>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            message: "port must be between 1 and 65535".to_string(),
        }),
        Ok(port) => Ok(Some(port)),
        Err(e) => Err(ConfigError::Invalid {
            key,
            message: format!("'{}' is not a port: {}", raw, e),
        }),
    }
}

/// Parses a positive millisecond duration.
pub(crate) fn parse_millis(
    key: &'static str,
    raw: Option<String>,
) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            message: "timeout must be greater than zero".to_string(),
        }),
        Ok(ms) => Ok(Some(Duration::from_millis(ms))),
        Err(e) => Err(ConfigError::Invalid {
            key,
            message: format!("'{}' is not a number of milliseconds: {}", raw, e),
        }),
    }
}
