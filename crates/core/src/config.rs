//! Environment-variable configuration helpers.
//!
//! Every binary loads its settings from the process environment (optionally
//! seeded from a `.env` file). These helpers keep parsing and error
//! reporting uniform across the per-binary config structs.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Error produced while reading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be set")]
    Missing { key: &'static str },

    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Read `key`, returning `None` when it is unset or blank.
pub fn env_optional(key: &'static str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read a mandatory variable.
pub fn env_required(key: &'static str) -> Result<String, ConfigError> {
    env_optional(key).ok_or(ConfigError::Missing { key })
}

/// Read and parse `key`, falling back to `default` when unset.
pub fn env_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match env_optional(key) {
        Some(raw) => parse(key, &raw),
        None => Ok(default),
    }
}

/// Read a whole number of seconds as a [`Duration`].
pub fn env_secs(key: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
    env_or(key, default_secs).map(Duration::from_secs)
}

/// Read a whole number of milliseconds as a [`Duration`].
pub fn env_millis(key: &'static str, default_millis: u64) -> Result<Duration, ConfigError> {
    env_or(key, default_millis).map(Duration::from_millis)
}

/// Parse a raw value, attributing failures to `key`.
pub fn parse<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
