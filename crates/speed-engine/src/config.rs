//! Engine configuration.
//!
//! Configuration is loaded from environment variables. Every value has a
//! default; values that are present but unusable are errors rather than being
//! silently replaced, since a zero poll interval or channel size would stop
//! the engine at startup.

use std::collections::HashMap;
use std::env;
use std::time::Duration;

use serde::Serialize;
use speed_core::enforcer::EnforcerConfig;
use speed_core::speed::STORAGE_KEY;
use thiserror::Error;

/// Default poll interval. Short enough to beat the rate resets of the most
/// aggressive streaming players.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default timeout for the startup settings read.
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 2000;

/// Default capacity of the host event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 64;

/// Default capacity of the command mailbox.
pub const DEFAULT_COMMAND_BUFFER: usize = 32;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// Interval between poll passes (default: 100ms).
    pub poll_interval: Duration,

    /// Shadow boundaries discovery may cross (default: unbounded).
    pub max_shadow_depth: Option<usize>,

    /// Persisted setting key (default: "playbackSpeed").
    pub storage_key: String,

    /// Upper bound on the startup settings read (default: 2s).
    pub store_timeout: Duration,

    /// Host event channel capacity (default: 64). Events beyond this are
    /// dropped; a pass is already pending when the channel is full.
    pub event_buffer: usize,

    /// Command mailbox capacity (default: 32).
    pub command_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_shadow_depth: None,
            storage_key: STORAGE_KEY.to_string(),
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
            event_buffer: DEFAULT_EVENT_BUFFER,
            command_buffer: DEFAULT_COMMAND_BUFFER,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// See [`Config::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for non-numeric or zero
    /// intervals and buffer sizes, and for an empty storage key.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let poll_interval = parse_positive(vars, "ANYSPEED_POLL_INTERVAL_MS")?
            .map_or(defaults.poll_interval, Duration::from_millis);

        let store_timeout = parse_positive(vars, "ANYSPEED_STORE_TIMEOUT_MS")?
            .map_or(defaults.store_timeout, Duration::from_millis);

        let event_buffer = parse_positive(vars, "ANYSPEED_EVENT_BUFFER")?
            .map_or(Ok(defaults.event_buffer), to_usize)?;

        let command_buffer = parse_positive(vars, "ANYSPEED_COMMAND_BUFFER")?
            .map_or(Ok(defaults.command_buffer), to_usize)?;

        // "unbounded" (or unset) means no limit; "0" restricts to light DOM
        let max_shadow_depth = match vars.get("ANYSPEED_MAX_SHADOW_DEPTH").map(|s| s.trim()) {
            None | Some("unbounded") => None,
            Some(raw) => Some(raw.parse::<usize>().map_err(|e| {
                ConfigError::InvalidValue(format!(
                    "ANYSPEED_MAX_SHADOW_DEPTH must be an integer or \"unbounded\": {e}"
                ))
            })?),
        };

        let storage_key = match vars.get("ANYSPEED_STORAGE_KEY") {
            Some(key) if key.trim().is_empty() => {
                return Err(ConfigError::InvalidValue(
                    "ANYSPEED_STORAGE_KEY must not be empty".to_string(),
                ));
            }
            Some(key) => key.clone(),
            None => defaults.storage_key,
        };

        Ok(Self {
            poll_interval,
            max_shadow_depth,
            storage_key,
            store_timeout,
            event_buffer,
            command_buffer,
        })
    }

    /// Settings for the enforcer owned by the engine.
    #[must_use]
    pub fn enforcer_config(&self) -> EnforcerConfig {
        EnforcerConfig {
            max_shadow_depth: self.max_shadow_depth,
        }
    }
}

fn parse_positive(vars: &HashMap<String, String>, name: &str) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = vars.get(name) else {
        return Ok(None);
    };

    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidValue(format!(
            "{name} must be greater than zero"
        ))),
        Ok(value) => Ok(Some(value)),
        Err(e) => Err(ConfigError::InvalidValue(format!(
            "{name} must be a positive integer: {e}"
        ))),
    }
}

fn to_usize(value: u64) -> Result<usize, ConfigError> {
    usize::try_from(value).map_err(|e| ConfigError::InvalidValue(format!("{value}: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(&HashMap::new()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.max_shadow_depth, None);
        assert_eq!(config.storage_key, "playbackSpeed");
        assert_eq!(config.store_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_vars(&vars(&[
            ("ANYSPEED_POLL_INTERVAL_MS", "1000"),
            ("ANYSPEED_MAX_SHADOW_DEPTH", "3"),
            ("ANYSPEED_STORAGE_KEY", "speed"),
            ("ANYSPEED_STORE_TIMEOUT_MS", "500"),
            ("ANYSPEED_EVENT_BUFFER", "8"),
            ("ANYSPEED_COMMAND_BUFFER", "4"),
        ]))
        .unwrap();

        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.max_shadow_depth, Some(3));
        assert_eq!(config.storage_key, "speed");
        assert_eq!(config.store_timeout, Duration::from_millis(500));
        assert_eq!(config.event_buffer, 8);
        assert_eq!(config.command_buffer, 4);
        assert_eq!(config.enforcer_config().max_shadow_depth, Some(3));
    }

    #[test]
    fn test_unbounded_shadow_depth() {
        let config =
            Config::from_vars(&vars(&[("ANYSPEED_MAX_SHADOW_DEPTH", "unbounded")])).unwrap();
        assert_eq!(config.max_shadow_depth, None);

        let config = Config::from_vars(&vars(&[("ANYSPEED_MAX_SHADOW_DEPTH", "0")])).unwrap();
        assert_eq!(config.max_shadow_depth, Some(0));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let err = Config::from_vars(&vars(&[("ANYSPEED_POLL_INTERVAL_MS", "0")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid configuration value: ANYSPEED_POLL_INTERVAL_MS must be greater than zero"
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_vars(&vars(&[("ANYSPEED_POLL_INTERVAL_MS", "fast")])).is_err());
        assert!(Config::from_vars(&vars(&[("ANYSPEED_EVENT_BUFFER", "0")])).is_err());
        assert!(Config::from_vars(&vars(&[("ANYSPEED_MAX_SHADOW_DEPTH", "-1")])).is_err());
        assert!(Config::from_vars(&vars(&[("ANYSPEED_STORAGE_KEY", "  ")])).is_err());
    }
}
