//! Process-wide configuration.
//!
//! The configuration is installed at most once, typically at startup, and is
//! read-only afterwards. Until something is installed, [`Config::global`]
//! returns the defaults.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::timestamp::Precision;

static GLOBAL: OnceLock<Config> = OnceLock::new();
static DEFAULT: Config = Config {
    time_precision: Precision::Nanoseconds,
};

/// Settings shared by every metric schema in the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Precision used by schemas that do not declare their own.
    pub time_precision: Precision,
}

impl Default for Config {
    fn default() -> Self {
        DEFAULT.clone()
    }
}

impl Config {
    /// Sets the default time precision.
    #[must_use]
    pub fn with_time_precision(mut self, precision: Precision) -> Self {
        self.time_precision = precision;
        self
    }

    /// Installs `self` as the process-wide configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::AlreadyInstalled`] if a configuration was
    /// installed earlier; the earlier one stays in effect.
    pub fn install(self) -> Result<(), ConfigError> {
        GLOBAL.set(self).map_err(|_| ConfigError::AlreadyInstalled)?;
        tracing::debug!(config = ?GLOBAL.get(), "installed process-wide configuration");
        Ok(())
    }

    /// The installed configuration, or the defaults if none was installed.
    pub fn global() -> &'static Config {
        GLOBAL.get().unwrap_or(&DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.time_precision, Precision::Nanoseconds);
        assert_eq!(
            config.with_time_precision(Precision::Seconds).time_precision,
            Precision::Seconds
        );
    }

    #[test]
    fn test_deserialize_with_missing_fields() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());

        let config: Config = serde_json::from_str(r#"{"time_precision":"ms"}"#).unwrap();
        assert_eq!(config.time_precision, Precision::Milliseconds);
    }
}
