//! Display configuration
//!
//! Defaults, overridden by the `[display]` table of the rollcall config file,
//! overridden in turn by command-line arguments and environment variables.

use std::path::Path;
use std::time::Duration;

use rollcall_common::config::{load_toml_config, load_toml_file};
use serde::Deserialize;
use tracing::debug;

use crate::controller::DisplayTiming;
use crate::error::{DisplayError, Result};
use crate::slot::MAX_DWELL;

/// Config file table holding display settings
pub const CONFIG_TABLE: &str = "display";

/// Slowest accepted poll cadence
pub const MAX_POLL_INTERVAL_MS: u64 = 10_000;

/// Longest accepted per-request timeout
pub const MAX_REQUEST_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Base URL of rollcall-server
    pub server_url: String,
    pub poll_interval_ms: u64,
    pub dwell_secs: u64,
    pub request_timeout_ms: u64,
    /// Port the kiosk page is served on
    pub port: u16,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:10246".to_string(),
            poll_interval_ms: 300,
            dwell_secs: 20,
            request_timeout_ms: 2000,
            port: 5780,
        }
    }
}

impl DisplayConfig {
    /// Read the `[display]` table from a parsed config file; absent table means defaults
    pub fn from_toml(config: &toml::Value) -> Result<Self> {
        match config.get(CONFIG_TABLE) {
            Some(table) => table
                .clone()
                .try_into()
                .map_err(|e| DisplayError::Config(format!("Invalid [{}] table: {}", CONFIG_TABLE, e))),
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let config = load_toml_file(path).map_err(|e| DisplayError::Config(e.to_string()))?;
        Self::from_toml(&config)
    }

    /// Platform config file if present, else defaults
    pub fn load() -> Result<Self> {
        match load_toml_config() {
            Some(config) => Self::from_toml(&config),
            None => {
                debug!("Using default display configuration");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            return Err(DisplayError::Config("server_url must not be empty".to_string()));
        }
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(DisplayError::Config(format!(
                "server_url must be an http(s) URL, got {}",
                self.server_url
            )));
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(DisplayError::Config(format!(
                "poll_interval_ms must be between 1 and {}",
                MAX_POLL_INTERVAL_MS
            )));
        }
        if self.dwell_secs == 0 || self.dwell_secs > MAX_DWELL.as_secs() {
            return Err(DisplayError::Config(format!(
                "dwell_secs must be between 1 and {}",
                MAX_DWELL.as_secs()
            )));
        }
        if self.poll_interval_ms >= self.dwell_secs * 1000 {
            return Err(DisplayError::Config(
                "poll_interval_ms must be shorter than the dwell".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 || self.request_timeout_ms > MAX_REQUEST_TIMEOUT_MS {
            return Err(DisplayError::Config(format!(
                "request_timeout_ms must be between 1 and {}",
                MAX_REQUEST_TIMEOUT_MS
            )));
        }
        Ok(())
    }

    pub fn timing(&self) -> DisplayTiming {
        DisplayTiming {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            dwell: Duration::from_secs(self.dwell_secs),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = DisplayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timing(), DisplayTiming::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn test_missing_table_uses_defaults() {
        let value: toml::Value = toml::from_str("root_folder = \"/tmp/x\"").unwrap();
        assert_eq!(DisplayConfig::from_toml(&value).unwrap(), DisplayConfig::default());
    }

    #[test]
    fn test_partial_table_keeps_other_defaults() {
        let value: toml::Value = toml::from_str(
            "[display]\nserver_url = \"http://scanner.local:10246\"\ndwell_secs = 5\n",
        )
        .unwrap();
        let config = DisplayConfig::from_toml(&value).unwrap();
        assert_eq!(config.server_url, "http://scanner.local:10246");
        assert_eq!(config.dwell_secs, 5);
        assert_eq!(config.poll_interval_ms, 300);
    }

    #[test]
    fn test_wrong_type_is_config_error() {
        let value: toml::Value = toml::from_str("[display]\ndwell_secs = \"long\"\n").unwrap();
        assert!(matches!(
            DisplayConfig::from_toml(&value),
            Err(DisplayError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = DisplayConfig::default();
        config.poll_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = DisplayConfig::default();
        config.server_url = "ftp://nope".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_dwell_and_cadence() {
        let mut config = DisplayConfig::default();
        config.dwell_secs = u64::MAX;
        assert!(matches!(config.validate(), Err(DisplayError::Config(_))));

        let mut config = DisplayConfig::default();
        config.poll_interval_ms = u64::MAX;
        assert!(config.validate().is_err());

        // Cadence must be shorter than the dwell
        let mut config = DisplayConfig::default();
        config.dwell_secs = 2;
        config.poll_interval_ms = 2_000;
        assert!(config.validate().is_err());
        config.poll_interval_ms = 1_999;
        assert!(config.validate().is_ok());

        let mut config = DisplayConfig::default();
        config.request_timeout_ms = u64::MAX;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[display]\nport = 6000").unwrap();

        let config = DisplayConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 6000);
    }
}
