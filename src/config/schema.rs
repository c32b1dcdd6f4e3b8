//! TOML configuration schema types.
//!
//! All structs derive `Deserialize` and `Serialize` with defaults via
//! `#[serde(default)]`, so a partial or empty file is valid.
//!
//! Duration fields use human-readable strings (e.g. `"1s"`, `"10m"`) parsed
//! by the `humantime` crate through the accessor methods.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration encompassing all sections.
///
/// ```toml
/// [polling]
/// [tracking]
/// [logging]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Refresh cadences of the status pollers.
    pub polling: PollingConfig,
    /// Session defaults.
    pub tracking: TrackingConfig,
    /// Log verbosity.
    pub logging: LoggingConfig,
}

impl Config {
    /// Checks every duration field, returning the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.polling.status_interval()?;
        self.polling.daily_total_interval()?;
        self.polling.screenshot_count_interval()?;
        self.tracking.screenshot_interval()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

/// Poller cadences from the `[polling]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PollingConfig {
    /// Remote session status refresh (default: `"1s"`).
    pub status_interval: String,
    /// Today's completed duration refresh (default: `"5s"`).
    pub daily_total_interval: String,
    /// Local screenshot count refresh (default: `"3s"`).
    pub screenshot_count_interval: String,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            status_interval: "1s".to_string(),
            daily_total_interval: "5s".to_string(),
            screenshot_count_interval: "3s".to_string(),
        }
    }
}

impl PollingConfig {
    /// Parsed `status_interval`.
    pub fn status_interval(&self) -> Result<Duration, ConfigError> {
        parse_interval("polling.status_interval", &self.status_interval)
    }

    /// Parsed `daily_total_interval`.
    pub fn daily_total_interval(&self) -> Result<Duration, ConfigError> {
        parse_interval("polling.daily_total_interval", &self.daily_total_interval)
    }

    /// Parsed `screenshot_count_interval`.
    pub fn screenshot_count_interval(&self) -> Result<Duration, ConfigError> {
        parse_interval(
            "polling.screenshot_count_interval",
            &self.screenshot_count_interval,
        )
    }
}

// ---------------------------------------------------------------------------
// Tracking
// ---------------------------------------------------------------------------

/// Session defaults from the `[tracking]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TrackingConfig {
    /// Capture cadence served by the in-memory config service (default: `"10m"`).
    pub screenshot_interval: String,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            screenshot_interval: "10m".to_string(),
        }
    }
}

impl TrackingConfig {
    /// Parsed `screenshot_interval`.
    pub fn screenshot_interval(&self) -> Result<Duration, ConfigError> {
        parse_interval("tracking.screenshot_interval", &self.screenshot_interval)
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Logging settings from the `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Verbosity used when `WORKTRACK_LOG` is unset.
    pub level: LogLevel,
}

/// Log verbosity levels (kebab-case in TOML).
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Informational messages (default).
    #[default]
    Info,
    /// Debug-level detail.
    Debug,
    /// Full trace output.
    Trace,
}

impl LogLevel {
    /// Directive string understood by `EnvFilter`.
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn parse_interval(field: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let duration =
        humantime::parse_duration(value.trim()).map_err(|e| ConfigError::InvalidDuration {
            field,
            value: value.to_string(),
            message: e.to_string(),
        })?;
    if duration.is_zero() {
        return Err(ConfigError::InvalidDuration {
            field,
            value: value.to_string(),
            message: "interval must be greater than zero".to_string(),
        });
    }
    Ok(duration)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
