//! Logging initialization.
//!
//! Configures the `tracing` subscriber with level filtering via the
//! `WORKTRACK_LOG` environment variable. Falls back to the configured
//! `[logging] level` when the variable is unset or invalid.
//!
//! ```bash
//! # Debug level
//! WORKTRACK_LOG=debug worktrack run
//!
//! # Module-specific filtering
//! WORKTRACK_LOG=worktrack::engine=debug,warn worktrack run
//! ```

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::schema::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV_VAR: &str = "WORKTRACK_LOG";

/// Builds the filter from `WORKTRACK_LOG`, or `fallback` when unset or invalid.
pub fn env_filter(fallback: LogLevel) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(fallback.as_str()))
}

/// Initialize the tracing subscriber.
///
/// Output is written to stderr so it never interleaves with the console's
/// stdout.
///
/// # Panics
///
/// Panics if a global subscriber has already been set (should only be
/// called once, at startup).
pub fn init(fallback: LogLevel) {
    fmt()
        .with_env_filter(env_filter(fallback))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
