//! Default configuration template and file creation.
//!
//! Provides a commented TOML template that matches `Config::default()` and
//! writes it to the XDG config path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::error::ConfigError;
use crate::config::xdg;

/// A commented TOML template with all default values.
///
/// Every value here must match `Config::default()` from `schema.rs`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Worktrack Configuration
#
# This file was generated with default values.
# All values shown below are the built-in defaults.
#
# Location: $XDG_CONFIG_HOME/worktrack/config.toml

# ==============================================================================
# Polling
# ==============================================================================

[polling]

# How often the remote session status is re-queried.
# Examples: "1s", "500ms", "2s"
status_interval = "1s"

# How often today's completed duration is refreshed.
# Examples: "5s", "30s"
daily_total_interval = "5s"

# How often screenshots captured on this device today are counted.
# Examples: "3s", "10s"
screenshot_count_interval = "3s"

# ==============================================================================
# Tracking
# ==============================================================================

[tracking]

# Capture cadence reported by the in-memory config service.
# Used to estimate the screenshot count while a session runs.
screenshot_interval = "10m"

# ==============================================================================
# Logging
# ==============================================================================

[logging]

# Verbosity when WORKTRACK_LOG is not set.
# Options: "error", "warn", "info", "debug", "trace"
level = "info"
"#;

/// Creates (or force-overwrites) the default config file.
///
/// - If the file exists and `force` is `false`, returns `ConfigError::AlreadyExists`.
/// - If the file exists and `force` is `true`, backs it up to `.toml.backup` first.
/// - Returns the path where the config was written.
pub fn create_default_config(force: bool) -> Result<PathBuf, ConfigError> {
    let path = xdg::config_path();

    if path.exists() {
        if !force {
            return Err(ConfigError::AlreadyExists { path });
        }
        let backup_path = path.with_extension("toml.backup");
        fs::rename(&path, &backup_path).map_err(|e| ConfigError::WriteError {
            path: backup_path.clone(),
            source: e,
        })?;
        tracing::info!("Backed up existing config to {}", backup_path.display());
    }

    write_default_config(&path)?;
    tracing::info!("Wrote default configuration to {}", path.display());
    Ok(path)
}

/// Writes the template to `path`, creating parent dirs and setting 0600 permissions.
fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    xdg::ensure_config_dir().map_err(write_err)?;
    fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(write_err)?;
    }

    Ok(())
}
