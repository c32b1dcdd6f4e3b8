//! Where worktrack keeps its `config.toml`.
//!
//! `XDG_CONFIG_HOME` wins on every platform. Without it the file lives in
//! `~/.config/worktrack` on Linux and in the system application support
//! folder on macOS.

use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "worktrack";
const CONFIG_FILE: &str = "config.toml";

/// Directory holding worktrack's settings.
pub fn config_dir() -> PathBuf {
    xdg_config_home()
        .unwrap_or_else(platform_config_dir)
        .join(APP_NAME)
}

fn xdg_config_home() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from)
}

/// Base directory used when `XDG_CONFIG_HOME` is unset. A missing home
/// directory yields the relative `.config`.
fn platform_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    let base = dirs::config_dir();
    #[cfg(not(target_os = "macos"))]
    let base = dirs::home_dir().map(|home| home.join(".config"));
    base.unwrap_or_else(|| PathBuf::from(".config"))
}

/// Full path of the settings file read by `run` and written by `config init`.
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

/// `mkdir -p` that leaves the leaf readable by the owner only.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    fs::create_dir_all(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

pub fn ensure_config_dir() -> std::io::Result<PathBuf> {
    let dir = config_dir();
    ensure_dir(&dir)?;
    Ok(dir)
}
