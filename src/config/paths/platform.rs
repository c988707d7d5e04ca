//! Platform directory utilities for preference files.
//!
//! These are consulted by calling code when it picks a store path; the store
//! itself never resolves paths.

use crate::error::{PrefsError, PrefsResult};
use std::path::PathBuf;

/// Environment variable that overrides the preference directory.
pub const HOME_ENV: &str = "PREFSTORE_HOME";

/// File name of the default store inside the preference directory.
pub const DEFAULT_FILE_NAME: &str = "preferences.json";

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "prefstore")
}

/// Get the preference directory
///
/// Returns `$PREFSTORE_HOME` if set, otherwise the platform config directory
/// (`$XDG_CONFIG_HOME/prefstore` on Linux, `~/Library/Application Support/prefstore`
/// on macOS, `%APPDATA%\prefstore\config` on Windows).
pub fn preferences_dir() -> PrefsResult<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        if !home.trim().is_empty() {
            return Ok(PathBuf::from(home));
        }
    }

    project_dirs()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| {
            PrefsError::Config(
                "Could not determine platform config directory (HOME not set)".to_string(),
            )
        })
}

/// Path of the default preference file.
pub fn default_store_path() -> PrefsResult<PathBuf> {
    Ok(preferences_dir()?.join(DEFAULT_FILE_NAME))
}

/// Path of the optional global `config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}
