//! Path constants for configuration and log files.

use std::path::PathBuf;

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "melodytube";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the log file written when file logging is enabled
pub const LOG_FILE_NAME: &str = "melodytube.log";

/// Get the configuration directory path (~/.config/melodytube/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/melodytube/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the log file path inside the platform cache directory.
///
/// Falls back to the config directory when no cache directory is known.
#[must_use]
pub fn log_file_path() -> PathBuf {
    dirs::cache_dir()
        .map_or_else(config_dir, |dir| dir.join(CONFIG_DIR_NAME))
        .join(LOG_FILE_NAME)
}
