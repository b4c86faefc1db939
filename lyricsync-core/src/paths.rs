//! Path constants for configuration and the lyrics store.

use std::path::PathBuf;

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "lyricsync";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the lyrics store database file
pub const LYRICS_STORE_DB_FILE_NAME: &str = "lyrics.db";

/// Get the configuration directory path (~/.config/lyricsync/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/lyricsync/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the lyrics store database path (`~/.config/lyricsync/lyrics.db`)
#[must_use]
pub fn lyrics_store_db_path() -> PathBuf {
    config_dir().join(LYRICS_STORE_DB_FILE_NAME)
}
