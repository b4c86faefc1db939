use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub lyrics: LyricsConfig,
    #[serde(default)]
    pub preferences: PreferencesConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricsConfig {
    /// Provider priority: providers are tried in order
    #[serde(default = "default_providers")]
    pub providers: Vec<LyricsProviderType>,
    /// Persist fetched lyrics to the local store
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_days: u32,
    /// How often the current line is re-evaluated
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Prepend an empty "before the first line" entry to synced lyrics
    #[serde(default = "default_true")]
    pub head_entry: bool,
}

fn default_providers() -> Vec<LyricsProviderType> {
    vec![LyricsProviderType::Lrclib]
}

const fn default_true() -> bool {
    true
}

const fn default_cache_ttl() -> u32 {
    30
}

const fn default_poll_interval() -> u64 {
    50
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            cache_enabled: true,
            cache_ttl_days: default_cache_ttl(),
            poll_interval_ms: default_poll_interval(),
            head_entry: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LyricsProviderType {
    Lrclib,
}

/// User-facing lyrics preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesConfig {
    #[serde(default)]
    pub text_alignment: TextAlignment,
    /// Selecting a line seeks playback to it
    #[serde(default = "default_true")]
    pub click_to_seek: bool,
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            text_alignment: TextAlignment::default(),
            click_to_seek: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TextAlignment {
    Left,
    #[default]
    Center,
    Right,
}

impl TextAlignment {
    /// Lay `text` out in a column `width` characters wide. Trailing padding is
    /// dropped and text wider than the column is returned unchanged.
    #[must_use]
    pub fn align(self, text: &str, width: usize) -> String {
        let aligned = match self {
            Self::Left => return text.to_string(),
            Self::Center => format!("{text:^width$}"),
            Self::Right => format!("{text:>width$}"),
        };
        aligned.trim_end().to_string()
    }
}

impl Config {
    /// Get the configuration directory path (~/.config/lyricsync/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/lyricsync/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default path, writing a template on first run
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, written or parsed,
    /// or if it fails validation.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Load config from `path`, writing a template there if it is missing
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, written or parsed,
    /// or if it fails validation.
    pub fn load_or_create_at(path: &Path) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(path, CONFIG_TEMPLATE)?;
            info!("Wrote config template to {:?}", path);
        }

        Self::load_from(path)
    }

    /// Load config from an existing file
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, cannot be parsed, or fails
    /// validation.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate config text
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde defaults cannot guard
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.lyrics.poll_interval_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "lyrics.poll_interval_ms must be greater than 0".to_string(),
            });
        }
        if self.lyrics.providers.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "lyrics.providers must list at least one provider".to_string(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.lyrics.poll_interval_ms)
    }
}

const CONFIG_TEMPLATE: &str = r#"# Lyricsync Configuration
# ~/.config/lyricsync/config.toml

[lyrics]
# Provider priority: providers are tried in order; first synced result wins
providers = ["lrclib"]
# Keep fetched lyrics (and "not found" results) in the local database
cache_enabled = true
cache_ttl_days = 30
# How often the active line is re-evaluated while lyrics are visible
poll_interval_ms = 50
# Add an empty line before the first synced line
head_entry = true

[preferences]
text_alignment = "center"  # "left", "center", "right"
# Selecting a line seeks playback to it
click_to_seek = true
"#;
