//! User settings persistence.
//!
//! This module handles loading and saving user preferences: the caption
//! endpoint override, caption formatting, and the last URL typed.

use crate::caption::CaptionFormat;
use crate::config::{Config, ConfigBuilder};
use crate::error::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// User-configurable settings persisted between sessions.
///
/// Settings are stored as JSON in the user's config directory
/// (e.g., `~/.config/region-caption/settings.json` on Linux).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Caption endpoint override (takes precedence over environment).
    #[serde(default)]
    pub endpoint: String,
    /// Rewrite `" - "` separators in captions as `", "`.
    #[serde(default)]
    pub dash_to_comma: bool,
    /// Truncate captions to this many words.
    #[serde(default)]
    pub max_words: Option<usize>,
    /// Last URL entered in the URL field.
    #[serde(default)]
    pub last_url: String,
}

impl Settings {
    /// Returns the path to the settings file.
    ///
    /// Creates the config directory if it doesn't exist.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "region-caption").map(|dirs| {
            let config_dir = dirs.config_dir();
            if !config_dir.exists() {
                let _ = fs::create_dir_all(config_dir);
            }
            config_dir.join("settings.json")
        })
    }

    /// Loads settings from disk, falling back to defaults if not found or
    /// unreadable.
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| fs::read_to_string(&path).ok())
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    /// Persists settings to disk.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save(&self) -> Result<()> {
        if let Some(path) = Self::config_path() {
            let json = serde_json::to_string_pretty(self)?;
            fs::write(path, json)?;
        }
        Ok(())
    }

    /// The caption formatting these settings ask for.
    pub fn caption_format(&self) -> CaptionFormat {
        let base = if self.dash_to_comma {
            CaptionFormat::dash_to_comma()
        } else {
            CaptionFormat::default()
        };
        base.with_max_words(self.max_words.filter(|n| *n > 0))
    }

    /// Layers these settings over `config`.
    pub fn apply_to(&self, config: &Config) -> Result<Config> {
        let mut builder = ConfigBuilder::from(config.clone()).with_caption_format(self.caption_format());
        if !self.endpoint.trim().is_empty() {
            builder = builder.with_endpoint(self.endpoint.trim());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_leave_config_untouched() {
        let config = Config::builder().build().unwrap();
        let applied = Settings::default().apply_to(&config).unwrap();
        assert_eq!(applied.endpoint, config.endpoint);
        assert_eq!(applied.caption_format, CaptionFormat::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::builder().build().unwrap();
        let settings = Settings {
            endpoint: " http://10.0.0.2:5000/caption ".into(),
            dash_to_comma: true,
            max_words: Some(6),
            last_url: String::new(),
        };
        let applied = settings.apply_to(&config).unwrap();
        assert_eq!(applied.endpoint.as_str(), "http://10.0.0.2:5000/caption");
        assert_eq!(applied.caption_format, CaptionFormat::dash_to_comma().with_max_words(Some(6)));
    }

    #[test]
    fn zero_word_limit_means_unlimited() {
        let settings = Settings {
            max_words: Some(0),
            ..Settings::default()
        };
        assert_eq!(settings.caption_format().max_words, None);
    }

    #[test]
    fn older_settings_files_still_parse() {
        let parsed: Settings = serde_json::from_str(r#"{"endpoint":"http://x/caption"}"#).unwrap();
        assert_eq!(parsed.endpoint, "http://x/caption");
        assert!(!parsed.dash_to_comma);
    }
}
