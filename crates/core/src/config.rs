//! Configuration loading.
//!
//! Values come from the process environment (with `.env` support) and can be
//! overridden programmatically through [`ConfigBuilder`].
//!
//! | Variable | Default |
//! |---|---|
//! | `CAPTION_ENDPOINT` | `http://127.0.0.1:5000/caption` |
//! | `CAPTION_TIMEOUT_SECS` | `60` |
//! | `CAPTION_MAX_WIDTH` / `CAPTION_MAX_HEIGHT` | `900` / `600` |
//! | `CAPTION_GALLERY` | built-in gallery; empty string disables it |

use crate::caption::CaptionFormat;
use crate::error::{AppError, Result};
use crate::geometry::{MAX_DISPLAY_HEIGHT, MAX_DISPLAY_WIDTH};
use crate::source::DEFAULT_GALLERY;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Default caption endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:5000/caption";

/// Default HTTP timeout for caption requests and remote image fetches.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct Config {
    pub endpoint: Url,
    pub request_timeout: Duration,
    pub max_width: u32,
    pub max_height: u32,
    /// Preset image URLs; may be empty.
    pub gallery: Vec<Url>,
    pub caption_format: CaptionFormat,
}

impl Config {
    /// Reads `.env` (if present) and the `CAPTION_*` environment variables.
    ///
    /// This is the only place the process environment is consulted.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists, ignore if it doesn't
        let _ = dotenv();

        let mut builder = Self::builder();

        if let Ok(endpoint) = env::var("CAPTION_ENDPOINT") {
            builder = builder.with_endpoint(endpoint);
        }
        if let Some(secs) = env_parse::<u64>("CAPTION_TIMEOUT_SECS")? {
            builder = builder.with_timeout(Duration::from_secs(secs));
        }
        let max_width = env_parse::<u32>("CAPTION_MAX_WIDTH")?.unwrap_or(MAX_DISPLAY_WIDTH);
        let max_height = env_parse::<u32>("CAPTION_MAX_HEIGHT")?.unwrap_or(MAX_DISPLAY_HEIGHT);
        builder = builder.with_max_size(max_width, max_height);

        if let Ok(list) = env::var("CAPTION_GALLERY") {
            builder = builder.with_gallery(split_url_list(&list));
        }

        builder.build()
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for [`Config`], starting from the defaults.
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    endpoint: String,
    timeout: Duration,
    max_width: u32,
    max_height: u32,
    gallery: Vec<String>,
    caption_format: CaptionFormat,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_width: MAX_DISPLAY_WIDTH,
            max_height: MAX_DISPLAY_HEIGHT,
            gallery: DEFAULT_GALLERY.iter().map(|s| s.to_string()).collect(),
            caption_format: CaptionFormat::default(),
        }
    }
}

impl From<Config> for ConfigBuilder {
    fn from(config: Config) -> Self {
        Self {
            endpoint: config.endpoint.to_string(),
            timeout: config.request_timeout,
            max_width: config.max_width,
            max_height: config.max_height,
            gallery: config.gallery.iter().map(Url::to_string).collect(),
            caption_format: config.caption_format,
        }
    }
}

impl ConfigBuilder {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_size(mut self, max_width: u32, max_height: u32) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self
    }

    pub fn with_gallery<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.gallery = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_caption_format(mut self, format: CaptionFormat) -> Self {
        self.caption_format = format;
        self
    }

    /// Validates and builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] for unparsable URLs or zero fit bounds.
    pub fn build(self) -> Result<Config> {
        let endpoint = Url::parse(&self.endpoint)
            .map_err(|e| AppError::config(format!("Invalid caption endpoint '{}': {}", self.endpoint, e)))?;

        if self.max_width == 0 || self.max_height == 0 {
            return Err(AppError::config(format!(
                "Display bounds must be positive, got {}x{}",
                self.max_width, self.max_height
            )));
        }

        let gallery = self
            .gallery
            .iter()
            .map(|raw| {
                Url::parse(raw)
                    .map_err(|e| AppError::config(format!("Invalid gallery URL '{}': {}", raw, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Config {
            endpoint,
            request_timeout: self.timeout,
            max_width: self.max_width,
            max_height: self.max_height,
            gallery,
            caption_format: self.caption_format,
        })
    }
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::config(format!("{} has invalid value '{}': {}", name, raw, e))),
        _ => Ok(None),
    }
}

fn split_url_list(list: &str) -> Vec<String> {
    list.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
