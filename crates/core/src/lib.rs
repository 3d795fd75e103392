//! Region Caption Core Library
//!
//! This library provides the core functionality for the region-caption tool:
//! load an image, draw a box around a region of interest, and ask a remote
//! captioning service to describe the marked image.
//!
//! # Overview
//!
//! - **Geometry**: contain-fit sizing and display → buffer mapping via [`geometry`]
//! - **Selection**: the drag state machine in [`selection`]
//! - **Rendering**: overlay and marker rasterization via [`rendering`]
//! - **Compositing**: flattening and PNG/data-URI encoding via [`image_processing`]
//! - **Sources**: local files, URLs and the preset gallery via [`source`]
//! - **Captioning**: the HTTP contract of the caption service via [`caption`]
//! - **Session**: the owned state every input handler mutates, via [`session`]
//! - **User Interface**: the interactive window via [`ui`]
//!
//! # Quick Start
//!
//! ```ignore
//! use region_caption_core::{RegionCaption, ImageSource};
//!
//! let app = RegionCaption::new()?;
//! let mut session = app.session();
//! session.set_image(&app.load(&ImageSource::Gallery(0)).await?)?;
//! if let Some(data_uri) = session.begin_submission() {
//!     let result = app.caption(&data_uri).await;
//!     session.finish_submission(result);
//! }
//! println!("{:?}", session.captions().primary);
//! ```

pub mod caption;
pub mod config;
pub mod error;
pub mod geometry;
pub mod image_processing;
pub mod rendering;
pub mod selection;
pub mod session;
pub mod source;
pub mod ui;

// Re-export primary types for convenience
pub use caption::{CaptionClient, CaptionFormat, CaptionResult};
pub use config::{Config, ConfigBuilder};
pub use error::{AppError, Result};
pub use geometry::{DisplayGeometry, DisplayRect, Point};
pub use session::{LoadOutcome, LoadTicket, Session, Status};
pub use source::{ImageLoader, ImageSource};

use image::DynamicImage;

/// Main entry point for the region-caption application.
///
/// This struct provides a facade over the loader and the caption client,
/// both built from one [`Config`].
pub struct RegionCaption {
    config: Config,
    loader: ImageLoader,
    client: CaptionClient,
}

impl RegionCaption {
    /// Creates a new instance from environment configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or an HTTP client
    /// cannot be created.
    pub fn new() -> Result<Self> {
        Self::with_config(Config::load()?)
    }

    /// Creates an instance with custom configuration.
    pub fn with_config(config: Config) -> Result<Self> {
        let loader = ImageLoader::new(&config)?;
        let client = CaptionClient::new(&config)?;
        Ok(Self {
            config,
            loader,
            client,
        })
    }

    /// A fresh session using this instance's fit bounds and caption format.
    pub fn session(&self) -> Session {
        Session::new(&self.config)
    }

    /// The preset gallery URLs.
    pub fn gallery(&self) -> &[url::Url] {
        self.loader.gallery()
    }

    /// Loads and decodes an image from any source.
    pub async fn load(&self, source: &ImageSource) -> Result<DynamicImage> {
        self.loader.load(source).await
    }

    /// Sends a composite data URI to the caption service.
    pub async fn caption(&self, image_data: &str) -> Result<Vec<String>> {
        self.client.caption(image_data).await
    }

    /// Opens the interactive window, optionally starting with `initial`.
    pub fn run_interactive(&self, initial: Option<ImageSource>) -> Result<()> {
        ui::run_caption_ui(self.config.clone(), initial)
    }

    /// Returns a reference to the current configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
