//! User interface components for region-caption.
//!
//! This module provides the interactive window: pick an image, drag a box
//! over it, and send the marked image to the caption service.
//!
//! # Architecture
//!
//! The UI is split into focused submodules:
//! - [`state`]: Background event definitions
//! - [`settings`]: User preferences and persistence
//! - [`rendering`]: Texture mirroring and layout helpers
//! - [`selection`]: Pointer handling
//! - [`caption_tool`]: Main application logic
//!
//! All selection and caption state lives in a [`Session`](crate::session::Session);
//! the UI only forwards input and paints.
//!
//! # Usage
//!
//! ```ignore
//! use region_caption_core::{ui, Config, ImageSource};
//!
//! let config = Config::load()?;
//! ui::run_caption_ui(config, Some(ImageSource::Gallery(0)))?;
//! ```

mod caption_tool;
mod rendering;
mod selection;
mod settings;
mod state;

// Public API exports
pub use caption_tool::CaptionTool;
pub use selection::SelectionEvent;
pub use settings::Settings;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::source::ImageSource;
use eframe::egui;
use state::ActiveSource;

/// Launches the caption window and blocks until it is closed.
///
/// # Arguments
/// * `config` - Application configuration
/// * `initial` - Optional image to start loading as soon as the window opens
///
/// # Errors
/// Returns [`AppError::Ui`] if the window cannot be created.
pub fn run_caption_ui(config: Config, initial: Option<ImageSource>) -> Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Region Caption")
            .with_inner_size([1280.0, 880.0])
            .with_min_inner_size([640.0, 480.0])
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "Region Caption",
        options,
        Box::new(move |cc| {
            let mut tool = CaptionTool::new(config);
            if let Some(source) = initial {
                let active = match &source {
                    ImageSource::File(_) => ActiveSource::File,
                    ImageSource::Url(_) => ActiveSource::Url,
                    ImageSource::Gallery(index) => ActiveSource::Gallery(*index),
                };
                tool.start_load(&cc.egui_ctx, source, active);
            }
            Ok(Box::new(tool) as Box<dyn eframe::App>)
        }),
    )
    .map_err(|e| AppError::ui(format!("Failed to run UI: {}", e)))
}
