//! Session orchestration: the single owned value that every input handler
//! mutates.
//!
//! A [`Session`] holds the current image and its two co-registered surfaces
//! (base and overlay), the selection state machine, and the caption view
//! state. It does no I/O itself. Callers run image loads and caption requests
//! wherever they like and report completions back:
//!
//! ```text
//! issue_load() -> LoadTicket ... complete_load(ticket, result)
//! begin_submission() -> data URI ... finish_submission(result)
//! ```
//!
//! Load completions carry the ticket they were issued with; only the most
//! recently issued ticket can change the current image.

use crate::caption::{CaptionFormat, CaptionResult};
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::geometry::{fit, CoordinateMapper, DisplayGeometry, DisplayRect, Point};
use crate::image_processing::ImageProcessor;
use crate::rendering::render_overlay;
use crate::selection::SelectionState;
use image::{DynamicImage, RgbaImage};
use std::fmt;
use tracing::{debug, info, warn};

/// Identifies one image load request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

/// What happened to a completed load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The image became current.
    Applied,
    /// A newer load was issued in the meantime; the result was dropped.
    Stale,
    /// The load failed; the previous image (if any) stays current.
    Failed,
}

/// User-facing status line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Ready,
    Loading,
    LoadFailed(String),
    Processing,
    NoCaptions,
    Failed(String),
}

impl Status {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::LoadFailed(_) | Self::Failed(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => Ok(()),
            Self::Loading => write!(f, "Loading image…"),
            Self::LoadFailed(msg) => write!(f, "{}", msg),
            Self::Processing => write!(f, "Processing image…"),
            Self::NoCaptions => write!(f, "No captions returned."),
            Self::Failed(msg) => write!(f, "Error: {}", msg),
        }
    }
}

/// The current image with its fitted surfaces.
struct CurrentImage {
    natural: (u32, u32),
    geometry: DisplayGeometry,
    base: RgbaImage,
    overlay: RgbaImage,
}

pub struct Session {
    max_width: u32,
    max_height: u32,
    caption_format: CaptionFormat,

    image: Option<CurrentImage>,
    selection: SelectionState,

    captions: CaptionResult,
    status: Status,
    busy: bool,
    // Base revision the in-flight composite was made from.
    submitted_revision: Option<u64>,

    latest_ticket: u64,
    base_revision: u64,
    overlay_revision: u64,
}

impl Session {
    pub fn new(config: &Config) -> Self {
        Self {
            max_width: config.max_width,
            max_height: config.max_height,
            caption_format: config.caption_format.clone(),
            image: None,
            selection: SelectionState::new(),
            captions: CaptionResult::default(),
            status: Status::Ready,
            busy: false,
            submitted_revision: None,
            latest_ticket: 0,
            base_revision: 0,
            overlay_revision: 0,
        }
    }

    pub fn set_caption_format(&mut self, format: CaptionFormat) {
        self.caption_format = format;
    }

    // ------------------------------------------------------------------
    // Image loading
    // ------------------------------------------------------------------

    /// Registers a new load. Any earlier ticket becomes stale.
    pub fn issue_load(&mut self) -> LoadTicket {
        self.latest_ticket += 1;
        self.status = Status::Loading;
        LoadTicket(self.latest_ticket)
    }

    pub fn is_latest(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.latest_ticket
    }

    /// Applies the result of a load, unless a newer load has been issued.
    ///
    /// On failure the previous image and selection are kept and the error is
    /// shown in the status line.
    pub fn complete_load(&mut self, ticket: LoadTicket, result: Result<DynamicImage>) -> LoadOutcome {
        if !self.is_latest(ticket) {
            debug!(
                ticket = ticket.0,
                latest = self.latest_ticket,
                "discarding stale image load"
            );
            return LoadOutcome::Stale;
        }

        match result.and_then(|image| self.install_image(&image)) {
            Ok(()) => {
                self.status = Status::Ready;
                LoadOutcome::Applied
            }
            Err(e) => {
                warn!(error = %e, "image load failed");
                self.status = Status::LoadFailed(e.to_string());
                LoadOutcome::Failed
            }
        }
    }

    /// Makes `image` current immediately, bypassing ticketing.
    pub fn set_image(&mut self, image: &DynamicImage) -> Result<()> {
        let ticket = self.issue_load();
        match self.complete_load(ticket, Ok(image.clone())) {
            LoadOutcome::Applied => Ok(()),
            _ => Err(AppError::load(self.status.to_string())),
        }
    }

    fn install_image(&mut self, image: &DynamicImage) -> Result<()> {
        let geometry = fit(image.width(), image.height(), self.max_width, self.max_height)?;
        let base = ImageProcessor::prepare_base_surface(image, &geometry);
        let overlay = ImageProcessor::blank_overlay(&geometry);
        info!(
            natural_width = image.width(),
            natural_height = image.height(),
            width = geometry.width,
            height = geometry.height,
            scale = geometry.scale,
            "image installed"
        );

        self.image = Some(CurrentImage {
            natural: (image.width(), image.height()),
            geometry,
            base,
            overlay,
        });
        self.selection.reset();
        self.base_revision += 1;
        self.redraw_overlay();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------

    /// Starts a selection at a display-space position.
    pub fn pointer_down(&mut self, position: Point, display: DisplayRect) -> bool {
        let Some(point) = self.map_pointer(position, display) else {
            return false;
        };
        self.selection.begin(point);
        self.redraw_overlay();
        true
    }

    /// Extends the active drag to a display-space position.
    pub fn pointer_move(&mut self, position: Point, display: DisplayRect) -> bool {
        if !self.selection.is_dragging() {
            return false;
        }
        let Some(point) = self.map_pointer(position, display) else {
            return false;
        };
        self.selection.update(point);
        self.redraw_overlay();
        true
    }

    /// Commits the active drag.
    pub fn pointer_up(&mut self) -> bool {
        if !self.selection.is_dragging() {
            return false;
        }
        self.selection.end();
        true
    }

    pub fn clear_selection(&mut self) {
        if self.selection.has_selection() && !self.selection.is_dragging() {
            self.selection.clear();
            self.redraw_overlay();
        }
    }

    fn map_pointer(&self, position: Point, display: DisplayRect) -> Option<Point> {
        let image = self.image.as_ref()?;
        CoordinateMapper::new(display, image.geometry.buffer_size()).to_buffer_coords(position)
    }

    fn redraw_overlay(&mut self) {
        if let Some(image) = self.image.as_mut() {
            render_overlay(
                &mut image.overlay,
                &self.selection.rect(),
                self.selection.has_selection(),
            );
            self.overlay_revision += 1;
        }
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Flattens the base surface and the current selection into a PNG.
    ///
    /// Returns `Ok(None)` when no image is loaded.
    pub fn composite_png(&self) -> Result<Option<Vec<u8>>> {
        let Some(image) = self.image.as_ref() else {
            return Ok(None);
        };
        ImageProcessor::compose(
            &image.base,
            &self.selection.rect(),
            self.selection.has_selection(),
        )
        .map(Some)
    }

    /// Starts a submission and returns the composite as a PNG data URI.
    ///
    /// Does nothing (returns `None`) when no image is loaded or a request is
    /// already in flight. Previous captions are cleared right away.
    pub fn begin_submission(&mut self) -> Option<String> {
        if !self.can_submit() {
            return None;
        }

        self.captions = CaptionResult::default();
        match self.composite_png() {
            Ok(Some(png)) => {
                self.busy = true;
                self.submitted_revision = Some(self.base_revision);
                self.status = Status::Processing;
                info!(bytes = png.len(), "composite ready for submission");
                Some(ImageProcessor::to_data_uri(&png))
            }
            Ok(None) => None,
            Err(e) => {
                self.status = Status::Failed(e.to_string());
                None
            }
        }
    }

    /// Applies the outcome of a caption request.
    ///
    /// If a different image was loaded while the request was in flight, the
    /// result describes an image that is no longer shown and is dropped.
    pub fn finish_submission(&mut self, result: Result<Vec<String>>) {
        self.busy = false;
        if self.submitted_revision.take() != Some(self.base_revision) {
            debug!("discarding captions for a replaced image");
            if self.status == Status::Processing {
                self.status = Status::Ready;
            }
            return;
        }
        match result {
            Ok(captions) => {
                self.captions =
                    CaptionResult::from_captions(self.caption_format.apply_all(captions));
                self.status = if self.captions.is_empty() {
                    Status::NoCaptions
                } else {
                    Status::Ready
                };
            }
            Err(e) => {
                self.captions = CaptionResult::default();
                self.status = Status::Failed(e.to_string());
            }
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn can_submit(&self) -> bool {
        self.has_image() && !self.busy
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn geometry(&self) -> Option<DisplayGeometry> {
        self.image.as_ref().map(|i| i.geometry)
    }

    pub fn natural_size(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|i| i.natural)
    }

    pub fn base_surface(&self) -> Option<&RgbaImage> {
        self.image.as_ref().map(|i| &i.base)
    }

    pub fn overlay_surface(&self) -> Option<&RgbaImage> {
        self.image.as_ref().map(|i| &i.overlay)
    }

    /// Bumped whenever the base surface is replaced.
    pub fn base_revision(&self) -> u64 {
        self.base_revision
    }

    /// Bumped whenever the overlay surface is redrawn.
    pub fn overlay_revision(&self) -> u64 {
        self.overlay_revision
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn captions(&self) -> &CaptionResult {
        &self.captions
    }

    pub fn status(&self) -> &Status {
        &self.status
    }
}
