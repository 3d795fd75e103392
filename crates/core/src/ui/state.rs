//! UI event definitions.
//!
//! Background work reports back to the UI thread through these events. Loads
//! carry the ticket they were issued under so the session can drop stale
//! completions.

use crate::error::Result;
use crate::session::LoadTicket;
use image::{DynamicImage, RgbaImage};

/// Events received from background tasks.
///
/// These events are sent through a channel from the worker threads to the UI
/// thread, one event per finished task.
pub(crate) enum BackgroundEvent {
    /// An image load finished (successfully or not).
    ImageLoaded {
        ticket: LoadTicket,
        result: Result<DynamicImage>,
    },
    /// A caption request finished.
    Captions(Result<Vec<String>>),
    /// A gallery preview was fetched and downscaled.
    Thumbnail {
        index: usize,
        result: Result<RgbaImage>,
    },
}

/// Which side panel widget produced the current image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum ActiveSource {
    #[default]
    None,
    File,
    Url,
    Gallery(usize),
}
