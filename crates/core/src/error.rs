//! Error types for the region-caption-core library.
//!
//! This module provides granular error variants for the failure modes of the
//! load → select → compose → caption workflow, so callers can turn each one
//! into the right status message.

use thiserror::Error;

/// Errors that can occur within the region-caption-core library.
///
/// Each variant represents a specific failure mode with contextual information
/// to help diagnose and handle errors appropriately.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (invalid values or URLs).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading or decoding an image failed.
    #[error("Failed to load image: {0}")]
    ImageLoad(String),

    /// The image (or the fit bounds) has a zero dimension.
    #[error("Image has degenerate dimensions {width}x{height}")]
    DegenerateImage { width: u32, height: u32 },

    /// Compositing or encoding failed.
    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    /// Transport-level failure talking to a remote host.
    #[error("Network error: {0}")]
    Network(String),

    /// The caption service answered with a non-success status.
    #[error("{0}")]
    CaptionService(String),

    /// The caption service answered 2xx but the body was not understood.
    #[error("Malformed caption response: {0}")]
    MalformedResponse(String),

    /// UI-related errors (rendering, window management).
    #[error("UI error: {0}")]
    Ui(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an image load error with the given message.
    pub fn load(msg: impl Into<String>) -> Self {
        Self::ImageLoad(msg.into())
    }

    /// Creates an image processing error with the given message.
    pub fn image(msg: impl Into<String>) -> Self {
        Self::ImageProcessing(msg.into())
    }

    /// Creates a network error with the given message.
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a UI error with the given message.
    pub fn ui(msg: impl Into<String>) -> Self {
        Self::Ui(msg.into())
    }
}

/// A convenient alias for Result with [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
