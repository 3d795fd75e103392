//! Surface preparation, compositing and encoding.
//!
//! This module turns a decoded image into the fitted base surface, and turns
//! the base surface plus the current selection into the flattened PNG that is
//! sent to the caption service.
//!
//! # Determinism
//!
//! The PNG encoder is always configured with the same compression and filter
//! settings, so identical pixels and an identical rectangle give identical
//! bytes.

use crate::error::{AppError, Result};
use crate::geometry::DisplayGeometry;
use crate::rendering::{stroke_rect, StrokeStyle};
use crate::selection::SelectionRect;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};

/// Prefix of the data URI carried in the caption request.
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Image processing utilities for the selection workflow.
pub struct ImageProcessor;

impl ImageProcessor {
    /// Scales a decoded image to the fitted buffer dimensions.
    ///
    /// Images that already match the geometry are only converted to RGBA.
    pub fn prepare_base_surface(image: &DynamicImage, geometry: &DisplayGeometry) -> RgbaImage {
        let rgba = image.to_rgba8();
        if rgba.dimensions() == (geometry.width, geometry.height) {
            return rgba;
        }
        imageops::resize(&rgba, geometry.width, geometry.height, FilterType::Triangle)
    }

    /// Downscales `image` to fit in a `max_side` square, keeping its aspect
    /// ratio. Smaller images are returned at their own size.
    pub fn thumbnail(image: &DynamicImage, max_side: u32) -> RgbaImage {
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width <= max_side && height <= max_side {
            return rgba;
        }
        let scale = f64::from(max_side) / f64::from(width.max(height));
        let thumb_width = ((f64::from(width) * scale).round() as u32).max(1);
        let thumb_height = ((f64::from(height) * scale).round() as u32).max(1);
        imageops::thumbnail(&rgba, thumb_width, thumb_height)
    }

    /// A transparent overlay co-registered with a base surface of `geometry`.
    pub fn blank_overlay(geometry: &DisplayGeometry) -> RgbaImage {
        RgbaImage::new(geometry.width, geometry.height)
    }

    /// Flattens the base surface and the selection marker into a PNG.
    ///
    /// The base is copied verbatim; when `has_selection` is set the
    /// normalized rectangle is stroked on top at submission width.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ImageProcessing`] if PNG encoding fails.
    pub fn compose(base: &RgbaImage, rect: &SelectionRect, has_selection: bool) -> Result<Vec<u8>> {
        let mut output = base.clone();
        if has_selection {
            stroke_rect(&mut output, rect.normalized(), StrokeStyle::SUBMISSION);
        }
        Self::encode_png(&output)
    }

    /// Encodes an RGBA buffer as PNG with fixed encoder settings.
    pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
        let mut buffer: Vec<u8> = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut buffer, CompressionType::Default, PngFilter::Adaptive);
        encoder
            .write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                ExtendedColorType::Rgba8,
            )
            .map_err(|e| AppError::image(format!("Failed to encode PNG: {}", e)))?;
        Ok(buffer)
    }

    /// Wraps PNG bytes as `data:image/png;base64,...`.
    pub fn to_data_uri(png: &[u8]) -> String {
        let mut uri = String::with_capacity(PNG_DATA_URI_PREFIX.len() + png.len() * 4 / 3 + 4);
        uri.push_str(PNG_DATA_URI_PREFIX);
        BASE64.encode_string(png, &mut uri);
        uri
    }
}
