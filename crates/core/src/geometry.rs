//! Display fitting and coordinate mapping.
//!
//! Two coordinate spaces are in play:
//!
//! - **Display space**: where the pointer lives. The surface may be painted at
//!   any on-screen size (window resizes, HiDPI scaling).
//! - **Buffer space**: pixels of the fixed-resolution base and overlay surfaces,
//!   sized once per image by [`fit`].
//!
//! Selection rectangles are always stored in buffer space.

use crate::error::{AppError, Result};

/// Default maximum buffer width for a fitted image.
pub const MAX_DISPLAY_WIDTH: u32 = 900;
/// Default maximum buffer height for a fitted image.
pub const MAX_DISPLAY_HEIGHT: u32 = 600;

/// Buffer dimensions derived from an image's natural size.
///
/// Recomputed whenever the current image changes. The base surface and the
/// overlay surface are both allocated at exactly `width` x `height`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayGeometry {
    /// Contain-fit scale factor, in `(0, 1]`.
    pub scale: f64,
    /// Buffer width in pixels.
    pub width: u32,
    /// Buffer height in pixels.
    pub height: u32,
}

impl DisplayGeometry {
    /// The buffer dimensions as a [`BufferSize`].
    pub fn buffer_size(&self) -> BufferSize {
        BufferSize {
            width: self.width,
            height: self.height,
        }
    }
}

/// Computes a "contain" fit of `natural_width` x `natural_height` into the
/// `max_width` x `max_height` box, never upscaling.
///
/// `scale = min(max_width / natural_width, max_height / natural_height, 1)` and
/// each output dimension is the rounded scaled natural dimension. Extremely
/// thin images keep at least one pixel on the short axis.
///
/// # Errors
///
/// Returns [`AppError::DegenerateImage`] if either natural dimension is zero,
/// and [`AppError::Config`] if either bound is zero.
///
/// # Example
///
/// ```
/// use region_caption_core::geometry::fit;
///
/// let g = fit(1800, 1200, 900, 600).unwrap();
/// assert_eq!((g.scale, g.width, g.height), (0.5, 900, 600));
/// ```
pub fn fit(
    natural_width: u32,
    natural_height: u32,
    max_width: u32,
    max_height: u32,
) -> Result<DisplayGeometry> {
    if natural_width == 0 || natural_height == 0 {
        return Err(AppError::DegenerateImage {
            width: natural_width,
            height: natural_height,
        });
    }
    if max_width == 0 || max_height == 0 {
        return Err(AppError::config(format!(
            "fit bounds must be positive, got {}x{}",
            max_width, max_height
        )));
    }

    let scale_x = f64::from(max_width) / f64::from(natural_width);
    let scale_y = f64::from(max_height) / f64::from(natural_height);
    let scale = scale_x.min(scale_y).min(1.0);

    let width = scaled_dimension(natural_width, scale).min(max_width);
    let height = scaled_dimension(natural_height, scale).min(max_height);

    Ok(DisplayGeometry {
        scale,
        width,
        height,
    })
}

fn scaled_dimension(natural: u32, scale: f64) -> u32 {
    ((f64::from(natural) * scale).round() as u32).max(1)
}

/// A position in either display or buffer space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Where a surface currently sits on screen, in display pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl DisplayRect {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// A display rect that shows the buffer 1:1 at the origin.
    pub fn identity(buffer: BufferSize) -> Self {
        Self::new(0.0, 0.0, buffer.width as f32, buffer.height as f32)
    }

    /// Largest rect with the buffer's aspect ratio that fits inside
    /// `available`, centered in it.
    pub fn fit_within(buffer: BufferSize, available: DisplayRect) -> Self {
        let scale = (available.width / buffer.width as f32)
            .min(available.height / buffer.height as f32)
            .max(0.0);
        let width = buffer.width as f32 * scale;
        let height = buffer.height as f32 * scale;
        Self::new(
            available.left + (available.width - width) / 2.0,
            available.top + (available.height - height) / 2.0,
            width,
            height,
        )
    }
}

/// Pixel dimensions of the drawing surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSize {
    pub width: u32,
    pub height: u32,
}

/// Maps pointer positions from display space into buffer space.
///
/// Horizontal and vertical scale factors are computed independently, since
/// layout may stretch the surface differently on each axis. No clamping is
/// done: a drag that leaves the surface yields coordinates outside
/// `[0, width] x [0, height]`, which the raster stroke clips when drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    display: DisplayRect,
    buffer: BufferSize,
}

impl CoordinateMapper {
    pub fn new(display: DisplayRect, buffer: BufferSize) -> Self {
        Self { display, buffer }
    }

    /// Converts a display-space event position into buffer coordinates.
    ///
    /// Returns `None` while the surface has no visible area (nothing on
    /// screen can be pointed at).
    pub fn to_buffer_coords(&self, event: Point) -> Option<Point> {
        if self.display.width <= 0.0 || self.display.height <= 0.0 {
            return None;
        }
        let scale_x = self.buffer.width as f32 / self.display.width;
        let scale_y = self.buffer.height as f32 / self.display.height;
        Some(Point {
            x: (event.x - self.display.left) * scale_x,
            y: (event.y - self.display.top) * scale_y,
        })
    }
}

/// A rectangle with non-negative extent, produced from two drag corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedRect {
    /// Normalizes corner order: top-left is the component-wise minimum.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }
}
