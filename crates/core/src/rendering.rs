//! Raster drawing of the selection marker.
//!
//! Both the live overlay and the submitted composite draw the rectangle with
//! [`stroke_rect`], so what the user sees while dragging and what the caption
//! service receives line up pixel for pixel (apart from stroke width).

use crate::geometry::NormalizedRect;
use crate::selection::SelectionRect;
use image::{Rgba, RgbaImage};

/// Fully transparent pixel used to wipe the overlay.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Color of the selection marker.
pub const SELECTION_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Line width and color for a rectangle outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub width: f32,
    pub color: Rgba<u8>,
}

impl StrokeStyle {
    /// Live preview stroke drawn on the overlay while selecting.
    pub const PREVIEW: Self = Self {
        width: 4.0,
        color: SELECTION_COLOR,
    };

    /// Heavier stroke burned into the composite so the marker survives any
    /// downstream recompression.
    pub const SUBMISSION: Self = Self {
        width: 6.0,
        color: SELECTION_COLOR,
    };
}

/// Strokes the outline of `rect` onto `img`.
///
/// The path runs through `rect` offset by half a pixel, and the line extends
/// `width / 2` to each side of it. A pixel is painted when its center falls
/// inside the outer edge of the line and outside its inner edge. Anything
/// outside the image is clipped.
///
/// A rectangle with no area paints nothing. One with a single zero side is a
/// plain line segment: `width` thick, but not extended past its end points.
pub fn stroke_rect(img: &mut RgbaImage, rect: NormalizedRect, style: StrokeStyle) {
    if rect.width == 0.0 && rect.height == 0.0 {
        return;
    }

    let half = style.width / 2.0;
    let left = rect.x + 0.5;
    let top = rect.y + 0.5;
    let right = left + rect.width;
    let bottom = top + rect.height;

    // Degenerate sides get butt ends instead of corner overhang.
    let overhang_x = if rect.height == 0.0 { 0.0 } else { half };
    let overhang_y = if rect.width == 0.0 { 0.0 } else { half };

    let (outer_x0, outer_x1) = (left - overhang_x, right + overhang_x);
    let (outer_y0, outer_y1) = (top - overhang_y, bottom + overhang_y);
    let (inner_x0, inner_x1) = (left + half, right - half);
    let (inner_y0, inner_y1) = (top + half, bottom - half);

    let x_range = pixel_span(outer_x0, outer_x1, img.width());
    let y_range = pixel_span(outer_y0, outer_y1, img.height());

    for py in y_range {
        let cy = py as f32 + 0.5;
        if cy < outer_y0 || cy >= outer_y1 {
            continue;
        }
        let inside_y = cy >= inner_y0 && cy < inner_y1;
        for px in x_range.clone() {
            let cx = px as f32 + 0.5;
            if cx < outer_x0 || cx >= outer_x1 {
                continue;
            }
            if inside_y && cx >= inner_x0 && cx < inner_x1 {
                continue;
            }
            img.put_pixel(px, py, style.color);
        }
    }
}

/// Pixel indices whose centers may lie in `[lo, hi)`, clipped to `0..limit`.
fn pixel_span(lo: f32, hi: f32, limit: u32) -> std::ops::Range<u32> {
    let start = lo.floor().max(0.0).min(limit as f32) as u32;
    let end = hi.ceil().max(0.0).min(limit as f32) as u32;
    start..end.max(start)
}

/// Redraws the overlay layer from the current selection.
///
/// The whole surface is wiped first, so calling this on every pointer move
/// never accumulates old frames.
pub fn render_overlay(surface: &mut RgbaImage, rect: &SelectionRect, has_selection: bool) {
    surface.pixels_mut().for_each(|p| *p = TRANSPARENT);
    if has_selection {
        stroke_rect(surface, rect.normalized(), StrokeStyle::PREVIEW);
    }
}
