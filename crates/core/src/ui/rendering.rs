//! UI rendering helpers.
//!
//! The base and overlay surfaces live in the session as RGBA buffers. Here
//! they are mirrored into two egui textures and painted into one shared rect,
//! so the overlay is always co-registered with the base image.

use crate::geometry::{BufferSize, DisplayRect};
use crate::session::Session;
use eframe::egui;
use image::RgbaImage;

const FULL_UV: egui::Rect = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));

pub fn to_display_rect(rect: egui::Rect) -> DisplayRect {
    DisplayRect::new(rect.min.x, rect.min.y, rect.width(), rect.height())
}

pub fn to_egui_rect(rect: DisplayRect) -> egui::Rect {
    egui::Rect::from_min_size(
        egui::pos2(rect.left, rect.top),
        egui::vec2(rect.width, rect.height),
    )
}

/// Where to paint a buffer of `buffer` size inside `available`.
///
/// The surfaces are shown at native size when they fit and shrunk (keeping
/// their aspect ratio) when the panel is smaller.
pub fn image_rect(available: egui::Rect, buffer: BufferSize) -> egui::Rect {
    let bounds = DisplayRect::new(
        available.min.x,
        available.min.y,
        available.width().min(buffer.width as f32),
        available.height().min(buffer.height as f32),
    );
    let fitted = DisplayRect::fit_within(buffer, bounds);
    // Center horizontally in the full panel, keep to the top.
    let offset = (available.width() - fitted.width) / 2.0 - (fitted.left - available.min.x);
    to_egui_rect(DisplayRect::new(
        fitted.left + offset,
        available.min.y,
        fitted.width,
        fitted.height,
    ))
}

/// Converts an RGBA buffer into an egui image.
pub fn color_image(buffer: &RgbaImage) -> egui::ColorImage {
    let size = [buffer.width() as usize, buffer.height() as usize];
    egui::ColorImage::from_rgba_unmultiplied(size, buffer.as_raw())
}

/// GPU copies of the session's surfaces.
#[derive(Default)]
pub struct SurfaceTextures {
    base: Option<egui::TextureHandle>,
    overlay: Option<egui::TextureHandle>,
    base_revision: u64,
    overlay_revision: u64,
}

impl SurfaceTextures {
    /// Re-uploads whichever surfaces changed since the last call. Returns
    /// whether anything was uploaded.
    pub fn sync(&mut self, ctx: &egui::Context, session: &Session) -> bool {
        let mut changed = false;
        if session.base_revision() != self.base_revision {
            if let Some(base) = session.base_surface() {
                upload(ctx, &mut self.base, "base", base, egui::TextureOptions::LINEAR);
            }
            self.base_revision = session.base_revision();
            changed = true;
        }
        if session.overlay_revision() != self.overlay_revision {
            if let Some(overlay) = session.overlay_surface() {
                upload(ctx, &mut self.overlay, "overlay", overlay, egui::TextureOptions::NEAREST);
            }
            self.overlay_revision = session.overlay_revision();
            changed = true;
        }
        changed
    }

    /// Paints the base image and the overlay on top of it into `rect`.
    pub fn paint(&self, painter: &egui::Painter, rect: egui::Rect) {
        for texture in [&self.base, &self.overlay].into_iter().flatten() {
            painter.image(texture.id(), rect, FULL_UV, egui::Color32::WHITE);
        }
    }
}

fn upload(
    ctx: &egui::Context,
    slot: &mut Option<egui::TextureHandle>,
    name: &str,
    buffer: &RgbaImage,
    options: egui::TextureOptions,
) {
    let image = color_image(buffer);
    match slot {
        Some(handle) => handle.set(image, options),
        None => *slot = Some(ctx.load_texture(name, image, options)),
    }
}

/// Draws the status line, in red for errors.
pub fn status_label(ui: &mut egui::Ui, text: &str, is_error: bool) {
    if text.is_empty() {
        return;
    }
    if is_error {
        ui.label(egui::RichText::new(text).color(egui::Color32::RED));
    } else {
        ui.label(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_size_when_panel_is_large() {
        let available = egui::Rect::from_min_size(egui::pos2(100.0, 50.0), egui::vec2(1000.0, 800.0));
        let rect = image_rect(available, BufferSize { width: 400, height: 300 });
        assert_eq!(rect.size(), egui::vec2(400.0, 300.0));
        assert_eq!(rect.min, egui::pos2(400.0, 50.0));
    }

    #[test]
    fn shrinks_with_aspect_when_panel_is_small() {
        let available = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(450.0, 600.0));
        let rect = image_rect(available, BufferSize { width: 900, height: 600 });
        assert_eq!(rect.size(), egui::vec2(450.0, 300.0));
        assert_eq!(rect.min, egui::pos2(0.0, 0.0));
    }

    #[test]
    fn display_rect_conversion_round_trips() {
        let rect = egui::Rect::from_min_size(egui::pos2(3.0, 4.0), egui::vec2(50.0, 60.0));
        assert_eq!(to_egui_rect(to_display_rect(rect)), rect);
    }

    #[test]
    fn color_image_matches_buffer_size() {
        let image = color_image(&RgbaImage::new(7, 5));
        assert_eq!(image.size, [7, 5]);
    }
}
