//! Pointer handling for the image view.
//!
//! Translates egui pointer input into session pointer calls. A press inside
//! the image starts a selection immediately (no drag threshold), movement
//! anywhere extends it, and a release anywhere in the window commits it.

use super::rendering::to_display_rect;
use crate::geometry::Point;
use crate::session::Session;
use eframe::egui;

/// Result of processing selection input events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionEvent {
    /// User started a new selection drag.
    Started,
    /// User is actively dragging.
    Dragging,
    /// User released the pointer and the selection was committed.
    Completed,
    /// No selection event occurred.
    None,
}

/// Feeds this frame's pointer input into the session.
///
/// # Arguments
/// * `ui` - The ui the image was painted in
/// * `image_rect` - Where the surfaces are currently painted on screen
/// * `session` - The session to mutate
pub fn process_pointer(ui: &egui::Ui, image_rect: egui::Rect, session: &mut Session) -> SelectionEvent {
    let display = to_display_rect(image_rect);
    let (pressed, released, press_origin, latest) = ui.input(|i| {
        (
            i.pointer.primary_pressed(),
            i.pointer.primary_released(),
            i.pointer.press_origin(),
            i.pointer.latest_pos(),
        )
    });

    let mut event = SelectionEvent::None;

    if pressed {
        if let Some(origin) = press_origin.filter(|p| image_rect.contains(*p)) {
            if session.pointer_down(to_point(origin), display) {
                event = SelectionEvent::Started;
            }
        }
    }

    if event == SelectionEvent::None && session.selection().is_dragging() {
        if let Some(pos) = latest {
            if session.pointer_move(to_point(pos), display) {
                event = SelectionEvent::Dragging;
            }
        }
    }

    // A quick click can press and release within one frame.
    if released && session.pointer_up() {
        event = SelectionEvent::Completed;
    }

    event
}

fn to_point(pos: egui::Pos2) -> Point {
    Point::new(pos.x, pos.y)
}
