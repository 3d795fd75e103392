//! Region selection state machine.
//!
//! The machine follows a simple lifecycle:
//! `Idle` -> `Dragging` (pointer held) -> `Idle` (on release, selection kept)
//!
//! An explicit [`SelectionState::clear`] drops the selection, and
//! [`SelectionState::reset`] forces everything back to a blank state whenever
//! a new image becomes current. Calls that are not valid in the current state
//! are silent no-ops.

use crate::geometry::{NormalizedRect, Point};
use tracing::debug;

/// Whether a drag is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging,
}

/// The two drag corners, in buffer coordinates.
///
/// Corners are kept exactly as dragged; use [`SelectionRect::normalized`] to
/// get a top-left anchored rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SelectionRect {
    pub start: Point,
    pub end: Point,
}

impl SelectionRect {
    pub fn normalized(&self) -> NormalizedRect {
        NormalizedRect::from_corners(self.start, self.end)
    }
}

/// Owned selection state for the current image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    drag: DragState,
    rect: SelectionRect,
    has_selection: bool,
    image_loaded: bool,
}

impl SelectionState {
    /// A state with no image loaded; [`begin`](Self::begin) is ignored until
    /// [`reset`](Self::reset) is called for an image.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a drag at `point`. Both corners move to `point` and the
    /// selection becomes visible immediately.
    pub fn begin(&mut self, point: Point) {
        if !self.image_loaded {
            return;
        }
        debug!(x = point.x, y = point.y, "selection drag started");
        self.rect = SelectionRect {
            start: point,
            end: point,
        };
        self.drag = DragState::Dragging;
        self.has_selection = true;
    }

    /// Moves the end corner while dragging. The start corner never changes
    /// during a drag.
    pub fn update(&mut self, point: Point) {
        if self.drag != DragState::Dragging {
            return;
        }
        self.rect.end = point;
    }

    /// Commits the current rectangle as-is, including zero-area ones.
    pub fn end(&mut self) {
        if self.drag != DragState::Dragging {
            return;
        }
        self.drag = DragState::Idle;
        debug!(rect = ?self.rect.normalized(), "selection committed");
    }

    /// Drops the committed selection. Ignored mid-drag.
    pub fn clear(&mut self) {
        if self.drag != DragState::Idle {
            return;
        }
        self.has_selection = false;
    }

    /// Returns to `Idle` with no selection, for a newly loaded image.
    pub fn reset(&mut self) {
        self.drag = DragState::Idle;
        self.has_selection = false;
        self.rect = SelectionRect::default();
        self.image_loaded = true;
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    pub fn is_dragging(&self) -> bool {
        self.drag == DragState::Dragging
    }

    pub fn has_selection(&self) -> bool {
        self.has_selection
    }

    pub fn has_image(&self) -> bool {
        self.image_loaded
    }

    /// Raw drag corners, regardless of whether a selection is shown.
    pub fn rect(&self) -> SelectionRect {
        self.rect
    }

    /// The normalized rectangle, only when a selection is shown.
    pub fn selection(&self) -> Option<NormalizedRect> {
        self.has_selection.then(|| self.rect.normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded() -> SelectionState {
        let mut state = SelectionState::new();
        state.reset();
        state
    }

    #[test]
    fn begin_without_image_is_ignored() {
        let mut state = SelectionState::new();
        state.begin(Point::new(5.0, 5.0));
        assert_eq!(state, SelectionState::new());
        assert!(!state.has_selection());
    }

    #[test]
    fn update_and_end_while_idle_do_nothing() {
        let mut state = loaded();
        let before = state.clone();
        state.update(Point::new(50.0, 50.0));
        state.end();
        assert_eq!(state, before);
    }

    #[test]
    fn click_without_move_commits_zero_area_selection() {
        let mut state = loaded();
        state.begin(Point::new(42.0, 17.0));
        state.end();

        assert_eq!(state.drag_state(), DragState::Idle);
        assert!(state.has_selection());
        let rect = state.selection().unwrap();
        assert_eq!((rect.width, rect.height), (0.0, 0.0));
        assert_eq!((rect.x, rect.y), (42.0, 17.0));
    }

    #[test]
    fn update_moves_only_end_corner() {
        let mut state = loaded();
        state.begin(Point::new(10.0, 10.0));
        state.update(Point::new(50.0, 40.0));
        state.update(Point::new(110.0, 60.0));
        state.end();

        assert_eq!(state.rect().start, Point::new(10.0, 10.0));
        assert_eq!(state.rect().end, Point::new(110.0, 60.0));
        let rect = state.selection().unwrap();
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (10.0, 10.0, 100.0, 50.0));
    }

    #[test]
    fn committed_selection_ignores_further_moves() {
        let mut state = loaded();
        state.begin(Point::new(0.0, 0.0));
        state.update(Point::new(20.0, 20.0));
        state.end();
        state.update(Point::new(99.0, 99.0));
        assert_eq!(state.rect().end, Point::new(20.0, 20.0));
    }

    #[test]
    fn clear_is_idempotent_and_ignored_mid_drag() {
        let mut state = loaded();
        state.begin(Point::new(1.0, 1.0));
        state.clear();
        assert!(state.has_selection());
        state.end();

        state.clear();
        assert!(!state.has_selection());
        let after_first = state.clone();
        state.clear();
        assert_eq!(state, after_first);
        assert_eq!(state.selection(), None);
    }

    #[test]
    fn reset_clears_everything_even_mid_drag() {
        let mut state = loaded();
        state.begin(Point::new(3.0, 4.0));
        state.update(Point::new(30.0, 40.0));
        state.reset();

        assert_eq!(state.drag_state(), DragState::Idle);
        assert!(!state.has_selection());
        assert!(state.has_image());
    }

    #[test]
    fn new_drag_replaces_previous_selection() {
        let mut state = loaded();
        state.begin(Point::new(0.0, 0.0));
        state.update(Point::new(10.0, 10.0));
        state.end();
        state.begin(Point::new(200.0, 200.0));
        assert_eq!(state.rect().start, Point::new(200.0, 200.0));
        assert_eq!(state.rect().end, Point::new(200.0, 200.0));
    }
}
