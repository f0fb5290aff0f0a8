#![forbid(unsafe_code)]

//! The capability record connecting the engine to its host toolkit.
//!
//! The engine never talks to widgets directly: at construction it receives a
//! [`LayoutHost`] and calls back through it for everything toolkit-shaped —
//! separator creation, frame size hints, and geometry/visibility pushes.

use dockline_core::{Axis, Rect, Size};

use crate::anchor::SeparatorId;

/// Capabilities the embedding toolkit provides to the engine.
pub trait LayoutHost {
    /// Create the separator widget for a new dynamic anchor and return a
    /// handle the engine will keep on the anchor.
    fn create_separator(&mut self, axis: Axis) -> SeparatorId;

    /// The minimum size the frame asks for. The engine clamps this upward to
    /// its own hard floor; returning zero is fine.
    fn frame_minimum_size_hint(&self, frame: &str) -> Size;

    /// A cell committed a new rectangle for its frame.
    fn notify_geometry(&mut self, frame: &str, rect: Rect);

    /// A frame was hidden (cell became a placeholder) or shown again.
    fn notify_visibility(&mut self, frame: &str, visible: bool);

    /// The layout's minimum size changed; the container may need to grow.
    fn notify_minimum_size_changed(&mut self, size: Size);
}

/// Host that accepts everything and reports no size hints.
///
/// Useful for tests and for driving the engine headless.
#[derive(Debug, Default)]
pub struct NullHost {
    next_separator: u64,
}

impl LayoutHost for NullHost {
    fn create_separator(&mut self, _axis: Axis) -> SeparatorId {
        self.next_separator += 1;
        SeparatorId(self.next_separator)
    }

    fn frame_minimum_size_hint(&self, _frame: &str) -> Size {
        Size::default()
    }

    fn notify_geometry(&mut self, _frame: &str, _rect: Rect) {}

    fn notify_visibility(&mut self, _frame: &str, _visible: bool) {}

    fn notify_minimum_size_changed(&mut self, _size: Size) {}
}
