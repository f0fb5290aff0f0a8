#![forbid(unsafe_code)]

//! Items: the cells a layout is partitioned into.
//!
//! An item either carries a frame (the opaque external content slot) or is a
//! placeholder: a cell kept alive so a closed frame can come back to it. A
//! placeholder reports a zero minimum size so the anchors around it can
//! collapse, but remembers its stored minimum for restoration.

use dockline_core::{Axis, Rect, Size};
use serde::{Deserialize, Serialize};

use crate::anchor::Side;
use crate::group::AnchorGroup;

/// Stable identifier for items. `0` is reserved/invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    /// Lowest valid item id.
    pub const MIN: Self = Self(1);

    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// One cell of the layout.
#[derive(Debug, Clone)]
pub struct Item {
    geometry: Rect,
    min_size: Size,
    group: AnchorGroup,
    frame: Option<String>,
    ref_count: u32,
}

impl Item {
    pub(crate) fn new(frame: Option<String>, min_size: Size, group: AnchorGroup) -> Self {
        Self {
            geometry: Rect::default(),
            min_size,
            group,
            frame,
            ref_count: 0,
        }
    }

    #[inline]
    #[must_use]
    pub const fn geometry(&self) -> Rect {
        self.geometry
    }

    #[inline]
    #[must_use]
    pub const fn group(&self) -> &AnchorGroup {
        &self.group
    }

    /// Key of the occupying frame, `None` for placeholders.
    #[inline]
    #[must_use]
    pub fn frame(&self) -> Option<&str> {
        self.frame.as_deref()
    }

    #[inline]
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.frame.is_none()
    }

    /// Minimum size as it constrains the layout: zero for placeholders.
    #[must_use]
    pub fn min_size(&self) -> Size {
        if self.is_placeholder() {
            Size::default()
        } else {
            self.min_size
        }
    }

    /// The stored minimum, regardless of placeholder state. Serialization
    /// keeps this so a restored frame regains its floor.
    #[inline]
    #[must_use]
    pub const fn actual_min_size(&self) -> Size {
        self.min_size
    }

    /// Number of external holders that want this cell restorable.
    #[inline]
    #[must_use]
    pub const fn ref_count(&self) -> u32 {
        self.ref_count
    }

    /// Size projection onto an axis (width for vertical anchors).
    #[must_use]
    pub fn length(&self, axis: Axis) -> i32 {
        self.geometry.length(axis)
    }

    /// Minimum-size projection onto an axis.
    #[must_use]
    pub fn min_length(&self, axis: Axis) -> i32 {
        self.min_size().length(axis)
    }

    /// Move one edge of the rectangle: the side-1 edge is left/top.
    pub(crate) fn set_pos(&mut self, value: i32, axis: Axis, side: Side) {
        match (axis, side) {
            (Axis::Vertical, Side::One) => self.geometry.set_left(value),
            (Axis::Vertical, Side::Two) => self.geometry.set_right(value),
            (Axis::Horizontal, Side::One) => self.geometry.set_top(value),
            (Axis::Horizontal, Side::Two) => self.geometry.set_bottom(value),
        }
    }

    pub(crate) fn set_geometry(&mut self, geometry: Rect) {
        self.geometry = geometry;
    }

    pub(crate) fn group_mut(&mut self) -> &mut AnchorGroup {
        &mut self.group
    }

    pub(crate) fn retain(&mut self) {
        self.ref_count += 1;
    }

    /// Decrement the refcount. Underflow is a caller bug: logged, ignored.
    pub(crate) fn release(&mut self) {
        if self.ref_count == 0 {
            tracing::warn!(message = "item.release_underflow");
            return;
        }
        self.ref_count -= 1;
    }

    /// Drop the frame, turning the cell into a placeholder. Returns the key.
    pub(crate) fn take_frame(&mut self) -> Option<String> {
        self.frame.take()
    }

    pub(crate) fn set_frame(&mut self, frame: String, min_size: Size) {
        self.frame = Some(frame);
        self.min_size = min_size;
    }
}

#[cfg(test)]
mod tests {
    use dockline_core::{Axis, Rect, Size};

    use super::{Item, ItemId};
    use crate::anchor::{AnchorId, Side};
    use crate::group::AnchorGroup;

    fn group() -> AnchorGroup {
        AnchorGroup {
            left: AnchorId::new(1),
            top: AnchorId::new(2),
            right: AnchorId::new(3),
            bottom: AnchorId::new(4),
        }
    }

    #[test]
    fn placeholder_reports_zero_min_size() {
        let mut item = Item::new(Some("editor".into()), Size::new(80, 90), group());
        assert_eq!(item.min_size(), Size::new(80, 90));

        let key = item.take_frame();
        assert_eq!(key.as_deref(), Some("editor"));
        assert!(item.is_placeholder());
        assert_eq!(item.min_size(), Size::default());
        assert_eq!(item.actual_min_size(), Size::new(80, 90));
    }

    #[test]
    fn min_length_projects_by_axis() {
        let item = Item::new(Some("logs".into()), Size::new(80, 90), group());
        assert_eq!(item.min_length(Axis::Vertical), 80);
        assert_eq!(item.min_length(Axis::Horizontal), 90);
    }

    #[test]
    fn set_pos_moves_single_edges() {
        let mut item = Item::new(Some("a".into()), Size::default(), group());
        item.set_geometry(Rect::new(10, 10, 30, 30));
        item.set_pos(5, Axis::Vertical, Side::One);
        assert_eq!(item.geometry(), Rect::new(5, 10, 35, 30));
        item.set_pos(35, Axis::Horizontal, Side::Two);
        assert_eq!(item.geometry(), Rect::new(5, 10, 35, 25));
    }

    #[test]
    fn release_at_zero_is_ignored() {
        let mut item = Item::new(None, Size::default(), group());
        item.release();
        assert_eq!(item.ref_count(), 0);
        item.retain();
        item.retain();
        item.release();
        assert_eq!(item.ref_count(), 1);
    }

    #[test]
    fn item_id_raw_round_trip() {
        assert_eq!(ItemId::new(12).get(), 12);
        assert_eq!(ItemId::MIN.get(), 1);
    }
}
