#![forbid(unsafe_code)]

//! The four anchors bounding one cell.
//!
//! Cells do not know their neighbours; every topology query walks through
//! anchors. Keeping only the four boundary references here is what keeps the
//! arrangement planar by construction.

use std::collections::BTreeMap;

use dockline_core::{Axis, Rect};

use crate::anchor::{Anchor, AnchorId, Side};
use crate::Location;

/// Value record of the four anchors bounding a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorGroup {
    pub left: AnchorId,
    pub top: AnchorId,
    pub right: AnchorId,
    pub bottom: AnchorId,
}

impl AnchorGroup {
    /// The anchor on the given edge.
    #[must_use]
    pub const fn anchor_at(&self, location: Location) -> AnchorId {
        match location {
            Location::Left => self.left,
            Location::Top => self.top,
            Location::Right => self.right,
            Location::Bottom => self.bottom,
        }
    }

    /// The boundary of the given axis on the given side: side 1 of the
    /// vertical pair is `left`, side 2 is `right`; `top`/`bottom` for the
    /// horizontal pair.
    #[must_use]
    pub const fn anchor_at_side(&self, side: Side, axis: Axis) -> AnchorId {
        match (axis, side) {
            (Axis::Vertical, Side::One) => self.left,
            (Axis::Vertical, Side::Two) => self.right,
            (Axis::Horizontal, Side::One) => self.top,
            (Axis::Horizontal, Side::Two) => self.bottom,
        }
    }

    pub(crate) fn set_anchor_at(&mut self, location: Location, anchor: AnchorId) {
        match location {
            Location::Left => self.left = anchor,
            Location::Top => self.top = anchor,
            Location::Right => self.right = anchor,
            Location::Bottom => self.bottom = anchor,
        }
    }

    /// Install `anchor` as the boundary *facing* the given side: an anchor
    /// with this cell on its side 1 is the cell's right/bottom boundary.
    pub(crate) fn set_anchor(&mut self, anchor: AnchorId, axis: Axis, side: Side) {
        match (axis, side) {
            (Axis::Vertical, Side::One) => self.right = anchor,
            (Axis::Vertical, Side::Two) => self.left = anchor,
            (Axis::Horizontal, Side::One) => self.bottom = anchor,
            (Axis::Horizontal, Side::Two) => self.top = anchor,
        }
    }

    /// The anchor across the cell from `anchor`, or `None` if `anchor` is
    /// not part of this group.
    #[must_use]
    pub fn opposite_of(&self, anchor: AnchorId) -> Option<AnchorId> {
        if anchor == self.left {
            Some(self.right)
        } else if anchor == self.right {
            Some(self.left)
        } else if anchor == self.top {
            Some(self.bottom)
        } else if anchor == self.bottom {
            Some(self.top)
        } else {
            None
        }
    }

    #[must_use]
    pub fn contains(&self, anchor: AnchorId) -> bool {
        anchor == self.left || anchor == self.top || anchor == self.right || anchor == self.bottom
    }

    /// Replace every boundary equal to `old` with `new`.
    pub(crate) fn replace(&mut self, old: AnchorId, new: AnchorId) {
        if self.left == old {
            self.left = new;
        }
        if self.top == old {
            self.top = new;
        }
        if self.right == old {
            self.right = new;
        }
        if self.bottom == old {
            self.bottom = new;
        }
    }

    /// The cell rectangle spanned by the four anchors.
    ///
    /// Each boundary contributes its effective thickness, so a following
    /// (collapsed) anchor costs no pixels. A group with a boundary missing
    /// from the arena derives an empty rectangle.
    #[must_use]
    pub fn rect(&self, anchors: &BTreeMap<AnchorId, Anchor>) -> Rect {
        let (Some(left), Some(top), Some(right), Some(bottom)) = (
            anchors.get(&self.left),
            anchors.get(&self.top),
            anchors.get(&self.right),
            anchors.get(&self.bottom),
        ) else {
            return Rect::default();
        };

        let x = left.position() + left.effective_thickness();
        let y = top.position() + top.effective_thickness();
        Rect::new(x, y, right.position() - x, bottom.position() - y)
    }

    /// All four ids, left/top/right/bottom order.
    #[must_use]
    pub const fn ids(&self) -> [AnchorId; 4] {
        [self.left, self.top, self.right, self.bottom]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use dockline_core::{Axis, Rect};

    use super::AnchorGroup;
    use crate::anchor::{Anchor, AnchorId, AnchorKind, Side};
    use crate::Location;

    fn id(raw: u64) -> AnchorId {
        AnchorId::new(raw)
    }

    fn group() -> AnchorGroup {
        AnchorGroup {
            left: id(1),
            top: id(2),
            right: id(3),
            bottom: id(4),
        }
    }

    #[test]
    fn anchor_at_side_maps_axes() {
        let g = group();
        assert_eq!(g.anchor_at_side(Side::One, Axis::Vertical), g.left);
        assert_eq!(g.anchor_at_side(Side::Two, Axis::Vertical), g.right);
        assert_eq!(g.anchor_at_side(Side::One, Axis::Horizontal), g.top);
        assert_eq!(g.anchor_at_side(Side::Two, Axis::Horizontal), g.bottom);
    }

    #[test]
    fn set_anchor_installs_facing_boundary() {
        let mut g = group();
        let new = id(9);
        g.set_anchor(new, Axis::Vertical, Side::One);
        assert_eq!(g.right, new);
        g.set_anchor(new, Axis::Horizontal, Side::Two);
        assert_eq!(g.top, new);
    }

    #[test]
    fn opposite_of_crosses_the_cell() {
        let g = group();
        assert_eq!(g.opposite_of(g.left), Some(g.right));
        assert_eq!(g.opposite_of(g.bottom), Some(g.top));
        assert_eq!(g.opposite_of(id(99)), None);
    }

    #[test]
    fn replace_rewrites_all_matching_boundaries() {
        let mut g = group();
        g.replace(id(3), id(7));
        assert_eq!(g.anchor_at(Location::Right), id(7));
        assert_eq!(g.anchor_at(Location::Left), id(1));
    }

    #[test]
    fn rect_accounts_for_boundary_thickness() {
        let mut anchors = BTreeMap::new();
        let mut left = Anchor::new(Axis::Vertical, AnchorKind::StaticLeft, 1, id(2), id(4));
        left.set_position(0);
        let mut top = Anchor::new(Axis::Horizontal, AnchorKind::StaticTop, 1, id(1), id(3));
        top.set_position(0);
        let mut right = Anchor::new(Axis::Vertical, AnchorKind::StaticRight, 1, id(2), id(4));
        right.set_position(199);
        let mut bottom = Anchor::new(Axis::Horizontal, AnchorKind::StaticBottom, 1, id(1), id(3));
        bottom.set_position(99);
        anchors.insert(id(1), left);
        anchors.insert(id(2), top);
        anchors.insert(id(3), right);
        anchors.insert(id(4), bottom);

        assert_eq!(group().rect(&anchors), Rect::new(1, 1, 198, 98));
    }
}
