#![forbid(unsafe_code)]

//! Anchors: the vertical and horizontal divider lines between cells.
//!
//! A layout owns four static anchors (its borders) plus one dynamic anchor
//! per split. Each anchor runs between two perpendicular anchors (`from` and
//! `to`) and keeps the ordered lists of items it bounds on each side: side 1
//! is left/top, side 2 is right/bottom. A dynamic anchor that loses all items
//! on either side is unneeded and gets coalesced into a neighbour.
//!
//! The graph-walking operations (cumulative minimum length, squeeze bounds,
//! consume) live on [`Layout`](crate::Layout), which owns the arenas the
//! walks traverse; this module is the per-anchor state.

use dockline_core::Axis;
use serde::{Deserialize, Serialize};

use crate::item::ItemId;

/// Stable identifier for anchors.
///
/// `0` is reserved/invalid so serialized ids are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnchorId(u64);

impl AnchorId {
    /// Lowest valid anchor id.
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

/// Handle for a host-created separator widget.
///
/// The engine never interprets the value; it only hands it back in queries so
/// the host can correlate drag input with anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeparatorId(pub u64);

/// One side of an anchor.
///
/// `One` is the left side for vertical anchors and the top side for
/// horizontal ones; `Two` is the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    One,
    Two,
}

impl Side {
    /// The other side.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }
}

/// Anchor kind: one immovable border per edge, or a dynamic split divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnchorKind {
    Dynamic,
    StaticLeft,
    StaticRight,
    StaticTop,
    StaticBottom,
}

impl AnchorKind {
    #[inline]
    #[must_use]
    pub const fn is_static(self) -> bool {
        !matches!(self, Self::Dynamic)
    }
}

/// A divider line, bounded by two perpendicular anchors.
#[derive(Debug, Clone)]
pub struct Anchor {
    axis: Axis,
    kind: AnchorKind,
    thickness: i32,
    position: i32,
    /// Ratio of `position` to the container length along the normal axis,
    /// cached so proportions survive container resizes.
    position_percentage: f64,
    from: AnchorId,
    to: AnchorId,
    side1_items: Vec<ItemId>,
    side2_items: Vec<ItemId>,
    follows: Option<AnchorId>,
    separator: Option<SeparatorId>,
}

impl Anchor {
    pub(crate) fn new(
        axis: Axis,
        kind: AnchorKind,
        thickness: i32,
        from: AnchorId,
        to: AnchorId,
    ) -> Self {
        Self {
            axis,
            kind,
            thickness,
            position: 0,
            position_percentage: 0.0,
            from,
            to,
            side1_items: Vec::new(),
            side2_items: Vec::new(),
            follows: None,
            separator: None,
        }
    }

    #[inline]
    #[must_use]
    pub const fn axis(&self) -> Axis {
        self.axis
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> AnchorKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.kind.is_static()
    }

    #[inline]
    #[must_use]
    pub const fn is_vertical(&self) -> bool {
        matches!(self.axis, Axis::Vertical)
    }

    /// Current coordinate along the normal axis (x for vertical anchors).
    #[inline]
    #[must_use]
    pub const fn position(&self) -> i32 {
        self.position
    }

    #[inline]
    #[must_use]
    pub const fn position_percentage(&self) -> f64 {
        self.position_percentage
    }

    /// Separator thickness in pixels. This is the stored value; a following
    /// anchor still reports it even though it occupies no pixels on screen
    /// (see [`effective_thickness`](Self::effective_thickness)).
    #[inline]
    #[must_use]
    pub const fn thickness(&self) -> i32 {
        self.thickness
    }

    /// Thickness as it contributes to cell geometry: zero while following.
    #[inline]
    #[must_use]
    pub const fn effective_thickness(&self) -> i32 {
        if self.follows.is_some() { 0 } else { self.thickness }
    }

    /// Perpendicular anchor this one starts at (left/top end).
    #[inline]
    #[must_use]
    pub const fn from(&self) -> AnchorId {
        self.from
    }

    /// Perpendicular anchor this one ends at (right/bottom end).
    #[inline]
    #[must_use]
    pub const fn to(&self) -> AnchorId {
        self.to
    }

    /// The anchor this one is collapsed onto, if any.
    #[inline]
    #[must_use]
    pub const fn follows(&self) -> Option<AnchorId> {
        self.follows
    }

    #[inline]
    #[must_use]
    pub const fn is_following(&self) -> bool {
        self.follows.is_some()
    }

    #[inline]
    #[must_use]
    pub const fn separator(&self) -> Option<SeparatorId> {
        self.separator
    }

    #[must_use]
    pub fn items(&self, side: Side) -> &[ItemId] {
        match side {
            Side::One => &self.side1_items,
            Side::Two => &self.side2_items,
        }
    }

    #[must_use]
    pub fn has_items(&self, side: Side) -> bool {
        !self.items(side).is_empty()
    }

    #[must_use]
    pub fn contains_item(&self, item: ItemId, side: Side) -> bool {
        self.items(side).contains(&item)
    }

    /// A dynamic anchor with an empty side separates nothing and must be
    /// coalesced into a neighbour.
    #[must_use]
    pub fn is_unneeded(&self) -> bool {
        !self.is_static() && (self.side1_items.is_empty() || self.side2_items.is_empty())
    }

    /// Valid iff both endpoints exist, differ, and are not the anchor itself.
    #[must_use]
    pub fn is_valid(&self, own_id: AnchorId) -> bool {
        self.from != self.to && self.from != own_id && self.to != own_id
    }

    pub(crate) fn add_item(&mut self, item: ItemId, side: Side) {
        let list = match side {
            Side::One => &mut self.side1_items,
            Side::Two => &mut self.side2_items,
        };
        if !list.contains(&item) {
            list.push(item);
        }
    }

    pub(crate) fn remove_item(&mut self, item: ItemId) {
        self.side1_items.retain(|&it| it != item);
        self.side2_items.retain(|&it| it != item);
    }

    pub(crate) fn take_items(&mut self, side: Side) -> Vec<ItemId> {
        match side {
            Side::One => std::mem::take(&mut self.side1_items),
            Side::Two => std::mem::take(&mut self.side2_items),
        }
    }

    pub(crate) fn set_position(&mut self, position: i32) {
        self.position = position;
    }

    pub(crate) fn set_position_percentage(&mut self, percentage: f64) {
        self.position_percentage = percentage;
    }

    pub(crate) fn set_from(&mut self, from: AnchorId) {
        self.from = from;
    }

    pub(crate) fn set_to(&mut self, to: AnchorId) {
        self.to = to;
    }

    pub(crate) fn set_follows(&mut self, follows: Option<AnchorId>) {
        self.follows = follows;
    }

    pub(crate) fn set_separator(&mut self, separator: SeparatorId) {
        self.separator = Some(separator);
    }
}

#[cfg(test)]
mod tests {
    use super::{Anchor, AnchorId, AnchorKind, Side};
    use dockline_core::Axis;

    fn id(raw: u64) -> AnchorId {
        AnchorId::new(raw)
    }

    fn dynamic() -> Anchor {
        Anchor::new(Axis::Vertical, AnchorKind::Dynamic, 5, id(2), id(4))
    }

    #[test]
    fn side_lists_deduplicate() {
        let mut anchor = dynamic();
        let item = crate::item::ItemId::new(7);
        anchor.add_item(item, Side::One);
        anchor.add_item(item, Side::One);
        assert_eq!(anchor.items(Side::One), &[item]);
        assert!(anchor.contains_item(item, Side::One));
        assert!(!anchor.contains_item(item, Side::Two));
    }

    #[test]
    fn dynamic_anchor_with_empty_side_is_unneeded() {
        let mut anchor = dynamic();
        assert!(anchor.is_unneeded());
        anchor.add_item(crate::item::ItemId::new(1), Side::One);
        assert!(anchor.is_unneeded());
        anchor.add_item(crate::item::ItemId::new(2), Side::Two);
        assert!(!anchor.is_unneeded());
        anchor.remove_item(crate::item::ItemId::new(2));
        assert!(anchor.is_unneeded());
    }

    #[test]
    fn static_anchor_is_never_unneeded() {
        let anchor = Anchor::new(Axis::Vertical, AnchorKind::StaticLeft, 1, id(2), id(4));
        assert!(!anchor.is_unneeded());
        assert!(anchor.is_static());
    }

    #[test]
    fn validity_rejects_self_and_equal_endpoints() {
        let own = id(9);
        let mut anchor = dynamic();
        assert!(anchor.is_valid(own));
        anchor.set_from(own);
        assert!(!anchor.is_valid(own));
        anchor.set_from(id(4));
        assert!(!anchor.is_valid(own));
    }

    #[test]
    fn following_hides_thickness() {
        let mut anchor = dynamic();
        assert_eq!(anchor.effective_thickness(), 5);
        anchor.set_follows(Some(id(3)));
        assert_eq!(anchor.thickness(), 5);
        assert_eq!(anchor.effective_thickness(), 0);
    }
}
