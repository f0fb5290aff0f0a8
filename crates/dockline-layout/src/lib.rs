#![forbid(unsafe_code)]

//! A recursive, non-uniform splitter layout engine.
//!
//! # Role in dockline
//! `dockline-layout` partitions a rectangular container into disjoint cells,
//! each holding an opaque frame. Unlike a binary splitter tree, cells can be
//! introduced at any of the four cardinal locations relative to any existing
//! cell, mixing horizontal and vertical subdivisions freely.
//!
//! # Primary responsibilities
//! - **Anchor graph**: every cell is bounded by exactly four anchors whose
//!   positions determine all cell geometry; splits create anchors, removals
//!   coalesce them.
//! - **Minimum-size propagation**: item minimums flow recursively through
//!   the graph; the container grows rather than squeeze a cell below its
//!   floor.
//! - **Redistribution**: container resizes reposition anchors from cached
//!   proportions, clamped by the minimums.
//! - **Placeholders**: closed frames can leave a zero-sized cell behind and
//!   be restored to it later.
//!
//! # How it fits in the system
//! The engine is toolkit-agnostic: it receives a [`LayoutHost`] capability
//! record at construction and pushes geometry and visibility out through it.
//! Persistence goes through [`LayoutSnapshot`], a stable id-based record.

pub mod anchor;
pub mod error;
pub mod group;
pub mod host;
pub mod item;
pub mod layout;
pub mod restore;
pub mod sanity;
pub mod snapshot;

pub use anchor::{Anchor, AnchorId, AnchorKind, SeparatorId, Side};
pub use dockline_core::{Axis, Point, Rect, Size};
pub use error::LayoutError;
pub use group::AnchorGroup;
pub use host::{LayoutHost, NullHost};
pub use item::{Item, ItemId};
pub use layout::{Layout, LayoutOptions, MINIMUM_FRAME_SIZE};
pub use sanity::{SanityCode, SanityIssue, SanityReport, SanitySeverity};
pub use snapshot::{
    AnchorRec, GroupRec, ItemRec, LayoutSnapshot, SnapshotError,
    LAYOUT_SNAPSHOT_SCHEMA_VERSION,
};

/// Where a new cell lands, relative to an existing cell or the whole layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Left,
    Top,
    Right,
    Bottom,
}

impl Location {
    /// The axis of the anchor a split at this location introduces: left and
    /// right splits create vertical dividers.
    #[inline]
    #[must_use]
    pub const fn anchor_axis(self) -> Axis {
        match self {
            Self::Left | Self::Right => Axis::Vertical,
            Self::Top | Self::Bottom => Axis::Horizontal,
        }
    }

    /// Which side of the target boundary this location names: left/top are
    /// side 1, right/bottom are side 2.
    #[inline]
    #[must_use]
    pub const fn side(self) -> Side {
        match self {
            Self::Left | Self::Top => Side::One,
            Self::Right | Self::Bottom => Side::Two,
        }
    }

    /// The facing location.
    #[inline]
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Top => Self::Bottom,
            Self::Bottom => Self::Top,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Axis, Location, Side};

    #[test]
    fn location_maps_to_axis_and_side() {
        assert_eq!(Location::Left.anchor_axis(), Axis::Vertical);
        assert_eq!(Location::Bottom.anchor_axis(), Axis::Horizontal);
        assert_eq!(Location::Top.side(), Side::One);
        assert_eq!(Location::Right.side(), Side::Two);
        assert_eq!(Location::Left.opposite(), Location::Right);
        assert_eq!(Location::Bottom.opposite(), Location::Top);
    }
}
