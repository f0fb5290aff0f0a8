#![forbid(unsafe_code)]

//! Validation errors surfaced by the engine's mutating operations.

use std::fmt;

use crate::anchor::AnchorId;

/// Errors returned by [`Layout`](crate::Layout) operations.
///
/// All variants are validation failures: the layout is unchanged when one is
/// returned. Invariant breaks detected after the fact are reported through
/// [`check_sanity`](crate::Layout::check_sanity) instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// `relative_to` does not name a live item in this layout.
    InvalidTarget { frame: String },
    /// The frame is already occupying a cell.
    AlreadyPresent { frame: String },
    /// The frame has no cell (and no restorable placeholder) in this layout.
    NotPresent { frame: String },
    /// An anchor id did not resolve in the arena.
    AnchorNotFound { id: AnchorId },
    /// A drag was attempted on a static or following anchor.
    ImmovableAnchor { id: AnchorId },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTarget { frame } => {
                write!(f, "relative-to frame {frame:?} is not a live item")
            }
            Self::AlreadyPresent { frame } => {
                write!(f, "frame {frame:?} is already in the layout")
            }
            Self::NotPresent { frame } => write!(f, "frame {frame:?} is not in the layout"),
            Self::AnchorNotFound { id } => write!(f, "anchor {} not found", id.get()),
            Self::ImmovableAnchor { id } => {
                write!(f, "anchor {} is static or following and cannot be dragged", id.get())
            }
        }
    }
}

impl std::error::Error for LayoutError {}
