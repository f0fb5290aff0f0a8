#![forbid(unsafe_code)]

//! Persisted layout state.
//!
//! Snapshot types are a stable projection of the runtime graph: plain
//! records with ids instead of references, safe to serialize with any serde
//! format. Import validates the whole graph up front — anchors first so
//! endpoint ids resolve, then items, then follower links — and finishes with
//! a single redistribution; nothing is committed to the host until the graph
//! is whole.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use dockline_core::{Axis, Rect, Size};
use serde::{Deserialize, Serialize};

use crate::anchor::{Anchor, AnchorId, AnchorKind, Side};
use crate::group::AnchorGroup;
use crate::host::LayoutHost;
use crate::item::{Item, ItemId};
use crate::layout::{Layout, LayoutOptions};
use crate::restore::RestorePositions;

/// Current snapshot schema version.
pub const LAYOUT_SNAPSHOT_SCHEMA_VERSION: u16 = 1;

/// Serialized form of one anchor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorRec {
    pub id: AnchorId,
    pub axis: Axis,
    pub kind: AnchorKind,
    pub position: i32,
    pub position_percentage: f64,
    pub from: AnchorId,
    pub to: AnchorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follows: Option<AnchorId>,
    pub side1_items: Vec<ItemId>,
    pub side2_items: Vec<ItemId>,
}

/// Serialized form of one cell's anchor group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRec {
    pub left: AnchorId,
    pub top: AnchorId,
    pub right: AnchorId,
    pub bottom: AnchorId,
}

/// Serialized form of one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRec {
    pub id: ItemId,
    pub geometry: Rect,
    pub min_size: Size,
    pub is_placeholder: bool,
    /// The occupying frame, or the frame a placeholder is reserved for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<String>,
    pub group: GroupRec,
}

/// Serialized form of a whole layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub schema_version: u16,
    pub size: Size,
    pub min_size: Size,
    pub anchors: Vec<AnchorRec>,
    pub items: Vec<ItemRec>,
}

/// Validation errors raised while importing a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    UnsupportedSchemaVersion { version: u16 },
    ZeroAnchorId,
    ZeroItemId,
    DuplicateAnchorId { id: AnchorId },
    DuplicateItemId { id: ItemId },
    MissingStaticAnchor { kind: AnchorKind },
    DuplicateStaticAnchor { kind: AnchorKind },
    StaticAxisMismatch { id: AnchorId },
    InvalidEndpoints { anchor: AnchorId },
    DanglingEndpoint { anchor: AnchorId, endpoint: AnchorId },
    ParallelEndpoint { anchor: AnchorId, endpoint: AnchorId },
    DanglingFollowee { anchor: AnchorId, followee: AnchorId },
    FollowerAxisMismatch { anchor: AnchorId, followee: AnchorId },
    FollowerCycle { anchor: AnchorId },
    DanglingGroupAnchor { item: ItemId, anchor: AnchorId },
    DanglingItemReference { anchor: AnchorId, item: ItemId },
    SideListMismatch { anchor: AnchorId, item: ItemId },
    MissingRegistration { item: ItemId, anchor: AnchorId },
    LiveItemWithoutFrame { item: ItemId },
    DuplicateFrame { frame: String },
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedSchemaVersion { version } => write!(
                f,
                "unsupported layout snapshot version {version} (expected {LAYOUT_SNAPSHOT_SCHEMA_VERSION})"
            ),
            Self::ZeroAnchorId => write!(f, "anchor id 0 is invalid"),
            Self::ZeroItemId => write!(f, "item id 0 is invalid"),
            Self::DuplicateAnchorId { id } => write!(f, "duplicate anchor id {}", id.get()),
            Self::DuplicateItemId { id } => write!(f, "duplicate item id {}", id.get()),
            Self::MissingStaticAnchor { kind } => {
                write!(f, "snapshot has no {kind:?} anchor")
            }
            Self::DuplicateStaticAnchor { kind } => {
                write!(f, "snapshot has more than one {kind:?} anchor")
            }
            Self::StaticAxisMismatch { id } => {
                write!(f, "static anchor {} has the wrong axis for its kind", id.get())
            }
            Self::InvalidEndpoints { anchor } => {
                write!(f, "anchor {} endpoints are not two distinct other anchors", anchor.get())
            }
            Self::DanglingEndpoint { anchor, endpoint } => write!(
                f,
                "anchor {} references missing endpoint {}",
                anchor.get(),
                endpoint.get()
            ),
            Self::ParallelEndpoint { anchor, endpoint } => write!(
                f,
                "anchor {} endpoint {} is parallel, not perpendicular",
                anchor.get(),
                endpoint.get()
            ),
            Self::DanglingFollowee { anchor, followee } => write!(
                f,
                "anchor {} follows missing anchor {}",
                anchor.get(),
                followee.get()
            ),
            Self::FollowerAxisMismatch { anchor, followee } => write!(
                f,
                "anchor {} follows perpendicular anchor {}",
                anchor.get(),
                followee.get()
            ),
            Self::FollowerCycle { anchor } => {
                write!(f, "anchor {} transitively follows itself", anchor.get())
            }
            Self::DanglingGroupAnchor { item, anchor } => write!(
                f,
                "item {} group references missing anchor {}",
                item.get(),
                anchor.get()
            ),
            Self::DanglingItemReference { anchor, item } => write!(
                f,
                "anchor {} references missing item {}",
                anchor.get(),
                item.get()
            ),
            Self::SideListMismatch { anchor, item } => write!(
                f,
                "anchor {} and item {} disagree about their adjacency",
                anchor.get(),
                item.get()
            ),
            Self::MissingRegistration { item, anchor } => write!(
                f,
                "item {} is not listed on its boundary anchor {}",
                item.get(),
                anchor.get()
            ),
            Self::LiveItemWithoutFrame { item } => {
                write!(f, "non-placeholder item {} carries no frame", item.get())
            }
            Self::DuplicateFrame { frame } => {
                write!(f, "frame {frame:?} occupies more than one cell")
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

impl Layout {
    /// Export the full graph as a stable record.
    #[must_use]
    pub fn to_snapshot(&self) -> LayoutSnapshot {
        let anchors = self
            .anchors()
            .map(|(id, anchor)| AnchorRec {
                id,
                axis: anchor.axis(),
                kind: anchor.kind(),
                position: anchor.position(),
                position_percentage: anchor.position_percentage(),
                from: anchor.from(),
                to: anchor.to(),
                follows: anchor.follows(),
                side1_items: anchor.items(Side::One).to_vec(),
                side2_items: anchor.items(Side::Two).to_vec(),
            })
            .collect();
        let items = self
            .items()
            .map(|(id, item)| ItemRec {
                id,
                geometry: item.geometry(),
                min_size: item.actual_min_size(),
                is_placeholder: item.is_placeholder(),
                frame: item
                    .frame()
                    .map(str::to_owned)
                    .or_else(|| self.restore_slots.frame_for(id).map(str::to_owned)),
                group: GroupRec {
                    left: item.group().left,
                    top: item.group().top,
                    right: item.group().right,
                    bottom: item.group().bottom,
                },
            })
            .collect();
        LayoutSnapshot {
            schema_version: LAYOUT_SNAPSHOT_SCHEMA_VERSION,
            size: self.size(),
            min_size: self.minimum_size(),
            anchors,
            items,
        }
    }

    /// Rebuild a layout from a snapshot.
    ///
    /// Anchors are recreated first so endpoint ids resolve, then items, then
    /// follower links; positions come straight from the records and one
    /// redistribution runs at the end. The host sees no geometry until the
    /// graph is complete.
    pub fn from_snapshot(
        snapshot: LayoutSnapshot,
        options: LayoutOptions,
        host: Box<dyn LayoutHost>,
    ) -> Result<Self, SnapshotError> {
        validate(&snapshot)?;

        let mut host = host;
        let mut anchors: BTreeMap<AnchorId, Anchor> = BTreeMap::new();
        let mut static_left = None;
        let mut static_top = None;
        let mut static_right = None;
        let mut static_bottom = None;
        for rec in &snapshot.anchors {
            let thickness = if rec.kind.is_static() {
                options.static_separator_thickness
            } else {
                options.separator_thickness
            };
            let mut anchor = Anchor::new(rec.axis, rec.kind, thickness, rec.from, rec.to);
            anchor.set_position(rec.position);
            anchor.set_position_percentage(rec.position_percentage);
            if !rec.kind.is_static() {
                anchor.set_separator(host.create_separator(rec.axis));
            }
            for &item in &rec.side1_items {
                anchor.add_item(item, Side::One);
            }
            for &item in &rec.side2_items {
                anchor.add_item(item, Side::Two);
            }
            anchors.insert(rec.id, anchor);
            match rec.kind {
                AnchorKind::StaticLeft => static_left = Some(rec.id),
                AnchorKind::StaticTop => static_top = Some(rec.id),
                AnchorKind::StaticRight => static_right = Some(rec.id),
                AnchorKind::StaticBottom => static_bottom = Some(rec.id),
                AnchorKind::Dynamic => {}
            }
        }
        // Follower links second, now that every anchor exists.
        for rec in &snapshot.anchors {
            if let Some(followee) = rec.follows {
                if let Some(anchor) = anchors.get_mut(&rec.id) {
                    anchor.set_follows(Some(followee));
                }
            }
        }

        let mut items: BTreeMap<ItemId, Item> = BTreeMap::new();
        let mut restore_slots = RestorePositions::default();
        for rec in &snapshot.items {
            let group = AnchorGroup {
                left: rec.group.left,
                top: rec.group.top,
                right: rec.group.right,
                bottom: rec.group.bottom,
            };
            let frame = if rec.is_placeholder {
                None
            } else {
                rec.frame.clone()
            };
            let mut item = Item::new(frame, rec.min_size, group);
            item.set_geometry(rec.geometry);
            if rec.is_placeholder {
                // A persisted placeholder is held by whoever saved it.
                item.retain();
            }
            if let Some(frame) = &rec.frame {
                restore_slots.record(frame, rec.id);
            }
            items.insert(rec.id, item);
        }

        let next_anchor = snapshot
            .anchors
            .iter()
            .map(|rec| rec.id.get())
            .max()
            .unwrap_or(0)
            + 1;
        let next_item = snapshot
            .items
            .iter()
            .map(|rec| rec.id.get())
            .max()
            .unwrap_or(0)
            + 1;

        let left = static_left.ok_or(SnapshotError::MissingStaticAnchor {
            kind: AnchorKind::StaticLeft,
        })?;
        let top = static_top.ok_or(SnapshotError::MissingStaticAnchor {
            kind: AnchorKind::StaticTop,
        })?;
        let right = static_right.ok_or(SnapshotError::MissingStaticAnchor {
            kind: AnchorKind::StaticRight,
        })?;
        let bottom = static_bottom.ok_or(SnapshotError::MissingStaticAnchor {
            kind: AnchorKind::StaticBottom,
        })?;

        let mut layout = Layout {
            options,
            host,
            size: snapshot.size,
            min_size: snapshot.min_size,
            anchors,
            items,
            left,
            top,
            right,
            bottom,
            next_anchor,
            next_item,
            resizing: false,
            restore_slots,
        };
        layout.redistribute();
        Ok(layout)
    }
}

fn validate(snapshot: &LayoutSnapshot) -> Result<(), SnapshotError> {
    if snapshot.schema_version != LAYOUT_SNAPSHOT_SCHEMA_VERSION {
        return Err(SnapshotError::UnsupportedSchemaVersion {
            version: snapshot.schema_version,
        });
    }

    let mut anchor_ids: BTreeSet<AnchorId> = BTreeSet::new();
    for rec in &snapshot.anchors {
        if rec.id.get() == 0 {
            return Err(SnapshotError::ZeroAnchorId);
        }
        if !anchor_ids.insert(rec.id) {
            return Err(SnapshotError::DuplicateAnchorId { id: rec.id });
        }
    }
    let mut item_ids: BTreeSet<ItemId> = BTreeSet::new();
    for rec in &snapshot.items {
        if rec.id.get() == 0 {
            return Err(SnapshotError::ZeroItemId);
        }
        if !item_ids.insert(rec.id) {
            return Err(SnapshotError::DuplicateItemId { id: rec.id });
        }
    }

    let by_id: BTreeMap<AnchorId, &AnchorRec> =
        snapshot.anchors.iter().map(|rec| (rec.id, rec)).collect();

    // Exactly one static anchor per edge, with the matching axis.
    for (kind, axis) in [
        (AnchorKind::StaticLeft, Axis::Vertical),
        (AnchorKind::StaticRight, Axis::Vertical),
        (AnchorKind::StaticTop, Axis::Horizontal),
        (AnchorKind::StaticBottom, Axis::Horizontal),
    ] {
        let mut found = None;
        for rec in snapshot.anchors.iter().filter(|rec| rec.kind == kind) {
            if found.is_some() {
                return Err(SnapshotError::DuplicateStaticAnchor { kind });
            }
            if rec.axis != axis {
                return Err(SnapshotError::StaticAxisMismatch { id: rec.id });
            }
            found = Some(rec.id);
        }
        if found.is_none() {
            return Err(SnapshotError::MissingStaticAnchor { kind });
        }
    }

    for rec in &snapshot.anchors {
        if rec.from == rec.to || rec.from == rec.id || rec.to == rec.id {
            return Err(SnapshotError::InvalidEndpoints { anchor: rec.id });
        }
        for endpoint in [rec.from, rec.to] {
            let Some(other) = by_id.get(&endpoint) else {
                return Err(SnapshotError::DanglingEndpoint {
                    anchor: rec.id,
                    endpoint,
                });
            };
            if other.axis == rec.axis {
                return Err(SnapshotError::ParallelEndpoint {
                    anchor: rec.id,
                    endpoint,
                });
            }
        }
        if let Some(followee) = rec.follows {
            let Some(other) = by_id.get(&followee) else {
                return Err(SnapshotError::DanglingFollowee {
                    anchor: rec.id,
                    followee,
                });
            };
            if other.axis != rec.axis {
                return Err(SnapshotError::FollowerAxisMismatch {
                    anchor: rec.id,
                    followee,
                });
            }
        }
    }

    // Follower chains must terminate.
    for rec in &snapshot.anchors {
        let mut current = rec.follows;
        let mut steps = 0;
        while let Some(next) = current {
            if next == rec.id {
                return Err(SnapshotError::FollowerCycle { anchor: rec.id });
            }
            steps += 1;
            if steps > snapshot.anchors.len() {
                return Err(SnapshotError::FollowerCycle { anchor: rec.id });
            }
            current = by_id.get(&next).and_then(|rec| rec.follows);
        }
    }

    let items_by_id: BTreeMap<ItemId, &ItemRec> =
        snapshot.items.iter().map(|rec| (rec.id, rec)).collect();

    let mut frames: BTreeSet<&str> = BTreeSet::new();
    for rec in &snapshot.items {
        if !rec.is_placeholder && rec.frame.is_none() {
            return Err(SnapshotError::LiveItemWithoutFrame { item: rec.id });
        }
        if !rec.is_placeholder {
            let frame = rec.frame.as_deref().unwrap_or_default();
            if !frames.insert(frame) {
                return Err(SnapshotError::DuplicateFrame {
                    frame: frame.to_owned(),
                });
            }
        }
        let group = [
            rec.group.left,
            rec.group.top,
            rec.group.right,
            rec.group.bottom,
        ];
        for anchor in group {
            if !by_id.contains_key(&anchor) {
                return Err(SnapshotError::DanglingGroupAnchor {
                    item: rec.id,
                    anchor,
                });
            }
        }
        // The item must be registered on all four boundaries.
        for (anchor, list_side1) in [
            (rec.group.left, false),
            (rec.group.top, false),
            (rec.group.right, true),
            (rec.group.bottom, true),
        ] {
            let Some(boundary) = by_id.get(&anchor) else {
                return Err(SnapshotError::DanglingGroupAnchor {
                    item: rec.id,
                    anchor,
                });
            };
            let listed = if list_side1 {
                boundary.side1_items.contains(&rec.id)
            } else {
                boundary.side2_items.contains(&rec.id)
            };
            if !listed {
                return Err(SnapshotError::MissingRegistration {
                    item: rec.id,
                    anchor,
                });
            }
        }
    }

    // Side lists reference real items and agree with their groups; this also
    // bounds every min-length walk the imported layout will run.
    for rec in &snapshot.anchors {
        for (list, side) in [(&rec.side1_items, Side::One), (&rec.side2_items, Side::Two)] {
            for item in list {
                let Some(item_rec) = items_by_id.get(item) else {
                    return Err(SnapshotError::DanglingItemReference {
                        anchor: rec.id,
                        item: *item,
                    });
                };
                let expected = match (rec.axis, side) {
                    (Axis::Vertical, Side::One) => item_rec.group.right,
                    (Axis::Vertical, Side::Two) => item_rec.group.left,
                    (Axis::Horizontal, Side::One) => item_rec.group.bottom,
                    (Axis::Horizontal, Side::Two) => item_rec.group.top,
                };
                if expected != rec.id {
                    return Err(SnapshotError::SideListMismatch {
                        anchor: rec.id,
                        item: *item,
                    });
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use dockline_core::Size;

    use super::{LayoutSnapshot, SnapshotError, LAYOUT_SNAPSHOT_SCHEMA_VERSION};
    use crate::host::NullHost;
    use crate::layout::{Layout, LayoutOptions};
    use crate::Location;

    fn sample() -> LayoutSnapshot {
        let mut layout = Layout::new(
            Size::new(400, 300),
            LayoutOptions::default(),
            Box::new(NullHost::default()),
        );
        layout.insert("a", Location::Top, None).expect("insert");
        layout.insert("b", Location::Right, Some("a")).expect("insert");
        layout.to_snapshot()
    }

    fn import(snapshot: LayoutSnapshot) -> Result<Layout, SnapshotError> {
        Layout::from_snapshot(
            snapshot,
            LayoutOptions::default(),
            Box::new(NullHost::default()),
        )
    }

    #[test]
    fn unknown_version_is_rejected() {
        let mut snapshot = sample();
        snapshot.schema_version = LAYOUT_SNAPSHOT_SCHEMA_VERSION + 1;
        assert!(matches!(
            import(snapshot),
            Err(SnapshotError::UnsupportedSchemaVersion { .. })
        ));
    }

    #[test]
    fn duplicate_anchor_id_is_rejected() {
        let mut snapshot = sample();
        let dup = snapshot.anchors[0].clone();
        snapshot.anchors.push(dup);
        assert!(matches!(
            import(snapshot),
            Err(SnapshotError::DuplicateAnchorId { .. })
        ));
    }

    #[test]
    fn dangling_endpoint_is_rejected() {
        let mut snapshot = sample();
        let missing = crate::anchor::AnchorId::new(999);
        let dynamic = snapshot
            .anchors
            .iter_mut()
            .find(|rec| rec.kind == crate::anchor::AnchorKind::Dynamic)
            .expect("dynamic anchor");
        dynamic.from = missing;
        assert!(matches!(
            import(snapshot),
            Err(SnapshotError::DanglingEndpoint { .. })
        ));
    }

    #[test]
    fn missing_static_anchor_is_rejected() {
        let mut snapshot = sample();
        snapshot
            .anchors
            .retain(|rec| rec.kind != crate::anchor::AnchorKind::StaticBottom);
        assert!(matches!(
            import(snapshot),
            Err(SnapshotError::MissingStaticAnchor { .. })
        ));
    }

    #[test]
    fn duplicate_frame_is_rejected() {
        let mut snapshot = sample();
        for rec in &mut snapshot.items {
            rec.frame = Some("same".into());
        }
        assert!(matches!(
            import(snapshot),
            Err(SnapshotError::DuplicateFrame { .. })
        ));
    }

    #[test]
    fn side_list_disagreement_is_rejected() {
        let mut snapshot = sample();
        let item = snapshot.items[0].id;
        let dynamic = snapshot
            .anchors
            .iter_mut()
            .find(|rec| rec.kind == crate::anchor::AnchorKind::Dynamic)
            .expect("dynamic anchor");
        dynamic.side1_items.clear();
        dynamic.side1_items.push(item);
        assert!(import(snapshot).is_err());
    }

    #[test]
    fn import_preserves_geometry_and_counts() {
        let snapshot = sample();
        let layout = import(snapshot.clone()).expect("import");
        assert_eq!(layout.count(), 2);
        assert_eq!(layout.visible_count(), 2);
        assert_eq!(layout.size(), snapshot.size);
        assert!(layout.check_sanity().is_clean());
    }
}
