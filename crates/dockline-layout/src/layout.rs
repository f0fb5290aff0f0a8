#![forbid(unsafe_code)]

//! The layout engine: owns every anchor and item, and performs insertion,
//! removal, resize redistribution, and minimum-size propagation.
//!
//! Anchors and items live in id-keyed arenas; every cross-reference in the
//! graph (anchor endpoints, side lists, group boundaries, follower links) is
//! an id, never an owning handle. All mutation happens through the layout so
//! the planarity invariant — each cell bounded by exactly four anchors — is
//! maintained in one place.

use std::collections::BTreeMap;
use std::fmt;

use dockline_core::{Axis, Point, Rect, Size};

use crate::anchor::{Anchor, AnchorId, AnchorKind, Side};
use crate::error::LayoutError;
use crate::group::AnchorGroup;
use crate::host::LayoutHost;
use crate::item::{Item, ItemId};
use crate::restore::RestorePositions;
use crate::sanity::{self, SanityReport};
use crate::Location;

/// No live frame may report a minimum size below this, regardless of its own
/// hint.
pub const MINIMUM_FRAME_SIZE: Size = Size::new(80, 90);

/// Fallback edge length for drop rectangles when the layout has no free
/// space; the insertion itself will grow the container instead.
pub(crate) const INDICATOR_MINIMUM_LENGTH: i32 = 100;

/// Separator thickness configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOptions {
    /// Thickness of draggable separators.
    pub separator_thickness: i32,
    /// Thickness of the four immovable border anchors.
    pub static_separator_thickness: i32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            separator_thickness: 5,
            static_separator_thickness: 1,
        }
    }
}

/// How much of a drop length lands on each side of the donor anchor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct DropLength {
    pub side1: i32,
    pub side2: i32,
}

impl DropLength {
    pub(crate) fn length(&self) -> i32 {
        self.side1 + self.side2
    }

    pub(crate) fn is_null(&self) -> bool {
        self.length() <= 0
    }
}

/// A recursive splitter: a rectangular container partitioned into cells by
/// vertical and horizontal anchors.
pub struct Layout {
    pub(crate) options: LayoutOptions,
    pub(crate) host: Box<dyn LayoutHost>,
    pub(crate) size: Size,
    pub(crate) min_size: Size,
    pub(crate) anchors: BTreeMap<AnchorId, Anchor>,
    pub(crate) items: BTreeMap<ItemId, Item>,
    pub(crate) left: AnchorId,
    pub(crate) top: AnchorId,
    pub(crate) right: AnchorId,
    pub(crate) bottom: AnchorId,
    pub(crate) next_anchor: u64,
    pub(crate) next_item: u64,
    pub(crate) resizing: bool,
    pub(crate) restore_slots: RestorePositions,
}

impl fmt::Debug for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Layout")
            .field("size", &self.size)
            .field("min_size", &self.min_size)
            .field("anchors", &self.anchors.len())
            .field("items", &self.items.len())
            .finish_non_exhaustive()
    }
}

impl Layout {
    /// Create an empty layout of the given size.
    ///
    /// The four static border anchors are created immediately and live as
    /// long as the layout. `size` is clamped to the empty-layout minimum.
    pub fn new(size: Size, options: LayoutOptions, host: Box<dyn LayoutHost>) -> Self {
        let st = options.static_separator_thickness;
        let min_size = Size::new(2 * st, 2 * st);
        let size = size.expanded_to(min_size);

        let left = AnchorId::new(1);
        let top = AnchorId::new(2);
        let right = AnchorId::new(3);
        let bottom = AnchorId::new(4);

        let mut anchors = BTreeMap::new();
        anchors.insert(
            left,
            Anchor::new(Axis::Vertical, AnchorKind::StaticLeft, st, top, bottom),
        );
        anchors.insert(
            top,
            Anchor::new(Axis::Horizontal, AnchorKind::StaticTop, st, left, right),
        );
        anchors.insert(
            right,
            Anchor::new(Axis::Vertical, AnchorKind::StaticRight, st, top, bottom),
        );
        anchors.insert(
            bottom,
            Anchor::new(Axis::Horizontal, AnchorKind::StaticBottom, st, left, right),
        );

        let mut layout = Self {
            options,
            host,
            size,
            min_size,
            anchors,
            items: BTreeMap::new(),
            left,
            top,
            right,
            bottom,
            next_anchor: 5,
            next_item: 1,
            resizing: false,
            restore_slots: RestorePositions::default(),
        };
        layout.pin_static_anchors();
        layout
    }

    // ------------------------------------------------------------------
    // Read-only surface
    // ------------------------------------------------------------------

    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    #[must_use]
    pub const fn minimum_size(&self) -> Size {
        self.min_size
    }

    #[must_use]
    pub const fn options(&self) -> LayoutOptions {
        self.options
    }

    /// The group formed by the four border anchors.
    #[must_use]
    pub const fn static_group(&self) -> AnchorGroup {
        AnchorGroup {
            left: self.left,
            top: self.top,
            right: self.right,
            bottom: self.bottom,
        }
    }

    /// The rectangle inside the border anchors.
    #[must_use]
    pub fn content_rect(&self) -> Rect {
        Rect::from_size(self.size).shrunk(self.options.static_separator_thickness)
    }

    /// Total number of cells, placeholders included.
    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Number of cells occupied by a frame.
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.items.values().filter(|it| !it.is_placeholder()).count()
    }

    /// Number of placeholder cells.
    #[must_use]
    pub fn placeholder_count(&self) -> usize {
        self.items.values().filter(|it| it.is_placeholder()).count()
    }

    pub fn items(&self) -> impl Iterator<Item = (ItemId, &Item)> {
        self.items.iter().map(|(&id, item)| (id, item))
    }

    pub fn anchors(&self) -> impl Iterator<Item = (AnchorId, &Anchor)> {
        self.anchors.iter().map(|(&id, anchor)| (id, anchor))
    }

    #[must_use]
    pub fn anchor(&self, id: AnchorId) -> Option<&Anchor> {
        self.anchors.get(&id)
    }

    #[must_use]
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// The live item holding `frame`, if any.
    #[must_use]
    pub fn item_for_frame(&self, frame: &str) -> Option<ItemId> {
        self.items
            .iter()
            .find(|(_, item)| item.frame() == Some(frame))
            .map(|(&id, _)| id)
    }

    /// The visible cell containing `point`. Placeholders never match.
    #[must_use]
    pub fn item_at(&self, point: Point) -> Option<ItemId> {
        self.items
            .iter()
            .find(|(_, item)| !item.is_placeholder() && item.geometry().contains(point))
            .map(|(&id, _)| id)
    }

    /// The anchor group around `point`: the containing cell's group, or the
    /// static group when the point is in no cell.
    #[must_use]
    pub fn anchors_for_pos(&self, point: Point) -> AnchorGroup {
        self.item_at(point)
            .and_then(|id| self.items.get(&id))
            .map_or_else(|| self.static_group(), |item| *item.group())
    }

    /// Run every structural invariant and return the findings.
    #[must_use]
    pub fn check_sanity(&self) -> SanityReport {
        sanity::build_report(self)
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    /// Insert a frame at `location`, relative to another frame's cell or to
    /// the whole layout.
    pub fn insert(
        &mut self,
        frame: impl Into<String>,
        location: Location,
        relative_to: Option<&str>,
    ) -> Result<ItemId, LayoutError> {
        let frame = frame.into();
        if self.item_for_frame(&frame).is_some() {
            return Err(LayoutError::AlreadyPresent { frame });
        }
        let relative_item = self.resolve_target(relative_to)?;
        // An explicit placement supersedes any stale placeholder.
        if let Some(stale) = self.restore_slots.forget(&frame) {
            if self
                .items
                .get(&stale)
                .is_some_and(|item| item.is_placeholder())
            {
                tracing::debug!(message = "layout.drop_stale_placeholder", frame = %frame);
                self.remove_item(stale);
            }
        }
        let min_size = self
            .host
            .frame_minimum_size_hint(&frame)
            .expanded_to(MINIMUM_FRAME_SIZE);

        let id = self.do_insert(Some(frame.clone()), min_size, location, relative_item);
        self.restore_slots.record(&frame, id);
        self.host.notify_visibility(&frame, true);
        Ok(id)
    }

    /// Insert a hidden, zero-sized cell for `frame`.
    ///
    /// The cell is created as a placeholder with one restorability reference,
    /// so a later [`restore`](Self::restore) brings the frame up in place.
    pub fn insert_placeholder(
        &mut self,
        frame: impl Into<String>,
        location: Location,
        relative_to: Option<&str>,
    ) -> Result<ItemId, LayoutError> {
        let frame = frame.into();
        if self.item_for_frame(&frame).is_some() {
            return Err(LayoutError::AlreadyPresent { frame });
        }
        let relative_item = self.resolve_target(relative_to)?;
        if let Some(stale) = self.restore_slots.forget(&frame) {
            if self
                .items
                .get(&stale)
                .is_some_and(|item| item.is_placeholder())
            {
                self.remove_item(stale);
            }
        }
        let id = self.do_insert(None, Size::default(), location, relative_item);
        if let Some(item) = self.items.get_mut(&id) {
            item.retain();
        }
        self.restore_slots.record(&frame, id);
        Ok(id)
    }

    fn resolve_target(&self, relative_to: Option<&str>) -> Result<Option<ItemId>, LayoutError> {
        match relative_to {
            None => Ok(None),
            Some(frame) => self
                .item_for_frame(frame)
                .map(Some)
                .ok_or_else(|| LayoutError::InvalidTarget {
                    frame: frame.to_owned(),
                }),
        }
    }

    fn do_insert(
        &mut self,
        frame: Option<String>,
        min_size: Size,
        location: Location,
        relative_to: Option<ItemId>,
    ) -> ItemId {
        if self.items.is_empty() {
            // First cell: fills the static group, no anchor is created.
            let group = self.static_group();
            let id = self.alloc_item(Item::new(frame, min_size, group));
            self.register_item_in_group(id, group);
            self.update_size_constraints();
            self.redistribute();
            return id;
        }

        let axis = location.anchor_axis();
        let target_group = relative_to
            .and_then(|rel| self.items.get(&rel))
            .map_or_else(|| self.static_group(), |item| *item.group());
        let reference_rect = relative_to
            .and_then(|rel| self.items.get(&rel))
            .map_or_else(|| self.content_rect(), Item::geometry);
        let donor = target_group.anchor_at(location);

        let mut lfd = self.length_for_drop(
            min_size.length(axis),
            location,
            donor,
            reference_rect.length(axis),
        );
        if lfd.is_null() {
            // No room anywhere: draw-at-minimum sentinel; the minimum-size
            // recomputation below grows the container.
            lfd.side1 = INDICATOR_MINIMUM_LENGTH / 2;
            lfd.side2 = INDICATOR_MINIMUM_LENGTH - lfd.side1;
        }
        let drop_rect = self.drop_rect(lfd, location, reference_rect);

        let new_anchor = self.create_anchor_from(target_group, location, relative_to);

        // Place the new anchor against the drop rectangle, and move the donor
        // when part of the length was carved from its far side.
        let t_new = self.options.separator_thickness;
        let (donor_static, donor_thickness) = self
            .anchors
            .get(&donor)
            .map_or((true, 0), |a| (a.is_static(), a.effective_thickness()));
        match location {
            Location::Left => {
                self.set_anchor_pos(new_anchor, drop_rect.right(), true);
                if !donor_static && lfd.side1 > 0 {
                    self.set_anchor_pos(donor, drop_rect.x - donor_thickness, true);
                }
            }
            Location::Top => {
                self.set_anchor_pos(new_anchor, drop_rect.bottom(), true);
                if !donor_static && lfd.side1 > 0 {
                    self.set_anchor_pos(donor, drop_rect.y - donor_thickness, true);
                }
            }
            Location::Right => {
                self.set_anchor_pos(new_anchor, drop_rect.x - t_new, true);
                if !donor_static && lfd.side2 > 0 {
                    self.set_anchor_pos(donor, drop_rect.right(), true);
                }
            }
            Location::Bottom => {
                self.set_anchor_pos(new_anchor, drop_rect.y - t_new, true);
                if !donor_static && lfd.side2 > 0 {
                    self.set_anchor_pos(donor, drop_rect.bottom(), true);
                }
            }
        }

        // A whole-layout insert replaces the donor along its entire span, so
        // perpendicular anchors that terminated at the donor now terminate at
        // the new anchor. Item-relative inserts keep the donor as the new
        // cell's far boundary; nothing perpendicular changes extent.
        if relative_to.is_none() {
            let perpendicular = axis.perpendicular();
            let ids: Vec<AnchorId> = self
                .anchors
                .iter()
                .filter(|(_, a)| !a.is_static() && a.axis() == perpendicular)
                .map(|(&id, _)| id)
                .collect();
            for id in ids {
                let Some(anchor) = self.anchors.get_mut(&id) else {
                    continue;
                };
                if anchor.from() == donor {
                    anchor.set_from(new_anchor);
                }
                if anchor.to() == donor {
                    anchor.set_to(new_anchor);
                }
            }
        }

        let mut group = target_group;
        group.set_anchor_at(location.opposite(), new_anchor);
        let mut item = Item::new(frame, min_size, group);
        item.set_geometry(drop_rect);
        let id = self.alloc_item(item);
        self.register_item_in_group(id, group);

        self.update_size_constraints();
        self.refresh_followers();
        self.redistribute();
        id
    }

    /// Split `location`'s boundary of `group` into a new dynamic anchor.
    ///
    /// The new anchor shares the donor's endpoints (drawn from the group's
    /// perpendicular pair). With `relative_to`, only that item migrates to
    /// the new anchor; otherwise the donor hands over everything.
    fn create_anchor_from(
        &mut self,
        group: AnchorGroup,
        location: Location,
        relative_to: Option<ItemId>,
    ) -> AnchorId {
        let donor = group.anchor_at(location);
        let axis = location.anchor_axis();
        let (from, to) = match axis {
            Axis::Vertical => (group.top, group.bottom),
            Axis::Horizontal => (group.left, group.right),
        };

        let separator = self.host.create_separator(axis);
        let mut anchor = Anchor::new(
            axis,
            AnchorKind::Dynamic,
            self.options.separator_thickness,
            from,
            to,
        );
        anchor.set_separator(separator);
        let id = self.alloc_anchor(anchor);

        match relative_to {
            Some(rel) => {
                let on_side = |side| {
                    self.anchors
                        .get(&donor)
                        .is_some_and(|a| a.contains_item(rel, side))
                };
                let side = if on_side(Side::One) {
                    Side::One
                } else if on_side(Side::Two) {
                    Side::Two
                } else {
                    tracing::warn!(
                        message = "layout.donor_missing_relative_item",
                        donor = donor.get(),
                        item = rel.get()
                    );
                    Side::One
                };
                if let Some(anchor) = self.anchors.get_mut(&donor) {
                    anchor.remove_item(rel);
                }
                if let Some(anchor) = self.anchors.get_mut(&id) {
                    anchor.add_item(rel, side);
                }
                if let Some(item) = self.items.get_mut(&rel) {
                    item.group_mut().replace(donor, id);
                }
            }
            None => {
                for side in [Side::One, Side::Two] {
                    let moved = self
                        .anchors
                        .get_mut(&donor)
                        .map_or_else(Vec::new, |anchor| anchor.take_items(side));
                    for item_id in moved {
                        if let Some(anchor) = self.anchors.get_mut(&id) {
                            anchor.add_item(item_id, side);
                        }
                        if let Some(item) = self.items.get_mut(&item_id) {
                            item.group_mut().replace(donor, id);
                        }
                    }
                }
            }
        }
        id
    }

    /// Register the item on all four boundaries: the cell sits on side 2 of
    /// its left/top anchors and side 1 of its right/bottom anchors.
    fn register_item_in_group(&mut self, item: ItemId, group: AnchorGroup) {
        for (anchor, side) in [
            (group.left, Side::Two),
            (group.top, Side::Two),
            (group.right, Side::One),
            (group.bottom, Side::One),
        ] {
            if let Some(a) = self.anchors.get_mut(&anchor) {
                a.add_item(item, side);
            }
        }
    }

    // ------------------------------------------------------------------
    // Removal and placeholders
    // ------------------------------------------------------------------

    /// Remove a frame from the layout.
    ///
    /// This doubles as the frame-destruction signal: hosts call it when a
    /// frame is closed or about to be deallocated. If the cell is held
    /// restorable (refcount > 0) it becomes a placeholder and the
    /// surrounding anchors collapse; otherwise the cell is deleted and
    /// unneeded anchors are coalesced away.
    pub fn remove(&mut self, frame: &str) -> Result<(), LayoutError> {
        let id = self
            .item_for_frame(frame)
            .ok_or_else(|| LayoutError::NotPresent {
                frame: frame.to_owned(),
            })?;
        let held = self
            .items
            .get(&id)
            .is_some_and(|item| item.ref_count() > 0);
        if held {
            self.to_placeholder(id);
        } else {
            self.restore_slots.forget(frame);
            self.remove_item(id);
        }
        Ok(())
    }

    /// Mark the frame's cell restorable: its refcount is incremented and the
    /// cell will survive [`remove`](Self::remove) as a placeholder.
    pub fn retain(&mut self, frame: &str) -> Result<(), LayoutError> {
        let id = self.slot_item(frame)?;
        if let Some(item) = self.items.get_mut(&id) {
            item.retain();
        }
        Ok(())
    }

    /// Give up one restorability reference. When the last reference to a
    /// placeholder is released, the cell is pruned.
    pub fn release(&mut self, frame: &str) -> Result<(), LayoutError> {
        let id = self.slot_item(frame)?;
        let Some(item) = self.items.get_mut(&id) else {
            return Ok(());
        };
        item.release();
        if item.ref_count() == 0 && item.is_placeholder() {
            self.restore_slots.forget(frame);
            self.remove_item(id);
        }
        Ok(())
    }

    fn slot_item(&self, frame: &str) -> Result<ItemId, LayoutError> {
        self.restore_slots
            .get(frame)
            .filter(|id| self.items.contains_key(id))
            .ok_or_else(|| LayoutError::NotPresent {
                frame: frame.to_owned(),
            })
    }

    /// Bring a closed frame back.
    ///
    /// The recorded placeholder is reused when it still exists; otherwise
    /// the frame is inserted as if new, at the right edge of the layout.
    pub fn restore(&mut self, frame: &str) -> Result<ItemId, LayoutError> {
        if self.item_for_frame(frame).is_some() {
            return Err(LayoutError::AlreadyPresent {
                frame: frame.to_owned(),
            });
        }
        let slot = self
            .restore_slots
            .get(frame)
            .filter(|id| self.items.get(id).is_some_and(Item::is_placeholder));
        match slot {
            Some(id) => {
                let min_size = self
                    .host
                    .frame_minimum_size_hint(frame)
                    .expanded_to(MINIMUM_FRAME_SIZE);
                if let Some(item) = self.items.get_mut(&id) {
                    item.set_frame(frame.to_owned(), min_size);
                }
                self.refresh_followers();
                self.update_size_constraints();
                self.redistribute();
                self.host.notify_visibility(frame, true);
                Ok(id)
            }
            None => self.insert(frame, Location::Right, None),
        }
    }

    fn to_placeholder(&mut self, id: ItemId) {
        let Some(item) = self.items.get_mut(&id) else {
            return;
        };
        let frame = item.take_frame();
        if let Some(frame) = frame {
            self.host.notify_visibility(&frame, false);
            self.restore_slots.record(&frame, id);
        }
        self.update_size_constraints();
        self.refresh_followers();
        self.redistribute();
    }

    /// Delete a cell and coalesce the anchors it leaves unneeded.
    fn remove_item(&mut self, id: ItemId) {
        let Some(item) = self.items.get(&id) else {
            return;
        };
        let group = *item.group();
        for anchor in group.ids() {
            if let Some(a) = self.anchors.get_mut(&anchor) {
                a.remove_item(id);
            }
        }
        self.items.remove(&id);
        self.restore_slots.prune_item(id);

        for location in [
            Location::Left,
            Location::Top,
            Location::Right,
            Location::Bottom,
        ] {
            let anchor = group.anchor_at(location);
            let Some(a) = self.anchors.get(&anchor) else {
                continue; // already consumed earlier in this pass
            };
            if a.is_static() || !a.is_unneeded() {
                continue;
            }
            let Some(opposite) = group.opposite_of(anchor) else {
                continue;
            };
            if opposite == anchor || !self.anchors.contains_key(&opposite) {
                continue;
            }
            self.consume(opposite, anchor);
        }

        self.update_size_constraints();
        self.refresh_followers();
        self.redistribute();
    }

    /// Transfer everything from `source` onto `target` and delete `source`.
    ///
    /// Items keep their sides; groups, perpendicular endpoints, and follower
    /// links that referenced `source` are retargeted so no dangling id
    /// survives the merge.
    fn consume(&mut self, target: AnchorId, source: AnchorId) {
        debug_assert_ne!(target, source);
        for side in [Side::One, Side::Two] {
            let moved = self
                .anchors
                .get_mut(&source)
                .map_or_else(Vec::new, |anchor| anchor.take_items(side));
            for item_id in moved {
                if let Some(anchor) = self.anchors.get_mut(&target) {
                    anchor.add_item(item_id, side);
                }
                if let Some(item) = self.items.get_mut(&item_id) {
                    item.group_mut().replace(source, target);
                }
            }
        }

        let ids: Vec<AnchorId> = self.anchors.keys().copied().collect();
        for id in ids {
            if id == source {
                continue;
            }
            let follows = self.anchors.get(&id).and_then(Anchor::follows);
            if follows == Some(source) {
                let redirect = (id != target && !self.follow_would_cycle(id, target))
                    .then_some(target);
                if let Some(anchor) = self.anchors.get_mut(&id) {
                    anchor.set_follows(redirect);
                }
            }
            if let Some(anchor) = self.anchors.get_mut(&id) {
                if anchor.from() == source {
                    anchor.set_from(target);
                }
                if anchor.to() == source {
                    anchor.set_to(target);
                }
            }
        }
        self.anchors.remove(&source);
    }

    // ------------------------------------------------------------------
    // Resize, drag, redistribution
    // ------------------------------------------------------------------

    /// Resize the container. The size silently clamps to the layout minimum;
    /// anchors keep their cached proportions.
    pub fn resize(&mut self, new_size: Size) {
        let clamped = new_size.expanded_to(self.min_size);
        if clamped == self.size {
            return;
        }
        self.size = clamped;
        self.redistribute();
    }

    /// Drag a separator to `position`.
    ///
    /// The move is clamped so no item on either side is squeezed below its
    /// minimum length. This is the user-initiated path: the anchor's cached
    /// percentage is recalculated.
    pub fn set_anchor_position(
        &mut self,
        id: AnchorId,
        position: i32,
    ) -> Result<(), LayoutError> {
        let anchor = self
            .anchors
            .get(&id)
            .ok_or(LayoutError::AnchorNotFound { id })?;
        if anchor.is_static() || anchor.is_following() {
            return Err(LayoutError::ImmovableAnchor { id });
        }
        let current = anchor.position();
        let squeeze1 = self.smallest_available_item_squeeze(id, Side::One).unwrap_or(0);
        let squeeze2 = self.smallest_available_item_squeeze(id, Side::Two).unwrap_or(0);
        let clamped = position
            .max(current - squeeze1)
            .min(current + squeeze2);
        self.set_anchor_pos(id, clamped, true);

        // Anchors collapsed onto this one ride along; recompute everything
        // they touch.
        let carried = self
            .anchors
            .iter()
            .filter(|(_, a)| a.is_following())
            .map(|(&follower, _)| follower)
            .any(|follower| self.end_followee(follower) == id);
        if carried {
            self.apply_follower_positions();
            self.commit();
            return Ok(());
        }

        // Only the adjacent cells change: side-1 items end at the anchor,
        // side-2 items start past its separator.
        let Some(anchor) = self.anchors.get(&id) else {
            return Ok(());
        };
        let axis = anchor.axis();
        let thickness = anchor.effective_thickness();
        let side1 = anchor.items(Side::One).to_vec();
        let side2 = anchor.items(Side::Two).to_vec();
        for (list, edge, side) in [
            (side1, clamped, Side::Two),
            (side2, clamped + thickness, Side::One),
        ] {
            for item_id in list {
                let Some(item) = self.items.get_mut(&item_id) else {
                    continue;
                };
                item.set_pos(edge, axis, side);
                let rect = item.geometry();
                if let Some(frame) = item.frame().map(str::to_owned) {
                    self.host.notify_geometry(&frame, rect);
                }
            }
        }
        Ok(())
    }

    /// Smallest `length − min_length` over the side's live items: how far the
    /// anchor may travel toward that side without violating a minimum.
    pub(crate) fn smallest_available_item_squeeze(
        &self,
        id: AnchorId,
        side: Side,
    ) -> Option<i32> {
        let anchor = self.anchors.get(&id)?;
        let axis = anchor.axis();
        anchor
            .items(side)
            .iter()
            .filter_map(|item_id| self.items.get(item_id))
            .filter(|item| !item.is_placeholder())
            .map(|item| item.length(axis) - item.min_length(axis))
            .min()
    }

    /// Reposition every anchor from its cached proportion, then commit cell
    /// rectangles. Reentrant calls are no-ops.
    pub fn redistribute(&mut self) {
        if self.resizing {
            tracing::warn!(message = "layout.redistribute_reentry");
            return;
        }
        self.resizing = true;
        self.redistribute_axis(Axis::Vertical);
        self.redistribute_axis(Axis::Horizontal);
        self.apply_follower_positions();
        self.resizing = false;
        self.commit();
    }

    fn pin_static_anchors(&mut self) {
        let st = self.options.static_separator_thickness;
        let width = self.size.width;
        let height = self.size.height;
        for (id, position, len) in [
            (self.left, 0, width),
            (self.right, width - st, width),
            (self.top, 0, height),
            (self.bottom, height - st, height),
        ] {
            let Some(anchor) = self.anchors.get_mut(&id) else {
                continue;
            };
            anchor.set_position(position);
            if len > 0 {
                anchor.set_position_percentage(f64::from(position) / f64::from(len));
            }
        }
    }

    fn redistribute_axis(&mut self, axis: Axis) {
        let container_len = self.size.length(axis);
        self.pin_static_anchors();

        let mut order: Vec<(i32, AnchorId)> = self
            .anchors
            .iter()
            .filter(|(_, a)| !a.is_static() && !a.is_following() && a.axis() == axis)
            .map(|(&id, a)| (a.position(), id))
            .collect();
        order.sort_unstable();

        for (_, id) in order {
            let Some(anchor) = self.anchors.get(&id) else {
                continue;
            };
            let target =
                (anchor.position_percentage() * f64::from(container_len)).round() as i32;
            let thickness = anchor.thickness();
            let side1: Vec<ItemId> = anchor.items(Side::One).to_vec();
            let min_position = self.cumulative_min_length(id, Side::One) - thickness;
            let max_position = container_len - self.cumulative_min_length(id, Side::Two);

            // Anchors already placed on side 1 push this one further along
            // the travel direction when the percentage target would overlap
            // their items' minimums.
            let mut bound = min_position;
            for item_id in side1 {
                let Some(item) = self.items.get(&item_id) else {
                    continue;
                };
                if item.is_placeholder() {
                    continue;
                }
                let boundary = item.group().anchor_at_side(Side::One, axis);
                bound = bound.max(self.boundary_edge(boundary) + item.min_length(axis));
            }

            let position = target.min(max_position).max(bound);
            self.set_anchor_pos(id, position, false);
        }
    }

    /// The coordinate where content on side 2 of the anchor begins.
    fn boundary_edge(&self, id: AnchorId) -> i32 {
        let leader = self.end_followee(id);
        let position = self.anchors.get(&leader).map_or(0, Anchor::position);
        let thickness = self.anchors.get(&id).map_or(0, Anchor::effective_thickness);
        position + thickness
    }

    fn apply_follower_positions(&mut self) {
        let followers: Vec<AnchorId> = self
            .anchors
            .iter()
            .filter(|(_, a)| a.is_following())
            .map(|(&id, _)| id)
            .collect();
        for id in followers {
            let leader = self.end_followee(id);
            let Some(position) = self.anchors.get(&leader).map(Anchor::position) else {
                continue;
            };
            if let Some(anchor) = self.anchors.get_mut(&id) {
                anchor.set_position(position);
            }
        }
    }

    /// Resolve a follower chain to its terminal anchor (`id` itself when not
    /// following).
    #[must_use]
    pub fn end_followee(&self, id: AnchorId) -> AnchorId {
        let mut current = id;
        for _ in 0..self.anchors.len() {
            match self.anchors.get(&current).and_then(Anchor::follows) {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    fn follow_would_cycle(&self, anchor: AnchorId, leader: AnchorId) -> bool {
        let mut current = leader;
        for _ in 0..=self.anchors.len() {
            if current == anchor {
                return true;
            }
            match self.anchors.get(&current).and_then(Anchor::follows) {
                Some(next) => current = next,
                None => return false,
            }
        }
        true
    }

    /// Re-derive every follower link from placeholder adjacency: an anchor
    /// whose entire side is placeholders collapses onto the far boundary of
    /// that placeholder run.
    fn refresh_followers(&mut self) {
        let ids: Vec<AnchorId> = self
            .anchors
            .iter()
            .filter(|(_, a)| !a.is_static())
            .map(|(&id, _)| id)
            .collect();
        for id in ids {
            let link = match self.desired_followee(id) {
                Some(leader) => {
                    if self.anchors.get(&id).and_then(Anchor::follows) == Some(leader) {
                        continue;
                    }
                    if self.follow_would_cycle(id, leader) {
                        tracing::warn!(
                            message = "layout.follower_cycle_rejected",
                            anchor = id.get(),
                            leader = leader.get()
                        );
                        None
                    } else {
                        Some(leader)
                    }
                }
                None => None,
            };
            if let Some(anchor) = self.anchors.get_mut(&id) {
                anchor.set_follows(link);
            }
        }
    }

    fn desired_followee(&self, id: AnchorId) -> Option<AnchorId> {
        let anchor = self.anchors.get(&id)?;
        let axis = anchor.axis();
        for side in [Side::Two, Side::One] {
            let items = anchor.items(side);
            let all_placeholders = !items.is_empty()
                && items.iter().all(|item| {
                    self.items.get(item).is_some_and(Item::is_placeholder)
                });
            if !all_placeholders {
                continue;
            }
            // Collapse onto the nearest far boundary of the placeholder run.
            let mut best: Option<(i32, AnchorId)> = None;
            for &item_id in items {
                let Some(item) = self.items.get(&item_id) else {
                    continue;
                };
                let far = item.group().anchor_at_side(side, axis);
                if far == id {
                    continue;
                }
                let Some(position) = self.anchors.get(&far).map(Anchor::position) else {
                    continue;
                };
                let closer = match (side, best) {
                    (_, None) => true,
                    (Side::Two, Some((bp, _))) => position < bp,
                    (Side::One, Some((bp, _))) => position > bp,
                };
                if closer {
                    best = Some((position, far));
                }
            }
            if let Some((_, far)) = best {
                return Some(far);
            }
        }
        None
    }

    fn set_anchor_pos(&mut self, id: AnchorId, position: i32, recalculate_percentage: bool) {
        let Some(axis) = self.anchors.get(&id).map(Anchor::axis) else {
            return;
        };
        let container_len = self.size.length(axis);
        let resizing = self.resizing;
        if let Some(anchor) = self.anchors.get_mut(&id) {
            anchor.set_position(position);
            if recalculate_percentage && !resizing && container_len > 0 {
                anchor.set_position_percentage(f64::from(position) / f64::from(container_len));
            }
        }
    }

    pub(crate) fn commit(&mut self) {
        let rects: Vec<(ItemId, Rect)> = self
            .items
            .iter()
            .map(|(&id, item)| (id, item.group().rect(&self.anchors)))
            .collect();
        for (id, rect) in rects {
            let Some(item) = self.items.get_mut(&id) else {
                continue;
            };
            item.set_geometry(rect);
            if let Some(frame) = item.frame().map(str::to_owned) {
                self.host.notify_geometry(&frame, rect);
            }
        }
    }

    // ------------------------------------------------------------------
    // Minimum sizes and drop geometry
    // ------------------------------------------------------------------

    /// Minimum container thickness from this anchor toward `side`.
    ///
    /// Walks every item chain through its far anchor and keeps the worst
    /// path. Placeholders contribute no length but the anchors they cross
    /// still count their thickness, followers included.
    pub(crate) fn cumulative_min_length(&self, id: AnchorId, side: Side) -> i32 {
        self.cumulative_min_length_bounded(id, side, self.anchors.len())
    }

    fn cumulative_min_length_bounded(&self, id: AnchorId, side: Side, depth: usize) -> i32 {
        let Some(anchor) = self.anchors.get(&id) else {
            return 0;
        };
        if depth == 0 {
            tracing::warn!(message = "layout.min_length_walk_depth_exceeded", anchor = id.get());
            return anchor.thickness();
        }
        let axis = anchor.axis();
        let mut best = 0;
        for &item_id in anchor.items(side) {
            let Some(item) = self.items.get(&item_id) else {
                continue;
            };
            let length = if item.is_placeholder() {
                0
            } else {
                item.min_length(axis)
            };
            let far = item.group().anchor_at_side(side, axis);
            if far == id {
                continue;
            }
            best = best.max(length + self.cumulative_min_length_bounded(far, side, depth - 1));
        }
        anchor.thickness() + best
    }

    /// Recompute the layout minimum from the static anchors inward; grow the
    /// container when the minimum no longer fits.
    fn update_size_constraints(&mut self) {
        let st = self.options.static_separator_thickness;
        let min = if self.items.is_empty() {
            Size::new(2 * st, 2 * st)
        } else {
            Size::new(
                self.cumulative_min_length(self.left, Side::Two),
                self.cumulative_min_length(self.top, Side::Two),
            )
        };
        if min != self.min_size {
            self.min_size = min;
            self.host.notify_minimum_size_changed(min);
        }
        let grown = self.size.expanded_to(min);
        if grown != self.size {
            self.size = grown;
        }
    }

    /// Drop rectangle for dragging `frame` to `location`, for indicator UIs.
    pub fn rect_for_drop(
        &self,
        frame: &str,
        location: Location,
        relative_to: Option<&str>,
    ) -> Result<Rect, LayoutError> {
        if self.items.is_empty() {
            return Ok(self.content_rect());
        }
        let relative_item = self.resolve_target(relative_to)?;
        let axis = location.anchor_axis();
        let min_size = self
            .host
            .frame_minimum_size_hint(frame)
            .expanded_to(MINIMUM_FRAME_SIZE);
        let target_group = relative_item
            .and_then(|rel| self.items.get(&rel))
            .map_or_else(|| self.static_group(), |item| *item.group());
        let reference_rect = relative_item
            .and_then(|rel| self.items.get(&rel))
            .map_or_else(|| self.content_rect(), Item::geometry);
        let donor = target_group.anchor_at(location);
        let mut lfd = self.length_for_drop(
            min_size.length(axis),
            location,
            donor,
            reference_rect.length(axis),
        );
        if lfd.is_null() {
            lfd.side1 = INDICATOR_MINIMUM_LENGTH / 2;
            lfd.side2 = INDICATOR_MINIMUM_LENGTH - lfd.side1;
        }
        Ok(self.drop_rect(lfd, location, reference_rect))
    }

    /// Split the requested drop length across the donor's sides.
    ///
    /// Availability on each side is what the region can shed before hitting
    /// cumulative minimums; the carve prefers the side the new cell lands on
    /// and spills the rest across the donor.
    fn length_for_drop(
        &self,
        needed_min: i32,
        location: Location,
        donor: AnchorId,
        reference_len: i32,
    ) -> DropLength {
        let axis = location.anchor_axis();
        let container_len = self.size.length(axis);
        let Some(thickness) = self.anchors.get(&donor).map(Anchor::thickness) else {
            return DropLength::default();
        };
        let leader = self.end_followee(donor);
        let position = self.anchors.get(&leader).map_or(0, Anchor::position);
        let t_new = self.options.separator_thickness;

        let avail1 =
            (position - (self.cumulative_min_length(donor, Side::One) - thickness)).max(0);
        let avail2 =
            ((container_len - position) - self.cumulative_min_length(donor, Side::Two)).max(0);
        let total = avail1 + avail2 - t_new;

        // Half the reference span, minus the separator the split introduces,
        // so both sides of a fresh split come out equal.
        let desired = needed_min.max((reference_len - t_new) / 2);
        let mut length = desired.min(total);
        if length < needed_min {
            // Never shrink the incoming cell below its floor; the container
            // grows instead.
            length = needed_min;
        }
        if length <= 0 {
            return DropLength::default();
        }
        match location.side() {
            // New cell lands on the donor's side 2 (left/top inserts).
            Side::One => {
                let side2 = length.min((avail2 - t_new).max(0));
                DropLength {
                    side1: length - side2,
                    side2,
                }
            }
            // New cell lands on the donor's side 1 (right/bottom inserts).
            Side::Two => {
                let side1 = length.min(avail1);
                DropLength {
                    side1,
                    side2: length - side1,
                }
            }
        }
    }

    fn drop_rect(&self, lfd: DropLength, location: Location, reference: Rect) -> Rect {
        let s1 = lfd.side1;
        let length = lfd.length();
        let t_new = if self.items.is_empty() {
            0
        } else {
            self.options.separator_thickness
        };
        let st = self.options.static_separator_thickness;

        match location {
            Location::Left => Rect::new(
                (reference.x - s1).max(0),
                reference.y,
                length,
                reference.height,
            ),
            Location::Top => Rect::new(
                reference.x,
                (reference.y - s1).max(0),
                reference.width,
                length,
            ),
            Location::Right => {
                let x = (reference.right() - s1 + t_new)
                    .min(self.size.width - length - st);
                Rect::new(x, reference.y, length, reference.height)
            }
            Location::Bottom => {
                let y = (reference.bottom() - s1 + t_new)
                    .min(self.size.height - length - st);
                Rect::new(reference.x, y, reference.width, length)
            }
        }
    }

    // ------------------------------------------------------------------
    // Arena plumbing
    // ------------------------------------------------------------------

    fn alloc_anchor(&mut self, anchor: Anchor) -> AnchorId {
        let id = AnchorId::new(self.next_anchor);
        self.next_anchor += 1;
        self.anchors.insert(id, anchor);
        id
    }

    fn alloc_item(&mut self, item: Item) -> ItemId {
        let id = ItemId::new(self.next_item);
        self.next_item += 1;
        self.items.insert(id, item);
        id
    }
}

#[cfg(test)]
mod tests {
    use dockline_core::{Point, Rect, Size};

    use super::{Layout, LayoutOptions, MINIMUM_FRAME_SIZE};
    use crate::anchor::Side;
    use crate::host::NullHost;
    use crate::{LayoutError, Location};

    fn layout(width: i32, height: i32) -> Layout {
        Layout::new(
            Size::new(width, height),
            LayoutOptions::default(),
            Box::new(NullHost::default()),
        )
    }

    #[test]
    fn first_insert_fills_the_content_rect() {
        let mut layout = layout(200, 200);
        let id = layout.insert("a", Location::Top, None).expect("insert");
        assert_eq!(layout.count(), 1);
        assert_eq!(layout.visible_count(), 1);
        assert_eq!(layout.item(id).unwrap().geometry(), Rect::new(1, 1, 198, 198));
        assert_eq!(
            layout.anchors().filter(|(_, a)| !a.is_static()).count(),
            0
        );
    }

    #[test]
    fn insert_rejects_duplicates_and_bad_targets() {
        let mut layout = layout(400, 400);
        layout.insert("a", Location::Top, None).expect("insert");
        assert!(matches!(
            layout.insert("a", Location::Left, None),
            Err(LayoutError::AlreadyPresent { .. })
        ));
        assert!(matches!(
            layout.insert("b", Location::Left, Some("ghost")),
            Err(LayoutError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn right_split_halves_the_target() {
        let mut layout = layout(400, 400);
        let a = layout.insert("a", Location::Top, None).expect("insert");
        let b = layout
            .insert("b", Location::Right, Some("a"))
            .expect("insert");
        assert_eq!(layout.visible_count(), 2);
        assert_eq!(
            layout.anchors().filter(|(_, a)| !a.is_static()).count(),
            1
        );
        let ra = layout.item(a).unwrap().geometry();
        let rb = layout.item(b).unwrap().geometry();
        assert!((ra.width - rb.width).abs() <= 1, "{ra:?} vs {rb:?}");
        assert_eq!(ra.height, rb.height);
        assert_eq!(ra.y, rb.y);
        assert!(ra.right() < rb.x);
        assert!(layout.check_sanity().is_clean(), "{:?}", layout.check_sanity());
    }

    #[test]
    fn min_size_hint_is_floored() {
        let mut layout = layout(400, 400);
        let a = layout.insert("a", Location::Top, None).expect("insert");
        assert_eq!(
            layout.item(a).unwrap().min_size(),
            MINIMUM_FRAME_SIZE
        );
    }

    #[test]
    fn minimum_size_tracks_worst_path() {
        let mut layout = layout(400, 400);
        layout.insert("a", Location::Top, None).expect("insert");
        layout
            .insert("b", Location::Right, Some("a"))
            .expect("insert");
        // 80 + 80 minimums, one dynamic anchor, two static borders.
        assert_eq!(layout.minimum_size().width, 1 + 80 + 5 + 80 + 1);
        assert_eq!(layout.minimum_size().height, 1 + 90 + 1);
    }

    #[test]
    fn cumulative_min_counts_placeholder_anchors_but_not_lengths() {
        let mut layout = layout(400, 400);
        layout.insert("a", Location::Top, None).expect("insert");
        layout
            .insert("b", Location::Right, Some("a"))
            .expect("insert");
        layout.retain("b").expect("retain");
        layout.remove("b").expect("remove");
        // The placeholder contributes zero length, yet its dynamic anchor
        // still costs its thickness on the walk.
        assert_eq!(layout.minimum_size().width, 1 + 80 + 5 + 0 + 1);
        assert_eq!(layout.placeholder_count(), 1);
    }

    #[test]
    fn drag_clamps_to_item_minimums() {
        let mut layout = layout(400, 400);
        layout.insert("a", Location::Top, None).expect("insert");
        layout
            .insert("b", Location::Right, Some("a"))
            .expect("insert");
        let (anchor, position) = layout
            .anchors()
            .find(|(_, a)| !a.is_static())
            .map(|(id, a)| (id, a.position()))
            .expect("one dynamic anchor");

        layout.set_anchor_position(anchor, 0).expect("drag");
        let after = layout.anchor(anchor).unwrap().position();
        assert_eq!(after, 1 + 80, "left item stops at its minimum width");
        assert!(after < position);
        assert!(layout.check_sanity().is_clean());
    }

    #[test]
    fn drag_rejects_static_anchors() {
        let mut layout = layout(200, 200);
        layout.insert("a", Location::Top, None).expect("insert");
        let left = layout.static_group().left;
        assert!(matches!(
            layout.set_anchor_position(left, 10),
            Err(LayoutError::ImmovableAnchor { .. })
        ));
    }

    #[test]
    fn item_at_skips_placeholders() {
        let mut layout = layout(400, 400);
        layout.insert("a", Location::Top, None).expect("insert");
        layout
            .insert("b", Location::Right, Some("a"))
            .expect("insert");
        layout.retain("b").expect("retain");
        layout.remove("b").expect("remove");

        let hit = layout.item_at(Point::new(300, 200)).expect("a expands");
        assert_eq!(layout.item(hit).unwrap().frame(), Some("a"));
        assert_eq!(layout.anchors_for_pos(Point::new(300, 200)), *layout.item(hit).unwrap().group());
    }

    #[test]
    fn squeeze_ignores_placeholders() {
        let mut layout = layout(400, 400);
        layout.insert("a", Location::Top, None).expect("insert");
        layout
            .insert("b", Location::Right, Some("a"))
            .expect("insert");
        let anchor = layout
            .anchors()
            .find(|(_, a)| !a.is_static())
            .map(|(id, _)| id)
            .expect("one dynamic anchor");
        layout.retain("b").expect("retain");
        layout.remove("b").expect("remove");
        assert_eq!(layout.smallest_available_item_squeeze(anchor, Side::Two), None);
    }
}
