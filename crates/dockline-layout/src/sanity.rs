#![forbid(unsafe_code)]

//! Structural invariant checking.
//!
//! [`build_report`] walks the whole anchor/item graph and returns one finding
//! per violation. The engine never auto-repairs: findings are for tests and
//! debug tooling, and a healthy layout reports none after every operation.

use serde::{Deserialize, Serialize};

use crate::anchor::{AnchorId, Side};
use crate::item::ItemId;
use crate::layout::Layout;

/// Severity of one finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanitySeverity {
    Error,
    Warning,
}

/// Stable code for one kind of finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SanityCode {
    MissingStaticAnchor,
    InvalidAnchorEndpoints,
    DanglingItemReference,
    SideListMismatch,
    DanglingGroupAnchor,
    GeometryMismatch,
    MinimumSizeViolation,
    UnneededAnchor,
    DanglingFollowee,
    FollowerCycle,
    MinimumSizeOverflow,
    AnchorOverlap,
}

/// One actionable finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanityIssue {
    pub code: SanityCode,
    pub severity: SanitySeverity,
    pub anchor: Option<AnchorId>,
    pub item: Option<ItemId>,
    pub message: String,
}

/// Full structural diagnosis of a layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SanityReport {
    pub issues: Vec<SanityIssue>,
}

impl SanityReport {
    /// True when no findings were recorded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    /// True when any error-level finding exists.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == SanitySeverity::Error)
    }
}

fn issue(
    report: &mut SanityReport,
    code: SanityCode,
    severity: SanitySeverity,
    anchor: Option<AnchorId>,
    item: Option<ItemId>,
    message: String,
) {
    report.issues.push(SanityIssue {
        code,
        severity,
        anchor,
        item,
        message,
    });
}

pub(crate) fn build_report(layout: &Layout) -> SanityReport {
    let mut report = SanityReport::default();

    check_static_anchors(layout, &mut report);
    check_anchor_endpoints(layout, &mut report);
    check_side_lists(layout, &mut report);
    check_items(layout, &mut report);
    check_followers(layout, &mut report);
    check_minimums(layout, &mut report);
    check_overlaps(layout, &mut report);

    report
}

fn check_static_anchors(layout: &Layout, report: &mut SanityReport) {
    for (id, name) in [
        (layout.left, "left"),
        (layout.top, "top"),
        (layout.right, "right"),
        (layout.bottom, "bottom"),
    ] {
        match layout.anchors.get(&id) {
            Some(anchor) if anchor.is_static() => {}
            _ => issue(
                report,
                SanityCode::MissingStaticAnchor,
                SanitySeverity::Error,
                Some(id),
                None,
                format!("static {name} anchor {} is missing or not static", id.get()),
            ),
        }
    }
    let static_count = layout.anchors.values().filter(|a| a.is_static()).count();
    if static_count != 4 {
        issue(
            report,
            SanityCode::MissingStaticAnchor,
            SanitySeverity::Error,
            None,
            None,
            format!("expected 4 static anchors, found {static_count}"),
        );
    }
}

fn check_anchor_endpoints(layout: &Layout, report: &mut SanityReport) {
    for (id, anchor) in layout.anchors() {
        if !anchor.is_valid(id) {
            issue(
                report,
                SanityCode::InvalidAnchorEndpoints,
                SanitySeverity::Error,
                Some(id),
                None,
                format!(
                    "anchor {} has endpoints from={} to={}",
                    id.get(),
                    anchor.from().get(),
                    anchor.to().get()
                ),
            );
            continue;
        }
        for endpoint in [anchor.from(), anchor.to()] {
            match layout.anchors.get(&endpoint) {
                None => issue(
                    report,
                    SanityCode::InvalidAnchorEndpoints,
                    SanitySeverity::Error,
                    Some(id),
                    None,
                    format!("anchor {} endpoint {} does not exist", id.get(), endpoint.get()),
                ),
                Some(other) if other.axis() == anchor.axis() => issue(
                    report,
                    SanityCode::InvalidAnchorEndpoints,
                    SanitySeverity::Error,
                    Some(id),
                    None,
                    format!(
                        "anchor {} endpoint {} is parallel, not perpendicular",
                        id.get(),
                        endpoint.get()
                    ),
                ),
                Some(_) => {}
            }
        }
    }
}

fn check_side_lists(layout: &Layout, report: &mut SanityReport) {
    for (id, anchor) in layout.anchors() {
        if !anchor.is_static() && anchor.is_unneeded() {
            issue(
                report,
                SanityCode::UnneededAnchor,
                SanitySeverity::Error,
                Some(id),
                None,
                format!("dynamic anchor {} has an empty side", id.get()),
            );
        }
        for side in [Side::One, Side::Two] {
            for &item_id in anchor.items(side) {
                let Some(item) = layout.items.get(&item_id) else {
                    issue(
                        report,
                        SanityCode::DanglingItemReference,
                        SanitySeverity::Error,
                        Some(id),
                        Some(item_id),
                        format!(
                            "anchor {} references missing item {}",
                            id.get(),
                            item_id.get()
                        ),
                    );
                    continue;
                };
                // An item on side 2 of a vertical anchor has that anchor as
                // its left boundary, and so on around the compass.
                let expected = item.group().anchor_at_side(side.opposite(), anchor.axis());
                if expected != id {
                    issue(
                        report,
                        SanityCode::SideListMismatch,
                        SanitySeverity::Error,
                        Some(id),
                        Some(item_id),
                        format!(
                            "anchor {} lists item {} but the item's boundary there is {}",
                            id.get(),
                            item_id.get(),
                            expected.get()
                        ),
                    );
                }
            }
        }
    }
}

fn check_items(layout: &Layout, report: &mut SanityReport) {
    for (id, item) in layout.items() {
        let group = item.group();
        let mut group_ok = true;
        for anchor in group.ids() {
            if !layout.anchors.contains_key(&anchor) {
                group_ok = false;
                issue(
                    report,
                    SanityCode::DanglingGroupAnchor,
                    SanitySeverity::Error,
                    Some(anchor),
                    Some(id),
                    format!(
                        "item {} group references missing anchor {}",
                        id.get(),
                        anchor.get()
                    ),
                );
            }
        }
        if !group_ok {
            continue;
        }
        let derived = group.rect(&layout.anchors);
        if derived != item.geometry() {
            issue(
                report,
                SanityCode::GeometryMismatch,
                SanitySeverity::Error,
                None,
                Some(id),
                format!(
                    "item {} geometry {:?} differs from its anchors' {:?}",
                    id.get(),
                    item.geometry(),
                    derived
                ),
            );
        }
        if !item.is_placeholder() {
            let min = item.min_size();
            let rect = item.geometry();
            if rect.width < min.width || rect.height < min.height {
                issue(
                    report,
                    SanityCode::MinimumSizeViolation,
                    SanitySeverity::Error,
                    None,
                    Some(id),
                    format!(
                        "item {} is {:?}, below its minimum {:?}",
                        id.get(),
                        rect.size(),
                        min
                    ),
                );
            }
        }
        // Reciprocal registration: every boundary must list the item.
        for (anchor, side) in [
            (group.left, Side::Two),
            (group.top, Side::Two),
            (group.right, Side::One),
            (group.bottom, Side::One),
        ] {
            let listed = layout
                .anchors
                .get(&anchor)
                .is_some_and(|a| a.contains_item(id, side));
            if !listed {
                issue(
                    report,
                    SanityCode::SideListMismatch,
                    SanitySeverity::Error,
                    Some(anchor),
                    Some(id),
                    format!(
                        "item {} is not registered on anchor {}",
                        id.get(),
                        anchor.get()
                    ),
                );
            }
        }
    }
}

fn check_followers(layout: &Layout, report: &mut SanityReport) {
    for (id, anchor) in layout.anchors() {
        let Some(followee) = anchor.follows() else {
            continue;
        };
        let Some(leader) = layout.anchors.get(&followee) else {
            issue(
                report,
                SanityCode::DanglingFollowee,
                SanitySeverity::Error,
                Some(id),
                None,
                format!(
                    "anchor {} follows missing anchor {}",
                    id.get(),
                    followee.get()
                ),
            );
            continue;
        };
        if leader.axis() != anchor.axis() {
            issue(
                report,
                SanityCode::DanglingFollowee,
                SanitySeverity::Error,
                Some(id),
                None,
                format!(
                    "anchor {} follows perpendicular anchor {}",
                    id.get(),
                    followee.get()
                ),
            );
        }
        // Walk the chain; revisiting the start means a cycle.
        let mut current = followee;
        let mut steps = 0;
        loop {
            if current == id {
                issue(
                    report,
                    SanityCode::FollowerCycle,
                    SanitySeverity::Error,
                    Some(id),
                    None,
                    format!("anchor {} transitively follows itself", id.get()),
                );
                break;
            }
            steps += 1;
            if steps > layout.anchors.len() {
                break;
            }
            match layout.anchors.get(&current).and_then(|a| a.follows()) {
                Some(next) => current = next,
                None => break,
            }
        }
    }
}

fn check_minimums(layout: &Layout, report: &mut SanityReport) {
    let min = layout.minimum_size();
    let size = layout.size();
    if size.width < min.width || size.height < min.height {
        issue(
            report,
            SanityCode::MinimumSizeOverflow,
            SanitySeverity::Error,
            None,
            None,
            format!("container {size:?} is below the layout minimum {min:?}"),
        );
    }
}

fn check_overlaps(layout: &Layout, report: &mut SanityReport) {
    let dynamics: Vec<(AnchorId, &crate::anchor::Anchor)> = layout
        .anchors()
        .filter(|(_, a)| !a.is_static() && !a.is_following())
        .collect();
    for (i, &(a_id, a)) in dynamics.iter().enumerate() {
        for &(b_id, b) in dynamics.iter().skip(i + 1) {
            if a.axis() != b.axis() || a.position() != b.position() {
                continue;
            }
            let position_of = |id: AnchorId| {
                layout
                    .anchors
                    .get(&id)
                    .map_or(0, crate::anchor::Anchor::position)
            };
            let span = |anchor: &crate::anchor::Anchor| {
                let from = position_of(anchor.from());
                let to = position_of(anchor.to());
                (from.min(to), from.max(to))
            };
            let (a_lo, a_hi) = span(a);
            let (b_lo, b_hi) = span(b);
            if a_lo < b_hi && b_lo < a_hi {
                issue(
                    report,
                    SanityCode::AnchorOverlap,
                    SanitySeverity::Warning,
                    Some(a_id),
                    None,
                    format!(
                        "anchors {} and {} occupy position {} over an overlapping span",
                        a_id.get(),
                        b_id.get(),
                        a.position()
                    ),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use dockline_core::{Rect, Size};

    use crate::anchor::Side;
    use crate::host::NullHost;
    use crate::layout::{Layout, LayoutOptions};
    use crate::{Location, SanityCode};

    fn layout() -> Layout {
        let mut layout = Layout::new(
            Size::new(400, 400),
            LayoutOptions::default(),
            Box::new(NullHost::default()),
        );
        layout.insert("a", Location::Top, None).expect("insert");
        layout.insert("b", Location::Right, Some("a")).expect("insert");
        layout
    }

    #[test]
    fn healthy_layout_reports_clean() {
        let layout = layout();
        let report = layout.check_sanity();
        assert!(report.is_clean(), "{report:?}");
        assert!(!report.has_errors());
    }

    #[test]
    fn stale_geometry_is_flagged() {
        let mut layout = layout();
        let id = layout.item_for_frame("a").expect("present");
        layout
            .items
            .get_mut(&id)
            .unwrap()
            .set_geometry(Rect::new(0, 0, 3, 3));
        let report = layout.check_sanity();
        assert!(report
            .issues
            .iter()
            .any(|issue| issue.code == SanityCode::GeometryMismatch));
        // The tiny rectangle also undercuts the item minimum.
        assert!(report
            .issues
            .iter()
            .any(|issue| issue.code == SanityCode::MinimumSizeViolation));
    }

    #[test]
    fn empty_sided_anchor_is_flagged() {
        let mut layout = layout();
        let (anchor, item) = {
            let (id, a) = layout
                .anchors()
                .find(|(_, a)| !a.is_static())
                .expect("dynamic anchor");
            (id, a.items(Side::Two)[0])
        };
        layout.anchors.get_mut(&anchor).unwrap().remove_item(item);
        let report = layout.check_sanity();
        assert!(report
            .issues
            .iter()
            .any(|issue| issue.code == SanityCode::UnneededAnchor));
        assert!(report
            .issues
            .iter()
            .any(|issue| issue.code == SanityCode::SideListMismatch));
        assert!(report.has_errors());
    }

    #[test]
    fn follower_cycle_is_flagged() {
        let mut layout = Layout::new(
            Size::new(600, 400),
            LayoutOptions::default(),
            Box::new(NullHost::default()),
        );
        layout.insert("a", Location::Top, None).expect("insert");
        layout.insert("b", Location::Right, Some("a")).expect("insert");
        layout.insert("c", Location::Right, Some("b")).expect("insert");
        let dynamics: Vec<_> = layout
            .anchors()
            .filter(|(_, a)| !a.is_static())
            .map(|(id, _)| id)
            .collect();
        assert_eq!(dynamics.len(), 2);
        layout
            .anchors
            .get_mut(&dynamics[0])
            .unwrap()
            .set_follows(Some(dynamics[1]));
        layout
            .anchors
            .get_mut(&dynamics[1])
            .unwrap()
            .set_follows(Some(dynamics[0]));
        let report = layout.check_sanity();
        assert!(report
            .issues
            .iter()
            .any(|issue| issue.code == SanityCode::FollowerCycle));
    }
}
