//! Snapshot export/import round-trips.

use dockline_layout::{Layout, LayoutOptions, Location, NullHost, Size};

fn import(snapshot: dockline_layout::LayoutSnapshot) -> Layout {
    Layout::from_snapshot(
        snapshot,
        LayoutOptions::default(),
        Box::new(NullHost::default()),
    )
    .expect("snapshot should validate")
}

fn nested_layout() -> Layout {
    let mut layout = Layout::new(
        Size::new(600, 500),
        LayoutOptions::default(),
        Box::new(NullHost::default()),
    );
    layout.insert("editor", Location::Top, None).expect("insert");
    layout
        .insert("tree", Location::Left, Some("editor"))
        .expect("insert");
    layout
        .insert("logs", Location::Bottom, Some("editor"))
        .expect("insert");
    layout.insert("panel", Location::Right, None).expect("insert");
    layout
}

#[test]
fn snapshot_round_trips_through_json() {
    let layout = nested_layout();
    let snapshot = layout.to_snapshot();

    let json = serde_json::to_string(&snapshot).expect("serialize");
    let parsed: dockline_layout::LayoutSnapshot =
        serde_json::from_str(&json).expect("deserialize");
    assert_eq!(parsed, snapshot);
}

#[test]
fn reimport_reproduces_the_graph() {
    let layout = nested_layout();
    let snapshot = layout.to_snapshot();

    let reimported = import(snapshot.clone());
    assert_eq!(reimported.to_snapshot(), snapshot);
    assert_eq!(reimported.count(), layout.count());
    assert_eq!(reimported.size(), layout.size());
    assert_eq!(reimported.minimum_size(), layout.minimum_size());
    assert!(reimported.check_sanity().is_clean());

    for (id, item) in layout.items() {
        let restored = reimported.item(id).expect("same ids");
        assert_eq!(restored.geometry(), item.geometry());
        assert_eq!(restored.frame(), item.frame());
    }
}

#[test]
fn placeholders_and_followers_survive_the_round_trip() {
    let mut layout = nested_layout();
    layout.retain("panel").expect("retain");
    layout.remove("panel").expect("remove");
    assert_eq!(layout.placeholder_count(), 1);
    let followers_before = layout
        .anchors()
        .filter(|(_, a)| a.is_following())
        .count();
    assert!(followers_before > 0);

    let snapshot = layout.to_snapshot();
    let mut reimported = import(snapshot.clone());

    assert_eq!(reimported.to_snapshot(), snapshot);
    assert_eq!(reimported.placeholder_count(), 1);
    assert_eq!(
        reimported
            .anchors()
            .filter(|(_, a)| a.is_following())
            .count(),
        followers_before
    );

    // The persisted placeholder still knows its frame and restores in place.
    let restored = reimported.restore("panel").expect("restore");
    assert!(!reimported.item(restored).unwrap().is_placeholder());
    assert_eq!(reimported.placeholder_count(), 0);
    assert!(reimported.check_sanity().is_clean());
}

#[test]
fn redistribute_is_idempotent_after_import() {
    let layout = nested_layout();
    let mut reimported = import(layout.to_snapshot());

    let before: Vec<_> = reimported
        .items()
        .map(|(id, item)| (id, item.geometry()))
        .collect();
    reimported.redistribute();
    let after: Vec<_> = reimported
        .items()
        .map(|(id, item)| (id, item.geometry()))
        .collect();
    assert_eq!(before, after);
}
