//! End-to-end tests exercising the coordinate/curve/transform/store
//! pipeline together, covering the worked scenarios and the
//! cross-module testable properties that no single unit test can see.

use curve_editor_core::prelude::*;
use curve_editor_core::coordinate::{CoordinateOrigin, CoordinateSystem};
use curve_editor_core::insert_track;
use curve_editor_core::io;

fn point(frame: i32, x: f64, y: f64, status: PointStatus) -> Point {
    Point::new(frame, x, y, status)
}

/// S1: loading a 3DE-shaped multi-point track infers bottom-left 3DE
/// metadata with default 1280x720 dimensions.
#[test]
fn s1_multi_point_track_detects_3de_metadata() {
    let content = "1\nPoint1\n0\n3\n1 640.0 100.0\n2 650.0 110.0\n3 660.0 120.0\n";
    let trajectories = io::parse_multi_point_track(content, "track.txt");
    assert_eq!(trajectories.len(), 1);
    let metadata = trajectories[0].data.metadata.unwrap();
    assert_eq!(metadata.system, CoordinateSystem::ThreeDeEqualizer);
    assert_eq!(metadata.origin, CoordinateOrigin::BottomLeft);
    assert_eq!((metadata.width, metadata.height), (1280, 720));
}

/// Loading a 3DE file, normalizing to the internal convention, and
/// converting back to the original metadata must round-trip exactly.
#[test]
fn loaded_curve_round_trips_through_normalization() {
    let content = "1\nPoint1\n0\n2\n1 640.0 100.0\n2 700.0 200.0\n";
    let trajectories = io::parse_multi_point_track(content, "track.txt");
    let loaded = &trajectories[0].data;

    let normalized = loaded.to_normalized();
    assert!(normalized.is_normalized);
    let restored = normalized.from_normalized(loaded.metadata.unwrap()).unwrap();

    for (original, back) in loaded.data.points().iter().zip(restored.data.points()) {
        assert!((original.x - back.x).abs() < 1e-9);
        assert!((original.y - back.y).abs() < 1e-9);
        assert_eq!(original.status, back.status);
    }
}

/// Property: a Transform built from a ViewState maps data-space points
/// to screen space and back within floating-point tolerance.
#[test]
fn transform_round_trip_through_cache() {
    let cache = TransformCache::default();
    let config = ValidationConfig::from_environment();
    let view = ViewState { zoom_factor: 2.5, offset_x: 40.0, offset_y: -15.0, flip_y_axis: true, ..ViewState::default() };

    let transform = cache.get_or_insert(&view, &config).unwrap();
    let (sx, sy) = transform.data_to_screen(123.0, 456.0);
    let (dx, dy) = transform.screen_to_data(sx, sy).unwrap();
    assert!((dx - 123.0).abs() < 1e-6);
    assert!((dy - 456.0).abs() < 1e-6);
}

/// Property: repeated lookups for the same (quantized) view hit the
/// cache and produce bit-identical transforms, independent of how many
/// other views have been looked up meanwhile.
#[test]
fn cache_determinism_across_interleaved_lookups() {
    let cache = TransformCache::default();
    let config = ValidationConfig::from_environment();
    let target = ViewState { offset_x: 17.25, ..ViewState::default() };

    let first = cache.get_or_insert(&target, &config).unwrap();
    for i in 0..5 {
        let other = ViewState { offset_x: i as f64 * 1000.0, ..ViewState::default() };
        cache.get_or_insert(&other, &config).unwrap();
    }
    let second = cache.get_or_insert(&target, &config).unwrap();
    assert_eq!(first.stability_hash, second.stability_hash);
}

/// S6: filling a gap with a constant offset from a donor curve.
#[test]
fn s6_fill_gap_with_constant_offset() {
    let target = Curve::from_points(vec![
        point(1, 0.0, 0.0, PointStatus::Keyframe),
        point(10, 100.0, 100.0, PointStatus::Keyframe),
    ])
    .unwrap();
    let donor = Curve::from_points(vec![
        point(1, 5.0, 5.0, PointStatus::Tracked),
        point(5, 55.0, 55.0, PointStatus::Tracked),
        point(10, 95.0, 95.0, PointStatus::Tracked),
    ])
    .unwrap();

    let filled = insert_track::fill_gap_with_source(&target, &donor, 5).unwrap();
    let p = filled.point_at_frame(5).unwrap();
    assert!((p.x - 50.0).abs() < 1e-9);
    assert!((p.y - 50.0).abs() < 1e-9);
}

/// A `CurveStore` round-trips through undo after a sequence of edits,
/// and its batch mode suppresses intermediate notifications but still
/// reports the final data change.
#[test]
fn curve_store_batched_edit_then_undo() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let mut store = CurveStore::new();
    store.add_point(point(1, 0.0, 0.0, PointStatus::Keyframe)).unwrap();
    store.add_point(point(2, 10.0, 10.0, PointStatus::Tracked)).unwrap();

    let events = Rc::new(RefCell::new(Vec::new()));
    let events_clone = Rc::clone(&events);
    store.on_event(move |event| events_clone.borrow_mut().push(format!("{event:?}")));

    store.begin_batch_operation();
    store.update_point(0, 1.0, 1.0).unwrap();
    store.update_point(1, 20.0, 20.0).unwrap();
    store.end_batch_operation();

    assert_eq!(store.get_point(0).unwrap().x, 1.0);
    assert!(events.borrow().iter().any(|e| e.contains("DataChanged")));

    assert!(store.undo());
    assert_eq!(store.get_point(0).unwrap().x, 0.0);
    assert_eq!(store.get_point(1).unwrap().x, 10.0);
}

/// A `MultiCurveStore` keeps `active_curve`/`selected_curves` as a
/// subset of its known curve names even as curves are deleted.
#[test]
fn multi_curve_store_invariants_survive_deletion() {
    let mut store = MultiCurveStore::new();
    let curve_a = CurveDataWithMetadata::new(Curve::from_points(vec![point(1, 0.0, 0.0, PointStatus::Keyframe)]).unwrap(), None);
    let curve_b = CurveDataWithMetadata::new(Curve::from_points(vec![point(1, 5.0, 5.0, PointStatus::Keyframe)]).unwrap(), None);

    store.set_curve_data("a", curve_a);
    store.set_curve_data("b", curve_b);
    store.set_active_curve(Some("a".into())).unwrap();
    store.set_selected_curves(std::collections::BTreeSet::from(["a".to_string(), "b".to_string()]));

    store.delete_curve("a").unwrap();

    assert_eq!(store.active_curve(), None);
    assert!(!store.selected_curves().contains("a"));
    assert!(store.selected_curves().contains("b"));
}

/// CSV and JSON loaders of the same logical data produce equivalent
/// curves (ignoring incidental metadata differences).
#[test]
fn csv_and_json_loaders_agree_on_same_data() {
    let csv = "frame,x,y,status\n1,10.0,20.0,keyframe\n2,15.0,25.0,tracked\n";
    let csv_curve = io::parse_csv(csv);

    let json = r#"[{"frame": 1, "x": 10.0, "y": 20.0, "status": "keyframe"}, {"frame": 2, "x": 15.0, "y": 25.0, "status": "tracked"}]"#;
    let json_curve = io::parse_json(json).unwrap();

    assert_eq!(csv_curve.frames(), json_curve.frames());
    for (a, b) in csv_curve.points().iter().zip(json_curve.points()) {
        assert_eq!(a.x, b.x);
        assert_eq!(a.y, b.y);
        assert_eq!(a.status, b.status);
    }
}
