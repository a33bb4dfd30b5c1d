extern crate geoscene;
extern crate serde_json;

use geoscene::prelude::*;
use serde_json::json;

#[test]
fn mixed_feeds_adapt_to_the_right_kinds() {
    let adapter = DataAdapter::new();
    let raw = json!([
        { "id": "p", "lng": 116.4, "lat": 39.9 },
        { "id": "r", "positions": [[0.0, 0.0], [1.0, 1.0]] },
        { "id": "a", "positions": [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]] },
        { "id": "t", "samples": [ { "time": 0, "position": [0.0, 0.0] } ] },
        { "id": "rel", "source": "p", "target": "a" },
        { "id": "e", "level": 4, "position": [5.0, 5.0] }
    ]);

    let features = adapter.adapt(&raw, &AdaptOptions::default());
    let kinds: Vec<FeatureKind> = features.iter().map(|f| f.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            FeatureKind::Point,
            FeatureKind::Route,
            FeatureKind::Area,
            FeatureKind::Trajectory,
            FeatureKind::Relation,
            FeatureKind::Event,
        ]
    );
}

#[test]
fn hint_overrides_inference() {
    let adapter = DataAdapter::new();
    let raw = json!([{ "positions": [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]] }]);

    let features = adapter.adapt(&raw, &AdaptOptions::with_kind(FeatureKind::Polygon));
    assert_eq!(features[0].kind(), FeatureKind::Polygon);
}

#[test]
fn bad_records_never_poison_the_batch() {
    let adapter = DataAdapter::new();
    let raw = json!([
        { "id": "ok1", "position": [0.0, 0.0] },
        { "id": "no-position" },
        { "id": "bad-lat", "position": { "longitude": 0.0, "latitude": 260.0 } },
        { "id": "ok2", "position": [1.0, 1.0] },
        42
    ]);

    let features = adapter.adapt(&raw, &AdaptOptions::default());
    let ids: Vec<&str> = features.iter().map(|f| f.id()).collect();
    assert_eq!(ids, vec!["ok1", "ok2"]);
}

#[test]
fn records_without_ids_get_generated_ones() {
    let adapter = DataAdapter::new();
    let raw = json!([
        { "position": [0.0, 0.0] },
        { "position": [1.0, 0.0] }
    ]);

    let features = adapter.adapt(&raw, &AdaptOptions::default());
    assert_eq!(features.len(), 2);
    assert!(!features[0].id().is_empty());
    assert_ne!(features[0].id(), features[1].id());
}

#[test]
fn raw_record_is_kept_as_source_ref() {
    let adapter = DataAdapter::new();
    let raw = json!({ "id": "p", "position": [0.0, 0.0], "customTag": "abc" });

    let features = adapter.adapt(&raw, &AdaptOptions::default());
    let back = features[0].source_ref.as_ref().unwrap();
    assert_eq!(back["customTag"], "abc");
}
