extern crate geoscene;
extern crate serde_json;

use geoscene::feature::FeaturePayload;
use geoscene::prelude::*;
use serde_json::json;

fn engine_with_trajectory() -> RenderEngine {
    let (host, _) = HeadlessHost::new();
    let mut engine = RenderEngine::new(Box::new(host), EngineOptions::default()).unwrap();
    engine.create_layer("tracks", LayerOptions::default()).unwrap();
    engine
        .add_data(
            "tracks",
            &json!([{
                "id": "t1",
                "samples": [
                    { "time": "1970-01-01T00:00:00Z", "position": [0.0, 0.0] },
                    { "time": "1970-01-01T00:00:10Z", "position": [1.0, 0.0] }
                ]
            }]),
        )
        .unwrap();
    engine
}

#[test]
fn seeked_clock_interpolates_the_position() {
    let mut engine = engine_with_trajectory();
    engine.set_current_time(Timestamp::from_seconds(5.0));

    let feature = engine.feature("t1").unwrap();
    let v = feature
        .position_at(engine.clock().current_time())
        .unwrap();
    assert!((v.longitude - 0.5).abs() < 1e-9);
    assert!((v.latitude - 0.0).abs() < 1e-9);
}

#[test]
fn evaluation_clamps_to_the_sampled_span() {
    let engine = engine_with_trajectory();
    let feature = engine.feature("t1").unwrap();

    // Before the first sample: the first sample's position.
    let before = feature.position_at(Timestamp::from_seconds(-100.0)).unwrap();
    assert!((before.longitude - 0.0).abs() < 1e-9);

    let after = feature.position_at(Timestamp::from_seconds(999.0)).unwrap();
    assert!((after.longitude - 1.0).abs() < 1e-9);
}

#[test]
fn derived_values_are_exposed() {
    let engine = engine_with_trajectory();
    match engine.feature("t1").unwrap().payload() {
        FeaturePayload::Trajectory(v) => {
            assert_eq!(v.sample_count(), 2);
            assert_eq!(v.duration(), 10.0);
            assert!(v.total_distance() > 100_000.0);
            assert!((v.bearing_at(Timestamp::from_seconds(5.0)).unwrap() - 90.0).abs() < 1.0);
        }
        _ => panic!("wrong payload"),
    }
}

#[test]
fn moving_marker_is_drawn_at_the_interpolated_position() {
    let (host, record) = HeadlessHost::new();
    let mut engine = RenderEngine::new(Box::new(host), EngineOptions::default()).unwrap();
    engine.create_layer("tracks", LayerOptions::default()).unwrap();
    engine
        .add_data(
            "tracks",
            &json!([{
                "id": "t1",
                "samples": [
                    { "time": 0, "position": [0.0, 0.0] },
                    { "time": 10, "position": [1.0, 0.0] }
                ],
                "style": { "marker": { "image": "plane.png" } }
            }]),
        )
        .unwrap();

    engine.set_current_time(Timestamp::from_seconds(5.0));
    engine.advance(Timestamp::from_seconds(1.0)).unwrap();

    let frames = record.borrow();
    let commands = &frames.last_frame().unwrap().commands;
    let marker = commands
        .iter()
        .find_map(|c| match &c.primitive {
            geoscene::host::DrawPrimitive::Billboard { position, image, .. }
                if image == "plane.png" =>
            {
                Some(*position)
            }
            _ => None,
        })
        .expect("marker billboard missing");
    assert!((marker.longitude - 0.5).abs() < 1e-9);

    // The path polyline is drawn alongside by default.
    assert!(commands.iter().any(|c| match &c.primitive {
        geoscene::host::DrawPrimitive::Polyline { .. } => true,
        _ => false,
    }));
}
