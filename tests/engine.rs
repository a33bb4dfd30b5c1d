extern crate geoscene;
extern crate serde_json;

use geoscene::feature::FeaturePayload;
use geoscene::prelude::*;
use serde_json::json;

fn t(secs: f64) -> Timestamp {
    Timestamp::from_seconds(secs)
}

fn new_engine() -> (
    RenderEngine,
    std::rc::Rc<std::cell::RefCell<geoscene::host::FrameRecord>>,
    std::rc::Rc<std::cell::RefCell<CameraState>>,
) {
    let (host, record) = HeadlessHost::new();
    let camera = host.camera_handle();
    let engine = RenderEngine::new(Box::new(host), EngineOptions::default()).unwrap();
    (engine, record, camera)
}

fn point(id: &str, lon: f64, lat: f64) -> serde_json::Value {
    json!({ "id": id, "position": { "longitude": lon, "latitude": lat } })
}

#[test]
fn point_add_and_remove() {
    let (mut engine, _, _) = new_engine();
    engine.create_layer("L1", LayerOptions::default()).unwrap();

    let added = engine.add_data("L1", &json!([point("p1", 116.4, 39.9)])).unwrap();
    assert_eq!(added, 1);
    assert_eq!(engine.stats().total_entities, 1);

    // The layer, its collection and the entity table agree.
    assert!(engine.layer("L1").unwrap().contains("p1"));
    assert!(engine.feature("p1").is_some());

    engine.remove_layer("L1").unwrap();
    assert_eq!(engine.stats().total_entities, 0);
    assert!(engine.feature("p1").is_none());
}

#[test]
fn duplicate_ids_warn_and_keep_the_prior_instance() {
    let (mut engine, _, _) = new_engine();
    engine.create_layer("L1", LayerOptions::default()).unwrap();

    engine.add_data("L1", &json!([point("p1", 10.0, 0.0)])).unwrap();
    engine.add_data("L1", &json!([point("p1", 99.0, 0.0)])).unwrap();

    assert_eq!(engine.stats().total_entities, 1);
    let v = engine.feature("p1").unwrap().position().unwrap();
    assert!((v.longitude - 10.0).abs() < 1e-9);
}

#[test]
fn layer_visibility_cascades_without_touching_feature_flags() {
    let (mut engine, _, _) = new_engine();
    engine.create_layer("L1", LayerOptions::default()).unwrap();

    let records: Vec<serde_json::Value> = (0..100)
        .map(|i| point(&format!("p{}", i), i as f64, 0.0))
        .collect();
    engine.add_data("L1", &json!(records)).unwrap();

    engine.advance(t(1.0)).unwrap();
    assert_eq!(engine.stats().visible_entities, 100);

    engine.set_layer_visible("L1", false).unwrap();
    engine.advance(t(2.0)).unwrap();
    assert_eq!(engine.stats().visible_entities, 0);

    // Own flags are untouched by the layer toggle.
    for i in 0..100 {
        assert!(engine.feature(&format!("p{}", i)).unwrap().visible());
    }
}

#[test]
fn culling_marks_out_of_view_features() {
    let (mut engine, _, camera) = new_engine();
    engine.create_layer("L1", LayerOptions::default()).unwrap();
    engine
        .add_data(
            "L1",
            &json!([point("in", 10.0, 10.0), point("out", 120.0, -40.0)]),
        )
        .unwrap();

    camera.borrow_mut().view_bounds = GeoRect::new(0.0, 0.0, 20.0, 20.0);
    camera.borrow_mut().position = Position::new(10.0, 10.0, 500_000.0);

    let culled = engine.run_culling();
    assert_eq!(culled, 1);
    assert_eq!(engine.stats().culled_entities, 1);

    engine.advance(t(1.0)).unwrap();
    assert_eq!(engine.stats().visible_entities, 1);
}

#[test]
fn relation_follows_moved_endpoints() {
    let (mut engine, _, _) = new_engine();
    engine.create_layer("L1", LayerOptions::default()).unwrap();
    engine
        .add_data(
            "L1",
            &json!([
                point("a", 0.0, 0.0),
                point("b", 10.0, 0.0),
                { "id": "r", "source": "a", "target": "b" }
            ]),
        )
        .unwrap();

    engine.advance(t(1.0)).unwrap();
    match engine.feature("r").unwrap().payload() {
        FeaturePayload::Relation(v) => assert!((v.path()[0].longitude - 0.0).abs() < 1e-9),
        _ => panic!("wrong payload"),
    }

    // Move the source; the relation's first vertex updates within the frame.
    engine
        .feature_mut("a")
        .unwrap()
        .set_position(Position::new(5.0, 0.0, 0.0));
    engine.advance(t(2.0)).unwrap();
    match engine.feature("r").unwrap().payload() {
        FeaturePayload::Relation(v) => assert!((v.path()[0].longitude - 5.0).abs() < 1e-9),
        _ => panic!("wrong payload"),
    }
}

#[test]
fn mutated_features_are_flagged_dirty_for_the_host() {
    let (mut engine, record, _) = new_engine();
    engine.create_layer("L1", LayerOptions::default()).unwrap();
    engine.add_data("L1", &json!([point("a", 0.0, 0.0), point("b", 1.0, 0.0)])).unwrap();

    // The first frame rebuilds everything.
    engine.advance(t(1.0)).unwrap();
    assert_eq!(record.borrow().last_frame().unwrap().dirty.len(), 2);

    // A quiet frame rebuilds nothing.
    engine.advance(t(2.0)).unwrap();
    assert!(record.borrow().last_frame().unwrap().dirty.is_empty());

    engine
        .feature_mut("a")
        .unwrap()
        .set_position(Position::new(3.0, 0.0, 0.0));
    engine.advance(t(3.0)).unwrap();
    assert_eq!(
        record.borrow().last_frame().unwrap().dirty,
        vec!["a".to_string()]
    );
}

#[test]
fn missing_relation_endpoint_hides_the_line() {
    let (mut engine, record, _) = new_engine();
    engine.create_layer("L1", LayerOptions::default()).unwrap();
    engine
        .add_data(
            "L1",
            &json!([point("a", 0.0, 0.0), { "id": "r", "source": "a", "target": "ghost" }]),
        )
        .unwrap();

    engine.advance(t(1.0)).unwrap();
    let frames = record.borrow();
    let frame = frames.last_frame().unwrap();
    assert!(frame.commands.iter().all(|c| c.feature_id != "r"));
    // Hidden, not an error: the relation is still alive.
    assert!(engine.feature("r").is_some());
}

#[test]
fn pending_updates_drain_in_insertion_order() {
    let (mut engine, _, _) = new_engine();
    engine.create_layer("L1", LayerOptions::default()).unwrap();

    engine.schedule_update("L1", LayerUpdate::AddData(json!([point("p1", 0.0, 0.0)])));
    engine.schedule_update(
        "L1",
        LayerUpdate::MoveFeature("p1".to_string(), Position::new(7.0, 0.0, 0.0)),
    );
    assert_eq!(engine.pending_updates("L1"), 2);
    assert_eq!(engine.stats().total_entities, 0);

    engine.advance(t(1.0)).unwrap();
    assert_eq!(engine.pending_updates("L1"), 0);
    let v = engine.feature("p1").unwrap().position().unwrap();
    assert!((v.longitude - 7.0).abs() < 1e-9);
}

#[test]
fn performance_preset_inverse_matching() {
    let (mut engine, _, _) = new_engine();

    // The default configuration is the balanced bundle.
    assert_eq!(engine.current_performance_preset(), Some("balanced"));

    engine.set_performance_preset("high-performance").unwrap();
    assert_eq!(engine.current_performance_preset(), Some("high-performance"));
    assert!(engine.options().enable_instancing);
    assert_eq!(engine.options().max_entities_per_layer, 50_000);

    engine.set_performance_preset("high-quality").unwrap();
    assert_eq!(engine.current_performance_preset(), Some("high-quality"));
    assert!(!engine.options().enable_lod);

    assert!(engine.set_performance_preset("ludicrous").is_err());
}

#[test]
fn layer_interaction_broadcast_reaches_other_layers() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let (mut engine, _, _) = new_engine();
    engine.create_layer("points", LayerOptions::default()).unwrap();
    engine.create_layer("relations", LayerOptions::default()).unwrap();

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    engine
        .layer_mut("relations")
        .unwrap()
        .set_interaction_hook(move |source, event, _| {
            sink.borrow_mut().push((source.to_string(), event.clone()));
        });

    engine.add_data("points", &json!([point("p1", 0.0, 0.0)])).unwrap();

    let seen = seen.borrow();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].0, "points");
    assert_eq!(seen[0].1, EventType::DataChanged);
}

#[test]
fn paused_engine_skips_frames() {
    let (mut engine, record, _) = new_engine();
    engine.create_layer("L1", LayerOptions::default()).unwrap();
    engine.add_data("L1", &json!([point("p1", 0.0, 0.0)])).unwrap();

    engine.advance(t(1.0)).unwrap();
    assert_eq!(record.borrow().frames.len(), 1);

    engine.pause();
    engine.advance(t(2.0)).unwrap();
    assert_eq!(record.borrow().frames.len(), 1);

    engine.resume();
    engine.advance(t(3.0)).unwrap();
    assert_eq!(record.borrow().frames.len(), 2);
}

#[test]
fn destroy_is_idempotent_and_cascades() {
    let (mut engine, record, _) = new_engine();
    engine.create_layer("L1", LayerOptions::default()).unwrap();
    engine.add_data("L1", &json!([point("p1", 0.0, 0.0)])).unwrap();

    engine.destroy();
    engine.destroy();

    assert!(engine.advance(t(1.0)).is_err());
    assert!(engine.create_layer("L2", LayerOptions::default()).is_err());
    assert!(record.borrow().removed.contains(&"p1".to_string()));
}

#[test]
fn empty_layer_reports_zero_stats() {
    let (mut engine, _, _) = new_engine();
    engine.create_layer("L1", LayerOptions::default()).unwrap();
    engine.advance(t(1.0)).unwrap();

    let stats = engine.stats();
    assert_eq!(stats.layers.len(), 1);
    assert_eq!(stats.layers[0].total, 0);
    assert_eq!(stats.layers[0].visible, 0);
    assert_eq!(stats.total_entities, 0);
}

#[test]
fn removing_the_last_feature_keeps_the_layer() {
    let (mut engine, _, _) = new_engine();
    engine.create_layer("L1", LayerOptions::default()).unwrap();
    engine.add_data("L1", &json!([point("p1", 0.0, 0.0)])).unwrap();

    assert!(engine.remove_feature("L1", "p1").unwrap());
    assert!(engine.layer("L1").is_some());
    assert_eq!(engine.stats().total_entities, 0);
    assert_eq!(engine.layer_order().to_vec(), vec!["L1".to_string()]);
}

#[test]
fn layer_order_stays_total() {
    let (mut engine, _, _) = new_engine();
    engine.create_layer("a", LayerOptions::default()).unwrap();
    engine.create_layer("b", LayerOptions::default()).unwrap();
    engine.create_layer("c", LayerOptions::default()).unwrap();
    assert!(engine.create_layer("b", LayerOptions::default()).is_err());

    engine.move_layer("c", 0).unwrap();
    assert_eq!(
        engine.layer_order().to_vec(),
        vec!["c".to_string(), "a".to_string(), "b".to_string()]
    );

    engine.remove_layer("a").unwrap();
    assert_eq!(
        engine.layer_order().to_vec(),
        vec!["c".to_string(), "b".to_string()]
    );
}

#[test]
fn performance_report_mentions_low_fps() {
    let (mut engine, _, _) = new_engine();
    engine.create_layer("L1", LayerOptions::default()).unwrap();
    engine.add_data("L1", &json!([point("p1", 0.0, 0.0)])).unwrap();

    // Two frames 100ms apart put the engine at 10 fps.
    engine.advance(t(1.0)).unwrap();
    engine.advance(t(1.1)).unwrap();

    let report = engine.performance_report();
    assert!(report.contains("below 30 fps"));
}

#[test]
fn stats_snapshot_is_depth_limited() {
    let (mut engine, _, _) = new_engine();
    engine.create_layer("L1", LayerOptions::default()).unwrap();
    engine.add_data("L1", &json!([point("p1", 0.0, 0.0)])).unwrap();
    engine.advance(t(1.0)).unwrap();

    let deep = engine.stats_snapshot(4);
    assert_eq!(deep["layers"][0]["total"], 1);
    let shallow = engine.stats_snapshot(1);
    assert_eq!(shallow["layers"], "[pruned]");
}
