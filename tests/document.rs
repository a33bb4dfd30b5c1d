extern crate geoscene;
extern crate serde_json;

use geoscene::prelude::*;
use serde_json::json;

fn build_engine() -> RenderEngine {
    let (host, _) = HeadlessHost::new();
    let mut engine = RenderEngine::new(Box::new(host), EngineOptions::default()).unwrap();

    engine
        .create_layer(
            "cities",
            LayerOptions {
                name: "Cities".to_string(),
                opacity: Some(0.8),
                z_index: 2,
                ..Default::default()
            },
        )
        .unwrap();
    engine
        .add_data(
            "cities",
            &json!([
                {
                    "id": "p1",
                    "name": "Beijing",
                    "position": { "longitude": 116.4, "latitude": 39.9, "height": 40.0 },
                    "style": { "pixelSize": 12.0 },
                    "properties": { "pop": 21_000_000 }
                },
                {
                    "id": "zone",
                    "type": "polygon",
                    "positions": [
                        { "longitude": 0.0, "latitude": 0.0 },
                        { "longitude": 1.0, "latitude": 0.0 },
                        { "longitude": 1.0, "latitude": 1.0 }
                    ]
                }
            ]),
        )
        .unwrap();

    engine.create_layer("tracks", LayerOptions::default()).unwrap();
    engine
        .add_data(
            "tracks",
            &json!([{
                "id": "t1",
                "samples": [
                    { "time": "2024-05-01T00:00:00Z", "position": [10.0, 20.0] },
                    { "time": "2024-05-01T00:01:00Z", "position": [11.0, 20.0] }
                ]
            }]),
        )
        .unwrap();

    engine
}

#[test]
fn document_shape_matches_the_contract() {
    let engine = build_engine();
    let document = engine.export_document();

    assert!(document["options"].is_object());
    assert_eq!(document["layerOrder"], json!(["cities", "tracks"]));

    let layers = document["layers"].as_array().unwrap();
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0]["layerId"], "cities");

    let config = &layers[0]["config"];
    assert_eq!(config["name"], "Cities");
    assert_eq!(config["opacity"], 0.8);
    assert_eq!(config["zIndex"], 2);
    assert_eq!(config["features"].as_array().unwrap().len(), 2);

    let feature = &config["features"][0];
    assert_eq!(feature["type"], "point");
    assert_eq!(feature["id"], "p1");
    assert_eq!(feature["show"], true);
}

#[test]
fn export_import_round_trip() {
    let source = build_engine();
    let document = source.export_document();

    let (host, _) = HeadlessHost::new();
    let mut restored = RenderEngine::new(Box::new(host), EngineOptions::default()).unwrap();
    restored.import_document(&document).unwrap();

    assert_eq!(restored.layer_order(), source.layer_order());
    assert_eq!(restored.stats().total_entities, 3);

    let p1 = restored.feature("p1").unwrap();
    assert_eq!(p1.name, "Beijing");
    assert_eq!(p1.properties["pop"], 21_000_000);
    let v = p1.position().unwrap();
    assert!((v.longitude - 116.4).abs() < 1e-9);
    assert!((v.height - 40.0).abs() < 1e-9);

    // Style fields survive the trip.
    match p1.payload() {
        geoscene::feature::FeaturePayload::Point(point) => {
            assert_eq!(point.style.pixel_size, 12.0)
        }
        _ => panic!("wrong payload"),
    }

    // The restored trajectory still interpolates.
    let t1 = restored.feature("t1").unwrap();
    let mid = Timestamp::parse("2024-05-01T00:00:30Z").unwrap();
    assert!((t1.position_at(mid).unwrap().longitude - 10.5).abs() < 1e-9);

    let layer = restored.layer("cities").unwrap();
    assert!((layer.opacity() - 0.8).abs() < 1e-9);
}

#[test]
fn clock_state_round_trips() {
    let mut source = build_engine();
    let range = TimeInterval::new(
        Timestamp::parse("2024-05-01T00:00:00Z").unwrap(),
        Timestamp::parse("2024-05-02T00:00:00Z").unwrap(),
    );
    source.clock_mut().set_time_range(range);
    source.set_current_time(Timestamp::parse("2024-05-01T12:00:00Z").unwrap());

    let document = source.export_document();
    let (host, _) = HeadlessHost::new();
    let mut restored = RenderEngine::new(Box::new(host), EngineOptions::default()).unwrap();
    restored.import_document(&document).unwrap();

    assert_eq!(restored.clock().time_range(), Some(range));
    assert_eq!(
        restored.clock().current_time().to_iso8601(),
        "2024-05-01T12:00:00.000Z"
    );
}
