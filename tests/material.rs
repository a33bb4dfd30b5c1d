extern crate geoscene;
extern crate serde_json;

use geoscene::material::{MaterialFactory, MaterialManager, UniformValue};
use geoscene::prelude::*;
use serde_json::json;

#[test]
fn water_round_trip_preserves_parameters() {
    let factory = MaterialFactory::new();
    let water = factory.create("water", &json!({ "frequency": 8.0 })).unwrap();

    let restored = factory.from_json(&water.to_json()).unwrap();
    assert_eq!(restored.params_json()["frequency"], 8.0);
    assert!(water.equals(&*restored));
    assert_eq!(water.signature(), restored.signature());
}

#[test]
fn evaluation_is_deterministic_per_time() {
    let factory = MaterialFactory::new();
    let flow = factory
        .create("polylineFlow", &json!({ "speed": 0.7, "percent": 0.5 }))
        .unwrap();

    let t = Timestamp::from_seconds(42.5);
    assert_eq!(flow.value_at(t), flow.value_at(t));
    assert_ne!(flow.value_at(t), flow.value_at(t + 0.3));
}

#[test]
fn registration_extends_the_registry() {
    let mut factory = MaterialFactory::new();
    assert!(factory.create("color", &json!({})).is_ok());
    assert!(factory.create("myGlow", &json!({})).is_err());

    // Engine-scoped registries diverge independently.
    factory.register("myGlow", geoscene::material::polyline::PolylineGlow::from_value);
    assert!(factory.create("myGlow", &json!({})).is_ok());

    let pristine = MaterialFactory::new();
    assert!(pristine.create("myGlow", &json!({})).is_err());
    assert!(factory.types().contains(&"myGlow"));
}

#[test]
fn presets_fix_parameter_bundles() {
    let factory = MaterialFactory::new();
    let ocean = factory.create("water", &json!({ "preset": "ocean" })).unwrap();
    let lake = factory.create("water", &json!({ "preset": "lake" })).unwrap();
    assert!(!ocean.equals(&*lake));

    let torch = factory.create("fire", &json!({ "preset": "torch" })).unwrap();
    assert_eq!(torch.params_json()["speed"], 1.6);
    assert!(factory.create("fire", &json!({ "preset": "bonfire" })).is_err());
}

#[test]
fn animated_phase_follows_the_clock() {
    let factory = MaterialFactory::new();
    let flow = factory.create("polylineFlow", &json!({ "speed": 1.0 })).unwrap();

    let phase_at = |secs: f64| {
        flow.value_at(Timestamp::from_seconds(secs))
            .iter()
            .find(|(name, _)| *name == "phase")
            .map(|(_, v)| match v {
                UniformValue::Float(p) => *p,
                _ => panic!("phase is a float"),
            })
            .unwrap()
    };

    assert!((phase_at(0.25) - 0.25).abs() < 1e-6);
    // One full cycle later the phase repeats.
    assert!((phase_at(1.25) - 0.25).abs() < 1e-6);
}

#[test]
fn manager_batch_toggles_and_export() {
    let mut manager = MaterialManager::new();
    let a = manager.create("polylineFlow", &json!({})).unwrap();
    let b = manager.create("pulseLine", &json!({})).unwrap();

    let t = Timestamp::from_seconds(1.0);
    assert_eq!(manager.evaluate(t).len(), 2);

    manager.set_all_enabled(false);
    assert!(manager.evaluate(t).is_empty());
    manager.set_enabled(a, true);
    assert_eq!(manager.evaluate(t).len(), 1);

    let exported = manager.export_json();
    assert_eq!(exported.as_array().unwrap().len(), 2);

    manager.free(b);
    assert_eq!(manager.len(), 1);
}

#[test]
fn generation_signals_definition_changes() {
    use geoscene::material::polyline::{PolylineFlow, PolylineFlowParams};
    use geoscene::material::MaterialProperty;

    let mut flow = PolylineFlow::new(PolylineFlowParams::default());
    let before = flow.generation();

    flow.set_params(PolylineFlowParams {
        percent: 0.9,
        ..Default::default()
    });
    assert_eq!(flow.generation(), before + 1);
}
