//! Frame statistics and the depth-limited diagnostic snapshot.

use serde_json::Value;

/// Per-layer counters refreshed every frame.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LayerStats {
    pub id: String,
    pub total: usize,
    pub visible: usize,
    pub culled: usize,
}

/// Engine-wide counters refreshed every frame.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub fps: f64,
    pub frame_time_ms: f64,
    pub update_time_ms: f64,
    pub total_entities: usize,
    pub visible_entities: usize,
    pub culled_entities: usize,
    pub batched_entities: usize,
    pub instanced_entities: usize,
    pub material_count: usize,
    /// Rough retained-memory estimate, diagnostics only.
    pub memory_bytes: usize,
    pub layers: Vec<LayerStats>,
}

impl EngineStats {
    /// A safely-shallow JSON copy: traversal stops at `depth` so diagnostic
    /// exports can never chase reference cycles, and deep sub-component
    /// state collapses to a marker string.
    pub fn snapshot(&self, depth: usize) -> Value {
        let mut v = ::serde_json::to_value(self).unwrap_or(Value::Null);
        prune(&mut v, depth);
        v
    }
}

fn prune(v: &mut Value, depth: usize) {
    match v {
        Value::Object(map) => {
            if depth == 0 {
                *v = Value::String("[pruned]".to_string());
            } else {
                for (_, field) in map.iter_mut() {
                    prune(field, depth - 1);
                }
            }
        }
        Value::Array(items) => {
            if depth == 0 {
                *v = Value::String("[pruned]".to_string());
            } else {
                for item in items.iter_mut() {
                    prune(item, depth - 1);
                }
            }
        }
        _ => {}
    }
}

/// The collected information of the last frame.
#[derive(Debug, Copy, Clone, Default)]
pub struct FrameInfo {
    pub duration_ms: f64,
    pub fps: f64,
    pub commands: usize,
    pub visible: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_depth_limits_traversal() {
        let stats = EngineStats {
            fps: 60.0,
            layers: vec![LayerStats {
                id: "l1".to_string(),
                total: 5,
                ..Default::default()
            }],
            ..Default::default()
        };

        let deep = stats.snapshot(4);
        assert_eq!(deep["layers"][0]["total"], 5);

        let shallow = stats.snapshot(1);
        assert_eq!(shallow["fps"], 60.0);
        assert_eq!(shallow["layers"], "[pruned]");
    }
}
