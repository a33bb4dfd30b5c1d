//! Normalization of heterogeneous raw records into canonical features.
//!
//! Real feeds disagree on everything: coordinate shapes, timestamp formats,
//! where the kind tag lives. The adapter is the tolerant front door: it
//! coerces what it can, drops what it cannot (with a warning per item), and
//! returns the successfully adapted subset.

use serde_json::{Map, Value};

use crate::feature::{self, Feature, FeatureKind};
use crate::utils::hash::FastHashMap;
use crate::utils::time::Timestamp;

/// Per-call adaptation knobs.
#[derive(Debug, Clone, Default)]
pub struct AdaptOptions {
    /// Skip kind inference and treat every record as this kind.
    pub kind_hint: Option<FeatureKind>,
    /// Style defaults merged under each record's own style (caller defaults
    /// beat engine defaults, record style beats both).
    pub style_defaults: Option<Value>,
}

impl AdaptOptions {
    pub fn with_kind(kind: FeatureKind) -> Self {
        AdaptOptions {
            kind_hint: Some(kind),
            ..Default::default()
        }
    }
}

/// The engine-scoped adapter. Holds per-kind default styles; otherwise
/// stateless.
#[derive(Debug, Default)]
pub struct DataAdapter {
    defaults: FastHashMap<FeatureKind, Value>,
}

impl DataAdapter {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers an engine-wide default style for `kind`.
    pub fn set_default_style(&mut self, kind: FeatureKind, style: Value) {
        self.defaults.insert(kind, style);
    }

    /// Adapts raw input (a single record or an array of records) into
    /// canonical features. Invalid items are dropped with a warning; the
    /// result is the adapted subset in input order.
    pub fn adapt(&self, raw: &Value, options: &AdaptOptions) -> Vec<Feature> {
        let items: Vec<&Value> = match raw {
            Value::Array(items) => items.iter().collect(),
            Value::Null => Vec::new(),
            v => vec![v],
        };

        let mut adapted = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match self.adapt_one(item, options) {
                Ok(feature) => adapted.push(feature),
                Err(reason) => warn!("Dropping record #{}: {}.", index, reason),
            }
        }
        adapted
    }

    fn adapt_one(&self, item: &Value, options: &AdaptOptions) -> Result<Feature, String> {
        if !item.is_object() {
            return Err(format!("expected an object, got {}", item));
        }

        let kind = match options.kind_hint {
            Some(kind) => kind,
            None => infer_kind(item),
        };

        let canonical = self.canonicalize(item, kind, options)?;
        let mut feature = feature::create(kind, &canonical).map_err(|err| err.to_string())?;
        feature.source_ref = Some(item.clone());
        Ok(feature)
    }

    // Rewrites a raw record into the canonical options object the feature
    // factory understands.
    fn canonicalize(
        &self,
        item: &Value,
        kind: FeatureKind,
        options: &AdaptOptions,
    ) -> Result<Value, String> {
        let mut out = Map::new();

        for key in &["id", "name", "show", "interactive", "properties", "availability"] {
            if let Some(v) = item.get(*key) {
                out.insert((*key).to_string(), v.clone());
            }
        }
        // Visibility also arrives as `visible`.
        if !out.contains_key("show") {
            if let Some(v) = item.get("visible") {
                out.insert("show".to_string(), v.clone());
            }
        }

        match kind {
            FeatureKind::Point
            | FeatureKind::Billboard
            | FeatureKind::Label
            | FeatureKind::Model
            | FeatureKind::Event => {
                let position =
                    extract_position(item).ok_or_else(|| "no usable position".to_string())?;
                out.insert("position".to_string(), position);

                for key in &["level", "radius", "heading", "eventType"] {
                    if let Some(v) = item.get(*key) {
                        out.insert((*key).to_string(), v.clone());
                    }
                }
            }
            FeatureKind::Polyline
            | FeatureKind::Route
            | FeatureKind::Polygon
            | FeatureKind::Area => {
                let positions =
                    extract_positions(item).ok_or_else(|| "no usable positions".to_string())?;
                out.insert("positions".to_string(), positions);
            }
            FeatureKind::Trajectory => {
                let samples = extract_samples(item)?;
                out.insert("samples".to_string(), samples);
                for key in &["interpolation", "leadTime", "trailTime"] {
                    if let Some(v) = item.get(*key) {
                        out.insert((*key).to_string(), v.clone());
                    }
                }
            }
            FeatureKind::Relation => {
                for key in &["source", "sourceId", "target", "targetId", "curve", "curveHeight", "segments"] {
                    if let Some(v) = item.get(*key) {
                        out.insert((*key).to_string(), v.clone());
                    }
                }
            }
        }

        let style = merge_styles(&[
            self.defaults.get(&kind),
            options.style_defaults.as_ref(),
            item.get("style"),
        ]);
        if !style.is_null() {
            out.insert("style".to_string(), style);
        }

        Ok(Value::Object(out))
    }
}

/// Resolves the kind of a raw record: explicit `type` tag first, then shape
/// inference.
pub fn infer_kind(item: &Value) -> FeatureKind {
    if let Some(tag) = item.get("type").and_then(Value::as_str) {
        if let Ok(kind) = FeatureKind::parse(tag) {
            return kind;
        }
    }

    if item.get("samples").map_or(false, Value::is_array) {
        return FeatureKind::Trajectory;
    }
    if (item.get("source").is_some() || item.get("sourceId").is_some())
        && (item.get("target").is_some() || item.get("targetId").is_some())
    {
        return FeatureKind::Relation;
    }
    if item.get("level").is_some() || item.get("eventType").is_some() {
        return FeatureKind::Event;
    }

    let ring_len = item
        .get("positions")
        .or_else(|| item.get("coordinates"))
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    if ring_len >= 3 {
        return FeatureKind::Area;
    }
    if ring_len == 2 {
        return FeatureKind::Route;
    }

    FeatureKind::Point
}

/// Coerces the position of a record, supporting `{longitude, latitude}`,
/// `{lng, lat}`, `[lng, lat, h?]`, `position: {...}` and
/// `coordinates: [...]`.
pub fn extract_position(item: &Value) -> Option<Value> {
    if let Some(nested) = item.get("position") {
        return coerce_position(nested);
    }
    if let Some(nested) = item.get("coordinates") {
        return coerce_position(nested);
    }
    coerce_position(item)
}

fn coerce_position(v: &Value) -> Option<Value> {
    match v {
        Value::Array(parts) if parts.len() >= 2 => {
            let lng = parts[0].as_f64()?;
            let lat = parts[1].as_f64()?;
            let height = parts.get(2).and_then(Value::as_f64).unwrap_or(0.0);
            Some(position_value(lng, lat, height))
        }
        Value::Object(map) => {
            let lng = map
                .get("longitude")
                .or_else(|| map.get("lng"))
                .or_else(|| map.get("lon"))
                .and_then(Value::as_f64)?;
            let lat = map
                .get("latitude")
                .or_else(|| map.get("lat"))
                .and_then(Value::as_f64)?;
            let height = map
                .get("height")
                .or_else(|| map.get("alt"))
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            Some(position_value(lng, lat, height))
        }
        _ => None,
    }
}

fn position_value(lng: f64, lat: f64, height: f64) -> Value {
    serde_json::json!({ "longitude": lng, "latitude": lat, "height": height })
}

fn extract_positions(item: &Value) -> Option<Value> {
    let parts = item
        .get("positions")
        .or_else(|| item.get("coordinates"))
        .and_then(Value::as_array)?;

    let coerced: Vec<Value> = parts.iter().filter_map(coerce_position).collect();
    if coerced.len() == parts.len() {
        Some(Value::Array(coerced))
    } else {
        None
    }
}

// Samples arrive as {time, position|[lng,lat,h]|inline coords, ...props}.
// Unparseable timestamps drop the sample with a warning; a trajectory with
// zero surviving samples drops the record.
fn extract_samples(item: &Value) -> Result<Value, String> {
    let raw = item
        .get("samples")
        .and_then(Value::as_array)
        .ok_or_else(|| "trajectory record has no samples array".to_string())?;

    let mut samples = Vec::with_capacity(raw.len());
    for (index, sample) in raw.iter().enumerate() {
        let time = match sample.get("time").and_then(coerce_time) {
            Some(time) => time,
            None => {
                warn!("Dropping sample #{}: unparseable time.", index);
                continue;
            }
        };
        let position = match extract_position(sample) {
            Some(position) => position,
            None => {
                warn!("Dropping sample #{}: no usable position.", index);
                continue;
            }
        };

        let mut map = Map::new();
        map.insert("time".to_string(), Value::String(time.to_iso8601()));
        map.insert("position".to_string(), position);
        if let Some(props) = sample.get("props") {
            map.insert("props".to_string(), props.clone());
        }
        samples.push(Value::Object(map));
    }

    if samples.is_empty() {
        Err("no samples survived adaptation".to_string())
    } else {
        Ok(Value::Array(samples))
    }
}

/// Coerces a timestamp: ISO-8601 strings pass through, numbers are epoch
/// seconds (or milliseconds when implausibly large).
pub fn coerce_time(v: &Value) -> Option<Timestamp> {
    match v {
        Value::String(text) => Timestamp::parse(text).ok(),
        Value::Number(n) => {
            let raw = n.as_f64()?;
            // Epoch milliseconds start around 1e12 for modern dates.
            if raw.abs() >= 1.0e12 {
                Some(Timestamp::from_millis(raw))
            } else {
                Some(Timestamp::from_seconds(raw))
            }
        }
        _ => None,
    }
}

// Later sources win key-by-key; records override caller defaults override
// engine defaults.
fn merge_styles(sources: &[Option<&Value>]) -> Value {
    let mut merged = Map::new();
    for source in sources.iter().flatten() {
        if let Value::Object(map) = source {
            for (k, v) in map {
                merged.insert(k.clone(), v.clone());
            }
        }
    }

    if merged.is_empty() {
        Value::Null
    } else {
        Value::Object(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_inference_by_shape() {
        assert_eq!(infer_kind(&json!({ "samples": [] })), FeatureKind::Trajectory);
        assert_eq!(
            infer_kind(&json!({ "source": "a", "target": "b" })),
            FeatureKind::Relation
        );
        assert_eq!(infer_kind(&json!({ "level": 3 })), FeatureKind::Event);
        assert_eq!(
            infer_kind(&json!({ "positions": [[0, 0], [1, 0], [1, 1]] })),
            FeatureKind::Area
        );
        assert_eq!(
            infer_kind(&json!({ "positions": [[0, 0], [1, 0]] })),
            FeatureKind::Route
        );
        assert_eq!(infer_kind(&json!({ "lng": 1.0, "lat": 2.0 })), FeatureKind::Point);
        // Explicit tags beat shape.
        assert_eq!(
            infer_kind(&json!({ "type": "polyline", "positions": [[0, 0], [1, 0], [1, 1]] })),
            FeatureKind::Polyline
        );
    }

    #[test]
    fn coordinate_shapes() {
        let shapes = [
            json!({ "position": { "longitude": 116.4, "latitude": 39.9 } }),
            json!({ "longitude": 116.4, "latitude": 39.9 }),
            json!({ "lng": 116.4, "lat": 39.9 }),
            json!({ "coordinates": [116.4, 39.9, 10.0] }),
        ];

        let adapter = DataAdapter::new();
        for shape in &shapes {
            let features = adapter.adapt(shape, &AdaptOptions::default());
            assert_eq!(features.len(), 1, "failed on {}", shape);
            let v = features[0].position().unwrap();
            assert!((v.longitude - 116.4).abs() < 1e-9);
        }
    }

    #[test]
    fn invalid_items_drop_silently() {
        let adapter = DataAdapter::new();
        let raw = json!([
            { "id": "good", "position": { "longitude": 0.0, "latitude": 0.0 } },
            { "id": "bad" },
            "not even an object"
        ]);

        let features = adapter.adapt(&raw, &AdaptOptions::default());
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].id(), "good");
        assert!(features[0].source_ref.is_some());
    }

    #[test]
    fn style_defaults_layering() {
        let mut adapter = DataAdapter::new();
        adapter.set_default_style(
            FeatureKind::Point,
            json!({ "pixelSize": 4.0, "outlineWidth": 3.0 }),
        );

        let options = AdaptOptions {
            style_defaults: Some(json!({ "pixelSize": 8.0 })),
            ..Default::default()
        };
        let raw = json!({
            "position": { "longitude": 0.0, "latitude": 0.0 },
            "style": { "color": "#ff0000" }
        });

        let features = adapter.adapt(&raw, &options);
        match features[0].payload() {
            crate::feature::FeaturePayload::Point(v) => {
                assert_eq!(v.style.pixel_size, 8.0);
                assert_eq!(v.style.outline_width, 3.0);
                assert_eq!(v.style.color, crate::math::color::Color::red());
            }
            _ => panic!("wrong payload"),
        }
    }

    #[test]
    fn timestamp_coercion() {
        assert!(coerce_time(&json!("2024-01-01T00:00:00Z")).is_some());
        let from_secs = coerce_time(&json!(1_700_000_000)).unwrap();
        let from_millis = coerce_time(&json!(1_700_000_000_000i64)).unwrap();
        assert!((from_secs - from_millis).abs() < 1e-6);
        assert!(coerce_time(&json!(true)).is_none());

        // Samples with bad times drop; the rest survive.
        let adapter = DataAdapter::new();
        let raw = json!({
            "samples": [
                { "time": "2024-01-01T00:00:00Z", "position": [0.0, 0.0] },
                { "time": "garbage", "position": [1.0, 0.0] },
                { "time": "2024-01-01T00:01:00Z", "position": [2.0, 0.0] }
            ]
        });
        let features = adapter.adapt(&raw, &AdaptOptions::default());
        match features[0].payload() {
            crate::feature::FeaturePayload::Trajectory(v) => assert_eq!(v.sample_count(), 2),
            _ => panic!("wrong payload"),
        }
    }
}
