//! The canonical feature model.
//!
//! Every renderable is a [`Feature`]: a shared header (id, name, visibility,
//! properties, availability) plus a kind-specific payload. Payloads form a
//! tagged variant instead of a class hierarchy; back-references (the owning
//! layer, relation endpoints) are ids resolved through lookup tables, never
//! pointers.

pub mod polygon;
pub mod polyline;
pub mod relation;
pub mod style;
pub mod trajectory;

pub use self::polygon::PolygonGraphic;
pub use self::polyline::PolylineGraphic;
pub use self::relation::Relation;
pub use self::trajectory::{Interpolation, Trajectory, TrajectorySample};

use serde_json::{json, Map, Value};

use crate::clock::interval::TimeInterval;
use crate::errors::{Error, Result};
use crate::event::{EventHub, EventType, Lifecycle, Managed};
use crate::host::DrawPrimitive;
use crate::material::MaterialDesc;
use crate::math::position::Position;
use crate::utils::hash::hash64;
use crate::utils::time::Timestamp;

use self::style::{BillboardStyle, EventStyle, LabelStyle, ModelStyle, PointStyle};

pub type FeatureId = String;

/// The closed set of feature kinds.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    Point,
    Billboard,
    Label,
    Model,
    Polyline,
    Route,
    Polygon,
    Area,
    Trajectory,
    Relation,
    Event,
}

impl FeatureKind {
    pub fn all() -> &'static [FeatureKind] {
        &[
            FeatureKind::Point,
            FeatureKind::Billboard,
            FeatureKind::Label,
            FeatureKind::Model,
            FeatureKind::Polyline,
            FeatureKind::Route,
            FeatureKind::Polygon,
            FeatureKind::Area,
            FeatureKind::Trajectory,
            FeatureKind::Relation,
            FeatureKind::Event,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FeatureKind::Point => "point",
            FeatureKind::Billboard => "billboard",
            FeatureKind::Label => "label",
            FeatureKind::Model => "model",
            FeatureKind::Polyline => "polyline",
            FeatureKind::Route => "route",
            FeatureKind::Polygon => "polygon",
            FeatureKind::Area => "area",
            FeatureKind::Trajectory => "trajectory",
            FeatureKind::Relation => "relation",
            FeatureKind::Event => "event",
        }
    }

    pub fn parse(v: &str) -> Result<FeatureKind> {
        FeatureKind::all()
            .iter()
            .cloned()
            .find(|kind| kind.as_str() == v)
            .ok_or_else(|| Error::KindUnknown(v.to_string()))
    }
}

/// Kinds a `create`/`fromJSON` caller may ask for.
pub fn supported_kinds() -> &'static [FeatureKind] {
    FeatureKind::all()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointGraphic {
    pub position: Position,
    pub style: PointStyle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillboardGraphic {
    pub position: Position,
    pub style: BillboardStyle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelGraphic {
    pub position: Position,
    pub style: LabelStyle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelGraphic {
    pub position: Position,
    /// Heading in degrees clockwise from north.
    pub heading: f64,
    pub style: ModelStyle,
}

/// A point-in-time happening: marker plus an optional expanding ground ring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventGraphic {
    pub position: Position,
    pub level: i32,
    /// Ground-ring radius in meters; zero draws no ring.
    pub radius: f64,
    pub style: EventStyle,
}

/// Kind-specific payload of a feature.
#[derive(Debug, Clone)]
pub enum FeaturePayload {
    Point(PointGraphic),
    Billboard(BillboardGraphic),
    Label(LabelGraphic),
    Model(ModelGraphic),
    Polyline(PolylineGraphic),
    Route(PolylineGraphic),
    Polygon(PolygonGraphic),
    Area(PolygonGraphic),
    Trajectory(Trajectory),
    Relation(Relation),
    Event(EventGraphic),
}

impl FeaturePayload {
    pub fn kind(&self) -> FeatureKind {
        match *self {
            FeaturePayload::Point(_) => FeatureKind::Point,
            FeaturePayload::Billboard(_) => FeatureKind::Billboard,
            FeaturePayload::Label(_) => FeatureKind::Label,
            FeaturePayload::Model(_) => FeatureKind::Model,
            FeaturePayload::Polyline(_) => FeatureKind::Polyline,
            FeaturePayload::Route(_) => FeatureKind::Route,
            FeaturePayload::Polygon(_) => FeatureKind::Polygon,
            FeaturePayload::Area(_) => FeatureKind::Area,
            FeaturePayload::Trajectory(_) => FeatureKind::Trajectory,
            FeaturePayload::Relation(_) => FeatureKind::Relation,
            FeaturePayload::Event(_) => FeatureKind::Event,
        }
    }
}

/// A canonical renderable record.
pub struct Feature {
    id: FeatureId,
    pub name: String,
    visible: bool,
    pub interactive: bool,
    pub properties: Value,
    availability: Option<TimeInterval>,
    payload: FeaturePayload,
    /// Back-pointer to the raw input record this feature was adapted from.
    pub source_ref: Option<Value>,

    events: EventHub,
    lifecycle: Lifecycle,

    // Arena back-reference: the owning layer's id, never a pointer.
    pub(crate) layer_id: Option<String>,
    // Per-frame culling verdict; owned by the culling pass.
    pub(crate) culled: bool,
    pub(crate) positions_dirty: bool,
    pub(crate) style_dirty: bool,
    pub(crate) availability_dirty: bool,
}

impl ::std::fmt::Debug for Feature {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.debug_struct("Feature")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("visible", &self.visible)
            .finish()
    }
}

impl Managed for Feature {
    fn event_hub(&mut self) -> &mut EventHub {
        &mut self.events
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

impl Feature {
    pub fn new<T: Into<FeatureId>>(id: T, payload: FeaturePayload) -> Self {
        Feature {
            id: id.into(),
            name: String::new(),
            visible: true,
            interactive: true,
            properties: Value::Null,
            availability: None,
            payload,
            source_ref: None,
            events: EventHub::new(),
            lifecycle: Lifecycle::new(),
            layer_id: None,
            culled: false,
            positions_dirty: true,
            style_dirty: true,
            availability_dirty: false,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn kind(&self) -> FeatureKind {
        self.payload.kind()
    }

    #[inline]
    pub fn payload(&self) -> &FeaturePayload {
        &self.payload
    }

    // Engine-internal mutation (relation path refresh) that is not a user
    // edit: no dirty marking, no change event.
    pub(crate) fn payload_mut_silent(&mut self) -> &mut FeaturePayload {
        &mut self.payload
    }

    /// Mutates the payload through a closure; marks the visual dirty and
    /// fires `change` after the closure returns, so observers see consistent
    /// state.
    pub fn with_payload_mut<R, F: FnOnce(&mut FeaturePayload) -> R>(&mut self, f: F) -> R {
        let result = f(&mut self.payload);
        self.positions_dirty = true;
        self.style_dirty = true;
        self.events
            .fire(EventType::Change, json!({ "id": self.id }));
        result
    }

    #[inline]
    pub fn visible(&self) -> bool {
        self.visible
    }

    /// The feature's own visibility flag; layer visibility gates separately.
    pub fn set_visible(&mut self, visible: bool) {
        if self.visible != visible {
            self.visible = visible;
            let kind = if visible {
                EventType::Show
            } else {
                EventType::Hide
            };
            self.events.fire(kind, json!({ "id": self.id }));
        }
    }

    #[inline]
    pub fn availability(&self) -> Option<TimeInterval> {
        self.availability
    }

    pub fn set_availability(&mut self, window: Option<TimeInterval>) {
        if self.availability != window {
            self.availability = window;
            self.availability_dirty = true;
            self.events
                .fire(EventType::Change, json!({ "id": self.id }));
        }
    }

    pub fn set_name<T: Into<String>>(&mut self, name: T) {
        self.name = name.into();
        self.events
            .fire(EventType::Change, json!({ "id": self.id }));
    }

    /// Primary position: the anchor for point-like kinds, the first vertex
    /// otherwise, the first sample for trajectories.
    pub fn position(&self) -> Option<Position> {
        match self.payload {
            FeaturePayload::Point(ref v) => Some(v.position),
            FeaturePayload::Billboard(ref v) => Some(v.position),
            FeaturePayload::Label(ref v) => Some(v.position),
            FeaturePayload::Model(ref v) => Some(v.position),
            FeaturePayload::Event(ref v) => Some(v.position),
            FeaturePayload::Polyline(ref v) | FeaturePayload::Route(ref v) => {
                v.positions().first().cloned()
            }
            FeaturePayload::Polygon(ref v) | FeaturePayload::Area(ref v) => {
                v.positions().first().cloned()
            }
            FeaturePayload::Trajectory(ref v) => v.samples().first().map(|s| s.position),
            FeaturePayload::Relation(ref v) => v.path().first().cloned(),
        }
    }

    /// The position the feature occupies at `t`; differs from `position()`
    /// only for trajectories.
    pub fn position_at(&self, t: Timestamp) -> Option<Position> {
        match self.payload {
            FeaturePayload::Trajectory(ref v) => v.position_at(t),
            _ => self.position(),
        }
    }

    /// Moves a point-like feature. Warns and no-ops for multi-vertex kinds.
    pub fn set_position(&mut self, position: Position) {
        let updated = match self.payload {
            FeaturePayload::Point(ref mut v) => {
                v.position = position;
                true
            }
            FeaturePayload::Billboard(ref mut v) => {
                v.position = position;
                true
            }
            FeaturePayload::Label(ref mut v) => {
                v.position = position;
                true
            }
            FeaturePayload::Model(ref mut v) => {
                v.position = position;
                true
            }
            FeaturePayload::Event(ref mut v) => {
                v.position = position;
                true
            }
            _ => {
                warn!(
                    "set_position on {:?} feature {} ignored; use set_positions.",
                    self.kind(),
                    self.id
                );
                false
            }
        };

        if updated {
            self.positions_dirty = true;
            self.events
                .fire(EventType::Change, json!({ "id": self.id }));
        }
    }

    /// Replaces the vertex list of a multi-vertex feature. Warns and no-ops
    /// for point-like kinds.
    pub fn set_positions(&mut self, positions: Vec<Position>) {
        let updated = match self.payload {
            FeaturePayload::Polyline(ref mut v) | FeaturePayload::Route(ref mut v) => {
                v.set_positions(positions);
                true
            }
            FeaturePayload::Polygon(ref mut v) | FeaturePayload::Area(ref mut v) => {
                v.set_positions(positions);
                true
            }
            _ => {
                warn!(
                    "set_positions on {:?} feature {} ignored; use set_position.",
                    self.kind(),
                    self.id
                );
                false
            }
        };

        if updated {
            self.positions_dirty = true;
            self.events
                .fire(EventType::Change, json!({ "id": self.id }));
        }
    }

    /// The animated material carried by this feature's style, if any.
    pub fn material_desc(&self) -> Option<&MaterialDesc> {
        match self.payload {
            FeaturePayload::Polyline(ref v) | FeaturePayload::Route(ref v) => {
                v.style.material.as_ref()
            }
            FeaturePayload::Polygon(ref v) | FeaturePayload::Area(ref v) => {
                v.style.material.as_ref()
            }
            FeaturePayload::Trajectory(ref v) => v.style.path.material.as_ref(),
            FeaturePayload::Relation(ref v) => v.style.material.as_ref(),
            _ => None,
        }
    }

    /// The feature's distance-scaling specification, when its style has one.
    pub fn scale_by_distance(&self) -> Option<&style::ScaleByDistance> {
        match self.payload {
            FeaturePayload::Point(ref v) => v.style.scale_by_distance.as_ref(),
            FeaturePayload::Billboard(ref v) => v.style.scale_by_distance.as_ref(),
            FeaturePayload::Model(ref v) => v.style.scale_by_distance.as_ref(),
            FeaturePayload::Event(ref v) => v.style.marker.scale_by_distance.as_ref(),
            _ => None,
        }
    }

    /// Whether the drawable hugs the terrain, part of the batching key.
    pub fn clamp_to_ground(&self) -> bool {
        match self.payload {
            FeaturePayload::Point(ref v) => v.style.clamp_to_ground,
            FeaturePayload::Billboard(ref v) => v.style.clamp_to_ground,
            FeaturePayload::Polyline(ref v) | FeaturePayload::Route(ref v) => {
                v.style.clamp_to_ground
            }
            FeaturePayload::Polygon(ref v) | FeaturePayload::Area(ref v) => {
                v.style.clamp_to_ground
            }
            _ => false,
        }
    }

    /// The kind-specific style as JSON, as exported.
    pub fn style_json(&self) -> Value {
        let style = match self.payload {
            FeaturePayload::Point(ref v) => ::serde_json::to_value(&v.style),
            FeaturePayload::Billboard(ref v) => ::serde_json::to_value(&v.style),
            FeaturePayload::Label(ref v) => ::serde_json::to_value(&v.style),
            FeaturePayload::Model(ref v) => ::serde_json::to_value(&v.style),
            FeaturePayload::Polyline(ref v) | FeaturePayload::Route(ref v) => {
                ::serde_json::to_value(&v.style)
            }
            FeaturePayload::Polygon(ref v) | FeaturePayload::Area(ref v) => {
                ::serde_json::to_value(&v.style)
            }
            FeaturePayload::Trajectory(ref v) => ::serde_json::to_value(&v.style),
            FeaturePayload::Relation(ref v) => ::serde_json::to_value(&v.style),
            FeaturePayload::Event(ref v) => ::serde_json::to_value(&v.style),
        };
        style.unwrap_or(Value::Null)
    }

    /// 64-bit identity of (kind, style), the repetition key for instancing
    /// and batching.
    pub fn style_signature(&self) -> u64 {
        hash64(&format!("{}:{}", self.kind().as_str(), self.style_json()))
    }

    /// Builds this feature's host primitives for the current frame.
    /// Trajectories evaluate at `t`; relations use their latest resolved
    /// path; event rings derive their phase from `t`.
    pub fn primitives(&self, t: Timestamp) -> Vec<DrawPrimitive> {
        let mut out = Vec::new();
        match self.payload {
            FeaturePayload::Point(ref v) => {
                out.push(point_primitive(v.position, &v.style));
                if let Some(ref label) = v.style.label {
                    out.push(label_primitive(v.position, label));
                }
            }
            FeaturePayload::Billboard(ref v) => {
                out.push(DrawPrimitive::Billboard {
                    position: v.position,
                    image: v.style.image.clone(),
                    scale: v.style.scale,
                    color: v.style.color,
                    rotation: v.style.rotation,
                });
            }
            FeaturePayload::Label(ref v) => {
                out.push(label_primitive(v.position, &v.style));
            }
            FeaturePayload::Model(ref v) => {
                out.push(DrawPrimitive::Model {
                    position: v.position,
                    uri: v.style.uri.clone(),
                    scale: v.style.scale,
                    heading: v.heading,
                    color: v.style.color,
                });
            }
            FeaturePayload::Polyline(ref v) | FeaturePayload::Route(ref v) => {
                if v.positions().len() >= 2 {
                    out.push(DrawPrimitive::Polyline {
                        positions: v.positions().to_vec(),
                        width: v.style.width,
                        color: v.style.color,
                        clamp_to_ground: v.style.clamp_to_ground,
                    });
                }
            }
            FeaturePayload::Polygon(ref v) | FeaturePayload::Area(ref v) => {
                if v.positions().len() >= 3 {
                    out.push(DrawPrimitive::Polygon {
                        positions: v.positions().to_vec(),
                        fill: v.style.fill,
                        fill_color: v.style.fill_color,
                        outline: v.style.outline,
                        outline_color: v.style.outline_color,
                        outline_width: v.style.outline_width,
                        extruded_height: v.style.extruded_height,
                        height: v.style.height,
                        clamp_to_ground: v.style.clamp_to_ground,
                    });
                }
            }
            FeaturePayload::Trajectory(ref v) => {
                if let Some(position) = v.position_at(t) {
                    if let Some(ref marker) = v.style.marker {
                        out.push(DrawPrimitive::Billboard {
                            position,
                            image: marker.image.clone(),
                            scale: marker.scale,
                            color: marker.color,
                            rotation: marker.rotation,
                        });
                    }
                    if let Some(ref model) = v.style.model {
                        let heading = if v.style.orient_to_bearing {
                            v.bearing_at(t).unwrap_or(0.0)
                        } else {
                            0.0
                        };
                        out.push(DrawPrimitive::Model {
                            position,
                            uri: model.uri.clone(),
                            scale: model.scale,
                            heading,
                            color: model.color,
                        });
                    }
                    if v.style.marker.is_none() && v.style.model.is_none() {
                        out.push(point_primitive(position, &PointStyle::default()));
                    }
                }

                if v.style.show_path {
                    let path = v.path_window(t, 100);
                    if path.len() >= 2 {
                        out.push(DrawPrimitive::Polyline {
                            positions: path,
                            width: v.style.path.width,
                            color: v.style.path.color,
                            clamp_to_ground: v.style.path.clamp_to_ground,
                        });
                    }
                }

                if let (Some(style), Some(first)) =
                    (v.style.start_point.as_ref(), v.samples().first())
                {
                    out.push(point_primitive(first.position, style));
                }
                if let (Some(style), Some(last)) =
                    (v.style.end_point.as_ref(), v.samples().last())
                {
                    out.push(point_primitive(last.position, style));
                }
            }
            FeaturePayload::Relation(ref v) => {
                let path = v.path();
                if path.len() >= 2 {
                    out.push(DrawPrimitive::Polyline {
                        positions: path.to_vec(),
                        width: v.style.width,
                        color: v.style.color,
                        clamp_to_ground: false,
                    });
                    if let Some(ref label) = v.style.label {
                        out.push(label_primitive(path[path.len() / 2], label));
                    }
                }
            }
            FeaturePayload::Event(ref v) => {
                out.push(point_primitive(v.position, &v.style.marker));
                if v.radius > 0.0 {
                    out.push(DrawPrimitive::GroundCircle {
                        center: v.position,
                        radius: v.radius,
                        color: v.style.ring_color,
                        phase: crate::material::scroll_phase(t, v.style.ring_speed),
                    });
                }
            }
        }
        out
    }

    /// Emits the minimum JSON to reconstruct this feature via
    /// [`Feature::from_json`].
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".to_string(), json!(self.kind().as_str()));
        map.insert("id".to_string(), json!(self.id));
        map.insert("name".to_string(), json!(self.name));
        map.insert("show".to_string(), json!(self.visible));
        map.insert("style".to_string(), self.style_json());

        if !self.properties.is_null() {
            map.insert("properties".to_string(), self.properties.clone());
        }
        if let Some(window) = self.availability {
            map.insert(
                "availability".to_string(),
                ::serde_json::to_value(&window).unwrap_or(Value::Null),
            );
        }

        match self.payload {
            FeaturePayload::Point(ref v) => {
                map.insert("position".to_string(), position_json(v.position));
            }
            FeaturePayload::Billboard(ref v) => {
                map.insert("position".to_string(), position_json(v.position));
            }
            FeaturePayload::Label(ref v) => {
                map.insert("position".to_string(), position_json(v.position));
            }
            FeaturePayload::Model(ref v) => {
                map.insert("position".to_string(), position_json(v.position));
                map.insert("heading".to_string(), json!(v.heading));
            }
            FeaturePayload::Polyline(ref v) | FeaturePayload::Route(ref v) => {
                map.insert("positions".to_string(), positions_json(v.positions()));
            }
            FeaturePayload::Polygon(ref v) | FeaturePayload::Area(ref v) => {
                map.insert("positions".to_string(), positions_json(v.positions()));
            }
            FeaturePayload::Trajectory(ref v) => {
                map.insert(
                    "samples".to_string(),
                    ::serde_json::to_value(v.samples()).unwrap_or(Value::Null),
                );
                map.insert(
                    "interpolation".to_string(),
                    ::serde_json::to_value(&v.interpolation).unwrap_or(Value::Null),
                );
                if let Some(lead) = v.lead_time {
                    map.insert("leadTime".to_string(), json!(lead));
                }
                if let Some(trail) = v.trail_time {
                    map.insert("trailTime".to_string(), json!(trail));
                }
            }
            FeaturePayload::Relation(ref v) => {
                map.insert("source".to_string(), json!(v.source_id));
                map.insert("target".to_string(), json!(v.target_id));
                map.insert("curve".to_string(), json!(v.curve));
                map.insert("curveHeight".to_string(), json!(v.curve_height));
                map.insert("segments".to_string(), json!(v.segments));
            }
            FeaturePayload::Event(ref v) => {
                map.insert("position".to_string(), position_json(v.position));
                map.insert("level".to_string(), json!(v.level));
                map.insert("radius".to_string(), json!(v.radius));
            }
        }

        Value::Object(map)
    }

    /// Reconstructs a feature from [`Feature::to_json`] output.
    pub fn from_json(v: &Value) -> Result<Feature> {
        let kind_str = v
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::DocumentInvalid("feature", "missing type tag".to_string()))?;
        create(FeatureKind::parse(kind_str)?, v)
    }

    pub(crate) fn mark_added(&mut self, layer_id: &str) -> bool {
        if self.lifecycle.mark_attached(&self.id) {
            self.layer_id = Some(layer_id.to_string());
            self.events.fire(
                EventType::Add,
                json!({ "id": self.id, "layerId": layer_id }),
            );
            true
        } else {
            false
        }
    }

    pub(crate) fn mark_removed(&mut self) {
        if self.lifecycle.mark_detached() {
            self.layer_id = None;
            self.events
                .fire(EventType::Remove, json!({ "id": self.id }));
        }
    }

    /// Finalizes the feature; idempotent, empties the event tables.
    pub fn destroy(&mut self) {
        if self.lifecycle.mark_destroyed() {
            self.events
                .fire(EventType::Destroy, json!({ "id": self.id }));
            self.events.clear();
        }
    }
}

/// Builds a feature of `kind` from a canonical options object. Unknown kinds
/// never reach here (the enum is closed); malformed geometry is a
/// `DocumentInvalid` error the adapter logs-and-drops.
pub fn create(kind: FeatureKind, options: &Value) -> Result<Feature> {
    let payload = match kind {
        FeatureKind::Point => FeaturePayload::Point(PointGraphic {
            position: required_position(options)?,
            style: parse_style(options)?,
        }),
        FeatureKind::Billboard => FeaturePayload::Billboard(BillboardGraphic {
            position: required_position(options)?,
            style: parse_style(options)?,
        }),
        FeatureKind::Label => FeaturePayload::Label(LabelGraphic {
            position: required_position(options)?,
            style: parse_style(options)?,
        }),
        FeatureKind::Model => FeaturePayload::Model(ModelGraphic {
            position: required_position(options)?,
            heading: options.get("heading").and_then(Value::as_f64).unwrap_or(0.0),
            style: parse_style(options)?,
        }),
        FeatureKind::Polyline | FeatureKind::Route => {
            let positions = required_positions(options, 2)?;
            let mut graphic = PolylineGraphic::new(positions);
            graphic.style = parse_style(options)?;
            if kind == FeatureKind::Route {
                FeaturePayload::Route(graphic)
            } else {
                FeaturePayload::Polyline(graphic)
            }
        }
        FeatureKind::Polygon | FeatureKind::Area => {
            let positions = required_positions(options, 3)?;
            let mut graphic = PolygonGraphic::new(positions);
            graphic.style = parse_style(options)?;
            if kind == FeatureKind::Area {
                FeaturePayload::Area(graphic)
            } else {
                FeaturePayload::Polygon(graphic)
            }
        }
        FeatureKind::Trajectory => {
            let samples: Vec<TrajectorySample> = options
                .get("samples")
                .cloned()
                .map(::serde_json::from_value)
                .transpose()
                .map_err(|err| Error::DocumentInvalid("feature", err.to_string()))?
                .unwrap_or_default();
            if samples.is_empty() {
                return Err(Error::DocumentInvalid(
                    "feature",
                    "trajectory needs at least one sample".to_string(),
                ));
            }

            let mut trajectory = Trajectory::new(samples);
            trajectory.style = parse_style(options)?;
            if let Some(v) = options.get("interpolation") {
                trajectory.interpolation = ::serde_json::from_value(v.clone())
                    .map_err(|err| Error::DocumentInvalid("feature", err.to_string()))?;
            }
            trajectory.lead_time = options.get("leadTime").and_then(Value::as_f64);
            trajectory.trail_time = options.get("trailTime").and_then(Value::as_f64);
            FeaturePayload::Trajectory(trajectory)
        }
        FeatureKind::Relation => {
            let source = options
                .get("source")
                .or_else(|| options.get("sourceId"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    Error::DocumentInvalid("feature", "relation needs a source id".to_string())
                })?;
            let target = options
                .get("target")
                .or_else(|| options.get("targetId"))
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    Error::DocumentInvalid("feature", "relation needs a target id".to_string())
                })?;

            let mut relation = Relation::new(source, target);
            relation.curve = options
                .get("curve")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if let Some(height) = options.get("curveHeight").and_then(Value::as_f64) {
                relation.curve_height = height;
            }
            if let Some(segments) = options.get("segments").and_then(Value::as_u64) {
                relation.segments = segments as usize;
            }
            relation.style = parse_style(options)?;
            FeaturePayload::Relation(relation)
        }
        FeatureKind::Event => FeaturePayload::Event(EventGraphic {
            position: required_position(options)?,
            level: options.get("level").and_then(Value::as_i64).unwrap_or(0) as i32,
            radius: options.get("radius").and_then(Value::as_f64).unwrap_or(0.0),
            style: parse_style(options)?,
        }),
    };

    let id = options
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| ::uuid::Uuid::new_v4().to_string());

    let mut feature = Feature::new(id, payload);
    if let Some(name) = options.get("name").and_then(Value::as_str) {
        feature.name = name.to_string();
    }
    if let Some(show) = options.get("show").and_then(Value::as_bool) {
        feature.visible = show;
    }
    if let Some(interactive) = options.get("interactive").and_then(Value::as_bool) {
        feature.interactive = interactive;
    }
    if let Some(properties) = options.get("properties") {
        feature.properties = properties.clone();
    }
    if let Some(window) = options.get("availability") {
        feature.availability = ::serde_json::from_value(window.clone())
            .map_err(|err| Error::DocumentInvalid("feature", err.to_string()))?;
    }

    Ok(feature)
}

fn parse_style<T: Default + ::serde::de::DeserializeOwned>(options: &Value) -> Result<T> {
    match options.get("style") {
        None | Some(Value::Null) => Ok(T::default()),
        Some(style) => ::serde_json::from_value(style.clone())
            .map_err(|err| Error::DocumentInvalid("style", err.to_string())),
    }
}

fn required_position(options: &Value) -> Result<Position> {
    let v = options
        .get("position")
        .ok_or_else(|| Error::DocumentInvalid("feature", "missing position".to_string()))?;
    let position: Position = ::serde_json::from_value(v.clone())
        .map_err(|err| Error::DocumentInvalid("feature", err.to_string()))?;

    if position.is_valid() {
        Ok(position)
    } else {
        Err(Error::DocumentInvalid(
            "feature",
            format!("position out of range: {:?}", position),
        ))
    }
}

fn required_positions(options: &Value, min: usize) -> Result<Vec<Position>> {
    let v = options
        .get("positions")
        .ok_or_else(|| Error::DocumentInvalid("feature", "missing positions".to_string()))?;
    let positions: Vec<Position> = ::serde_json::from_value(v.clone())
        .map_err(|err| Error::DocumentInvalid("feature", err.to_string()))?;

    if positions.len() < min {
        return Err(Error::DocumentInvalid(
            "feature",
            format!("needs at least {} positions, got {}", min, positions.len()),
        ));
    }
    if let Some(bad) = positions.iter().find(|p| !p.is_valid()) {
        return Err(Error::DocumentInvalid(
            "feature",
            format!("position out of range: {:?}", bad),
        ));
    }

    Ok(positions)
}

fn position_json(v: Position) -> Value {
    ::serde_json::to_value(&v).unwrap_or(Value::Null)
}

fn positions_json(v: &[Position]) -> Value {
    ::serde_json::to_value(v).unwrap_or(Value::Null)
}

fn point_primitive(position: Position, style: &PointStyle) -> DrawPrimitive {
    if let Some(ref icon) = style.icon {
        DrawPrimitive::Billboard {
            position,
            image: icon.clone(),
            scale: style.icon_scale,
            color: style.color,
            rotation: 0.0,
        }
    } else {
        DrawPrimitive::Point {
            position,
            pixel_size: style.pixel_size,
            color: style.color,
            outline_color: style.outline_color,
            outline_width: style.outline_width,
            clamp_to_ground: style.clamp_to_ground,
        }
    }
}

fn label_primitive(position: Position, style: &LabelStyle) -> DrawPrimitive {
    DrawPrimitive::Label {
        position,
        text: style.text.clone(),
        font: style.font.clone(),
        fill_color: style.fill_color,
        pixel_offset: style.pixel_offset,
        scale: style.scale,
    }
}
