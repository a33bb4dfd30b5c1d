//! Named, ordered, independently-visible feature buckets.

use serde_json::{json, Map, Value};

use crate::adapter::{AdaptOptions, DataAdapter};
use crate::clock::{TimeInterval, TimeManager};
use crate::event::{EventHub, EventType, Lifecycle, Managed};
use crate::feature::{Feature, FeatureId, FeaturePayload};
use crate::host::{
    CameraState, DrawCommand, DrawList, ImageryProviderConfig, RenderStrategy,
    TerrainProviderConfig,
};
use crate::material::MaterialManager;
use crate::math::position::Position;
use crate::utils::hash::FastHashSet;

use super::entities::EntityManager;
use super::renderer::RendererFactory;
use super::stats::LayerStats;

pub type LayerId = String;

/// Construction options of a layer.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerOptions {
    pub name: String,
    pub show: Option<bool>,
    pub opacity: Option<f64>,
    pub z_index: i32,
    /// Camera-height band (meters); outside it the whole layer culls away.
    pub minimum_level: Option<f64>,
    pub maximum_level: Option<f64>,
    /// Intersected with the engine's time range when both are set.
    pub time_range: Option<TimeInterval>,
    /// Per-layer cap; `None` inherits the engine option.
    pub max_entities: Option<usize>,
    /// Forces a drawing strategy for every feature in the layer.
    pub renderer: Option<RenderStrategy>,
    /// Default style merged under each adapted record's own style.
    pub style: Option<Value>,
    pub imagery: Option<ImageryProviderConfig>,
    pub terrain: Option<TerrainProviderConfig>,
}

/// A queued mutation, drained on the next frame in insertion order.
#[derive(Debug, Clone)]
pub enum LayerUpdate {
    AddData(Value),
    RemoveFeature(FeatureId),
    SetFeatureVisible(FeatureId, bool),
    MoveFeature(FeatureId, Position),
    SetVisible(bool),
    SetOpacity(f64),
    Clear,
}

/// What draining one update produced; the engine turns this into host
/// removals and interaction broadcasts.
#[derive(Debug, Default)]
pub(crate) struct UpdateOutcome {
    pub broadcast: Option<(EventType, Value)>,
    pub removed: Vec<FeatureId>,
}

/// A named bucket of features with its own visibility, opacity, time range
/// and renderer selection. The layer owns ids; the features live in the
/// engine's entity table.
pub struct Layer {
    id: LayerId,
    pub name: String,
    visible: bool,
    opacity: f64,
    pub z_index: i32,
    pub minimum_level: Option<f64>,
    pub maximum_level: Option<f64>,
    time_range: Option<TimeInterval>,
    max_entities: usize,
    renderer_override: Option<RenderStrategy>,
    style_defaults: Option<Value>,
    imagery: Option<ImageryProviderConfig>,
    terrain: Option<TerrainProviderConfig>,
    is_loading: bool,

    entity_ids: Vec<FeatureId>,
    entity_set: FastHashSet<FeatureId>,

    events: EventHub,
    lifecycle: Lifecycle,
    stats: LayerStats,

    // Reaction to other layers' dataChanged/visibilityChanged broadcasts;
    // no-op unless installed.
    interaction_hook: Option<Box<dyn FnMut(&str, &EventType, &Value)>>,
}

impl ::std::fmt::Debug for Layer {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.debug_struct("Layer")
            .field("id", &self.id)
            .field("visible", &self.visible)
            .field("entities", &self.entity_ids.len())
            .finish()
    }
}

impl Managed for Layer {
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

impl Layer {
    pub(crate) fn new(id: &str, options: LayerOptions, default_max_entities: usize) -> Self {
        let remote_provider = options.imagery.is_some()
            || options.terrain.as_ref().map_or(false, |t| t.is_remote());

        Layer {
            id: id.to_string(),
            name: if options.name.is_empty() {
                id.to_string()
            } else {
                options.name
            },
            visible: options.show.unwrap_or(true),
            opacity: options.opacity.unwrap_or(1.0).max(0.0).min(1.0),
            z_index: options.z_index,
            minimum_level: options.minimum_level,
            maximum_level: options.maximum_level,
            time_range: options.time_range,
            max_entities: options.max_entities.unwrap_or(default_max_entities),
            renderer_override: options.renderer,
            style_defaults: options.style,
            imagery: options.imagery,
            terrain: options.terrain,
            is_loading: remote_provider,
            entity_ids: Vec::new(),
            entity_set: FastHashSet::default(),
            events: EventHub::new(),
            lifecycle: Lifecycle::new(),
            stats: LayerStats::default(),
            interaction_hook: None,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn visible(&self) -> bool {
        self.visible
    }

    #[inline]
    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.max(0.0).min(1.0);
        self.events
            .fire(EventType::Change, json!({ "layerId": self.id }));
    }

    #[inline]
    pub fn time_range(&self) -> Option<TimeInterval> {
        self.time_range
    }

    pub fn set_time_range(&mut self, range: Option<TimeInterval>) {
        self.time_range = range;
    }

    #[inline]
    pub fn renderer_override(&self) -> Option<RenderStrategy> {
        self.renderer_override
    }

    pub fn set_renderer_override(&mut self, strategy: Option<RenderStrategy>) {
        self.renderer_override = strategy;
    }

    #[inline]
    pub fn max_entities(&self) -> usize {
        self.max_entities
    }

    pub(crate) fn set_max_entities(&mut self, max: usize) {
        self.max_entities = max;
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.entity_set.contains(id)
    }

    #[inline]
    pub fn entity_ids(&self) -> &[FeatureId] {
        &self.entity_ids
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entity_ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entity_ids.is_empty()
    }

    #[inline]
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// The layer's default style for adapted records.
    pub fn style_defaults_cloned(&self) -> Option<Value> {
        self.style_defaults.clone()
    }

    #[inline]
    pub fn imagery(&self) -> Option<&ImageryProviderConfig> {
        self.imagery.as_ref()
    }

    #[inline]
    pub fn terrain(&self) -> Option<&TerrainProviderConfig> {
        self.terrain.as_ref()
    }

    /// Host callback once an async provider finished loading.
    pub fn finish_loading(&mut self, error: Option<String>) {
        self.is_loading = false;
        match error {
            None => self.events.fire(EventType::Load, json!({ "layerId": self.id })),
            Some(message) => self.events.fire(
                EventType::LoadError,
                json!({ "layerId": self.id, "message": message }),
            ),
        }
    }

    #[inline]
    pub fn stats(&self) -> &LayerStats {
        &self.stats
    }

    /// Installs the reaction to other layers' broadcasts.
    pub fn set_interaction_hook<F>(&mut self, hook: F)
    where
        F: FnMut(&str, &EventType, &Value) + 'static,
    {
        self.interaction_hook = Some(Box::new(hook));
    }

    /// Called by the engine when any *other* layer changed data or
    /// visibility. Default is a no-op.
    pub(crate) fn on_layer_interaction(&mut self, source: &str, event: &EventType, data: &Value) {
        if let Some(ref mut hook) = self.interaction_hook {
            hook(source, event, data);
        }
    }

    /// Toggles layer visibility. The owned features keep their own `visible`
    /// flags; eligibility is the conjunction.
    pub(crate) fn set_visible(&mut self, visible: bool, entities: &mut EntityManager) -> bool {
        if self.visible == visible {
            return false;
        }

        self.visible = visible;
        entities.mark_layer_dirty(&self.id);
        let kind = if visible {
            EventType::Show
        } else {
            EventType::Hide
        };
        self.events.fire(kind, json!({ "layerId": self.id }));
        self.events.fire(
            EventType::VisibilityChanged,
            json!({ "layerId": self.id, "visible": visible }),
        );
        true
    }

    /// Moves adapted features into the layer (and the entity table).
    /// Duplicates and over-cap features are dropped with warnings. Returns
    /// the accepted count.
    pub(crate) fn add_features(
        &mut self,
        features: Vec<Feature>,
        entities: &mut EntityManager,
        clock: &mut TimeManager,
        renderer: &mut RendererFactory,
    ) -> usize {
        let mut accepted = 0;
        for feature in features {
            if self.entity_ids.len() >= self.max_entities {
                warn!(
                    "Layer {} is at its cap of {} entities; dropping the rest.",
                    self.id, self.max_entities
                );
                break;
            }

            let id = feature.id().to_string();
            let window = feature.availability();
            if entities.contains(&id) {
                // Duplicate id; the prior instance stays in place.
                entities.add(feature);
                continue;
            }

            renderer.register(&feature);
            entities.add(feature);

            if let Some(window) = window {
                clock.register_availability(&id, window);
            }
            if let Some(stored) = entities.get_mut(&id) {
                stored.mark_added(&self.id);
            }
            self.entity_ids.push(id.clone());
            self.entity_set.insert(id);
            accepted += 1;
        }

        if accepted > 0 {
            self.events.fire(
                EventType::DataChanged,
                json!({ "layerId": self.id, "added": accepted }),
            );
        }
        accepted
    }

    /// Removes one owned feature; detaches, destroys and returns it so the
    /// engine can drop the host binding.
    pub(crate) fn remove_feature(
        &mut self,
        id: &str,
        entities: &mut EntityManager,
        clock: &mut TimeManager,
        renderer: &mut RendererFactory,
    ) -> Option<Feature> {
        if !self.entity_set.contains(id) {
            warn!("Layer {} does not own feature {}.", self.id, id);
            return None;
        }

        self.entity_ids.retain(|v| v != id);
        self.entity_set.remove(id);
        clock.unregister_availability(id);

        let mut feature = entities.remove(id)?;
        renderer.unregister(&feature);
        feature.mark_removed();
        feature.destroy();

        self.events.fire(
            EventType::DataChanged,
            json!({ "layerId": self.id, "removed": id }),
        );
        Some(feature)
    }

    /// Empties the layer; returns the removed ids for host cleanup.
    pub(crate) fn clear(
        &mut self,
        entities: &mut EntityManager,
        clock: &mut TimeManager,
        renderer: &mut RendererFactory,
    ) -> Vec<FeatureId> {
        let ids: Vec<FeatureId> = self.entity_ids.drain(..).collect();
        self.entity_set.clear();

        for id in &ids {
            clock.unregister_availability(id);
            if let Some(mut feature) = entities.remove(id) {
                renderer.unregister(&feature);
                feature.mark_removed();
                feature.destroy();
            }
        }

        if !ids.is_empty() {
            self.events.fire(
                EventType::DataChanged,
                json!({ "layerId": self.id, "removed": ids.len() }),
            );
        }
        ids
    }

    /// Applies one queued mutation.
    pub(crate) fn process_update(
        &mut self,
        update: LayerUpdate,
        adapter: &DataAdapter,
        entities: &mut EntityManager,
        clock: &mut TimeManager,
        renderer: &mut RendererFactory,
    ) -> UpdateOutcome {
        let mut outcome = UpdateOutcome::default();
        match update {
            LayerUpdate::AddData(raw) => {
                let options = AdaptOptions {
                    style_defaults: self.style_defaults.clone(),
                    ..Default::default()
                };
                let features = adapter.adapt(&raw, &options);
                let added = self.add_features(features, entities, clock, renderer);
                if added > 0 {
                    outcome.broadcast = Some((
                        EventType::DataChanged,
                        json!({ "layerId": self.id, "added": added }),
                    ));
                }
            }
            LayerUpdate::RemoveFeature(id) => {
                if self.remove_feature(&id, entities, clock, renderer).is_some() {
                    outcome.removed.push(id.clone());
                    outcome.broadcast = Some((
                        EventType::DataChanged,
                        json!({ "layerId": self.id, "removed": id }),
                    ));
                }
            }
            LayerUpdate::SetFeatureVisible(id, visible) => {
                if self.entity_set.contains(&id) {
                    if let Some(feature) = entities.get_mut(&id) {
                        feature.set_visible(visible);
                        entities.mark_dirty(&id);
                    }
                }
            }
            LayerUpdate::MoveFeature(id, position) => {
                if self.entity_set.contains(&id) {
                    if let Some(feature) = entities.get_mut(&id) {
                        feature.set_position(position);
                        outcome.broadcast = Some((
                            EventType::DataChanged,
                            json!({ "layerId": self.id, "moved": id }),
                        ));
                    }
                }
            }
            LayerUpdate::SetVisible(visible) => {
                if self.set_visible(visible, entities) {
                    outcome.broadcast = Some((
                        EventType::VisibilityChanged,
                        json!({ "layerId": self.id, "visible": visible }),
                    ));
                }
            }
            LayerUpdate::SetOpacity(opacity) => {
                self.set_opacity(opacity);
            }
            LayerUpdate::Clear => {
                outcome.removed = self.clear(entities, clock, renderer);
                if !outcome.removed.is_empty() {
                    outcome.broadcast = Some((
                        EventType::DataChanged,
                        json!({ "layerId": self.id, "removed": outcome.removed.len() }),
                    ));
                }
            }
        }
        outcome
    }

    // Layer time gating: intersection of layer and engine ranges; a missing
    // range on either side means unbounded there.
    fn time_eligible(&self, engine_range: Option<TimeInterval>, now: crate::utils::time::Timestamp) -> bool {
        match (self.time_range, engine_range) {
            (None, None) => true,
            (Some(range), None) | (None, Some(range)) => range.contains(now),
            (Some(a), Some(b)) => match a.intersection(&b) {
                Some(window) => window.contains(now),
                None => false,
            },
        }
    }

    /// Walks the owned features and marks the ones outside the camera view
    /// culled for subsequent frames. Clamped polygons too small on screen
    /// are LOD-dropped as well. Returns the culled count.
    pub(crate) fn perform_culling(
        &mut self,
        camera: &CameraState,
        entities: &mut EntityManager,
        enable_lod: bool,
        now: crate::utils::time::Timestamp,
    ) -> usize {
        // Outside the layer's camera-height band everything culls at once.
        let height = camera.position.height;
        let band_ok = self.minimum_level.map_or(true, |min| height >= min)
            && self.maximum_level.map_or(true, |max| height <= max);

        let view = camera.view_bounds.expanded(1.0);
        let mut culled = 0;

        for id in &self.entity_ids {
            let feature = match entities.get_mut(id) {
                Some(feature) => feature,
                None => continue,
            };

            let verdict = if !band_ok {
                true
            } else {
                match feature.position_at(now) {
                    Some(position) => {
                        let mut out = !view.contains(position);
                        if !out && enable_lod {
                            out = Self::lod_dropped(feature, camera);
                        }
                        out
                    }
                    // Relations with unresolved endpoints have no position;
                    // they are hidden by resolution, not by culling.
                    None => false,
                }
            };

            if verdict {
                culled += 1;
            }
            feature.culled = verdict;
        }

        self.stats.culled = culled;
        culled
    }

    // Ground-clamped polygons whose angular size at the camera falls under
    // ~0.1 milliradian read as sub-pixel; drop them.
    fn lod_dropped(feature: &Feature, camera: &CameraState) -> bool {
        if let FeaturePayload::Polygon(ref polygon) = feature.payload() {
            if polygon.style.clamp_to_ground {
                if let Some(center) = polygon.center() {
                    let radius = (polygon.area() / ::std::f64::consts::PI).sqrt();
                    let distance = camera.position.distance(center).max(1.0);
                    return radius / distance < 1.0e-4;
                }
            }
        }
        false
    }

    /// Builds this layer's draw commands for the current frame.
    pub(crate) fn update(
        &mut self,
        entities: &mut EntityManager,
        clock: &mut TimeManager,
        renderer: &mut RendererFactory,
        materials: &mut MaterialManager,
        engine_range: Option<TimeInterval>,
        camera: &CameraState,
        enable_lod: bool,
        out: &mut DrawList,
    ) -> Result<(), failure::Error> {
        let now = clock.current_time();
        self.stats.id = self.id.clone();
        self.stats.total = self.entity_ids.len();
        self.stats.visible = 0;

        if !self.visible || !self.lifecycle.is_enabled() || !self.time_eligible(engine_range, now) {
            return Ok(());
        }

        // Pre-pass: re-register changed availability windows and resolve
        // relation endpoints. Endpoints may live in any layer, so resolution
        // reads the global table first and writes the relations after.
        let mut endpoints: Vec<(FeatureId, Option<Position>, Option<Position>)> = Vec::new();
        for id in &self.entity_ids {
            if let Some(feature) = entities.get(id) {
                if let FeaturePayload::Relation(ref relation) = feature.payload() {
                    endpoints.push((
                        id.clone(),
                        entities.position_of(&relation.source_id, now),
                        entities.position_of(&relation.target_id, now),
                    ));
                }
            }
        }
        for (id, source, target) in endpoints {
            if let Some(feature) = entities.get_mut(&id) {
                if feature.availability_dirty {
                    match feature.availability() {
                        Some(window) => clock.register_availability(&id, window),
                        None => clock.unregister_availability(&id),
                    }
                    feature.availability_dirty = false;
                }
                if let FeaturePayload::Relation(ref mut relation) =
                    feature.payload_mut_silent()
                {
                    relation.resolve(source, target);
                }
            }
        }
        // Availability windows of non-relation features may be dirty too.
        let dirty_windows: Vec<FeatureId> = self
            .entity_ids
            .iter()
            .filter(|id| {
                entities
                    .get(id.as_str())
                    .map_or(false, |f| f.availability_dirty)
            })
            .cloned()
            .collect();
        for id in dirty_windows {
            if let Some(feature) = entities.get_mut(&id) {
                match feature.availability() {
                    Some(window) => clock.register_availability(&id, window),
                    None => clock.unregister_availability(&id),
                }
                feature.availability_dirty = false;
            }
        }

        for id in &self.entity_ids {
            let feature = match entities.get(id) {
                Some(feature) => feature,
                None => continue,
            };
            // Eligibility: layer visible (checked above) AND own flag AND
            // not culled AND availability contains the clock.
            if !feature.visible() || feature.culled || !clock.is_available(id) {
                continue;
            }

            let primitives = feature.primitives(now);
            if primitives.is_empty() {
                continue;
            }
            self.stats.visible += 1;

            let strategy = renderer.select(feature, materials.factory(), self.renderer_override);
            renderer.note(feature, strategy);

            let scale = if enable_lod {
                match feature.position_at(now) {
                    Some(position) => {
                        let distance = camera.position.distance(position);
                        entities.draw_scale(id, distance)
                    }
                    None => 1.0,
                }
            } else {
                1.0
            };

            let material = feature.material_desc().cloned();
            let uniforms = match material {
                Some(ref desc) => materials.uniforms_for(desc, now),
                None => Default::default(),
            };

            for primitive in primitives {
                out.commands.push(DrawCommand {
                    feature_id: id.clone(),
                    layer_id: self.id.clone(),
                    strategy,
                    primitive,
                    material: material.clone(),
                    uniforms: uniforms.clone(),
                    opacity: self.opacity,
                    scale,
                });
            }
        }

        Ok(())
    }

    /// Serializes the layer (config plus features) for the exported
    /// document.
    pub fn export_config(&self, entities: &EntityManager) -> Value {
        let mut config = Map::new();
        config.insert("id".to_string(), json!(self.id));
        config.insert("type".to_string(), json!("feature"));
        config.insert("name".to_string(), json!(self.name));
        config.insert("show".to_string(), json!(self.visible));
        config.insert("opacity".to_string(), json!(self.opacity));
        config.insert("zIndex".to_string(), json!(self.z_index));
        if let Some(min) = self.minimum_level {
            config.insert("minimumLevel".to_string(), json!(min));
        }
        if let Some(max) = self.maximum_level {
            config.insert("maximumLevel".to_string(), json!(max));
        }
        if let Some(ref style) = self.style_defaults {
            config.insert("style".to_string(), style.clone());
        }
        if let Some(range) = self.time_range {
            config.insert(
                "timeRange".to_string(),
                ::serde_json::to_value(&range).unwrap_or(Value::Null),
            );
        }
        if let Some(ref imagery) = self.imagery {
            config.insert(
                "imagery".to_string(),
                ::serde_json::to_value(imagery).unwrap_or(Value::Null),
            );
        }
        if let Some(ref terrain) = self.terrain {
            config.insert(
                "terrain".to_string(),
                ::serde_json::to_value(terrain).unwrap_or(Value::Null),
            );
        }

        let features: Vec<Value> = self
            .entity_ids
            .iter()
            .filter_map(|id| entities.get(id))
            .map(Feature::to_json)
            .collect();
        config.insert("features".to_string(), Value::Array(features));

        Value::Object(config)
    }

    /// Re-applies an exported config onto this layer: scalar settings plus
    /// the embedded features. Existing features stay.
    pub(crate) fn import_config(
        &mut self,
        config: &Value,
        adapter: &DataAdapter,
        entities: &mut EntityManager,
        clock: &mut TimeManager,
        renderer: &mut RendererFactory,
    ) -> usize {
        if let Some(name) = config.get("name").and_then(Value::as_str) {
            self.name = name.to_string();
        }
        if let Some(show) = config.get("show").and_then(Value::as_bool) {
            self.visible = show;
        }
        if let Some(opacity) = config.get("opacity").and_then(Value::as_f64) {
            self.opacity = opacity.max(0.0).min(1.0);
        }
        if let Some(z) = config.get("zIndex").and_then(Value::as_i64) {
            self.z_index = z as i32;
        }
        self.minimum_level = config.get("minimumLevel").and_then(Value::as_f64);
        self.maximum_level = config.get("maximumLevel").and_then(Value::as_f64);
        if let Some(style) = config.get("style") {
            self.style_defaults = Some(style.clone());
        }
        if let Some(range) = config.get("timeRange") {
            self.time_range = ::serde_json::from_value(range.clone()).ok();
        }

        match config.get("features") {
            Some(raw) => {
                let features = adapter.adapt(raw, &AdaptOptions::default());
                self.add_features(features, entities, clock, renderer)
            }
            None => 0,
        }
    }

    /// Finalizes the layer itself. Feature teardown happens through the
    /// engine, which owns the entity table.
    pub(crate) fn destroy(&mut self) {
        if self.lifecycle.mark_destroyed() {
            self.events
                .fire(EventType::Destroy, json!({ "layerId": self.id }));
            self.events.clear();
        }
    }
}
