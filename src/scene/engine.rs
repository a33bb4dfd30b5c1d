//! The top-level coordinator: layer table, frame loop, culling cadence,
//! pending updates, stats and performance presets.

use serde_json::{json, Value};

use crate::adapter::{AdaptOptions, DataAdapter};
use crate::clock::{TimeInterval, TimeManager};
use crate::errors::{Error, Result};
use crate::event::{EventHub, EventType, Lifecycle, Managed};
use crate::feature::Feature;
use crate::host::{DrawList, Host};
use crate::material::MaterialManager;
use crate::utils::hash::FastHashMap;
use crate::utils::time::Timestamp;

use super::entities::EntityManager;
use super::layer::{Layer, LayerId, LayerOptions, LayerUpdate};
use super::renderer::{RendererFactory, RendererOptions};
use super::stats::{EngineStats, FrameInfo};

/// Engine construction options. The defaults match the `balanced`
/// performance preset.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineOptions {
    pub enable_culling: bool,
    pub enable_lod: bool,
    pub enable_batching: bool,
    pub enable_instancing: bool,
    pub instancing_threshold: usize,
    /// Culling cadence in wall-clock milliseconds.
    pub culling_interval_ms: f64,
    pub max_entities_per_layer: usize,
    pub time_range: Option<TimeInterval>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            enable_culling: true,
            enable_lod: true,
            enable_batching: true,
            enable_instancing: false,
            instancing_threshold: 8,
            culling_interval_ms: 100.0,
            max_entities_per_layer: 20_000,
            time_range: None,
        }
    }
}

struct PresetBundle {
    name: &'static str,
    culling: bool,
    lod: bool,
    batching: bool,
    instancing: bool,
    max_entities: usize,
}

const PRESETS: &[PresetBundle] = &[
    PresetBundle {
        name: "high-performance",
        culling: true,
        lod: true,
        batching: true,
        instancing: true,
        max_entities: 50_000,
    },
    PresetBundle {
        name: "balanced",
        culling: true,
        lod: true,
        batching: true,
        instancing: false,
        max_entities: 20_000,
    },
    PresetBundle {
        name: "high-quality",
        culling: true,
        lod: false,
        batching: false,
        instancing: false,
        max_entities: 10_000,
    },
];

/// One long-lived engine bound to one viewer. Owns the layer table, the
/// frame loop state and every core component; destruction cascades into all
/// of them.
pub struct RenderEngine {
    host: Box<dyn Host>,
    options: EngineOptions,

    adapter: DataAdapter,
    entities: EntityManager,
    clock: TimeManager,
    renderer: RendererFactory,
    materials: MaterialManager,

    layers: FastHashMap<LayerId, Layer>,
    layer_order: Vec<LayerId>,
    pending: FastHashMap<LayerId, Vec<LayerUpdate>>,

    events: EventHub,
    lifecycle: Lifecycle,
    running: bool,

    stats: EngineStats,
    draw_list: DrawList,
    last_frame: Option<Timestamp>,
    last_cull: Option<Timestamp>,
}

impl Managed for RenderEngine {
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

impl RenderEngine {
    /// Binds to one viewer and wires the core components together. Emits
    /// `initialized` on success; a failed initialization fires `error` and
    /// propagates.
    pub fn new(host: Box<dyn Host>, options: EngineOptions) -> Result<RenderEngine> {
        let mut engine = RenderEngine {
            host,
            renderer: RendererFactory::new(RendererOptions {
                enable_batching: options.enable_batching,
                enable_instancing: options.enable_instancing,
                instancing_threshold: options.instancing_threshold,
            }),
            options,
            adapter: DataAdapter::new(),
            entities: EntityManager::new(),
            clock: TimeManager::new(),
            materials: MaterialManager::new(),
            layers: FastHashMap::default(),
            layer_order: Vec::new(),
            pending: FastHashMap::default(),
            events: EventHub::new(),
            lifecycle: Lifecycle::new(),
            running: true,
            stats: EngineStats::default(),
            draw_list: DrawList::default(),
            last_frame: None,
            last_cull: None,
        };

        if let Err(err) = engine.initialize() {
            engine
                .events
                .fire(EventType::Error, json!({ "message": err.to_string() }));
            return Err(err);
        }

        Ok(engine)
    }

    fn initialize(&mut self) -> Result<()> {
        if self.options.culling_interval_ms <= 0.0 {
            return Err(Error::DocumentInvalid(
                "options",
                "cullingInterval must be positive".to_string(),
            ));
        }
        if self.options.max_entities_per_layer == 0 {
            return Err(Error::DocumentInvalid(
                "options",
                "maxEntitiesPerLayer must be positive".to_string(),
            ));
        }

        if let Some(range) = self.options.time_range {
            self.clock.set_time_range(range);
        }

        info!("Render engine initialized.");
        self.events.signal(EventType::Initialized);
        Ok(())
    }

    #[inline]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    #[inline]
    pub fn clock(&self) -> &TimeManager {
        &self.clock
    }

    #[inline]
    pub fn clock_mut(&mut self) -> &mut TimeManager {
        &mut self.clock
    }

    #[inline]
    pub fn materials(&self) -> &MaterialManager {
        &self.materials
    }

    #[inline]
    pub fn materials_mut(&mut self) -> &mut MaterialManager {
        &mut self.materials
    }

    #[inline]
    pub fn adapter_mut(&mut self) -> &mut DataAdapter {
        &mut self.adapter
    }

    #[inline]
    pub fn entities(&self) -> &EntityManager {
        &self.entities
    }

    /// Seeks the shared frame clock.
    pub fn set_current_time(&mut self, t: Timestamp) {
        self.clock.set_current_time(t);
    }

    // --- layer table ---------------------------------------------------

    /// Creates a named layer. Synchronous; provider loads complete behind
    /// the layer's `is_loading` state.
    pub fn create_layer(&mut self, id: &str, options: LayerOptions) -> Result<()> {
        self.guard_alive()?;
        if self.layers.contains_key(id) {
            return Err(Error::LayerDuplicated(id.to_string()));
        }

        let layer = Layer::new(id, options, self.options.max_entities_per_layer);
        self.layers.insert(id.to_string(), layer);
        self.layer_order.push(id.to_string());
        Ok(())
    }

    /// Removes a layer; every owned feature is detached, destroyed and
    /// dropped from the host.
    pub fn remove_layer(&mut self, id: &str) -> Result<()> {
        self.guard_alive()?;
        let mut layer = self
            .layers
            .remove(id)
            .ok_or_else(|| Error::LayerUnknown(id.to_string()))?;

        let removed = layer.clear(&mut self.entities, &mut self.clock, &mut self.renderer);
        for feature_id in &removed {
            self.host.remove(feature_id);
        }
        layer.destroy();

        self.layer_order.retain(|v| v != id);
        self.pending.remove(id);
        self.refresh_layer_stats();
        Ok(())
    }

    #[inline]
    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.layers.get(id)
    }

    #[inline]
    pub fn layer_mut(&mut self, id: &str) -> Option<&mut Layer> {
        self.layers.get_mut(id)
    }

    /// The total layer ordering; exactly one entry per live layer.
    #[inline]
    pub fn layer_order(&self) -> &[LayerId] {
        &self.layer_order
    }

    /// Moves a layer to `index` within the ordering (clamped).
    pub fn move_layer(&mut self, id: &str, index: usize) -> Result<()> {
        let from = self
            .layer_order
            .iter()
            .position(|v| v == id)
            .ok_or_else(|| Error::LayerUnknown(id.to_string()))?;

        let entry = self.layer_order.remove(from);
        let index = index.min(self.layer_order.len());
        self.layer_order.insert(index, entry);
        Ok(())
    }

    /// Toggles a layer's visibility; its features keep their own flags.
    pub fn set_layer_visible(&mut self, id: &str, visible: bool) -> Result<()> {
        self.guard_alive()?;
        let changed = {
            let layer = self
                .layers
                .get_mut(id)
                .ok_or_else(|| Error::LayerUnknown(id.to_string()))?;
            layer.set_visible(visible, &mut self.entities)
        };

        if changed {
            self.broadcast(
                &id.to_string(),
                EventType::VisibilityChanged,
                json!({ "layerId": id, "visible": visible }),
            );
        }
        Ok(())
    }

    // --- data ingest ----------------------------------------------------

    /// Adapts raw records and adds the surviving features to a layer,
    /// synchronously. Returns the accepted count.
    pub fn add_data(&mut self, layer_id: &str, raw: &Value) -> Result<usize> {
        self.guard_alive()?;
        let added = {
            let layer = self
                .layers
                .get_mut(layer_id)
                .ok_or_else(|| Error::LayerUnknown(layer_id.to_string()))?;
            let options = AdaptOptions {
                style_defaults: layer.style_defaults_cloned(),
                ..Default::default()
            };
            let features = self.adapter.adapt(raw, &options);
            layer.add_features(
                features,
                &mut self.entities,
                &mut self.clock,
                &mut self.renderer,
            )
        };

        if added > 0 {
            self.broadcast(
                &layer_id.to_string(),
                EventType::DataChanged,
                json!({ "layerId": layer_id, "added": added }),
            );
        }
        self.refresh_layer_stats();
        Ok(added)
    }

    /// Removes one feature from its layer and the host.
    pub fn remove_feature(&mut self, layer_id: &str, feature_id: &str) -> Result<bool> {
        self.guard_alive()?;
        let removed = {
            let layer = self
                .layers
                .get_mut(layer_id)
                .ok_or_else(|| Error::LayerUnknown(layer_id.to_string()))?;
            layer
                .remove_feature(
                    feature_id,
                    &mut self.entities,
                    &mut self.clock,
                    &mut self.renderer,
                )
                .is_some()
        };

        if removed {
            self.host.remove(feature_id);
            self.broadcast(
                &layer_id.to_string(),
                EventType::DataChanged,
                json!({ "layerId": layer_id, "removed": feature_id }),
            );
        }
        self.refresh_layer_stats();
        Ok(removed)
    }

    #[inline]
    pub fn feature(&self, id: &str) -> Option<&Feature> {
        self.entities.get(id)
    }

    #[inline]
    pub fn feature_mut(&mut self, id: &str) -> Option<&mut Feature> {
        self.entities.get_mut(id)
    }

    /// Queues a mutation; it applies on the next frame, in insertion order.
    pub fn schedule_update(&mut self, layer_id: &str, update: LayerUpdate) {
        self.pending
            .entry(layer_id.to_string())
            .or_insert_with(Vec::new)
            .push(update);
    }

    #[inline]
    pub fn pending_updates(&self, layer_id: &str) -> usize {
        self.pending.get(layer_id).map_or(0, Vec::len)
    }

    // --- frame loop ------------------------------------------------------

    /// Stops the frame loop after the current frame.
    pub fn pause(&mut self) {
        if self.running {
            self.running = false;
            self.events.signal(EventType::Pause);
        }
    }

    pub fn resume(&mut self) {
        if !self.running && !self.lifecycle.is_destroyed() {
            self.running = true;
            self.events.signal(EventType::Resume);
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// One animation frame: drain pending updates in insertion order, tick
    /// the clock, rebuild per-layer draw commands, cull on the configured
    /// cadence, submit to the host and refresh stats.
    ///
    /// `now` is the wall-clock instant of the tick; the frame clock advances
    /// from it through the time manager's multiplier.
    pub fn advance(&mut self, now: Timestamp) -> Result<FrameInfo> {
        self.guard_alive()?;
        if !self.running {
            return Ok(FrameInfo::default());
        }

        // 1. Pending updates, exception-isolated per update.
        let mut broadcasts = Vec::new();
        let mut dropped = Vec::new();
        {
            let RenderEngine {
                ref mut layers,
                ref layer_order,
                ref mut pending,
                ref mut entities,
                ref mut clock,
                ref mut renderer,
                ref adapter,
                ..
            } = *self;

            for layer_id in layer_order {
                let updates = match pending.remove(layer_id) {
                    Some(updates) => updates,
                    None => continue,
                };
                let layer = match layers.get_mut(layer_id) {
                    Some(layer) => layer,
                    None => continue,
                };

                for update in updates {
                    let outcome =
                        layer.process_update(update, adapter, entities, clock, renderer);
                    if let Some((event, data)) = outcome.broadcast {
                        broadcasts.push((layer_id.clone(), event, data));
                    }
                    dropped.extend(outcome.removed);
                }
            }

            for (layer_id, updates) in pending.drain() {
                warn!(
                    "Dropping {} queued updates for unknown layer {}.",
                    updates.len(),
                    layer_id
                );
            }
        }
        for feature_id in dropped {
            self.host.remove(&feature_id);
        }
        for (source, event, data) in broadcasts {
            self.broadcast(&source, event, data);
        }

        // 2. Clock.
        self.clock.update_time(now);

        // 3. Per-layer update, exception-isolated per layer.
        self.entities.pre_render();
        self.renderer.begin_frame();
        self.draw_list.clear();
        let camera = self.host.camera();
        {
            let RenderEngine {
                ref mut layers,
                ref layer_order,
                ref mut entities,
                ref mut clock,
                ref mut renderer,
                ref mut materials,
                ref options,
                ref mut draw_list,
                ..
            } = *self;

            for layer_id in layer_order {
                if let Some(layer) = layers.get_mut(layer_id) {
                    if let Err(err) = layer.update(
                        entities,
                        clock,
                        renderer,
                        materials,
                        options.time_range,
                        &camera,
                        options.enable_lod,
                        draw_list,
                    ) {
                        error!("Layer {} update failed: {}.", layer_id, err);
                    }
                }
            }
        }

        // 4. Culling on its wall-clock cadence.
        if self.options.enable_culling {
            let due = match self.last_cull {
                None => true,
                Some(last) => (now - last) * 1000.0 >= self.options.culling_interval_ms,
            };
            if due {
                self.run_culling();
                self.last_cull = Some(now);
            }
        }

        // 5. Flush batch buckets and hand the frame to the host.
        let (batched, instanced) = self.renderer.end_frame();
        self.draw_list.batched = batched;
        self.draw_list.instanced = instanced;
        self.draw_list.dirty = self.entities.drain_dirty();
        if let Err(err) = self.host.submit(&self.draw_list) {
            let message = err.to_string();
            self.events
                .fire(EventType::Error, json!({ "message": message }));
            return Err(Error::HostLost(message));
        }
        self.entities.post_render();

        // 6. Stats.
        let duration_ms = match self.last_frame {
            Some(last) => (now - last) * 1000.0,
            None => 0.0,
        };
        self.last_frame = Some(now);
        let fps = if duration_ms > 0.0 {
            1000.0 / duration_ms
        } else {
            0.0
        };
        self.refresh_stats(fps, duration_ms);

        Ok(FrameInfo {
            duration_ms,
            fps,
            commands: self.draw_list.len(),
            visible: self.stats.visible_entities,
        })
    }

    /// Walks every visible layer and marks out-of-view features culled.
    /// Returns the culled total, also published as `stats.culledEntities`.
    pub fn run_culling(&mut self) -> usize {
        let camera = self.host.camera();
        let now = self.clock.current_time();
        let mut culled = 0;
        {
            let RenderEngine {
                ref mut layers,
                ref layer_order,
                ref mut entities,
                ref options,
                ..
            } = *self;

            for layer_id in layer_order {
                if let Some(layer) = layers.get_mut(layer_id) {
                    if layer.visible() {
                        culled +=
                            layer.perform_culling(&camera, entities, options.enable_lod, now);
                    }
                }
            }
        }

        self.stats.culled_entities = culled;
        culled
    }

    // Layer-interaction broadcast: every *other* layer gets the chance to
    // react (a relation layer following source-point movements, say).
    fn broadcast(&mut self, source: &LayerId, event: EventType, data: Value) {
        {
            let RenderEngine {
                ref mut layers,
                ref layer_order,
                ..
            } = *self;

            for layer_id in layer_order {
                if layer_id != source {
                    if let Some(layer) = layers.get_mut(layer_id) {
                        layer.on_layer_interaction(source, &event, &data);
                    }
                }
            }
        }

        let event_tag = ::serde_json::to_value(&event).unwrap_or(Value::Null);
        self.events.fire(
            EventType::LayerInteraction,
            json!({ "source": source, "event": event_tag, "data": data }),
        );
    }

    // --- performance presets ---------------------------------------------

    /// Applies a named optimization bundle atomically: engine flags,
    /// renderer options, per-layer caps; the culling cadence restarts.
    pub fn set_performance_preset(&mut self, name: &str) -> Result<()> {
        let bundle = PRESETS
            .iter()
            .find(|v| v.name == name)
            .ok_or_else(|| Error::PresetUnknown(name.to_string()))?;

        self.options.enable_culling = bundle.culling;
        self.options.enable_lod = bundle.lod;
        self.options.enable_batching = bundle.batching;
        self.options.enable_instancing = bundle.instancing;
        self.options.max_entities_per_layer = bundle.max_entities;

        self.renderer.set_options(RendererOptions {
            enable_batching: bundle.batching,
            enable_instancing: bundle.instancing,
            instancing_threshold: self.options.instancing_threshold,
        });
        for layer in self.layers.values_mut() {
            layer.set_max_entities(bundle.max_entities);
        }
        self.last_cull = None;

        info!("Applied performance preset {}.", name);
        Ok(())
    }

    /// Inverse preset matching; configurations matching no bundle return
    /// `None`.
    pub fn current_performance_preset(&self) -> Option<&'static str> {
        PRESETS
            .iter()
            .find(|v| {
                self.options.enable_culling == v.culling
                    && self.options.enable_lod == v.lod
                    && self.options.enable_batching == v.batching
                    && self.options.enable_instancing == v.instancing
                    && self.options.max_entities_per_layer == v.max_entities
            })
            .map(|v| v.name)
    }

    // --- stats and reporting ---------------------------------------------

    #[inline]
    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Depth-limited JSON copy of the stats for diagnostic exports.
    pub fn stats_snapshot(&self, depth: usize) -> Value {
        self.stats.snapshot(depth)
    }

    /// Threshold-driven tuning advice.
    pub fn performance_report(&self) -> String {
        let mut lines = vec![format!(
            "{} entities across {} layers at {:.0} fps.",
            self.stats.total_entities,
            self.layer_order.len(),
            self.stats.fps
        )];

        if self.stats.fps > 0.0 && self.stats.fps < 30.0 {
            lines.push(
                "Frame rate is below 30 fps; enable LOD or reduce per-layer entity caps."
                    .to_string(),
            );
        }

        let total = self.stats.total_entities.max(1) as f64;
        if (self.stats.culled_entities as f64) / total < 0.3 && self.options.enable_culling {
            lines.push(
                "Less than 30% of entities cull away; check the camera altitude and view extent."
                    .to_string(),
            );
        }
        if (self.stats.batched_entities as f64) / total < 0.5 && !self.options.enable_batching {
            lines.push("Batching is off; enabling it would merge static drawables.".to_string());
        }
        if self.stats.memory_bytes > 500 * 1024 * 1024 {
            lines.push(
                "Estimated memory exceeds 500 MB; consider streaming data by view extent."
                    .to_string(),
            );
        }

        lines.join("\n")
    }

    fn refresh_stats(&mut self, fps: f64, frame_time_ms: f64) {
        self.stats.fps = fps;
        self.stats.frame_time_ms = frame_time_ms;
        self.stats.update_time_ms = frame_time_ms;
        self.stats.batched_entities = self.draw_list.batched;
        self.stats.instanced_entities = self.draw_list.instanced;
        self.stats.material_count = self.materials.len();
        self.stats.memory_bytes = self.entities.estimate_memory();
        self.refresh_layer_stats();
    }

    fn refresh_layer_stats(&mut self) {
        self.stats.total_entities = self.entities.len();
        self.stats.layers = self
            .layer_order
            .iter()
            .filter_map(|id| self.layers.get(id))
            .map(|layer| layer.stats().clone())
            .collect();
        self.stats.visible_entities = self.stats.layers.iter().map(|v| v.visible).sum();
    }

    // --- document round-trip ---------------------------------------------

    /// Serializes the whole scene: options, per-layer configs, ordering and
    /// clock state.
    pub fn export_document(&self) -> Value {
        let layers: Vec<Value> = self
            .layer_order
            .iter()
            .filter_map(|id| self.layers.get(id))
            .map(|layer| {
                json!({
                    "layerId": layer.id(),
                    "config": layer.export_config(&self.entities),
                })
            })
            .collect();

        json!({
            "options": ::serde_json::to_value(&self.options).unwrap_or(Value::Null),
            "layers": layers,
            "layerOrder": self.layer_order,
            "timeRange": self.clock.time_range().map(|v| ::serde_json::to_value(&v).unwrap_or(Value::Null)),
            "currentTime": self.clock.current_time().to_iso8601(),
        })
    }

    /// Rebuilds the scene from [`RenderEngine::export_document`] output.
    pub fn import_document(&mut self, document: &Value) -> Result<()> {
        self.guard_alive()?;

        if let Some(options) = document.get("options") {
            self.options = ::serde_json::from_value(options.clone())
                .map_err(|err| Error::DocumentInvalid("options", err.to_string()))?;
            self.renderer.set_options(RendererOptions {
                enable_batching: self.options.enable_batching,
                enable_instancing: self.options.enable_instancing,
                instancing_threshold: self.options.instancing_threshold,
            });
        }

        let layers = document
            .get("layers")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::DocumentInvalid("document", "missing layers".to_string()))?;

        for entry in layers {
            let layer_id = entry
                .get("layerId")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::DocumentInvalid("document", "layer without id".to_string()))?;
            let config = entry.get("config").cloned().unwrap_or(Value::Null);

            if !self.layers.contains_key(layer_id) {
                self.create_layer(layer_id, LayerOptions::default())?;
            }
            let RenderEngine {
                ref mut layers,
                ref adapter,
                ref mut entities,
                ref mut clock,
                ref mut renderer,
                ..
            } = *self;
            if let Some(layer) = layers.get_mut(layer_id) {
                layer.import_config(&config, adapter, entities, clock, renderer);
            }
        }

        if let Some(order) = document.get("layerOrder").and_then(Value::as_array) {
            let imported: Vec<LayerId> = order
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .filter(|id| self.layers.contains_key(id))
                .collect();
            if imported.len() == self.layer_order.len() {
                self.layer_order = imported;
            }
        }

        if let Some(range) = document.get("timeRange") {
            if !range.is_null() {
                let range: TimeInterval = ::serde_json::from_value(range.clone())
                    .map_err(|err| Error::DocumentInvalid("timeRange", err.to_string()))?;
                self.clock.set_time_range(range);
            }
        }
        if let Some(current) = document.get("currentTime").and_then(Value::as_str) {
            let t = Timestamp::parse(current)?;
            self.clock.set_current_time(t);
        }

        self.refresh_layer_stats();
        Ok(())
    }

    // --- teardown --------------------------------------------------------

    fn guard_alive(&self) -> Result<()> {
        if self.lifecycle.is_destroyed() {
            Err(Error::Destroyed("RenderEngine"))
        } else {
            Ok(())
        }
    }

    /// Idempotent cascading destroy: cancels both loops, tears down every
    /// layer and core component, and detaches every listener.
    pub fn destroy(&mut self) {
        if !self.lifecycle.mark_destroyed() {
            return;
        }

        self.running = false;
        self.pending.clear();

        let order: Vec<LayerId> = self.layer_order.drain(..).collect();
        for layer_id in order {
            if let Some(mut layer) = self.layers.remove(&layer_id) {
                let removed =
                    layer.clear(&mut self.entities, &mut self.clock, &mut self.renderer);
                for feature_id in &removed {
                    self.host.remove(feature_id);
                }
                layer.destroy();
            }
        }

        self.entities.clear();
        self.materials.clear();
        self.clock.destroy();

        info!("Render engine destroyed.");
        self.events.signal(EventType::Destroy);
        self.events.clear();
    }
}
