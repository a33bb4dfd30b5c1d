//! The flat feature table shared by every layer.
//!
//! This is the arena of the arena+index pattern: features live here, keyed
//! by id; layers and relations hold ids, never references. The invariant
//! `f ∈ layer ⇔ f.id ∈ layer collection ⇔ f.id ∈ this table` is maintained
//! by routing every insert/remove through the owning layer.

use crate::feature::{Feature, FeatureId, FeatureKind};
use crate::math::position::Position;
use crate::utils::hash::{FastHashMap, FastHashSet};

/// Flat table of all live features in one engine.
#[derive(Debug, Default)]
pub struct EntityManager {
    table: FastHashMap<FeatureId, Feature>,
    // Stable insertion order for iteration.
    order: Vec<FeatureId>,
    // Features whose visuals must rebuild next frame (visibility fan-out,
    // layer toggles).
    dirty: FastHashSet<FeatureId>,
    frames: u64,
}

impl EntityManager {
    pub fn new() -> Self {
        Default::default()
    }

    /// Inserts a feature. Insertion with a duplicate id is a no-op with a
    /// warning, leaving the prior instance in place.
    pub fn add(&mut self, feature: Feature) -> bool {
        if self.table.contains_key(feature.id()) {
            warn!("Duplicate feature id {}; keeping the prior instance.", feature.id());
            return false;
        }

        let id = feature.id().to_string();
        self.order.push(id.clone());
        self.dirty.insert(id.clone());
        self.table.insert(id, feature);
        true
    }

    /// Removes and returns the feature. Removing a nonexistent id warns and
    /// no-ops.
    pub fn remove(&mut self, id: &str) -> Option<Feature> {
        match self.table.remove(id) {
            Some(feature) => {
                self.order.retain(|v| v != id);
                self.dirty.remove(id);
                Some(feature)
            }
            None => {
                warn!("Removing unknown feature id {}.", id);
                None
            }
        }
    }

    #[inline]
    pub fn get(&self, id: &str) -> Option<&Feature> {
        self.table.get(id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Feature> {
        self.table.get_mut(id)
    }

    #[inline]
    pub fn contains(&self, id: &str) -> bool {
        self.table.contains_key(id)
    }

    /// Every live feature, in insertion order.
    pub fn get_all<'a>(&'a self) -> impl Iterator<Item = &'a Feature> + 'a {
        let table = &self.table;
        self.order.iter().filter_map(move |id| table.get(id))
    }

    pub fn get_by_kind<'a>(&'a self, kind: FeatureKind) -> impl Iterator<Item = &'a Feature> + 'a {
        self.get_all().filter(move |v| v.kind() == kind)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The position a feature occupies right now, for relation endpoint
    /// resolution.
    pub fn position_of(&self, id: &str, t: crate::utils::time::Timestamp) -> Option<Position> {
        self.table.get(id).and_then(|v| v.position_at(t))
    }

    /// Visibility fan-out: marks every feature owned by `layer_id` dirty so
    /// its visual rebuilds next frame.
    pub fn mark_layer_dirty(&mut self, layer_id: &str) {
        let dirty = &mut self.dirty;
        for (id, feature) in self.table.iter() {
            if feature.layer_id.as_deref() == Some(layer_id) {
                dirty.insert(id.clone());
            }
        }
    }

    #[inline]
    pub fn mark_dirty(&mut self, id: &str) {
        if self.table.contains_key(id) {
            self.dirty.insert(id.to_string());
        }
    }

    #[inline]
    pub fn is_dirty(&self, id: &str) -> bool {
        self.dirty.contains(id)
    }

    /// Frame hook before the native renderer draws: per-kind strategies get
    /// their chance to flush, and per-feature dirty flags from the previous
    /// frame age out.
    pub fn pre_render(&mut self) {
        self.frames += 1;
    }

    /// Collects the ids whose visuals must rebuild this frame: explicit
    /// fan-out marks plus features whose position or style mutated. Clears
    /// the consumed flags.
    pub fn drain_dirty(&mut self) -> Vec<FeatureId> {
        let mut ids =
            ::std::mem::replace(&mut self.dirty, FastHashSet::default());
        for (id, feature) in self.table.iter_mut() {
            if feature.positions_dirty || feature.style_dirty {
                feature.positions_dirty = false;
                feature.style_dirty = false;
                ids.insert(id.clone());
            }
        }

        let mut v: Vec<FeatureId> = ids.into_iter().collect();
        v.sort();
        v
    }

    /// Frame hook after the native renderer drew; clears the dirty set that
    /// this frame consumed.
    pub fn post_render(&mut self) {
        self.dirty.clear();
        for feature in self.table.values_mut() {
            feature.positions_dirty = false;
            feature.style_dirty = false;
        }
    }

    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// LOD hook: the draw scale of `id` at `camera_distance` meters, from
    /// its `scaleByDistance` specification (1.0 when it has none).
    pub fn draw_scale(&self, id: &str, camera_distance: f64) -> f64 {
        self.table
            .get(id)
            .and_then(|v| v.scale_by_distance())
            .map(|s| s.scale_at(camera_distance))
            .unwrap_or(1.0)
    }

    /// Rough retained-memory estimate in bytes, for diagnostics only.
    pub fn estimate_memory(&self) -> usize {
        let mut bytes = 0;
        for feature in self.table.values() {
            bytes += 256;
            bytes += match feature.payload() {
                crate::feature::FeaturePayload::Polyline(v)
                | crate::feature::FeaturePayload::Route(v) => v.positions().len() * 24,
                crate::feature::FeaturePayload::Polygon(v)
                | crate::feature::FeaturePayload::Area(v) => v.positions().len() * 24,
                crate::feature::FeaturePayload::Trajectory(v) => v.sample_count() * 48,
                crate::feature::FeaturePayload::Relation(v) => v.path().len() * 24,
                _ => 24,
            };
        }
        bytes
    }

    /// Destroys every feature. Used by the engine's cascading destroy.
    pub fn clear(&mut self) {
        for (_, mut feature) in self.table.drain() {
            feature.destroy();
        }
        self.order.clear();
        self.dirty.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::{create, FeatureKind};
    use serde_json::json;

    fn point(id: &str, lon: f64) -> Feature {
        create(
            FeatureKind::Point,
            &json!({ "id": id, "position": { "longitude": lon, "latitude": 0.0 } }),
        )
        .unwrap()
    }

    #[test]
    fn duplicate_ids_keep_the_prior_instance() {
        let mut entities = EntityManager::new();
        assert!(entities.add(point("a", 1.0)));
        assert!(!entities.add(point("a", 2.0)));
        assert_eq!(entities.len(), 1);
        assert_eq!(entities.get("a").unwrap().position().unwrap().longitude, 1.0);
    }

    #[test]
    fn removal_and_kind_queries() {
        let mut entities = EntityManager::new();
        entities.add(point("a", 0.0));
        entities.add(point("b", 1.0));

        assert_eq!(entities.get_by_kind(FeatureKind::Point).count(), 2);
        assert_eq!(entities.get_by_kind(FeatureKind::Polygon).count(), 0);

        assert!(entities.remove("a").is_some());
        assert!(entities.remove("a").is_none());
        assert_eq!(entities.get_all().count(), 1);
    }

    #[test]
    fn dirty_set_ages_out_on_post_render() {
        let mut entities = EntityManager::new();
        entities.add(point("a", 0.0));
        assert!(entities.is_dirty("a"));

        entities.pre_render();
        entities.post_render();
        assert!(!entities.is_dirty("a"));
        assert_eq!(entities.frames(), 1);
    }
}
