//! Drawing-strategy selection and batch bucket bookkeeping.

use crate::feature::{Feature, FeatureId, FeatureKind};
use crate::host::RenderStrategy;
use crate::material::MaterialFactory;
use crate::utils::hash::FastHashMap;

/// Renderer optimization knobs, mirrored from the engine options.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RendererOptions {
    pub enable_batching: bool,
    pub enable_instancing: bool,
    /// Identical style signatures needed before instancing kicks in.
    pub instancing_threshold: usize,
}

impl Default for RendererOptions {
    fn default() -> Self {
        RendererOptions {
            enable_batching: true,
            enable_instancing: false,
            instancing_threshold: 8,
        }
    }
}

/// Batch buckets aggregate same-signature features into one drawable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    kind: FeatureKind,
    signature: u64,
    clamp_to_ground: bool,
    strategy: RenderStrategy,
}

#[derive(Debug, Default)]
struct BatchBucket {
    members: Vec<FeatureId>,
}

/// Maps feature kind and style repetition to a drawing strategy, and tracks
/// the per-frame batch buckets.
#[derive(Debug, Default)]
pub struct RendererFactory {
    options: RendererOptions,
    // Live count per style signature, maintained on add/remove.
    signature_counts: FastHashMap<u64, usize>,
    buckets: FastHashMap<BucketKey, BatchBucket>,
}

impl RendererFactory {
    pub fn new(options: RendererOptions) -> Self {
        RendererFactory {
            options,
            ..Default::default()
        }
    }

    #[inline]
    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: RendererOptions) {
        self.options = options;
    }

    /// Tracks a newly added feature's style signature.
    pub fn register(&mut self, feature: &Feature) {
        *self
            .signature_counts
            .entry(feature.style_signature())
            .or_insert(0) += 1;
    }

    /// Forgets a removed feature's style signature.
    pub fn unregister(&mut self, feature: &Feature) {
        let signature = feature.style_signature();
        if let Some(count) = self.signature_counts.get_mut(&signature) {
            *count -= 1;
            if *count == 0 {
                self.signature_counts.remove(&signature);
            }
        }
    }

    /// Chooses the drawing strategy for `feature`:
    ///
    /// 1. a per-layer override always wins;
    /// 2. instancing for billboard/model styles repeated at least
    ///    `instancing_threshold` times;
    /// 3. batching when the material does not animate;
    /// 4. otherwise one drawable per feature.
    pub fn select(
        &self,
        feature: &Feature,
        materials: &MaterialFactory,
        layer_override: Option<RenderStrategy>,
    ) -> RenderStrategy {
        if let Some(strategy) = layer_override {
            return strategy;
        }

        let kind = feature.kind();
        if self.options.enable_instancing
            && (kind == FeatureKind::Billboard || kind == FeatureKind::Model)
        {
            let repeats = self
                .signature_counts
                .get(&feature.style_signature())
                .cloned()
                .unwrap_or(0);
            if repeats >= self.options.instancing_threshold {
                return RenderStrategy::Instanced;
            }
        }

        if self.options.enable_batching {
            let animated = feature
                .material_desc()
                .map(|desc| materials.is_animated(desc))
                .unwrap_or(false);
            if !animated {
                return RenderStrategy::Batched;
            }
        }

        RenderStrategy::Single
    }

    /// Clears the per-frame buckets; called at the top of each frame.
    pub fn begin_frame(&mut self) {
        self.buckets.clear();
    }

    /// Assigns one command to its bucket for this frame.
    pub fn note(&mut self, feature: &Feature, strategy: RenderStrategy) {
        if strategy == RenderStrategy::Single {
            return;
        }

        let key = BucketKey {
            kind: feature.kind(),
            signature: feature.style_signature(),
            clamp_to_ground: feature.clamp_to_ground(),
            strategy,
        };
        self.buckets
            .entry(key)
            .or_insert_with(BatchBucket::default)
            .members
            .push(feature.id().to_string());
    }

    /// Flushes the frame's buckets, returning `(batched, instanced)` feature
    /// counts. Buckets holding a single member degrade to plain drawables
    /// and count as neither.
    pub fn end_frame(&mut self) -> (usize, usize) {
        let (mut batched, mut instanced) = (0, 0);
        for (key, bucket) in self.buckets.iter() {
            if bucket.members.len() < 2 {
                continue;
            }
            match key.strategy {
                RenderStrategy::Batched => batched += bucket.members.len(),
                RenderStrategy::Instanced => instanced += bucket.members.len(),
                RenderStrategy::Single => {}
            }
        }
        (batched, instanced)
    }

    /// Live bucket count, for diagnostics.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::create;
    use serde_json::json;

    fn billboard(id: &str) -> Feature {
        create(
            FeatureKind::Billboard,
            &json!({
                "id": id,
                "position": { "longitude": 0.0, "latitude": 0.0 },
                "style": { "image": "pin.png" }
            }),
        )
        .unwrap()
    }

    #[test]
    fn instancing_needs_repetition() {
        let materials = MaterialFactory::new();
        let mut factory = RendererFactory::new(RendererOptions {
            enable_instancing: true,
            instancing_threshold: 3,
            ..Default::default()
        });

        let features: Vec<Feature> = (0..3).map(|i| billboard(&format!("b{}", i))).collect();
        factory.register(&features[0]);
        factory.register(&features[1]);
        assert_eq!(
            factory.select(&features[0], &materials, None),
            RenderStrategy::Batched
        );

        factory.register(&features[2]);
        assert_eq!(
            factory.select(&features[0], &materials, None),
            RenderStrategy::Instanced
        );

        // The per-layer override beats everything.
        assert_eq!(
            factory.select(&features[0], &materials, Some(RenderStrategy::Single)),
            RenderStrategy::Single
        );
    }

    #[test]
    fn animated_materials_opt_out_of_batching() {
        let materials = MaterialFactory::new();
        let factory = RendererFactory::new(RendererOptions::default());

        let animated = create(
            FeatureKind::Polyline,
            &json!({
                "positions": [
                    { "longitude": 0.0, "latitude": 0.0 },
                    { "longitude": 1.0, "latitude": 0.0 }
                ],
                "style": { "material": { "type": "polylineFlow" } }
            }),
        )
        .unwrap();
        assert_eq!(
            factory.select(&animated, &materials, None),
            RenderStrategy::Single
        );

        let constant = create(
            FeatureKind::Polyline,
            &json!({
                "positions": [
                    { "longitude": 0.0, "latitude": 0.0 },
                    { "longitude": 1.0, "latitude": 0.0 }
                ],
                "style": { "material": { "type": "polylineDash" } }
            }),
        )
        .unwrap();
        assert_eq!(
            factory.select(&constant, &materials, None),
            RenderStrategy::Batched
        );
    }

    #[test]
    fn frame_buckets_count_members() {
        let mut factory = RendererFactory::new(RendererOptions::default());
        let a = billboard("a");
        let b = billboard("b");
        let lone = billboard("c");

        factory.begin_frame();
        factory.note(&a, RenderStrategy::Batched);
        factory.note(&b, RenderStrategy::Batched);
        factory.note(&lone, RenderStrategy::Instanced);

        let (batched, instanced) = factory.end_frame();
        assert_eq!(batched, 2);
        // A lone member is no instancing win.
        assert_eq!(instanced, 0);
    }
}
