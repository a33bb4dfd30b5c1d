//! The engine-scoped material registry and the manager tracking live
//! instances.

use serde_json::Value;

use crate::errors::{Error, Result};
use crate::utils::hash::FastHashMap;
use crate::utils::pool::ObjectPool;
use crate::utils::time::Timestamp;

use super::polyline::{PolylineArrow, PolylineDash, PolylineFlow, PolylineGlow, PulseLine, Trail};
use super::surface::{ColorMaterial, DynamicTexture, Fire, Water};
use super::{MaterialDesc, MaterialProperty, UniformsSnapshot};

impl_handle!(MaterialHandle);

type Ctor = fn(&Value) -> Result<Box<dyn MaterialProperty>>;

/// Creates material properties by registry type name. One factory per
/// engine; nothing here is process-global, so tests can run many engines
/// with diverging registries concurrently.
pub struct MaterialFactory {
    ctors: FastHashMap<String, Ctor>,
}

impl Default for MaterialFactory {
    fn default() -> Self {
        let mut factory = MaterialFactory {
            ctors: FastHashMap::default(),
        };

        factory.register("color", ColorMaterial::from_value);
        factory.register("polylineGlow", PolylineGlow::from_value);
        factory.register("polylineDash", PolylineDash::from_value);
        factory.register("polylineArrow", PolylineArrow::from_value);
        factory.register("polylineFlow", PolylineFlow::from_value);
        factory.register("pulseLine", PulseLine::from_value);
        factory.register("trail", Trail::from_value);
        factory.register("dynamicTexture", DynamicTexture::from_value);
        factory.register("water", Water::from_value_with_presets);
        factory.register("fire", Fire::from_value_with_presets);

        factory
    }
}

impl MaterialFactory {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers (or replaces) a constructor under `material_type`.
    pub fn register<T: Into<String>>(&mut self, material_type: T, ctor: Ctor) {
        self.ctors.insert(material_type.into(), ctor);
    }

    #[inline]
    pub fn contains(&self, material_type: &str) -> bool {
        self.ctors.contains_key(material_type)
    }

    /// All registered type names, sorted.
    pub fn types(&self) -> Vec<&str> {
        let mut v: Vec<&str> = self.ctors.keys().map(String::as_str).collect();
        v.sort();
        v
    }

    /// Instantiates `material_type` with the given parameter object. Unknown
    /// types are a configuration error.
    pub fn create(&self, material_type: &str, options: &Value) -> Result<Box<dyn MaterialProperty>> {
        match self.ctors.get(material_type) {
            Some(ctor) => ctor(options),
            None => Err(Error::MaterialUnknown(material_type.to_string())),
        }
    }

    /// Reconstructs a material from its `to_json` document (an object with a
    /// `type` tag).
    pub fn from_json(&self, v: &Value) -> Result<Box<dyn MaterialProperty>> {
        let material_type = v
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::DocumentInvalid("material", "missing type tag".to_string()))?;
        self.create(material_type, v)
    }

    /// Instantiates a style-carried description.
    pub fn instantiate(&self, desc: &MaterialDesc) -> Result<Box<dyn MaterialProperty>> {
        self.create(&desc.material_type, &desc.params)
    }

    /// Whether the described material varies with the frame clock. Unknown
    /// types count as animated so they never get batched away.
    pub fn is_animated(&self, desc: &MaterialDesc) -> bool {
        self.instantiate(desc).map(|m| m.is_animated()).unwrap_or(true)
    }
}

struct MaterialEntry {
    material: Box<dyn MaterialProperty>,
    enabled: bool,
    /// Host drawable this material is attached to, by feature id and
    /// property name (e.g. `("zone-1", "polygon.material")`).
    binding: Option<(String, String)>,
}

/// Tracks live material instances for one engine: evaluation each frame,
/// batch enable/disable and JSON round-trips.
pub struct MaterialManager {
    factory: MaterialFactory,
    pool: ObjectPool<MaterialHandle, MaterialEntry>,
    // Instance cache for style-carried descriptions, keyed by description
    // signature. Uniform values are never cached; only the parsed instance.
    desc_cache: FastHashMap<u64, Box<dyn MaterialProperty>>,
}

impl Default for MaterialManager {
    fn default() -> Self {
        MaterialManager {
            factory: MaterialFactory::new(),
            pool: ObjectPool::new(),
            desc_cache: FastHashMap::default(),
        }
    }
}

impl MaterialManager {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn factory(&self) -> &MaterialFactory {
        &self.factory
    }

    #[inline]
    pub fn factory_mut(&mut self) -> &mut MaterialFactory {
        &mut self.factory
    }

    /// Creates and tracks a material instance.
    pub fn create(&mut self, material_type: &str, options: &Value) -> Result<MaterialHandle> {
        let material = self.factory.create(material_type, options)?;
        Ok(self.insert(material))
    }

    /// Tracks an externally built instance.
    pub fn insert(&mut self, material: Box<dyn MaterialProperty>) -> MaterialHandle {
        self.pool.create(MaterialEntry {
            material,
            enabled: true,
            binding: None,
        })
    }

    pub fn free(&mut self, handle: MaterialHandle) -> bool {
        self.pool.free(handle).is_some()
    }

    #[inline]
    pub fn get(&self, handle: MaterialHandle) -> Option<&dyn MaterialProperty> {
        self.pool.get(handle).map(|v| &*v.material)
    }

    #[inline]
    pub fn get_mut(&mut self, handle: MaterialHandle) -> Option<&mut Box<dyn MaterialProperty>> {
        self.pool.get_mut(handle).map(|v| &mut v.material)
    }

    /// Attaches a material to a host drawable by property name.
    pub fn attach(&mut self, handle: MaterialHandle, feature_id: &str, property: &str) -> bool {
        match self.pool.get_mut(handle) {
            Some(entry) => {
                entry.binding = Some((feature_id.to_string(), property.to_string()));
                true
            }
            None => false,
        }
    }

    pub fn binding(&self, handle: MaterialHandle) -> Option<(&str, &str)> {
        self.pool
            .get(handle)
            .and_then(|v| v.binding.as_ref())
            .map(|(id, prop)| (id.as_str(), prop.as_str()))
    }

    pub fn set_enabled(&mut self, handle: MaterialHandle, enabled: bool) -> bool {
        match self.pool.get_mut(handle) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Batch enable/disable of every tracked instance.
    pub fn set_all_enabled(&mut self, enabled: bool) {
        for entry in self.pool.values_mut() {
            entry.enabled = enabled;
        }
    }

    /// Evaluates a style-carried material description at `t`. The parsed
    /// instance is cached by description signature; the uniform snapshot is
    /// rebuilt on every call. Unknown descriptions evaluate to an empty
    /// snapshot with a warning.
    pub fn uniforms_for(&mut self, desc: &MaterialDesc, t: Timestamp) -> UniformsSnapshot {
        let signature = desc.signature();
        if !self.desc_cache.contains_key(&signature) {
            match self.factory.instantiate(desc) {
                Ok(material) => {
                    self.desc_cache.insert(signature, material);
                }
                Err(err) => {
                    warn!("Unusable material {}: {}.", desc.material_type, err);
                    return UniformsSnapshot::new();
                }
            }
        }
        self.desc_cache[&signature].value_at(t)
    }

    /// Evaluates every enabled animated material at `t`. Lazy per frame: the
    /// snapshots are built here and nowhere cached.
    pub fn evaluate(&self, t: Timestamp) -> Vec<(MaterialHandle, UniformsSnapshot)> {
        self.pool
            .iter()
            .filter(|(_, entry)| entry.enabled && entry.material.is_animated())
            .map(|(handle, entry)| (handle, entry.material.value_at(t)))
            .collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    /// Exports every tracked material as a JSON array.
    pub fn export_json(&self) -> Value {
        Value::Array(self.pool.values().map(|v| v.material.to_json()).collect())
    }

    /// Re-creates tracked materials from [`MaterialManager::export_json`]
    /// output. Invalid entries are dropped with a warning.
    pub fn import_json(&mut self, v: &Value) -> Vec<MaterialHandle> {
        let items = match v.as_array() {
            Some(items) => items,
            None => {
                warn!("Material import expects an array, got {}.", v);
                return Vec::new();
            }
        };

        let mut handles = Vec::with_capacity(items.len());
        for item in items {
            match self.factory.from_json(item) {
                Ok(material) => handles.push(self.insert(material)),
                Err(err) => warn!("Dropping material on import: {}.", err),
            }
        }
        handles
    }

    pub fn clear(&mut self) {
        self.pool.clear();
        self.desc_cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_type_is_an_error() {
        let factory = MaterialFactory::new();
        assert!(factory.create("nope", &json!({})).is_err());
        assert!(factory.contains("water"));
        assert_eq!(factory.types().len(), 10);
    }

    #[test]
    fn manager_round_trip() {
        let mut manager = MaterialManager::new();
        let h = manager
            .create("water", &json!({ "frequency": 8.0 }))
            .unwrap();
        assert!(manager.attach(h, "zone-1", "polygon.material"));
        assert_eq!(manager.binding(h), Some(("zone-1", "polygon.material")));

        let exported = manager.export_json();
        let mut restored = MaterialManager::new();
        let handles = restored.import_json(&exported);
        assert_eq!(handles.len(), 1);

        let back = restored.get(handles[0]).unwrap();
        assert_eq!(back.params_json()["frequency"], 8.0);
    }

    #[test]
    fn disabled_materials_skip_evaluation() {
        let mut manager = MaterialManager::new();
        let animated = manager.create("polylineFlow", &json!({})).unwrap();
        let constant = manager.create("color", &json!({})).unwrap();

        let t = Timestamp::from_seconds(1.0);
        // Constant materials never appear in the per-frame evaluation.
        assert_eq!(manager.evaluate(t).len(), 1);

        manager.set_enabled(animated, false);
        assert!(manager.evaluate(t).is_empty());
        let _ = constant;
    }
}
