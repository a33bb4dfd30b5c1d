//! Time-driven animated style values.
//!
//! A material property is a value object: asked for its value at time `t` it
//! returns a bundle of shader uniforms. The engine owns the only clock;
//! materials never run timers of their own. Everything here is a pure
//! function of `t` and the material's parameters, so
//! `value_at(t) == value_at(t)` holds until a parameter is reassigned (which
//! bumps the generation counter consumers watch to rebind).
//!
//! GLSL itself is an external asset of the host renderer; this module only
//! guarantees each material's uniform schema and phase semantics.

// Shared ctor/accessor boilerplate for a material backed by a serde params
// struct and a generation counter.
macro_rules! impl_material_body {
    ($name:ident, $params:ident) => {
        impl $name {
            pub fn new(params: $params) -> Self {
                $name {
                    params,
                    generation: 0,
                }
            }

            /// Registry constructor: deserializes params from a JSON object.
            pub fn from_value(
                v: &::serde_json::Value,
            ) -> $crate::errors::Result<Box<dyn $crate::material::MaterialProperty>> {
                let params: $params = ::serde_json::from_value(v.clone()).map_err(|err| {
                    $crate::errors::Error::DocumentInvalid("material", err.to_string())
                })?;
                Ok(Box::new($name::new(params)))
            }

            #[inline]
            pub fn params(&self) -> &$params {
                &self.params
            }

            /// Reassigns the parameter bundle; fires `definitionChanged` by
            /// bumping the generation counter.
            pub fn set_params(&mut self, params: $params) {
                if self.params != params {
                    self.params = params;
                    self.generation += 1;
                }
            }
        }
    };
}

pub mod polyline;
pub mod registry;
pub mod surface;

pub use self::polyline::{
    PolylineArrow, PolylineDash, PolylineFlow, PolylineGlow, PulseLine, Trail,
};
pub use self::registry::{MaterialFactory, MaterialHandle, MaterialManager};
pub use self::surface::{ColorMaterial, DynamicTexture, Fire, Water};

use std::fmt::Debug;

use serde_json::Value;
use smallvec::SmallVec;

use crate::math::color::Color;
use crate::utils::hash::hash64;
use crate::utils::time::Timestamp;

/// GLSL-ish uniform slot types, the contract between a material and the
/// shader the host compiles for it.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UniformType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Color,
    Int,
    Bool,
    Texture,
}

/// A uniform value produced by a material evaluation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Color(Color),
    Int(i32),
    Bool(bool),
    Texture(String),
}

impl UniformValue {
    pub fn uniform_type(&self) -> UniformType {
        match *self {
            UniformValue::Float(_) => UniformType::Float,
            UniformValue::Vec2(_) => UniformType::Vec2,
            UniformValue::Vec3(_) => UniformType::Vec3,
            UniformValue::Vec4(_) => UniformType::Vec4,
            UniformValue::Color(_) => UniformType::Color,
            UniformValue::Int(_) => UniformType::Int,
            UniformValue::Bool(_) => UniformType::Bool,
            UniformValue::Texture(_) => UniformType::Texture,
        }
    }
}

/// One frame's uniform bundle: `(name, value)` pairs in schema order.
pub type UniformsSnapshot = SmallVec<[(&'static str, UniformValue); 8]>;

/// The shared contract of every material property.
pub trait MaterialProperty: Debug {
    /// The registry type name, e.g. `"polylineFlow"`.
    fn material_type(&self) -> &'static str;

    /// Uniform names and types this material feeds its shader.
    fn schema(&self) -> &'static [(&'static str, UniformType)];

    /// Whether the uniforms vary with the frame clock. Non-animated
    /// materials are eligible for batching.
    fn is_animated(&self) -> bool {
        true
    }

    /// Evaluates the uniforms at `t`. Pure: no caching across frames, no
    /// side effects.
    fn value_at(&self, t: Timestamp) -> UniformsSnapshot;

    /// Parameter bundle as a JSON object (without the `type` tag).
    fn params_json(&self) -> Value;

    /// Bumped every time an input parameter is reassigned; consumers that
    /// cached bindings recompile when this changes.
    fn generation(&self) -> u64;

    fn clone_box(&self) -> Box<dyn MaterialProperty>;

    /// Structural equality: same type, same parameters.
    fn equals(&self, other: &dyn MaterialProperty) -> bool {
        self.material_type() == other.material_type()
            && self.params_json() == other.params_json()
    }

    /// Self-describing JSON for round-trips via the factory.
    fn to_json(&self) -> Value {
        let mut v = self.params_json();
        if let Value::Object(ref mut map) = v {
            map.insert(
                "type".to_string(),
                Value::String(self.material_type().to_string()),
            );
        }
        v
    }

    /// Stable 64-bit identity of (type, params) used as a batching key.
    fn signature(&self) -> u64 {
        hash64(&self.to_json().to_string())
    }
}

impl Clone for Box<dyn MaterialProperty> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A serializable reference to a material: the registry type plus its
/// parameters. Style records carry these; the factory instantiates them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MaterialDesc {
    #[serde(rename = "type")]
    pub material_type: String,
    #[serde(flatten)]
    pub params: Value,
}

impl MaterialDesc {
    pub fn new<T: Into<String>>(material_type: T, params: Value) -> Self {
        MaterialDesc {
            material_type: material_type.into(),
            params,
        }
    }

    /// Batching key for this description.
    pub fn signature(&self) -> u64 {
        hash64(&format!("{}:{}", self.material_type, self.params))
    }
}

/// Maps the frame clock to a scrolling phase in `[0, 1)`. `speed` is cycles
/// per second; negative speeds scroll backwards.
#[inline]
pub fn scroll_phase(t: Timestamp, speed: f64) -> f64 {
    let v = (t.seconds() * speed) % 1.0;
    if v < 0.0 {
        v + 1.0
    } else {
        v
    }
}

/// Maps the frame clock to a smooth pulse in `[0, 1]` (cosine eased, `speed`
/// pulses per second).
#[inline]
pub fn pulse_phase(t: Timestamp, speed: f64) -> f64 {
    0.5 - 0.5 * (2.0 * ::std::f64::consts::PI * t.seconds() * speed).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_wrap_and_repeat() {
        let t0 = Timestamp::from_seconds(0.25);
        let t1 = Timestamp::from_seconds(1.25);
        assert!((scroll_phase(t0, 1.0) - 0.25).abs() < 1e-9);
        assert!((scroll_phase(t0, 1.0) - scroll_phase(t1, 1.0)).abs() < 1e-9);

        let back = scroll_phase(Timestamp::from_seconds(0.25), -1.0);
        assert!((back - 0.75).abs() < 1e-9);

        assert!(pulse_phase(Timestamp::from_seconds(0.0), 1.0).abs() < 1e-9);
        assert!((pulse_phase(Timestamp::from_seconds(0.5), 1.0) - 1.0).abs() < 1e-9);
    }
}
