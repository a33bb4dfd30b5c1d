//! Surface materials: constant color, scrolling texture, water and fire.

use serde_json::Value;

use crate::errors::{Error, Result};
use crate::math::color::Color;
use crate::utils::time::Timestamp;

use super::{scroll_phase, MaterialProperty, UniformType, UniformValue, UniformsSnapshot};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorParams {
    pub color: Color,
}

impl Default for ColorParams {
    fn default() -> Self {
        ColorParams {
            color: Color::white(),
        }
    }
}

/// Constant color, the degenerate material.
#[derive(Debug, Clone)]
pub struct ColorMaterial {
    params: ColorParams,
    generation: u64,
}

impl_material_body!(ColorMaterial, ColorParams);

impl ColorMaterial {
    pub fn of(color: Color) -> Self {
        ColorMaterial::new(ColorParams { color })
    }
}

impl MaterialProperty for ColorMaterial {
    fn material_type(&self) -> &'static str {
        "color"
    }

    fn schema(&self) -> &'static [(&'static str, UniformType)] {
        &[("color", UniformType::Color)]
    }

    fn is_animated(&self) -> bool {
        false
    }

    fn value_at(&self, _: Timestamp) -> UniformsSnapshot {
        let mut v = UniformsSnapshot::new();
        v.push(("color", UniformValue::Color(self.params.color)));
        v
    }

    fn params_json(&self) -> Value {
        ::serde_json::to_value(&self.params).unwrap_or(Value::Null)
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn clone_box(&self) -> Box<dyn MaterialProperty> {
        Box::new(self.clone())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DynamicTextureParams {
    pub image: String,
    /// Texture repeats along u/v.
    pub repeat: [f64; 2],
    /// Scroll speed in repeats per second.
    pub speed: f64,
    /// Scroll direction: 0 = along u, 1 = along v.
    pub axis: u8,
    pub color: Color,
}

impl Default for DynamicTextureParams {
    fn default() -> Self {
        DynamicTextureParams {
            image: String::new(),
            repeat: [1.0, 1.0],
            speed: 0.25,
            axis: 0,
            color: Color::white(),
        }
    }
}

/// A texture scrolling across the surface.
#[derive(Debug, Clone)]
pub struct DynamicTexture {
    params: DynamicTextureParams,
    generation: u64,
}

impl_material_body!(DynamicTexture, DynamicTextureParams);

impl MaterialProperty for DynamicTexture {
    fn material_type(&self) -> &'static str {
        "dynamicTexture"
    }

    fn schema(&self) -> &'static [(&'static str, UniformType)] {
        &[
            ("image", UniformType::Texture),
            ("repeat", UniformType::Vec2),
            ("offset", UniformType::Vec2),
            ("color", UniformType::Color),
        ]
    }

    fn value_at(&self, t: Timestamp) -> UniformsSnapshot {
        let phase = scroll_phase(t, self.params.speed) as f32;
        let offset = if self.params.axis == 0 {
            [phase, 0.0]
        } else {
            [0.0, phase]
        };

        let mut v = UniformsSnapshot::new();
        v.push(("image", UniformValue::Texture(self.params.image.clone())));
        v.push((
            "repeat",
            UniformValue::Vec2([self.params.repeat[0] as f32, self.params.repeat[1] as f32]),
        ));
        v.push(("offset", UniformValue::Vec2(offset)));
        v.push(("color", UniformValue::Color(self.params.color)));
        v
    }

    fn params_json(&self) -> Value {
        ::serde_json::to_value(&self.params).unwrap_or(Value::Null)
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn clone_box(&self) -> Box<dyn MaterialProperty> {
        Box::new(self.clone())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WaterParams {
    pub base_color: Color,
    pub normal_map: String,
    /// Wave count across the surface.
    pub frequency: f64,
    /// Wave height scale.
    pub amplitude: f64,
    pub specular_intensity: f64,
    /// Wave cycles per second.
    pub animation_speed: f64,
}

impl Default for WaterParams {
    fn default() -> Self {
        WaterParams::ocean()
    }
}

impl WaterParams {
    pub fn ocean() -> Self {
        WaterParams {
            base_color: Color::from_hex("#006ab4").unwrap_or_else(Color::blue),
            normal_map: "waterNormals.jpg".to_string(),
            frequency: 1000.0,
            amplitude: 10.0,
            specular_intensity: 0.5,
            animation_speed: 0.01,
        }
    }

    pub fn lake() -> Self {
        WaterParams {
            base_color: Color::from_hex("#2e6d5a").unwrap_or_else(Color::green),
            frequency: 200.0,
            amplitude: 2.0,
            specular_intensity: 0.3,
            animation_speed: 0.005,
            ..WaterParams::ocean()
        }
    }

    pub fn river() -> Self {
        WaterParams {
            base_color: Color::from_hex("#4a86a8").unwrap_or_else(Color::blue),
            frequency: 500.0,
            amplitude: 4.0,
            specular_intensity: 0.4,
            animation_speed: 0.02,
            ..WaterParams::ocean()
        }
    }

    fn preset(name: &str) -> Option<Self> {
        match name {
            "ocean" => Some(WaterParams::ocean()),
            "lake" => Some(WaterParams::lake()),
            "river" => Some(WaterParams::river()),
            _ => None,
        }
    }
}

/// Animated water surface.
#[derive(Debug, Clone)]
pub struct Water {
    params: WaterParams,
    generation: u64,
}

impl_material_body!(Water, WaterParams);

impl Water {
    /// Registry constructor honoring `{"preset": "ocean", ...overrides}`.
    pub fn from_value_with_presets(v: &Value) -> Result<Box<dyn MaterialProperty>> {
        let merged = apply_preset(v, |name| {
            WaterParams::preset(name).map(|p| ::serde_json::to_value(&p).unwrap_or(Value::Null))
        })?;
        Water::from_value(&merged)
    }
}

impl MaterialProperty for Water {
    fn material_type(&self) -> &'static str {
        "water"
    }

    fn schema(&self) -> &'static [(&'static str, UniformType)] {
        &[
            ("baseColor", UniformType::Color),
            ("normalMap", UniformType::Texture),
            ("frequency", UniformType::Float),
            ("amplitude", UniformType::Float),
            ("specularIntensity", UniformType::Float),
            ("phase", UniformType::Float),
        ]
    }

    fn value_at(&self, t: Timestamp) -> UniformsSnapshot {
        let mut v = UniformsSnapshot::new();
        v.push(("baseColor", UniformValue::Color(self.params.base_color)));
        v.push(("normalMap", UniformValue::Texture(self.params.normal_map.clone())));
        v.push(("frequency", UniformValue::Float(self.params.frequency as f32)));
        v.push(("amplitude", UniformValue::Float(self.params.amplitude as f32)));
        v.push((
            "specularIntensity",
            UniformValue::Float(self.params.specular_intensity as f32),
        ));
        v.push((
            "phase",
            UniformValue::Float(scroll_phase(t, self.params.animation_speed) as f32),
        ));
        v
    }

    fn params_json(&self) -> Value {
        ::serde_json::to_value(&self.params).unwrap_or(Value::Null)
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn clone_box(&self) -> Box<dyn MaterialProperty> {
        Box::new(self.clone())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct FireParams {
    pub color: Color,
    /// FBM noise feature scale.
    pub noise_scale: f64,
    /// Alpha cutoff for the flame silhouette, `[0, 1]`.
    pub threshold: f64,
    /// Upward distortion strength.
    pub distortion: f64,
    /// FBM octave count.
    pub octaves: u8,
    /// Flicker cycles per second.
    pub speed: f64,
}

impl Default for FireParams {
    fn default() -> Self {
        FireParams::campfire()
    }
}

impl FireParams {
    pub fn campfire() -> Self {
        FireParams {
            color: Color::from_hex("#ff6a00").unwrap_or_else(Color::orange),
            noise_scale: 2.0,
            threshold: 0.35,
            distortion: 0.3,
            octaves: 4,
            speed: 1.0,
        }
    }

    pub fn torch() -> Self {
        FireParams {
            noise_scale: 3.0,
            threshold: 0.45,
            distortion: 0.5,
            speed: 1.6,
            ..FireParams::campfire()
        }
    }

    pub fn explosion() -> Self {
        FireParams {
            color: Color::from_hex("#ffd23c").unwrap_or_else(Color::yellow),
            noise_scale: 1.2,
            threshold: 0.2,
            distortion: 0.8,
            octaves: 5,
            speed: 3.0,
        }
    }

    fn preset(name: &str) -> Option<Self> {
        match name {
            "campfire" => Some(FireParams::campfire()),
            "torch" => Some(FireParams::torch()),
            "explosion" => Some(FireParams::explosion()),
            _ => None,
        }
    }
}

/// Noise-based flame.
#[derive(Debug, Clone)]
pub struct Fire {
    params: FireParams,
    generation: u64,
}

impl_material_body!(Fire, FireParams);

impl Fire {
    /// Registry constructor honoring `{"preset": "torch", ...overrides}`.
    pub fn from_value_with_presets(v: &Value) -> Result<Box<dyn MaterialProperty>> {
        let merged = apply_preset(v, |name| {
            FireParams::preset(name).map(|p| ::serde_json::to_value(&p).unwrap_or(Value::Null))
        })?;
        Fire::from_value(&merged)
    }
}

impl MaterialProperty for Fire {
    fn material_type(&self) -> &'static str {
        "fire"
    }

    fn schema(&self) -> &'static [(&'static str, UniformType)] {
        &[
            ("color", UniformType::Color),
            ("noiseScale", UniformType::Float),
            ("threshold", UniformType::Float),
            ("distortion", UniformType::Float),
            ("octaves", UniformType::Int),
            ("phase", UniformType::Float),
        ]
    }

    fn value_at(&self, t: Timestamp) -> UniformsSnapshot {
        let mut v = UniformsSnapshot::new();
        v.push(("color", UniformValue::Color(self.params.color)));
        v.push(("noiseScale", UniformValue::Float(self.params.noise_scale as f32)));
        v.push(("threshold", UniformValue::Float(self.params.threshold as f32)));
        v.push(("distortion", UniformValue::Float(self.params.distortion as f32)));
        v.push(("octaves", UniformValue::Int(i32::from(self.params.octaves))));
        v.push((
            "phase",
            UniformValue::Float(scroll_phase(t, self.params.speed) as f32),
        ));
        v
    }

    fn params_json(&self) -> Value {
        ::serde_json::to_value(&self.params).unwrap_or(Value::Null)
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn clone_box(&self) -> Box<dyn MaterialProperty> {
        Box::new(self.clone())
    }
}

// Overlays user fields on a named preset bundle: {"preset": "x", "speed": 2}
// starts from preset x and replaces its speed.
fn apply_preset<F>(v: &Value, lookup: F) -> Result<Value>
where
    F: Fn(&str) -> Option<Value>,
{
    let name = match v.get("preset").and_then(Value::as_str) {
        Some(name) => name,
        None => return Ok(v.clone()),
    };

    let mut base = lookup(name)
        .ok_or_else(|| Error::DocumentInvalid("material", format!("unknown preset {}", name)))?;

    if let (Value::Object(base_map), Value::Object(user)) = (&mut base, v) {
        for (k, field) in user {
            if k != "preset" {
                base_map.insert(k.clone(), field.clone());
            }
        }
    }

    Ok(base)
}
