//! Polyline materials: glow, dash, arrow, flow, pulse and trail.

use serde_json::Value;

use crate::math::color::Color;
use crate::utils::time::Timestamp;

use super::{pulse_phase, scroll_phase, MaterialProperty, UniformType, UniformValue, UniformsSnapshot};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PolylineGlowParams {
    pub color: Color,
    pub glow_power: f64,
    pub taper_power: f64,
}

impl Default for PolylineGlowParams {
    fn default() -> Self {
        PolylineGlowParams {
            color: Color::cyan(),
            glow_power: 0.25,
            taper_power: 1.0,
        }
    }
}

/// Static glow along the line.
#[derive(Debug, Clone)]
pub struct PolylineGlow {
    params: PolylineGlowParams,
    generation: u64,
}

impl_material_body!(PolylineGlow, PolylineGlowParams);

impl MaterialProperty for PolylineGlow {
    fn material_type(&self) -> &'static str {
        "polylineGlow"
    }

    fn schema(&self) -> &'static [(&'static str, UniformType)] {
        &[
            ("color", UniformType::Color),
            ("glowPower", UniformType::Float),
            ("taperPower", UniformType::Float),
        ]
    }

    fn is_animated(&self) -> bool {
        false
    }

    fn value_at(&self, _: Timestamp) -> UniformsSnapshot {
        let mut v = UniformsSnapshot::new();
        v.push(("color", UniformValue::Color(self.params.color)));
        v.push(("glowPower", UniformValue::Float(self.params.glow_power as f32)));
        v.push(("taperPower", UniformValue::Float(self.params.taper_power as f32)));
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
pub struct PolylineDashParams {
    pub color: Color,
    pub gap_color: Color,
    pub dash_length: f64,
    /// 16-bit on/off pattern, like the classic `0b1111111100000000`.
    pub dash_pattern: u16,
}

impl Default for PolylineDashParams {
    fn default() -> Self {
        PolylineDashParams {
            color: Color::white(),
            gap_color: Color::transparent(),
            dash_length: 16.0,
            dash_pattern: 0b1111_1111_0000_0000,
        }
    }
}

/// Dashed line.
#[derive(Debug, Clone)]
pub struct PolylineDash {
    params: PolylineDashParams,
    generation: u64,
}

impl_material_body!(PolylineDash, PolylineDashParams);

impl MaterialProperty for PolylineDash {
    fn material_type(&self) -> &'static str {
        "polylineDash"
    }

    fn schema(&self) -> &'static [(&'static str, UniformType)] {
        &[
            ("color", UniformType::Color),
            ("gapColor", UniformType::Color),
            ("dashLength", UniformType::Float),
            ("dashPattern", UniformType::Int),
        ]
    }

    fn is_animated(&self) -> bool {
        false
    }

    fn value_at(&self, _: Timestamp) -> UniformsSnapshot {
        let mut v = UniformsSnapshot::new();
        v.push(("color", UniformValue::Color(self.params.color)));
        v.push(("gapColor", UniformValue::Color(self.params.gap_color)));
        v.push(("dashLength", UniformValue::Float(self.params.dash_length as f32)));
        v.push(("dashPattern", UniformValue::Int(i32::from(self.params.dash_pattern))));
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
pub struct PolylineArrowParams {
    pub color: Color,
}

impl Default for PolylineArrowParams {
    fn default() -> Self {
        PolylineArrowParams {
            color: Color::white(),
        }
    }
}

/// Line with an arrow head at the end.
#[derive(Debug, Clone)]
pub struct PolylineArrow {
    params: PolylineArrowParams,
    generation: u64,
}

impl_material_body!(PolylineArrow, PolylineArrowParams);

impl MaterialProperty for PolylineArrow {
    fn material_type(&self) -> &'static str {
        "polylineArrow"
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
pub struct PolylineFlowParams {
    pub color: Color,
    /// Scroll speed in cycles per second.
    pub speed: f64,
    /// Lit fraction of the line, `(0, 1]`.
    pub percent: f64,
    /// Softness of the lit head/tail falloff, `[0, 1]`.
    pub gradient: f64,
    /// Flow from end to start instead.
    pub reverse: bool,
}

impl Default for PolylineFlowParams {
    fn default() -> Self {
        PolylineFlowParams {
            color: Color::cyan(),
            speed: 0.5,
            percent: 0.25,
            gradient: 0.1,
            reverse: false,
        }
    }
}

/// A lit segment flowing along the line, driven by the frame clock.
#[derive(Debug, Clone)]
pub struct PolylineFlow {
    params: PolylineFlowParams,
    generation: u64,
}

impl_material_body!(PolylineFlow, PolylineFlowParams);

impl MaterialProperty for PolylineFlow {
    fn material_type(&self) -> &'static str {
        "polylineFlow"
    }

    fn schema(&self) -> &'static [(&'static str, UniformType)] {
        &[
            ("color", UniformType::Color),
            ("phase", UniformType::Float),
            ("percent", UniformType::Float),
            ("gradient", UniformType::Float),
            ("reverse", UniformType::Bool),
        ]
    }

    fn value_at(&self, t: Timestamp) -> UniformsSnapshot {
        let speed = if self.params.reverse {
            -self.params.speed
        } else {
            self.params.speed
        };

        let mut v = UniformsSnapshot::new();
        v.push(("color", UniformValue::Color(self.params.color)));
        v.push(("phase", UniformValue::Float(scroll_phase(t, speed) as f32)));
        v.push(("percent", UniformValue::Float(self.params.percent as f32)));
        v.push(("gradient", UniformValue::Float(self.params.gradient as f32)));
        v.push(("reverse", UniformValue::Bool(self.params.reverse)));
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
pub struct PulseLineParams {
    pub color: Color,
    /// Pulse width as a fraction of the line, `(0, 1]`.
    pub pulse_width: f64,
    /// Pulses per second.
    pub speed: f64,
}

impl Default for PulseLineParams {
    fn default() -> Self {
        PulseLineParams {
            color: Color::cyan(),
            pulse_width: 0.2,
            speed: 1.0,
        }
    }
}

/// Brightness pulse travelling along the line.
#[derive(Debug, Clone)]
pub struct PulseLine {
    params: PulseLineParams,
    generation: u64,
}

impl_material_body!(PulseLine, PulseLineParams);

impl MaterialProperty for PulseLine {
    fn material_type(&self) -> &'static str {
        "pulseLine"
    }

    fn schema(&self) -> &'static [(&'static str, UniformType)] {
        &[
            ("color", UniformType::Color),
            ("pulseWidth", UniformType::Float),
            ("phase", UniformType::Float),
            ("intensity", UniformType::Float),
        ]
    }

    fn value_at(&self, t: Timestamp) -> UniformsSnapshot {
        let mut v = UniformsSnapshot::new();
        v.push(("color", UniformValue::Color(self.params.color)));
        v.push(("pulseWidth", UniformValue::Float(self.params.pulse_width as f32)));
        v.push(("phase", UniformValue::Float(scroll_phase(t, self.params.speed) as f32)));
        v.push(("intensity", UniformValue::Float(pulse_phase(t, self.params.speed) as f32)));
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
pub struct TrailParams {
    pub color: Color,
    /// Trail length as a fraction of the line, `(0, 1]`.
    pub trail_length: f64,
    /// Sweeps per second.
    pub speed: f64,
}

impl Default for TrailParams {
    fn default() -> Self {
        TrailParams {
            color: Color::orange(),
            trail_length: 0.35,
            speed: 0.5,
        }
    }
}

/// A fading trail sweeping along the line.
#[derive(Debug, Clone)]
pub struct Trail {
    params: TrailParams,
    generation: u64,
}

impl_material_body!(Trail, TrailParams);

impl MaterialProperty for Trail {
    fn material_type(&self) -> &'static str {
        "trail"
    }

    fn schema(&self) -> &'static [(&'static str, UniformType)] {
        &[
            ("color", UniformType::Color),
            ("trailLength", UniformType::Float),
            ("phase", UniformType::Float),
        ]
    }

    fn value_at(&self, t: Timestamp) -> UniformsSnapshot {
        let mut v = UniformsSnapshot::new();
        v.push(("color", UniformValue::Color(self.params.color)));
        v.push(("trailLength", UniformValue::Float(self.params.trail_length as f32)));
        v.push(("phase", UniformValue::Float(scroll_phase(t, self.params.speed) as f32)));
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flow_phase_is_deterministic() {
        let flow = PolylineFlow::new(PolylineFlowParams::default());
        let t = Timestamp::from_seconds(123.4);
        assert_eq!(flow.value_at(t), flow.value_at(t));
        assert!(flow.is_animated());

        let glow = PolylineGlow::new(PolylineGlowParams::default());
        assert!(!glow.is_animated());
    }

    #[test]
    fn generation_tracks_reassignment() {
        let mut flow = PolylineFlow::new(PolylineFlowParams::default());
        assert_eq!(flow.generation(), 0);

        // Reassigning identical params is not a definition change.
        flow.set_params(PolylineFlowParams::default());
        assert_eq!(flow.generation(), 0);

        flow.set_params(PolylineFlowParams {
            speed: 2.0,
            ..Default::default()
        });
        assert_eq!(flow.generation(), 1);
    }
}
