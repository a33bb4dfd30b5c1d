//! Style records for every feature kind.
//!
//! These are plain serde documents: every field has a default so sparse user
//! input works, and unknown fields are preserved through round-trips in the
//! flattened `extras` map for forward compatibility.

use std::collections::HashMap;

use serde_json::Value;

use crate::material::MaterialDesc;
use crate::math::color::Color;

/// Near/far scaling specification: the draw scale interpolates linearly from
/// `near_value` at `near` meters to `far_value` at `far` meters, clamped
/// outside that band.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ScaleByDistance {
    pub near: f64,
    pub near_value: f64,
    pub far: f64,
    pub far_value: f64,
}

impl Default for ScaleByDistance {
    fn default() -> Self {
        ScaleByDistance {
            near: 0.0,
            near_value: 1.0,
            far: 1.0e7,
            far_value: 0.5,
        }
    }
}

impl ScaleByDistance {
    /// The draw scale at `distance` meters from the camera.
    pub fn scale_at(&self, distance: f64) -> f64 {
        if self.far <= self.near {
            return self.near_value;
        }

        let t = ((distance - self.near) / (self.far - self.near)).max(0.0).min(1.0);
        self.near_value + (self.far_value - self.near_value) * t
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelStyle {
    pub text: String,
    pub font: String,
    pub fill_color: Color,
    pub outline_color: Color,
    pub outline_width: f64,
    pub pixel_offset: [f64; 2],
    pub scale: f64,
    pub show_background: bool,
    pub background_color: Color,
    #[serde(flatten)]
    pub extras: HashMap<String, Value>,
}

impl Default for LabelStyle {
    fn default() -> Self {
        LabelStyle {
            text: String::new(),
            font: "16px sans-serif".to_string(),
            fill_color: Color::white(),
            outline_color: Color::black(),
            outline_width: 2.0,
            pixel_offset: [0.0, -20.0],
            scale: 1.0,
            show_background: false,
            background_color: Color::black().with_alpha(0.6),
            extras: HashMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PointStyle {
    pub pixel_size: f64,
    pub color: Color,
    pub outline_color: Color,
    pub outline_width: f64,
    /// Icon image url; rendered as a billboard when set.
    pub icon: Option<String>,
    pub icon_scale: f64,
    pub clamp_to_ground: bool,
    pub scale_by_distance: Option<ScaleByDistance>,
    pub label: Option<LabelStyle>,
    #[serde(flatten)]
    pub extras: HashMap<String, Value>,
}

impl Default for PointStyle {
    fn default() -> Self {
        PointStyle {
            pixel_size: 10.0,
            color: Color::cyan(),
            outline_color: Color::white(),
            outline_width: 1.0,
            icon: None,
            icon_scale: 1.0,
            clamp_to_ground: false,
            scale_by_distance: None,
            label: None,
            extras: HashMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BillboardStyle {
    pub image: String,
    pub scale: f64,
    pub color: Color,
    pub rotation: f64,
    pub clamp_to_ground: bool,
    pub scale_by_distance: Option<ScaleByDistance>,
    #[serde(flatten)]
    pub extras: HashMap<String, Value>,
}

impl Default for BillboardStyle {
    fn default() -> Self {
        BillboardStyle {
            image: String::new(),
            scale: 1.0,
            color: Color::white(),
            rotation: 0.0,
            clamp_to_ground: false,
            scale_by_distance: None,
            extras: HashMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PolylineStyle {
    pub width: f64,
    pub color: Color,
    /// Animated material; `None` draws the constant `color`.
    pub material: Option<MaterialDesc>,
    pub clamp_to_ground: bool,
    #[serde(flatten)]
    pub extras: HashMap<String, Value>,
}

impl Default for PolylineStyle {
    fn default() -> Self {
        PolylineStyle {
            width: 2.0,
            color: Color::cyan(),
            material: None,
            clamp_to_ground: false,
            extras: HashMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PolygonStyle {
    pub fill: bool,
    pub fill_color: Color,
    pub material: Option<MaterialDesc>,
    pub outline: bool,
    pub outline_color: Color,
    pub outline_width: f64,
    /// Extrusion top height in meters; `None` keeps the polygon flat.
    pub extruded_height: Option<f64>,
    /// Base height in meters above the ellipsoid.
    pub height: Option<f64>,
    pub clamp_to_ground: bool,
    #[serde(flatten)]
    pub extras: HashMap<String, Value>,
}

impl Default for PolygonStyle {
    fn default() -> Self {
        PolygonStyle {
            fill: true,
            fill_color: Color::cyan().with_alpha(0.4),
            material: None,
            outline: true,
            outline_color: Color::white(),
            outline_width: 1.0,
            extruded_height: None,
            height: None,
            clamp_to_ground: false,
            extras: HashMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ModelStyle {
    pub uri: String,
    pub scale: f64,
    pub minimum_pixel_size: f64,
    pub color: Color,
    pub scale_by_distance: Option<ScaleByDistance>,
    #[serde(flatten)]
    pub extras: HashMap<String, Value>,
}

impl Default for ModelStyle {
    fn default() -> Self {
        ModelStyle {
            uri: String::new(),
            scale: 1.0,
            minimum_pixel_size: 32.0,
            color: Color::white(),
            scale_by_distance: None,
            extras: HashMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TrajectoryStyle {
    /// Moving marker drawn at the interpolated position.
    pub marker: Option<BillboardStyle>,
    /// Moving model drawn at the interpolated position, oriented to the
    /// current bearing when `orient_to_bearing` is set.
    pub model: Option<ModelStyle>,
    pub orient_to_bearing: bool,
    pub show_path: bool,
    pub path: PolylineStyle,
    pub start_point: Option<PointStyle>,
    pub end_point: Option<PointStyle>,
    #[serde(flatten)]
    pub extras: HashMap<String, Value>,
}

impl Default for TrajectoryStyle {
    fn default() -> Self {
        TrajectoryStyle {
            marker: None,
            model: None,
            orient_to_bearing: true,
            show_path: true,
            path: PolylineStyle::default(),
            start_point: None,
            end_point: None,
            extras: HashMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct RelationStyle {
    pub width: f64,
    pub color: Color,
    pub material: Option<MaterialDesc>,
    pub arrow: bool,
    pub dashed: bool,
    pub label: Option<LabelStyle>,
    #[serde(flatten)]
    pub extras: HashMap<String, Value>,
}

impl Default for RelationStyle {
    fn default() -> Self {
        RelationStyle {
            width: 2.0,
            color: Color::orange(),
            material: None,
            arrow: true,
            dashed: false,
            label: None,
            extras: HashMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct EventStyle {
    pub marker: PointStyle,
    /// Expanding ground-ring color for events with a radius.
    pub ring_color: Color,
    /// Ring expansion speed: full cycles per second.
    pub ring_speed: f64,
    #[serde(flatten)]
    pub extras: HashMap<String, Value>,
}

impl Default for EventStyle {
    fn default() -> Self {
        EventStyle {
            marker: PointStyle {
                color: Color::red(),
                ..Default::default()
            },
            ring_color: Color::red().with_alpha(0.5),
            ring_speed: 0.5,
            extras: HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_by_distance_clamps() {
        let v = ScaleByDistance {
            near: 100.0,
            near_value: 2.0,
            far: 1100.0,
            far_value: 1.0,
        };

        assert_eq!(v.scale_at(0.0), 2.0);
        assert_eq!(v.scale_at(100.0), 2.0);
        assert!((v.scale_at(600.0) - 1.5).abs() < 1e-9);
        assert_eq!(v.scale_at(99999.0), 1.0);
    }

    #[test]
    fn unknown_fields_survive_round_trips() {
        let raw = serde_json::json!({
            "pixelSize": 14.0,
            "color": "#ff0000",
            "futureFeatureFlag": { "nested": true }
        });

        let style: PointStyle = serde_json::from_value(raw).unwrap();
        assert_eq!(style.pixel_size, 14.0);
        assert_eq!(style.color, Color::red());

        let back = serde_json::to_value(&style).unwrap();
        assert_eq!(back["futureFeatureFlag"]["nested"], true);
    }
}
