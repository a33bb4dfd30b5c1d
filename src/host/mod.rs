//! The contract between the engine and the external globe renderer.
//!
//! geoscene never talks to a GPU. Each frame it produces a [`DrawList`] of
//! primitive commands and hands it to the bound [`Host`]; the host owns the
//! actual billboard/polyline/polygon/model objects, shader compilation and
//! the camera. [`HeadlessHost`] is the in-process stand-in used by tests.

pub mod headless;
pub mod providers;

pub use self::headless::{FrameRecord, HeadlessHost};
pub use self::providers::{ImageryProviderConfig, TerrainProviderConfig};

use crate::material::{MaterialDesc, UniformsSnapshot};
use crate::math::bounds::GeoRect;
use crate::math::color::Color;
use crate::math::position::Position;

/// Drawing strategy chosen for a command by the renderer factory.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RenderStrategy {
    /// One drawable per feature.
    Single,
    /// Aggregated with same-signature siblings into one drawable.
    Batched,
    /// Same geometry, per-instance transform/color.
    Instanced,
}

impl Default for RenderStrategy {
    fn default() -> Self {
        RenderStrategy::Single
    }
}

/// Geometry + base style of one drawable, in host terms.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawPrimitive {
    Point {
        position: Position,
        pixel_size: f64,
        color: Color,
        outline_color: Color,
        outline_width: f64,
        clamp_to_ground: bool,
    },
    Billboard {
        position: Position,
        image: String,
        scale: f64,
        color: Color,
        rotation: f64,
    },
    Label {
        position: Position,
        text: String,
        font: String,
        fill_color: Color,
        pixel_offset: [f64; 2],
        scale: f64,
    },
    Polyline {
        positions: Vec<Position>,
        width: f64,
        color: Color,
        clamp_to_ground: bool,
    },
    Polygon {
        positions: Vec<Position>,
        fill: bool,
        fill_color: Color,
        outline: bool,
        outline_color: Color,
        outline_width: f64,
        extruded_height: Option<f64>,
        height: Option<f64>,
        clamp_to_ground: bool,
    },
    Model {
        position: Position,
        uri: String,
        scale: f64,
        heading: f64,
        color: Color,
    },
    /// Expanding ground ring, e.g. an event ripple. `phase` is in `[0, 1)`.
    GroundCircle {
        center: Position,
        radius: f64,
        color: Color,
        phase: f64,
    },
}

/// One drawable for one frame: the primitive plus everything the host needs
/// to bind it (strategy, material uniforms, LOD scale, layer opacity).
#[derive(Debug, Clone)]
pub struct DrawCommand {
    pub feature_id: String,
    pub layer_id: String,
    pub strategy: RenderStrategy,
    pub primitive: DrawPrimitive,
    /// Material reference for shader selection, when the style carries one.
    pub material: Option<MaterialDesc>,
    /// Uniform snapshot evaluated at the current frame clock.
    pub uniforms: UniformsSnapshot,
    /// Layer opacity, premultiplied into the host's alpha.
    pub opacity: f64,
    /// LOD scale factor from `scaleByDistance`.
    pub scale: f64,
}

/// Everything the engine submits for one frame.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    pub commands: Vec<DrawCommand>,
    /// Features whose host drawables must rebuild this frame (position or
    /// style mutated, or their layer toggled). Unlisted features may reuse
    /// last frame's drawables.
    pub dirty: Vec<String>,
    pub batched: usize,
    pub instanced: usize,
}

impl DrawList {
    pub fn clear(&mut self) {
        self.commands.clear();
        self.dirty.clear();
        self.batched = 0;
        self.instanced = 0;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Camera state sampled from the host each frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CameraState {
    pub position: Position,
    /// Ground bounds of the current view. Antimeridian-crossing views are
    /// pre-split by the host.
    pub view_bounds: GeoRect,
    /// Far clip distance in meters.
    pub far: f64,
}

impl Default for CameraState {
    fn default() -> Self {
        CameraState {
            position: Position::new(0.0, 0.0, 1.0e7),
            view_bounds: GeoRect::whole_globe(),
            far: 1.0e9,
        }
    }
}

/// The capability set a globe renderer must provide.
pub trait Host {
    /// Current camera state. Called at least once per culling pass.
    fn camera(&self) -> CameraState;

    /// Consumes one frame's draw list. The host diffs against its own entity
    /// collections; the engine re-submits everything visible each frame.
    fn submit(&mut self, frame: &DrawList) -> Result<(), failure::Error>;

    /// Drops any host-side drawable for a removed feature.
    fn remove(&mut self, feature_id: &str);
}
