//! The layered scene graph: entity table, renderer strategies, layers and
//! the render engine coordinating them.

pub mod engine;
pub mod entities;
pub mod layer;
pub mod renderer;
pub mod stats;

pub use self::engine::{EngineOptions, RenderEngine};
pub use self::entities::EntityManager;
pub use self::layer::{Layer, LayerId, LayerOptions, LayerUpdate};
pub use self::renderer::{RendererFactory, RendererOptions};
pub use self::stats::{EngineStats, FrameInfo, LayerStats};

pub use crate::host::RenderStrategy;
