//! # geoscene
//!
//! A declarative geospatial scene framework layered over an external globe
//! renderer. Applications feed raw feature records into named layers and get
//! uniform lifecycle, styling, event and performance semantics across
//! thousands of time-varying features.
//!
//! The host globe (camera, terrain, imagery, actual GPU work) is an external
//! collaborator reached through the [`host`] module; everything else lives
//! here:
//!
//! * [`event`] - the event/lifecycle substrate shared by every managed object.
//! * [`adapter`] - normalization of heterogeneous raw records into canonical
//!   features.
//! * [`feature`] - the canonical feature model and per-kind graphic payloads.
//! * [`material`] - time-driven animated style values bound to the frame clock.
//! * [`clock`] - the authoritative wall clock with play/pause/seek and the
//!   availability index.
//! * [`scene`] - entity table, renderer strategies, layers and the render
//!   engine that coordinates them.
//!
//! The most intuitive setup could be something like:
//!
//! ```no_run
//! use geoscene::prelude::*;
//!
//! let (host, _frames) = HeadlessHost::new();
//! let mut engine = RenderEngine::new(Box::new(host), EngineOptions::default()).unwrap();
//! engine.create_layer("cities", LayerOptions::default()).unwrap();
//! engine.add_data("cities", &serde_json::json!([
//!     { "id": "p1", "position": { "longitude": 116.4, "latitude": 39.9 } }
//! ])).unwrap();
//! engine.advance(Timestamp::now()).unwrap();
//! ```

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde;

#[macro_use]
pub mod utils;
pub mod errors;
pub mod math;

pub mod event;

pub mod adapter;
pub mod clock;
pub mod feature;
pub mod host;
pub mod material;
pub mod scene;

pub mod prelude {
    pub use crate::adapter::{AdaptOptions, DataAdapter};
    pub use crate::clock::{PlayState, TimeInterval, TimeManager};
    pub use crate::event::{Event, EventHub, EventType, ListenerHandle, Managed};
    pub use crate::feature::{Feature, FeatureId, FeatureKind, FeaturePayload};
    pub use crate::host::{CameraState, DrawCommand, DrawList, HeadlessHost, Host};
    pub use crate::material::{MaterialDesc, MaterialFactory, MaterialManager, MaterialProperty};
    pub use crate::math::prelude::*;
    pub use crate::scene::{
        EngineOptions, EngineStats, Layer, LayerId, LayerOptions, LayerUpdate, RenderEngine,
        RenderStrategy,
    };
    pub use crate::utils::prelude::*;
}
