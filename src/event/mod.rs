//! The event and lifecycle substrate shared by every managed object.
//!
//! Features, layers, materials and the engine itself all expose the same
//! contract: multicast `on`/`off`/`fire` dispatch plus guarded lifecycle
//! transitions (attach, remove, destroy, enable/disable). Emission is
//! synchronous and ordered; a failing listener is logged and skipped so the
//! rest of the chain still runs.

pub mod hub;
pub mod lifecycle;

pub use self::hub::{EventHub, ListenerHandle};
pub use self::lifecycle::{Lifecycle, LifecycleState, Managed};

use serde_json::Value;

/// The standard event vocabulary. `Custom` covers application-defined
/// channels without losing the closed set used by the engine.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    Add,
    Remove,
    Destroy,
    Enable,
    Disable,
    Change,
    Show,
    Hide,
    Click,
    MouseOver,
    MouseOut,
    Load,
    LoadError,

    // Effect/clock lifecycle.
    Start,
    Stop,
    Pause,
    Resume,
    Loop,
    Complete,

    // Drawing and editing.
    DrawStart,
    DrawAddPoint,
    DrawRemovePoint,
    DrawEnd,
    EditStart,
    EditMovePoint,
    EditEnd,

    // Engine-level.
    Initialized,
    Error,
    CurrentTimeChanged,
    AvailabilityChanged,
    DataChanged,
    VisibilityChanged,
    LayerInteraction,

    Custom(String),
}

impl EventType {
    pub fn custom<T: Into<String>>(name: T) -> EventType {
        EventType::Custom(name.into())
    }
}

/// A fired event: the channel it was fired on plus an arbitrary JSON payload.
#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventType,
    pub data: Value,
}

impl Event {
    pub fn new(kind: EventType, data: Value) -> Self {
        Event { kind, data }
    }

    /// An event with a `null` payload.
    pub fn signal(kind: EventType) -> Self {
        Event {
            kind,
            data: Value::Null,
        }
    }
}
