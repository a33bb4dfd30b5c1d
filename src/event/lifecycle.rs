//! Guarded lifecycle state shared by every managed object.

use serde_json::Value;

use super::{EventHub, EventType, ListenerHandle};

/// Where a managed object is in its life.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Created but not attached to a host.
    Detached,
    /// Attached to a host (engine or layer).
    Attached,
    /// Finalized. Terminal; destroyed objects reject re-attachment.
    Destroyed,
}

impl Default for LifecycleState {
    fn default() -> Self {
        LifecycleState::Detached
    }
}

/// Lifecycle bookkeeping embedded in each managed object. The transition
/// guards implement the shared contract: `addTo` on a destroyed object warns
/// and is refused, `remove` when not attached is a no-op, `destroy` is
/// idempotent.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: LifecycleState,
    enabled: bool,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Lifecycle {
            state: LifecycleState::Detached,
            enabled: true,
        }
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    #[inline]
    pub fn is_attached(&self) -> bool {
        self.state == LifecycleState::Attached
    }

    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.state == LifecycleState::Destroyed
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Attempts the `Detached -> Attached` transition. Returns false (with a
    /// warning) when refused.
    pub fn mark_attached(&mut self, who: &str) -> bool {
        match self.state {
            LifecycleState::Destroyed => {
                warn!("Refusing to attach destroyed object {}.", who);
                false
            }
            LifecycleState::Attached => false,
            LifecycleState::Detached => {
                self.state = LifecycleState::Attached;
                true
            }
        }
    }

    /// Attempts the `Attached -> Detached` transition. Removing a not-added
    /// object is a silent no-op.
    pub fn mark_detached(&mut self) -> bool {
        if self.state == LifecycleState::Attached {
            self.state = LifecycleState::Detached;
            true
        } else {
            false
        }
    }

    /// Marks the object destroyed. Returns false on repeat calls so callers
    /// can keep `destroy()` idempotent.
    pub fn mark_destroyed(&mut self) -> bool {
        if self.state == LifecycleState::Destroyed {
            false
        } else {
            self.state = LifecycleState::Destroyed;
            true
        }
    }

    /// Flips the enabled flag; returns true if the value changed.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.enabled == enabled || self.is_destroyed() {
            false
        } else {
            self.enabled = enabled;
            true
        }
    }
}

/// The uniform capability set of a managed object, provided by composition:
/// implementors expose their [`EventHub`] and [`Lifecycle`] and inherit the
/// `on`/`off`/`fire`/`enable`/`disable`/`toggle` surface.
pub trait Managed {
    fn event_hub(&mut self) -> &mut EventHub;
    fn lifecycle(&self) -> &Lifecycle;
    fn lifecycle_mut(&mut self) -> &mut Lifecycle;

    fn on<F>(&mut self, kind: EventType, callback: F) -> ListenerHandle
    where
        F: FnMut(&super::Event) -> Result<(), failure::Error> + 'static,
        Self: Sized,
    {
        self.event_hub().on(kind, callback)
    }

    fn off(&mut self, kind: &EventType, handle: ListenerHandle) -> bool {
        self.event_hub().off(kind, handle)
    }

    fn fire(&mut self, kind: EventType, data: Value) {
        self.event_hub().fire(kind, data);
    }

    fn is_destroyed(&self) -> bool {
        self.lifecycle().is_destroyed()
    }

    fn is_enabled(&self) -> bool {
        self.lifecycle().is_enabled()
    }

    fn enable(&mut self) {
        if self.lifecycle_mut().set_enabled(true) {
            self.event_hub().signal(EventType::Enable);
        }
    }

    fn disable(&mut self) {
        if self.lifecycle_mut().set_enabled(false) {
            self.event_hub().signal(EventType::Disable);
        }
    }

    fn toggle(&mut self) {
        if self.is_enabled() {
            self.disable();
        } else {
            self.enable();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_guards() {
        let mut v = Lifecycle::new();
        assert!(!v.mark_detached());
        assert!(v.mark_attached("f1"));
        assert!(!v.mark_attached("f1"));
        assert!(v.mark_detached());

        assert!(v.mark_destroyed());
        assert!(!v.mark_destroyed());
        assert!(!v.mark_attached("f1"));
        assert!(!v.set_enabled(false));
    }
}
