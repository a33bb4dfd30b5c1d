//! Multicast event dispatch with pooled listener handles.

use serde_json::Value;

use crate::utils::hash::FastHashMap;
use crate::utils::pool::HandlePool;

use super::{Event, EventType};

impl_handle!(ListenerHandle);

/// A listener callback. Returning an `Err` does not abort dispatch; the
/// failure is logged and the remaining listeners still run.
pub type Listener = Box<dyn FnMut(&Event) -> Result<(), failure::Error>>;

struct Entry {
    handle: ListenerHandle,
    callback: Listener,
}

/// Per-object event table. Listeners fire synchronously in registration
/// order.
#[derive(Default)]
pub struct EventHub {
    handles: HandlePool<ListenerHandle>,
    channels: FastHashMap<EventType, Vec<Entry>>,
}

impl EventHub {
    pub fn new() -> Self {
        Default::default()
    }

    /// Registers `callback` on the `kind` channel. The returned handle
    /// removes exactly this registration via [`EventHub::off`].
    pub fn on<F>(&mut self, kind: EventType, callback: F) -> ListenerHandle
    where
        F: FnMut(&Event) -> Result<(), failure::Error> + 'static,
    {
        let handle = self.handles.create();
        self.channels.entry(kind).or_default().push(Entry {
            handle,
            callback: Box::new(callback),
        });
        handle
    }

    /// Unregisters a listener. Returns false if the handle was not found on
    /// that channel.
    pub fn off(&mut self, kind: &EventType, handle: ListenerHandle) -> bool {
        let removed = match self.channels.get_mut(kind) {
            Some(entries) => {
                let before = entries.len();
                entries.retain(|v| v.handle != handle);
                entries.len() != before
            }
            None => false,
        };

        if removed {
            self.handles.free(handle);
        }

        removed
    }

    /// Unregisters every listener on `kind`.
    pub fn off_all(&mut self, kind: &EventType) {
        if let Some(entries) = self.channels.remove(kind) {
            for v in entries {
                self.handles.free(v.handle);
            }
        }
    }

    /// Fires an event. Listener failures are isolated: each error is logged
    /// and dispatch continues with the next listener.
    pub fn fire(&mut self, kind: EventType, data: Value) {
        let event = Event::new(kind, data);
        if let Some(entries) = self.channels.get_mut(&event.kind) {
            for v in entries.iter_mut() {
                if let Err(err) = (v.callback)(&event) {
                    warn!("Listener on {:?} failed: {}.", event.kind, err);
                }
            }
        }
    }

    /// Fires an event with a `null` payload.
    #[inline]
    pub fn signal(&mut self, kind: EventType) {
        self.fire(kind, Value::Null);
    }

    #[inline]
    pub fn has_listeners(&self, kind: &EventType) -> bool {
        self.channels.get(kind).map_or(false, |v| !v.is_empty())
    }

    /// Number of registered listeners across all channels.
    pub fn len(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empties every event table. Called on `destroy()`.
    pub fn clear(&mut self) {
        self.channels.clear();
        self.handles = HandlePool::new();
    }
}

impl ::std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn ordered_dispatch_with_isolation() {
        let trace = Rc::new(RefCell::new(Vec::new()));
        let mut hub = EventHub::new();

        let t1 = trace.clone();
        hub.on(EventType::Change, move |_| {
            t1.borrow_mut().push(1);
            Ok(())
        });

        let t2 = trace.clone();
        hub.on(EventType::Change, move |_| {
            t2.borrow_mut().push(2);
            Err(format_err!("boom"))
        });

        let t3 = trace.clone();
        hub.on(EventType::Change, move |_| {
            t3.borrow_mut().push(3);
            Ok(())
        });

        hub.signal(EventType::Change);
        assert_eq!(*trace.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn off_removes_single_listener() {
        let count = Rc::new(RefCell::new(0));
        let mut hub = EventHub::new();

        let c1 = count.clone();
        let keep = hub.on(EventType::Show, move |_| {
            *c1.borrow_mut() += 1;
            Ok(())
        });
        let c2 = count.clone();
        let drop = hub.on(EventType::Show, move |_| {
            *c2.borrow_mut() += 10;
            Ok(())
        });

        assert!(hub.off(&EventType::Show, drop));
        assert!(!hub.off(&EventType::Show, drop));
        hub.signal(EventType::Show);
        assert_eq!(*count.borrow(), 1);

        hub.clear();
        hub.signal(EventType::Show);
        assert_eq!(*count.borrow(), 1);
        let _ = keep;
    }
}
