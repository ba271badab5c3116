//! Named event listeners.
//!
//! Each client owns its own [`EventBus`]; nothing is shared between client
//! instances. A firing invokes every persistent listener for the name, in
//! registration order, followed by every one-shot listener registered before
//! the firing started. One-shot listeners are detached before they run, so a
//! listener may register further listeners without disturbing the firing in
//! progress.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::message::IncomingData;

type Listener = Arc<dyn Fn(&IncomingData) + Send + Sync>;
type OnceListener = Box<dyn FnOnce(&IncomingData) + Send>;

#[derive(Default)]
pub struct EventBus {
    persistent: Mutex<HashMap<String, Vec<Listener>>>,
    once: Mutex<HashMap<String, Vec<OnceListener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener invoked on every firing of `event`.
    pub fn on<F>(&self, event: impl Into<String>, listener: F)
    where
        F: Fn(&IncomingData) + Send + Sync + 'static,
    {
        self.persistent
            .lock()
            .entry(event.into())
            .or_default()
            .push(Arc::new(listener));
    }

    /// Register a listener invoked on the next firing of `event` only.
    pub fn once<F>(&self, event: impl Into<String>, listener: F)
    where
        F: FnOnce(&IncomingData) + Send + 'static,
    {
        self.once
            .lock()
            .entry(event.into())
            .or_default()
            .push(Box::new(listener));
    }

    /// Fire `event` with `data`. Returns the number of listeners invoked.
    pub fn emit(&self, event: &str, data: &IncomingData) -> usize {
        // Locks are released before any listener runs.
        let persistent: Vec<Listener> = self
            .persistent
            .lock()
            .get(event)
            .cloned()
            .unwrap_or_default();
        let once: Vec<OnceListener> = self.once.lock().remove(event).unwrap_or_default();

        let invoked = persistent.len() + once.len();
        for listener in &persistent {
            listener(data);
        }
        for listener in once {
            listener(data);
        }
        invoked
    }

    /// Number of listeners (persistent and pending one-shot) for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        let persistent = self.persistent.lock().get(event).map_or(0, Vec::len);
        let once = self.once.lock().get(event).map_or(0, Vec::len);
        persistent + once
    }

    /// Drop every listener registered for `event`.
    pub fn remove_all(&self, event: &str) {
        self.persistent.lock().remove(event);
        self.once.lock().remove(event);
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("persistent", &self.persistent.lock().len())
            .field("once", &self.once.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::DataKind;

    fn item() -> IncomingData {
        IncomingData {
            kind: DataKind::Action,
            block_num: 1,
            content: serde_json::Value::Null,
        }
    }

    type BoxedListener = Box<dyn Fn(&IncomingData) + Send + Sync>;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> BoxedListener) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        let make = move |name: &'static str| -> BoxedListener {
            let log = log_clone.clone();
            Box::new(move |_: &IncomingData| log.lock().push(name))
        };
        (log, make)
    }

    #[test]
    fn persistent_then_once_and_once_is_removed() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        bus.on("x", make("A"));
        bus.once("x", make("B"));

        assert_eq!(bus.emit("x", &item()), 2);
        assert_eq!(*log.lock(), vec!["A", "B"]);

        log.lock().clear();
        assert_eq!(bus.emit("x", &item()), 1);
        assert_eq!(*log.lock(), vec!["A"]);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        bus.once("x", make("o1"));
        bus.on("x", make("p1"));
        bus.once("x", make("o2"));
        bus.on("x", make("p2"));

        bus.emit("x", &item());
        assert_eq!(*log.lock(), vec!["p1", "p2", "o1", "o2"]);
    }

    #[test]
    fn names_are_isolated() {
        let bus = EventBus::new();
        let (log, make) = recorder();
        bus.on("x", make("x"));
        assert_eq!(bus.emit("y", &item()), 0);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn reentrant_registration_applies_to_next_firing() {
        let bus = Arc::new(EventBus::new());
        let hits = Arc::new(Mutex::new(0u32));

        let bus_clone = bus.clone();
        let hits_clone = hits.clone();
        bus.once("x", move |_| {
            let hits = hits_clone.clone();
            bus_clone.once("x", move |_| *hits.lock() += 1);
        });

        assert_eq!(bus.emit("x", &item()), 1);
        assert_eq!(*hits.lock(), 0);
        assert_eq!(bus.listener_count("x"), 1);

        assert_eq!(bus.emit("x", &item()), 1);
        assert_eq!(*hits.lock(), 1);
        assert_eq!(bus.listener_count("x"), 0);
    }

    #[test]
    fn remove_all_drops_both_kinds() {
        let bus = EventBus::new();
        bus.on("x", |_| {});
        bus.once("x", |_| {});
        bus.on("y", |_| {});
        bus.remove_all("x");
        assert_eq!(bus.listener_count("x"), 0);
        assert_eq!(bus.emit("x", &item()), 0);
        assert_eq!(bus.listener_count("y"), 1);
    }

    #[test]
    fn instances_do_not_share_listeners() {
        let a = EventBus::new();
        let b = EventBus::new();
        a.on("x", |_| {});
        assert_eq!(a.listener_count("x"), 1);
        assert_eq!(b.listener_count("x"), 0);
    }
}
