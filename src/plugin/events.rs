//! Pub/sub listener registry
//!
//! Listeners are grouped by event name and run in registration order.
//! Identity (`Rc::ptr_eq`) is what `off` matches on.

use super::Component;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

/// Internal listener: receives the emitting instance and the event args
///
/// An `Err` is logged and does not stop the remaining listeners.
pub type Listener = Rc<dyn Fn(&dyn Component, &[Value]) -> anyhow::Result<()>>;

/// Wrap a closure as a [`Listener`]
pub fn listener(
    f: impl Fn(&dyn Component, &[Value]) -> anyhow::Result<()> + 'static,
) -> Listener {
    Rc::new(f)
}

#[derive(Default)]
pub struct Listeners {
    by_event: HashMap<String, Vec<Listener>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append callbacks for `event`
    pub fn on(&mut self, event: &str, callbacks: impl IntoIterator<Item = Listener>) {
        self.by_event
            .entry(event.to_string())
            .or_default()
            .extend(callbacks);
    }

    /// Remove every registration identical to `callback`, or all of them
    pub fn off(&mut self, event: &str, callback: Option<&Listener>) {
        let Some(callback) = callback else {
            self.by_event.remove(event);
            return;
        };
        if let Some(list) = self.by_event.get_mut(event) {
            list.retain(|l| !Rc::ptr_eq(l, callback));
            if list.is_empty() {
                self.by_event.remove(event);
            }
        }
    }

    /// Snapshot of the callbacks for `event`
    ///
    /// Emitting iterates a copy so listeners may subscribe/unsubscribe
    /// without affecting the dispatch in progress.
    pub fn get(&self, event: &str) -> Vec<Listener> {
        self.by_event.get(event).cloned().unwrap_or_default()
    }

    pub fn count(&self, event: &str) -> usize {
        self.by_event.get(event).map_or(0, Vec::len)
    }

    pub fn contains(&self, event: &str, callback: &Listener) -> bool {
        self.by_event
            .get(event)
            .is_some_and(|list| list.iter().any(|l| Rc::ptr_eq(l, callback)))
    }

    /// Listener count per event, sorted by name
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.by_event
            .iter()
            .map(|(event, list)| (event.clone(), list.len()))
            .collect()
    }
}

impl fmt::Debug for Listeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.counts()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Listener {
        listener(|_, _| Ok(()))
    }

    #[test]
    fn test_on_appends_in_order() {
        let mut listeners = Listeners::new();
        let a = noop();
        let b = noop();
        listeners.on("show", [Rc::clone(&a)]);
        listeners.on("show", [Rc::clone(&b)]);

        let got = listeners.get("show");
        assert_eq!(got.len(), 2);
        assert!(Rc::ptr_eq(&got[0], &a));
        assert!(Rc::ptr_eq(&got[1], &b));
    }

    #[test]
    fn test_off_without_callback_clears_event() {
        let mut listeners = Listeners::new();
        listeners.on("show", [noop(), noop()]);
        listeners.on("hide", [noop()]);

        listeners.off("show", None);

        assert_eq!(listeners.count("show"), 0);
        assert_eq!(listeners.count("hide"), 1);
    }

    #[test]
    fn test_off_removes_only_identical_callbacks() {
        let mut listeners = Listeners::new();
        let keep = noop();
        let drop = noop();
        listeners.on("show", [Rc::clone(&drop), Rc::clone(&keep), Rc::clone(&drop)]);

        listeners.off("show", Some(&drop));

        assert_eq!(listeners.count("show"), 1);
        assert!(listeners.contains("show", &keep));
        assert!(!listeners.contains("show", &drop));
    }

    #[test]
    fn test_unknown_events_are_safe() {
        let mut listeners = Listeners::new();
        let callback = noop();

        listeners.off("missing", Some(&callback));
        listeners.off("missing", None);

        assert!(listeners.get("missing").is_empty());
        assert!(listeners.counts().is_empty());
    }
}
