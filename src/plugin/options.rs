//! Option resolution
//!
//! Options are resolved from four layers, later layers winning:
//!
//! 1. ancestor kind defaults (least specific first)
//! 2. the concrete kind's defaults
//! 3. caller-supplied options
//! 4. `responsive` blocks whose `breakpoint` media query currently matches
//!
//! Afterwards every `on<Event>` key is pulled out of the options and turned
//! into a listener subscription for `<event>`.

use super::events::Listener;
use crate::merge::{merge, merge_all};
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

/// Options supplied by a caller: JSON values plus listener handlers
///
/// Handlers can only be attached under `on<Event>` keys; they become
/// subscriptions and never show up in the resolved options.
#[derive(Clone, Default)]
pub struct Options {
    values: Map<String, Value>,
    handlers: Vec<(String, Vec<Listener>)>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a JSON option value
    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    /// Attach a handler under an `on<Event>` key
    pub fn handler(mut self, key: &str, callback: Listener) -> Self {
        self.push_handlers(key, vec![callback]);
        self
    }

    /// Attach several handlers under one `on<Event>` key
    pub fn handlers(mut self, key: &str, callbacks: Vec<Listener>) -> Self {
        self.push_handlers(key, callbacks);
        self
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    fn push_handlers(&mut self, key: &str, callbacks: Vec<Listener>) {
        match self.handlers.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => existing.extend(callbacks),
            None => self.handlers.push((key.to_string(), callbacks)),
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers: Vec<(&str, usize)> = self
            .handlers
            .iter()
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect();
        f.debug_struct("Options")
            .field("values", &self.values)
            .field("handlers", &handlers)
            .finish()
    }
}

impl From<Map<String, Value>> for Options {
    fn from(values: Map<String, Value>) -> Self {
        Self {
            values,
            handlers: Vec::new(),
        }
    }
}

impl From<Value> for Options {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(values) => values.into(),
            Value::Null => Self::default(),
            other => {
                tracing::warn!("Ignoring non-object options: {}", other);
                Self::default()
            }
        }
    }
}

fn on_key() -> &'static Regex {
    static ON_KEY: OnceLock<Regex> = OnceLock::new();
    ON_KEY.get_or_init(|| Regex::new(r"^on[A-Z]").expect("static pattern"))
}

/// Event name subscribed by an option key: `onShowLoader` -> `showLoader`
pub fn event_for_key(key: &str) -> Option<String> {
    if !on_key().is_match(key) {
        return None;
    }
    let rest = &key[2..];
    let mut chars = rest.chars();
    let first = chars.next()?;
    Some(first.to_lowercase().chain(chars).collect())
}

/// Merge a kind's default chain, least specific first
pub fn inherit(chain: &[Map<String, Value>]) -> Map<String, Value> {
    merge_all(chain)
}

/// Apply `update` on top of `current` and return the subscriptions it carried
///
/// `media` evaluates breakpoints; `None` means the host cannot evaluate
/// media queries and responsive blocks are skipped.
pub fn apply(
    current: &mut Map<String, Value>,
    update: Options,
    media: &dyn Fn(&str) -> Option<bool>,
) -> Vec<(String, Vec<Listener>)> {
    merge(current, &update.values);
    apply_responsive(current, media);

    let mut subscriptions = Vec::new();

    // JSON values under `on*` keys cannot be called; they are consumed all the same
    let keys: Vec<String> = current
        .keys()
        .filter(|key| on_key().is_match(key))
        .cloned()
        .collect();
    for key in keys {
        if let Some(value) = current.remove(&key) {
            tracing::warn!("Option '{}' is not a handler ({}), dropped", key, value);
        }
    }

    for (key, callbacks) in update.handlers {
        match event_for_key(&key) {
            Some(event) => subscriptions.push((event, callbacks)),
            None => tracing::warn!("Handler under non-event option '{}' ignored", key),
        }
    }

    subscriptions
}

fn apply_responsive(current: &mut Map<String, Value>, media: &dyn Fn(&str) -> Option<bool>) {
    let Some(Value::Object(blocks)) = current.get("responsive").cloned() else {
        return;
    };

    for (label, block) in blocks {
        let Value::Object(mut overrides) = block else {
            tracing::warn!("Responsive block '{}' is not an object", label);
            continue;
        };
        let Some(Value::String(breakpoint)) = overrides.remove("breakpoint") else {
            tracing::warn!("Responsive block '{}' has no breakpoint", label);
            continue;
        };

        match media(&breakpoint) {
            Some(true) => {
                tracing::debug!("Breakpoint '{}' ({}) matches", label, breakpoint);
                merge(current, &overrides);
            }
            Some(false) => {}
            None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::events::listener;
    use serde_json::json;
    use std::rc::Rc;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn never(_: &str) -> Option<bool> {
        Some(false)
    }

    #[test]
    fn test_instance_options_override_defaults() {
        let mut current = inherit(&[obj(json!({"a": 1, "b": 2}))]);
        apply(&mut current, json!({"b": 3, "c": 4}).into(), &never);
        assert_eq!(Value::Object(current), json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn test_chain_is_least_specific_first() {
        let chain = [
            obj(json!({"cache": true, "debug": false, "mode": "click"})),
            obj(json!({"mode": "hover", "delay": 300})),
            obj(json!({"delay": 150})),
        ];
        let merged = inherit(&chain);
        assert_eq!(
            Value::Object(merged),
            json!({"cache": true, "debug": false, "mode": "hover", "delay": 150})
        );
    }

    #[test]
    fn test_on_handlers_become_subscriptions() {
        let foo = listener(|_, _| Ok(()));
        let mut current = Map::new();

        let subs = apply(
            &mut current,
            Options::new().set("a", 1).handler("onFoo", Rc::clone(&foo)),
            &never,
        );

        assert!(!current.contains_key("onFoo"));
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].0, "foo");
        assert!(Rc::ptr_eq(&subs[0].1[0], &foo));
    }

    #[test]
    fn test_json_on_keys_are_removed() {
        let mut current = Map::new();
        let subs = apply(&mut current, json!({"onShow": true, "online": 1}).into(), &never);

        assert!(subs.is_empty());
        assert!(!current.contains_key("onShow"));
        // lowercase after `on` is an ordinary option
        assert_eq!(current["online"], json!(1));
    }

    #[test]
    fn test_event_for_key() {
        assert_eq!(event_for_key("onShowLoader").as_deref(), Some("showLoader"));
        assert_eq!(event_for_key("onInit").as_deref(), Some("init"));
        assert_eq!(event_for_key("onset"), None);
        assert_eq!(event_for_key("on"), None);
        assert_eq!(event_for_key("Onclick"), None);
    }

    #[test]
    fn test_matching_breakpoint_applies() {
        let mut current = obj(json!({"b": 2}));
        let update = json!({
            "responsive": {"mobile": {"breakpoint": "(max-width: 600px)", "b": 9}}
        });

        apply(&mut current, update.into(), &|q: &str| Some(q == "(max-width: 600px)"));

        assert_eq!(current["b"], json!(9));
        assert!(!current.contains_key("breakpoint"));
    }

    #[test]
    fn test_non_matching_breakpoint_keeps_value() {
        let mut current = obj(json!({"b": 2}));
        let update = json!({
            "responsive": {"mobile": {"breakpoint": "(max-width: 600px)", "b": 9}}
        });

        apply(&mut current, update.into(), &never);

        assert_eq!(current["b"], json!(2));
    }

    #[test]
    fn test_all_matching_breakpoints_apply_in_order() {
        let mut current = Map::new();
        let update = json!({
            "responsive": {
                "tablet": {"breakpoint": "tablet", "columns": 2, "gutter": 10},
                "phone": {"breakpoint": "phone", "columns": 1}
            }
        });

        apply(&mut current, update.into(), &|_: &str| Some(true));

        assert_eq!(current["columns"], json!(1));
        assert_eq!(current["gutter"], json!(10));
    }

    #[test]
    fn test_no_media_evaluator_skips_responsive() {
        let mut current = obj(json!({"b": 2}));
        let update = json!({"responsive": {"mobile": {"breakpoint": "x", "b": 9}}});

        apply(&mut current, update.into(), &|_: &str| None);

        assert_eq!(current["b"], json!(2));
    }

    #[test]
    fn test_nested_option_groups_merge() {
        let mut current = obj(json!({"ajax": {"method": "get", "cache": true}}));
        apply(&mut current, json!({"ajax": {"method": "post"}}).into(), &never);
        assert_eq!(current["ajax"], json!({"method": "post", "cache": true}));
    }

    #[test]
    fn test_non_object_options_are_ignored() {
        let options: Options = json!([1, 2]).into();
        assert!(options.values().is_empty());
    }
}
