//! DOM collaborator contract
//!
//! The plugin core never touches a concrete document. Everything it needs
//! from the host page (lookup, attachment tests, mounting, listeners,
//! custom events, media queries) goes through the [`Dom`] trait.
//!
//! # Hosts
//!
//! - [`MemoryDom`] - in-memory document used by tests and the demo binary
//!
//! # Event flow
//!
//! ```text
//! dispatch(Node) ─▶ node ─▶ parent ─▶ ... ─▶ root ─▶ Document ─▶ Window
//!                     │
//!                     └─ listeners run in registration order at each step
//! ```
//!
//! Detached subtrees stop bubbling at their own root.

use serde::Serialize;
use serde_json::Value;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

mod delegate;
mod memory;
mod selector;

pub use delegate::delegate;
pub use memory::MemoryDom;
pub use selector::{Element, SelectorList};

/// Platform name of the "document is ready" event
pub const DOM_READY: &str = "DOMContentLoaded";

/// Handle to an element owned by a [`Dom`] host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Anything a listener can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Target {
    Window,
    Document,
    Node(NodeId),
}

impl Target {
    pub fn node(self) -> Option<NodeId> {
        match self {
            Target::Node(node) => Some(node),
            _ => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Window => f.write_str("window"),
            Target::Document => f.write_str("document"),
            Target::Node(node) => write!(f, "node#{}", node.0),
        }
    }
}

/// Identity of the component that dispatched a custom event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentRef {
    pub name: String,
    pub uid: u64,
    pub selector: String,
}

/// Payload carried by `<event>.toolkit.<name>` custom events
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomDetail {
    pub context: ComponentRef,
    pub arguments: Vec<Value>,
}

/// A native or custom event travelling through a [`Dom`] host
#[derive(Debug)]
pub struct DomEvent {
    name: String,
    target: Target,
    current_target: Cell<Target>,
    delegate_target: Cell<Option<NodeId>>,
    detail: Option<CustomDetail>,
    stopped: Cell<bool>,
}

impl DomEvent {
    pub fn new(name: impl Into<String>, target: Target) -> Self {
        Self {
            name: name.into(),
            target,
            current_target: Cell::new(target),
            delegate_target: Cell::new(None),
            detail: None,
            stopped: Cell::new(false),
        }
    }

    pub fn custom(name: impl Into<String>, target: Target, detail: CustomDetail) -> Self {
        Self {
            detail: Some(detail),
            ..Self::new(name, target)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the event originated
    pub fn target(&self) -> Target {
        self.target
    }

    /// Where the listener currently running is attached
    pub fn current_target(&self) -> Target {
        self.current_target.get()
    }

    /// Descendant that matched a delegated selector, if any
    pub fn delegate_target(&self) -> Option<NodeId> {
        self.delegate_target.get()
    }

    pub fn detail(&self) -> Option<&CustomDetail> {
        self.detail.as_ref()
    }

    pub fn stop_propagation(&self) {
        self.stopped.set(true);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.stopped.get()
    }

    /// Used by hosts while walking the propagation path
    pub fn set_current_target(&self, target: Target) {
        self.current_target.set(target);
    }

    pub(crate) fn set_delegate_target(&self, node: Option<NodeId>) {
        self.delegate_target.set(node);
    }
}

/// Native-side listener. Identity (`Rc::ptr_eq`) is what `remove_listener` matches on.
pub type DomListener = Rc<dyn Fn(&DomEvent)>;

/// Wrap a closure as a [`DomListener`]
pub fn dom_listener(f: impl Fn(&DomEvent) + 'static) -> DomListener {
    Rc::new(f)
}

/// Host page operations the plugin core depends on
///
/// All methods take `&self`: listeners running inside `dispatch` are free
/// to call back into the host (reveal nodes, attach listeners, dispatch
/// further events).
pub trait Dom {
    /// Element lookup by id (without the leading `#`)
    fn by_id(&self, id: &str) -> Option<NodeId>;

    /// First element matching `selector` in document order
    fn query(&self, selector: &str) -> Option<NodeId>;

    /// Whether `node` refers to a live element of this host
    fn is_element(&self, node: NodeId) -> bool;

    /// Whether `node` is currently a descendant of the document
    fn contains(&self, node: NodeId) -> bool;

    fn matches(&self, node: NodeId, selector: &str) -> bool;

    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Owning body element; mount target
    fn body(&self) -> NodeId;

    fn create_element(&self, tag: &str) -> NodeId;

    fn set_attribute(&self, node: NodeId, name: &str, value: &str);

    fn add_class(&self, node: NodeId, class: &str);

    fn set_text(&self, node: NodeId, text: &str);

    /// Appends `child`, detaching it from any previous parent first
    fn append_child(&self, parent: NodeId, child: NodeId);

    /// Detaches `node` from its parent; no-op when already detached
    fn remove(&self, node: NodeId);

    fn reveal(&self, node: NodeId);

    fn conceal(&self, node: NodeId);

    fn is_hidden(&self, node: NodeId) -> bool;

    fn add_listener(&self, target: Target, event: &str, listener: DomListener);

    /// Removes the first registration identical to `listener`
    fn remove_listener(&self, target: Target, event: &str, listener: &DomListener) -> bool;

    /// Runs listeners along the bubbling path of `event.target()`
    fn dispatch(&self, event: DomEvent);

    /// Whether the host can construct custom events
    fn supports_custom_events(&self) -> bool;

    /// Evaluates a media query; `None` when the host has no evaluator
    fn match_media(&self, query: &str) -> Option<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_event_carries_detail() {
        let detail = CustomDetail {
            context: ComponentRef {
                name: "Blackout".to_string(),
                uid: 3,
                selector: "overlay".to_string(),
            },
            arguments: vec![Value::Bool(true)],
        };
        let event = DomEvent::custom("shown.toolkit.blackout", Target::Window, detail.clone());

        assert_eq!(event.detail(), Some(&detail));
        assert_eq!(event.current_target(), Target::Window);
        assert!(!event.is_propagation_stopped());
    }

    #[test]
    fn test_stop_propagation_sticks() {
        let event = DomEvent::new("click", Target::Document);
        event.stop_propagation();
        assert!(event.is_propagation_stopped());
    }

    #[test]
    fn test_target_display() {
        assert_eq!(Target::Window.to_string(), "window");
        assert_eq!(Target::Node(NodeId(4)).to_string(), "node#4");
        assert_eq!(Target::Node(NodeId(4)).node(), Some(NodeId(4)));
        assert_eq!(Target::Document.node(), None);
    }
}
