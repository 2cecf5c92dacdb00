//! In-memory document host
//!
//! A small but complete [`Dom`] implementation: a `html > body` document,
//! detached elements created on demand, listener tables per target, and a
//! configurable media-query evaluator. Tests and the demo binary run
//! widgets against it.

use super::selector::{Element, SelectorList, Tree};
use super::{Dom, DomEvent, DomListener, NodeId, Target};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

const ROOT: NodeId = NodeId(0);
const BODY: NodeId = NodeId(1);

#[derive(Debug, Clone, Default)]
struct NodeData {
    tag: String,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    hidden: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Element for NodeData {
    fn tag(&self) -> &str {
        &self.tag
    }

    fn id(&self) -> Option<&str> {
        self.attrs.get("id").map(String::as_str)
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        if name == "class" {
            return None;
        }
        self.attrs.get(name).map(String::as_str)
    }
}

struct Nodes<'a>(&'a [NodeData]);

impl Tree for Nodes<'_> {
    fn element(&self, node: NodeId) -> Option<&dyn Element> {
        self.0.get(node.0).map(|n| n as &dyn Element)
    }

    fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        self.0.get(node.0).and_then(|n| n.parent)
    }
}

/// In-memory [`Dom`] host
pub struct MemoryDom {
    nodes: RefCell<Vec<NodeData>>,
    listeners: RefCell<HashMap<(Target, String), Vec<DomListener>>>,
    media: RefCell<HashSet<String>>,
    media_supported: Cell<bool>,
    custom_events: Cell<bool>,
}

impl MemoryDom {
    pub fn new() -> Self {
        let root = NodeData {
            tag: "html".to_string(),
            children: vec![BODY],
            ..NodeData::default()
        };
        let body = NodeData {
            tag: "body".to_string(),
            parent: Some(ROOT),
            ..NodeData::default()
        };

        Self {
            nodes: RefCell::new(vec![root, body]),
            listeners: RefCell::new(HashMap::new()),
            media: RefCell::new(HashSet::new()),
            media_supported: Cell::new(true),
            custom_events: Cell::new(true),
        }
    }

    /// Convenience for hosts shared between plugins
    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    /// Create `<tag id="id">` and attach it under `parent`
    pub fn insert(&self, parent: NodeId, tag: &str, id: Option<&str>) -> NodeId {
        let node = self.create_element(tag);
        if let Some(id) = id {
            self.set_attribute(node, "id", id);
        }
        self.append_child(parent, node);
        node
    }

    /// Mark a media query as currently matching (or not)
    pub fn set_media(&self, query: &str, matching: bool) {
        let mut media = self.media.borrow_mut();
        if matching {
            media.insert(query.to_string());
        } else {
            media.remove(query);
        }
    }

    /// Simulate a host without `matchMedia`
    pub fn set_media_supported(&self, supported: bool) {
        self.media_supported.set(supported);
    }

    /// Simulate a host without `CustomEvent`
    pub fn set_custom_events(&self, supported: bool) {
        self.custom_events.set(supported);
    }

    pub fn listener_count(&self, target: Target, event: &str) -> usize {
        self.listeners
            .borrow()
            .get(&(target, event.to_string()))
            .map_or(0, Vec::len)
    }

    pub fn total_listeners(&self) -> usize {
        self.listeners.borrow().values().map(Vec::len).sum()
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(node.0)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    pub fn text(&self, node: NodeId) -> String {
        self.nodes
            .borrow()
            .get(node.0)
            .map(|n| n.text.clone())
            .unwrap_or_default()
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes
            .borrow()
            .get(node.0)
            .is_some_and(|n| n.has_class(class))
    }

    /// Fire a plain native event at `target`
    pub fn fire(&self, target: Target, event: &str) {
        self.dispatch(DomEvent::new(event, target));
    }

    fn with_node(&self, node: NodeId, f: impl FnOnce(&mut NodeData)) {
        if let Some(data) = self.nodes.borrow_mut().get_mut(node.0) {
            f(data);
        }
    }

    fn detach(nodes: &mut [NodeData], node: NodeId) {
        let Some(parent) = nodes.get(node.0).and_then(|n| n.parent) else {
            return;
        };
        nodes[parent.0].children.retain(|&child| child != node);
        nodes[node.0].parent = None;
    }

    fn is_ancestor_or_self(nodes: &[NodeData], ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = nodes.get(current.0).and_then(|n| n.parent);
        }
        false
    }

    fn propagation_path(&self, target: Target) -> Vec<Target> {
        match target {
            Target::Window => vec![Target::Window],
            Target::Document => vec![Target::Document, Target::Window],
            Target::Node(node) => {
                let nodes = self.nodes.borrow();
                let mut path = Vec::new();
                let mut cursor = Some(node);
                let mut last = node;
                while let Some(current) = cursor {
                    path.push(Target::Node(current));
                    last = current;
                    cursor = nodes.get(current.0).and_then(|n| n.parent);
                }
                if last == ROOT {
                    path.push(Target::Document);
                    path.push(Target::Window);
                }
                path
            }
        }
    }

    fn descendants_in_order(nodes: &[NodeData], from: NodeId, out: &mut Vec<NodeId>) {
        for &child in &nodes[from.0].children {
            out.push(child);
            Self::descendants_in_order(nodes, child, out);
        }
    }
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom for MemoryDom {
    fn by_id(&self, id: &str) -> Option<NodeId> {
        let id = id.strip_prefix('#').unwrap_or(id);
        let nodes = self.nodes.borrow();
        let mut order = Vec::new();
        Self::descendants_in_order(&nodes, ROOT, &mut order);
        order
            .into_iter()
            .find(|node| nodes[node.0].id() == Some(id))
    }

    fn query(&self, selector: &str) -> Option<NodeId> {
        let list = SelectorList::parse(selector)?;
        let nodes = self.nodes.borrow();
        let mut order = Vec::new();
        Self::descendants_in_order(&nodes, ROOT, &mut order);
        order
            .into_iter()
            .find(|&node| list.matches(&Nodes(&nodes), node))
    }

    fn is_element(&self, node: NodeId) -> bool {
        node.0 < self.nodes.borrow().len()
    }

    fn contains(&self, node: NodeId) -> bool {
        let nodes = self.nodes.borrow();
        node.0 < nodes.len() && Self::is_ancestor_or_self(&nodes, ROOT, node)
    }

    fn matches(&self, node: NodeId, selector: &str) -> bool {
        let Some(list) = SelectorList::parse(selector) else {
            tracing::warn!("Unsupported selector '{}'", selector);
            return false;
        };
        let nodes = self.nodes.borrow();
        list.matches(&Nodes(&nodes), node)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(node.0).and_then(|n| n.parent)
    }

    fn body(&self) -> NodeId {
        BODY
    }

    fn create_element(&self, tag: &str) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(NodeData {
            tag: tag.to_ascii_lowercase(),
            ..NodeData::default()
        });
        NodeId(nodes.len() - 1)
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        if name == "class" {
            let classes = value.split_whitespace().map(str::to_string).collect();
            self.with_node(node, |n| n.classes = classes);
            return;
        }
        self.with_node(node, |n| {
            n.attrs.insert(name.to_string(), value.to_string());
        });
    }

    fn add_class(&self, node: NodeId, class: &str) {
        self.with_node(node, |n| {
            if !n.has_class(class) {
                n.classes.push(class.to_string());
            }
        });
    }

    fn set_text(&self, node: NodeId, text: &str) {
        self.with_node(node, |n| n.text = text.to_string());
    }

    fn append_child(&self, parent: NodeId, child: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if parent.0 >= nodes.len() || child.0 >= nodes.len() || child == ROOT {
            return;
        }
        // Appending an ancestor into its own subtree would create a cycle
        if Self::is_ancestor_or_self(&nodes, child, parent) {
            tracing::warn!("Refusing to append node#{} into its own subtree", child.0);
            return;
        }
        Self::detach(&mut nodes, child);
        nodes[parent.0].children.push(child);
        nodes[child.0].parent = Some(parent);
    }

    fn remove(&self, node: NodeId) {
        if node == ROOT {
            return;
        }
        Self::detach(&mut self.nodes.borrow_mut(), node);
    }

    fn reveal(&self, node: NodeId) {
        self.with_node(node, |n| n.hidden = false);
    }

    fn conceal(&self, node: NodeId) {
        self.with_node(node, |n| n.hidden = true);
    }

    fn is_hidden(&self, node: NodeId) -> bool {
        self.nodes.borrow().get(node.0).is_some_and(|n| n.hidden)
    }

    fn add_listener(&self, target: Target, event: &str, listener: DomListener) {
        tracing::trace!("addEventListener {} on {}", event, target);
        self.listeners
            .borrow_mut()
            .entry((target, event.to_string()))
            .or_default()
            .push(listener);
    }

    fn remove_listener(&self, target: Target, event: &str, listener: &DomListener) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let key = (target, event.to_string());
        let Some(list) = listeners.get_mut(&key) else {
            return false;
        };
        let Some(index) = list.iter().position(|l| Rc::ptr_eq(l, listener)) else {
            return false;
        };
        list.remove(index);
        if list.is_empty() {
            listeners.remove(&key);
        }
        tracing::trace!("removeEventListener {} on {}", event, target);
        true
    }

    fn dispatch(&self, event: DomEvent) {
        for step in self.propagation_path(event.target()) {
            // Snapshot so listeners may add/remove registrations mid-dispatch
            let listeners = self
                .listeners
                .borrow()
                .get(&(step, event.name().to_string()))
                .cloned()
                .unwrap_or_default();

            event.set_current_target(step);
            for listener in listeners {
                listener(&event);
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
    }

    fn supports_custom_events(&self) -> bool {
        self.custom_events.get()
    }

    fn match_media(&self, query: &str) -> Option<bool> {
        if !self.media_supported.get() {
            return None;
        }
        Some(self.media.borrow().contains(query))
    }
}
