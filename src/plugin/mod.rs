//! Plugin core: lifecycle, options, event wiring
//!
//! Every widget is a [`Plugin`] parameterized by a [`Widget`] kind. The
//! kind supplies static data (name, version, default options) and hooks;
//! the plugin owns the instance state and runs the lifecycle.
//!
//! # Lifecycle
//!
//! ```text
//! Plugin::new ─▶ initialize ─▶ enable ─▶ startup ─▶ (live)
//!                   │
//!                   ├─ (a) next uid for the kind
//!                   ├─ (b) store selector
//!                   ├─ (c) resolve options
//!                   ├─ (d) resolve element(s)
//!                   ├─ (e) reset properties
//!                   ├─ (f) compile binds
//!                   └─ (g) emit "init"
//!
//! destroy ─▶ emit "destroying" ─▶ shutdown ─▶ disable ─▶ unmount ─▶ emit "destroyed"
//! ```
//!
//! `enabled` (DOM listeners attached) and `mounted` (element in the
//! document) are independent flags. Every toggle is idempotent.
//!
//! # Emission
//!
//! `emit` notifies two channels in order: internal listeners registered
//! with `on`, then a `<event>.toolkit.<attributeName>` custom event on the
//! primary element for page code.

use crate::config::DebugMode;
use crate::dom::{ComponentRef, CustomDetail, Dom, DomEvent, NodeId, Target};
use crate::error::ToolkitError;
use crate::logging::TraceEntry;
use crate::toolkit::Toolkit;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

mod binds;
mod events;
mod options;

pub use binds::{expand_key, parse_key, Bind, BindKey, Handler, Method, Methods};
pub use events::{listener, Listener, Listeners};
pub use options::{event_for_key, Options};

/// Kind name of the abstract base
pub const BASE_NAME: &str = "Plugin";

/// Version of the base lifecycle contract
pub const BASE_VERSION: &str = "3.0.0";

/// Options every kind inherits: `{cache: true, debug: false}`
pub fn base_defaults() -> Map<String, Value> {
    let mut defaults = Map::new();
    defaults.insert("cache".to_string(), Value::Bool(true));
    defaults.insert("debug".to_string(), Value::Bool(false));
    defaults
}

/// Default chain for a kind that extends `P`: `P`'s ancestors then `P` itself
pub fn lineage<P: Widget>() -> Vec<Map<String, Value>> {
    let mut chain = P::ancestors();
    chain.push(P::defaults());
    chain
}

// ─────────────────────────────────────────────────────────────────────────────
// Component view
// ─────────────────────────────────────────────────────────────────────────────

/// Read-only view of a plugin instance, independent of its kind
///
/// Listeners receive the emitting instance as `&dyn Component`.
pub trait Component {
    fn name(&self) -> &str;
    fn version(&self) -> &str;
    fn uid(&self) -> u64;
    fn selector(&self) -> &str;
    fn options(&self) -> &Map<String, Value>;
    fn element(&self) -> Option<NodeId>;
    fn elements(&self) -> &[NodeId];
    fn is_enabled(&self) -> bool;
    fn is_mounted(&self) -> bool;

    /// `name` with its first character lower-cased; the custom event namespace
    fn attribute_name(&self) -> String {
        let mut chars = self.name().chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Widget kinds
// ─────────────────────────────────────────────────────────────────────────────

/// A concrete widget kind
///
/// Hooks receive the whole plugin so they can use both the shared state
/// and the kind's own state (`plugin.widget()`).
pub trait Widget: Default + Sized + 'static {
    const NAME: &'static str;
    const VERSION: &'static str;

    /// Defaults declared by this kind
    fn defaults() -> Map<String, Value> {
        Map::new()
    }

    /// Defaults of the kinds this one extends, least specific first
    fn ancestors() -> Vec<Map<String, Value>> {
        vec![base_defaults()]
    }

    /// Resolve the primary element; default is a lookup by id
    ///
    /// Kinds that render their own markup override this.
    fn init_element(plugin: &mut Plugin<Self>, selector: &str) {
        let element = plugin.dom().by_id(selector);
        plugin.set_element(element);
    }

    /// Named node properties usable as bind contexts
    fn property(_plugin: &Plugin<Self>, _name: &str) -> Option<NodeId> {
        None
    }

    /// Declarative bind table, compiled once during `initialize`
    fn binds(_plugin: &Plugin<Self>) -> Vec<(String, Handler<Self>)> {
        Vec::new()
    }

    /// Methods bind tables may reference by name
    fn methods() -> Methods<Self> {
        Methods::new()
    }

    fn startup(_plugin: &mut Plugin<Self>) {}

    fn shutdown(_plugin: &mut Plugin<Self>) {}
}

// ─────────────────────────────────────────────────────────────────────────────
// Plugin instance
// ─────────────────────────────────────────────────────────────────────────────

/// Shared handle returned by [`Plugin::new`]
pub type PluginHandle<W> = Rc<RefCell<Plugin<W>>>;

pub struct Plugin<W: Widget> {
    toolkit: Rc<Toolkit>,
    dom: Rc<dyn Dom>,
    this: Weak<RefCell<Plugin<W>>>,
    name: String,
    version: String,
    uid: u64,
    selector: String,
    options: Map<String, Value>,
    element: Option<NodeId>,
    elements: Vec<NodeId>,
    binds: Vec<Bind>,
    cache: Map<String, Value>,
    listeners: Listeners,
    enabled: bool,
    mounted: bool,
    destroyed: bool,
    widget: W,
}

/// Serializable dump of an instance, used by verbose debug traces
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub name: String,
    pub version: String,
    pub uid: u64,
    pub selector: String,
    pub options: Map<String, Value>,
    pub element: Option<NodeId>,
    pub elements: Vec<NodeId>,
    pub binds: Vec<BindSummary>,
    pub listeners: BTreeMap<String, usize>,
    pub cache: Map<String, Value>,
    pub enabled: bool,
    pub mounted: bool,
    pub destroyed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BindSummary {
    pub event: String,
    pub context: String,
    pub selector: Option<String>,
}

impl<W: Widget> Plugin<W> {
    /// Construct, initialize, enable and start a plugin
    ///
    /// Fails only when the kind's bind table cannot be compiled.
    pub fn new(
        toolkit: Rc<Toolkit>,
        dom: Rc<dyn Dom>,
        selector: &str,
        options: impl Into<Options>,
    ) -> Result<PluginHandle<W>, ToolkitError> {
        let handle = Rc::new_cyclic(|this| {
            RefCell::new(Self::constructed(toolkit, dom, this.clone()))
        });

        {
            let mut plugin = handle.borrow_mut();
            plugin.initialize(selector, options.into())?;
            plugin.enable();
            W::startup(&mut *plugin);
        }

        Ok(handle)
    }

    fn constructed(toolkit: Rc<Toolkit>, dom: Rc<dyn Dom>, this: Weak<RefCell<Self>>) -> Self {
        Self {
            toolkit,
            dom,
            this,
            name: W::NAME.to_string(),
            version: W::VERSION.to_string(),
            uid: 0,
            selector: String::new(),
            options: Map::new(),
            element: None,
            elements: Vec::new(),
            binds: Vec::new(),
            cache: Map::new(),
            listeners: Listeners::new(),
            enabled: false,
            mounted: false,
            destroyed: false,
            widget: W::default(),
        }
    }

    /// Strict order: later steps read state set by earlier ones
    fn initialize(&mut self, selector: &str, options: Options) -> Result<(), ToolkitError> {
        self.uid = self.toolkit.next_uid(W::NAME);
        self.selector = selector.to_string();
        self.init_options(options);
        W::init_element(self, selector);
        self.init_properties();
        self.binds = binds::compile(self)?;
        tracing::debug!(
            "{}#{} initialized ({} bind(s))",
            W::NAME,
            self.uid,
            self.binds.len()
        );
        self.emit("init", &[]);
        Ok(())
    }

    fn init_options(&mut self, options: Options) {
        self.options = options::inherit(&lineage::<W>());
        self.set_options(options);
    }

    // Listeners are kept: `on*` options subscribed in `init_options` stay live.
    fn init_properties(&mut self) {
        self.name = W::NAME.to_string();
        self.version = W::VERSION.to_string();
        self.binds = Vec::new();
        self.cache = Map::new();
        self.enabled = false;
        self.mounted = self.element.is_some_and(|element| self.dom.contains(element));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Options
    // ─────────────────────────────────────────────────────────────────────

    /// Merge new options in, re-apply responsive blocks, subscribe `on*` handlers
    pub fn set_options(&mut self, options: impl Into<Options>) {
        let dom = Rc::clone(&self.dom);
        let subscriptions =
            options::apply(&mut self.options, options.into(), &|query: &str| {
                dom.match_media(query)
            });

        for (event, callbacks) in subscriptions {
            self.listeners.on(&event, callbacks);
        }
    }

    /// Defaults declared by this kind alone
    pub fn default_options(&self) -> Map<String, Value> {
        W::defaults()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Elements
    // ─────────────────────────────────────────────────────────────────────

    /// Set the primary element; anything that is not a live element is ignored
    pub fn set_element(&mut self, node: impl Into<Option<NodeId>>) {
        match node.into() {
            Some(node) if self.dom.is_element(node) => self.element = Some(node),
            Some(node) => {
                tracing::debug!("{}: ignoring non-element node#{}", W::NAME, node.index())
            }
            None => {}
        }
    }

    /// Set the element collection; ignored unless every entry is a live element
    pub fn set_elements(&mut self, nodes: Vec<NodeId>) {
        if nodes.iter().all(|&node| self.dom.is_element(node)) {
            self.elements = nodes;
        } else {
            tracing::debug!("{}: ignoring element collection with dead nodes", W::NAME);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Enable / disable
    // ─────────────────────────────────────────────────────────────────────

    /// Attach every bind listener (no-op when already enabled)
    pub fn enable(&mut self) {
        if self.destroyed {
            tracing::warn!("{}#{}: enable after destroy ignored", W::NAME, self.uid);
            return;
        }
        if !self.enabled {
            for bind in &self.binds {
                self.dom
                    .add_listener(bind.context, &bind.event, Rc::clone(bind.listener()));
            }
        }
        self.enabled = true;
    }

    /// Detach every bind listener (no-op when already disabled)
    pub fn disable(&mut self) {
        if self.enabled {
            for bind in &self.binds {
                self.dom
                    .remove_listener(bind.context, &bind.event, bind.listener());
            }
        }
        self.enabled = false;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mount / unmount
    // ─────────────────────────────────────────────────────────────────────

    /// Insert the primary element into the document body
    pub fn mount(&mut self) {
        if self.destroyed {
            return;
        }
        let Some(element) = self.element else {
            return;
        };
        if self.dom.contains(element) {
            self.mounted = true;
            return;
        }

        self.emit("mounting", &[]);
        self.dom.append_child(self.dom.body(), element);
        self.emit("mounted", &[]);
        self.mounted = true;
    }

    /// Remove the primary element from the document
    pub fn unmount(&mut self) {
        let Some(element) = self.element else {
            return;
        };
        if !self.dom.contains(element) {
            self.mounted = false;
            return;
        }

        self.emit("unmounting", &[]);
        self.dom.remove(element);
        self.emit("unmounted", &[]);
        self.mounted = false;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Destroy
    // ─────────────────────────────────────────────────────────────────────

    /// Tear the instance down; it must not be reused afterwards
    ///
    /// `shutdown` runs while listeners are still attached, and listeners
    /// are gone before the element leaves the document.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.emit("destroying", &[]);
        W::shutdown(self);
        self.disable();
        self.unmount();
        self.emit("destroyed", &[]);
        self.destroyed = true;
        tracing::debug!("{}#{} destroyed", W::NAME, self.uid);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Pub/sub
    // ─────────────────────────────────────────────────────────────────────

    pub fn on(&mut self, event: &str, callback: Listener) {
        self.listeners.on(event, [callback]);
    }

    pub fn on_many(&mut self, event: &str, callbacks: Vec<Listener>) {
        self.listeners.on(event, callbacks);
    }

    /// Remove `callback` from `event`, or every listener when `None`
    pub fn off(&mut self, event: &str, callback: Option<&Listener>) {
        self.listeners.off(event, callback);
    }

    /// Trace (debug mode), notify listeners, then dispatch the DOM event
    pub fn emit(&self, event: &str, args: &[Value]) {
        let debug = self.debug_mode();
        if debug.is_active() {
            let state = match debug {
                DebugMode::Verbose => serde_json::to_value(self.snapshot()).ok(),
                _ => None,
            };
            self.toolkit.traces().record(TraceEntry {
                timestamp: Utc::now(),
                name: self.name.clone(),
                uid: self.uid,
                event: event.to_string(),
                args: args.to_vec(),
                state,
            });
        }

        let this: &dyn Component = self;
        for listener in self.listeners.get(event) {
            if let Err(e) = listener(this, args) {
                tracing::error!(
                    "{}#{} listener for '{}' failed: {:#}",
                    self.name,
                    self.uid,
                    event,
                    e
                );
            }
        }

        if let Some(element) = self.element {
            if self.dom.supports_custom_events() {
                let name = format!("{}.toolkit.{}", event, self.attribute_name());
                let detail = CustomDetail {
                    context: self.component_ref(),
                    arguments: args.to_vec(),
                };
                self.dom
                    .dispatch(DomEvent::custom(name, Target::Node(element), detail));
            }
        }
    }

    /// Instance option first, then the process-wide switch
    pub fn debug_mode(&self) -> DebugMode {
        let local = self
            .options
            .get("debug")
            .map(DebugMode::from_value)
            .unwrap_or_default();
        if local.is_active() {
            local
        } else {
            self.toolkit.debug()
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Cache
    // ─────────────────────────────────────────────────────────────────────

    pub fn cache_get(&self, key: &str) -> Option<&Value> {
        self.cache.get(key)
    }

    /// Store a value unless `options.cache` is false
    pub fn cache_set(&mut self, key: &str, value: Value) {
        let enabled = self
            .options
            .get("cache")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        if enabled {
            self.cache.insert(key.to_string(), value);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn dom(&self) -> &Rc<dyn Dom> {
        &self.dom
    }

    pub fn toolkit(&self) -> &Rc<Toolkit> {
        &self.toolkit
    }

    pub(crate) fn this(&self) -> Weak<RefCell<Self>> {
        self.this.clone()
    }

    pub fn binds(&self) -> &[Bind] {
        &self.binds
    }

    pub fn listeners(&self) -> &Listeners {
        &self.listeners
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn widget(&self) -> &W {
        &self.widget
    }

    pub fn widget_mut(&mut self) -> &mut W {
        &mut self.widget
    }

    pub fn component_ref(&self) -> ComponentRef {
        ComponentRef {
            name: self.name.clone(),
            uid: self.uid,
            selector: self.selector.clone(),
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            name: self.name.clone(),
            version: self.version.clone(),
            uid: self.uid,
            selector: self.selector.clone(),
            options: self.options.clone(),
            element: self.element,
            elements: self.elements.clone(),
            binds: self
                .binds
                .iter()
                .map(|bind| BindSummary {
                    event: bind.event.clone(),
                    context: bind.context.to_string(),
                    selector: bind.selector.clone(),
                })
                .collect(),
            listeners: self.listeners.counts(),
            cache: self.cache.clone(),
            enabled: self.enabled,
            mounted: self.mounted,
            destroyed: self.destroyed,
        }
    }
}

impl<W: Widget> Component for Plugin<W> {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn uid(&self) -> u64 {
        self.uid
    }

    fn selector(&self) -> &str {
        &self.selector
    }

    fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    fn element(&self) -> Option<NodeId> {
        self.element
    }

    fn elements(&self) -> &[NodeId] {
        &self.elements
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_mounted(&self) -> bool {
        self.mounted
    }
}

impl<W: Widget> std::fmt::Debug for Plugin<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("uid", &self.uid)
            .field("selector", &self.selector)
            .field("element", &self.element)
            .field("binds", &self.binds)
            .field("listeners", &self.listeners)
            .field("enabled", &self.enabled)
            .field("mounted", &self.mounted)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}
