//! Bind table compiler
//!
//! A widget declares its DOM wiring as a table of keys and handlers:
//!
//! ```text
//! "<event> <context>[ <delegate selector>]"  =>  method name | callback
//!
//! "click element"                 plain listener on the primary element
//! "resize window"                 plain listener on the window
//! "click document .js-toggle"     delegated from the document
//! "{mode} element"                event name taken from options.mode
//! "click {selector}"              context found by the construction selector
//! ```
//!
//! Compilation happens once, during `initialize`. Every key, method name
//! and context is checked then, so a broken table fails construction
//! instead of silently never firing.

use super::{Component, Plugin, Widget};
use crate::dom::{delegate, dom_listener, DomEvent, DomListener, Target, DOM_READY};
use crate::error::ToolkitError;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// A widget method callable from a DOM listener
pub type Method<W> = fn(&mut Plugin<W>, &DomEvent) -> anyhow::Result<()>;

/// Handler side of a bind table entry
pub enum Handler<W: Widget> {
    /// Name registered in [`Widget::methods`]
    Method(&'static str),
    /// A widget method passed directly
    Function(Method<W>),
    /// A ready-made native listener
    Callback(DomListener),
}

impl<W: Widget> Handler<W> {
    pub fn callback(f: impl Fn(&DomEvent) + 'static) -> Self {
        Self::Callback(dom_listener(f))
    }
}

/// Explicit name → method registration table for a widget kind
pub struct Methods<W: Widget> {
    table: Vec<(&'static str, Method<W>)>,
}

impl<W: Widget> Methods<W> {
    pub fn new() -> Self {
        Self { table: Vec::new() }
    }

    pub fn add(mut self, name: &'static str, method: Method<W>) -> Self {
        self.table.push((name, method));
        self
    }

    pub fn get(&self, name: &str) -> Option<Method<W>> {
        self.table
            .iter()
            .find(|(registered, _)| *registered == name)
            .map(|(_, method)| *method)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.table.iter().map(|(name, _)| *name).collect()
    }
}

impl<W: Widget> Default for Methods<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// A compiled bind: where to listen, for what, and with which listener
#[derive(Clone)]
pub struct Bind {
    pub event: String,
    pub context: Target,
    pub selector: Option<String>,
    pub callback: DomListener,
    // What actually gets attached: `callback` itself, or its delegating wrapper
    listener: DomListener,
}

impl Bind {
    /// The exact listener attached by `enable` and detached by `disable`
    pub fn listener(&self) -> &DomListener {
        &self.listener
    }

    pub fn is_delegated(&self) -> bool {
        self.selector.is_some()
    }
}

impl fmt::Debug for Bind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bind")
            .field("event", &self.event)
            .field("context", &self.context)
            .field("selector", &self.selector)
            .finish()
    }
}

/// Parsed form of a bind key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindKey {
    pub event: String,
    pub context: String,
    pub selector: Option<String>,
}

/// Substitute `{mode}` and `{selector}` in a bind key
pub fn expand_key(key: &str, mode: &str, selector: &str) -> String {
    key.replace("{mode}", mode).replace("{selector}", selector)
}

/// Split an expanded key into event, context and optional delegate selector
///
/// `ready` is rewritten to the platform's DOM-ready event.
pub fn parse_key(expanded: &str) -> Option<BindKey> {
    let expanded = expanded.trim();
    let (event, rest) = expanded.split_once(char::is_whitespace)?;
    let rest = rest.trim_start();
    let (context, selector) = match rest.split_once(char::is_whitespace) {
        Some((context, selector)) => (context, Some(selector.trim().to_string())),
        None => (rest, None),
    };
    if context.is_empty() {
        return None;
    }

    let event = if event == "ready" { DOM_READY } else { event };

    Some(BindKey {
        event: event.to_string(),
        context: context.to_string(),
        selector,
    })
}

/// Compile `W::binds` for a plugin that has options, selector and element set
pub(crate) fn compile<W: Widget>(plugin: &Plugin<W>) -> Result<Vec<Bind>, ToolkitError> {
    let mode = plugin
        .options()
        .get("mode")
        .map(|mode| match mode {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();
    let methods = W::methods();

    let mut binds = Vec::new();
    for (key, handler) in W::binds(plugin) {
        let expanded = expand_key(&key, &mode, plugin.selector());
        let parsed = parse_key(&expanded).ok_or_else(|| ToolkitError::MalformedBind {
            kind: W::NAME.to_string(),
            key: expanded.clone(),
        })?;

        let context = resolve_context(plugin, &parsed.context).ok_or_else(|| {
            ToolkitError::UnresolvedContext {
                kind: W::NAME.to_string(),
                key: expanded.clone(),
                context: parsed.context.clone(),
            }
        })?;

        let callback = match handler {
            Handler::Callback(callback) => callback,
            Handler::Method(name) => {
                let method = methods.get(name).ok_or_else(|| ToolkitError::UnknownMethod {
                    kind: W::NAME.to_string(),
                    key: expanded.clone(),
                    method: name.to_string(),
                })?;
                bind_method(plugin.this(), name, method)
            }
            Handler::Function(method) => bind_method(plugin.this(), "<fn>", method),
        };

        let listener = match &parsed.selector {
            Some(selector) => delegate(plugin.dom(), selector, Rc::clone(&callback)),
            None => Rc::clone(&callback),
        };

        tracing::trace!("{} bind '{}' -> {}", W::NAME, expanded, context);
        binds.push(Bind {
            event: parsed.event,
            context,
            selector: parsed.selector,
            callback,
            listener,
        });
    }

    Ok(binds)
}

/// `window`, `document`, a widget property, or a selector present in the page
///
/// Only `#id`, `.class`, `[attr]` and the construction selector are looked
/// up in the page, so a misspelled property name is reported instead of
/// matching some unrelated tag.
fn resolve_context<W: Widget>(plugin: &Plugin<W>, context: &str) -> Option<Target> {
    match context {
        "window" => Some(Target::Window),
        "document" => Some(Target::Document),
        "element" => plugin.element().map(Target::Node),
        name => W::property(plugin, name)
            .or_else(|| {
                let selector_like = name.starts_with(['#', '.', '['])
                    || (!plugin.selector().is_empty() && name == plugin.selector());
                selector_like.then(|| plugin.dom().query(name)).flatten()
            })
            .map(Target::Node),
    }
}

fn bind_method<W: Widget>(
    this: Weak<RefCell<Plugin<W>>>,
    name: &'static str,
    method: Method<W>,
) -> DomListener {
    dom_listener(move |event| {
        let Some(handle) = this.upgrade() else {
            return;
        };
        let Ok(mut plugin) = handle.try_borrow_mut() else {
            tracing::warn!(
                "{}: skipped re-entrant '{}' for {} event",
                W::NAME,
                name,
                event.name()
            );
            return;
        };
        if let Err(e) = method(&mut *plugin, event) {
            tracing::error!("{}#{} method '{}' failed: {:#}", W::NAME, plugin.uid(), name, e);
        }
    })
}
