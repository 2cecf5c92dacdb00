//! Blackout: full-page overlay with a loading indicator
//!
//! Opens are counted, so nested `show`/`hide` pairs from independent
//! callers only close the overlay once the last caller is done.

use crate::dom::{Dom, DomEvent, NodeId};
use crate::error::ToolkitError;
use crate::plugin::{Component, Handler, Methods, Options, Plugin, PluginHandle, Widget};
use crate::toolkit::Toolkit;
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::rc::Rc;

const LOADER_BARS: usize = 5;

#[derive(Debug, Default)]
pub struct Blackout {
    count: u32,
    loader: Option<NodeId>,
    message: Option<NodeId>,
}

impl Blackout {
    /// Shared overlay for this toolkit context
    ///
    /// Built on first call, and again once the previous overlay has been
    /// destroyed or dropped by every holder. Options only apply to the call
    /// that builds it.
    pub fn instance(
        toolkit: &Rc<Toolkit>,
        dom: &Rc<dyn Dom>,
        options: impl Into<Options>,
    ) -> Result<PluginHandle<Self>, ToolkitError> {
        toolkit.singleton(
            Self::NAME,
            // Borrowed means some caller is in the middle of using it
            |cell: &RefCell<Plugin<Self>>| cell.try_borrow().map_or(true, |p| !p.is_destroyed()),
            || Plugin::<Self>::new(Rc::clone(toolkit), Rc::clone(dom), "", options),
        )
    }

    pub fn loader(&self) -> Option<NodeId> {
        self.loader
    }

    pub fn message(&self) -> Option<NodeId> {
        self.message
    }

    fn show_method(plugin: &mut Plugin<Self>, _: &DomEvent) -> anyhow::Result<()> {
        plugin.show();
        Ok(())
    }

    fn hide_method(plugin: &mut Plugin<Self>, _: &DomEvent) -> anyhow::Result<()> {
        plugin.hide();
        Ok(())
    }
}

impl Widget for Blackout {
    const NAME: &'static str = "Blackout";
    const VERSION: &'static str = "1.4.0";

    fn defaults() -> Map<String, Value> {
        let mut defaults = Map::new();
        defaults.insert("showLoading".to_string(), Value::Bool(true));
        defaults.insert("closeOnClick".to_string(), Value::Bool(false));
        defaults
    }

    fn init_element(plugin: &mut Plugin<Self>, selector: &str) {
        let dom = Rc::clone(plugin.dom());

        let id = match selector.trim_start_matches('#') {
            "" => format!("toolkit-blackout-{}", plugin.uid()),
            id => id.to_string(),
        };
        let element = dom.create_element("div");
        dom.set_attribute(element, "id", &id);
        dom.add_class(element, "blackout");
        dom.conceal(element);

        let loader = dom.create_element("div");
        dom.set_attribute(loader, "class", "loader bar-wave");
        for _ in 0..LOADER_BARS {
            let bar = dom.create_element("span");
            dom.append_child(loader, bar);
        }
        let message = dom.create_element("div");
        dom.add_class(message, "loader-message");
        dom.set_attribute(message, "data-loader-message", "");
        dom.append_child(loader, message);
        dom.append_child(element, loader);

        let show_loading = plugin
            .options()
            .get("showLoading")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        if show_loading {
            let text = plugin.toolkit().messages().loading.clone();
            dom.set_text(message, &text);
        }

        plugin.set_element(element);
        let widget = plugin.widget_mut();
        widget.loader = Some(loader);
        widget.message = Some(message);
    }

    fn property(plugin: &Plugin<Self>, name: &str) -> Option<NodeId> {
        match name {
            "loader" => plugin.widget().loader,
            "message" => plugin.widget().message,
            _ => None,
        }
    }

    fn binds(plugin: &Plugin<Self>) -> Vec<(String, Handler<Self>)> {
        let close_on_click = plugin
            .options()
            .get("closeOnClick")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if close_on_click {
            vec![("click element".to_string(), Handler::Method("hide"))]
        } else {
            Vec::new()
        }
    }

    fn methods() -> Methods<Self> {
        Methods::new()
            .add("show", Blackout::show_method)
            .add("hide", Blackout::hide_method)
    }

    fn shutdown(plugin: &mut Plugin<Self>) {
        plugin.widget_mut().count = 0;
    }
}

impl Plugin<Blackout> {
    /// Open the overlay (or nest another open)
    pub fn show(&mut self) {
        self.emit("showing", &[]);

        self.widget_mut().count += 1;
        let first = self.widget().count == 1;
        if first {
            self.mount();
            if let Some(element) = self.element() {
                self.dom().reveal(element);
            }
        }
        self.show_loader();

        self.emit("shown", &[json!(first)]);
    }

    /// Close one open; the overlay disappears when none remain
    pub fn hide(&mut self) {
        self.emit("hiding", &[]);

        let remaining = self.widget().count.saturating_sub(1);
        let closed = remaining == 0;
        self.widget_mut().count = remaining;
        if closed {
            if let Some(element) = self.element() {
                self.dom().conceal(element);
            }
            self.hide_loader();
        }

        self.emit("hidden", &[json!(closed)]);
    }

    pub fn show_loader(&self) {
        if let Some(loader) = self.widget().loader {
            self.dom().reveal(loader);
        }
    }

    pub fn hide_loader(&self) {
        if let Some(loader) = self.widget().loader {
            self.dom().conceal(loader);
        }
    }

    /// Opens not yet matched by a `hide`
    pub fn count(&self) -> u32 {
        self.widget().count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Messages};
    use crate::dom::{MemoryDom, Target};
    use crate::plugin::listener;

    fn setup() -> (Rc<Toolkit>, Rc<MemoryDom>, Rc<dyn Dom>) {
        let memory = MemoryDom::shared();
        let dom: Rc<dyn Dom> = memory.clone();
        (Toolkit::new(), memory, dom)
    }

    fn blackout(
        toolkit: &Rc<Toolkit>,
        dom: &Rc<dyn Dom>,
        options: impl Into<Options>,
    ) -> PluginHandle<Blackout> {
        Plugin::<Blackout>::new(Rc::clone(toolkit), Rc::clone(dom), "", options)
            .expect("blackout builds")
    }

    #[test]
    fn test_renders_hidden_detached_overlay() {
        let (toolkit, memory, dom) = setup();
        let handle = blackout(&toolkit, &dom, json!({}));
        let plugin = handle.borrow();
        let element = plugin.element().expect("element rendered");
        let loader = plugin.widget().loader().expect("loader rendered");
        let message = plugin.widget().message().expect("message rendered");

        assert!(!dom.contains(element));
        assert!(dom.is_hidden(element));
        assert!(!plugin.is_mounted());
        assert!(dom.matches(element, "div.blackout#toolkit-blackout-1"));
        assert!(dom.matches(loader, ".loader.bar-wave"));
        assert!(dom.matches(message, "[data-loader-message]"));
        assert_eq!(memory.children(loader).len(), LOADER_BARS + 1);
        assert_eq!(memory.text(message), "Loading...");
    }

    #[test]
    fn test_loading_message_follows_option_and_config() {
        let (_, memory, dom) = setup();
        let config = Config {
            messages: Messages {
                loading: "Chargement...".to_string(),
                ..Messages::default()
            },
            ..Config::default()
        };
        let toolkit = Toolkit::from_config(&config);

        let shown = blackout(&toolkit, &dom, json!({}));
        let silent = blackout(&toolkit, &dom, json!({"showLoading": false}));

        let shown_message = shown.borrow().widget().message().unwrap();
        let silent_message = silent.borrow().widget().message().unwrap();
        assert_eq!(memory.text(shown_message), "Chargement...");
        assert_eq!(memory.text(silent_message), "");
    }

    #[test]
    fn test_nested_show_hide_counts_opens() {
        let (toolkit, _, dom) = setup();
        let handle = blackout(&toolkit, &dom, json!({}));
        let log = Rc::new(RefCell::new(Vec::new()));
        for event in ["shown", "hidden"] {
            let sink = Rc::clone(&log);
            handle.borrow_mut().on(
                event,
                listener(move |_, args| {
                    sink.borrow_mut().push(format!("{}:{}", event, args[0]));
                    Ok(())
                }),
            );
        }
        let element = handle.borrow().element().unwrap();

        let mut plugin = handle.borrow_mut();
        plugin.show();
        plugin.show();
        assert_eq!(plugin.count(), 2);
        assert!(plugin.is_mounted());
        assert!(!dom.is_hidden(element));

        plugin.hide();
        assert!(!dom.is_hidden(element));
        plugin.hide();
        assert!(dom.is_hidden(element));
        assert!(dom.is_hidden(plugin.widget().loader().unwrap()));
        plugin.hide();
        assert_eq!(plugin.count(), 0);

        assert_eq!(
            *log.borrow(),
            vec!["shown:true", "shown:false", "hidden:false", "hidden:true", "hidden:true"]
        );
    }

    #[test]
    fn test_close_on_click_binds_hide() {
        let (toolkit, memory, dom) = setup();
        let passive = blackout(&toolkit, &dom, json!({}));
        assert!(passive.borrow().binds().is_empty());

        let handle = blackout(&toolkit, &dom, json!({"closeOnClick": true}));
        handle.borrow_mut().show();
        let element = handle.borrow().element().unwrap();

        memory.fire(Target::Node(element), "click");

        assert_eq!(handle.borrow().count(), 0);
        assert!(dom.is_hidden(element));
    }

    #[test]
    fn test_explicit_selector_becomes_id() {
        let (toolkit, _, dom) = setup();
        let handle = Plugin::<Blackout>::new(toolkit, Rc::clone(&dom), "#overlay", json!({}))
            .expect("blackout builds");

        let element = handle.borrow().element().unwrap();
        assert!(dom.matches(element, "#overlay"));
    }

    #[test]
    fn test_instance_is_shared_per_toolkit() {
        let (toolkit, _, dom) = setup();

        let first = Blackout::instance(&toolkit, &dom, json!({})).unwrap();
        let second = Blackout::instance(&toolkit, &dom, json!({"closeOnClick": true})).unwrap();
        let other = Blackout::instance(&Toolkit::new(), &dom, json!({})).unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert!(!Rc::ptr_eq(&first, &other));
        assert!(first.borrow().binds().is_empty());
    }

    #[test]
    fn test_destroy_resets_and_detaches() {
        let (toolkit, memory, dom) = setup();
        let handle = blackout(&toolkit, &dom, json!({"closeOnClick": true}));
        let element = handle.borrow().element().unwrap();

        let mut plugin = handle.borrow_mut();
        plugin.show();
        plugin.destroy();

        assert_eq!(plugin.count(), 0);
        assert!(!dom.contains(element));
        assert_eq!(memory.total_listeners(), 0);
    }

    #[test]
    fn test_instance_after_destroy_is_fresh() {
        let (toolkit, _, dom) = setup();
        let first = Blackout::instance(&toolkit, &dom, json!({})).unwrap();
        first.borrow_mut().destroy();

        let second = Blackout::instance(&toolkit, &dom, json!({})).unwrap();
        second.borrow_mut().show();

        assert!(!Rc::ptr_eq(&first, &second));
        let overlay = second.borrow();
        let element = overlay.element().unwrap();
        assert!(overlay.is_mounted());
        assert!(dom.contains(element));
        assert!(!dom.is_hidden(element));
        assert_eq!(overlay.uid(), 2);
    }

    #[test]
    fn test_instance_is_freed_with_its_holders() {
        let (toolkit, memory, dom) = setup();
        let handle = Blackout::instance(&toolkit, &dom, json!({"closeOnClick": true})).unwrap();
        handle.borrow_mut().show();

        let weak_toolkit = Rc::downgrade(&toolkit);
        let weak_handle = Rc::downgrade(&handle);
        let weak_dom = Rc::downgrade(&memory);
        drop((handle, toolkit, memory, dom));

        assert!(weak_handle.upgrade().is_none());
        assert!(weak_toolkit.upgrade().is_none());
        assert!(weak_dom.upgrade().is_none());
    }
}
