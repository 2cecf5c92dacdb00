//! Delegated event listeners
//!
//! A delegated listener sits on an ancestor (or the document/window) and
//! only forwards events whose origin, or one of its ancestors up to the
//! listening context, matches a selector.

use super::{dom_listener, Dom, DomListener};
use std::rc::{Rc, Weak};

/// Build a listener that routes matching descendant events to `handler`
///
/// The returned listener is a fresh `Rc`; callers must keep it to detach
/// the registration later. The host is held weakly so registrations stored
/// inside the host do not keep it alive.
pub fn delegate(dom: &Rc<dyn Dom>, selector: &str, handler: DomListener) -> DomListener {
    let dom: Weak<dyn Dom> = Rc::downgrade(dom);
    let selector = selector.to_string();

    dom_listener(move |event| {
        let Some(dom) = dom.upgrade() else {
            return;
        };
        let Some(origin) = event.target().node() else {
            return;
        };
        let boundary = event.current_target().node();

        let mut cursor = Some(origin);
        while let Some(node) = cursor {
            if dom.matches(node, &selector) {
                event.set_delegate_target(Some(node));
                handler(event);
                event.set_delegate_target(None);
                return;
            }
            if Some(node) == boundary {
                return;
            }
            cursor = dom.parent(node);
        }
    })
}
