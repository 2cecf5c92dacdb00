//! Process-wide toolkit context
//!
//! Holds the state every plugin shares: the global debug switch, one UID
//! counter per plugin kind, the debug trace buffer, widget messages, and
//! singleton slots. Created once (usually from [`Config`]) and handed to
//! each plugin at construction as an `Rc<Toolkit>`.
//!
//! Singleton slots hold `Weak` references: plugins own an `Rc<Toolkit>`, so
//! a strong slot would keep both alive forever.

use crate::config::{Config, DebugMode, Messages};
use crate::logging::TraceBuffer;
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

#[derive(Debug, Default)]
pub struct Toolkit {
    debug: Cell<DebugMode>,
    uids: RefCell<HashMap<String, u64>>,
    traces: TraceBuffer,
    messages: Messages,
    singletons: RefCell<HashMap<String, Weak<dyn Any>>>,
}

impl Toolkit {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn from_config(config: &Config) -> Rc<Self> {
        Rc::new(Self {
            debug: Cell::new(config.debug),
            messages: config.messages.clone(),
            ..Self::default()
        })
    }

    pub fn debug(&self) -> DebugMode {
        self.debug.get()
    }

    pub fn set_debug(&self, mode: DebugMode) {
        self.debug.set(mode);
    }

    /// Next UID for `kind`; starts at 1 and never repeats
    pub fn next_uid(&self, kind: &str) -> u64 {
        let mut uids = self.uids.borrow_mut();
        let counter = uids.entry(kind.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }

    /// Last UID handed out for `kind` (0 when none)
    pub fn current_uid(&self, kind: &str) -> u64 {
        self.uids.borrow().get(kind).copied().unwrap_or(0)
    }

    pub fn traces(&self) -> &TraceBuffer {
        &self.traces
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Shared instance for `kind`, created on first use
    ///
    /// The stored instance is reused while some caller still holds it and
    /// `usable` accepts it; otherwise `create` replaces it. A failed
    /// `create` leaves the slot as it was so a later call can retry.
    pub fn singleton<T, E>(
        &self,
        kind: &str,
        usable: impl Fn(&T) -> bool,
        create: impl FnOnce() -> Result<Rc<T>, E>,
    ) -> Result<Rc<T>, E>
    where
        T: Any,
    {
        let existing = self.singletons.borrow().get(kind).and_then(|slot| slot.upgrade());
        if let Some(existing) = existing {
            match existing.downcast::<T>() {
                Ok(instance) if usable(&instance) => return Ok(instance),
                Ok(_) => tracing::debug!("Singleton '{}' is no longer usable, recreating", kind),
                Err(_) => {
                    tracing::warn!("Singleton slot '{}' holds a different type, replacing", kind)
                }
            }
        }

        let instance = create()?;
        let slot: Weak<dyn Any> = Rc::downgrade(&instance) as Weak<dyn Any>;
        self.singletons.borrow_mut().insert(kind.to_string(), slot);
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn test_uids_are_per_kind_and_increasing() {
        let toolkit = Toolkit::new();
        assert_eq!(toolkit.next_uid("Blackout"), 1);
        assert_eq!(toolkit.next_uid("Blackout"), 2);
        assert_eq!(toolkit.next_uid("Tooltip"), 1);
        assert_eq!(toolkit.next_uid("Blackout"), 3);
        assert_eq!(toolkit.current_uid("Blackout"), 3);
        assert_eq!(toolkit.current_uid("Modal"), 0);
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        config.debug = DebugMode::Verbose;
        config.messages.loading = "Please wait".to_string();

        let toolkit = Toolkit::from_config(&config);

        assert_eq!(toolkit.debug(), DebugMode::Verbose);
        assert_eq!(toolkit.messages().loading, "Please wait");

        toolkit.set_debug(DebugMode::Off);
        assert_eq!(toolkit.debug(), DebugMode::Off);
    }

    #[test]
    fn test_singleton_created_once() {
        let toolkit = Toolkit::new();
        let calls = Cell::new(0);

        let make = || -> Result<Rc<String>, Infallible> {
            calls.set(calls.get() + 1);
            Ok(Rc::new("only".to_string()))
        };

        let first = toolkit.singleton("Blackout", |_| true, make).unwrap();
        let second = toolkit.singleton("Blackout", |_| true, make).unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_failed_singleton_can_retry() {
        let toolkit = Toolkit::new();

        let failed: Result<Rc<u8>, &str> = toolkit.singleton("Blackout", |_| true, || Err("boom"));
        assert!(failed.is_err());

        let ok: Result<Rc<u8>, &str> = toolkit.singleton("Blackout", |_| true, || Ok(Rc::new(7)));
        assert_eq!(*ok.unwrap(), 7);
    }

    #[test]
    fn test_singleton_released_with_last_handle() {
        let toolkit = Toolkit::new();
        let first: Rc<String> = toolkit
            .singleton("Blackout", |_| true, || Ok::<_, Infallible>(Rc::new("first".into())))
            .unwrap();
        let weak = Rc::downgrade(&first);

        drop(first);
        assert!(weak.upgrade().is_none());

        let second: Rc<String> = toolkit
            .singleton("Blackout", |_| true, || Ok::<_, Infallible>(Rc::new("second".into())))
            .unwrap();
        assert_eq!(*second, "second");
    }

    #[test]
    fn test_unusable_singleton_is_replaced() {
        let toolkit = Toolkit::new();
        let stale: Rc<Cell<bool>> = toolkit
            .singleton("Blackout", |_| true, || Ok::<_, Infallible>(Rc::new(Cell::new(true))))
            .unwrap();
        stale.set(false);

        let fresh: Rc<Cell<bool>> = toolkit
            .singleton("Blackout", Cell::get, || Ok::<_, Infallible>(Rc::new(Cell::new(true))))
            .unwrap();
        let again: Rc<Cell<bool>> = toolkit
            .singleton("Blackout", Cell::get, || Ok::<_, Infallible>(Rc::new(Cell::new(false))))
            .unwrap();

        assert!(!Rc::ptr_eq(&stale, &fresh));
        assert!(Rc::ptr_eq(&fresh, &again));
    }
}
