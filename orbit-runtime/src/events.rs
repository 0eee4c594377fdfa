//! Per-instance event emitter for custom pub/sub between components and the host.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use orbit_core::Value;

/// Receives the event name and the emitted arguments.
pub type Handler = Rc<dyn Fn(&str, &[Value])>;

/// Handlers registered under this name run for every event.
pub const ANY_EVENT: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Default)]
pub struct Emitter {
    handlers: RefCell<HashMap<String, Vec<(HandlerId, Handler)>>>,
    next_id: Cell<u64>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F: Fn(&str, &[Value]) + 'static>(&self, event: impl Into<String>, f: F) -> HandlerId {
        let id = HandlerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.handlers
            .borrow_mut()
            .entry(event.into())
            .or_default()
            .push((id, Rc::new(f)));
        id
    }

    /// Remove one handler. Returns whether it was registered.
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        let mut handlers = self.handlers.borrow_mut();
        let Some(list) = handlers.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(h, _)| *h != id);
        before != list.len()
    }

    /// Remove every handler for `event`.
    pub fn off_all(&self, event: &str) {
        self.handlers.borrow_mut().remove(event);
    }

    pub fn clear(&self) {
        self.handlers.borrow_mut().clear();
    }

    pub fn has(&self, event: &str) -> bool {
        self.handlers.borrow().get(event).is_some_and(|l| !l.is_empty())
    }

    /// Invoke the handlers for `event`, then the `*` handlers. Returns how many ran.
    pub fn emit(&self, event: &str, args: &[Value]) -> usize {
        // Snapshot so handlers can register or remove handlers while running.
        let targets: Vec<Handler> = {
            let handlers = self.handlers.borrow();
            let named = handlers.get(event).into_iter().flatten();
            let any = handlers.get(ANY_EVENT).into_iter().flatten();
            named.chain(any).map(|(_, h)| h.clone()).collect()
        };
        for handler in &targets {
            handler(event, args);
        }
        tracing::trace!(event, invoked = targets.len(), "event emitted");
        targets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_then_global_handlers() {
        let emitter = Emitter::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        emitter.on("save", move |e, args| l.borrow_mut().push(format!("named {e} {}", args.len())));
        let l = log.clone();
        emitter.on(ANY_EVENT, move |e, _| l.borrow_mut().push(format!("any {e}")));

        assert_eq!(emitter.emit("save", &[Value::Null]), 2);
        assert_eq!(emitter.emit("other", &[]), 1);
        assert_eq!(*log.borrow(), vec!["named save 1", "any save", "any other"]);
    }

    #[test]
    fn off_removes_a_single_handler() {
        let emitter = Emitter::new();
        let a = emitter.on("x", |_, _| {});
        emitter.on("x", |_, _| {});
        assert!(emitter.off("x", a));
        assert!(!emitter.off("x", a));
        assert_eq!(emitter.emit("x", &[]), 1);
        emitter.off_all("x");
        assert!(!emitter.has("x"));
    }
}
