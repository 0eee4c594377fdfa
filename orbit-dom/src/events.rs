use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use orbit_core::Value;

use crate::document::{Document, NodeId};
use crate::error::ListenerError;

/// An event as seen by listeners. `value` and `checked` mirror the target's form state
/// and are filled from the target node on dispatch when not set by the caller.
#[derive(Debug, Clone, Default)]
pub struct DomEvent {
    pub kind: String,
    pub target: Option<NodeId>,
    pub value: Option<Value>,
    pub checked: Option<bool>,
    pub key_code: Option<u32>,
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    propagation_stopped: bool,
    default_prevented: bool,
}

impl DomEvent {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    pub fn with_key_code(mut self, code: u32) -> Self {
        self.key_code = Some(code);
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }
}

type ListenerFn = dyn Fn(&mut DomEvent) -> Result<(), ListenerError>;

#[derive(Clone)]
pub struct Listener(Rc<ListenerFn>);

impl Listener {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut DomEvent) -> Result<(), ListenerError> + 'static,
    {
        Self(Rc::new(f))
    }

    pub fn call(&self, event: &mut DomEvent) -> Result<(), ListenerError> {
        (self.0)(event)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Rc::as_ptr(&self.0))
    }
}

/// Dispatches `event` at `node`, bubbling through its ancestors until a listener stops
/// propagation. Returns the number of listeners invoked.
///
/// The document is only borrowed while collecting listeners, so handlers are free to
/// trigger re-renders.
pub fn dispatch<D>(document: &RefCell<D>, node: NodeId, event: &mut DomEvent) -> Result<usize, ListenerError>
where
    D: Document + ?Sized,
{
    {
        let doc = document.borrow();
        event.target = Some(node);
        if event.value.is_none() {
            event.value = doc.property(node, "value");
        }
        if event.checked.is_none() {
            event.checked = doc.property(node, "checked").and_then(|v| v.as_bool());
        }
    }

    let mut invoked = 0;
    let mut current = Some(node);
    while let Some(at) = current {
        let (listeners, parent) = {
            let doc = document.borrow();
            (doc.listeners(at, &event.kind), doc.parent(at))
        };
        for listener in listeners {
            listener.call(event)?;
            invoked += 1;
        }
        if event.is_propagation_stopped() {
            break;
        }
        current = parent;
    }
    tracing::trace!(kind = %event.kind, invoked, "event dispatched");
    Ok(invoked)
}
