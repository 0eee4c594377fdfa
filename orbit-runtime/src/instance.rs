//! Component instances: a store, a render function and the VNode baseline last patched
//! into the document.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use orbit_compiler::{Diagnostic, DiagnosticKind, ListenerCall, RenderError, RenderFn, RenderHost};
use orbit_core::{Hook, Hooks, Store, TaskError, Value};
use orbit_dom::{
    Document, Listener, MountedComponent, NodeId, PatchContext, PatchError, Slots, VNode,
    destroy_components, diff, hydrate, materialize,
};
use tracing::{debug, error, trace};

use crate::Shared;
use crate::error::{MountError, RuntimeError};
use crate::events::{Emitter, HandlerId};
use crate::markup::outer_markup;
use crate::options::{Blueprint, ComputedSetter, Method};

pub(crate) struct Inner {
    shared: Rc<Shared>,
    name: String,
    store: Store,
    setters: IndexMap<String, ComputedSetter>,
    methods: IndexMap<String, Method>,
    hooks: Hooks<Instance>,
    props: Vec<String>,
    render: RefCell<Option<RenderFn>>,
    slots: RefCell<Slots>,
    el: Cell<Option<NodeId>>,
    vdom: RefCell<Option<VNode>>,
    queued: Cell<bool>,
    destroyed: Cell<bool>,
    events: Emitter,
}

/// Handle to a live instance. Clones share state.
#[derive(Clone)]
pub struct Instance(Rc<Inner>);

impl Instance {
    pub(crate) fn new(shared: Rc<Shared>, blueprint: Blueprint) -> Self {
        let Blueprint {
            name,
            template,
            render,
            data,
            computed,
            methods,
            hooks,
            props,
        } = blueprint;

        let render = render.or_else(|| template.map(|t| shared.compile(&t)));
        let store = Store::new(data);
        let mut setters = IndexMap::new();
        for (key, c) in computed {
            let get = c.get.clone();
            store.observe(key.clone(), move |reader| get(reader));
            if let Some(set) = c.set {
                setters.insert(key, set);
            }
        }

        Instance(Rc::new(Inner {
            shared,
            name,
            store,
            setters,
            methods,
            hooks,
            props,
            render: RefCell::new(render),
            slots: RefCell::new(Slots::new()),
            el: Cell::new(None),
            vdom: RefCell::new(None),
            queued: Cell::new(false),
            destroyed: Cell::new(false),
            events: Emitter::new(),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn store(&self) -> &Store {
        &self.0.store
    }

    pub fn get(&self, key: &str) -> Value {
        self.0.store.get(key)
    }

    /// Write through a key path and queue a render pass. Writes to a computed key go to
    /// its setter.
    pub fn set(&self, path: &str, value: Value) -> Result<(), RuntimeError> {
        if let Some(setter) = self.0.setters.get(path).cloned() {
            return setter(self, value);
        }
        let base = self.0.store.set(path, value)?;
        trace!(instance = %self.0.name, key = %base, "data changed");
        self.queue_build();
        Ok(())
    }

    pub fn call_method(&self, name: &str, args: &[Value]) -> Result<Value, RuntimeError> {
        let method = self
            .0
            .methods
            .get(name)
            .cloned()
            .ok_or_else(|| RenderError::UnknownMethod(name.to_string()))?;
        method(self, args)
    }

    pub fn el(&self) -> Option<NodeId> {
        self.0.el.get()
    }

    pub fn vdom(&self) -> Ref<'_, Option<VNode>> {
        self.0.vdom.borrow()
    }

    pub fn is_mounted(&self) -> bool {
        self.0.vdom.borrow().is_some()
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.destroyed.get()
    }

    pub fn on<F: Fn(&str, &[Value]) + 'static>(&self, event: impl Into<String>, f: F) -> HandlerId {
        self.0.events.on(event, f)
    }

    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        self.0.events.off(event, id)
    }

    pub fn emit(&self, event: &str, args: &[Value]) -> usize {
        self.0.events.emit(event, args)
    }

    pub(crate) fn run_hook(&self, hook: Hook) {
        self.0.hooks.run(hook, self);
    }

    /// Bind to the node matching `selector` and render into it, adopting whatever markup
    /// is already there. Without a template or render function the anchor's own markup
    /// becomes the template.
    pub fn mount(&self, selector: &str) -> Result<(), RuntimeError> {
        let shared = &self.0.shared;
        let anchor = shared.document.borrow().query(selector);
        let Some(anchor) = anchor else {
            shared.report(Diagnostic::new(
                DiagnosticKind::Mount,
                format!("cannot find element: {selector}"),
            ));
            return Err(MountError::AnchorNotFound(selector.to_string()).into());
        };

        if self.0.render.borrow().is_none() {
            let markup = outer_markup(&*shared.document.borrow(), anchor);
            let render = shared.compile(&markup);
            *self.0.render.borrow_mut() = Some(render);
        }
        let old = self.0.vdom.borrow_mut().take();
        if let Some(old) = old {
            destroy_components(&old);
        }

        self.0.el.set(Some(anchor));
        self.build()?;
        debug!(instance = %self.0.name, selector, "mounted");
        self.run_hook(Hook::Mounted);
        Ok(())
    }

    /// Render and patch synchronously.
    pub fn build(&self) -> Result<(), RuntimeError> {
        if self.is_destroyed() {
            return Ok(());
        }
        if self.0.el.get().is_none() && self.0.vdom.borrow().is_none() {
            return Err(MountError::NotMounted.into());
        }
        let document = self.0.shared.document.clone();
        let mut doc = document.borrow_mut();
        self.patch(&mut *doc)
    }

    /// At most one render pass is pending per instance, however many writes precede it.
    fn queue_build(&self) {
        if self.0.queued.replace(true) {
            return;
        }
        let weak: Weak<Inner> = Rc::downgrade(&self.0);
        self.0.shared.scheduler.defer(Box::new(move || {
            let Some(inner) = weak.upgrade() else {
                return Ok(());
            };
            let instance = Instance(inner);
            instance.0.queued.set(false);
            if instance.is_destroyed() || !instance.is_mounted() {
                return Ok(());
            }
            if let Err(err) = instance.build() {
                error!(instance = %instance.0.name, %err, "render pass failed");
                return Err(TaskError::new(err));
            }
            instance.run_hook(Hook::Updated);
            Ok(())
        }));
    }

    fn render_fn(&self) -> RenderFn {
        self.0.render.borrow().clone().unwrap_or(RenderFn::Noop)
    }

    pub(crate) fn patch(&self, doc: &mut dyn Document) -> Result<(), RuntimeError> {
        let vnode = self.render_fn().render(self)?;
        let directives = self.0.shared.registry.borrow().plain().clone();
        let mut ctx = PatchContext::new(doc, &directives);
        let mut vdom = self.0.vdom.borrow_mut();

        let el = if vdom.is_some() {
            let parent = vdom
                .as_ref()
                .and_then(VNode::live_el)
                .and_then(|el| ctx.document.parent(el))
                .unwrap_or_else(|| ctx.document.root());
            diff(&mut *vdom, Some(vnode), parent, &mut ctx)?;
            vdom.as_ref().and_then(VNode::live_el)
        } else if let Some(anchor) = self.0.el.get() {
            let parent = ctx.document.parent(anchor).unwrap_or_else(|| ctx.document.root());
            let mut vnode = vnode;
            let el = hydrate(Some(anchor), Some(&mut vnode), parent, &mut ctx)?;
            *vdom = Some(vnode);
            el
        } else {
            let mut vnode = vnode;
            let el = materialize(&mut vnode, &mut ctx)?;
            *vdom = Some(vnode);
            Some(el)
        };

        self.0.el.set(el);
        Ok(())
    }

    pub(crate) fn set_slots(&self, slots: Slots) {
        *self.0.slots.borrow_mut() = slots;
    }

    pub(crate) fn set_el(&self, el: Option<NodeId>) {
        self.0.el.set(el);
    }

    /// Seed declared props without scheduling a render.
    pub(crate) fn assign_props(&self, props: &IndexMap<String, Value>) -> Result<(), RuntimeError> {
        for name in &self.0.props {
            let value = props.get(name).cloned().unwrap_or(Value::Null);
            self.0.store.set(name, value)?;
        }
        Ok(())
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn upgrade(weak: &Weak<Inner>) -> Option<Instance> {
        weak.upgrade().map(Instance)
    }

    /// Terminal: clears listeners and the node reference, tears down child components,
    /// and makes any pending render a no-op.
    pub fn destroy(&self) {
        if self.0.destroyed.replace(true) {
            return;
        }
        self.0.events.clear();
        let old = self.0.vdom.borrow_mut().take();
        if let Some(old) = old {
            destroy_components(&old);
        }
        self.0.el.set(None);
        debug!(instance = %self.0.name, "destroyed");
        self.run_hook(Hook::Destroyed);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.0.name)
            .field("el", &self.0.el.get())
            .field("queued", &self.0.queued.get())
            .field("destroyed", &self.0.destroyed.get())
            .finish()
    }
}

impl RenderHost for Instance {
    fn get(&self, key: &str) -> Value {
        self.0.store.get(key)
    }

    fn set(&self, path: &str, value: Value) -> Result<(), RenderError> {
        Instance::set(self, path, value).map_err(|e| e.into_render(path))
    }

    fn call(&self, method: &str, args: &[Value]) -> Result<Value, RenderError> {
        self.call_method(method, args).map_err(|e| e.into_render(method))
    }

    fn slot(&self, name: &str) -> Vec<VNode> {
        self.0.slots.borrow().get(name).cloned().unwrap_or_default()
    }

    fn listener(&self, call: ListenerCall) -> Listener {
        let weak = self.downgrade();
        Listener::new(move |event| {
            let Some(instance) = Instance::upgrade(&weak) else {
                return Ok(());
            };
            if instance.is_destroyed() {
                return Ok(());
            }
            call.invoke(&instance, event)
        })
    }
}

impl MountedComponent for Instance {
    fn el(&self) -> Option<NodeId> {
        self.0.el.get()
    }

    fn prop(&self, name: &str) -> Value {
        self.0.store.get(name)
    }

    fn update(
        &self,
        doc: &mut dyn Document,
        props: &IndexMap<String, Value>,
        slots: Option<Slots>,
    ) -> Result<(), PatchError> {
        let fail = |e: RuntimeError| PatchError::component(self.0.name.clone(), e);
        self.assign_props(props).map_err(fail)?;
        if let Some(slots) = slots {
            self.set_slots(slots);
        }
        self.patch(doc).map_err(fail)?;
        self.run_hook(Hook::Updated);
        Ok(())
    }

    fn destroy(&self) {
        Instance::destroy(self);
    }
}
