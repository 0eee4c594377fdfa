//! Construction options for root instances and registered components.

use std::rc::Rc;

use indexmap::IndexMap;
use orbit_compiler::RenderFn;
use orbit_core::{Hook, Hooks, Map, Reader, Value};

use crate::error::RuntimeError;
use crate::instance::Instance;

pub type Method = Rc<dyn Fn(&Instance, &[Value]) -> Result<Value, RuntimeError>>;
pub type ComputedGetter = Rc<dyn Fn(&Reader<'_>) -> Value>;
pub type ComputedSetter = Rc<dyn Fn(&Instance, Value) -> Result<(), RuntimeError>>;

#[derive(Clone)]
pub struct Computed {
    pub get: ComputedGetter,
    pub set: Option<ComputedSetter>,
}

/// What every instance is built from, whether root or component.
#[derive(Clone, Default)]
pub(crate) struct Blueprint {
    pub name: String,
    pub template: Option<String>,
    pub render: Option<RenderFn>,
    pub data: Map<String, Value>,
    pub computed: IndexMap<String, Computed>,
    pub methods: IndexMap<String, Method>,
    pub hooks: Hooks<Instance>,
    pub props: Vec<String>,
}

impl Blueprint {
    fn data(&mut self, data: Value) {
        match data {
            Value::Object(map) => self.data = map,
            other => tracing::warn!(%other, "instance data must be an object; ignored"),
        }
    }

    fn method<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&Instance, &[Value]) -> Result<Value, RuntimeError> + 'static,
    {
        self.methods.insert(name.into(), Rc::new(f));
    }
}

macro_rules! builder_methods {
    () => {
        pub fn template(mut self, template: impl Into<String>) -> Self {
            self.blueprint.template = Some(template.into());
            self
        }

        pub fn render(mut self, render: RenderFn) -> Self {
            self.blueprint.render = Some(render);
            self
        }

        /// Initial data; must be a JSON object.
        pub fn data(mut self, data: Value) -> Self {
            self.blueprint.data(data);
            self
        }

        pub fn props<I, S>(mut self, props: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            self.blueprint.props = props.into_iter().map(Into::into).collect();
            self
        }

        pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
        where
            F: Fn(&Instance, &[Value]) -> Result<Value, RuntimeError> + 'static,
        {
            self.blueprint.method(name, f);
            self
        }

        pub fn computed<F>(mut self, name: impl Into<String>, get: F) -> Self
        where
            F: Fn(&Reader<'_>) -> Value + 'static,
        {
            self.blueprint.computed.insert(
                name.into(),
                Computed {
                    get: Rc::new(get),
                    set: None,
                },
            );
            self
        }

        /// Computed property whose writes are routed to `set`.
        pub fn computed_with_setter<G, S>(mut self, name: impl Into<String>, get: G, set: S) -> Self
        where
            G: Fn(&Reader<'_>) -> Value + 'static,
            S: Fn(&Instance, Value) -> Result<(), RuntimeError> + 'static,
        {
            self.blueprint.computed.insert(
                name.into(),
                Computed {
                    get: Rc::new(get),
                    set: Some(Rc::new(set)),
                },
            );
            self
        }

        pub fn hook(mut self, hook: Hook, f: impl Fn(&Instance) + 'static) -> Self {
            self.blueprint.hooks.on(hook, f);
            self
        }
    };
}

/// Options for a root instance.
#[derive(Clone, Default)]
pub struct Options {
    pub(crate) el: Option<String>,
    pub(crate) blueprint: Blueprint,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount anchor: `#id` or a tag name.
    pub fn el(mut self, selector: impl Into<String>) -> Self {
        self.el = Some(selector.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.blueprint.name = name.into();
        self
    }

    builder_methods!();
}

/// Options for `Runtime::component`.
#[derive(Clone, Default)]
pub struct ComponentOptions {
    pub(crate) functional: bool,
    pub(crate) blueprint: Blueprint,
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// No instance: re-rendered from data plus props on every parent render. Methods,
    /// computed properties and hooks do not apply.
    pub fn functional(mut self) -> Self {
        self.functional = true;
        self
    }

    builder_methods!();
}
