use std::rc::Rc;

use indexmap::IndexMap;
use orbit_core::Value;
use orbit_dom::{DirectiveError, Document, ElementNode, NodeId, PlainDirectives};

use crate::directives::{self, SpecialDirective};
use crate::ir::ComponentEntry;

/// Directive and component tables consulted by the code generator. One registry is
/// owned per runtime; registration happens before any template using an entry is
/// compiled.
#[derive(Default)]
pub struct Registry {
    special: IndexMap<String, Rc<dyn SpecialDirective>>,
    plain: PlainDirectives,
    components: IndexMap<String, ComponentEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in special directives (`if`, `for`, `on`, `model`, `literal`, `html`,
    /// `once`, `pre`, `mask`) and plain directives (`show`).
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            plain: PlainDirectives::with_defaults(),
            ..Self::default()
        };
        directives::install_defaults(&mut registry);
        registry
    }

    pub fn register_special(&mut self, name: impl Into<String>, directive: impl SpecialDirective + 'static) {
        self.special.insert(name.into(), Rc::new(directive));
    }

    pub fn register_plain<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&mut dyn Document, NodeId, &Value, &ElementNode) -> Result<(), DirectiveError> + 'static,
    {
        self.plain.register(name, handler);
    }

    pub fn register_component(&mut self, name: impl Into<String>, entry: ComponentEntry) {
        let name = name.into();
        tracing::debug!(%name, "component registered");
        self.components.insert(name, entry);
    }

    pub fn special(&self, name: &str) -> Option<&Rc<dyn SpecialDirective>> {
        self.special.get(name)
    }

    pub fn plain(&self) -> &PlainDirectives {
        &self.plain
    }

    pub fn component(&self, name: &str) -> Option<&ComponentEntry> {
        self.components.get(name)
    }
}
