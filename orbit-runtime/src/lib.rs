//! Runtime: owns the document, the scheduler and the registries, and creates instances
//! whose writes re-render through one coalesced pass.

use std::cell::RefCell;
use std::rc::Rc;

use orbit_compiler::{
    ComponentEntry, Diagnostic, DiagnosticKind, FunctionalComponent, Registry, RenderFn,
    SpecialDirective, compile,
};
use orbit_core::{Hook, Scheduler, Value};
use orbit_dom::{
    ComponentRef, DirectiveError, Document, DomEvent, ElementNode, ListenerError, NodeId,
    SharedDocument,
};
use tracing::{debug, error, warn};

mod component;
pub mod config;
pub mod error;
pub mod events;
pub mod instance;
pub mod markup;
pub mod options;

pub use config::Config;
pub use error::{MountError, RuntimeError};
pub use events::{ANY_EVENT, Emitter, HandlerId};
pub use instance::Instance;
pub use markup::{load_markup, outer_markup};
pub use options::{ComponentOptions, Computed, Method, Options};

use crate::component::StatefulFactory;

/// State every instance of one runtime shares.
pub(crate) struct Shared {
    pub config: Config,
    pub document: SharedDocument,
    pub scheduler: Rc<dyn Scheduler>,
    pub registry: RefCell<Registry>,
    pub diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Shared {
    /// Collect `diagnostic`, logging it unless silenced.
    pub fn report(&self, diagnostic: Diagnostic) {
        if !self.config.silent {
            match diagnostic.kind {
                DiagnosticKind::Mount => error!(kind = ?diagnostic.kind, "{diagnostic}"),
                _ => warn!(kind = ?diagnostic.kind, "{diagnostic}"),
            }
        }
        self.diagnostics.borrow_mut().push(diagnostic);
    }

    pub fn compile(&self, template: &str) -> RenderFn {
        let compiled = compile(template, &self.registry.borrow(), &self.config.directive_prefix);
        for diagnostic in compiled.diagnostics {
            self.report(diagnostic);
        }
        compiled.render
    }
}

pub struct Runtime {
    shared: Rc<Shared>,
}

impl Runtime {
    pub fn new(config: Config, document: SharedDocument, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            shared: Rc::new(Shared {
                config,
                document,
                scheduler,
                registry: RefCell::new(Registry::with_defaults()),
                diagnostics: RefCell::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn document(&self) -> SharedDocument {
        self.shared.document.clone()
    }

    /// Everything reported so far, in order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.shared.diagnostics.borrow().clone()
    }

    /// Register a plain directive, run against the live node whenever its element is
    /// patched.
    pub fn directive<F>(&self, name: impl Into<String>, handler: F)
    where
        F: Fn(&mut dyn Document, NodeId, &Value, &ElementNode) -> Result<(), DirectiveError> + 'static,
    {
        self.shared.registry.borrow_mut().register_plain(name, handler);
    }

    /// Register a directive that rewrites code generation for the nodes carrying it.
    pub fn special_directive(&self, name: impl Into<String>, directive: impl SpecialDirective + 'static) {
        self.shared.registry.borrow_mut().register_special(name, directive);
    }

    /// Register a component. Its template is compiled now, so components it uses must
    /// already be registered, and templates using it must be compiled after this call.
    pub fn component(&self, name: impl Into<String>, options: ComponentOptions) {
        let name = name.into();
        let ComponentOptions {
            functional,
            mut blueprint,
        } = options;
        if blueprint.name.is_empty() {
            blueprint.name = name.clone();
        }
        let render = match (blueprint.render.take(), blueprint.template.take()) {
            (Some(render), _) => render,
            (None, Some(template)) => self.shared.compile(&template),
            (None, None) => {
                warn!(component = %name, "component has no template or render function");
                RenderFn::Noop
            }
        };

        let entry = if functional {
            ComponentEntry::Functional(FunctionalComponent {
                render,
                props: blueprint.props,
                data: blueprint.data,
            })
        } else {
            blueprint.render = Some(render);
            ComponentEntry::Stateful(ComponentRef {
                name: name.clone(),
                props: blueprint.props.clone(),
                factory: Rc::new(StatefulFactory {
                    shared: Rc::downgrade(&self.shared),
                    blueprint,
                }),
            })
        };
        self.shared.registry.borrow_mut().register_component(name, entry);
    }

    /// Create a root instance and mount it when `el` is set. A missing anchor is
    /// reported as a diagnostic; the instance is still returned, unmounted.
    pub fn create(&self, options: Options) -> Result<Instance, RuntimeError> {
        let Options { el, mut blueprint } = options;
        if blueprint.name.is_empty() {
            blueprint.name = "root".to_string();
        }
        let instance = Instance::new(self.shared.clone(), blueprint);
        instance.run_hook(Hook::Init);

        if let Some(selector) = el {
            match instance.mount(&selector) {
                Ok(()) => {}
                Err(RuntimeError::Mount(err)) => debug!(%err, "instance left unmounted"),
                Err(err) => return Err(err),
            }
        }
        Ok(instance)
    }

    /// Compile `template` with this runtime's registry and directive prefix.
    pub fn compile(&self, template: &str) -> RenderFn {
        self.shared.compile(template)
    }

    /// Fire `event` at `node`, bubbling to its ancestors.
    pub fn dispatch(&self, node: NodeId, event: &mut DomEvent) -> Result<usize, ListenerError> {
        orbit_dom::dispatch(&*self.shared.document, node, event)
    }

    /// Append pre-rendered markup under `parent` (the document root when `None`).
    pub fn load_markup(&self, parent: Option<NodeId>, markup: &str) {
        let diagnostics = {
            let mut doc = self.shared.document.borrow_mut();
            let parent = parent.unwrap_or_else(|| doc.root());
            load_markup(&mut *doc, parent, markup)
        };
        for diagnostic in diagnostics {
            self.shared.report(diagnostic);
        }
    }
}
