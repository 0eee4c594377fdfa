//! Render IR produced by the code generator and walked by the renderer.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use orbit_core::{Map, Value};
use orbit_dom::{ComponentRef, Identity, VNode};

use crate::error::RenderError;
use crate::expr::Expr;
use crate::render::RenderHost;

static NEXT_SITE: AtomicU32 = AtomicU32::new(1);

/// Sites are unique across every template compiled in the process, so nodes handed to
/// a child component through a slot never collide with the child's own sites.
pub fn next_site() -> u32 {
    NEXT_SITE.fetch_add(1, Ordering::Relaxed)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Part {
    Static(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrIr {
    Static(String),
    Interpolated(Vec<Part>),
    Expr(Expr),
    /// Expression run through the class helper (string, array or object).
    Class(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Stop,
    Prevent,
    Ctrl,
    Shift,
    Alt,
    Enter,
}

impl Modifier {
    pub fn parse(name: &str) -> Option<Modifier> {
        Some(match name {
            "stop" => Modifier::Stop,
            "prevent" => Modifier::Prevent,
            "ctrl" => Modifier::Ctrl,
            "shift" => Modifier::Shift,
            "alt" => Modifier::Alt,
            "enter" => Modifier::Enter,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProp {
    Value,
    Checked,
}

impl ModelProp {
    pub fn name(self) -> &'static str {
        match self {
            ModelProp::Value => "value",
            ModelProp::Checked => "checked",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListenerKind {
    /// Call an instance method. Arguments are bound with the event object as the
    /// innermost local.
    Method { name: String, args: Vec<Expr> },
    /// Two-way binding: write the element's `prop` back to the data at `path`.
    Model { path: String, prop: ModelProp },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListenerIr {
    pub event: String,
    pub kind: ListenerKind,
    pub modifiers: Vec<Modifier>,
}

#[derive(Debug, Default)]
pub struct StaticCache {
    pub node: OnceCell<VNode>,
    pub identity: Identity,
}

#[derive(Debug)]
pub struct ElementIr {
    pub site: u32,
    pub tag: String,
    pub attrs: Vec<(String, AttrIr)>,
    pub dom: Vec<(String, Expr)>,
    pub directives: Vec<(String, Expr)>,
    pub listeners: Vec<Rc<ListenerIr>>,
    pub children: Vec<NodeIr>,
    /// `false` for frozen nodes (`once`, `pre`) and static subtrees.
    pub should_render: bool,
    pub is_svg: bool,
    /// Present when nothing in the subtree depends on instance state.
    pub cache: Option<StaticCache>,
}

/// Component occurrence, resolved against the registry at compile time.
#[derive(Debug)]
pub struct ComponentIr {
    pub site: u32,
    pub tag: String,
    pub props: Vec<(String, AttrIr)>,
    pub children: Vec<NodeIr>,
    pub entry: ComponentEntry,
}

#[derive(Debug)]
pub enum NodeIr {
    Text {
        site: u32,
        parts: Vec<Part>,
        dynamic: bool,
    },
    Element(ElementIr),
    Component(ComponentIr),
    Slot {
        name: String,
    },
    Conditional {
        site: u32,
        test: Expr,
        then: Box<NodeIr>,
    },
    Loop {
        /// 1 for `item in ..`, 2 for `item, index in ..`.
        aliases: usize,
        iterable: Expr,
        body: Box<NodeIr>,
    },
}

impl NodeIr {
    /// Whether rendering this node can observe instance state.
    pub fn is_dynamic(&self) -> bool {
        match self {
            NodeIr::Text { dynamic, .. } => *dynamic,
            NodeIr::Element(el) => el.cache.is_none(),
            NodeIr::Component(_) | NodeIr::Slot { .. } => true,
            NodeIr::Conditional { .. } | NodeIr::Loop { .. } => true,
        }
    }
}

#[derive(Debug, Default)]
pub struct Template {
    pub root: Option<NodeIr>,
}

pub type NativeRender = Rc<dyn Fn(&dyn RenderHost) -> Result<VNode, RenderError>>;

/// The callable a component renders with.
#[derive(Clone)]
pub enum RenderFn {
    Template(Rc<Template>),
    Native(NativeRender),
    /// Stand-in for a template that failed to compile: renders an empty text node.
    Noop,
}

impl RenderFn {
    pub fn native<F>(f: F) -> Self
    where
        F: Fn(&dyn RenderHost) -> Result<VNode, RenderError> + 'static,
    {
        RenderFn::Native(Rc::new(f))
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, RenderFn::Noop)
    }
}

impl fmt::Debug for RenderFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderFn::Template(t) => f.debug_tuple("Template").field(t).finish(),
            RenderFn::Native(_) => f.write_str("Native"),
            RenderFn::Noop => f.write_str("Noop"),
        }
    }
}

/// A component with no instance: re-rendered from `data` plus its props on every
/// parent render.
#[derive(Debug, Clone)]
pub struct FunctionalComponent {
    pub render: RenderFn,
    pub props: Vec<String>,
    pub data: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub enum ComponentEntry {
    Functional(FunctionalComponent),
    Stateful(ComponentRef),
}

impl ComponentEntry {
    pub fn props(&self) -> &[String] {
        match self {
            ComponentEntry::Functional(f) => &f.props,
            ComponentEntry::Stateful(c) => &c.props,
        }
    }
}
