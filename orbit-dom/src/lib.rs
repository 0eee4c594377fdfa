//! Virtual nodes and the patch engine that reconciles them against a [`Document`].

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use orbit_core::Value;

pub mod component;
pub mod diff;
pub mod directives;
pub mod document;
pub mod error;
pub mod events;

pub use component::{ComponentFactory, ComponentRef, MountedComponent, Slots, get_slots};
pub use diff::{Patch, PatchContext, destroy_components, diff, diff_props, hydrate, materialize};
pub use directives::{PlainDirective, PlainDirectives};
pub use document::{Document, MemoryDocument, NodeId, SharedDocument};
pub use error::{DirectiveError, ListenerError, PatchError};
pub use events::{DomEvent, Listener, dispatch};

pub const TEXT_TYPE: &str = "#text";

/// Marks VNodes cloned from the same cached static subtree. Two nodes carrying the same
/// identity are the same node as far as the patcher is concerned.
#[derive(Clone, Default)]
pub struct Identity(Rc<()>);

impl Identity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn same(&self, other: &Identity) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({:p})", Rc::as_ptr(&self.0))
    }
}

#[derive(Debug, Clone)]
pub struct Meta {
    /// `false` freezes the node: the patcher leaves it alone once materialized.
    pub should_render: bool,
    /// Live node this VNode is bound to, set on materialize or hydrate.
    pub el: Option<NodeId>,
    pub identity: Option<Identity>,
    /// Template site the node was rendered from.
    pub site: Option<u32>,
    pub is_svg: bool,
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            should_render: true,
            el: None,
            identity: None,
            site: None,
            is_svg: false,
        }
    }
}

impl Meta {
    pub fn frozen() -> Self {
        Self {
            should_render: false,
            ..Self::default()
        }
    }

    pub fn same_identity(&self, other: &Meta) -> bool {
        match (&self.identity, &other.identity) {
            (Some(a), Some(b)) => a.same(b),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    /// Boolean attribute: `true` renders as an empty value, `false` removes it.
    Flag(bool),
}

impl AttrValue {
    /// The string written to the live node, `None` when the attribute should be absent.
    pub fn rendered(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::Flag(true) => Some(""),
            AttrValue::Flag(false) => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Flag(b)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    pub attrs: IndexMap<String, AttrValue>,
    /// Property overrides written straight onto the live node (`innerHTML`, `value`).
    pub dom: IndexMap<String, Value>,
    /// Plain directives to run against the live node, by name.
    pub directives: IndexMap<String, Value>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, k: impl Into<String>, v: impl Into<AttrValue>) -> Self {
        self.attrs.insert(k.into(), v.into());
        self
    }

    pub fn dom(mut self, k: impl Into<String>, v: impl Into<Value>) -> Self {
        self.dom.insert(k.into(), v.into());
        self
    }

    pub fn directive(mut self, k: impl Into<String>, v: impl Into<Value>) -> Self {
        self.directives.insert(k.into(), v.into());
        self
    }

    pub fn has_inner_html(&self) -> bool {
        self.dom.contains_key("innerHTML")
    }
}

impl From<()> for Props {
    fn from(_: ()) -> Self {
        Props::default()
    }
}

impl From<Vec<(&str, &str)>> for Props {
    fn from(v: Vec<(&str, &str)>) -> Self {
        v.into_iter().fold(Props::new(), |p, (k, v)| p.set(k, v))
    }
}

#[derive(Debug, Clone)]
pub struct TextNode {
    pub val: String,
    pub meta: Meta,
}

#[derive(Debug, Clone)]
pub struct ElementNode {
    pub tag: String,
    pub props: Props,
    pub listeners: IndexMap<String, Vec<Listener>>,
    pub children: Vec<VNode>,
    pub meta: Meta,
}

impl ElementNode {
    pub fn on(mut self, event: impl Into<String>, listener: Listener) -> Self {
        self.listeners.entry(event.into()).or_default().push(listener);
        self
    }
}

/// A stateful component occurrence. The component owns the subtree below it, so its
/// children are slot content handed to the instance, never diffed here.
#[derive(Clone)]
pub struct ComponentNode {
    pub tag: String,
    pub props: IndexMap<String, Value>,
    pub children: Vec<VNode>,
    pub component: ComponentRef,
    pub instance: Option<Rc<dyn MountedComponent>>,
    pub meta: Meta,
}

impl fmt::Debug for ComponentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentNode")
            .field("tag", &self.tag)
            .field("props", &self.props)
            .field("children", &self.children)
            .field("mounted", &self.instance.is_some())
            .field("meta", &self.meta)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum VNode {
    Text(TextNode),
    Element(ElementNode),
    Component(ComponentNode),
}

impl VNode {
    /// Tag name, or [`TEXT_TYPE`] for text.
    pub fn type_name(&self) -> &str {
        match self {
            VNode::Text(_) => TEXT_TYPE,
            VNode::Element(e) => &e.tag,
            VNode::Component(c) => &c.tag,
        }
    }

    pub fn meta(&self) -> &Meta {
        match self {
            VNode::Text(t) => &t.meta,
            VNode::Element(e) => &e.meta,
            VNode::Component(c) => &c.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut Meta {
        match self {
            VNode::Text(t) => &mut t.meta,
            VNode::Element(e) => &mut e.meta,
            VNode::Component(c) => &mut c.meta,
        }
    }

    pub fn el(&self) -> Option<NodeId> {
        self.meta().el
    }

    /// The node currently standing in for this VNode. A mounted component may have
    /// swapped its root since its parent last diffed it.
    pub fn live_el(&self) -> Option<NodeId> {
        match self {
            VNode::Component(c) => c.instance.as_ref().and_then(|i| i.el()).or(c.meta.el),
            _ => self.meta().el,
        }
    }

    /// Empty text, rendered where a conditional produced nothing.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, VNode::Text(t) if t.val.is_empty())
    }

    pub fn children(&self) -> &[VNode] {
        match self {
            VNode::Text(_) => &[],
            VNode::Element(e) => &e.children,
            VNode::Component(c) => &c.children,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            VNode::Text(t) => Some(&t.val),
            _ => None,
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            VNode::Element(e) => Some(e),
            _ => None,
        }
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        *self.meta_mut() = meta;
        self
    }

    /// Visit this node and every descendant, depth first.
    pub fn walk(&self, f: &mut impl FnMut(&VNode)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }
}

pub fn h(tag: impl Into<String>, props: impl Into<Props>, children: Vec<VNode>) -> VNode {
    VNode::Element(ElementNode {
        tag: tag.into(),
        props: props.into(),
        listeners: IndexMap::new(),
        children,
        meta: Meta::default(),
    })
}

pub fn text(t: impl Into<String>) -> VNode {
    VNode::Text(TextNode {
        val: t.into(),
        meta: Meta::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_tree() {
        let node = h(
            "div",
            vec![("class", "app")],
            vec![text("hello"), h("span", (), vec![text("world")])],
        );
        let VNode::Element(el) = &node else {
            panic!("expected element");
        };
        assert_eq!(el.tag, "div");
        assert_eq!(el.props.attrs.get("class"), Some(&AttrValue::from("app")));
        assert_eq!(node.children().len(), 2);
        assert_eq!(node.children()[0].type_name(), TEXT_TYPE);
    }

    #[test]
    fn clones_share_identity() {
        let id = Identity::new();
        let a = Meta {
            identity: Some(id.clone()),
            ..Meta::default()
        };
        let b = a.clone();
        assert!(a.same_identity(&b));
        assert!(!a.same_identity(&Meta::default()));
    }
}
