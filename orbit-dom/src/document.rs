//! The presentation tree the patcher writes to.
//!
//! [`Document`] is the narrow interface the engine needs from a host tree. The
//! [`MemoryDocument`] arena implements it for tests, the CLI and server-side rendering.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use orbit_core::Value;
use orbit_core::value::display;

use crate::TEXT_TYPE;
use crate::events::Listener;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

pub type SharedDocument = Rc<RefCell<dyn Document>>;

pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

pub trait Document {
    fn root(&self) -> NodeId;
    fn create_element(&mut self, tag: &str, svg: bool) -> NodeId;
    fn create_text(&mut self, text: &str) -> NodeId;

    /// Lower-cased tag name, `#text` or `#document`.
    fn node_name(&self, node: NodeId) -> String;
    fn text(&self, node: NodeId) -> Option<String>;
    fn set_text(&mut self, node: NodeId, text: &str);

    fn attributes(&self, node: NodeId) -> Vec<(String, String)>;
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
    fn set_attribute_ns(&mut self, node: NodeId, ns: &str, name: &str, value: &str);
    fn remove_attribute(&mut self, node: NodeId, name: &str);

    fn property(&self, node: NodeId, name: &str) -> Option<Value>;
    fn set_property(&mut self, node: NodeId, name: &str, value: Value);
    fn style(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_style(&mut self, node: NodeId, name: &str, value: &str);

    fn append_child(&mut self, parent: NodeId, child: NodeId);
    fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId);
    /// Insert `new` before `reference`; appends when `reference` is not a child of `parent`.
    fn insert_before(&mut self, parent: NodeId, new: NodeId, reference: NodeId);
    fn remove_child(&mut self, parent: NodeId, child: NodeId);
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    fn add_event_listener(&mut self, node: NodeId, event: &str, listener: Listener);
    fn remove_event_listeners(&mut self, node: NodeId, event: &str);
    fn listeners(&self, node: NodeId, event: &str) -> Vec<Listener>;

    /// Find the first node in tree order matching `#id` or a tag name.
    fn query(&self, selector: &str) -> Option<NodeId>;
}

#[derive(Debug, Clone)]
enum Kind {
    Document,
    Element { tag: String, svg: bool },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: Kind,
    attrs: IndexMap<String, String>,
    props: IndexMap<String, Value>,
    style: IndexMap<String, String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    listeners: IndexMap<String, Vec<Listener>>,
}

impl NodeData {
    fn new(kind: Kind) -> Self {
        Self {
            kind,
            attrs: IndexMap::new(),
            props: IndexMap::new(),
            style: IndexMap::new(),
            children: Vec::new(),
            parent: None,
            listeners: IndexMap::new(),
        }
    }
}

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen", "link",
    "meta", "param", "source", "track", "wbr",
];

/// Arena-backed document. Nodes are never freed; detached nodes simply lose their parent.
/// Every effective write bumps [`MemoryDocument::mutations`].
pub struct MemoryDocument {
    nodes: Vec<NodeData>,
    mutations: usize,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData::new(Kind::Document)],
            mutations: 0,
        }
    }

    pub fn shared() -> Rc<RefCell<MemoryDocument>> {
        Rc::new(RefCell::new(Self::new()))
    }

    pub fn mutations(&self) -> usize {
        self.mutations
    }

    fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.0)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeData> {
        self.nodes.get_mut(id.0)
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(data);
        NodeId(self.nodes.len() - 1)
    }

    fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.node(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(p) = self.node_mut(parent) {
            p.children.retain(|c| *c != child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = None;
        }
    }

    /// Text content of `node` and all its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(data) = self.node(node) else { return };
        match &data.kind {
            Kind::Text(t) => out.push_str(t),
            _ => {
                for child in &data.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Serialize `node` with its subtree. An `innerHTML` property replaces the children.
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_html(node, &mut out);
        out
    }

    /// Serialize the children of `node`.
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(data) = self.node(node) {
            for child in &data.children {
                self.write_html(*child, &mut out);
            }
        }
        out
    }

    fn write_html(&self, node: NodeId, out: &mut String) {
        let Some(data) = self.node(node) else { return };
        let tag = match &data.kind {
            Kind::Text(t) => {
                out.push_str(&escape(t, false));
                return;
            }
            Kind::Document => {
                for child in &data.children {
                    self.write_html(*child, out);
                }
                return;
            }
            Kind::Element { tag, .. } => tag,
        };

        out.push('<');
        out.push_str(tag);
        for (name, value) in &data.attrs {
            out.push(' ');
            out.push_str(name);
            if !value.is_empty() {
                out.push_str("=\"");
                out.push_str(&escape(value, true));
                out.push('"');
            }
        }
        if !data.style.is_empty() {
            let style = data
                .style
                .iter()
                .filter(|(_, v)| !v.is_empty())
                .map(|(k, v)| format!("{k}: {v};"))
                .collect::<Vec<_>>()
                .join(" ");
            if !style.is_empty() {
                out.push_str(&format!(" style=\"{}\"", escape(&style, true)));
            }
        }
        out.push('>');
        if VOID_TAGS.contains(&tag.to_ascii_lowercase().as_str()) {
            return;
        }
        match data.props.get("innerHTML") {
            Some(html) => out.push_str(&display(html)),
            None => {
                for child in &data.children {
                    self.write_html(*child, out);
                }
            }
        }
        out.push_str("</");
        out.push_str(tag);
        out.push('>');
    }

    fn matches(&self, node: NodeId, selector: &str) -> bool {
        let Some(data) = self.node(node) else {
            return false;
        };
        let Kind::Element { tag, .. } = &data.kind else {
            return false;
        };
        match selector.strip_prefix('#') {
            Some(id) => data.attrs.get("id").is_some_and(|v| v == id),
            None => tag.eq_ignore_ascii_case(selector),
        }
    }

    fn find(&self, node: NodeId, selector: &str) -> Option<NodeId> {
        if self.matches(node, selector) {
            return Some(node);
        }
        let children = self.node(node).map(|n| n.children.clone()).unwrap_or_default();
        children.into_iter().find_map(|c| self.find(c, selector))
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDocument")
            .field("nodes", &self.nodes.len())
            .field("mutations", &self.mutations)
            .field("html", &self.outer_html(NodeId(0)))
            .finish()
    }
}

fn escape(s: &str, attr: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attr => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

impl Document for MemoryDocument {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn create_element(&mut self, tag: &str, svg: bool) -> NodeId {
        self.push(NodeData::new(Kind::Element {
            tag: tag.to_string(),
            svg,
        }))
    }

    fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeData::new(Kind::Text(text.to_string())))
    }

    fn node_name(&self, node: NodeId) -> String {
        match self.node(node).map(|n| &n.kind) {
            Some(Kind::Document) => "#document".to_string(),
            Some(Kind::Element { tag, .. }) => tag.to_ascii_lowercase(),
            Some(Kind::Text(_)) => TEXT_TYPE.to_string(),
            None => String::new(),
        }
    }

    fn text(&self, node: NodeId) -> Option<String> {
        match &self.node(node)?.kind {
            Kind::Text(t) => Some(t.clone()),
            _ => None,
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        match self.node_mut(node).map(|n| &mut n.kind) {
            None => return,
            Some(Kind::Text(t)) => *t = text.to_string(),
            // Same as assigning textContent on an element.
            Some(_) => {
                let t = self.create_text(text);
                for c in self.children(node) {
                    self.detach(c);
                }
                self.append_child(node, t);
            }
        }
        self.mutations += 1;
    }

    fn attributes(&self, node: NodeId) -> Vec<(String, String)> {
        self.node(node)
            .map(|n| n.attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.node(node)?.attrs.get(name).cloned()
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(data) = self.node_mut(node) {
            data.attrs.insert(name.to_string(), value.to_string());
            self.mutations += 1;
        }
    }

    fn set_attribute_ns(&mut self, node: NodeId, ns: &str, name: &str, value: &str) {
        let qualified = if ns == XLINK_NS {
            format!("xlink:{name}")
        } else {
            name.to_string()
        };
        self.set_attribute(node, &qualified, value);
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) {
        if let Some(data) = self.node_mut(node) {
            if data.attrs.shift_remove(name).is_some() {
                self.mutations += 1;
            }
        }
    }

    fn property(&self, node: NodeId, name: &str) -> Option<Value> {
        self.node(node)?.props.get(name).cloned()
    }

    fn set_property(&mut self, node: NodeId, name: &str, value: Value) {
        if let Some(data) = self.node_mut(node) {
            data.props.insert(name.to_string(), value);
            self.mutations += 1;
        }
    }

    fn style(&self, node: NodeId, name: &str) -> Option<String> {
        self.node(node)?.style.get(name).cloned()
    }

    fn set_style(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(data) = self.node_mut(node) {
            data.style.insert(name.to_string(), value.to_string());
            self.mutations += 1;
        }
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(parent).is_none() || self.node(child).is_none() {
            return;
        }
        self.detach(child);
        if let Some(p) = self.node_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.node_mut(child) {
            c.parent = Some(parent);
        }
        self.mutations += 1;
    }

    fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) {
        if self.node(new).is_none() {
            return;
        }
        let Some(pos) = self
            .node(parent)
            .and_then(|p| p.children.iter().position(|c| *c == old))
        else {
            return;
        };
        self.detach(new);
        // Detaching `new` may have shifted `old` when both share the parent.
        let pos = self
            .node(parent)
            .and_then(|p| p.children.iter().position(|c| *c == old))
            .unwrap_or(pos);
        if let Some(p) = self.node_mut(parent) {
            p.children[pos] = new;
        }
        if let Some(o) = self.node_mut(old) {
            o.parent = None;
        }
        if let Some(n) = self.node_mut(new) {
            n.parent = Some(parent);
        }
        self.mutations += 1;
    }

    fn insert_before(&mut self, parent: NodeId, new: NodeId, reference: NodeId) {
        if self.node(parent).is_none() || self.node(new).is_none() {
            return;
        }
        self.detach(new);
        let Some(p) = self.node_mut(parent) else { return };
        match p.children.iter().position(|c| *c == reference) {
            Some(pos) => p.children.insert(pos, new),
            None => p.children.push(new),
        }
        if let Some(n) = self.node_mut(new) {
            n.parent = Some(parent);
        }
        self.mutations += 1;
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        if self.node(child).and_then(|c| c.parent) == Some(parent) {
            self.detach(child);
            self.mutations += 1;
        }
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    fn add_event_listener(&mut self, node: NodeId, event: &str, listener: Listener) {
        if let Some(data) = self.node_mut(node) {
            data.listeners.entry(event.to_string()).or_default().push(listener);
        }
    }

    fn remove_event_listeners(&mut self, node: NodeId, event: &str) {
        if let Some(data) = self.node_mut(node) {
            data.listeners.shift_remove(event);
        }
    }

    fn listeners(&self, node: NodeId, event: &str) -> Vec<Listener> {
        self.node(node)
            .and_then(|n| n.listeners.get(event).cloned())
            .unwrap_or_default()
    }

    fn query(&self, selector: &str) -> Option<NodeId> {
        self.find(self.root(), selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_serializes() {
        let mut doc = MemoryDocument::new();
        let div = doc.create_element("div", false);
        doc.set_attribute(div, "id", "app");
        let br = doc.create_element("br", false);
        let t = doc.create_text("a < b");
        doc.append_child(doc.root(), div);
        doc.append_child(div, t);
        doc.append_child(div, br);
        assert_eq!(doc.outer_html(div), "<div id=\"app\">a &lt; b<br></div>");
        assert_eq!(doc.query("#app"), Some(div));
        assert_eq!(doc.query("br"), Some(br));
    }

    #[test]
    fn replace_keeps_position() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let a = doc.create_text("a");
        let b = doc.create_text("b");
        let c = doc.create_text("c");
        doc.append_child(root, a);
        doc.append_child(root, b);
        doc.replace_child(root, c, a);
        assert_eq!(doc.children(root), vec![c, b]);
        assert_eq!(doc.parent(a), None);
    }

    #[test]
    fn insert_before_places_ahead_of_reference() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let a = doc.create_text("a");
        let b = doc.create_text("b");
        let c = doc.create_text("c");
        doc.append_child(root, a);
        doc.append_child(root, b);
        doc.insert_before(root, c, b);
        assert_eq!(doc.children(root), vec![a, c, b]);
        assert_eq!(doc.parent(c), Some(root));
    }

    #[test]
    fn set_text_on_element_replaces_children() {
        let mut doc = MemoryDocument::new();
        let p = doc.create_element("p", false);
        let span = doc.create_element("span", false);
        doc.append_child(p, span);
        doc.set_text(p, "plain");
        assert_eq!(doc.inner_html(p), "plain");
    }

    #[test]
    fn inner_html_property_is_emitted_raw() {
        let mut doc = MemoryDocument::new();
        let div = doc.create_element("div", false);
        doc.set_property(div, "innerHTML", Value::from("<b>x</b>"));
        assert_eq!(doc.outer_html(div), "<div><b>x</b></div>");
    }
}
