//! Plain directives: handlers run against the live node every time its props are diffed.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use orbit_core::Value;
use orbit_core::value::truthy;

use crate::ElementNode;
use crate::document::{Document, NodeId};
use crate::error::DirectiveError;

pub type PlainDirective =
    Rc<dyn Fn(&mut dyn Document, NodeId, &Value, &ElementNode) -> Result<(), DirectiveError>>;

#[derive(Clone, Default)]
pub struct PlainDirectives {
    table: IndexMap<String, PlainDirective>,
}

impl PlainDirectives {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the built-in `show` directive.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.register("show", show);
        table
    }

    pub fn register<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&mut dyn Document, NodeId, &Value, &ElementNode) -> Result<(), DirectiveError> + 'static,
    {
        self.table.insert(name.into(), Rc::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<&PlainDirective> {
        self.table.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}

impl fmt::Debug for PlainDirectives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.table.keys()).finish()
    }
}

fn show(
    doc: &mut dyn Document,
    node: NodeId,
    value: &Value,
    _vnode: &ElementNode,
) -> Result<(), DirectiveError> {
    let display = if truthy(value) { "" } else { "none" };
    if doc.style(node, "display").as_deref().unwrap_or("") != display {
        doc.set_style(node, "display", display);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;
    use crate::{VNode, h};

    #[test]
    fn show_toggles_display() {
        let mut doc = MemoryDocument::new();
        let el = doc.create_element("p", false);
        let table = PlainDirectives::with_defaults();
        let VNode::Element(vnode) = h("p", (), vec![]) else {
            unreachable!()
        };
        let show = table.get("show").cloned().unwrap();

        show(&mut doc, el, &Value::Bool(false), &vnode).unwrap();
        assert_eq!(doc.style(el, "display").as_deref(), Some("none"));
        let before = doc.mutations();
        show(&mut doc, el, &Value::Bool(false), &vnode).unwrap();
        assert_eq!(doc.mutations(), before);
        show(&mut doc, el, &Value::Bool(true), &vnode).unwrap();
        assert_eq!(doc.style(el, "display").as_deref(), Some(""));
    }
}
