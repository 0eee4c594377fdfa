//! The seam between the patcher and stateful component instances.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use orbit_core::Value;

use crate::document::{Document, NodeId};
use crate::error::PatchError;
use crate::{AttrValue, ComponentNode, VNode};

/// Slot content by slot name. Unnamed children land in `"default"`.
pub type Slots = IndexMap<String, Vec<VNode>>;

/// Creates and mounts instances for component VNodes on first encounter.
pub trait ComponentFactory {
    /// Mount a new instance for `node`. With `target` the instance adopts that live node
    /// (hydration); otherwise it materializes a fresh subtree the caller will insert.
    fn create(
        &self,
        node: &ComponentNode,
        doc: &mut dyn Document,
        target: Option<NodeId>,
    ) -> Result<Rc<dyn MountedComponent>, PatchError>;
}

/// A live component instance as the patcher sees it.
pub trait MountedComponent {
    fn el(&self) -> Option<NodeId>;
    /// Current value of a declared prop.
    fn prop(&self, name: &str) -> Value;
    /// Push new prop values and slots, then re-render synchronously into `doc`.
    fn update(
        &self,
        doc: &mut dyn Document,
        props: &IndexMap<String, Value>,
        slots: Option<Slots>,
    ) -> Result<(), PatchError>;
    fn destroy(&self);
}

#[derive(Clone)]
pub struct ComponentRef {
    pub name: String,
    pub props: Vec<String>,
    pub factory: Rc<dyn ComponentFactory>,
}

impl fmt::Debug for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRef")
            .field("name", &self.name)
            .field("props", &self.props)
            .finish()
    }
}

/// Group children by their `slot` attribute, removing the attribute on the way.
pub fn get_slots(children: &[VNode]) -> Slots {
    let mut slots = Slots::new();
    slots.insert("default".to_string(), Vec::new());
    for child in children {
        let mut child = child.clone();
        let name = match &mut child {
            VNode::Element(e) => match e.props.attrs.shift_remove("slot") {
                Some(AttrValue::Text(name)) => name,
                _ => "default".to_string(),
            },
            _ => "default".to_string(),
        };
        slots.entry(name).or_default().push(child);
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Props, h, text};

    #[test]
    fn children_group_by_slot_attribute() {
        let slots = get_slots(&[
            text("plain"),
            h("h1", Props::new().set("slot", "header"), vec![]),
            h("p", (), vec![]),
        ]);
        assert_eq!(slots.keys().collect::<Vec<_>>(), vec!["default", "header"]);
        assert_eq!(slots["default"].len(), 2);
        let header = slots["header"][0].as_element().unwrap();
        assert!(!header.props.attrs.contains_key("slot"));
    }
}
