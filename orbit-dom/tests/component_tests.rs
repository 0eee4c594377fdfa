use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;
use orbit_dom::{
    ComponentFactory, ComponentNode, ComponentRef, Document, MemoryDocument, Meta, MountedComponent, NodeId, Patch,
    PatchContext, PatchError, PlainDirectives, Props, Slots, VNode, diff, h, text,
};
use serde_json::{Value, json};

#[derive(Default)]
struct Counter {
    created: Cell<usize>,
    updated: Cell<usize>,
    destroyed: Cell<usize>,
}

struct Label {
    el: NodeId,
    value: RefCell<Value>,
    counter: Rc<Counter>,
}

impl MountedComponent for Label {
    fn el(&self) -> Option<NodeId> {
        Some(self.el)
    }

    fn prop(&self, name: &str) -> Value {
        if name == "value" { self.value.borrow().clone() } else { Value::Null }
    }

    fn update(&self, doc: &mut dyn Document, props: &IndexMap<String, Value>, _slots: Option<Slots>) -> Result<(), PatchError> {
        let value = props.get("value").cloned().unwrap_or_default();
        doc.set_text(self.el, value.as_str().unwrap_or_default());
        *self.value.borrow_mut() = value;
        self.counter.updated.set(self.counter.updated.get() + 1);
        Ok(())
    }

    fn destroy(&self) {
        self.counter.destroyed.set(self.counter.destroyed.get() + 1);
    }
}

struct LabelFactory(Rc<Counter>);

impl ComponentFactory for LabelFactory {
    fn create(
        &self,
        node: &ComponentNode,
        doc: &mut dyn Document,
        target: Option<NodeId>,
    ) -> Result<Rc<dyn MountedComponent>, PatchError> {
        let value = node.props.get("value").cloned().unwrap_or_default();
        let el = target.unwrap_or_else(|| doc.create_element("label", false));
        doc.set_text(el, value.as_str().unwrap_or_default());
        self.0.created.set(self.0.created.get() + 1);
        Ok(Rc::new(Label {
            el,
            value: RefCell::new(value),
            counter: self.0.clone(),
        }))
    }
}

fn label(component: &ComponentRef, value: &str) -> VNode {
    VNode::Component(ComponentNode {
        tag: "x-label".into(),
        props: IndexMap::from([("value".to_string(), json!(value))]),
        children: vec![],
        component: component.clone(),
        instance: None,
        meta: Meta::default(),
    })
}

#[test]
fn components_mount_update_on_prop_change_and_destroy() {
    let counter = Rc::new(Counter::default());
    let component = ComponentRef {
        name: "x-label".into(),
        props: vec!["value".into()],
        factory: Rc::new(LabelFactory(counter.clone())),
    };
    let mut doc = MemoryDocument::new();
    let directives = PlainDirectives::new();
    let root = doc.root();
    let mut old = None;

    {
        let mut ctx = PatchContext::new(&mut doc, &directives);
        diff(&mut old, Some(h("div", (), vec![label(&component, "a")])), root, &mut ctx).unwrap();
    }
    assert_eq!(counter.created.get(), 1);
    let div = old.as_ref().and_then(VNode::el).unwrap();
    assert_eq!(doc.outer_html(div), "<div><label>a</label></div>");

    {
        let mut ctx = PatchContext::new(&mut doc, &directives);
        diff(&mut old, Some(h("div", (), vec![label(&component, "a")])), root, &mut ctx).unwrap();
    }
    assert_eq!(counter.updated.get(), 0);

    {
        let mut ctx = PatchContext::new(&mut doc, &directives);
        let patch = diff(&mut old, Some(h("div", (), vec![label(&component, "b")])), root, &mut ctx).unwrap();
        assert_eq!(patch, Patch::Children);
    }
    assert_eq!(counter.created.get(), 1);
    assert_eq!(counter.updated.get(), 1);
    assert_eq!(doc.outer_html(div), "<div><label>b</label></div>");

    {
        let mut ctx = PatchContext::new(&mut doc, &directives);
        diff(&mut old, Some(h("div", (), vec![text("gone")])), root, &mut ctx).unwrap();
    }
    assert_eq!(counter.destroyed.get(), 1);
    assert_eq!(doc.outer_html(div), "<div>gone</div>");
}

#[test]
fn inner_html_takeover_destroys_child_components() {
    let counter = Rc::new(Counter::default());
    let component = ComponentRef {
        name: "x-label".into(),
        props: vec!["value".into()],
        factory: Rc::new(LabelFactory(counter.clone())),
    };
    let mut doc = MemoryDocument::new();
    let directives = PlainDirectives::new();
    let root = doc.root();
    let mut old = None;

    {
        let mut ctx = PatchContext::new(&mut doc, &directives);
        diff(&mut old, Some(h("div", (), vec![label(&component, "a")])), root, &mut ctx).unwrap();
    }
    let div = old.as_ref().and_then(VNode::el).unwrap();

    {
        let mut ctx = PatchContext::new(&mut doc, &directives);
        let next = h("div", Props::new().dom("innerHTML", "<i>raw</i>"), vec![]);
        assert_eq!(diff(&mut old, Some(next), root, &mut ctx).unwrap(), Patch::Skip);
    }
    assert_eq!(counter.destroyed.get(), 1);
    assert!(doc.children(div).is_empty());
    assert!(old.as_ref().unwrap().children().is_empty());
    assert_eq!(doc.outer_html(div), "<div><i>raw</i></div>");
}
