//! The render pass: walks the IR against a host instance and produces VNodes.

use std::cmp::Ordering;
use std::rc::Rc;

use indexmap::IndexMap;
use orbit_core::value::{display, loose_eq, number, to_f64, truthy};
use orbit_core::{Map, Value};
use orbit_dom::{
    AttrValue, ComponentNode, DomEvent, ElementNode, Listener, ListenerError, Meta, Props, Slots,
    TextNode, VNode, get_slots,
};

use crate::error::RenderError;
use crate::expr::{BinaryOp, Expr, UnaryOp};
use crate::ir::{
    AttrIr, ComponentEntry, ComponentIr, ElementIr, FunctionalComponent, ListenerIr, ListenerKind,
    ModelProp, Modifier, NodeIr, Part, RenderFn, Template,
};

const ENTER_KEY: u32 = 13;

/// What a render pass needs from the instance it renders for.
pub trait RenderHost {
    /// Reactive read of a data or computed key.
    fn get(&self, key: &str) -> Value;
    fn set(&self, path: &str, value: Value) -> Result<(), RenderError>;
    fn call(&self, method: &str, args: &[Value]) -> Result<Value, RenderError>;
    fn slot(&self, name: &str) -> Vec<VNode>;
    /// Wrap a compiled listener into a live one bound to this host.
    fn listener(&self, call: ListenerCall) -> Listener;
}

/// A compiled listener together with the loop locals in scope where it was rendered.
#[derive(Debug, Clone)]
pub struct ListenerCall {
    pub spec: Rc<ListenerIr>,
    pub locals: Vec<Value>,
}

impl ListenerCall {
    pub fn event(&self) -> &str {
        &self.spec.event
    }

    /// Apply modifiers, then call the method or write the model value back.
    pub fn invoke(&self, host: &dyn RenderHost, event: &mut DomEvent) -> Result<(), ListenerError> {
        for modifier in &self.spec.modifiers {
            let pass = match modifier {
                Modifier::Stop => {
                    event.stop_propagation();
                    true
                }
                Modifier::Prevent => {
                    event.prevent_default();
                    true
                }
                Modifier::Ctrl => event.ctrl,
                Modifier::Shift => event.shift,
                Modifier::Alt => event.alt,
                Modifier::Enter => event.key_code == Some(ENTER_KEY),
            };
            if !pass {
                return Ok(());
            }
        }

        let fail = |e: RenderError| ListenerError::new(self.event(), e);
        match &self.spec.kind {
            ListenerKind::Method { name, args } => {
                let mut locals = self.locals.clone();
                locals.push(event_object(event));
                let renderer = Renderer { host, locals };
                let args = args
                    .iter()
                    .map(|a| renderer.eval(a))
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(fail)?;
                host.call(name, &args).map_err(fail)?;
            }
            ListenerKind::Model { path, prop } => {
                let value = match prop {
                    ModelProp::Checked => Value::Bool(event.checked.unwrap_or(false)),
                    ModelProp::Value => event.value.clone().unwrap_or(Value::Null),
                };
                host.set(path, value).map_err(fail)?;
            }
        }
        Ok(())
    }
}

fn event_object(event: &DomEvent) -> Value {
    let mut obj = Map::new();
    obj.insert("type".into(), Value::String(event.kind.clone()));
    obj.insert("value".into(), event.value.clone().unwrap_or(Value::Null));
    obj.insert("checked".into(), event.checked.map_or(Value::Null, Value::Bool));
    obj.insert("keyCode".into(), event.key_code.map_or(Value::Null, Value::from));
    Value::Object(obj)
}

impl RenderFn {
    /// Run the render function once. A template must produce exactly one root node;
    /// a template with no root (or a `Noop`) renders an empty text node.
    pub fn render(&self, host: &dyn RenderHost) -> Result<VNode, RenderError> {
        match self {
            RenderFn::Template(template) => render_template(template, host),
            RenderFn::Native(f) => f(host),
            RenderFn::Noop => Ok(empty_text(None)),
        }
    }
}

fn render_template(template: &Template, host: &dyn RenderHost) -> Result<VNode, RenderError> {
    let Some(root) = &template.root else {
        return Ok(empty_text(None));
    };
    let mut renderer = Renderer {
        host,
        locals: Vec::new(),
    };
    let mut out = Vec::new();
    renderer.node(root, &mut out)?;
    match out.len() {
        0 => Ok(empty_text(None)),
        1 => Ok(out.remove(0)),
        n => Err(RenderError::MultipleRoots(n)),
    }
}

fn empty_text(site: Option<u32>) -> VNode {
    VNode::Text(TextNode {
        val: String::new(),
        meta: Meta {
            site,
            ..Meta::default()
        },
    })
}

struct Renderer<'h> {
    host: &'h dyn RenderHost,
    /// Loop aliases in scope, matching the slots bound at compile time.
    locals: Vec<Value>,
}

impl Renderer<'_> {
    fn node(&mut self, node: &NodeIr, out: &mut Vec<VNode>) -> Result<(), RenderError> {
        match node {
            NodeIr::Text { site, parts, dynamic } => {
                out.push(VNode::Text(TextNode {
                    val: self.parts(parts)?,
                    meta: Meta {
                        should_render: *dynamic,
                        site: Some(*site),
                        ..Meta::default()
                    },
                }));
            }
            NodeIr::Element(el) => out.push(self.element(el)?),
            NodeIr::Component(component) => self.component(component, out)?,
            NodeIr::Slot { name } => out.extend(self.host.slot(name)),
            NodeIr::Conditional { site, test, then } => {
                if truthy(&self.eval(test)?) {
                    self.node(then, out)?;
                } else {
                    out.push(empty_text(Some(*site)));
                }
            }
            NodeIr::Loop {
                aliases,
                iterable,
                body,
            } => {
                let items = match self.eval(iterable)? {
                    Value::Array(items) => items,
                    Value::Null => Vec::new(),
                    other => {
                        tracing::debug!(value = %other, "loop over a non-array renders nothing");
                        Vec::new()
                    }
                };
                for (index, item) in items.into_iter().enumerate() {
                    self.locals.push(item);
                    if *aliases > 1 {
                        self.locals.push(Value::from(index));
                    }
                    let rendered = self.node(body, out);
                    self.locals.truncate(self.locals.len() - *aliases);
                    rendered?;
                }
            }
        }
        Ok(())
    }

    fn element(&mut self, el: &ElementIr) -> Result<VNode, RenderError> {
        if let Some(cache) = &el.cache {
            if let Some(node) = cache.node.get() {
                return Ok(node.clone());
            }
            let mut node = self.build_element(el)?;
            node.meta_mut().identity = Some(cache.identity.clone());
            let _ = cache.node.set(node.clone());
            return Ok(node);
        }
        self.build_element(el)
    }

    fn build_element(&mut self, el: &ElementIr) -> Result<VNode, RenderError> {
        let mut props = Props::new();
        for (name, attr) in &el.attrs {
            props.attrs.insert(name.clone(), self.attr_value(attr)?);
        }
        for (name, expr) in &el.dom {
            props.dom.insert(name.clone(), self.eval(expr)?);
        }
        for (name, expr) in &el.directives {
            props.directives.insert(name.clone(), self.eval(expr)?);
        }

        let mut listeners: IndexMap<String, Vec<Listener>> = IndexMap::new();
        for spec in &el.listeners {
            let call = ListenerCall {
                spec: spec.clone(),
                locals: self.locals.clone(),
            };
            listeners
                .entry(spec.event.clone())
                .or_default()
                .push(self.host.listener(call));
        }

        let mut children = Vec::new();
        for child in &el.children {
            self.node(child, &mut children)?;
        }

        Ok(VNode::Element(ElementNode {
            tag: el.tag.clone(),
            props,
            listeners,
            children,
            meta: Meta {
                should_render: el.should_render,
                site: Some(el.site),
                is_svg: el.is_svg,
                ..Meta::default()
            },
        }))
    }

    fn component(&mut self, component: &ComponentIr, out: &mut Vec<VNode>) -> Result<(), RenderError> {
        let mut props = IndexMap::new();
        for (name, attr) in &component.props {
            props.insert(name.clone(), self.prop_value(attr)?);
        }
        let mut children = Vec::new();
        for child in &component.children {
            self.node(child, &mut children)?;
        }

        match &component.entry {
            ComponentEntry::Stateful(reference) => out.push(VNode::Component(ComponentNode {
                tag: component.tag.clone(),
                props,
                children,
                component: reference.clone(),
                instance: None,
                meta: Meta {
                    site: Some(component.site),
                    ..Meta::default()
                },
            })),
            ComponentEntry::Functional(functional) => {
                let host = FunctionalHost::new(functional, &props, get_slots(&children), self.host);
                out.push(functional.render.render(&host)?);
            }
        }
        Ok(())
    }

    fn parts(&self, parts: &[Part]) -> Result<String, RenderError> {
        let mut text = String::new();
        for part in parts {
            match part {
                Part::Static(s) => text.push_str(s),
                Part::Expr(e) => text.push_str(&display(&self.eval(e)?)),
            }
        }
        Ok(text)
    }

    fn attr_value(&self, attr: &AttrIr) -> Result<AttrValue, RenderError> {
        let raw = match attr {
            AttrIr::Static(s) => return Ok(AttrValue::Text(s.clone())),
            AttrIr::Class(e) => return Ok(AttrValue::Text(class_names(&self.eval(e)?))),
            AttrIr::Expr(e) => self.eval(e)?,
            AttrIr::Interpolated(parts) => match parts.as_slice() {
                [Part::Expr(e)] => self.eval(e)?,
                _ => return Ok(AttrValue::Text(self.parts(parts)?)),
            },
        };
        Ok(match raw {
            Value::Bool(b) => AttrValue::Flag(b),
            Value::Null => AttrValue::Flag(false),
            other => AttrValue::Text(display(&other)),
        })
    }

    /// Component props keep the raw value of a lone expression.
    fn prop_value(&self, attr: &AttrIr) -> Result<Value, RenderError> {
        match attr {
            AttrIr::Static(s) => Ok(Value::String(s.clone())),
            AttrIr::Class(e) => Ok(Value::String(class_names(&self.eval(e)?))),
            AttrIr::Expr(e) => self.eval(e),
            AttrIr::Interpolated(parts) => match parts.as_slice() {
                [Part::Expr(e)] => self.eval(e),
                _ => Ok(Value::String(self.parts(parts)?)),
            },
        }
    }

    fn eval(&self, expr: &Expr) -> Result<Value, RenderError> {
        Ok(match expr {
            Expr::Literal(v) => v.clone(),
            Expr::Data(key) => self.host.get(key),
            Expr::Local(slot) => self.locals.get(*slot).cloned().unwrap_or(Value::Null),
            Expr::Member(obj, key) => member(&self.eval(obj)?, key),
            Expr::Index(obj, key) => {
                let obj = self.eval(obj)?;
                match self.eval(key)? {
                    Value::String(key) => member(&obj, &key),
                    key => index(&obj, &key),
                }
            }
            Expr::Method(name, args) => {
                let args = args.iter().map(|a| self.eval(a)).collect::<Result<Vec<_>, _>>()?;
                self.host.call(name, &args)?
            }
            Expr::Call(..) => return Err(RenderError::NotCallable),
            Expr::Array(items) => Value::Array(items.iter().map(|e| self.eval(e)).collect::<Result<Vec<_>, _>>()?),
            Expr::Object(entries) => {
                let mut obj = Map::new();
                for (key, value) in entries {
                    obj.insert(key.clone(), self.eval(value)?);
                }
                Value::Object(obj)
            }
            Expr::Unary(UnaryOp::Not, e) => Value::Bool(!truthy(&self.eval(e)?)),
            Expr::Unary(UnaryOp::Neg, e) => to_f64(&self.eval(e)?).map_or(Value::Null, |f| number(-f)),
            Expr::Binary(BinaryOp::And, a, b) => {
                let a = self.eval(a)?;
                if truthy(&a) { self.eval(b)? } else { a }
            }
            Expr::Binary(BinaryOp::Or, a, b) => {
                let a = self.eval(a)?;
                if truthy(&a) { a } else { self.eval(b)? }
            }
            Expr::Binary(op, a, b) => binary(*op, &self.eval(a)?, &self.eval(b)?),
            Expr::Conditional(test, yes, no) => {
                if truthy(&self.eval(test)?) {
                    self.eval(yes)?
                } else {
                    self.eval(no)?
                }
            }
        })
    }
}

fn member(obj: &Value, key: &str) -> Value {
    match obj {
        Value::Object(map) => match map.get(key) {
            Some(v) => v.clone(),
            None if key == "length" => Value::from(map.len()),
            None => Value::Null,
        },
        Value::Array(items) if key == "length" => Value::from(items.len()),
        Value::String(s) if key == "length" => Value::from(s.chars().count()),
        Value::Array(_) | Value::String(_) => match key.parse::<f64>() {
            Ok(i) => index(obj, &number(i)),
            Err(_) => Value::Null,
        },
        _ => Value::Null,
    }
}

fn index(obj: &Value, key: &Value) -> Value {
    let Some(i) = to_f64(key).filter(|f| *f >= 0.0 && f.fract() == 0.0) else {
        return Value::Null;
    };
    let i = i as usize;
    match obj {
        Value::Array(items) => items.get(i).cloned().unwrap_or(Value::Null),
        Value::String(s) => s.chars().nth(i).map_or(Value::Null, |c| Value::String(c.to_string())),
        Value::Object(_) => member(obj, &display(key)),
        _ => Value::Null,
    }
}

fn binary(op: BinaryOp, a: &Value, b: &Value) -> Value {
    let arith = |f: fn(f64, f64) -> f64| match (to_f64(a), to_f64(b)) {
        (Some(x), Some(y)) => number(f(x, y)),
        _ => Value::Null,
    };
    match op {
        BinaryOp::Eq => Value::Bool(loose_eq(a, b)),
        BinaryOp::Ne => Value::Bool(!loose_eq(a, b)),
        BinaryOp::StrictEq => Value::Bool(strict_eq(a, b)),
        BinaryOp::StrictNe => Value::Bool(!strict_eq(a, b)),
        BinaryOp::Lt => Value::Bool(compare(a, b) == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(compare(a, b), Some(Ordering::Less | Ordering::Equal))),
        BinaryOp::Gt => Value::Bool(compare(a, b) == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(compare(a, b), Some(Ordering::Greater | Ordering::Equal))),
        BinaryOp::Add if a.is_string() || b.is_string() => Value::String(display(a) + &display(b)),
        BinaryOp::Add => arith(|x, y| x + y),
        BinaryOp::Sub => arith(|x, y| x - y),
        BinaryOp::Mul => arith(|x, y| x * y),
        BinaryOp::Div => arith(|x, y| x / y),
        BinaryOp::Rem => arith(|x, y| x % y),
        // Short-circuiting operators are evaluated by the caller.
        BinaryOp::And | BinaryOp::Or => Value::Null,
    }
}

fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => to_f64(a)?.partial_cmp(&to_f64(b)?),
    }
}

/// Class helper: strings pass through, arrays are flattened, objects contribute the
/// keys whose value is truthy.
pub fn class_names(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(class_names)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| truthy(v))
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(" "),
        Value::Null | Value::Bool(_) => String::new(),
        other => display(other),
    }
}

/// Host for a functional component: reads come from the component's data merged with
/// its props, listeners and method calls go to the instance rendering it.
pub struct FunctionalHost<'p> {
    data: Map<String, Value>,
    slots: Slots,
    parent: &'p dyn RenderHost,
}

impl<'p> FunctionalHost<'p> {
    pub fn new(
        component: &FunctionalComponent,
        props: &IndexMap<String, Value>,
        slots: Slots,
        parent: &'p dyn RenderHost,
    ) -> Self {
        let mut data = component.data.clone();
        for name in &component.props {
            data.insert(name.clone(), props.get(name).cloned().unwrap_or(Value::Null));
        }
        Self { data, slots, parent }
    }
}

impl RenderHost for FunctionalHost<'_> {
    fn get(&self, key: &str) -> Value {
        self.data.get(key).cloned().unwrap_or(Value::Null)
    }

    fn set(&self, path: &str, value: Value) -> Result<(), RenderError> {
        self.parent.set(path, value)
    }

    fn call(&self, method: &str, args: &[Value]) -> Result<Value, RenderError> {
        self.parent.call(method, args)
    }

    fn slot(&self, name: &str) -> Vec<VNode> {
        self.slots.get(name).cloned().unwrap_or_default()
    }

    fn listener(&self, call: ListenerCall) -> Listener {
        self.parent.listener(call)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn class_helper_accepts_strings_arrays_and_objects() {
        assert_eq!(class_names(&json!("a b")), "a b");
        assert_eq!(class_names(&json!(["a", {"b": true, "c": false}, null])), "a b");
        assert_eq!(class_names(&json!({"x": 1, "y": 0})), "x");
    }

    #[test]
    fn arithmetic_and_concatenation() {
        assert_eq!(binary(BinaryOp::Add, &json!(1), &json!(2)), json!(3));
        assert_eq!(binary(BinaryOp::Add, &json!("n="), &json!(2)), json!("n=2"));
        assert_eq!(binary(BinaryOp::Div, &json!(1), &json!(0)), Value::Null);
        assert_eq!(binary(BinaryOp::StrictEq, &json!(1), &json!(1.0)), json!(true));
        assert_eq!(binary(BinaryOp::StrictEq, &json!("1"), &json!(1)), json!(false));
        assert_eq!(binary(BinaryOp::Eq, &json!("1"), &json!(1)), json!(true));
        assert_eq!(binary(BinaryOp::Lt, &json!("a"), &json!("b")), json!(true));
    }

    #[test]
    fn length_is_built_in() {
        assert_eq!(member(&json!([1, 2, 3]), "length"), json!(3));
        assert_eq!(member(&json!("héllo"), "length"), json!(5));
        assert_eq!(member(&json!({"length": "own"}), "length"), json!("own"));
        assert_eq!(index(&json!(["a", "b"]), &json!(1)), json!("b"));
        assert_eq!(index(&json!("ab"), &json!(5)), Value::Null);
    }
}
