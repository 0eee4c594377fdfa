use std::cell::RefCell;

use orbit_compiler::{
    ComponentEntry, DiagnosticKind, FunctionalComponent, ListenerCall, Registry, RenderError,
    RenderHost, compile,
};
use orbit_core::{Map, Value};
use orbit_dom::{AttrValue, DomEvent, Listener, VNode};
use serde_json::json;

#[derive(Default)]
struct Host {
    data: RefCell<Map<String, Value>>,
    calls: RefCell<Vec<(String, Vec<Value>)>>,
    listeners: RefCell<Vec<ListenerCall>>,
}

impl Host {
    fn with(data: Value) -> Self {
        let Value::Object(map) = data else {
            panic!("data must be an object");
        };
        Self {
            data: RefCell::new(map),
            ..Self::default()
        }
    }

    fn fire(&self, index: usize, event: &mut DomEvent) {
        let call = self.listeners.borrow()[index].clone();
        call.invoke(self, event).unwrap();
    }
}

impl RenderHost for Host {
    fn get(&self, key: &str) -> Value {
        self.data.borrow().get(key).cloned().unwrap_or(Value::Null)
    }

    fn set(&self, path: &str, value: Value) -> Result<(), RenderError> {
        self.data.borrow_mut().insert(path.to_string(), value);
        Ok(())
    }

    fn call(&self, method: &str, args: &[Value]) -> Result<Value, RenderError> {
        if method == "missing" {
            return Err(RenderError::UnknownMethod(method.into()));
        }
        self.calls.borrow_mut().push((method.to_string(), args.to_vec()));
        Ok(Value::String(format!("{method}!")))
    }

    fn slot(&self, _name: &str) -> Vec<VNode> {
        Vec::new()
    }

    fn listener(&self, call: ListenerCall) -> Listener {
        self.listeners.borrow_mut().push(call);
        Listener::new(|_| Ok(()))
    }
}

fn render(template: &str, host: &Host) -> VNode {
    let compiled = compile(template, &Registry::with_defaults(), "");
    assert!(compiled.diagnostics.is_empty(), "{:?}", compiled.diagnostics);
    compiled.render.render(host).unwrap()
}

fn texts(node: &VNode) -> Vec<String> {
    let mut out = Vec::new();
    node.walk(&mut |n| {
        if let Some(t) = n.as_text() {
            out.push(t.to_string());
        }
    });
    out
}

#[test]
fn root_type_matches_the_root_element() {
    let node = render("<section><p>hi</p></section>", &Host::default());
    assert_eq!(node.type_name(), "section");
}

#[test]
fn text_interpolation() {
    let node = render("<div>{{msg}}</div>", &Host::with(json!({"msg": "Hello"})));
    assert_eq!(texts(&node), vec!["Hello"]);
}

#[test]
fn interpolation_keeps_member_and_operator_suffixes() {
    let host = Host::with(json!({"user": {"name": "Ada", "tags": ["x", "y"]}, "n": 2}));
    let node = render("<p>{{user.name}} has {{ user.tags.length * n }} / {{user.tags[1]}}</p>", &host);
    assert_eq!(texts(&node), vec!["Ada has 4 / y"]);
}

#[test]
fn malformed_markup_still_renders() {
    let compiled = compile("<div><span>", &Registry::with_defaults(), "");
    assert!(compiled.diagnostics.iter().any(|d| d.kind == DiagnosticKind::Unclosed));
    let node = compiled.render.render(&Host::default()).unwrap();
    assert_eq!(node.type_name(), "div");
    assert_eq!(node.children()[0].type_name(), "span");
}

#[test]
fn syntax_error_becomes_noop() {
    let compiled = compile("<p>{{ a + }}</p>", &Registry::with_defaults(), "");
    assert!(compiled.render.is_noop());
    assert_eq!(compiled.diagnostics[0].kind, DiagnosticKind::Compile);
    let node = compiled.render.render(&Host::default()).unwrap();
    assert_eq!(node.as_text(), Some(""));
}

#[test]
fn extra_roots_are_reported() {
    let compiled = compile("<a></a><b></b>", &Registry::with_defaults(), "");
    assert_eq!(compiled.diagnostics[0].kind, DiagnosticKind::ExtraRoot);
    assert_eq!(compiled.render.render(&Host::default()).unwrap().type_name(), "a");
}

#[test]
fn conditional_renders_placeholder_when_false() {
    let template = "<div><p if=\"{{cond}}\">X</p></div>";
    let off = render(template, &Host::with(json!({"cond": false})));
    assert_eq!(off.children()[0].as_text(), Some(""));
    let on = render(template, &Host::with(json!({"cond": true})));
    assert_eq!(on.children()[0].type_name(), "p");
}

#[test]
fn loop_renders_siblings_in_order() {
    let node = render(
        "<ul><li for=\"item in {{items}}\">{{item}}</li></ul>",
        &Host::with(json!({"items": [1, 2, 3]})),
    );
    assert_eq!(node.children().len(), 3);
    assert_eq!(texts(&node), vec!["1", "2", "3"]);
}

#[test]
fn loop_index_alias() {
    let node = render(
        "<ul><li for=\"name, i in names\">{{i}}:{{name}}</li></ul>",
        &Host::with(json!({"names": ["a", "b"]})),
    );
    assert_eq!(texts(&node), vec!["0:a", "1:b"]);
}

#[test]
fn nested_loops_shadow_by_scope() {
    let node = render(
        "<div><p for=\"x in rows\"><b for=\"x in x.cells\">{{x}}</b>{{label}}</p></div>",
        &Host::with(json!({"rows": [{"cells": [1, 2]}, {"cells": [3]}], "label": "|"})),
    );
    assert_eq!(texts(&node), vec!["1", "2", "|", "3", "|"]);
}

#[test]
fn conditional_inside_loop_sees_the_alias() {
    let node = render(
        "<ul><li if=\"item.on\" for=\"item in items\">{{item.id}}</li></ul>",
        &Host::with(json!({"items": [{"id": 1, "on": true}, {"id": 2, "on": false}]})),
    );
    assert_eq!(node.children()[0].type_name(), "li");
    assert_eq!(node.children()[1].as_text(), Some(""));
}

#[test]
fn static_subtrees_are_cached_with_shared_identity() {
    let compiled = compile("<div><p class=\"x\">static</p>{{n}}</div>", &Registry::with_defaults(), "");
    let host = Host::with(json!({"n": 1}));
    let first = compiled.render.render(&host).unwrap();
    let second = compiled.render.render(&host).unwrap();
    let (a, b) = (&first.children()[0], &second.children()[0]);
    assert!(!a.meta().should_render);
    assert!(a.meta().same_identity(b.meta()));
    assert!(first.meta().should_render);
}

#[test]
fn attributes_from_expressions() {
    let host = Host::with(json!({"id": "main", "off": false, "on": true, "cls": {"active": true, "hidden": false}}));
    let node = render(
        "<input id=\"{{id}}\" title=\"#{{id}}\" disabled=\"{{off}}\" literal:required=\"on\" literal:class=\"cls\">",
        &host,
    );
    let attrs = &node.as_element().unwrap().props.attrs;
    assert_eq!(attrs["id"], AttrValue::from("main"));
    assert_eq!(attrs["title"], AttrValue::from("#main"));
    assert_eq!(attrs["disabled"], AttrValue::Flag(false));
    assert_eq!(attrs["required"], AttrValue::Flag(true));
    assert_eq!(attrs["class"], AttrValue::from("active"));
}

#[test]
fn listener_calls_method_with_event() {
    let host = Host::default();
    let node = render("<button on:click=\"save\">ok</button>", &host);
    assert_eq!(node.as_element().unwrap().listeners["click"].len(), 1);

    host.fire(0, &mut DomEvent::new("click"));
    let calls = host.calls.borrow();
    assert_eq!(calls[0].0, "save");
    assert_eq!(calls[0].1[0]["type"], json!("click"));
}

#[test]
fn listener_arguments_capture_loop_locals() {
    let host = Host::with(json!({"items": ["a", "b"]}));
    render("<ul><li for=\"item in items\" on:click=\"pick(item, event.type)\">x</li></ul>", &host);
    host.fire(1, &mut DomEvent::new("click"));
    assert_eq!(host.calls.borrow()[0], ("pick".to_string(), vec![json!("b"), json!("click")]));
}

#[test]
fn key_modifiers_filter_events() {
    let host = Host::default();
    render("<input on:keyup.enter.prevent=\"submit\">", &host);

    host.fire(0, &mut DomEvent::new("keyup").with_key_code(65));
    assert!(host.calls.borrow().is_empty());

    let mut enter = DomEvent::new("keyup").with_key_code(13);
    host.fire(0, &mut enter);
    assert_eq!(host.calls.borrow().len(), 1);
    assert!(enter.is_default_prevented());
}

#[test]
fn model_binds_checkbox_checked() {
    let host = Host::with(json!({"done": true}));
    let node = render("<input type=\"checkbox\" model=\"done\">", &host);
    let el = node.as_element().unwrap();
    assert_eq!(el.props.dom["checked"], json!(true));
    assert!(el.listeners.contains_key("change"));

    host.fire(0, &mut DomEvent::new("change").with_checked(false));
    assert_eq!(host.get("done"), json!(false));
}

#[test]
fn model_binds_input_value() {
    let host = Host::with(json!({"msg": "hi"}));
    render("<input model=\"{{msg}}\">", &host);
    host.fire(0, &mut DomEvent::new("input").with_value("typed"));
    assert_eq!(host.get("msg"), json!("typed"));
}

#[test]
fn html_show_once_and_pre() {
    let host = Host::with(json!({"raw": "<b>x</b>", "visible": false}));
    let node = render(
        "<div><p html=\"raw\"></p><p show=\"visible\">s</p><p once>{{raw}}</p><p pre>{{raw}}</p></div>",
        &host,
    );
    let children = node.children();
    assert_eq!(children[0].as_element().unwrap().props.dom["innerHTML"], json!("<b>x</b>"));
    assert_eq!(children[1].as_element().unwrap().props.directives["show"], json!(false));
    assert!(!children[2].meta().should_render);
    assert_eq!(texts(&children[3]), vec!["{{raw}}"]);
}

#[test]
fn prefix_restricts_directive_lookup() {
    let host = Host::with(json!({"cond": false}));
    let compiled = compile("<div><p m-if=\"cond\">a</p><p if=\"cond\">b</p></div>", &Registry::with_defaults(), "m-");
    let node = compiled.render.render(&host).unwrap();
    assert_eq!(node.children()[0].as_text(), Some(""));
    let plain = node.children()[1].as_element().unwrap();
    assert_eq!(plain.props.attrs["if"], AttrValue::from("cond"));
}

#[test]
fn functional_component_expands_inline() {
    let mut registry = Registry::with_defaults();
    let badge = compile("<b>{{label}}{{suffix}}<slot></slot></b>", &registry, "").render;
    registry.register_component(
        "badge",
        ComponentEntry::Functional(FunctionalComponent {
            render: badge,
            props: vec!["label".into()],
            data: json!({"suffix": ":"}).as_object().cloned().unwrap(),
        }),
    );
    let compiled = compile("<div><badge label=\"{{name}}\"><i>in</i></badge></div>", &registry, "");
    let node = compiled.render.render(&Host::with(json!({"name": "new"}))).unwrap();
    let b = &node.children()[0];
    assert_eq!(b.type_name(), "b");
    assert_eq!(texts(b), vec!["new:", "in"]);
}

#[test]
fn unknown_method_surfaces_as_render_error() {
    let compiled = compile("<p>{{ missing() }}</p>", &Registry::with_defaults(), "");
    let err = compiled.render.render(&Host::default()).unwrap_err();
    assert!(matches!(err, RenderError::UnknownMethod(name) if name == "missing"));
}

#[test]
fn method_results_interpolate() {
    let node = render("<p>{{ greet(1) }}</p>", &Host::default());
    assert_eq!(texts(&node), vec!["greet!"]);
}
