//! Special directives: attributes that change what the code generator emits.

use std::rc::Rc;
use std::sync::LazyLock;

use regex::Regex;

use crate::codegen::{GenNode, LoopSpec};
use crate::error::CompileError;
use crate::expr::{Expr, compile_expr};
use crate::ir::{AttrIr, ListenerIr, ListenerKind, ModelProp, Modifier, NodeIr, next_site};
use crate::parser::AttrInfo;
use crate::registry::Registry;

/// `alias in iterable` or `alias, index in iterable`
static LOOP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_$][\w$]*)(?:\s*,\s*([A-Za-z_$][\w$]*))?\s+in\s+(.+?)\s*$")
        .expect("loop pattern compiles")
});

/// Hooks run per attribute occurrence. All `before_generate` hooks of a node run first,
/// then props are emitted (`during_prop_generate` may supply one), then children, then
/// `after_generate` wraps the finished node.
pub trait SpecialDirective {
    /// Higher priorities run their before hook earlier and their after hook later,
    /// i.e. they wrap outermost.
    fn priority(&self) -> u8 {
        0
    }

    fn before_generate(&self, _attr: &AttrInfo, _node: &mut GenNode) -> Result<(), CompileError> {
        Ok(())
    }

    fn during_prop_generate(
        &self,
        _attr: &AttrInfo,
        _node: &GenNode,
    ) -> Result<Option<(String, AttrIr)>, CompileError> {
        Ok(None)
    }

    fn after_generate(&self, _attr: &AttrInfo, ir: NodeIr, _node: &GenNode) -> Result<NodeIr, CompileError> {
        Ok(ir)
    }
}

pub(crate) fn install_defaults(registry: &mut Registry) {
    registry.register_special("if", If);
    registry.register_special("for", For);
    registry.register_special("on", On);
    registry.register_special("model", Model);
    registry.register_special("literal", Literal);
    registry.register_special("html", Html);
    registry.register_special("once", Once);
    registry.register_special("pre", Pre);
    registry.register_special("mask", Mask);
}

/// Render the node only while the value is truthy, otherwise an empty text placeholder.
pub struct If;

impl SpecialDirective for If {
    fn after_generate(&self, attr: &AttrInfo, ir: NodeIr, node: &GenNode) -> Result<NodeIr, CompileError> {
        Ok(NodeIr::Conditional {
            site: next_site(),
            test: compile_expr(&attr.value, &node.scope)?,
            then: Box::new(ir),
        })
    }
}

/// Repeat the node per array item. The aliases are visible to the node's own
/// attributes and children, and shadow outer aliases of the same name.
pub struct For;

impl SpecialDirective for For {
    fn priority(&self) -> u8 {
        1
    }

    fn before_generate(&self, attr: &AttrInfo, node: &mut GenNode) -> Result<(), CompileError> {
        let caps = LOOP_RE
            .captures(&attr.value)
            .ok_or_else(|| CompileError::directive("for", format!("expected `item in list`, got `{}`", attr.value)))?;
        let iterable = compile_expr(&caps[3], &node.scope)?;
        node.scope.push(caps[1].to_string());
        let mut aliases = 1;
        if let Some(index) = caps.get(2) {
            node.scope.push(index.as_str().to_string());
            aliases = 2;
        }
        node.loop_spec = Some(LoopSpec { aliases, iterable });
        Ok(())
    }

    fn after_generate(&self, _attr: &AttrInfo, ir: NodeIr, node: &GenNode) -> Result<NodeIr, CompileError> {
        let spec = node
            .loop_spec
            .clone()
            .ok_or_else(|| CompileError::directive("for", "loop header missing"))?;
        Ok(NodeIr::Loop {
            aliases: spec.aliases,
            iterable: spec.iterable,
            body: Box::new(ir),
        })
    }
}

/// `on:event.modifiers="method(args)"`. Without an argument list the event object is
/// passed; inside an argument list it is reachable as `event`.
pub struct On;

impl SpecialDirective for On {
    fn before_generate(&self, attr: &AttrInfo, node: &mut GenNode) -> Result<(), CompileError> {
        let arg = attr
            .arg
            .as_deref()
            .ok_or_else(|| CompileError::directive("on", "missing event name"))?;
        let mut pieces = arg.split('.');
        let event = pieces.next().unwrap_or_default().to_string();
        let modifiers = pieces
            .map(|m| Modifier::parse(m).ok_or_else(|| CompileError::directive("on", format!("unknown modifier `{m}`"))))
            .collect::<Result<Vec<_>, _>>()?;

        let mut scope = node.scope.clone();
        scope.push("event".to_string());
        let event_slot = scope.len() - 1;
        let kind = match compile_expr(&attr.value, &scope)? {
            Expr::Data(name) => ListenerKind::Method {
                name,
                args: vec![Expr::Local(event_slot)],
            },
            Expr::Method(name, args) => ListenerKind::Method { name, args },
            _ => {
                return Err(CompileError::directive(
                    "on",
                    format!("`{}` is not a method call", attr.value),
                ));
            }
        };
        node.listeners.push(Rc::new(ListenerIr { event, kind, modifiers }));
        Ok(())
    }
}

/// Two-way binding between a form control and a data path.
pub struct Model;

impl SpecialDirective for Model {
    fn before_generate(&self, attr: &AttrInfo, node: &mut GenNode) -> Result<(), CompileError> {
        let path = attr.value.replace("{{", "").replace("}}", "").trim().to_string();
        if path.is_empty() {
            return Err(CompileError::directive("model", "missing data path"));
        }
        let (event, prop) = match node.attr_value("type") {
            Some("checkbox") => ("change", ModelProp::Checked),
            _ => ("input", ModelProp::Value),
        };
        node.dom.push((prop.name().to_string(), compile_expr(&path, &node.scope)?));
        node.listeners.push(Rc::new(ListenerIr {
            event: event.to_string(),
            kind: ListenerKind::Model { path, prop },
            modifiers: Vec::new(),
        }));
        Ok(())
    }
}

/// `literal:attr="expr"`: the attribute takes the raw value of an expression.
pub struct Literal;

impl SpecialDirective for Literal {
    fn during_prop_generate(
        &self,
        attr: &AttrInfo,
        node: &GenNode,
    ) -> Result<Option<(String, AttrIr)>, CompileError> {
        let prop = attr
            .arg
            .clone()
            .ok_or_else(|| CompileError::directive("literal", "missing attribute name"))?;
        let expr = compile_expr(&attr.value, &node.scope)?;
        let ir = if prop == "class" {
            AttrIr::Class(expr)
        } else {
            AttrIr::Expr(expr)
        };
        Ok(Some((prop, ir)))
    }
}

pub struct Html;

impl SpecialDirective for Html {
    fn before_generate(&self, attr: &AttrInfo, node: &mut GenNode) -> Result<(), CompileError> {
        node.dom
            .push(("innerHTML".to_string(), compile_expr(&attr.value, &node.scope)?));
        Ok(())
    }
}

pub struct Once;

impl SpecialDirective for Once {
    fn before_generate(&self, _attr: &AttrInfo, node: &mut GenNode) -> Result<(), CompileError> {
        node.frozen = true;
        Ok(())
    }
}

pub struct Pre;

impl SpecialDirective for Pre {
    fn before_generate(&self, _attr: &AttrInfo, node: &mut GenNode) -> Result<(), CompileError> {
        node.frozen = true;
        node.raw_children = true;
        Ok(())
    }
}

/// Consumed by the compiler so the attribute never reaches the rendered node.
pub struct Mask;

impl SpecialDirective for Mask {}
