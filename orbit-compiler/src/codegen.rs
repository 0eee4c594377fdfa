//! AST to render IR. Special directives hook into generation at three points per
//! attribute occurrence: before props, during props, and after the node is built.

use std::cmp::Reverse;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::directives::SpecialDirective;
use crate::error::CompileError;
use crate::expr::{Expr, compile_expr};
use crate::ir::{AttrIr, ComponentIr, ElementIr, ListenerIr, NodeIr, Part, StaticCache, Template, next_site};
use crate::parser::{AstChild, AstNode, AttrInfo};
use crate::registry::Registry;

/// Loop header recorded by `for` so its after hook can wrap the node.
#[derive(Debug, Clone)]
pub struct LoopSpec {
    pub aliases: usize,
    pub iterable: Expr,
}

/// The element being generated, as directive hooks see it.
#[derive(Debug, Clone)]
pub struct GenNode {
    pub tag: String,
    pub attrs: IndexMap<String, AttrInfo>,
    /// Loop aliases visible to this node's attributes and children, outermost first.
    pub scope: Vec<String>,
    pub listeners: Vec<Rc<ListenerIr>>,
    pub dom: Vec<(String, Expr)>,
    /// The node depends on instance state and must be rendered on every pass.
    pub should_render: bool,
    /// Rendered once, then left alone by the patcher.
    pub frozen: bool,
    /// Children are kept as written, without interpolation or directives.
    pub raw_children: bool,
    pub loop_spec: Option<LoopSpec>,
    pub is_svg: bool,
}

impl GenNode {
    pub fn attr_value(&self, raw: &str) -> Option<&str> {
        self.attrs.get(raw).map(|a| a.value.as_str())
    }
}

#[derive(Debug)]
pub struct Generated {
    pub template: Template,
    pub diagnostics: Vec<Diagnostic>,
}

struct Generator<'r> {
    registry: &'r Registry,
    diagnostics: Vec<Diagnostic>,
}

/// Generate IR for the first root node of `root`; further roots are reported and
/// ignored.
pub fn generate(root: &AstNode, registry: &Registry) -> Result<Generated, CompileError> {
    let mut generator = Generator {
        registry,
        diagnostics: Vec::new(),
    };
    let mut roots = root.children.iter().filter(|child| match child {
        AstChild::Node(_) => true,
        AstChild::Text(t) => !t.trim().is_empty(),
    });
    let first = roots.next();
    let extra = roots.count();
    if extra > 0 {
        generator.diagnostics.push(Diagnostic::new(
            DiagnosticKind::ExtraRoot,
            format!("template has {extra} extra root node(s); only the first is rendered"),
        ));
    }
    let root = first.map(|child| generator.child(child, &[], false)).transpose()?;
    Ok(Generated {
        template: Template { root },
        diagnostics: generator.diagnostics,
    })
}

impl Generator<'_> {
    fn child(&mut self, child: &AstChild, scope: &[String], raw: bool) -> Result<NodeIr, CompileError> {
        match child {
            AstChild::Text(text) if raw => Ok(NodeIr::Text {
                site: next_site(),
                parts: vec![Part::Static(text.clone())],
                dynamic: false,
            }),
            AstChild::Text(text) => {
                let parts = interpolate(text, scope)?;
                let dynamic = parts.iter().any(|p| matches!(p, Part::Expr(_)));
                Ok(NodeIr::Text {
                    site: next_site(),
                    parts,
                    dynamic,
                })
            }
            AstChild::Node(node) if raw => Ok(self.raw_element(node)),
            AstChild::Node(node) => self.element(node, scope),
        }
    }

    fn element(&mut self, node: &AstNode, scope: &[String]) -> Result<NodeIr, CompileError> {
        let entry = self.registry.component(&node.tag).cloned();
        let mut gen_node = GenNode {
            tag: node.tag.clone(),
            attrs: node.attrs.clone(),
            scope: scope.to_vec(),
            listeners: Vec::new(),
            dom: Vec::new(),
            should_render: entry.is_some(),
            frozen: false,
            raw_children: false,
            loop_spec: None,
            is_svg: node.is_svg,
        };

        let mut specials: Vec<(&AttrInfo, Rc<dyn SpecialDirective>)> = Vec::new();
        let mut plain_directives = Vec::new();
        let mut plain_attrs = Vec::new();
        for attr in node.attrs.values() {
            if attr.prefixed {
                if let Some(directive) = self.registry.special(&attr.name) {
                    specials.push((attr, directive.clone()));
                    continue;
                }
                if self.registry.plain().contains(&attr.name) {
                    plain_directives.push(attr);
                    continue;
                }
            }
            plain_attrs.push(attr);
        }
        if !specials.is_empty() || !plain_directives.is_empty() {
            gen_node.should_render = true;
        }

        let mut before = specials.clone();
        before.sort_by_key(|(_, d)| Reverse(d.priority()));
        for (attr, directive) in &before {
            directive.before_generate(attr, &mut gen_node)?;
        }

        let mut attrs = Vec::new();
        for attr in plain_attrs {
            let parts = interpolate(&attr.value, &gen_node.scope)?;
            let ir = match parts.as_slice() {
                [] => AttrIr::Static(String::new()),
                [Part::Static(s)] => AttrIr::Static(s.clone()),
                _ => {
                    gen_node.should_render = true;
                    AttrIr::Interpolated(parts)
                }
            };
            attrs.push((attr.raw.clone(), ir));
        }
        for (attr, directive) in &specials {
            if let Some(prop) = directive.during_prop_generate(attr, &gen_node)? {
                attrs.push(prop);
            }
        }
        let mut directives = Vec::new();
        for attr in plain_directives {
            directives.push((attr.name.clone(), compile_expr(&attr.value, &gen_node.scope)?));
        }

        let children = node
            .children
            .iter()
            .map(|c| self.child(c, &gen_node.scope, gen_node.raw_children))
            .collect::<Result<Vec<_>, _>>()?;
        if children.iter().any(NodeIr::is_dynamic) || !gen_node.dom.is_empty() || !gen_node.listeners.is_empty() {
            gen_node.should_render = true;
        }

        let ir = match entry {
            Some(entry) => {
                if !gen_node.listeners.is_empty() {
                    tracing::warn!(tag = %node.tag, "event listeners on a component tag are ignored");
                }
                NodeIr::Component(ComponentIr {
                    site: next_site(),
                    tag: node.tag.clone(),
                    props: attrs,
                    children,
                    entry,
                })
            }
            None if node.tag == "slot" => NodeIr::Slot {
                name: gen_node.attr_value("name").unwrap_or("default").to_string(),
            },
            None => NodeIr::Element(ElementIr {
                site: next_site(),
                tag: node.tag.clone(),
                attrs,
                dom: gen_node.dom.clone(),
                directives,
                listeners: gen_node.listeners.clone(),
                children,
                should_render: gen_node.should_render && !gen_node.frozen,
                is_svg: gen_node.is_svg,
                cache: (!gen_node.should_render).then(StaticCache::default),
            }),
        };

        let mut after = specials;
        after.sort_by_key(|(_, d)| d.priority());
        after.into_iter().try_fold(ir, |ir, (attr, directive)| {
            directive.after_generate(attr, ir, &gen_node)
        })
    }

    /// Markup under `pre`: attributes and text exactly as written.
    fn raw_element(&mut self, node: &AstNode) -> NodeIr {
        let children = node
            .children
            .iter()
            .map(|c| match c {
                AstChild::Text(text) => NodeIr::Text {
                    site: next_site(),
                    parts: vec![Part::Static(text.clone())],
                    dynamic: false,
                },
                AstChild::Node(n) => self.raw_element(n),
            })
            .collect();
        NodeIr::Element(ElementIr {
            site: next_site(),
            tag: node.tag.clone(),
            attrs: node
                .attrs
                .iter()
                .map(|(raw, a)| (raw.clone(), AttrIr::Static(a.value.clone())))
                .collect(),
            dom: Vec::new(),
            directives: Vec::new(),
            listeners: Vec::new(),
            children,
            should_render: false,
            is_svg: node.is_svg,
            cache: Some(StaticCache::default()),
        })
    }
}

/// Split `text` into static runs and `{{ }}` expressions. An unterminated `{{` is text.
pub fn interpolate(text: &str, scope: &[String]) -> Result<Vec<Part>, CompileError> {
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start + 2..].find("}}") else {
            break;
        };
        if start > 0 {
            parts.push(Part::Static(rest[..start].to_string()));
        }
        let source = &rest[start + 2..start + 2 + len];
        parts.push(Part::Expr(compile_expr(source, scope)?));
        rest = &rest[start + 4 + len..];
    }
    if !rest.is_empty() {
        parts.push(Part::Static(rest.to_string()));
    }
    Ok(parts)
}
