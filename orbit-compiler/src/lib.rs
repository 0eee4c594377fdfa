//! Template compiler: markup is lexed, parsed into an AST and generated into a render
//! IR that the render pass evaluates against an instance.

use std::rc::Rc;

pub mod codegen;
pub mod diagnostic;
pub mod directives;
pub mod error;
pub mod expr;
pub mod ir;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod render;

pub use codegen::{GenNode, Generated, generate};
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use directives::SpecialDirective;
pub use error::{CompileError, RenderError};
pub use ir::{ComponentEntry, FunctionalComponent, NodeIr, RenderFn, Template};
pub use lexer::{Token, lex};
pub use parser::{AstChild, AstNode, AttrInfo, Parsed, parse};
pub use registry::Registry;
pub use render::{FunctionalHost, ListenerCall, RenderHost, class_names};

/// A render function plus everything worth telling the user about the template.
#[derive(Debug)]
pub struct Compiled {
    pub render: RenderFn,
    pub diagnostics: Vec<Diagnostic>,
}

/// Compile `template` against `registry`. Never fails: malformed markup is recovered
/// with a diagnostic, and a template that cannot be generated yields [`RenderFn::Noop`].
pub fn compile(template: &str, registry: &Registry, prefix: &str) -> Compiled {
    let tokens = lex(template);
    let Parsed { root, mut diagnostics } = parse(&tokens, prefix);
    let render = match generate(&root, registry) {
        Ok(generated) => {
            diagnostics.extend(generated.diagnostics);
            RenderFn::Template(Rc::new(generated.template))
        }
        Err(err) => {
            tracing::debug!(%err, "template replaced by a no-op render");
            diagnostics.push(Diagnostic::new(DiagnosticKind::Compile, err.to_string()));
            RenderFn::Noop
        }
    };
    Compiled { render, diagnostics }
}
