//! Token stream to AST, with recovery from malformed markup.

use indexmap::IndexMap;

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::lexer::Token;

pub const ROOT: &str = "ROOT";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen", "link",
    "meta", "param", "source", "track", "wbr",
];

const SVG_ELEMENTS: &[&str] = &[
    "svg", "animate", "circle", "clippath", "cursor", "defs", "desc", "ellipse", "filter",
    "font-face", "foreignObject", "g", "glyph", "image", "line", "marker", "mask",
    "missing-glyph", "path", "pattern", "polygon", "polyline", "rect", "switch", "symbol",
    "text", "textpath", "tspan", "use", "view",
];

pub fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

pub fn is_svg(tag: &str) -> bool {
    SVG_ELEMENTS.contains(&tag)
}

/// One attribute as written. For `on:click.prevent` the name is `on` and the argument
/// `click.prevent`; `raw` keeps the full key.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrInfo {
    pub raw: String,
    pub name: String,
    pub arg: Option<String>,
    pub value: String,
    /// Whether the directive prefix was present (always true with an empty prefix).
    /// Only prefixed attributes are looked up as directives.
    pub prefixed: bool,
}

impl AttrInfo {
    pub fn new(raw: &str, value: &str, prefix: &str) -> Self {
        let (key, prefixed) = match raw.strip_prefix(prefix) {
            Some(stripped) if !prefix.is_empty() => (stripped, true),
            _ => (raw, prefix.is_empty()),
        };
        let (name, arg) = match key.split_once(':') {
            Some((name, arg)) => (name.to_string(), Some(arg.to_string())),
            None => (key.to_string(), None),
        };
        Self {
            raw: raw.to_string(),
            name,
            arg,
            value: value.to_string(),
            prefixed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AstChild {
    Text(String),
    Node(AstNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub tag: String,
    pub attrs: IndexMap<String, AttrInfo>,
    pub children: Vec<AstChild>,
    pub is_svg: bool,
}

impl AstNode {
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        Self {
            is_svg: is_svg(&tag),
            tag,
            attrs: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, raw: &str) -> Option<&AttrInfo> {
        self.attrs.get(raw)
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &AstNode> {
        self.children.iter().filter_map(|c| match c {
            AstChild::Node(n) => Some(n),
            AstChild::Text(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parsed {
    pub root: AstNode,
    pub diagnostics: Vec<Diagnostic>,
}

struct Walker<'t> {
    tokens: &'t [Token],
    pos: usize,
    prefix: &'t str,
    diagnostics: Vec<Diagnostic>,
}

/// Build the `ROOT` node. Never fails: unclosed elements keep what was collected, stray
/// closing tags are dropped, both with a diagnostic.
pub fn parse(tokens: &[Token], prefix: &str) -> Parsed {
    let mut walker = Walker {
        tokens,
        pos: 0,
        prefix,
        diagnostics: Vec::new(),
    };
    let mut root = AstNode::new(ROOT);
    while walker.pos < tokens.len() {
        if let Some(child) = walker.walk() {
            root.children.push(child);
        }
    }
    Parsed {
        root,
        diagnostics: walker.diagnostics,
    }
}

impl Walker<'_> {
    fn walk(&mut self) -> Option<AstChild> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        let (name, close_end, attributes) = match token {
            Token::Text(text) => return Some(AstChild::Text(text.clone())),
            Token::Comment(_) => return None,
            Token::Tag { close_start: true, name, .. } => {
                self.report(
                    DiagnosticKind::DanglingClose,
                    format!("closing tag </{name}> has no matching element"),
                );
                return None;
            }
            Token::Tag { name, .. } if name.is_empty() => return None,
            Token::Tag {
                name,
                close_end,
                attributes,
                ..
            } => (name, *close_end, attributes),
        };

        let mut node = AstNode::new(name.as_str());
        for (raw, value) in attributes {
            node.attrs.insert(raw.clone(), AttrInfo::new(raw, value, self.prefix));
        }

        if close_end {
            // Swallow the synthetic close emitted for `<x/>`.
            if self.at_close(name) {
                self.pos += 1;
            }
            return Some(AstChild::Node(node));
        }
        if is_void(name) {
            return Some(AstChild::Node(node));
        }

        loop {
            if self.pos >= self.tokens.len() {
                self.report(
                    DiagnosticKind::Unclosed,
                    format!("the element <{name}> was left unclosed"),
                );
                break;
            }
            if self.at_close(name) {
                self.pos += 1;
                break;
            }
            if let Some(child) = self.walk() {
                node.children.push(child);
            }
        }
        Some(AstChild::Node(node))
    }

    fn at_close(&self, tag: &str) -> bool {
        matches!(
            self.tokens.get(self.pos),
            Some(Token::Tag { close_start: true, name, .. }) if name == tag
        )
    }

    fn report(&mut self, kind: DiagnosticKind, message: String) {
        tracing::debug!(?kind, %message, "parse recovery");
        self.diagnostics.push(Diagnostic::new(kind, message));
    }
}
