//! Markup to live nodes and back, for pre-rendered pages and anchor templates.

use orbit_compiler::parser::is_void;
use orbit_compiler::{AstChild, AstNode, Diagnostic, Parsed, lex, parse};
use orbit_dom::document::XLINK_NS;
use orbit_dom::{Document, NodeId};

/// Parse `markup` and append the resulting nodes under `parent`. Malformed markup is
/// recovered the same way templates are.
pub fn load_markup(doc: &mut dyn Document, parent: NodeId, markup: &str) -> Vec<Diagnostic> {
    let Parsed { root, diagnostics } = parse(&lex(markup), "");
    append_children(doc, parent, &root);
    diagnostics
}

fn append_children(doc: &mut dyn Document, parent: NodeId, node: &AstNode) {
    for child in &node.children {
        let id = match child {
            AstChild::Text(text) => doc.create_text(text),
            AstChild::Node(el) => {
                let id = doc.create_element(&el.tag, el.is_svg);
                for (raw, attr) in &el.attrs {
                    match raw.strip_prefix("xlink:") {
                        Some(local) if el.is_svg => doc.set_attribute_ns(id, XLINK_NS, local, &attr.value),
                        _ => doc.set_attribute(id, raw, &attr.value),
                    }
                }
                append_children(doc, id, el);
                id
            }
        };
        doc.append_child(parent, id);
    }
}

/// Serialize `node` the way it would be written as a template.
pub fn outer_markup(doc: &dyn Document, node: NodeId) -> String {
    let mut out = String::new();
    write_node(doc, node, &mut out);
    out
}

fn write_node(doc: &dyn Document, node: NodeId, out: &mut String) {
    if let Some(text) = doc.text(node) {
        out.push_str(&text.replace('<', "&lt;"));
        return;
    }
    let tag = doc.node_name(node);
    out.push('<');
    out.push_str(&tag);
    for (name, value) in doc.attributes(node) {
        out.push(' ');
        out.push_str(&name);
        out.push_str("=\"");
        out.push_str(&value.replace('"', "&quot;"));
        out.push('"');
    }
    out.push('>');
    if is_void(&tag) {
        return;
    }
    for child in doc.children(node) {
        write_node(doc, child, out);
    }
    out.push_str("</");
    out.push_str(&tag);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use orbit_dom::MemoryDocument;

    use super::*;

    #[test]
    fn markup_round_trips_through_the_document() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let diagnostics = load_markup(&mut doc, root, "<div id=\"app\"><p class=\"a\">hi</p><br></div>");
        assert!(diagnostics.is_empty());

        let app = doc.query("#app").unwrap();
        assert_eq!(outer_markup(&doc, app), "<div id=\"app\"><p class=\"a\">hi</p><br></div>");
    }

    #[test]
    fn unclosed_markup_is_reported() {
        let mut doc = MemoryDocument::new();
        let root = doc.root();
        let diagnostics = load_markup(&mut doc, root, "<ul><li>one");
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(doc.text_content(root), "one");
    }
}
