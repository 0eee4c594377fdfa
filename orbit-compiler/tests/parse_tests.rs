use orbit_compiler::{AstChild, AstNode, DiagnosticKind, Token, lex, parse};

fn element(child: &AstChild) -> &AstNode {
    match child {
        AstChild::Node(n) => n,
        AstChild::Text(t) => panic!("expected element, got text {t:?}"),
    }
}

#[test]
fn text_comment_and_tags() {
    let tokens = lex("a<!-- note --><b>c</b>");
    assert_eq!(tokens[0], Token::Text("a".into()));
    assert_eq!(tokens[1], Token::Comment(" note ".into()));
    assert!(matches!(&tokens[2], Token::Tag { name, close_start: false, .. } if name == "b"));
    assert!(matches!(&tokens[4], Token::Tag { name, close_start: true, .. } if name == "b"));
}

#[test]
fn unterminated_comment_keeps_its_content() {
    assert_eq!(lex("<!-- open"), vec![Token::Comment(" open".into())]);
}

#[test]
fn self_closing_tag_synthesizes_a_close() {
    let tokens = lex("<br/>");
    assert_eq!(tokens.len(), 2);
    assert!(matches!(&tokens[0], Token::Tag { close_end: true, .. }));
    assert!(matches!(&tokens[1], Token::Tag { close_start: true, name, .. } if name == "br"));
}

#[test]
fn unclosed_span_nests_under_div() {
    let parsed = parse(&lex("<div><span>"), "");
    let div = parsed.root.elements().next().unwrap();
    assert_eq!(div.tag, "div");
    let span = element(&div.children[0]);
    assert_eq!(span.tag, "span");
    assert!(span.children.is_empty());
    let kinds: Vec<_> = parsed.diagnostics.iter().map(|d| d.kind).collect();
    assert_eq!(kinds, vec![DiagnosticKind::Unclosed, DiagnosticKind::Unclosed]);
}

#[test]
fn unclosed_element_keeps_collected_children() {
    let parsed = parse(&lex("<ul><li>one</li><li>two"), "");
    let ul = parsed.root.elements().next().unwrap();
    assert_eq!(ul.children.len(), 2);
    let second = element(&ul.children[1]);
    assert_eq!(second.children, vec![AstChild::Text("two".into())]);
}

#[test]
fn dangling_close_is_dropped() {
    let parsed = parse(&lex("</p><div>x</div>"), "");
    assert_eq!(parsed.root.children.len(), 1);
    assert_eq!(parsed.diagnostics[0].kind, DiagnosticKind::DanglingClose);
}

#[test]
fn void_elements_take_no_children() {
    let parsed = parse(&lex("<p><input type=\"text\">after</p>"), "");
    let p = parsed.root.elements().next().unwrap();
    assert_eq!(p.children.len(), 2);
    assert!(element(&p.children[0]).children.is_empty());
    assert!(parsed.diagnostics.is_empty());
}

#[test]
fn svg_names_are_flagged() {
    let parsed = parse(&lex("<svg><path d=\"M0\"/></svg>"), "");
    let svg = parsed.root.elements().next().unwrap();
    assert!(svg.is_svg);
    assert!(element(&svg.children[0]).is_svg);
}

#[test]
fn directive_arguments_are_split() {
    let parsed = parse(&lex(r#"<a on:click.stop="go" literal:href="url">x</a>"#), "");
    let a = parsed.root.elements().next().unwrap();
    let on = a.attr("on:click.stop").unwrap();
    assert_eq!(on.name, "on");
    assert_eq!(on.arg.as_deref(), Some("click.stop"));
    assert_eq!(on.value, "go");
}
