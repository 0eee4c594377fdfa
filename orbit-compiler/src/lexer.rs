use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

/// key, `=`, value (double-quoted, single-quoted or bare)
static ATTRIBUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^=\s]*)(=?)("[^"]*"|'[^']*'|[^\s"']*)"#).expect("attribute pattern compiles")
});

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Text(String),
    Comment(String),
    Tag {
        name: String,
        close_start: bool,
        close_end: bool,
        attributes: IndexMap<String, String>,
    },
}

impl Token {
    fn close(name: &str) -> Self {
        Token::Tag {
            name: name.to_string(),
            close_start: true,
            close_end: false,
            attributes: IndexMap::new(),
        }
    }
}

/// Single left-to-right scan of `input` into text, comment and tag tokens. A
/// self-closing tag is followed by a synthetic closing tag.
pub fn lex(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    while pos < input.len() {
        let rest = &input[pos..];
        if !rest.starts_with('<') {
            pos += lex_text(rest, &mut tokens);
        } else if rest.starts_with("<!--") {
            pos += lex_comment(rest, &mut tokens);
        } else {
            pos += lex_tag(rest, &mut tokens);
        }
    }
    tokens
}

fn lex_text(rest: &str, tokens: &mut Vec<Token>) -> usize {
    let end = rest.find('<').unwrap_or(rest.len());
    if end > 0 {
        tokens.push(Token::Text(rest[..end].to_string()));
    }
    end
}

fn lex_comment(rest: &str, tokens: &mut Vec<Token>) -> usize {
    let body = &rest[4..];
    match body.find("-->") {
        Some(end) => {
            tokens.push(Token::Comment(body[..end].to_string()));
            4 + end + 3
        }
        // Unterminated: the remainder is the comment.
        None => {
            tokens.push(Token::Comment(body.to_string()));
            rest.len()
        }
    }
}

fn lex_tag(rest: &str, tokens: &mut Vec<Token>) -> usize {
    let bytes = rest.as_bytes();
    let close_start = bytes.get(1) == Some(&b'/');
    let mut pos = if close_start { 2 } else { 1 };

    while pos < bytes.len() && (bytes[pos] == b'/' || bytes[pos].is_ascii_whitespace()) {
        pos += 1;
    }
    let name_start = pos;
    while pos < bytes.len() && !matches!(bytes[pos], b'/' | b'>') && !bytes[pos].is_ascii_whitespace() {
        pos += 1;
    }
    let name = rest[name_start..pos].to_string();

    let attrs_start = pos;
    let mut quote = None;
    while pos < bytes.len() {
        let c = bytes[pos];
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == b'"' || c == b'\'' => quote = Some(c),
            None if c == b'>' || (c == b'/' && next_is_tag_end(&bytes[pos + 1..])) => break,
            None => {}
        }
        pos += 1;
    }
    let attributes = lex_attributes(&rest[attrs_start..pos]);

    let close_end = bytes.get(pos) == Some(&b'/');
    if close_end {
        pos += 1;
        while pos < bytes.len() && bytes[pos] != b'>' {
            pos += 1;
        }
    }
    // Past the `>`, or at end of input for a tag cut short.
    pos = (pos + 1).min(rest.len());

    tokens.push(Token::Tag {
        name: name.clone(),
        close_start,
        close_end,
        attributes,
    });
    if close_end && !close_start {
        tokens.push(Token::close(&name));
    }
    pos
}

fn next_is_tag_end(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_none_or(|b| *b == b'>')
}

fn lex_attributes(raw: &str) -> IndexMap<String, String> {
    let mut attrs = IndexMap::new();
    for caps in ATTRIBUTE_RE.captures_iter(raw) {
        let key = caps.get(1).map_or("", |m| m.as_str());
        if key.is_empty() {
            continue;
        }
        let has_equal = caps.get(2).is_some_and(|m| !m.as_str().is_empty());
        let mut value = caps.get(3).map_or("", |m| m.as_str());
        let quoted = value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')));
        if quoted {
            value = &value[1..value.len() - 1];
        }
        // A bare key is its own value: `<input disabled>`.
        let value = if value.is_empty() && !has_equal { key } else { value };
        attrs.insert(key.to_string(), value.to_string());
    }
    attrs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(token: &Token) -> (&str, bool, bool, &IndexMap<String, String>) {
        match token {
            Token::Tag {
                name,
                close_start,
                close_end,
                attributes,
            } => (name, *close_start, *close_end, attributes),
            other => panic!("expected tag, got {other:?}"),
        }
    }

    #[test]
    fn attribute_forms() {
        let tokens = lex(r#"<input type="checkbox" checked data-x='a b' href=/x/y value="">"#);
        let (name, _, _, attrs) = tag(&tokens[0]);
        assert_eq!(name, "input");
        assert_eq!(attrs["type"], "checkbox");
        assert_eq!(attrs["checked"], "checked");
        assert_eq!(attrs["data-x"], "a b");
        assert_eq!(attrs["href"], "/x/y");
        assert_eq!(attrs["value"], "");
    }

    #[test]
    fn slash_inside_quotes_is_not_self_closing() {
        let tokens = lex(r#"<a href="/home">x</a>"#);
        let (_, _, close_end, attrs) = tag(&tokens[0]);
        assert!(!close_end);
        assert_eq!(attrs["href"], "/home");
        assert_eq!(tokens[1], Token::Text("x".into()));
    }

    #[test]
    fn directive_arguments_stay_in_the_key() {
        let tokens = lex(r#"<button on:click.prevent="save(1)">"#);
        let (_, _, _, attrs) = tag(&tokens[0]);
        assert_eq!(attrs["on:click.prevent"], "save(1)");
    }
}
