//! Expression AST, parsing (pest) and lexical binding of loop aliases.

use pest::Parser;
use pest::iterators::Pair;

use orbit_core::Value;
use orbit_core::value::number;

use crate::error::CompileError;

#[derive(pest_derive::Parser)]
#[grammar = "expr.pest"]
struct ExprParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// Instance data, read through the reactive getter.
    Data(String),
    /// Loop alias, by slot in the enclosing loop frames.
    Local(usize),
    Member(Box<Expr>, String),
    Index(Box<Expr>, Box<Expr>),
    /// Call of a bare identifier: an instance method.
    Method(String, Vec<Expr>),
    /// Any other call. Only methods are callable, so this fails at render time.
    Call(Box<Expr>, Vec<Expr>),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Conditional(Box<Expr>, Box<Expr>, Box<Expr>),
}

/// Parse `src` and bind identifiers against the loop aliases in `scope` (outermost
/// first). `{{expr}}` markers are accepted and read as `(expr)`.
pub fn compile_expr(src: &str, scope: &[String]) -> Result<Expr, CompileError> {
    let src = strip_mustaches(src);
    let expr = parse_expr(&src)?;
    Ok(expr.bind(scope))
}

pub fn parse_expr(src: &str) -> Result<Expr, CompileError> {
    let mut pairs = ExprParser::parse(Rule::expression, src).map_err(|e| CompileError::Expression {
        source_text: src.to_string(),
        message: e.to_string(),
    })?;
    let expression = pairs.next().ok_or_else(|| CompileError::Expression {
        source_text: src.to_string(),
        message: "empty expression".into(),
    })?;
    let expr = expression
        .into_inner()
        .find(|p| p.as_rule() == Rule::expr)
        .ok_or_else(|| CompileError::Expression {
            source_text: src.to_string(),
            message: "empty expression".into(),
        })?;
    Ok(build(expr))
}

fn strip_mustaches(src: &str) -> String {
    src.replace("{{", "(").replace("}}", ")")
}

fn build(pair: Pair<'_, Rule>) -> Expr {
    match pair.as_rule() {
        Rule::expr => first(pair),
        Rule::conditional => {
            let mut inner = pair.into_inner();
            let test = inner.next().map(build).unwrap_or(Expr::Literal(Value::Null));
            match (inner.next(), inner.next()) {
                (Some(yes), Some(no)) => {
                    Expr::Conditional(Box::new(test), Box::new(build(yes)), Box::new(build(no)))
                }
                _ => test,
            }
        }
        Rule::or_expr
        | Rule::and_expr
        | Rule::eq_expr
        | Rule::cmp_expr
        | Rule::add_expr
        | Rule::mul_expr => {
            let mut inner = pair.into_inner();
            let mut lhs = inner.next().map(build).unwrap_or(Expr::Literal(Value::Null));
            while let (Some(op), Some(rhs)) = (inner.next(), inner.next()) {
                lhs = Expr::Binary(binary_op(op.as_str()), Box::new(lhs), Box::new(build(rhs)));
            }
            lhs
        }
        Rule::unary => {
            let mut ops = Vec::new();
            let mut operand = Expr::Literal(Value::Null);
            for p in pair.into_inner() {
                match p.as_rule() {
                    Rule::unary_op if p.as_str() == "!" => ops.push(UnaryOp::Not),
                    Rule::unary_op => ops.push(UnaryOp::Neg),
                    _ => operand = build(p),
                }
            }
            ops.into_iter()
                .rev()
                .fold(operand, |e, op| Expr::Unary(op, Box::new(e)))
        }
        Rule::postfix => {
            let mut inner = pair.into_inner();
            let mut expr = inner.next().map(build).unwrap_or(Expr::Literal(Value::Null));
            for suffix in inner {
                expr = match suffix.as_rule() {
                    Rule::member => Expr::Member(Box::new(expr), first_str(suffix)),
                    Rule::index => Expr::Index(Box::new(expr), Box::new(first(suffix))),
                    _ => {
                        let args = suffix.into_inner().map(build).collect();
                        match expr {
                            Expr::Data(name) => Expr::Method(name, args),
                            other => Expr::Call(Box::new(other), args),
                        }
                    }
                };
            }
            expr
        }
        Rule::ident => Expr::Data(pair.as_str().to_string()),
        Rule::number => Expr::Literal(pair.as_str().parse::<f64>().map(number).unwrap_or(Value::Null)),
        Rule::boolean => Expr::Literal(Value::Bool(pair.as_str() == "true")),
        Rule::null => Expr::Literal(Value::Null),
        Rule::string => Expr::Literal(Value::String(unescape(&first_str(pair)))),
        Rule::array => Expr::Array(pair.into_inner().map(build).collect()),
        Rule::object => Expr::Object(
            pair.into_inner()
                .map(|entry| {
                    let mut inner = entry.into_inner();
                    let key = match inner.next() {
                        Some(k) if k.as_rule() == Rule::string => unescape(&first_str(k)),
                        Some(k) => k.as_str().to_string(),
                        None => String::new(),
                    };
                    let value = inner.next().map(build).unwrap_or(Expr::Literal(Value::Null));
                    (key, value)
                })
                .collect(),
        ),
        _ => first(pair),
    }
}

fn first(pair: Pair<'_, Rule>) -> Expr {
    pair.into_inner()
        .next()
        .map(build)
        .unwrap_or(Expr::Literal(Value::Null))
}

fn first_str(pair: Pair<'_, Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|p| p.as_str().to_string())
        .unwrap_or_default()
}

fn binary_op(op: &str) -> BinaryOp {
    match op {
        "||" => BinaryOp::Or,
        "&&" => BinaryOp::And,
        "===" => BinaryOp::StrictEq,
        "!==" => BinaryOp::StrictNe,
        "==" => BinaryOp::Eq,
        "!=" => BinaryOp::Ne,
        "<=" => BinaryOp::Le,
        ">=" => BinaryOp::Ge,
        "<" => BinaryOp::Lt,
        ">" => BinaryOp::Gt,
        "+" => BinaryOp::Add,
        "-" => BinaryOp::Sub,
        "*" => BinaryOp::Mul,
        "/" => BinaryOp::Div,
        _ => BinaryOp::Rem,
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

impl Expr {
    /// Resolve identifiers lexically: the innermost alias in `scope` wins, anything else
    /// reads instance data. A call on an alias stays a call and fails at render time.
    pub fn bind(self, scope: &[String]) -> Expr {
        let slot = |name: &str| scope.iter().rposition(|alias| alias == name);
        let bind_all = |list: Vec<Expr>| list.into_iter().map(|e| e.bind(scope)).collect::<Vec<_>>();
        match self {
            Expr::Data(name) => match slot(&name) {
                Some(i) => Expr::Local(i),
                None => Expr::Data(name),
            },
            Expr::Method(name, args) => match slot(&name) {
                Some(i) => Expr::Call(Box::new(Expr::Local(i)), bind_all(args)),
                None => Expr::Method(name, bind_all(args)),
            },
            Expr::Member(obj, key) => Expr::Member(Box::new(obj.bind(scope)), key),
            Expr::Index(obj, key) => Expr::Index(Box::new(obj.bind(scope)), Box::new(key.bind(scope))),
            Expr::Call(callee, args) => Expr::Call(Box::new(callee.bind(scope)), bind_all(args)),
            Expr::Array(items) => Expr::Array(bind_all(items)),
            Expr::Object(entries) => {
                Expr::Object(entries.into_iter().map(|(k, v)| (k, v.bind(scope))).collect())
            }
            Expr::Unary(op, e) => Expr::Unary(op, Box::new(e.bind(scope))),
            Expr::Binary(op, a, b) => Expr::Binary(op, Box::new(a.bind(scope)), Box::new(b.bind(scope))),
            Expr::Conditional(c, a, b) => Expr::Conditional(
                Box::new(c.bind(scope)),
                Box::new(a.bind(scope)),
                Box::new(b.bind(scope)),
            ),
            literal @ (Expr::Literal(_) | Expr::Local(_)) => literal,
        }
    }

    /// Whether evaluating this expression can observe instance state.
    pub fn is_constant(&self) -> bool {
        match self {
            Expr::Literal(_) => true,
            Expr::Array(items) => items.iter().all(Expr::is_constant),
            Expr::Object(entries) => entries.iter().all(|(_, v)| v.is_constant()),
            Expr::Unary(_, e) => e.is_constant(),
            Expr::Binary(_, a, b) => a.is_constant() && b.is_constant(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn precedence() {
        let e = parse_expr("a + b * 2 > 3 && !c").unwrap();
        let Expr::Binary(BinaryOp::And, lhs, rhs) = e else {
            panic!("expected &&");
        };
        assert!(matches!(*lhs, Expr::Binary(BinaryOp::Gt, _, _)));
        assert_eq!(*rhs, Expr::Unary(UnaryOp::Not, Box::new(Expr::Data("c".into()))));
    }

    #[test]
    fn suffixes_chain() {
        let e = parse_expr("user.tags[0].length").unwrap();
        assert_eq!(
            e,
            Expr::Member(
                Box::new(Expr::Index(
                    Box::new(Expr::Member(Box::new(Expr::Data("user".into())), "tags".into())),
                    Box::new(Expr::Literal(json!(0)))
                )),
                "length".into()
            )
        );
    }

    #[test]
    fn bare_calls_are_methods() {
        assert_eq!(
            parse_expr("greet('a', 1)").unwrap(),
            Expr::Method("greet".into(), vec![Expr::Literal(json!("a")), Expr::Literal(json!(1))])
        );
    }

    #[test]
    fn literals() {
        assert_eq!(parse_expr("'it\\'s'").unwrap(), Expr::Literal(json!("it's")));
        assert_eq!(parse_expr("1.5").unwrap(), Expr::Literal(json!(1.5)));
        assert_eq!(parse_expr("nullish").unwrap(), Expr::Data("nullish".into()));
        assert!(matches!(parse_expr("{a: 1, 'b': [true]}").unwrap(), Expr::Object(ref e) if e.len() == 2));
    }

    #[test]
    fn mustaches_read_as_parentheses() {
        let e = compile_expr("{{ a }} ? 'x' : 'y'", &[]).unwrap();
        assert!(matches!(e, Expr::Conditional(..)));
    }

    #[test]
    fn innermost_alias_wins() {
        let scope = vec!["item".to_string(), "i".to_string(), "item".to_string()];
        assert_eq!(compile_expr("item", &scope).unwrap(), Expr::Local(2));
        assert_eq!(compile_expr("i", &scope).unwrap(), Expr::Local(1));
        assert_eq!(compile_expr("other", &scope).unwrap(), Expr::Data("other".into()));
    }

    #[test]
    fn malformed_input_is_an_error() {
        assert!(matches!(parse_expr("a +"), Err(CompileError::Expression { .. })));
        assert!(parse_expr("").is_err());
    }
}
