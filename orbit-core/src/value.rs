//! Helpers over the dynamic data model shared by the store, the renderer and the patcher.
//!
//! Instance data is plain JSON: [`serde_json::Value`] is used everywhere a template
//! expression can observe or produce a value.

pub use serde_json::{Map, Number, Value};

/// Truthiness the way templates see it: empty strings, `0`, `NaN`, `false` and `null`
/// are falsy; arrays and objects are always truthy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Builds a number value, keeping integral results integral so they print as `2` and not
/// `2.0`. Non-finite results become `null`.
pub fn number(f: f64) -> Value {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 {
        Value::from(f as i64)
    } else {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Numeric view of a value. Strings are parsed, booleans count as `0`/`1`.
pub fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse().ok(),
        Value::Null => Some(0.0),
        _ => None,
    }
}

/// Text form of a value as it appears in rendered output.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) if f.fract() == 0.0 && f.abs() < 9.0e15 => (f as i64).to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(display).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Loose equality used by `==`: numbers compare numerically, everything else structurally.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), _) | (_, Value::Number(_)) => match (to_f64(a), to_f64(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
        (Value::String(s), Value::Bool(_)) | (Value::Bool(_), Value::String(s)) => {
            to_f64(&Value::String(s.clone())) == to_f64(if a.is_boolean() { a } else { b })
        }
        _ => a == b,
    }
}
