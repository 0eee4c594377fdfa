use std::cell::Cell;
use std::rc::Rc;

use orbit_core::{Store, StoreError, Value};
use serde_json::json;

fn store(data: Value) -> Store {
    match data {
        Value::Object(map) => Store::new(map),
        _ => panic!("expected object"),
    }
}

#[test]
fn computed_is_cached_until_a_dependency_is_notified() {
    let s = store(json!({"a": 1, "b": 2, "c": 3}));
    let calls = Rc::new(Cell::new(0));
    {
        let calls = calls.clone();
        s.observe("sum", move |r| {
            calls.set(calls.get() + 1);
            json!(r.get("a").as_i64().unwrap() + r.get("b").as_i64().unwrap())
        });
    }

    assert_eq!(s.get("sum"), json!(3));
    assert_eq!(s.get("sum"), json!(3));
    assert_eq!(calls.get(), 1);

    // Unrelated key leaves the cache alone.
    s.notify("c");
    assert!(s.is_cached("sum"));
    assert_eq!(s.get("sum"), json!(3));
    assert_eq!(calls.get(), 1);

    s.set("a", json!(10)).unwrap();
    assert!(!s.is_cached("sum"));
    assert_eq!(s.get("sum"), json!(12));
    assert_eq!(calls.get(), 2);
}

#[test]
fn dependencies_are_recorded_per_key() {
    let s = store(json!({"first": "Ada", "last": "Lovelace"}));
    s.observe("full", |r| {
        json!(format!(
            "{} {}",
            r.get("first").as_str().unwrap_or_default(),
            r.get("last").as_str().unwrap_or_default()
        ))
    });
    assert_eq!(s.get("full"), json!("Ada Lovelace"));
    assert_eq!(s.dependents("first"), vec!["full".to_string()]);
    assert_eq!(s.dependents("last"), vec!["full".to_string()]);
    assert!(s.dependents("other").is_empty());
}

#[test]
fn dependencies_follow_the_branch_last_taken() {
    let s = store(json!({"flag": true, "a": 1, "b": 2}));
    s.observe("pick", |r| if r.get("flag") == json!(true) { r.get("a") } else { r.get("b") });
    assert_eq!(s.get("pick"), json!(1));
    assert_eq!(s.dependents("a"), vec!["pick".to_string()]);

    s.set("flag", json!(false)).unwrap();
    assert_eq!(s.get("pick"), json!(2));
    assert!(s.dependents("a").is_empty());
    assert_eq!(s.dependents("b"), vec!["pick".to_string()]);

    // A write to the dropped branch no longer invalidates the cache.
    s.set("a", json!(10)).unwrap();
    assert!(s.is_cached("pick"));
}

#[test]
fn nested_computed_invalidates_transitively() {
    let s = store(json!({"n": 2}));
    s.observe("double", |r| json!(r.get("n").as_i64().unwrap() * 2));
    s.observe("quad", |r| json!(r.get("double").as_i64().unwrap() * 2));

    assert_eq!(s.get("quad"), json!(8));
    // The outer getter captured `double`, not `n`.
    assert_eq!(s.dependents("double"), vec!["quad".to_string()]);
    assert_eq!(s.dependents("n"), vec!["double".to_string()]);

    s.set("n", json!(5)).unwrap();
    assert!(!s.is_cached("double"));
    assert!(!s.is_cached("quad"));
    assert_eq!(s.get("quad"), json!(20));
}

#[test]
fn plain_reads_outside_a_getter_capture_nothing() {
    let s = store(json!({"a": 1}));
    s.observe("x", |_| json!(42));
    let _ = s.get("a");
    let _ = s.get("x");
    assert!(s.dependents("a").is_empty());
}

#[test]
fn set_walks_dotted_paths() {
    let s = store(json!({"user": {"name": "a", "tags": ["x", "y"]}}));
    s.observe("name", |r| r.get("user")["name"].clone());
    assert_eq!(s.get("name"), json!("a"));

    assert_eq!(s.set("user.name", json!("b")).unwrap(), "user");
    assert_eq!(s.get("name"), json!("b"));

    s.set("user.tags.1", json!("z")).unwrap();
    s.set("user.tags.2", json!("w")).unwrap();
    assert_eq!(s.get("user")["tags"], json!(["x", "z", "w"]));
}

#[test]
fn set_reports_broken_paths() {
    let s = store(json!({"user": {"name": "a"}, "n": 1}));
    assert_eq!(
        s.set("missing.name", json!(1)),
        Err(StoreError::PathNotFound {
            path: "missing.name".into()
        })
    );
    assert!(matches!(
        s.set("n.x", json!(1)),
        Err(StoreError::NotAContainer { .. })
    ));
    s.observe("c", |_| json!(0));
    assert_eq!(
        s.set("c", json!(1)),
        Err(StoreError::ReadOnlyComputed("c".into()))
    );
}
