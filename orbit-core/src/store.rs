//! Reactive data store.
//!
//! Plain keys live in a JSON object. Computed keys are getters whose reads are captured
//! through an explicit [`Reader`]; their result is cached until one of the captured keys
//! is notified. Invalidation is pull-based: notifying only drops caches, the next read
//! recomputes.

use std::cell::{Ref, RefCell};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use serde_json::{Map, Value};
use thiserror::Error;

pub type Getter = Rc<dyn Fn(&Reader<'_>) -> Value>;

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("key path `{path}` does not exist")]
    PathNotFound { path: String },
    #[error("segment `{segment}` of `{path}` does not name a container")]
    NotAContainer { path: String, segment: String },
    #[error("computed property `{0}` has no setter")]
    ReadOnlyComputed(String),
}

/// Dependency bookkeeping: which computed keys read which keys, and their cached values.
#[derive(Debug, Default)]
struct Observer {
    map: HashMap<String, HashSet<String>>,
    cache: HashMap<String, Value>,
}

impl Observer {
    /// Forget every edge pointing at `key`.
    fn unlink(&mut self, key: &str) {
        self.map.retain(|_, dependents| {
            dependents.remove(key);
            !dependents.is_empty()
        });
    }
}

pub struct Store {
    data: RefCell<Map<String, Value>>,
    computed: RefCell<HashMap<String, Getter>>,
    observer: RefCell<Observer>,
}

/// Capture context handed to a computed getter. Every key read through it is recorded
/// as a dependency of the getter being evaluated; a nested computed read gets its own
/// reader, so captures never bleed between evaluations.
pub struct Reader<'s> {
    store: &'s Store,
    captured: RefCell<BTreeSet<String>>,
}

impl Reader<'_> {
    pub fn get(&self, key: &str) -> Value {
        self.captured.borrow_mut().insert(key.to_string());
        self.store.get(key)
    }

    fn into_captured(self) -> BTreeSet<String> {
        self.captured.into_inner()
    }
}

impl Store {
    pub fn new(data: Map<String, Value>) -> Self {
        Self {
            data: RefCell::new(data),
            computed: RefCell::new(HashMap::new()),
            observer: RefCell::new(Observer::default()),
        }
    }

    /// Declare `name` as a computed property. Its dependencies are whatever the getter
    /// reads, discovered on first evaluation.
    pub fn observe<F>(&self, name: impl Into<String>, getter: F)
    where
        F: Fn(&Reader<'_>) -> Value + 'static,
    {
        let name = name.into();
        let mut observer = self.observer.borrow_mut();
        observer.cache.remove(&name);
        observer.unlink(&name);
        drop(observer);
        self.computed.borrow_mut().insert(name, Rc::new(getter));
    }

    pub fn is_computed(&self, key: &str) -> bool {
        self.computed.borrow().contains_key(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.is_computed(key) || self.data.borrow().contains_key(key)
    }

    /// Read a top-level key. Computed keys are served from cache when valid.
    pub fn get(&self, key: &str) -> Value {
        let getter = self.computed.borrow().get(key).cloned();
        match getter {
            Some(getter) => self.computed_value(key, &getter),
            None => self.data.borrow().get(key).cloned().unwrap_or(Value::Null),
        }
    }

    fn computed_value(&self, key: &str, getter: &Getter) -> Value {
        if let Some(cached) = self.observer.borrow().cache.get(key) {
            return cached.clone();
        }

        let reader = Reader {
            store: self,
            captured: RefCell::new(BTreeSet::new()),
        };
        let value = getter(&reader);
        let deps = reader.into_captured();

        let mut observer = self.observer.borrow_mut();
        // Reads are re-captured on every evaluation; a branch no longer taken drops out.
        observer.unlink(key);
        for dep in deps {
            observer.map.entry(dep).or_default().insert(key.to_string());
        }
        observer.cache.insert(key.to_string(), value.clone());
        tracing::trace!(key, "computed property evaluated");
        value
    }

    /// Write through a dotted key path (`user.name`, `items.2`) and notify the base key.
    /// Returns the base key.
    pub fn set(&self, path: &str, value: Value) -> Result<String, StoreError> {
        let mut segments = path.split('.');
        let base = segments.next().unwrap_or_default().to_string();
        if self.is_computed(&base) {
            return Err(StoreError::ReadOnlyComputed(base));
        }
        let rest: Vec<&str> = segments.collect();

        {
            let mut data = self.data.borrow_mut();
            match rest.split_last() {
                None => {
                    data.insert(base.clone(), value);
                }
                Some((last, middle)) => {
                    let mut cur = data.get_mut(&base).ok_or_else(|| StoreError::PathNotFound {
                        path: path.to_string(),
                    })?;
                    for segment in middle {
                        cur = step_mut(cur, segment, path)?;
                    }
                    assign(cur, last, value, path)?;
                }
            }
        }

        self.notify(&base);
        Ok(base)
    }

    /// Drop the cache of every computed property that depends on `key`, transitively.
    pub fn notify(&self, key: &str) {
        let mut observer = self.observer.borrow_mut();
        let mut pending = vec![key.to_string()];
        let mut seen = HashSet::new();
        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(dependents) = observer.map.get(&current).cloned() else {
                continue;
            };
            for dependent in dependents {
                observer.cache.remove(&dependent);
                pending.push(dependent);
            }
        }
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.observer.borrow().cache.contains_key(key)
    }

    /// Computed keys currently registered as depending on `key`.
    pub fn dependents(&self, key: &str) -> Vec<String> {
        let observer = self.observer.borrow();
        let mut out: Vec<String> = observer
            .map
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        out.sort();
        out
    }

    pub fn data(&self) -> Ref<'_, Map<String, Value>> {
        self.data.borrow()
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("data", &self.data.borrow())
            .field("computed", &self.computed.borrow().keys().collect::<Vec<_>>())
            .field("observer", &self.observer.borrow())
            .finish()
    }
}

fn step_mut<'v>(cur: &'v mut Value, segment: &str, path: &str) -> Result<&'v mut Value, StoreError> {
    let missing = || StoreError::PathNotFound {
        path: path.to_string(),
    };
    match cur {
        Value::Object(map) => map.get_mut(segment).ok_or_else(missing),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get_mut(i))
            .ok_or_else(missing),
        _ => Err(StoreError::NotAContainer {
            path: path.to_string(),
            segment: segment.to_string(),
        }),
    }
}

fn assign(cur: &mut Value, segment: &str, value: Value, path: &str) -> Result<(), StoreError> {
    match cur {
        Value::Object(map) => {
            map.insert(segment.to_string(), value);
            Ok(())
        }
        Value::Array(items) => {
            let index = segment.parse::<usize>().map_err(|_| StoreError::PathNotFound {
                path: path.to_string(),
            })?;
            if index < items.len() {
                items[index] = value;
            } else if index == items.len() {
                items.push(value);
            } else {
                return Err(StoreError::PathNotFound {
                    path: path.to_string(),
                });
            }
            Ok(())
        }
        _ => Err(StoreError::NotAContainer {
            path: path.to_string(),
            segment: segment.to_string(),
        }),
    }
}
