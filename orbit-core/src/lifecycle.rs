// orbit-core/src/lifecycle.rs
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    Init,
    Mounted,
    Updated,
    Destroyed,
}

type HookFn<T> = Rc<dyn Fn(&T)>;

/// Lifecycle callbacks owned by one instance. `T` is the instance handle passed back to
/// each callback.
pub struct Hooks<T> {
    hooks: HashMap<Hook, Vec<HookFn<T>>>,
}

impl<T> Hooks<T> {
    pub fn new() -> Self {
        Self {
            hooks: HashMap::new(),
        }
    }

    /// Register a callback for `hook`. Callbacks run in registration order.
    pub fn on(&mut self, hook: Hook, f: impl Fn(&T) + 'static) {
        self.hooks.entry(hook).or_default().push(Rc::new(f));
    }

    /// Builder form of [`Hooks::on`].
    pub fn with(mut self, hook: Hook, f: impl Fn(&T) + 'static) -> Self {
        self.on(hook, f);
        self
    }

    pub fn run(&self, hook: Hook, target: &T) {
        // Clone the list so a callback can't observe a half-updated table.
        let Some(list) = self.hooks.get(&hook).cloned() else {
            return;
        };
        for f in list {
            f(target);
        }
    }

    pub fn has(&self, hook: Hook) -> bool {
        self.hooks.get(&hook).is_some_and(|l| !l.is_empty())
    }
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Hooks<T> {
    fn clone(&self) -> Self {
        Self {
            hooks: self.hooks.clone(),
        }
    }
}

impl<T> fmt::Debug for Hooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<_, _> = self.hooks.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("Hooks").field("hooks", &counts).finish()
    }
}
