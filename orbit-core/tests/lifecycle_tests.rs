use std::cell::RefCell;
use std::rc::Rc;

use orbit_core::{Hook, Hooks};

#[test]
fn hooks_run_in_registration_order_for_their_kind() {
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(vec![]));
    let mut hooks: Hooks<&'static str> = Hooks::new();
    {
        let log = log.clone();
        hooks.on(Hook::Mounted, move |name| log.borrow_mut().push(format!("mounted {name}")));
    }
    {
        let log = log.clone();
        hooks.on(Hook::Mounted, move |name| log.borrow_mut().push(format!("again {name}")));
    }
    {
        let log = log.clone();
        hooks.on(Hook::Destroyed, move |name| log.borrow_mut().push(format!("destroyed {name}")));
    }

    hooks.run(Hook::Mounted, &"app");
    hooks.run(Hook::Updated, &"app");
    hooks.run(Hook::Destroyed, &"app");

    assert_eq!(
        &*log.borrow(),
        &vec!["mounted app", "again app", "destroyed app"]
    );
    assert!(hooks.has(Hook::Mounted));
    assert!(!hooks.has(Hook::Updated));
}
