use std::cell::RefCell;
use std::rc::Rc;

use orbit_core::{Scheduler, TaskError, TaskQueue};

#[derive(Debug)]
struct Boom;

impl std::fmt::Display for Boom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "boom")
    }
}

impl std::error::Error for Boom {}

#[test]
fn tasks_run_in_order_on_flush() {
    let queue = TaskQueue::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    for i in 0..3 {
        let seen = seen.clone();
        queue.defer(Box::new(move || {
            seen.borrow_mut().push(i);
            Ok(())
        }));
    }
    assert!(seen.borrow().is_empty());
    assert_eq!(queue.flush().unwrap(), 3);
    assert_eq!(&*seen.borrow(), &vec![0, 1, 2]);
    assert_eq!(queue.pending(), 0);
}

#[test]
fn tasks_queued_during_flush_are_drained() {
    let queue = Rc::new(TaskQueue::new());
    let seen = Rc::new(RefCell::new(Vec::new()));
    {
        let inner_queue = queue.clone();
        let seen = seen.clone();
        queue.defer(Box::new(move || {
            seen.borrow_mut().push("outer");
            let seen = seen.clone();
            inner_queue.defer(Box::new(move || {
                seen.borrow_mut().push("inner");
                Ok(())
            }));
            Ok(())
        }));
    }
    assert_eq!(queue.flush().unwrap(), 2);
    assert_eq!(&*seen.borrow(), &vec!["outer", "inner"]);
}

#[test]
fn failing_task_stops_the_flush() {
    let queue = TaskQueue::new();
    queue.defer(Box::new(|| Err(TaskError::new(Boom))));
    queue.defer(Box::new(|| Ok(())));
    let err = queue.flush().unwrap_err();
    assert_eq!(err.to_string(), "boom");
    assert_eq!(queue.pending(), 1);
    assert_eq!(queue.flush().unwrap(), 1);
}
