use std::cell::{Cell, RefCell};
use std::rc::Rc;

use orbit_dom::{Document, DomEvent, Listener, ListenerError, MemoryDocument, dispatch};
use serde_json::json;

#[test]
fn dispatch_bubbles_and_counts_invocations() {
    let doc = MemoryDocument::shared();
    let hits = Rc::new(Cell::new(0));
    let (outer, inner) = {
        let mut d = doc.borrow_mut();
        let outer = d.create_element("div", false);
        let inner = d.create_element("button", false);
        d.append_child(outer, inner);
        for node in [outer, inner] {
            let hits = hits.clone();
            d.add_event_listener(
                node,
                "click",
                Listener::new(move |_| {
                    hits.set(hits.get() + 1);
                    Ok(())
                }),
            );
        }
        (outer, inner)
    };

    let mut event = DomEvent::new("click");
    assert_eq!(dispatch(&doc, inner, &mut event).unwrap(), 2);
    assert_eq!(hits.get(), 2);
    assert_eq!(event.target, Some(inner));

    let mut event = DomEvent::new("click");
    assert_eq!(dispatch(&doc, outer, &mut event).unwrap(), 1);
    assert_eq!(dispatch(&doc, outer, &mut DomEvent::new("input")).unwrap(), 0);
}

#[test]
fn stop_propagation_halts_bubbling() {
    let doc = MemoryDocument::shared();
    let (outer, inner) = {
        let mut d = doc.borrow_mut();
        let outer = d.create_element("div", false);
        let inner = d.create_element("a", false);
        d.append_child(outer, inner);
        d.add_event_listener(
            inner,
            "click",
            Listener::new(|e| {
                e.stop_propagation();
                Ok(())
            }),
        );
        d.add_event_listener(outer, "click", Listener::new(|_| Err(ListenerError::new("click", "reached"))));
        (outer, inner)
    };
    assert_eq!(dispatch(&doc, inner, &mut DomEvent::new("click")).unwrap(), 1);
    assert!(dispatch(&doc, outer, &mut DomEvent::new("click")).is_err());
}

#[test]
fn event_reads_form_state_from_the_target() {
    let doc = MemoryDocument::shared();
    let seen = Rc::new(RefCell::new(None));
    let input = {
        let mut d = doc.borrow_mut();
        let input = d.create_element("input", false);
        d.set_property(input, "value", json!("typed"));
        let seen = seen.clone();
        d.add_event_listener(
            input,
            "input",
            Listener::new(move |e| {
                *seen.borrow_mut() = e.value.clone();
                Ok(())
            }),
        );
        input
    };
    dispatch(&doc, input, &mut DomEvent::new("input")).unwrap();
    assert_eq!(*seen.borrow(), Some(json!("typed")));
}
