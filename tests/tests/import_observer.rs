//! Observation of loads that go through the full resolution chain,
//! including dependency loads triggered from inside module bodies.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::json;

use regraft::{observe, Entity, FnFinder, Resolver};

fn host() -> (Rc<Resolver>, Rc<FnFinder>) {
    let resolver = Rc::new(Resolver::new());
    let finder = Rc::new(FnFinder::new());
    resolver.install_back(finder.clone());
    (resolver, finder)
}

#[test]
fn transitive_dependency_loads_are_observed() {
    let (resolver, finder) = host();
    finder.define("lib", |m| {
        m.bind("helper", Entity::Data(json!("lib")));
        Ok(())
    });
    let dep_resolver = resolver.clone();
    finder.define("app", move |m| {
        let lib = dep_resolver.load("lib")?;
        m.bind("dep", Entity::Data(json!(lib.name())));
        Ok(())
    });

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let _guard = observe(&resolver, move |m| {
        sink.borrow_mut().push(m.name().to_string())
    });

    let app = resolver.load("app").unwrap();

    // The dependency finishes loading first, so it reports first.
    assert_eq!(&*seen.borrow(), &["lib".to_string(), "app".to_string()]);
    assert_eq!(app.get("dep").unwrap().as_data(), Some(&json!("lib")));
}

#[test]
fn self_referential_load_terminates_and_fires_once() {
    let (resolver, finder) = host();
    let inner_resolver = resolver.clone();
    finder.define("selfref", move |m| {
        // A body resolving its own name gets the in-progress module
        // back instead of recursing.
        let me = inner_resolver.load("selfref")?;
        assert!(me.same_module(m));
        m.bind("done", Entity::Data(json!(true)));
        Ok(())
    });

    let fired = Rc::new(RefCell::new(0u32));
    let counter = fired.clone();
    let _guard = observe(&resolver, move |_m| *counter.borrow_mut() += 1);

    let module = resolver.load("selfref").unwrap();

    assert_eq!(*fired.borrow(), 1);
    assert_eq!(module.get("done").unwrap().as_data(), Some(&json!(true)));
}

#[test]
fn mutual_dependency_cycle_terminates() {
    let (resolver, finder) = host();
    let r_a = resolver.clone();
    finder.define("a", move |m| {
        let b = r_a.load("b")?;
        m.bind("peer", Entity::Data(json!(b.name())));
        Ok(())
    });
    let r_b = resolver.clone();
    finder.define("b", move |m| {
        // Sees the partially initialized `a` from its cache slot.
        let a = r_b.load("a")?;
        m.bind("peer", Entity::Data(json!(a.name())));
        Ok(())
    });

    let fired = Rc::new(RefCell::new(0u32));
    let counter = fired.clone();
    let _guard = observe(&resolver, move |_m| *counter.borrow_mut() += 1);

    let a = resolver.load("a").unwrap();

    assert_eq!(*fired.borrow(), 2);
    assert_eq!(a.get("peer").unwrap().as_data(), Some(&json!("b")));
    let b = resolver.module("b").unwrap();
    assert_eq!(b.get("peer").unwrap().as_data(), Some(&json!("a")));
}

#[test]
fn observer_survives_a_failing_load() {
    let (resolver, finder) = host();
    finder.define("bad", |m| {
        Err(regraft::HostError::exec(m.name(), "deliberate"))
    });
    finder.define("good", |m| {
        m.bind("ok", Entity::Data(json!(true)));
        Ok(())
    });

    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    let _guard = observe(&resolver, move |m| {
        sink.borrow_mut().push(m.name().to_string())
    });

    assert!(resolver.load("bad").is_err());
    // Failed loads never report; the chain keeps working.
    resolver.load("good").unwrap();
    assert_eq!(&*seen.borrow(), &["good".to_string()]);
    // The failed module was evicted, so a retry re-resolves it.
    assert!(resolver.module("bad").is_none());
}
