//! Structural behavior of the registry as seen through the public API only.

#![allow(clippy::indexing_slicing, reason = "panic is fine in tests")]

use std::iter;

use simons::{Error, Registry, SimonHandle, SimonKind, SimonPattern, SimonState};

/// Every Simon's effective flag follows from its own state and its parent's flag.
fn assert_enabled_flags_consistent(registry: &Registry) {
    for simon in registry.simons(None) {
        let expected = match (simon.state(), registry.parent(&simon)) {
            (SimonState::Enabled, _) => true,
            (SimonState::Disabled, _) => false,
            (SimonState::Inherit, Some(parent)) => parent.is_enabled(),
            (SimonState::Inherit, None) => panic!("the root never inherits"),
        };

        assert_eq!(
            simon.is_enabled(),
            expected,
            "{simon} has the wrong effective state"
        );
    }
}

#[test]
fn deep_name_creates_whole_chain() {
    let registry = Registry::new();

    let counter = registry.counter("org.example.app.requests").unwrap();

    assert_eq!(
        registry.names(),
        vec![
            "",
            "org",
            "org.example",
            "org.example.app",
            "org.example.app.requests"
        ]
    );

    let chain: Vec<SimonHandle> =
        iter::successors(Some(SimonHandle::from(&counter)), |simon| registry.parent(simon))
            .collect();

    assert_eq!(chain.len(), 5);
    assert!(chain[4].ptr_eq(&registry.root()));
}

#[test]
fn upgrading_placeholder_keeps_children_attached() {
    let registry = Registry::new();
    let reads = registry.counter("db.reads").unwrap();
    let writes = registry.counter("db.writes").unwrap();

    let db = registry.stopwatch("db").unwrap();

    let children = registry.children(&db);
    assert_eq!(children.len(), 2);
    assert!(children[0].as_counter().is_some_and(|c| c.ptr_eq(&reads)));
    assert!(children[1].as_counter().is_some_and(|c| c.ptr_eq(&writes)));
    assert!(
        registry
            .parent(&reads)
            .and_then(|parent| parent.as_stopwatch().cloned())
            .is_some_and(|parent| parent.ptr_eq(&db))
    );
}

#[test]
fn kind_is_fixed_once_concrete() {
    let registry = Registry::new();
    registry.stopwatch("job").unwrap();

    assert!(matches!(
        registry.counter("job"),
        Err(Error::KindConflict { .. })
    ));
    assert_eq!(
        registry.get_or_create("job", SimonKind::Unknown).unwrap().kind(),
        SimonKind::Stopwatch
    );
}

#[test]
fn malformed_input_is_rejected() {
    let registry = Registry::new();

    assert!(matches!(
        registry.counter("not valid"),
        Err(Error::InvalidName { .. })
    ));
    assert!(matches!(
        registry.stopwatch(""),
        Err(Error::RootSimonMisuse { .. })
    ));
    assert!(matches!(
        SimonPattern::new("a*b*c"),
        Err(Error::InvalidPattern { .. })
    ));
    assert!(registry.is_empty());
}

#[test]
fn state_changes_keep_flags_consistent() {
    let registry = Registry::new();
    for name in ["a.b.c", "a.b.d", "a.e", "f.g"] {
        registry.counter(name).unwrap();
    }

    let steps: &[(&str, SimonState, bool)] = &[
        ("a", SimonState::Disabled, false),
        ("a.b.c", SimonState::Enabled, false),
        ("", SimonState::Disabled, false),
        ("a.b", SimonState::Enabled, false),
        ("a", SimonState::Inherit, false),
        ("", SimonState::Enabled, false),
        ("a.b.d", SimonState::Disabled, false),
        ("a", SimonState::Disabled, true),
        ("f", SimonState::Disabled, false),
        ("f.g", SimonState::Inherit, false),
        ("", SimonState::Disabled, true),
        ("", SimonState::Enabled, false),
    ];

    for (name, state, overrule) in steps {
        let simon = registry.get(name).unwrap();
        registry.set_state(&simon, *state, *overrule).unwrap();

        assert_enabled_flags_consistent(&registry);
    }

    // The final overrule from the root left every descendant inheriting.
    for simon in registry.simons(None) {
        if simon.name() != Some("") {
            assert_eq!(simon.state(), SimonState::Inherit);
        }
        assert!(simon.is_enabled());
    }
}

#[test]
fn new_children_inherit_current_state() {
    let registry = Registry::new();
    registry
        .set_state(
            &registry.get_or_create("quiet", SimonKind::Unknown).unwrap(),
            SimonState::Disabled,
            false,
        )
        .unwrap();

    let counter = registry.counter("quiet.deep.counter").unwrap();

    counter.increase();
    assert!(!counter.is_enabled());
    assert_eq!(counter.value(), 0);
    assert_enabled_flags_consistent(&registry);
}

#[test]
fn destroy_then_recreate_yields_fresh_simon() {
    let registry = Registry::new();
    let first = registry.counter("x.y").unwrap();
    first.increase_by(10);

    registry.destroy("x.y").unwrap();
    let second = registry.counter("x.y").unwrap();

    assert!(!first.ptr_eq(&second));
    assert_ne!(first.id(), second.id());
    assert_eq!(second.value(), 0);
}

#[test]
fn destroying_inner_simon_keeps_subtree_reachable() {
    let registry = Registry::new();
    let inner = registry.counter("p").unwrap();
    let leaf = registry.counter("p.q.r").unwrap();
    registry
        .set_state(&inner, SimonState::Disabled, false)
        .unwrap();

    registry.destroy("p").unwrap();

    assert_eq!(registry.get("p").unwrap().kind(), SimonKind::Unknown);
    assert!(registry.get("p.q.r").unwrap().as_counter().is_some_and(|c| c.ptr_eq(&leaf)));
    assert!(leaf.is_enabled());
    assert_enabled_flags_consistent(&registry);
}

#[test]
fn pattern_selects_simons() {
    let registry = Registry::new();
    registry.counter("svc.a.errors").unwrap();
    registry.counter("svc.b.errors").unwrap();
    registry.stopwatch("svc.a.latency").unwrap();

    let errors = SimonPattern::new("*.errors").unwrap();
    let under_a = SimonPattern::new("svc.a.*").unwrap();
    let contains_b = SimonPattern::new("*b*").unwrap();

    let names = |pattern: &SimonPattern| -> Vec<String> {
        registry
            .simons(Some(pattern))
            .iter()
            .filter_map(|simon| simon.name().map(str::to_string))
            .collect()
    };

    assert_eq!(names(&errors), vec!["svc.a.errors", "svc.b.errors"]);
    assert_eq!(names(&under_a), vec!["svc.a.errors", "svc.a.latency"]);
    assert_eq!(names(&contains_b), vec!["svc.b", "svc.b.errors"]);
}
