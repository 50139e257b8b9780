use spark_bind::{
    batch, cloned, computed, display_string, Attributes, ComputedDefinition, Error, Store,
};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

fn text(store: &Store, key: &str) -> String {
    display_string(&store.get(key))
}

fn changes(pairs: &[(&str, serde_json::Value)]) -> Attributes {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

/// Records every key a topic fires for.
fn watch(store: &Store, topic: &str) -> (Rc<RefCell<Vec<String>>>, spark_bind::Subscription) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sub = store.on_change(topic, {
        let log = log.clone();
        move |event| log.borrow_mut().extend(event.keys().iter().cloned())
    });
    (log, sub)
}

#[test]
fn declaration_order_does_not_matter() {
    // paymentLabel reads two computeds declared after it
    let store = Store::builder()
        .defaults(json!({"firstName": "Charlie", "lastName": "Brown", "payment": 100}))
        .computed(
            "paymentLabel",
            computed!(s => json!(format!("{} paid {}", text(s, "fullName"), text(s, "paymentCurrency")))),
        )
        .computed(
            "fullName",
            computed!(s => json!(format!("{} {}", text(s, "firstName"), text(s, "lastName")))),
        )
        .computed("paymentCurrency", computed!(s => json!(format!("${}", text(s, "payment")))))
        .build();

    assert_eq!(store.get("paymentLabel"), json!("Charlie Brown paid $100"));

    store.set("payment", json!(150)).unwrap();
    assert_eq!(store.get("paymentLabel"), json!("Charlie Brown paid $150"));
}

#[test]
fn no_staleness_after_dependency_writes() {
    let store = Store::new(json!({"a": 1, "b": 2}));
    store.add_computed("sum", computed!(s => json!(s.get("a").as_i64().unwrap_or(0) + s.get("b").as_i64().unwrap_or(0))));
    store.add_computed("double", computed!(s => json!(s.get("sum").as_i64().unwrap_or(0) * 2)));

    for value in 0..5 {
        store.set("a", json!(value)).unwrap();
        assert_eq!(store.get("double"), json!((value + 2) * 2));
    }
}

#[test]
fn chained_computed_fires_exactly_once() {
    let store = Store::new(json!({"first": "Charlie", "last": "Brown"}));
    store.add_computed(
        "full",
        computed!(s => json!(format!("{} {}", text(s, "first"), text(s, "last")))),
    );
    store.add_computed("shout", computed!(s => json!(text(s, "full").to_uppercase())));
    let _ = store.get("shout");

    let (full_log, _a) = watch(&store, "full");
    let (shout_log, _b) = watch(&store, "shout");

    store
        .set_attributes(changes(&[("first", json!("Sally")), ("last", json!("Black"))]))
        .unwrap();

    assert_eq!(*full_log.borrow(), vec!["full"]);
    assert_eq!(*shout_log.borrow(), vec!["shout"]);
    assert_eq!(store.get("shout"), json!("SALLY BLACK"));
}

#[test]
fn equal_recomputation_stays_quiet() {
    let store = Store::new(json!({"n": 2}));
    store.add_computed("even", computed!(s => json!(s.get("n").as_i64().unwrap_or(0) % 2 == 0)));
    let _ = store.get("even");
    let (log, _sub) = watch(&store, "even");

    store.set("n", json!(4)).unwrap();
    assert!(log.borrow().is_empty());

    store.set("n", json!(5)).unwrap();
    assert_eq!(*log.borrow(), vec!["even"]);
}

#[test]
fn manual_deps_cover_unread_branches() {
    let store = Store::new(json!({"useNick": false, "name": "Charles", "nick": "Chuck"}));
    store.add_computed(
        "display",
        ComputedDefinition::getter(|s, _| {
            if s.get("useNick").as_bool().unwrap_or(false) {
                s.get("nick")
            } else {
                s.get("name")
            }
        })
        .with_deps(["nick"]),
    );
    assert_eq!(store.get("display"), json!("Charles"));

    // `nick` is never read on this branch, but is declared
    assert!(
        store
            .computed("display")
            .is_some_and(|cell| cell.dependencies().iter().any(|dep| dep.key() == "nick"))
    );

    store.set("useNick", json!(true)).unwrap();
    assert_eq!(store.get("display"), json!("Chuck"));
    store.set("nick", json!("Charlie")).unwrap();
    assert_eq!(store.get("display"), json!("Charlie"));
}

#[test]
fn manual_dep_values_are_passed_in_order() {
    let store = Store::new(json!({"a": "x", "b": "y"}));
    store.add_computed(
        "joined",
        ComputedDefinition::getter(|_, args| {
            json!(args.iter().map(display_string).collect::<Vec<_>>().join("+"))
        })
        .with_deps(["b", "a"]),
    );
    assert_eq!(store.get("joined"), json!("y+x"));
}

#[test]
fn setter_round_trip() {
    let store = Store::new(json!({"payment": 100}));
    store.add_computed(
        "paymentCurrency",
        ComputedDefinition::getter(|s, _| json!(format!("${}", text(s, "payment")))).with_setter(
            |_, value| {
                let amount: i64 = display_string(&value).trim_start_matches('$').parse().ok()?;
                Some(changes(&[("payment", json!(amount))]))
            },
        ),
    );

    store.set("paymentCurrency", json!("$200")).unwrap();
    assert_eq!(store.get("payment"), json!(200));
    assert_eq!(store.get("paymentCurrency"), json!("$200"));
}

#[test]
fn setters_may_target_other_computeds() {
    let store = Store::new(json!({"cents": 0}));
    store.add_computed(
        "dollars",
        ComputedDefinition::getter(|s, _| json!(s.get("cents").as_i64().unwrap_or(0) / 100))
            .with_setter(|_, value| {
                Some(changes(&[("cents", json!(value.as_i64().unwrap_or(0) * 100))]))
            }),
    );
    store.add_computed(
        "label",
        ComputedDefinition::getter(|s, _| json!(format!("${}", text(s, "dollars")))).with_setter(
            |_, value| {
                let dollars: i64 = display_string(&value).trim_start_matches('$').parse().ok()?;
                Some(changes(&[("dollars", json!(dollars))]))
            },
        ),
    );

    store.set("label", json!("$7")).unwrap();
    assert_eq!(store.get("cents"), json!(700));
    assert_eq!(store.get("label"), json!("$7"));
}

#[test]
fn circular_setters_fail_without_hanging() {
    let store = Store::default();
    store.add_computed(
        "a",
        ComputedDefinition::getter(|_, _| json!(null))
            .with_setter(|_, value| Some(changes(&[("b", value)]))),
    );
    store.add_computed(
        "b",
        ComputedDefinition::getter(|_, _| json!(null))
            .with_setter(|_, value| Some(changes(&[("a", value)]))),
    );

    assert_eq!(
        store.set("a", json!(1)),
        Err(Error::CircularSetter {
            name: "a".into(),
            path: "a -> b -> a".into()
        })
    );

    // The path was cleared, so the next write starts a fresh one
    assert!(matches!(
        store.set("b", json!(1)),
        Err(Error::CircularSetter { ref path, .. }) if path == "b -> a -> b"
    ));
}

#[test]
fn cross_store_dependencies_refire() {
    let profile = Store::new(json!({"name": "Charlie"}));
    let greeting = Store::default();
    greeting.add_computed(
        "text",
        ComputedDefinition::getter(cloned!(profile => move |_: &Store, _: &[serde_json::Value]| {
            json!(format!("Hello {}", text(&profile, "name")))
        })),
    );
    assert_eq!(greeting.get("text"), json!("Hello Charlie"));

    let (log, _sub) = watch(&greeting, "text");
    profile.set("name", json!("Lucy")).unwrap();

    assert_eq!(*log.borrow(), vec!["text"]);
    assert_eq!(greeting.get("text"), json!("Hello Lucy"));
}

#[test]
fn modify_array_on_non_array_is_inert() {
    let store = Store::new(json!({"name": "Charlie", "list": [3, 1, 2]}));
    let (log, _sub) = watch(&store, "*");

    store.modify_array("name", "push", &[json!("x")]).unwrap();
    store.modify_array("list", "explode", &[]).unwrap();
    assert_eq!(store.get("name"), json!("Charlie"));
    assert!(log.borrow().is_empty());

    store.modify_array("list", "sort", &[]).unwrap();
    store.modify_array("list", "splice", &[json!(1), json!(1)]).unwrap();
    assert_eq!(store.get("list"), json!([1, 3]));
    assert_eq!(*log.borrow(), vec!["list", "list"]);
}

#[test]
fn batched_writes_settle_once() {
    let store = Store::new(json!({"a": 1, "b": 1}));
    store.add_computed("sum", computed!(s => json!(s.get("a").as_i64().unwrap_or(0) + s.get("b").as_i64().unwrap_or(0))));
    let _ = store.get("sum");
    let fired = Rc::new(Cell::new(0));
    let _sub = store.on_change("sum", {
        let fired = fired.clone();
        move |_| fired.set(fired.get() + 1)
    });

    batch(|| {
        store.set("a", json!(10)).unwrap();
        store.set("b", json!(20)).unwrap();
        // Reads inside the batch are already current
        assert_eq!(store.get("sum"), json!(30));
    });
    assert_eq!(fired.get(), 1);
}

#[test]
fn clear_computeds_releases_foreign_subscriptions() {
    let source = Store::new(json!({"x": 1}));
    let derived = Store::default();
    derived.add_computed(
        "copy",
        ComputedDefinition::getter(cloned!(source => move |_: &Store, _: &[serde_json::Value]| source.get("x"))),
    );
    let _ = derived.get("copy");
    assert!(source.observer_count() > 0);

    derived.clear_computeds();
    assert_eq!(source.observer_count(), 0);
    assert!(!derived.has_computed("copy"));
    assert_eq!(derived.to_json(true), Attributes::new());
}

#[test]
fn to_json_optionally_includes_computeds() {
    let store = Store::new(json!({"a": 1}));
    store.add_computed("b", computed!(s => json!(s.get("a").as_i64().unwrap_or(0) + 1)));

    assert_eq!(serde_json::Value::Object(store.to_json(false)), json!({"a": 1}));
    assert_eq!(serde_json::Value::Object(store.to_json(true)), json!({"a": 1, "b": 2}));
}

#[test]
fn computed_over_native_attribute_replaces_it() {
    let store = Store::new(json!({"label": "plain"}));
    let (log, _sub) = watch(&store, "label");
    store.add_computed("label", computed!(_s => json!("derived")));

    assert!(!store.has_attribute("label"));
    assert_eq!(store.get("label"), json!("derived"));
    assert_eq!(*log.borrow(), vec!["label"]);
}

#[test]
fn listeners_on_unread_computeds_fire() {
    let store = Store::new(json!({"firstName": "Charlie", "lastName": "Brown"}));
    store.add_computed(
        "fullName",
        computed!(s => json!(format!("{} {}", text(s, "firstName"), text(s, "lastName")))),
    );

    // Nothing has read fullName yet
    let (named, _a) = watch(&store, "fullName");
    let (any, _b) = watch(&store, "*");

    store.set("lastName", json!("Black")).unwrap();
    assert_eq!(*named.borrow(), vec!["fullName"]);
    assert_eq!(*any.borrow(), vec!["lastName", "fullName"]);
}

#[test]
fn computeds_added_after_a_listener_fire() {
    let store = Store::new(json!({"n": 1}));
    let (any, _sub) = watch(&store, "*");
    store.add_computed("double", computed!(s => json!(s.get("n").as_i64().unwrap_or(0) * 2)));
    // Declared later, read by `label` before it existed
    store.add_computed("label", computed!(s => json!(format!("{}!", text(s, "triple")))));
    store.add_computed("triple", computed!(s => json!(s.get("n").as_i64().unwrap_or(0) * 3)));
    assert_eq!(store.get("label"), json!("3!"));
    any.borrow_mut().clear();

    store.set("n", json!(2)).unwrap();
    let mut fired = any.borrow().clone();
    fired.sort();
    assert_eq!(fired, vec!["double", "label", "n", "triple"]);
    assert_eq!(store.get("label"), json!("6!"));
}

#[test]
fn failed_setter_chain_leaves_no_stale_path() {
    let store = Store::new(json!({"aa": 0, "plain": 0}));
    store.add_computed(
        "b",
        ComputedDefinition::getter(|_, _| json!(null))
            .with_setter(|_, value| Some(changes(&[("c", value)]))),
    );
    store.add_computed(
        "c",
        ComputedDefinition::getter(|_, _| json!(null)).with_setter(|_, value| {
            // 1 loops back into `b`; anything else lands on `plain`
            if value == json!(1) {
                Some(changes(&[("b", value)]))
            } else {
                Some(changes(&[("plain", value)]))
            }
        }),
    );

    let outcome = Rc::new(RefCell::new(None));
    let _sub = store.on_change("aa", {
        let outcome = outcome.clone();
        let weak = store.downgrade();
        move |_| {
            if let Some(store) = weak.upgrade() {
                *outcome.borrow_mut() = Some(store.set("b", json!(5)));
            }
        }
    });

    let result = store.set_attributes(changes(&[("aa", json!(1)), ("b", json!(1))]));
    assert!(matches!(result, Err(Error::CircularSetter { ref path, .. }) if path == "b -> c -> b"));

    // The listener ran in the same flush and wrote through `b` cleanly
    assert_eq!(*outcome.borrow(), Some(Ok(())));
    assert_eq!(store.get("plain"), json!(5));
}
