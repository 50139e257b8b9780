//! Property-based invariant tests for stores, computed properties, array
//! edits and the binding declaration parser.
//!
//! 1. A computed chain never serves a stale value after any write sequence.
//! 2. A computed fires a change exactly when its value changes.
//! 3. `modify_array` agrees with a plain `Vec` model and fires only on change.
//! 4. The declaration parser never panics on arbitrary input.
//! 5. Well-formed declaration lists parse back to their parts, in order.

use proptest::prelude::*;
use serde_json::json;
use spark_bind::binding::{parse_declarations, Expr};
use spark_bind::{computed, Store};
use std::cell::Cell;
use std::rc::Rc;

// ── Helpers ─────────────────────────────────────────────────────────────

const KEYS: [&str; 3] = ["a", "b", "c"];

fn int(store: &Store, key: &str) -> i64 {
    store.get(key).as_i64().unwrap_or(0)
}

fn counter(store: &Store, topic: &str) -> (Rc<Cell<usize>>, spark_bind::Subscription) {
    let fired = Rc::new(Cell::new(0));
    let sub = store.on_change(topic, {
        let fired = fired.clone();
        move |_| fired.set(fired.get() + 1)
    });
    (fired, sub)
}

fn writes_strategy() -> impl Strategy<Value = Vec<(usize, i64)>> {
    proptest::collection::vec((0..KEYS.len(), -20i64..20), 1..40)
}

#[derive(Debug, Clone)]
enum Edit {
    Push(i64),
    Pop,
    Shift,
    Unshift(i64),
    Reverse,
    Splice(i64, usize),
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0i64..5).prop_map(Edit::Push),
        Just(Edit::Pop),
        Just(Edit::Shift),
        (0i64..5).prop_map(Edit::Unshift),
        Just(Edit::Reverse),
        (-4i64..6, 0usize..3).prop_map(|(start, count)| Edit::Splice(start, count)),
    ]
}

impl Edit {
    fn apply(&self, store: &Store) {
        let result = match self {
            Self::Push(v) => store.modify_array("list", "push", &[json!(v)]),
            Self::Pop => store.modify_array("list", "pop", &[]),
            Self::Shift => store.modify_array("list", "shift", &[]),
            Self::Unshift(v) => store.modify_array("list", "unshift", &[json!(v)]),
            Self::Reverse => store.modify_array("list", "reverse", &[]),
            Self::Splice(start, count) => {
                store.modify_array("list", "splice", &[json!(start), json!(count)])
            }
        };
        result.unwrap();
    }

    fn model(&self, items: &mut Vec<i64>) {
        match self {
            Self::Push(v) => items.push(*v),
            Self::Pop => {
                items.pop();
            }
            Self::Shift => {
                if !items.is_empty() {
                    items.remove(0);
                }
            }
            Self::Unshift(v) => items.insert(0, *v),
            Self::Reverse => items.reverse(),
            Self::Splice(start, count) => {
                let len = items.len() as i64;
                let start = if *start < 0 { (len + start).max(0) } else { (*start).min(len) } as usize;
                let end = (start + count).min(items.len());
                items.drain(start..end);
            }
        }
    }
}

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z]{0,8}"
}

fn property_strategy() -> impl Strategy<Value = String> {
    // The `p` prefix keeps clear of the `true`/`false`/`null` literals
    "p[a-zA-Z0-9_]{0,8}"
}

// ═════════════════════════════════════════════════════════════════════════
// 1. No staleness
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn computed_chain_is_never_stale(writes in writes_strategy()) {
        let store = Store::new(json!({"a": 0, "b": 0, "c": 0}));
        store.add_computed("sum", computed!(s => json!(int(s, "a") + int(s, "b") + int(s, "c"))));
        store.add_computed("double", computed!(s => json!(int(s, "sum") * 2)));
        let mut model = [0i64; 3];

        for (index, value) in writes {
            store.set(KEYS[index], json!(value)).unwrap();
            model[index] = value;
            let expected: i64 = model.iter().sum();
            prop_assert_eq!(store.get("sum"), json!(expected));
            prop_assert_eq!(store.get("double"), json!(expected * 2));
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Change events track value changes
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn computed_fires_only_on_value_change(writes in writes_strategy()) {
        let store = Store::new(json!({"a": 0, "b": 0, "c": 0}));
        store.add_computed(
            "even",
            computed!(s => json!((int(s, "a") + int(s, "b") + int(s, "c")) % 2 == 0)),
        );
        let _ = store.get("even");
        let (fired, _sub) = counter(&store, "even");

        let mut model = [0i64; 3];
        let mut flips = 0;
        for (index, value) in writes {
            let before = model.iter().sum::<i64>() % 2 == 0;
            model[index] = value;
            let after = model.iter().sum::<i64>() % 2 == 0;
            flips += usize::from(before != after);

            store.set(KEYS[index], json!(value)).unwrap();
            prop_assert_eq!(fired.get(), flips);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Array edits
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn modify_array_matches_vec_model(
        initial in proptest::collection::vec(0i64..5, 0..6),
        edits in proptest::collection::vec(edit_strategy(), 1..30),
    ) {
        let store = Store::new(json!({"list": initial.clone()}));
        let (fired, _sub) = counter(&store, "list");
        let mut model = initial;
        let mut changes = 0;

        for edit in edits {
            let before = model.clone();
            edit.model(&mut model);
            changes += usize::from(before != model);

            edit.apply(&store);
            prop_assert_eq!(store.get("list"), json!(model.clone()), "after {:?}", edit);
            prop_assert_eq!(fired.get(), changes);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Parser robustness
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn parser_never_panics(source in "\\PC{0,64}") {
        let _ = parse_declarations(&source);
    }

    #[test]
    fn parser_never_panics_on_binding_alphabet(source in "[a-z:,()\\[\\]{}'$ ]{0,48}") {
        let _ = parse_declarations(&source);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Well-formed declarations
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn declaration_lists_parse_in_order(
        pairs in proptest::collection::vec((name_strategy(), property_strategy()), 1..6),
        spaced in any::<bool>(),
    ) {
        let separator = if spaced { " , " } else { "," };
        let source = pairs
            .iter()
            .map(|(kind, property)| format!("{kind}:{property}"))
            .collect::<Vec<_>>()
            .join(separator);

        let declarations = parse_declarations(&source).unwrap();
        prop_assert_eq!(declarations.len(), pairs.len());
        for (declaration, (kind, property)) in declarations.iter().zip(&pairs) {
            prop_assert_eq!(&declaration.kind, kind);
            prop_assert_eq!(&declaration.expr, &Expr::Property(property.clone()));
        }
    }
}
