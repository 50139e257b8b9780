// ============================================================================
// spark-bind - Computed Properties and Declarative DOM Bindings
// ============================================================================
//
// Two layers. The reactive layer is a key/value `Store` with computed
// properties: getters whose dependencies are discovered as they run, cached
// until an input changes, optionally writable through setters. The binding
// layer wires an element tree to stores and collections from declarations
// such as `data-bind="text:fullName, toggle:active"`.
// ============================================================================

pub mod binding;
pub mod collections;
pub mod core;
pub mod primitives;
pub mod reactivity;

mod macros;

// Re-export core items at crate root for ergonomic access
pub use core::constants;
pub use core::context::{is_batching, is_tracking};
pub use core::error::{Error, Result};
pub use core::types::{as_number, display_string, is_truthy, number, Attributes, StoreId, Value};

// Re-export primitives
pub use primitives::array::ArrayOp;
pub use primitives::computed::{ComputedCell, ComputedDefinition, Getter, Setter};
pub use primitives::store::{ChangeEvent, Store, StoreBuilder, WeakStore};

// Re-export reactivity functions
pub use reactivity::batching::{batch, flush};
pub use reactivity::subscription::Subscription;
pub use reactivity::tracking::{track, untrack, DependencyRef};

// Re-export collections
pub use collections::{Collection, CollectionEvent, ItemViewFactory};

// Re-export the binding entry points
pub use binding::{Bindings, Dom, ElementId, MemoryDom, View, ViewOptions};

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use binding::El;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn text(store: &Store, key: &str) -> String {
        display_string(&store.get(key))
    }

    fn charlie_brown() -> Store {
        let store = Store::new(json!({"firstName": "Charlie", "lastName": "Brown", "payment": 100}));
        store.add_computed(
            "fullName",
            ComputedDefinition::getter(|s, _| {
                json!(format!("{} {}", text(s, "firstName"), text(s, "lastName")))
            }),
        );
        store.add_computed(
            "paymentCurrency",
            ComputedDefinition::getter(|s, _| json!(format!("${}", text(s, "payment"))))
                .with_setter(|_, value| {
                    let amount = display_string(&value).trim_start_matches('$').parse::<i64>().ok()?;
                    let mut changes = Attributes::new();
                    changes.insert("payment".into(), json!(amount));
                    Some(changes)
                }),
        );
        store
    }

    // =========================================================================
    // Reactive layer
    // =========================================================================

    #[test]
    fn charlie_brown_pays_two_hundred() {
        let store = charlie_brown();
        assert_eq!(store.get("fullName"), json!("Charlie Brown"));

        store.set("lastName", json!("Black")).unwrap();
        assert_eq!(store.get("fullName"), json!("Charlie Black"));

        store.set("paymentCurrency", json!("$200")).unwrap();
        assert_eq!(store.get("payment"), json!(200));
        assert_eq!(store.get("paymentCurrency"), json!("$200"));
    }

    #[test]
    fn setter_returning_none_leaves_the_store_alone() {
        let store = charlie_brown();
        store.set("paymentCurrency", json!("not money")).unwrap();
        assert_eq!(store.get("payment"), json!(100));
    }

    #[test]
    fn derived_change_fires_once_per_settled_write() {
        let store = charlie_brown();
        let _ = store.get("fullName");
        let fired = Rc::new(RefCell::new(Vec::new()));
        let _sub = store.on_change("fullName", {
            let fired = fired.clone();
            move |event| fired.borrow_mut().push(event.key().to_string())
        });

        let mut changes = Attributes::new();
        changes.insert("firstName".into(), json!("Sally"));
        changes.insert("lastName".into(), json!("Black"));
        store.set_attributes(changes).unwrap();

        assert_eq!(*fired.borrow(), vec!["fullName"]);
        assert_eq!(store.get("fullName"), json!("Sally Black"));
    }

    #[test]
    fn read_only_computed_rejects_writes() {
        let store = charlie_brown();
        assert_eq!(
            store.set("fullName", json!("Linus")),
            Err(Error::ReadOnlyProperty {
                name: "fullName".into()
            })
        );
    }

    #[test]
    fn macros_build_definitions() {
        let store = Store::new(json!({"a": 2, "b": 5}));
        store.add_computed("sum", computed!(s => json!(s.get("a").as_i64().unwrap_or(0) + s.get("b").as_i64().unwrap_or(0))));
        store.add_computed("picked", computed!(s, [a] => a.clone()));
        assert_eq!(store.get("sum"), json!(7));
        assert_eq!(store.get("picked"), json!(2));
        assert_eq!(
            store.computed("picked").map(|cell| cell.manual_deps().to_vec()),
            Some(vec!["a".to_string()])
        );
    }

    // =========================================================================
    // Binding layer
    // =========================================================================

    fn option_labels(dom: &MemoryDom, select: ElementId) -> Vec<String> {
        dom.children(select).into_iter().map(|option| dom.text(option)).collect()
    }

    #[test]
    fn options_default_and_empty_placeholders() {
        let dom = Rc::new(MemoryDom::new());
        let root = dom.build(El::new("select").bind(
            "value:selected, options:choices, optionsDefault:placeholder, optionsEmpty:'Nothing here'",
        ));
        let model = Store::new(json!({
            "selected": "b",
            "choices": [
                {"label": "Alpha", "value": "a"},
                {"label": "Bravo", "value": "b"},
                {"label": "Charlie", "value": "c"},
            ],
            "placeholder": {"label": "Pick one", "value": ""},
        }));
        let view = View::new(dom.clone(), root, ViewOptions::new().model(model.clone())).unwrap();

        assert_eq!(option_labels(&dom, root), vec!["Pick one", "Alpha", "Bravo", "Charlie"]);
        assert_eq!(dom.value(root), "b");

        // Empty list with a default: only the default remains
        model.set("choices", json!([])).unwrap();
        assert_eq!(option_labels(&dom, root), vec!["Pick one"]);
        assert!(!dom.disabled(root));
        assert_eq!(model.get("selected"), json!(""));

        // Without a default the empty placeholder shows and disables the select
        model.set("placeholder", json!(null)).unwrap();
        assert_eq!(option_labels(&dom, root), vec!["Nothing here"]);
        assert!(dom.disabled(root));

        view.dispose();
        assert_eq!(model.listener_count(), 0);
    }

    #[test]
    fn computed_properties_drive_bindings() {
        let dom = Rc::new(MemoryDom::new());
        let root = dom.build(
            El::new("div")
                .child(El::new("span").bind("text:fullName"))
                .child(El::new("input").bind("value:paymentCurrency")),
        );
        let model = charlie_brown();
        let _view = View::new(dom.clone(), root, ViewOptions::new().model(model.clone())).unwrap();
        let children = dom.children(root);
        let (label, input) = (children[0], children[1]);

        assert_eq!(dom.text(label), "Charlie Brown");
        assert_eq!(dom.value(input), "$100");

        dom.set_value(input, "$250");
        dom.trigger(input, "change");
        assert_eq!(model.get("payment"), json!(250));

        model.set("firstName", json!("Sally")).unwrap();
        assert_eq!(dom.text(label), "Sally Brown");
    }
}
