// ============================================================================
// spark-bind - Ergonomic Macros
// ============================================================================

/// Helper macro to clone variables into a move closure.
///
/// Saves cloning `Store` or `Rc` handles by hand before moving them into a
/// getter or listener.
///
/// # Usage
///
/// ```rust
/// use spark_bind::{cloned, ComputedDefinition, Store};
/// use serde_json::json;
///
/// let prices = Store::new(json!({"unit": 3}));
/// let order = Store::new(json!({"quantity": 4}));
///
/// // The total lives on `order` but also reads `prices`
/// order.add_computed(
///     "total",
///     ComputedDefinition::getter(cloned!(prices => move |order: &Store, _: &[serde_json::Value]| {
///         json!(order.get("quantity").as_i64().unwrap_or(0) * prices.get("unit").as_i64().unwrap_or(0))
///     })),
/// );
/// assert_eq!(order.get("total"), json!(12));
/// ```
#[macro_export]
macro_rules! cloned {
    ($($n:ident),+ => $e:expr) => {
        {
            $( let $n = $n.clone(); )+
            $e
        }
    };
}

/// Build a getter-only [`ComputedDefinition`](crate::ComputedDefinition).
///
/// `store => expr` reads through `store`. Listing names in brackets declares
/// them as manual dependencies and binds each one's current value.
///
/// # Usage
///
/// ```rust
/// use spark_bind::{computed, Store};
/// use serde_json::json;
///
/// let person = Store::new(json!({"first": "Charlie", "last": "Brown", "nick": null}));
/// person.add_computed(
///     "full",
///     computed!(s => json!(format!("{} {}", s.get("first").as_str().unwrap_or(""), s.get("last").as_str().unwrap_or("")))),
/// );
/// person.add_computed("label", computed!(s, [nick, full] => {
///     if nick.is_null() { full.clone() } else { nick.clone() }
/// }));
///
/// assert_eq!(person.get("label"), json!("Charlie Brown"));
/// person.set("nick", json!("Chuck")).unwrap();
/// assert_eq!(person.get("label"), json!("Chuck"));
/// ```
#[macro_export]
macro_rules! computed {
    // Case 1: With manual dependencies
    ($store:ident, [$($dep:ident),+] => $body:expr) => {
        $crate::ComputedDefinition::getter(
            move |$store: &$crate::Store, args: &[$crate::Value]| {
                let _ = $store;
                let [$($dep),+] = args else {
                    return $crate::Value::Null;
                };
                $body
            },
        )
        .with_deps([$(stringify!($dep)),+])
    };
    // Case 2: Automatic dependencies only
    ($store:ident => $body:expr) => {
        $crate::ComputedDefinition::getter(move |$store: &$crate::Store, _: &[$crate::Value]| $body)
    };
}
