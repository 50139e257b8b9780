// ============================================================================
// spark-bind - Type Definitions
// Attribute values, identifiers and the value conversions bindings rely on
// ============================================================================

use std::cell::Cell;
use std::fmt;

pub use serde_json::{Map, Number, Value};

/// A set of attribute names and their values.
pub type Attributes = Map<String, Value>;

// =============================================================================
// IDENTIFIERS
// =============================================================================

thread_local! {
    static NEXT_ID: Cell<u64> = const { Cell::new(1) };
}

fn next_id() -> u64 {
    NEXT_ID.with(|id| {
        let value = id.get();
        id.set(value + 1);
        value
    })
}

/// Identity of a store, stable for its whole lifetime.
///
/// Collections and child views key their bookkeeping on this instead of on
/// pointer identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoreId(u64);

impl StoreId {
    pub(crate) fn next() -> Self {
        Self(next_id())
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

// =============================================================================
// VALUE CONVERSIONS
// =============================================================================
//
// Binding handlers write strings into the DOM and branch on truthiness. Both
// follow the loose rules markup authors expect: empty strings, zero, null and
// false are falsy; whole floats print without a trailing ".0".
// =============================================================================

/// Whether a value counts as "on" for boolean bindings and modifiers.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a value as the text a DOM node should show.
///
/// `null` renders as the empty string, strings render without quotes and
/// arrays join their items with commas.
pub fn display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => display_number(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

fn display_number(n: &Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                return format!("{}", f as i64);
            }
            return f.to_string();
        }
    }
    n.to_string()
}

/// Build a number value from a float, keeping whole numbers integral.
///
/// Non-finite input becomes `null`.
pub fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        Value::from(value as i64)
    } else {
        Number::from_f64(value).map_or(Value::Null, Value::Number)
    }
}

/// Read a value as a float the way a lenient template would.
///
/// Numeric strings parse, booleans map to 0/1, everything else is `None`.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

// =============================================================================
// TESTS
// =============================================================================
