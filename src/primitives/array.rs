// ============================================================================
// spark-bind - Array Operations
// In-place edits for array-valued attributes
// ============================================================================

use std::str::FromStr;

use serde_json::Value;

use crate::core::types::{as_number, display_string};

/// An edit `Store::modify_array` can apply to an array attribute.
///
/// Parsed from the familiar method names (`push`, `splice`, ...), so markup
/// and callers can name the operation as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayOp {
    /// Append every argument.
    Push,
    /// Remove the last item.
    Pop,
    /// Remove the first item.
    Shift,
    /// Prepend every argument, keeping their order.
    Unshift,
    /// `[start, delete_count, ...items]`; negative start counts from the end.
    Splice,
    Reverse,
    /// Sort by display text.
    Sort,
}

impl FromStr for ArrayOp {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "push" | "append" => Ok(Self::Push),
            "pop" => Ok(Self::Pop),
            "shift" => Ok(Self::Shift),
            "unshift" | "prepend" => Ok(Self::Unshift),
            "splice" => Ok(Self::Splice),
            "reverse" => Ok(Self::Reverse),
            "sort" => Ok(Self::Sort),
            _ => Err(()),
        }
    }
}

impl ArrayOp {
    /// Apply to `items`. Returns whether the array changed.
    pub fn apply(self, items: &mut Vec<Value>, args: &[Value]) -> bool {
        match self {
            Self::Push => {
                items.extend(args.iter().cloned());
                !args.is_empty()
            }
            Self::Pop => items.pop().is_some(),
            Self::Shift => {
                if items.is_empty() {
                    false
                } else {
                    items.remove(0);
                    true
                }
            }
            Self::Unshift => {
                items.splice(0..0, args.iter().cloned());
                !args.is_empty()
            }
            Self::Splice => splice(items, args),
            Self::Reverse => {
                items.reverse();
                items.len() > 1
            }
            Self::Sort => {
                let before = items.clone();
                items.sort_by_key(display_string);
                *items != before
            }
        }
    }
}

fn splice(items: &mut Vec<Value>, args: &[Value]) -> bool {
    let len = items.len() as i64;
    let start = args.first().and_then(as_number).unwrap_or(0.0) as i64;
    let start = if start < 0 {
        (len + start).max(0)
    } else {
        start.min(len)
    } as usize;

    let delete = match args.get(1) {
        Some(count) => as_number(count).unwrap_or(0.0).max(0.0) as usize,
        None => items.len() - start,
    };
    let end = start.saturating_add(delete).min(items.len());
    let inserts = args.get(2..).unwrap_or_default();

    let removed = items.splice(start..end, inserts.iter().cloned()).count();
    removed > 0 || !inserts.is_empty()
}

// =============================================================================
// TESTS
// =============================================================================
