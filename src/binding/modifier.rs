// ============================================================================
// spark-bind - Binding Modifiers
// The fixed operator set applied to source values before a handler sees them
// ============================================================================

use std::fmt;

use serde_json::Value;

use crate::binding::source::Bound;
use crate::core::error::{Error, Result};
use crate::core::types::display_string;

/// A modifier callable from a binding expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// `not(x)`: boolean negation.
    Not,
    /// `all(a, b, ...)`: every argument truthy.
    All,
    /// `any(a, b, ...)`: at least one argument truthy.
    Any,
    /// `none(a, b, ...)`: no argument truthy.
    None,
    /// `select(condition, when_true, when_false)`
    Select,
    /// `format(template, a, b, ...)`: `$1`..`$n` replaced by the arguments.
    Format,
    /// `length(x)`: length of an array, string or collection.
    Length,
}

/// Accepted argument counts, as (min, max).
type Arity = (usize, Option<usize>);

impl Modifier {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "not" => Self::Not,
            "all" => Self::All,
            "any" => Self::Any,
            "none" => Self::None,
            "select" => Self::Select,
            "format" => Self::Format,
            "length" => Self::Length,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Not => "not",
            Self::All => "all",
            Self::Any => "any",
            Self::None => "none",
            Self::Select => "select",
            Self::Format => "format",
            Self::Length => "length",
        }
    }

    fn arity(self) -> Arity {
        match self {
            Self::Not | Self::Length => (1, Some(1)),
            Self::Select => (3, Some(3)),
            Self::All | Self::Any | Self::None | Self::Format => (1, None),
        }
    }

    /// Fail with [`Error::InvalidModifierUsage`] unless `count` arguments fit.
    pub fn check_arity(self, count: usize) -> Result<()> {
        let (min, max) = self.arity();
        let fits = count >= min && max.is_none_or(|max| count <= max);
        if fits {
            return Ok(());
        }
        let expected = match max {
            Some(max) if max == min => format!("exactly {min}"),
            Some(max) => format!("{min} to {max}"),
            None => format!("at least {min}"),
        };
        Err(Error::modifier(
            self.name(),
            format!("expects {expected} argument(s), got {count}"),
        ))
    }

    /// Apply to already-evaluated arguments.
    ///
    /// # Example
    ///
    /// ```
    /// use spark_bind::binding::{Bound, Modifier};
    /// use serde_json::json;
    ///
    /// let args = vec![
    ///     Bound::from(json!("Name: $1 $2")),
    ///     Bound::from(json!("Luke")),
    ///     Bound::from(json!("Skywalker")),
    /// ];
    /// let text = Modifier::Format.apply(args).unwrap();
    /// assert_eq!(text, Bound::from(json!("Name: Luke Skywalker")));
    /// ```
    pub fn apply(self, args: Vec<Bound>) -> Result<Bound> {
        self.check_arity(args.len())?;
        let result = match self {
            Self::Not => Value::Bool(!args[0].is_truthy()),
            Self::All => Value::Bool(args.iter().all(Bound::is_truthy)),
            Self::Any => Value::Bool(args.iter().any(Bound::is_truthy)),
            Self::None => Value::Bool(!args.iter().any(Bound::is_truthy)),
            Self::Select => {
                let mut args = args.into_iter();
                let (Some(condition), Some(when_true), Some(when_false)) =
                    (args.next(), args.next(), args.next())
                else {
                    return Err(Error::modifier(self.name(), "expects exactly 3 argument(s)"));
                };
                return Ok(if condition.is_truthy() { when_true } else { when_false });
            }
            Self::Format => Value::String(format_template(&args)),
            Self::Length => Value::from(length(&args[0])?),
        };
        Ok(Bound::Value(result))
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Replace `$n` placeholders, highest index first so `$1` never eats `$10`.
fn format_template(args: &[Bound]) -> String {
    let mut text = display_string(&args[0].to_value());
    for (index, arg) in args.iter().enumerate().skip(1).rev() {
        text = text.replace(&format!("${index}"), &display_string(&arg.to_value()));
    }
    text
}

fn length(arg: &Bound) -> Result<usize> {
    match arg {
        Bound::Collection(collection) => Ok(collection.len()),
        Bound::Value(Value::Array(items)) => Ok(items.len()),
        Bound::Value(Value::String(text)) => Ok(text.chars().count()),
        Bound::Value(other) => Err(Error::modifier(
            "length",
            format!("expects an array, string or collection, got `{other}`"),
        )),
        Bound::Store(_) => Err(Error::modifier(
            "length",
            "expects an array, string or collection, got a store",
        )),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collections::Collection;
    use crate::primitives::store::Store;
    use serde_json::json;

    fn values(items: &[Value]) -> Vec<Bound> {
        items.iter().cloned().map(Bound::from).collect()
    }

    fn apply(modifier: Modifier, items: &[Value]) -> Value {
        modifier.apply(values(items)).unwrap().to_value()
    }

    #[test]
    fn boolean_modifiers() {
        assert_eq!(apply(Modifier::Not, &[json!(true)]), json!(false));
        assert_eq!(apply(Modifier::Not, &[json!("")]), json!(true));

        assert_eq!(apply(Modifier::All, &[json!("Luke"), json!("Skywalker")]), json!(true));
        assert_eq!(apply(Modifier::All, &[json!(""), json!("Skywalker")]), json!(false));

        assert_eq!(apply(Modifier::Any, &[json!(""), json!("Skywalker")]), json!(true));
        assert_eq!(apply(Modifier::Any, &[json!(""), json!(0)]), json!(false));

        assert_eq!(apply(Modifier::None, &[json!(""), json!(null)]), json!(true));
        assert_eq!(apply(Modifier::None, &[json!("a"), json!(null)]), json!(false));
    }

    #[test]
    fn select_is_a_ternary() {
        let args = [json!(true), json!("Luke"), json!("Skywalker")];
        assert_eq!(apply(Modifier::Select, &args), json!("Luke"));
        let args = [json!(false), json!("Luke"), json!("Skywalker")];
        assert_eq!(apply(Modifier::Select, &args), json!("Skywalker"));
    }

    #[test]
    fn select_passes_sources_through() {
        let store = Store::default();
        let chosen = Modifier::Select
            .apply(vec![
                Bound::from(json!(1)),
                Bound::Store(store.clone()),
                Bound::from(json!(null)),
            ])
            .unwrap();
        assert_eq!(chosen, Bound::Store(store));
    }

    #[test]
    fn format_replaces_high_placeholders_first() {
        let mut args = vec![json!("$1-$10")];
        args.extend((1..=10).map(|n| json!(n)));
        assert_eq!(apply(Modifier::Format, &args), json!("1-10"));
        assert_eq!(
            apply(Modifier::Format, &[json!("Name: $1 $2"), json!("Han"), json!("Solo")]),
            json!("Name: Han Solo")
        );
    }

    #[test]
    fn length_of_arrays_strings_and_collections() {
        assert_eq!(apply(Modifier::Length, &[json!(["a", "b"])]), json!(2));
        assert_eq!(apply(Modifier::Length, &[json!("abc")]), json!(3));

        let collection = Collection::from_records(vec![Store::default()]);
        let len = Modifier::Length
            .apply(vec![Bound::Collection(collection)])
            .unwrap();
        assert_eq!(len.to_value(), json!(1));
    }

    #[test]
    fn length_of_a_number_is_a_usage_error() {
        let err = Modifier::Length.apply(values(&[json!(5)])).unwrap_err();
        assert!(matches!(err, Error::InvalidModifierUsage { ref modifier, .. } if modifier == "length"));
    }

    #[test]
    fn arity_messages() {
        assert!(Modifier::Select.check_arity(3).is_ok());
        let err = Modifier::Select.check_arity(2).unwrap_err();
        assert!(err.to_string().contains("exactly 3"));
        let err = Modifier::All.check_arity(0).unwrap_err();
        assert!(err.to_string().contains("at least 1"));
        assert!(Modifier::from_name("shout").is_none());
    }
}
