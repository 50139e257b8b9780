// ============================================================================
// spark-bind - Errors
// Programming errors in computed or binding declarations
// ============================================================================

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the store and binding engine report.
///
/// All of these describe a mistake in how computed properties or bindings
/// were declared, so they are returned to the caller of the triggering
/// operation instead of being swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A value was written to a computed property that has no setter.
    #[error("cannot set read-only computed property `{name}`")]
    ReadOnlyProperty { name: String },

    /// A chain of computed setters came back to a property already being set.
    #[error("circular setter reference: `{name}` is already being set (path: {path})")]
    CircularSetter { name: String, path: String },

    /// A binding references a property that no registered source has.
    #[error("binding `{binding}` references `{name}`, which no binding source provides")]
    UnresolvedBinding { binding: String, name: String },

    /// A `$name` token names a source that is not registered.
    #[error("binding `{binding}` references unknown source `${name}`")]
    UnknownSource { binding: String, name: String },

    /// A modifier was called with the wrong arity or on the wrong kind of value.
    #[error("invalid use of modifier `{modifier}`: {reason}")]
    InvalidModifierUsage { modifier: String, reason: String },

    /// A binding declaration could not be parsed.
    #[error("malformed binding `{source_text}` at offset {offset}: {reason}")]
    MalformedBinding {
        source_text: String,
        offset: usize,
        reason: String,
    },

    /// A binding type has no registered handler.
    #[error("no binding handler registered for `{binding}`")]
    UnknownBindingHandler { binding: String },

    /// A handler received a value it cannot render.
    #[error("binding `{binding}` expects {expected}")]
    InvalidBindingValue { binding: String, expected: String },

    /// A selector in a binding map could not be parsed.
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

impl Error {
    /// Build an [`Error::InvalidModifierUsage`].
    pub fn modifier(modifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidModifierUsage {
            modifier: modifier.into(),
            reason: reason.into(),
        }
    }

    /// Build an [`Error::InvalidBindingValue`].
    pub fn binding_value(binding: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidBindingValue {
            binding: binding.into(),
            expected: expected.into(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        let err = Error::ReadOnlyProperty {
            name: "fullName".into(),
        };
        assert_eq!(
            err.to_string(),
            "cannot set read-only computed property `fullName`"
        );

        let err = Error::UnknownSource {
            binding: "text".into(),
            name: "missing".into(),
        };
        assert!(err.to_string().contains("$missing"));
    }

    #[test]
    fn modifier_helper() {
        let err = Error::modifier("select", "expects 3 arguments, got 2");
        assert!(matches!(err, Error::InvalidModifierUsage { ref modifier, .. } if modifier == "select"));
    }
}
