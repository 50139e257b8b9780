// ============================================================================
// spark-bind - View Configuration
// Where bindings are declared and which default source is consulted first
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::constants::DEFAULT_BINDING_ATTRIBUTE;

/// Where a view finds its binding declarations.
///
/// Deserializes from either a string (the marker attribute to scan for) or
/// an object mapping selectors to declaration lists.
///
/// # Example
///
/// ```
/// use spark_bind::binding::Bindings;
///
/// let scan: Bindings = serde_json::from_str(r#""data-bind""#).unwrap();
/// assert_eq!(scan, Bindings::attribute("data-bind"));
///
/// let map: Bindings = serde_json::from_str(r#"{".user-first": "text:firstName"}"#).unwrap();
/// assert!(matches!(map, Bindings::Map(ref m) if m.len() == 1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bindings {
    /// Scan the subtree for this attribute.
    Attribute(String),
    /// Selector to declaration list; `:el` is the root.
    Map(BTreeMap<String, String>),
}

impl Bindings {
    pub fn attribute(name: impl Into<String>) -> Self {
        Self::Attribute(name.into())
    }

    /// Build a selector map from pairs.
    pub fn map<I, S, D>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, D)>,
        S: Into<String>,
        D: Into<String>,
    {
        Self::Map(
            pairs
                .into_iter()
                .map(|(selector, declarations)| (selector.into(), declarations.into()))
                .collect(),
        )
    }
}

impl Default for Bindings {
    fn default() -> Self {
        Self::Attribute(DEFAULT_BINDING_ATTRIBUTE.to_string())
    }
}

/// Which of the two default sources bare names try first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourcePriority {
    #[default]
    ModelFirst,
    ViewModelFirst,
}

// =============================================================================
// TESTS
// =============================================================================
