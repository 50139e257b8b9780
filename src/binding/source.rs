// ============================================================================
// spark-bind - Binding Sources
// Named stores and collections a view's bindings can reference
// ============================================================================
//
// Lookup order for a bare property name is the registration order of store
// sources: the default pair (model and viewModel, in configured priority),
// then the view's own computeds, then custom sources. A name no store has
// may still resolve in namespaced form: `mod2_name` reads `name` on the
// source registered as `mod2`.
// ============================================================================

use std::fmt;

use serde_json::Value;

use crate::collections::Collection;
use crate::core::types::is_truthy;
use crate::primitives::store::Store;

// =============================================================================
// BOUND VALUES
// =============================================================================

/// What a binding expression evaluates to.
///
/// Most expressions produce plain values; `$name` tokens (and modifiers
/// passing them through) produce the source itself.
#[derive(Clone, PartialEq)]
pub enum Bound {
    Value(Value),
    Store(Store),
    Collection(Collection),
}

impl Bound {
    /// The plain value, if this is one.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Bound::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_store(&self) -> Option<&Store> {
        match self {
            Bound::Store(store) => Some(store),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Bound::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    /// Flatten to a value: stores become their attribute objects (computeds
    /// included), collections become arrays of record objects.
    pub fn to_value(&self) -> Value {
        match self {
            Bound::Value(value) => value.clone(),
            Bound::Store(store) => Value::Object(store.to_json(true)),
            Bound::Collection(collection) => collection.to_json(),
        }
    }

    /// Stores and collections are always truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Bound::Value(value) => is_truthy(value),
            Bound::Store(_) | Bound::Collection(_) => true,
        }
    }
}

impl From<Value> for Bound {
    fn from(value: Value) -> Self {
        Bound::Value(value)
    }
}

impl fmt::Debug for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bound::Value(value) => write!(f, "{value}"),
            Bound::Store(store) => write!(f, "$store({})", store.id()),
            Bound::Collection(collection) => write!(f, "$collection(len={})", collection.len()),
        }
    }
}

// =============================================================================
// SOURCES
// =============================================================================

/// A named object bindings can read from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    Store(Store),
    Collection(Collection),
}

impl Source {
    pub fn as_store(&self) -> Option<&Store> {
        match self {
            Source::Store(store) => Some(store),
            Source::Collection(_) => None,
        }
    }

    pub fn to_bound(&self) -> Bound {
        match self {
            Source::Store(store) => Bound::Store(store.clone()),
            Source::Collection(collection) => Bound::Collection(collection.clone()),
        }
    }
}

impl From<Store> for Source {
    fn from(store: Store) -> Self {
        Source::Store(store)
    }
}

impl From<Collection> for Source {
    fn from(collection: Collection) -> Self {
        Source::Collection(collection)
    }
}

/// A property resolved to the store that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProperty {
    pub store: Store,
    pub key: String,
    /// Name of the source the store was found under.
    pub source: String,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Ordered, named binding sources.
///
/// # Example
///
/// ```
/// use spark_bind::binding::SourceRegistry;
/// use spark_bind::Store;
/// use serde_json::json;
///
/// let mut sources = SourceRegistry::new();
/// sources.register("model", Store::new(json!({"name": "Luke"})));
/// sources.register("mod2", Store::new(json!({"name": "Han"})));
///
/// let bare = sources.resolve_property("name").unwrap();
/// assert_eq!(bare.source, "model");
///
/// let namespaced = sources.resolve_property("mod2_name").unwrap();
/// assert_eq!(namespaced.store.get(&namespaced.key), json!("Han"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct SourceRegistry {
    entries: Vec<(String, Source)>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source. Re-registering a name replaces it in place.
    pub fn register(&mut self, name: impl Into<String>, source: impl Into<Source>) {
        let name = name.into();
        let source = source.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = source,
            None => self.entries.push((name, source)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Source> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, source)| source)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a bare or namespaced property name.
    pub fn resolve_property(&self, name: &str) -> Option<ResolvedProperty> {
        self.resolve_excluding(name, None)
    }

    /// Like [`SourceRegistry::resolve_property`], skipping one source.
    ///
    /// View computeds read through the registry without finding themselves.
    pub fn resolve_excluding(&self, name: &str, skip: Option<&str>) -> Option<ResolvedProperty> {
        let stores = || {
            self.entries
                .iter()
                .filter(move |(source, _)| Some(source.as_str()) != skip)
                .filter_map(|(source, entry)| entry.as_store().map(|store| (source, store)))
        };

        if let Some((source, store)) = stores().find(|(_, store)| store.has(name)) {
            return Some(ResolvedProperty {
                store: store.clone(),
                key: name.to_string(),
                source: source.clone(),
            });
        }

        stores().find_map(|(source, store)| {
            let key = name.strip_prefix(source.as_str())?.strip_prefix('_')?;
            store.has(key).then(|| ResolvedProperty {
                store: store.clone(),
                key: key.to_string(),
                source: source.clone(),
            })
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
