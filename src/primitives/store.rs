// ============================================================================
// spark-bind - Store
// Observable attribute map with computed properties
// ============================================================================
//
// A store owns native attributes and a graph of computed properties. Reads
// go through `get`, which serves either and records the read for whatever
// getter is evaluating. Writes go through `set`/`set_attributes`: native
// keys are stored and invalidate their observers, computed keys run the
// property's setter and apply the attributes it returns. Listeners registered
// with `on_change` are called once the outermost write has settled.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::core::constants::ANY_TOPIC;
use crate::core::context::{with_context, PendingChange};
use crate::core::error::Result;
use crate::core::types::{Attributes, StoreId};
use crate::primitives::array::ArrayOp;
use crate::primitives::computed::{ComputedCell, ComputedDefinition};
use crate::primitives::graph::ComputedGraph;
use crate::reactivity::batching::batch;
use crate::reactivity::subscription::{Emitter, Subscription};
use crate::reactivity::tracking::{record_read, untrack, DependencyRef};

/// Fallback for keys a store does not hold.
pub(crate) type ReadDelegate = Rc<dyn Fn(&str) -> Option<Value>>;

// =============================================================================
// CHANGE EVENT
// =============================================================================

/// What a change listener receives.
///
/// Per-key listeners get one event per changed key; `"*"` listeners get one
/// event per settled write listing every key that changed. Keys written
/// directly come first, sorted by name as [`Attributes`] keeps them, then
/// computed properties that changed as a result.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    store: StoreId,
    keys: Vec<String>,
    any: bool,
}

impl ChangeEvent {
    fn single(store: StoreId, key: &str) -> Self {
        Self {
            store,
            keys: vec![key.to_string()],
            any: false,
        }
    }

    fn any(store: StoreId, keys: &[String]) -> Self {
        Self {
            store,
            keys: keys.to_vec(),
            any: true,
        }
    }

    /// The store that changed.
    pub fn store_id(&self) -> StoreId {
        self.store
    }

    /// Every key this event covers.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// The first key, which for a per-key event is the only one.
    pub fn key(&self) -> &str {
        self.keys.first().map(String::as_str).unwrap_or_default()
    }

    /// Whether this is the store-wide `"*"` notification.
    pub fn is_any(&self) -> bool {
        self.any
    }
}

// =============================================================================
// STORE INNER
// =============================================================================

/// Shared state behind a [`Store`] handle.
pub struct StoreInner {
    id: StoreId,
    attributes: RefCell<Attributes>,
    graph: ComputedGraph,

    /// Invalidation edges, fired synchronously on write
    observers: Emitter<String>,

    /// Change listeners, fired when the outermost batch flushes
    listeners: Emitter<ChangeEvent>,

    delegate: RefCell<Option<ReadDelegate>>,

    /// Nesting depth of `set_attributes`, to reset the setter path
    write_depth: Cell<u32>,
}

impl StoreInner {
    fn new(attributes: Attributes) -> Self {
        Self {
            id: StoreId::next(),
            attributes: RefCell::new(attributes),
            graph: ComputedGraph::new(),
            observers: Emitter::new(),
            listeners: Emitter::new(),
            delegate: RefCell::new(None),
            write_depth: Cell::new(0),
        }
    }

    pub fn id(&self) -> StoreId {
        self.id
    }

    pub fn graph(&self) -> &ComputedGraph {
        &self.graph
    }

    /// Register an invalidation callback for one key.
    pub(crate) fn observe(self: &Rc<Self>, key: &str, callback: impl Fn() + 'static) -> Subscription {
        let key = key.to_string();
        let id = self.observers.add(move |changed: &String| {
            if *changed == key {
                callback();
            }
        });
        let weak = Rc::downgrade(self);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.observers.remove(id);
            }
        })
    }

    /// Invalidate everything observing `key`.
    pub(crate) fn notify_observers(&self, key: &str) {
        if self.observers.is_empty() {
            return;
        }
        self.observers.emit(&key.to_string());
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    pub(crate) fn emit_change(&self, key: &str) {
        self.listeners.emit(&ChangeEvent::single(self.id, key));
    }

    pub(crate) fn emit_any(&self, keys: &[String]) {
        self.listeners.emit(&ChangeEvent::any(self.id, keys));
    }

    /// Queue `key` for notification and invalidate its observers.
    fn mark_changed(self: &Rc<Self>, key: &str) {
        with_context(|ctx| {
            ctx.add_pending_change(PendingChange {
                store: Rc::downgrade(self),
                key: key.to_string(),
            })
        });
        self.notify_observers(key);
    }
}

impl fmt::Debug for StoreInner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id)
            .field("attributes", &self.attributes.borrow())
            .field("computeds", &self.graph.names())
            .finish()
    }
}

// =============================================================================
// STORE
// =============================================================================

/// An observable map of attributes with computed properties.
///
/// `Store` is a cheap handle; clones share the same attributes.
///
/// # Example
///
/// ```
/// use spark_bind::{ComputedDefinition, Store};
/// use serde_json::json;
///
/// let person = Store::new(json!({"firstName": "Charlie", "lastName": "Brown"}));
/// person.add_computed("fullName", ComputedDefinition::getter(|s, _| {
///     json!(format!(
///         "{} {}",
///         s.get("firstName").as_str().unwrap_or(""),
///         s.get("lastName").as_str().unwrap_or("")
///     ))
/// }));
///
/// assert_eq!(person.get("fullName"), json!("Charlie Brown"));
/// person.set("firstName", json!("Sally")).unwrap();
/// assert_eq!(person.get("fullName"), json!("Sally Brown"));
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl Store {
    /// Create a store from a JSON object of defaults.
    ///
    /// Anything other than an object yields an empty store.
    pub fn new(defaults: Value) -> Self {
        match defaults {
            Value::Object(attributes) => Self::from_attributes(attributes),
            Value::Null => Self::default(),
            other => {
                warn!(defaults = %other, "store defaults must be an object; starting empty");
                Self::default()
            }
        }
    }

    pub fn from_attributes(attributes: Attributes) -> Self {
        Self {
            inner: Rc::new(StoreInner::new(attributes)),
        }
    }

    /// Start declaring a store with defaults and computed properties.
    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    pub(crate) fn from_inner(inner: Rc<StoreInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Rc<StoreInner> {
        &self.inner
    }

    pub fn id(&self) -> StoreId {
        self.inner.id
    }

    pub fn downgrade(&self) -> WeakStore {
        WeakStore {
            inner: Rc::downgrade(&self.inner),
        }
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Read a native attribute or computed property.
    ///
    /// Missing keys read as `null`. The read is recorded for any getter
    /// currently evaluating.
    pub fn get(&self, key: &str) -> Value {
        if let Some(cell) = self.inner.graph.get(key) {
            record_read(DependencyRef::new(&self.inner, key));
            return cell.evaluate(self);
        }

        let native = self.inner.attributes.borrow().get(key).cloned();
        if let Some(value) = native {
            record_read(DependencyRef::new(&self.inner, key));
            return value;
        }

        let delegate = self.inner.delegate.borrow().clone();
        if let Some(value) = delegate.and_then(|read| read(key)) {
            return value;
        }

        record_read(DependencyRef::new(&self.inner, key));
        Value::Null
    }

    /// Whether `key` is a native attribute or computed property.
    pub fn has(&self, key: &str) -> bool {
        self.has_attribute(key) || self.has_computed(key)
    }

    /// Whether `key` is a native attribute.
    pub fn has_attribute(&self, key: &str) -> bool {
        self.inner.attributes.borrow().contains_key(key)
    }

    /// Snapshot of native attributes, optionally with every computed value.
    ///
    /// Computeds are read untracked, so calling this from a getter does not
    /// subscribe it to the whole store.
    pub fn to_json(&self, include_computed: bool) -> Attributes {
        let mut snapshot = self.inner.attributes.borrow().clone();
        if include_computed {
            untrack(|| {
                for name in self.inner.graph.names() {
                    let value = self.get(&name);
                    snapshot.insert(name, value);
                }
            });
        }
        snapshot
    }

    /// Native attribute names.
    pub fn keys(&self) -> Vec<String> {
        self.inner.attributes.borrow().keys().cloned().collect()
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Write one key.
    ///
    /// # Errors
    /// [`Error::ReadOnlyProperty`](crate::Error::ReadOnlyProperty) when `key`
    /// is a computed without a setter,
    /// [`Error::CircularSetter`](crate::Error::CircularSetter) when a setter
    /// chain loops back on itself.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut attributes = Attributes::new();
        attributes.insert(key.to_string(), value);
        self.set_attributes(attributes)
    }

    /// Write several keys as one change.
    ///
    /// Keys are applied in name order. Listeners run once, after every key
    /// (and every setter chain they trigger) has been applied. On error the
    /// keys applied before the failing one stay written.
    pub fn set_attributes(&self, attributes: Attributes) -> Result<()> {
        // Clear the setter path before the batch flushes: listeners may
        // write through setters again
        batch(|| {
            let depth = self.inner.write_depth.get();
            self.inner.write_depth.set(depth + 1);
            let result = self.apply(attributes);
            self.inner.write_depth.set(depth);
            if depth == 0 {
                self.inner.graph.reset_setter_path();
            }
            result
        })
    }

    fn apply(&self, attributes: Attributes) -> Result<()> {
        for (key, value) in attributes {
            match self.inner.graph.get(&key) {
                Some(cell) => {
                    self.inner.graph.begin_set(&key)?;
                    let result = self.run_setter(&cell, &key, value);
                    self.inner.graph.end_set(&key);
                    result?;
                }
                None => self.write_native(&key, value),
            }
        }
        Ok(())
    }

    fn run_setter(&self, cell: &ComputedCell, key: &str, value: Value) -> Result<()> {
        trace!(store = %self.id(), computed = %key, "running computed setter");
        if let Some(writes) = cell.write(self, value)? {
            self.set_attributes(writes)?;
        }
        Ok(())
    }

    fn write_native(&self, key: &str, value: Value) {
        let changed = {
            let mut attributes = self.inner.attributes.borrow_mut();
            match attributes.get(key) {
                Some(existing) if *existing == value => false,
                _ => {
                    attributes.insert(key.to_string(), value);
                    true
                }
            }
        };
        if changed {
            trace!(store = %self.id(), key, "attribute changed");
            self.inner.mark_changed(key);
        }
    }

    /// Remove a native attribute. Listeners see it change to `null`.
    pub fn unset(&self, key: &str) -> bool {
        let removed = self.inner.attributes.borrow_mut().remove(key).is_some();
        if removed {
            batch(|| self.inner.mark_changed(key));
        }
        removed
    }

    /// Apply an array edit to an array attribute.
    ///
    /// `op` names the edit (`push`, `pop`, `shift`, `unshift`, `splice`,
    /// `reverse`, `sort`). Unknown operations, non-array values and edits
    /// that change nothing are silent no-ops.
    ///
    /// # Example
    ///
    /// ```
    /// use spark_bind::Store;
    /// use serde_json::json;
    ///
    /// let store = Store::new(json!({"items": ["a"], "name": "x"}));
    /// store.modify_array("items", "push", &[json!("b")]).unwrap();
    /// assert_eq!(store.get("items"), json!(["a", "b"]));
    ///
    /// store.modify_array("name", "push", &[json!("y")]).unwrap();
    /// assert_eq!(store.get("name"), json!("x"));
    /// ```
    pub fn modify_array(&self, key: &str, op: &str, args: &[Value]) -> Result<()> {
        let Ok(op) = op.parse::<ArrayOp>() else {
            debug!(store = %self.id(), key, op, "unknown array operation ignored");
            return Ok(());
        };

        let Value::Array(mut items) = untrack(|| self.get(key)) else {
            return Ok(());
        };
        if !op.apply(&mut items, args) {
            return Ok(());
        }
        self.set(key, Value::Array(items))
    }

    // =========================================================================
    // COMPUTED PROPERTIES
    // =========================================================================

    /// Declare a computed property.
    ///
    /// Replaces any computed of the same name and shadows (removes) a native
    /// attribute of the same name. Evaluation is deferred to the first read,
    /// unless the store already has change listeners.
    pub fn add_computed(&self, name: &str, definition: ComputedDefinition) -> &Self {
        let cell = ComputedCell::new(name, definition);
        let shadowed = self.inner.attributes.borrow_mut().remove(name).is_some();
        let replaced = self.inner.graph.insert(cell.clone());

        debug!(store = %self.id(), computed = name, "computed property declared");

        if let Some(previous) = &replaced {
            previous.release();
        }
        if shadowed || replaced.is_some() {
            batch(|| self.inner.mark_changed(name));
        } else {
            // Computeds that read the name before it existed saw null
            batch(|| self.inner.notify_observers(name));
        }
        if !self.inner.listeners.is_empty() {
            self.prime(&[cell]);
        }
        self
    }

    /// Declare several computed properties in order.
    pub fn add_computeds<I, S>(&self, definitions: I) -> &Self
    where
        I: IntoIterator<Item = (S, ComputedDefinition)>,
        S: AsRef<str>,
    {
        for (name, definition) in definitions {
            self.add_computed(name.as_ref(), definition);
        }
        self
    }

    pub fn has_computed(&self, name: &str) -> bool {
        self.inner.graph.contains(name)
    }

    /// Remove one computed property, detaching it from its dependencies.
    pub fn remove_computed(&self, name: &str) -> bool {
        match self.inner.graph.remove(name) {
            Some(cell) => {
                cell.release();
                batch(|| self.inner.mark_changed(name));
                true
            }
            None => false,
        }
    }

    /// Remove every computed property.
    pub fn clear_computeds(&self) {
        let cells = self.inner.graph.clear();
        if cells.is_empty() {
            return;
        }
        batch(|| {
            for cell in &cells {
                cell.release();
                self.inner.mark_changed(cell.name());
            }
        });
    }

    pub fn computed_names(&self) -> Vec<String> {
        self.inner.graph.names()
    }

    /// The runtime state of one computed property.
    pub fn computed(&self, name: &str) -> Option<Rc<ComputedCell>> {
        self.inner.graph.get(name)
    }

    // =========================================================================
    // LISTENERS
    // =========================================================================

    /// Listen for settled changes.
    ///
    /// `topic` is an attribute or computed name, or `"*"` for one call per
    /// settled write covering every changed key. Watched computeds that were
    /// never read are evaluated now, so their first change is reported.
    pub fn on_change(
        &self,
        topic: impl Into<String>,
        callback: impl Fn(&ChangeEvent) + 'static,
    ) -> Subscription {
        let topic = topic.into();
        let watched = if topic == ANY_TOPIC {
            self.inner.graph.cells()
        } else {
            self.inner.graph.get(&topic).into_iter().collect()
        };
        self.prime(&watched);

        let id = self.inner.listeners.add(move |event: &ChangeEvent| {
            let wanted = if topic == ANY_TOPIC {
                event.is_any()
            } else {
                !event.is_any() && event.key() == topic
            };
            if wanted {
                callback(event);
            }
        });
        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.remove(id);
            }
        })
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Evaluate computeds that are being watched but were never read, so
    /// their dependencies are subscribed before the first change.
    fn prime(&self, cells: &[Rc<ComputedCell>]) {
        for cell in cells.iter().filter(|cell| cell.cached().is_none()) {
            untrack(|| cell.evaluate(self));
        }
    }

    /// Computed properties (on any store) currently depending on this one.
    pub fn observer_count(&self) -> usize {
        self.inner.observer_count()
    }

    /// Serve keys this store lacks from another source.
    ///
    /// Used for view-level computeds, whose getters read binding sources by
    /// bare name through the view's own store.
    pub(crate) fn set_read_delegate(&self, delegate: ReadDelegate) {
        *self.inner.delegate.borrow_mut() = Some(delegate);
    }

    pub(crate) fn clear_read_delegate(&self) {
        self.inner.delegate.borrow_mut().take();
    }

    /// Whether two handles share the same store.
    pub fn ptr_eq(&self, other: &Store) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::from_attributes(Attributes::new())
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Store {}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.inner.fmt(f)
    }
}

// =============================================================================
// WEAK STORE
// =============================================================================

/// A non-owning handle, for callbacks that must not keep a store alive.
#[derive(Clone, Default)]
pub struct WeakStore {
    inner: Weak<StoreInner>,
}

impl WeakStore {
    pub fn upgrade(&self) -> Option<Store> {
        self.inner.upgrade().map(Store::from_inner)
    }
}

impl fmt::Debug for WeakStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.upgrade() {
            Some(inner) => write!(f, "WeakStore({})", inner.id),
            None => f.write_str("WeakStore(dropped)"),
        }
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Declarative store construction.
///
/// Computeds are declared after the defaults are in place, in the order
/// they were added to the builder.
#[derive(Default)]
pub struct StoreBuilder {
    defaults: Attributes,
    computeds: Vec<(String, ComputedDefinition)>,
}

impl StoreBuilder {
    /// Merge a JSON object into the defaults. Non-objects are ignored.
    pub fn defaults(mut self, defaults: Value) -> Self {
        if let Value::Object(attributes) = defaults {
            self.defaults.extend(attributes);
        }
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(key.into(), value);
        self
    }

    pub fn computed(mut self, name: impl Into<String>, definition: ComputedDefinition) -> Self {
        self.computeds.push((name.into(), definition));
        self
    }

    pub fn build(self) -> Store {
        let store = Store::from_attributes(self.defaults);
        store.add_computeds(self.computeds);
        store
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;
    use serde_json::json;

    fn full_name(s: &Store, _: &[Value]) -> Value {
        json!(format!(
            "{} {}",
            s.get("firstName").as_str().unwrap_or(""),
            s.get("lastName").as_str().unwrap_or("")
        ))
    }

    fn attrs(value: Value) -> Attributes {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn missing_keys_read_null() {
        let store = Store::new(json!({"a": 1}));
        assert_eq!(store.get("a"), json!(1));
        assert_eq!(store.get("b"), Value::Null);
        assert!(store.has("a"));
        assert!(!store.has("b"));
    }

    #[test]
    fn non_object_defaults_start_empty() {
        let store = Store::new(json!([1, 2]));
        assert!(store.keys().is_empty());
    }

    #[test]
    fn computed_tracks_its_reads() {
        let store = Store::new(json!({"firstName": "Charlie", "lastName": "Brown"}));
        store.add_computed("fullName", ComputedDefinition::getter(full_name));
        assert_eq!(store.get("fullName"), json!("Charlie Brown"));

        store.set("firstName", json!("Sally")).unwrap();
        assert_eq!(store.get("fullName"), json!("Sally Brown"));
    }

    #[test]
    fn identical_write_is_not_a_change() {
        let store = Store::new(json!({"a": 1}));
        let fired = Rc::new(Cell::new(0));
        let _sub = store.on_change("a", {
            let fired = fired.clone();
            move |_| fired.set(fired.get() + 1)
        });
        store.set("a", json!(1)).unwrap();
        assert_eq!(fired.get(), 0);
        store.set("a", json!(2)).unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn computed_shadows_native_attribute() {
        let store = Store::new(json!({"a": 1, "b": 2}));
        store.add_computed("b", ComputedDefinition::getter(|s, _| s.get("a")));
        assert!(!store.has_attribute("b"));
        assert!(store.has_computed("b"));
        assert_eq!(store.get("b"), json!(1));
    }

    #[test]
    fn writing_a_getter_only_computed_fails() {
        let store = Store::new(json!({"firstName": "a", "lastName": "b"}));
        store.add_computed("fullName", ComputedDefinition::getter(full_name));
        assert_eq!(
            store.set("fullName", json!("x y")),
            Err(Error::ReadOnlyProperty {
                name: "fullName".into()
            })
        );
    }

    #[test]
    fn setter_writes_its_mapping() {
        let store = Store::new(json!({"firstName": "Charlie", "lastName": "Brown"}));
        store.add_computed(
            "fullName",
            ComputedDefinition::new(full_name).with_setter(|_, value| {
                let text = value.as_str()?.to_string();
                let (first, last) = text.split_once(' ')?;
                Some(attrs(json!({"firstName": first, "lastName": last})))
            }),
        );

        store.set("fullName", json!("Sally Black")).unwrap();
        assert_eq!(store.get("firstName"), json!("Sally"));
        assert_eq!(store.get("lastName"), json!("Black"));
        assert_eq!(store.get("fullName"), json!("Sally Black"));
    }

    #[test]
    fn circular_setters_fail_and_reset_the_path() {
        let store = Store::new(json!({}));
        store.add_computed(
            "a",
            ComputedDefinition::new(|_, _| Value::Null)
                .with_setter(|_, v| Some(attrs(json!({"b": v})))),
        );
        store.add_computed(
            "b",
            ComputedDefinition::new(|_, _| Value::Null)
                .with_setter(|_, v| Some(attrs(json!({"a": v})))),
        );

        let err = store.set("a", json!(1)).unwrap_err();
        assert!(matches!(err, Error::CircularSetter { ref name, .. } if name == "a"));
        assert!(store.inner().graph().setter_path().is_empty());
    }

    #[test]
    fn to_json_with_and_without_computeds() {
        let store = Store::new(json!({"firstName": "a", "lastName": "b"}));
        store.add_computed("fullName", ComputedDefinition::getter(full_name));
        assert_eq!(store.to_json(false).len(), 2);

        let full = store.to_json(true);
        assert_eq!(full.len(), 3);
        assert_eq!(full["fullName"], json!("a b"));
    }

    #[test]
    fn modify_array_notifies_like_a_set() {
        let store = Store::new(json!({"items": []}));
        let fired = Rc::new(Cell::new(0));
        let _sub = store.on_change("items", {
            let fired = fired.clone();
            move |_| fired.set(fired.get() + 1)
        });

        store.modify_array("items", "push", &[json!("x")]).unwrap();
        assert_eq!(store.get("items"), json!(["x"]));
        assert_eq!(fired.get(), 1);

        store.modify_array("items", "frobnicate", &[]).unwrap();
        store.modify_array("missing", "push", &[json!(1)]).unwrap();
        assert_eq!(fired.get(), 1);
    }

    #[test]
    fn remove_computed_detaches_and_notifies() {
        let store = Store::new(json!({"a": 1}));
        store.add_computed("double", ComputedDefinition::getter(|s, _| {
            json!(s.get("a").as_i64().unwrap_or(0) * 2)
        }));
        assert_eq!(store.get("double"), json!(2));
        assert_eq!(store.inner().observer_count(), 1);

        assert!(store.remove_computed("double"));
        assert_eq!(store.inner().observer_count(), 0);
        assert_eq!(store.get("double"), Value::Null);
        assert!(!store.remove_computed("double"));
    }

    #[test]
    fn unset_removes_and_notifies() {
        let store = Store::new(json!({"a": 1}));
        let fired = Rc::new(Cell::new(0));
        let _sub = store.on_change("a", {
            let fired = fired.clone();
            move |_| fired.set(fired.get() + 1)
        });
        assert!(store.unset("a"));
        assert!(!store.unset("a"));
        assert_eq!(fired.get(), 1);
        assert_eq!(store.get("a"), Value::Null);
    }

    #[test]
    fn builder_declares_defaults_then_computeds() {
        let store = Store::builder()
            .defaults(json!({"firstName": "Luke"}))
            .attribute("lastName", json!("Skywalker"))
            .computed("fullName", ComputedDefinition::getter(full_name))
            .build();
        assert_eq!(store.get("fullName"), json!("Luke Skywalker"));
        assert_eq!(store.computed_names(), vec!["fullName"]);
    }

    #[test]
    fn weak_handles_do_not_keep_stores_alive() {
        let store = Store::default();
        let weak = store.downgrade();
        assert!(weak.upgrade().is_some());
        drop(store);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn read_delegate_serves_missing_keys() {
        let other = Store::new(json!({"name": "Luke"}));
        let store = Store::default();
        store.set_read_delegate(Rc::new({
            let other = other.clone();
            move |key| other.has(key).then(|| other.get(key))
        }));
        assert_eq!(store.get("name"), json!("Luke"));
        assert_eq!(store.get("missing"), Value::Null);
        store.clear_read_delegate();
        assert_eq!(store.get("name"), Value::Null);
    }
}
