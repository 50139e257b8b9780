// ============================================================================
// spark-bind - Computed Properties
// Derived attributes with lazy evaluation and automatic dependency discovery
// ============================================================================
//
// A computed property is read through its store's `get` like any attribute.
// The first read runs the getter under a recording frame; the recorded
// (store, key) pairs become the property's dependency set and each one gets
// an invalidation subscription. A write to any of them marks the property
// dirty (and, transitively, everything that depends on it); the next read
// recomputes. Manual `deps` are read before the getter runs, so they are
// always subscribed, and their values are handed to the getter as arguments.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::core::context::{with_context, PendingComputed};
use crate::core::error::{Error, Result};
use crate::core::types::Attributes;
use crate::primitives::store::{Store, StoreInner};
use crate::reactivity::subscription::Subscription;
use crate::reactivity::tracking::{record_all, track, DependencyRef};

// =============================================================================
// DEFINITIONS
// =============================================================================

/// Computes a property from its store. The slice holds the values of the
/// property's manual dependencies, in declaration order.
pub type Getter = Rc<dyn Fn(&Store, &[Value]) -> Value>;

/// Translates a value written to a computed property into attribute writes.
///
/// Returning `None` aborts the write without touching the store.
pub type Setter = Rc<dyn Fn(&Store, Value) -> Option<Attributes>>;

/// How a computed property is declared.
///
/// The shorthand form is a bare getter; the full form adds an optional
/// setter and manual dependencies.
///
/// # Example
///
/// ```
/// use spark_bind::{ComputedDefinition, Store};
/// use serde_json::json;
///
/// let store = Store::builder()
///     .defaults(json!({"payment": 100}))
///     .computed(
///         "paymentCurrency",
///         ComputedDefinition::new(|s, _| json!(format!("${}", s.get("payment"))))
///             .with_setter(|_, value| {
///                 let text = value.as_str()?.trim_start_matches('$');
///                 let amount: i64 = text.parse().ok()?;
///                 Some(json!({"payment": amount}).as_object()?.clone())
///             }),
///     )
///     .build();
///
/// store.set("paymentCurrency", json!("$200")).unwrap();
/// assert_eq!(store.get("payment"), json!(200));
/// assert_eq!(store.get("paymentCurrency"), json!("$200"));
/// ```
#[derive(Clone)]
pub enum ComputedDefinition {
    /// Getter-only shorthand.
    Getter(Getter),
    /// Getter with optional setter and manual dependencies.
    Full {
        get: Getter,
        set: Option<Setter>,
        deps: Vec<String>,
    },
}

impl ComputedDefinition {
    /// Getter-only shorthand.
    pub fn getter(get: impl Fn(&Store, &[Value]) -> Value + 'static) -> Self {
        Self::Getter(Rc::new(get))
    }

    /// Full form with no setter and no manual dependencies yet.
    pub fn new(get: impl Fn(&Store, &[Value]) -> Value + 'static) -> Self {
        Self::Full {
            get: Rc::new(get),
            set: None,
            deps: Vec::new(),
        }
    }

    /// Attach a setter, making the property writable.
    pub fn with_setter(
        self,
        set: impl Fn(&Store, Value) -> Option<Attributes> + 'static,
    ) -> Self {
        let (get, _, deps) = self.into_parts();
        Self::Full {
            get,
            set: Some(Rc::new(set)),
            deps,
        }
    }

    /// Declare dependencies that must be observed even when the getter
    /// does not read them on every branch.
    pub fn with_deps<I, S>(self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (get, set, _) = self.into_parts();
        Self::Full {
            get,
            set,
            deps: deps.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether writes are accepted.
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::Full { set: Some(_), .. })
    }

    pub(crate) fn into_parts(self) -> (Getter, Option<Setter>, Vec<String>) {
        match self {
            Self::Getter(get) => (get, None, Vec::new()),
            Self::Full { get, set, deps } => (get, set, deps),
        }
    }
}

impl fmt::Debug for ComputedDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Getter(_) => f.write_str("ComputedDefinition::Getter"),
            Self::Full { set, deps, .. } => f
                .debug_struct("ComputedDefinition::Full")
                .field("writable", &set.is_some())
                .field("deps", deps)
                .finish(),
        }
    }
}

// =============================================================================
// COMPUTED CELL
// =============================================================================

/// Runtime state of one computed property.
///
/// Owned by the graph of the store that declared it. Subscriptions to
/// dependencies are RAII tokens held here, so dropping or releasing the cell
/// detaches it from every store it observed.
pub struct ComputedCell {
    name: String,
    getter: Getter,
    setter: Option<Setter>,
    manual_deps: Vec<String>,

    /// Cached value (None until first evaluation)
    value: RefCell<Option<Value>>,

    /// Whether the cached value is stale
    dirty: Cell<bool>,

    /// Set while the getter runs, to catch self-referential getters
    evaluating: Cell<bool>,

    /// Dependency set from the last evaluation
    dependencies: RefCell<Vec<DependencyRef>>,

    /// One invalidation subscription per dependency
    subscriptions: RefCell<HashMap<DependencyRef, Subscription>>,

    self_ref: Weak<ComputedCell>,
}

impl ComputedCell {
    pub fn new(name: impl Into<String>, definition: ComputedDefinition) -> Rc<Self> {
        let (getter, setter, manual_deps) = definition.into_parts();
        let name = name.into();
        Rc::new_cyclic(|self_ref| Self {
            name,
            getter,
            setter,
            manual_deps,
            value: RefCell::new(None),
            dirty: Cell::new(true),
            evaluating: Cell::new(false),
            dependencies: RefCell::new(Vec::new()),
            subscriptions: RefCell::new(HashMap::new()),
            self_ref: self_ref.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_writable(&self) -> bool {
        self.setter.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn manual_deps(&self) -> &[String] {
        &self.manual_deps
    }

    /// The dependency set recorded by the last evaluation.
    pub fn dependencies(&self) -> Vec<DependencyRef> {
        self.dependencies.borrow().clone()
    }

    /// Last computed value, without evaluating.
    pub fn cached(&self) -> Option<Value> {
        self.value.borrow().clone()
    }

    /// Current value, recomputing first if dirty.
    ///
    /// Forwards the dependency set to any enclosing recording frame so that
    /// a computed reading this one depends on everything this one reads.
    pub fn evaluate(&self, store: &Store) -> Value {
        if !self.dirty.get() {
            if let Some(value) = self.cached() {
                record_all(&self.dependencies.borrow());
                return value;
            }
        }

        if self.evaluating.get() {
            warn!(
                computed = %self.name,
                "computed property read itself while evaluating; serving last value"
            );
            return self.cached().unwrap_or(Value::Null);
        }

        struct EvaluatingGuard<'a>(&'a Cell<bool>);

        impl Drop for EvaluatingGuard<'_> {
            fn drop(&mut self) {
                self.0.set(false);
            }
        }

        self.evaluating.set(true);
        let guard = EvaluatingGuard(&self.evaluating);

        let (value, mut deps) = track(|| {
            let args: Vec<Value> = self.manual_deps.iter().map(|dep| store.get(dep)).collect();
            (self.getter)(store, &args)
        });
        drop(guard);

        deps.retain(|dep| !(dep.store_id() == store.id() && dep.key() == self.name));
        debug!(computed = %self.name, deps = deps.len(), "evaluated computed property");

        self.resubscribe(store.inner(), &deps);
        record_all(&deps);
        *self.dependencies.borrow_mut() = deps;
        *self.value.borrow_mut() = Some(value.clone());
        self.dirty.set(false);
        value
    }

    /// Diff the subscription set against a freshly recorded dependency set.
    fn resubscribe(&self, owner: &Rc<StoreInner>, deps: &[DependencyRef]) {
        let stale: Vec<Subscription> = {
            let mut subscriptions = self.subscriptions.borrow_mut();
            let gone: Vec<DependencyRef> = subscriptions
                .keys()
                .filter(|dep| !deps.contains(dep))
                .cloned()
                .collect();
            gone.iter()
                .filter_map(|dep| subscriptions.remove(dep))
                .collect()
        };
        if !stale.is_empty() {
            trace!(computed = %self.name, dropped = stale.len(), "dropping stale dependencies");
        }
        // Unsubscribe outside the borrow
        drop(stale);

        for dep in deps {
            if self.subscriptions.borrow().contains_key(dep) {
                continue;
            }
            let Some(target) = dep.weak_store().upgrade() else {
                continue;
            };
            let cell = self.self_ref.clone();
            let owner = Rc::downgrade(owner);
            let subscription = target.observe(dep.key(), move || {
                if let (Some(cell), Some(owner)) = (cell.upgrade(), owner.upgrade()) {
                    cell.invalidate(&owner);
                }
            });
            trace!(computed = %self.name, dependency = ?dep, "subscribed");
            self.subscriptions.borrow_mut().insert(dep.clone(), subscription);
        }
    }

    /// Mark stale and propagate to everything that depends on this property.
    ///
    /// Only the first invalidation in a batch does any work; the value held
    /// at that moment is queued so the flush can tell whether it changed.
    pub(crate) fn invalidate(&self, owner: &Rc<StoreInner>) {
        if self.dirty.get() {
            return;
        }
        self.dirty.set(true);

        let stale = self.cached();
        with_context(|ctx| {
            ctx.add_pending_computed(PendingComputed {
                cell: self.self_ref.clone(),
                store: Rc::downgrade(owner),
                stale,
            })
        });
        trace!(computed = %self.name, "invalidated");

        owner.notify_observers(&self.name);
    }

    /// Run the setter, producing the attribute writes it asks for.
    pub(crate) fn write(&self, store: &Store, value: Value) -> Result<Option<Attributes>> {
        match &self.setter {
            Some(setter) => Ok(setter(store, value)),
            None => Err(Error::ReadOnlyProperty {
                name: self.name.clone(),
            }),
        }
    }

    /// Drop every subscription and forget the cached value.
    pub(crate) fn release(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        drop(subscriptions);
        self.dependencies.borrow_mut().clear();
        *self.value.borrow_mut() = None;
        self.dirty.set(true);
    }

    /// Number of live dependency subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }
}

impl fmt::Debug for ComputedCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputedCell")
            .field("name", &self.name)
            .field("dirty", &self.dirty.get())
            .field("value", &self.value.borrow())
            .field("dependencies", &self.dependencies.borrow())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
