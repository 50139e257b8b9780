// ============================================================================
// spark-bind - Dependency Tracking
// Recording which (store, key) pairs a computed getter reads
// ============================================================================
//
// A getter never declares what it reads. Instead, `track` opens a recording
// frame on the thread-local context, runs the getter, and every `Store::get`
// executed meanwhile (on any store) appends a `DependencyRef` to that frame.
// Frames nest: a computed read inside another computed's getter records into
// its own frame, then forwards its key and its whole dependency set to the
// enclosing frame so the outer property sees the transitive closure.
// ============================================================================

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use crate::core::context::with_context;
use crate::core::types::StoreId;
use crate::primitives::store::{Store, StoreInner};

// =============================================================================
// DEPENDENCY REF
// =============================================================================

/// One edge of the dependency graph: a key on some store.
///
/// The store is held weakly. A dependent observes a foreign store, it never
/// keeps it alive.
#[derive(Clone)]
pub struct DependencyRef {
    store: Weak<StoreInner>,
    id: StoreId,
    key: String,
}

impl DependencyRef {
    pub(crate) fn new(store: &Rc<StoreInner>, key: impl Into<String>) -> Self {
        Self {
            store: Rc::downgrade(store),
            id: store.id(),
            key: key.into(),
        }
    }

    /// The store this edge points at, if it is still alive.
    pub fn store(&self) -> Option<Store> {
        self.store.upgrade().map(Store::from_inner)
    }

    /// Identity of the store this edge points at.
    pub fn store_id(&self) -> StoreId {
        self.id
    }

    /// The attribute or computed name read.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn weak_store(&self) -> &Weak<StoreInner> {
        &self.store
    }
}

impl PartialEq for DependencyRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.key == other.key
    }
}

impl Eq for DependencyRef {}

impl Hash for DependencyRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.key.hash(state);
    }
}

impl fmt::Debug for DependencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.id, self.key)
    }
}

// =============================================================================
// RECORDING
// =============================================================================

/// Run `f` with a fresh recording frame and return what it read.
///
/// The frame is popped even if `f` unwinds.
pub fn track<T>(f: impl FnOnce() -> T) -> (T, Vec<DependencyRef>) {
    struct FrameGuard {
        popped: bool,
    }

    impl Drop for FrameGuard {
        fn drop(&mut self) {
            if !self.popped {
                with_context(|ctx| ctx.pop_recorder());
            }
        }
    }

    with_context(|ctx| ctx.push_recorder());
    let mut guard = FrameGuard { popped: false };
    let result = f();
    let deps = with_context(|ctx| ctx.pop_recorder());
    guard.popped = true;
    (result, deps)
}

/// Register a read with the innermost recording frame, if any.
///
/// Called by `Store::get` for every key it serves.
pub fn record_read(dep: DependencyRef) {
    with_context(|ctx| ctx.record(dep));
}

/// Register a batch of reads, used to forward a computed's dependency set.
pub fn record_all(deps: &[DependencyRef]) {
    with_context(|ctx| {
        if !ctx.is_recording() {
            return;
        }
        for dep in deps {
            ctx.record(dep.clone());
        }
    });
}

/// Read stores without creating dependencies.
///
/// Binding modifiers and change notification delivery run inside `untrack`
/// so they never leak reads into an enclosing getter.
///
/// # Example
///
/// ```
/// use spark_bind::{untrack, Store, ComputedDefinition};
/// use serde_json::json;
///
/// let store = Store::new(json!({"a": 1, "b": 2}));
/// store.add_computed("sum", ComputedDefinition::getter(|s, _| {
///     let a = s.get("a").as_i64().unwrap_or(0);
///     let b = untrack(|| s.get("b")).as_i64().unwrap_or(0);
///     json!(a + b)
/// }));
///
/// assert_eq!(store.get("sum"), json!(3));
/// store.set("b", json!(10)).unwrap();
/// // `b` was read untracked, so the cached sum is still served.
/// assert_eq!(store.get("sum"), json!(3));
/// ```
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    struct UntrackGuard;

    impl Drop for UntrackGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.pop_recorder());
        }
    }

    with_context(|ctx| ctx.push_untracked());
    let _guard = UntrackGuard;
    f()
}

// =============================================================================
// TESTS
// =============================================================================
