// ============================================================================
// spark-bind - Reactive Context
// Thread-local state for dependency recording and change batching
// ============================================================================

use std::cell::{Cell, RefCell};
use std::rc::Weak;

use serde_json::Value;

use crate::primitives::computed::ComputedCell;
use crate::primitives::store::StoreInner;
use crate::reactivity::tracking::DependencyRef;

// =============================================================================
// PENDING WORK
// =============================================================================

/// A computed property invalidated during the current batch.
///
/// `stale` is the value it held when it was invalidated; the flush compares
/// it against the recomputed value to decide whether to notify.
pub struct PendingComputed {
    pub cell: Weak<ComputedCell>,
    pub store: Weak<StoreInner>,
    pub stale: Option<Value>,
}

/// A native attribute written during the current batch.
pub struct PendingChange {
    pub store: Weak<StoreInner>,
    pub key: String,
}

// =============================================================================
// REACTIVE CONTEXT
// =============================================================================

/// Thread-local context holding all global state for tracking and batching.
///
/// The recorder stack is what makes cross-store dependencies work: every
/// store's `get` consults the same stack, so a getter that closes over a
/// foreign store records reads on it exactly like reads on its own store.
pub struct ReactiveContext {
    // =========================================================================
    // DEPENDENCY RECORDING
    // =========================================================================
    /// One frame per evaluation in progress; `None` frames suspend recording.
    pub recorders: RefCell<Vec<Option<Vec<DependencyRef>>>>,

    // =========================================================================
    // BATCHING
    // =========================================================================
    /// Current batch depth (for nested batches)
    pub batch_depth: Cell<u32>,

    /// Computed properties invalidated since the last flush
    pub pending_computeds: RefCell<Vec<PendingComputed>>,

    /// Native attribute writes since the last flush
    pub pending_changes: RefCell<Vec<PendingChange>>,

    /// Whether a flush is currently delivering notifications
    pub is_flushing: Cell<bool>,
}

impl ReactiveContext {
    /// Create a new reactive context with default values
    pub fn new() -> Self {
        Self {
            recorders: RefCell::new(Vec::new()),
            batch_depth: Cell::new(0),
            pending_computeds: RefCell::new(Vec::new()),
            pending_changes: RefCell::new(Vec::new()),
            is_flushing: Cell::new(false),
        }
    }

    // =========================================================================
    // DEPENDENCY RECORDING
    // =========================================================================

    /// Open a recording frame.
    pub fn push_recorder(&self) {
        self.recorders.borrow_mut().push(Some(Vec::new()));
    }

    /// Open a frame that ignores reads.
    pub fn push_untracked(&self) {
        self.recorders.borrow_mut().push(None);
    }

    /// Close the innermost frame, returning what it recorded.
    pub fn pop_recorder(&self) -> Vec<DependencyRef> {
        self.recorders.borrow_mut().pop().flatten().unwrap_or_default()
    }

    /// Record a read in the innermost frame, if it is recording.
    pub fn record(&self, dep: DependencyRef) {
        let mut recorders = self.recorders.borrow_mut();
        if let Some(Some(frame)) = recorders.last_mut() {
            if !frame.contains(&dep) {
                frame.push(dep);
            }
        }
    }

    /// Whether reads are currently being recorded.
    pub fn is_recording(&self) -> bool {
        matches!(self.recorders.borrow().last(), Some(Some(_)))
    }

    // =========================================================================
    // BATCHING
    // =========================================================================

    /// Increment batch depth, returns new depth
    pub fn enter_batch(&self) -> u32 {
        let depth = self.batch_depth.get() + 1;
        self.batch_depth.set(depth);
        depth
    }

    /// Decrement batch depth, returns new depth
    pub fn exit_batch(&self) -> u32 {
        let depth = self.batch_depth.get().saturating_sub(1);
        self.batch_depth.set(depth);
        depth
    }

    /// Check if currently in a batch
    pub fn is_batching(&self) -> bool {
        self.batch_depth.get() > 0
    }

    /// Queue an invalidated computed for the next flush
    pub fn add_pending_computed(&self, pending: PendingComputed) {
        self.pending_computeds.borrow_mut().push(pending);
    }

    /// Queue a native attribute change for the next flush
    pub fn add_pending_change(&self, change: PendingChange) {
        self.pending_changes.borrow_mut().push(change);
    }

    /// Take all queued computeds
    pub fn take_pending_computeds(&self) -> Vec<PendingComputed> {
        self.pending_computeds.replace(Vec::new())
    }

    /// Take all queued attribute changes
    pub fn take_pending_changes(&self) -> Vec<PendingChange> {
        self.pending_changes.replace(Vec::new())
    }

    /// Set flushing mode, returning previous
    pub fn set_flushing(&self, value: bool) -> bool {
        self.is_flushing.replace(value)
    }

    /// Check if a flush is in progress
    pub fn is_flushing(&self) -> bool {
        self.is_flushing.get()
    }
}

impl Default for ReactiveContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// THREAD-LOCAL ACCESS
// =============================================================================

thread_local! {
    /// The thread-local reactive context
    static CONTEXT: ReactiveContext = ReactiveContext::new();
}

/// Access the thread-local reactive context.
pub fn with_context<R>(f: impl FnOnce(&ReactiveContext) -> R) -> R {
    CONTEXT.with(f)
}

/// Check if reads are currently being recorded as dependencies
pub fn is_tracking() -> bool {
    with_context(|ctx| ctx.is_recording())
}

/// Check if currently in a batch
pub fn is_batching() -> bool {
    with_context(|ctx| ctx.is_batching())
}

// =============================================================================
// TESTS
// =============================================================================
