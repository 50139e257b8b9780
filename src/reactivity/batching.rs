// ============================================================================
// spark-bind - Batching
// Group attribute writes so every notification fires once per settled change
// ============================================================================
//
// Writes happen in two phases. While a batch is open, a write updates the
// attribute, invalidates dependent computeds (synchronously, transitively)
// and queues the key. When the outermost batch closes, the flush recomputes
// every invalidated computed, keeps the ones whose value really changed, and
// delivers per-key then per-store notifications. Every `Store::set` opens a
// batch, so a multi-key set and the whole setter chain it triggers settle
// as one unit.
// ============================================================================

use std::rc::Rc;

use tracing::trace;

use crate::core::constants::MAX_FLUSH_ITERATIONS;
use crate::core::context::with_context;
use crate::primitives::computed::ComputedCell;
use crate::primitives::store::{Store, StoreInner};
use crate::reactivity::tracking::untrack;

// =============================================================================
// BATCH
// =============================================================================

/// Run `f` as one batch: notifications are delivered after it returns.
///
/// Batches nest; only the outermost one flushes.
///
/// # Example
///
/// ```
/// use spark_bind::{batch, Store, ComputedDefinition};
/// use serde_json::json;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// let store = Store::new(json!({"first": "Charlie", "last": "Brown"}));
/// store.add_computed("full", ComputedDefinition::getter(|s, _| {
///     json!(format!("{} {}", s.get("first").as_str().unwrap_or(""), s.get("last").as_str().unwrap_or("")))
/// }));
/// assert_eq!(store.get("full"), json!("Charlie Brown"));
///
/// let fired = Rc::new(Cell::new(0));
/// let _sub = store.on_change("full", {
///     let fired = fired.clone();
///     move |_| fired.set(fired.get() + 1)
/// });
///
/// batch(|| {
///     store.set("first", json!("Sally")).unwrap();
///     store.set("last", json!("Black")).unwrap();
/// });
///
/// assert_eq!(fired.get(), 1);
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    with_context(|ctx| ctx.enter_batch());

    // Use a guard pattern to ensure we exit the batch even on panic
    struct BatchGuard;

    impl Drop for BatchGuard {
        fn drop(&mut self) {
            let depth = with_context(|ctx| ctx.exit_batch());

            // When outermost batch completes, deliver what it queued
            if depth == 0 && !std::thread::panicking() {
                flush();
            }
        }
    }

    let _guard = BatchGuard;
    f()
}

// =============================================================================
// FLUSH
// =============================================================================

/// Deliver every queued notification.
///
/// Listeners run inside the flush and may write again; those writes queue
/// more work that the same flush loop picks up, so re-entrant calls return
/// immediately instead of recursing.
pub fn flush() {
    let was_flushing = with_context(|ctx| ctx.set_flushing(true));
    if was_flushing {
        return;
    }

    struct FlushGuard;

    impl Drop for FlushGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.set_flushing(false));
        }
    }

    let _guard = FlushGuard;
    untrack(run_flush_loop);
}

fn run_flush_loop() {
    let mut iterations = 0;

    loop {
        iterations += 1;
        if iterations > MAX_FLUSH_ITERATIONS {
            with_context(|ctx| {
                ctx.take_pending_changes();
                ctx.take_pending_computeds();
            });
            panic!(
                "Maximum update depth exceeded. This can happen when a change \
                 listener keeps writing to the stores it observes."
            );
        }

        let changes = with_context(|ctx| ctx.take_pending_changes());
        let computeds = with_context(|ctx| ctx.take_pending_computeds());

        if changes.is_empty() && computeds.is_empty() {
            break;
        }

        let mut notices = Notices::default();

        for change in changes {
            if let Some(store) = change.store.upgrade() {
                notices.push(store, change.key);
            }
        }

        // A cell read and invalidated again within the batch is queued once
        // per invalidation; only the value it held before the first counts
        let mut seen: Vec<Rc<ComputedCell>> = Vec::new();
        for pending in computeds {
            let (Some(cell), Some(store)) = (pending.cell.upgrade(), pending.store.upgrade())
            else {
                continue;
            };
            if seen.iter().any(|earlier| Rc::ptr_eq(earlier, &cell)) {
                continue;
            }
            seen.push(cell.clone());
            let fresh = cell.evaluate(&Store::from_inner(store.clone()));
            if pending.stale.as_ref() != Some(&fresh) {
                notices.push(store, cell.name().to_string());
            } else {
                trace!(computed = cell.name(), "recomputed to the same value");
            }
        }

        notices.deliver();
    }
}

// =============================================================================
// NOTICES
// =============================================================================

/// Changed keys grouped per store, in first-write order.
#[derive(Default)]
struct Notices {
    stores: Vec<(Rc<StoreInner>, Vec<String>)>,
}

impl Notices {
    fn push(&mut self, store: Rc<StoreInner>, key: String) {
        match self
            .stores
            .iter_mut()
            .find(|(existing, _)| existing.id() == store.id())
        {
            Some((_, keys)) => {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
            None => self.stores.push((store, vec![key])),
        }
    }

    fn deliver(self) {
        for (store, keys) in self.stores {
            trace!(store = %store.id(), ?keys, "delivering change notifications");
            for key in &keys {
                store.emit_change(key);
            }
            store.emit_any(&keys);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
