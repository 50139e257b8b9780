// ============================================================================
// spark-bind - Subscriptions
// Listener lists and the RAII tokens that detach from them
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Teardown callback run when a subscription ends.
pub type DisposeFn = Box<dyn FnOnce()>;

/// Token returned by every `on_*` registration.
///
/// Dropping the token unsubscribes. Keep it for as long as the callback
/// should keep firing, or call [`Subscription::detach`] to keep the listener
/// for the lifetime of whatever it listens to.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    dispose: Option<DisposeFn>,
}

impl Subscription {
    /// Wrap a teardown callback.
    pub fn new(dispose: impl FnOnce() + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// A subscription that holds nothing.
    pub fn empty() -> Self {
        Self { dispose: None }
    }

    /// Unsubscribe now.
    pub fn cancel(mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }

    /// Keep the listener registered without holding the token.
    pub fn detach(mut self) {
        self.dispose = None;
    }

    /// Whether this token still owns a registration.
    pub fn is_active(&self) -> bool {
        self.dispose.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

// =============================================================================
// EMITTER
// =============================================================================

/// Identifies one listener inside an [`Emitter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<E> = Rc<dyn Fn(&E)>;

/// An ordered list of callbacks for one kind of event.
///
/// # Borrow Safety
/// `emit` snapshots the listener list before calling anything, so callbacks
/// may freely add or remove listeners (including themselves) on the same
/// emitter.
pub struct Emitter<E> {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(ListenerId, Listener<E>)>>,
}

impl<E> Emitter<E> {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            listeners: RefCell::new(Vec::new()),
        }
    }

    /// Register a callback, returning its id.
    pub fn add(&self, listener: impl Fn(&E) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.listeners.borrow_mut().push((id, Rc::new(listener)));
        id
    }

    /// Remove a callback. Returns false if it was already gone.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Call every listener registered at the time of the call.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = self
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// TESTS
// =============================================================================
