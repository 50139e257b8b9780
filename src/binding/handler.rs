// ============================================================================
// spark-bind - Binding Handlers
// The trait every binding type implements and the context it runs in
// ============================================================================
//
// A handler owns one direction or both: `pull` renders a source value into
// its element, `push` reads the element back into a value for the source.
// Handlers that push name the DOM events they listen to; the view wires
// those (plus any extra `events:` on the same element) to `push`.
// ============================================================================

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::binding::dom::{Dom, DomEvent, ElementId};
use crate::binding::resolver::Node;
use crate::binding::source::Bound;
use crate::collections::CollectionEvent;
use crate::core::error::Result;

// =============================================================================
// TRIGGER
// =============================================================================

/// Why a handler is running.
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// A store the expression references changed.
    Change,
    /// A collection the expression references changed structure.
    Collection(CollectionEvent),
    /// A DOM event fired on the element.
    Event(DomEvent),
}

// =============================================================================
// HANDLER TRAIT
// =============================================================================

/// One binding type.
///
/// # Example
///
/// ```
/// use spark_bind::binding::{BindingContext, BindingHandler, Bound};
/// use spark_bind::{display_string, Result};
///
/// /// Renders a value upper-cased.
/// struct Shout;
///
/// impl BindingHandler for Shout {
///     fn pull(&self, cx: &mut BindingContext<'_>, value: &Bound) -> Result<()> {
///         let text = display_string(&value.to_value()).to_uppercase();
///         cx.dom().set_text(cx.element(), &text);
///         Ok(())
///     }
/// }
/// ```
pub trait BindingHandler {
    /// DOM events that trigger `push`. Empty means the binding is one-way.
    fn events(&self) -> &[&'static str] {
        &[]
    }

    /// Sibling binding types on the same element whose changes re-pull this
    /// one.
    fn inputs(&self) -> &[&'static str] {
        &[]
    }

    /// Runs once, before the first `pull`.
    fn init(&self, _cx: &mut BindingContext<'_>, _value: &Bound) -> Result<()> {
        Ok(())
    }

    /// Render `value` into the element.
    fn pull(&self, cx: &mut BindingContext<'_>, value: &Bound) -> Result<()>;

    /// Read the element. `current` is the bound value before the event.
    ///
    /// `None` leaves the source untouched.
    fn push(&self, _cx: &mut BindingContext<'_>, _current: &Bound) -> Result<Option<Value>> {
        Ok(None)
    }

    /// Release anything `init`/`pull` created. Runs when the view unbinds.
    fn clean(&self, _cx: &mut BindingContext<'_>) {}
}

// =============================================================================
// SLOTS
// =============================================================================

/// One binding on one element, as compiled by the view.
pub(crate) struct Slot {
    pub kind: String,
    pub handler: Rc<dyn BindingHandler>,
    pub node: Node,
    pub state: std::cell::RefCell<Option<Box<dyn Any>>>,
}

impl Slot {
    pub fn new(kind: String, handler: Rc<dyn BindingHandler>, node: Node) -> Self {
        Self {
            kind,
            handler,
            node,
            state: std::cell::RefCell::new(None),
        }
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Everything a handler can reach while it runs.
pub struct BindingContext<'a> {
    dom: &'a Rc<dyn Dom>,
    element: ElementId,
    kind: &'a str,
    trigger: Option<&'a Trigger>,
    state: &'a mut Option<Box<dyn Any>>,
    siblings: &'a [Slot],
}

impl<'a> BindingContext<'a> {
    pub(crate) fn new(
        dom: &'a Rc<dyn Dom>,
        element: ElementId,
        kind: &'a str,
        trigger: Option<&'a Trigger>,
        state: &'a mut Option<Box<dyn Any>>,
        siblings: &'a [Slot],
    ) -> Self {
        Self {
            dom,
            element,
            kind,
            trigger,
            state,
            siblings,
        }
    }

    pub fn dom(&self) -> &dyn Dom {
        self.dom.as_ref()
    }

    /// Shared handle to the DOM, for creating child views.
    pub fn dom_handle(&self) -> &Rc<dyn Dom> {
        self.dom
    }

    pub fn element(&self) -> ElementId {
        self.element
    }

    /// The binding type being run, e.g. `"text"`.
    pub fn binding(&self) -> &str {
        self.kind
    }

    /// `None` for the initial render.
    pub fn trigger(&self) -> Option<&Trigger> {
        self.trigger
    }

    /// Per-binding state, created with `Default` on first access.
    ///
    /// State of a different type replaces whatever was stored.
    pub fn state<T: Default + 'static>(&mut self) -> &mut T {
        let fresh = !self
            .state
            .as_ref()
            .is_some_and(|state| state.is::<T>());
        if fresh {
            *self.state = Some(Box::new(T::default()));
        }
        match self.state.as_mut().and_then(|state| state.downcast_mut::<T>()) {
            Some(state) => state,
            None => unreachable!("state was just initialized with this type"),
        }
    }

    /// Remove and return per-binding state.
    pub fn take_state<T: 'static>(&mut self) -> Option<T> {
        let state = self.state.take()?;
        state.downcast::<T>().ok().map(|state| *state)
    }

    fn sibling(&self, kind: &str) -> Option<&Slot> {
        self.siblings.iter().find(|slot| slot.kind == kind)
    }

    /// Whether the element also carries a binding of type `kind`.
    pub fn has_sibling(&self, kind: &str) -> bool {
        self.sibling(kind).is_some()
    }

    /// Evaluate a sibling binding's expression.
    pub fn sibling_value(&self, kind: &str) -> Result<Option<Bound>> {
        self.sibling(kind).map(|slot| slot.node.evaluate()).transpose()
    }

    /// Write through a sibling binding's expression.
    ///
    /// Returns false when there is no such sibling or its expression is not
    /// writable.
    pub fn write_sibling(&self, kind: &str, value: Value) -> Result<bool> {
        match self.sibling(kind) {
            Some(slot) => slot.node.write(value),
            None => Ok(false),
        }
    }
}

impl fmt::Debug for BindingContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingContext")
            .field("element", &self.element)
            .field("binding", &self.kind)
            .field("trigger", &self.trigger)
            .finish()
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Binding types available to a view, by name.
#[derive(Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Rc<dyn BindingHandler>>,
}

impl HandlerRegistry {
    /// A registry with no handlers at all.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A registry holding every built-in binding type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        crate::binding::handlers::register_builtins(&mut registry);
        registry
    }

    /// Add or replace a handler.
    pub fn register(&mut self, name: impl Into<String>, handler: Rc<dyn BindingHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn BindingHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
