// ============================================================================
// spark-bind - View
// Binds an element subtree to stores and collections
// ============================================================================
//
// Building a view resolves every declaration once: descriptors are collected,
// expressions resolved against the view's sources and handlers looked up.
// Each binding is then pulled, subscribed to the stores and collections its
// expression (and its handler's sibling inputs) reference, and, for two-way
// handlers, wired to DOM events that push the element back.
//
// Callbacks hold weak references to the view, so the DOM and the stores never
// keep a view alive. Dropping or disposing the view cancels every
// subscription and lets handlers clean up.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, error, trace, warn};

use crate::binding::config::{Bindings, SourcePriority};
use crate::binding::dom::{Dom, DomEvent, ElementId, EventCallback};
use crate::binding::handler::{BindingContext, BindingHandler, HandlerRegistry, Slot, Trigger};
use crate::binding::handlers::CustomHandler;
use crate::binding::resolver::{collect_descriptors, Dependency, Node};
use crate::binding::source::{Bound, Source, SourceRegistry};
use crate::collections::Collection;
use crate::core::constants::{
    ANY_TOPIC, COLLECTION_SOURCE, MODEL_SOURCE, VIEW_MODEL_SOURCE, VIEW_SOURCE,
};
use crate::core::error::{Error, Result};
use crate::primitives::computed::ComputedDefinition;
use crate::primitives::store::Store;
use crate::reactivity::subscription::Subscription;

// =============================================================================
// OPTIONS
// =============================================================================

/// Everything a view is built from.
///
/// # Example
///
/// ```
/// use spark_bind::binding::{Bindings, ViewOptions};
/// use spark_bind::{ComputedDefinition, Store};
/// use serde_json::json;
///
/// let options = ViewOptions::new()
///     .model(Store::new(json!({"firstName": "Luke"})))
///     .bindings(Bindings::map([(":el", "text:greeting")]))
///     .computed(
///         "greeting",
///         ComputedDefinition::getter(|view, _| {
///             json!(format!("Hi {}", view.get("firstName").as_str().unwrap_or_default()))
///         }),
///     );
/// assert!(options.has_model());
/// ```
#[derive(Default)]
pub struct ViewOptions {
    model: Option<Store>,
    view_model: Option<Store>,
    collection: Option<Collection>,
    bindings: Bindings,
    sources: Vec<(String, Source)>,
    handlers: HandlerRegistry,
    computeds: Vec<(String, ComputedDefinition)>,
    priority: SourcePriority,
}

impl ViewOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model(mut self, model: Store) -> Self {
        self.model = Some(model);
        self
    }

    pub fn view_model(mut self, view_model: Store) -> Self {
        self.view_model = Some(view_model);
        self
    }

    /// Registered as `$collection`.
    pub fn collection(mut self, collection: Collection) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn bindings(mut self, bindings: Bindings) -> Self {
        self.bindings = bindings;
        self
    }

    /// Add a named source, reachable as `$name` and by bare or `name_key`
    /// property names.
    pub fn binding_source(mut self, name: impl Into<String>, source: impl Into<Source>) -> Self {
        self.sources.push((name.into(), source.into()));
        self
    }

    /// Add or override a binding type.
    pub fn binding_handler(
        mut self,
        name: impl Into<String>,
        handler: impl BindingHandler + 'static,
    ) -> Self {
        self.handlers.register(name, Rc::new(handler));
        self
    }

    /// Add a one-way binding type from a render closure.
    pub fn handler_fn(
        self,
        name: impl Into<String>,
        render: impl Fn(&dyn Dom, ElementId, &Bound) + 'static,
    ) -> Self {
        self.binding_handler(name, CustomHandler::render(render))
    }

    /// Declare a view-level computed. Its getter receives the view's own
    /// store, which serves every binding source's properties by bare name.
    pub fn computed(mut self, name: impl Into<String>, definition: ComputedDefinition) -> Self {
        self.computeds.push((name.into(), definition));
        self
    }

    pub fn source_priority(mut self, priority: SourcePriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }
}

impl fmt::Debug for ViewOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewOptions")
            .field("model", &self.model)
            .field("view_model", &self.view_model)
            .field("bindings", &self.bindings)
            .field("sources", &self.sources.len())
            .field("computeds", &self.computeds.len())
            .field("priority", &self.priority)
            .finish()
    }
}

// =============================================================================
// COMPILED BINDINGS
// =============================================================================

/// Every binding on one element.
struct ElementBindings {
    element: ElementId,
    slots: Vec<Slot>,
    /// Extra push events from an `events:` declaration.
    extra_events: Vec<String>,
}

impl ElementBindings {
    /// Push events for one slot: the handler's own plus any extras.
    fn events_for(&self, index: usize) -> Vec<String> {
        let own = self.slots[index].handler.events();
        if own.is_empty() {
            return Vec::new();
        }
        let mut events: Vec<String> = own.iter().map(|event| event.to_string()).collect();
        for extra in &self.extra_events {
            if !events.contains(extra) {
                events.push(extra.clone());
            }
        }
        events
    }

    /// Dependencies of a slot's expression and of its handler's inputs.
    fn dependencies_for(&self, index: usize) -> Vec<Dependency> {
        let slot = &self.slots[index];
        let mut dependencies = slot.node.dependencies();
        for input in slot.handler.inputs() {
            for sibling in self.slots.iter().filter(|s| s.kind == *input) {
                for dependency in sibling.node.dependencies() {
                    if !dependencies.contains(&dependency) {
                        dependencies.push(dependency);
                    }
                }
            }
        }
        dependencies
    }
}

fn event_names(node: &Node) -> Result<Vec<String>> {
    match node.evaluate()?.to_value() {
        Value::String(event) => Ok(vec![event]),
        Value::Array(events) => events
            .into_iter()
            .map(|event| match event {
                Value::String(event) => Ok(event),
                _ => Err(Error::binding_value("events", "event names")),
            })
            .collect(),
        _ => Err(Error::binding_value("events", "an event name or an array of them")),
    }
}

// =============================================================================
// VIEW
// =============================================================================

struct ViewInner {
    dom: Rc<dyn Dom>,
    root: ElementId,
    sources: Rc<SourceRegistry>,
    view_store: Option<Store>,
    elements: RefCell<Vec<Rc<ElementBindings>>>,
    subscriptions: RefCell<Vec<Subscription>>,
    disposed: Cell<bool>,
}

/// An element subtree bound to stores and collections.
///
/// # Example
///
/// ```
/// use std::rc::Rc;
/// use spark_bind::binding::{Dom, El, MemoryDom, View, ViewOptions};
/// use spark_bind::Store;
/// use serde_json::json;
///
/// let dom = Rc::new(MemoryDom::new());
/// let root = dom.build(
///     El::new("div")
///         .child(El::new("span").bind("text:firstName"))
///         .child(El::new("input").bind("value:firstName")),
/// );
/// let model = Store::new(json!({"firstName": "Luke"}));
/// let view = View::new(dom.clone(), root, ViewOptions::new().model(model.clone())).unwrap();
///
/// let children = dom.children(root);
/// let (span, input) = (children[0], children[1]);
/// assert_eq!(dom.text(span), "Luke");
///
/// // Model to DOM
/// model.set("firstName", json!("Leia")).unwrap();
/// assert_eq!(dom.value(input), "Leia");
///
/// // DOM to model
/// dom.set_value(input, "Han");
/// dom.trigger(input, "change");
/// assert_eq!(model.get("firstName"), json!("Han"));
/// assert_eq!(dom.text(span), "Han");
/// # drop(view);
/// ```
pub struct View {
    inner: Rc<ViewInner>,
}

impl View {
    /// Bind `root` and its subtree.
    ///
    /// # Errors
    /// Fails on malformed declarations, unknown binding types, names no
    /// source can resolve, and handler errors during the first render.
    pub fn new(dom: Rc<dyn Dom>, root: ElementId, options: ViewOptions) -> Result<View> {
        let ViewOptions {
            model,
            view_model,
            collection,
            bindings,
            sources: custom_sources,
            handlers,
            computeds,
            priority,
        } = options;

        let mut sources = SourceRegistry::new();
        let defaults = match priority {
            SourcePriority::ModelFirst => [(MODEL_SOURCE, model), (VIEW_MODEL_SOURCE, view_model)],
            SourcePriority::ViewModelFirst => {
                [(VIEW_MODEL_SOURCE, view_model), (MODEL_SOURCE, model)]
            }
        };
        for (name, store) in defaults {
            if let Some(store) = store {
                sources.register(name, store);
            }
        }
        let view_store = (!computeds.is_empty()).then(Store::default);
        if let Some(store) = &view_store {
            sources.register(VIEW_SOURCE, store.clone());
        }
        if let Some(collection) = collection {
            sources.register(COLLECTION_SOURCE, collection);
        }
        for (name, source) in custom_sources {
            sources.register(name, source);
        }
        let sources = Rc::new(sources);

        if let Some(store) = &view_store {
            let registry = Rc::downgrade(&sources);
            store.set_read_delegate(Rc::new(move |key: &str| {
                let registry = registry.upgrade()?;
                let found = registry.resolve_excluding(key, Some(VIEW_SOURCE))?;
                Some(found.store.get(&found.key))
            }));
            store.add_computeds(computeds);
        }

        let inner = Rc::new(ViewInner {
            dom,
            root,
            sources,
            view_store,
            elements: RefCell::new(Vec::new()),
            subscriptions: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
        });

        let elements = inner.compile(&bindings, &handlers)?;
        *inner.elements.borrow_mut() = elements.clone();
        for element in &elements {
            inner.bind_element(element)?;
        }

        debug!(
            root = %root,
            elements = elements.len(),
            bindings = elements.iter().map(|e| e.slots.len()).sum::<usize>(),
            "view bound"
        );
        Ok(View { inner })
    }

    pub fn root(&self) -> ElementId {
        self.inner.root
    }

    pub fn dom(&self) -> &Rc<dyn Dom> {
        &self.inner.dom
    }

    /// The sources bindings resolve against, in lookup order.
    pub fn sources(&self) -> &SourceRegistry {
        &self.inner.sources
    }

    /// The store holding view-level computeds, if any were declared.
    pub fn view_store(&self) -> Option<&Store> {
        self.inner.view_store.as_ref()
    }

    /// Read a property by bare or namespaced name.
    pub fn get_binding(&self, name: &str) -> Result<Value> {
        let found = self.resolve(name)?;
        Ok(found.store.get(&found.key))
    }

    /// Write a property by bare or namespaced name.
    pub fn set_binding(&self, name: &str, value: Value) -> Result<()> {
        let found = self.resolve(name)?;
        found.store.set(&found.key, value)
    }

    fn resolve(&self, name: &str) -> Result<crate::binding::source::ResolvedProperty> {
        self.inner
            .sources
            .resolve_property(name)
            .ok_or_else(|| Error::UnresolvedBinding {
                binding: "get_binding".to_string(),
                name: name.to_string(),
            })
    }

    /// Stop every binding and let handlers clean up. The DOM is left as is.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Dispose and detach the root element.
    pub fn remove(&self) {
        self.inner.dispose();
        self.inner.dom.detach(self.inner.root);
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("root", &self.inner.root)
            .field("sources", &self.inner.sources.names())
            .field("disposed", &self.inner.disposed.get())
            .finish()
    }
}

// =============================================================================
// VIEW INTERNALS
// =============================================================================

impl ViewInner {
    fn compile(
        &self,
        bindings: &Bindings,
        handlers: &HandlerRegistry,
    ) -> Result<Vec<Rc<ElementBindings>>> {
        let descriptors = collect_descriptors(self.dom.as_ref(), self.root, bindings)?;

        let mut grouped: Vec<(ElementId, Vec<Slot>)> = Vec::new();
        for descriptor in descriptors {
            let handler = handlers.get(&descriptor.kind).ok_or_else(|| {
                Error::UnknownBindingHandler {
                    binding: descriptor.kind.clone(),
                }
            })?;
            let node = Node::resolve(&descriptor.expr, &self.sources, &descriptor.kind)?;
            let slot = Slot::new(descriptor.kind, handler, node);
            match grouped.iter_mut().find(|(el, _)| *el == descriptor.element) {
                Some((_, slots)) => slots.push(slot),
                None => grouped.push((descriptor.element, vec![slot])),
            }
        }

        grouped
            .into_iter()
            .map(|(element, slots)| -> Result<Rc<ElementBindings>> {
                let mut extra_events = Vec::new();
                for slot in slots.iter().filter(|slot| slot.kind == "events") {
                    extra_events.extend(event_names(&slot.node)?);
                }
                Ok(Rc::new(ElementBindings {
                    element,
                    slots,
                    extra_events,
                }))
            })
            .collect()
    }

    fn bind_element(self: &Rc<Self>, element: &Rc<ElementBindings>) -> Result<()> {
        for index in 0..element.slots.len() {
            let value = element.slots[index].node.evaluate()?;
            self.run(element, index, None, |handler, cx| handler.init(cx, &value))?;
            self.run(element, index, None, |handler, cx| handler.pull(cx, &value))?;

            for dependency in element.dependencies_for(index) {
                let subscription = self.subscribe(element, index, dependency);
                self.subscriptions.borrow_mut().push(subscription);
            }
            for event in element.events_for(index) {
                let subscription = self.listen(element, index, &event);
                self.subscriptions.borrow_mut().push(subscription);
            }
        }
        Ok(())
    }

    /// Run a handler method with a fresh context. `None` when the binding is
    /// already running further up the stack.
    fn run<R>(
        &self,
        element: &ElementBindings,
        index: usize,
        trigger: Option<&Trigger>,
        f: impl FnOnce(&dyn BindingHandler, &mut BindingContext<'_>) -> Result<R>,
    ) -> Result<Option<R>> {
        let slot = &element.slots[index];
        let Ok(mut state) = slot.state.try_borrow_mut() else {
            trace!(binding = %slot.kind, element = %element.element, "binding busy, skipped");
            return Ok(None);
        };
        let mut cx = BindingContext::new(
            &self.dom,
            element.element,
            &slot.kind,
            trigger,
            &mut state,
            &element.slots,
        );
        f(slot.handler.as_ref(), &mut cx).map(Some)
    }

    fn pull(&self, element: &ElementBindings, index: usize, trigger: &Trigger) -> Result<()> {
        let value = element.slots[index].node.evaluate()?;
        self.run(element, index, Some(trigger), |handler, cx| handler.pull(cx, &value))?;
        Ok(())
    }

    fn push(&self, element: &ElementBindings, index: usize, event: &DomEvent) -> Result<()> {
        let slot = &element.slots[index];
        let current = slot.node.evaluate()?;
        let trigger = Trigger::Event(event.clone());
        let pushed = self.run(element, index, Some(&trigger), |handler, cx| {
            handler.push(cx, &current)
        })?;
        // State borrow is released before writing; the write re-pulls
        if let Some(Some(value)) = pushed {
            if !slot.node.write(value)? {
                debug!(binding = %slot.kind, element = %element.element, "binding is read-only");
            }
        }
        Ok(())
    }

    fn subscribe(
        self: &Rc<Self>,
        element: &Rc<ElementBindings>,
        index: usize,
        dependency: Dependency,
    ) -> Subscription {
        let view = Rc::downgrade(self);
        let bindings = Rc::downgrade(element);
        let repull = move |trigger: Trigger| {
            let (Some(view), Some(element)) = (view.upgrade(), bindings.upgrade()) else {
                return;
            };
            if view.disposed.get() {
                return;
            }
            if let Err(err) = view.pull(&element, index, &trigger) {
                warn!(
                    binding = %element.slots[index].kind,
                    element = %element.element,
                    error = %err,
                    "binding update failed"
                );
            }
        };

        match dependency {
            Dependency::Property(store, key) => {
                store.on_change(key, move |_| repull(Trigger::Change))
            }
            Dependency::Store(store) => store.on_change(ANY_TOPIC, move |_| repull(Trigger::Change)),
            Dependency::Collection(collection) => {
                collection.on_event(move |event| repull(Trigger::Collection(event.clone())))
            }
        }
    }

    fn listen(self: &Rc<Self>, element: &Rc<ElementBindings>, index: usize, event: &str) -> Subscription {
        let view: Weak<ViewInner> = Rc::downgrade(self);
        let bindings = Rc::downgrade(element);
        let callback: EventCallback = Rc::new(move |event: &DomEvent| {
            let (Some(view), Some(element)) = (view.upgrade(), bindings.upgrade()) else {
                return;
            };
            if view.disposed.get() {
                return;
            }
            if let Err(err) = view.push(&element, index, event) {
                error!(
                    binding = %element.slots[index].kind,
                    element = %element.element,
                    event = %event.name,
                    error = %err,
                    "binding push failed"
                );
            }
        });

        let el = element.element;
        let id = self.dom.listen(el, event, callback);
        let dom = Rc::downgrade(&self.dom);
        Subscription::new(move || {
            if let Some(dom) = dom.upgrade() {
                dom.unlisten(el, id);
            }
        })
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let subscriptions = std::mem::take(&mut *self.subscriptions.borrow_mut());
        drop(subscriptions);

        let elements = std::mem::take(&mut *self.elements.borrow_mut());
        for element in &elements {
            for index in 0..element.slots.len() {
                let _ = self.run(element, index, None, |handler, cx| {
                    handler.clean(cx);
                    Ok(())
                });
            }
        }

        if let Some(store) = &self.view_store {
            store.clear_computeds();
            store.clear_read_delegate();
        }
        debug!(root = %self.root, "view disposed");
    }
}

impl Drop for ViewInner {
    fn drop(&mut self) {
        self.dispose();
    }
}
