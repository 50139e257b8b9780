// ============================================================================
// spark-bind - Collection
// An ordered list of record stores with structural change events
// ============================================================================
//
// Records are plain `Store`s; the collection only reports structure (add,
// remove, reset, sort). A record's own attribute changes are observed on
// the record itself, which is how each child view of a `collection:`
// binding keeps its own display current.
// ============================================================================

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::{Rc, Weak};

use serde_json::Value;
use tracing::{debug, trace};

use crate::binding::dom::Dom;
use crate::binding::view::View;
use crate::core::error::Result;
use crate::core::types::display_string;
use crate::primitives::store::Store;
use crate::reactivity::subscription::{Emitter, Subscription};

/// Builds the child view rendering one record of a `collection:` binding.
pub type ItemViewFactory = Rc<dyn Fn(&Rc<dyn Dom>, &Store) -> Result<View>>;

// =============================================================================
// EVENTS
// =============================================================================

/// A structural change to a collection.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectionEvent {
    /// Records inserted as a contiguous run starting at `index`.
    Add { records: Vec<Store>, index: usize },
    /// One record removed from `index`.
    Remove { record: Store, index: usize },
    /// Contents replaced wholesale.
    Reset,
    /// Same records, new order.
    Sort,
}

// =============================================================================
// COLLECTION
// =============================================================================

struct CollectionInner {
    records: RefCell<Vec<Store>>,
    events: Emitter<CollectionEvent>,
    item_view: RefCell<Option<ItemViewFactory>>,
}

/// An ordered, observable list of records.
///
/// `Collection` is a cheap handle; clones share the same records.
///
/// # Example
///
/// ```
/// use spark_bind::{Collection, CollectionEvent, Store};
/// use serde_json::json;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let names = Collection::new();
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let _sub = names.on_event({
///     let log = log.clone();
///     move |event| {
///         log.borrow_mut().push(match event {
///             CollectionEvent::Add { .. } => "add",
///             CollectionEvent::Remove { .. } => "remove",
///             CollectionEvent::Reset => "reset",
///             CollectionEvent::Sort => "sort",
///         })
///     }
/// });
///
/// names.add_json(json!({"name": "Luke"}));
/// names.reset_json(json!([{"name": "Han"}, {"name": "Chewy"}]));
///
/// assert_eq!(names.len(), 2);
/// assert_eq!(names.at(1).map(|r| r.get("name")), Some(json!("Chewy")));
/// assert_eq!(*log.borrow(), vec!["add", "reset"]);
/// ```
#[derive(Clone)]
pub struct Collection {
    inner: Rc<CollectionInner>,
}

impl Collection {
    pub fn new() -> Self {
        Self::from_records(Vec::new())
    }

    pub fn from_records(records: Vec<Store>) -> Self {
        Self {
            inner: Rc::new(CollectionInner {
                records: RefCell::new(records),
                events: Emitter::new(),
                item_view: RefCell::new(None),
            }),
        }
    }

    /// Build records from a JSON array of objects.
    pub fn from_json(records: Value) -> Self {
        Self::from_records(records_from_json(records))
    }

    /// Attach the factory `collection:` bindings use to render each record.
    pub fn with_item_view(
        self,
        factory: impl Fn(&Rc<dyn Dom>, &Store) -> Result<View> + 'static,
    ) -> Self {
        *self.inner.item_view.borrow_mut() = Some(Rc::new(factory));
        self
    }

    pub fn item_view(&self) -> Option<ItemViewFactory> {
        self.inner.item_view.borrow().clone()
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn len(&self) -> usize {
        self.inner.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn at(&self, index: usize) -> Option<Store> {
        self.inner.records.borrow().get(index).cloned()
    }

    pub fn first(&self) -> Option<Store> {
        self.at(0)
    }

    pub fn index_of(&self, record: &Store) -> Option<usize> {
        self.inner
            .records
            .borrow()
            .iter()
            .position(|existing| existing.ptr_eq(record))
    }

    /// Snapshot of the records in order.
    pub fn records(&self) -> Vec<Store> {
        self.inner.records.borrow().clone()
    }

    /// Every record's native attributes, in order.
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.inner
                .records
                .borrow()
                .iter()
                .map(|record| Value::Object(record.to_json(false)))
                .collect(),
        )
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Append one record.
    pub fn add(&self, record: Store) {
        self.add_many(vec![record]);
    }

    /// Append one record built from a JSON object, returning it.
    pub fn add_json(&self, attributes: Value) -> Store {
        let record = Store::new(attributes);
        self.add(record.clone());
        record
    }

    /// Append records as one contiguous run.
    ///
    /// Records already in the collection are skipped.
    pub fn add_many(&self, records: Vec<Store>) {
        let fresh: Vec<Store> = records
            .into_iter()
            .filter(|record| self.index_of(record).is_none())
            .collect();
        if fresh.is_empty() {
            return;
        }
        let index = {
            let mut existing = self.inner.records.borrow_mut();
            let index = existing.len();
            existing.extend(fresh.iter().cloned());
            index
        };
        trace!(added = fresh.len(), index, "collection add");
        self.inner.events.emit(&CollectionEvent::Add {
            records: fresh,
            index,
        });
    }

    /// Insert one record at `index` (clamped to the end).
    pub fn insert(&self, index: usize, record: Store) {
        if self.index_of(&record).is_some() {
            return;
        }
        let index = {
            let mut existing = self.inner.records.borrow_mut();
            let index = index.min(existing.len());
            existing.insert(index, record.clone());
            index
        };
        self.inner.events.emit(&CollectionEvent::Add {
            records: vec![record],
            index,
        });
    }

    /// Remove a record. Returns false if it was not present.
    pub fn remove(&self, record: &Store) -> bool {
        let Some(index) = self.index_of(record) else {
            return false;
        };
        let record = self.inner.records.borrow_mut().remove(index);
        trace!(index, "collection remove");
        self.inner.events.emit(&CollectionEvent::Remove { record, index });
        true
    }

    /// Replace every record.
    pub fn reset(&self, records: Vec<Store>) {
        *self.inner.records.borrow_mut() = records;
        debug!(len = self.len(), "collection reset");
        self.inner.events.emit(&CollectionEvent::Reset);
    }

    /// Replace every record with ones built from a JSON array.
    pub fn reset_json(&self, records: Value) {
        self.reset(records_from_json(records));
    }

    /// Reorder records with a comparator.
    pub fn sort_by(&self, mut compare: impl FnMut(&Store, &Store) -> Ordering) {
        self.inner.records.borrow_mut().sort_by(|a, b| compare(a, b));
        self.inner.events.emit(&CollectionEvent::Sort);
    }

    /// Reorder records by the display text of one attribute.
    pub fn sort_by_attribute(&self, key: &str) {
        self.sort_by(|a, b| display_string(&a.get(key)).cmp(&display_string(&b.get(key))));
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Listen for structural changes.
    pub fn on_event(&self, callback: impl Fn(&CollectionEvent) + 'static) -> Subscription {
        let id = self.inner.events.add(callback);
        let weak: Weak<CollectionInner> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.events.remove(id);
            }
        })
    }

    pub fn listener_count(&self) -> usize {
        self.inner.events.len()
    }

    /// Whether two handles share the same records.
    pub fn ptr_eq(&self, other: &Collection) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for Collection {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("len", &self.len())
            .field("item_view", &self.inner.item_view.borrow().is_some())
            .finish()
    }
}

fn records_from_json(records: Value) -> Vec<Store> {
    match records {
        Value::Array(items) => items.into_iter().map(Store::new).collect(),
        Value::Null => Vec::new(),
        single => vec![Store::new(single)],
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder(collection: &Collection) -> (Rc<RefCell<Vec<CollectionEvent>>>, Subscription) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sub = collection.on_event({
            let log = log.clone();
            move |event| log.borrow_mut().push(event.clone())
        });
        (log, sub)
    }

    #[test]
    fn add_reports_the_insertion_index() {
        let collection = Collection::from_json(json!([{"name": "A"}]));
        let (log, _sub) = recorder(&collection);

        let b = Store::new(json!({"name": "B"}));
        let c = Store::new(json!({"name": "C"}));
        collection.add_many(vec![b.clone(), c.clone()]);

        assert_eq!(
            *log.borrow(),
            vec![CollectionEvent::Add {
                records: vec![b.clone(), c],
                index: 1
            }]
        );

        // Duplicates are ignored
        collection.add(b);
        assert_eq!(log.borrow().len(), 1);
        assert_eq!(collection.len(), 3);
    }

    #[test]
    fn remove_reports_the_old_index() {
        let collection = Collection::from_json(json!([{"n": 1}, {"n": 2}]));
        let second = collection.at(1).unwrap();
        let (log, _sub) = recorder(&collection);

        assert!(collection.remove(&second));
        assert!(!collection.remove(&second));
        assert_eq!(
            *log.borrow(),
            vec![CollectionEvent::Remove {
                record: second,
                index: 1
            }]
        );
    }

    #[test]
    fn sort_and_reset() {
        let collection = Collection::from_json(json!([{"name": "B"}, {"name": "A"}]));
        let (log, _sub) = recorder(&collection);

        collection.sort_by_attribute("name");
        assert_eq!(collection.first().map(|r| r.get("name")), Some(json!("A")));

        collection.reset_json(json!([]));
        assert!(collection.is_empty());
        assert_eq!(*log.borrow(), vec![CollectionEvent::Sort, CollectionEvent::Reset]);
    }

    #[test]
    fn insert_clamps_to_the_end() {
        let collection = Collection::from_json(json!([{"n": 1}]));
        let record = Store::new(json!({"n": 2}));
        collection.insert(10, record.clone());
        assert_eq!(collection.index_of(&record), Some(1));
        assert_eq!(collection.to_json(), json!([{"n": 1}, {"n": 2}]));
    }

    #[test]
    fn dropping_the_subscription_stops_events() {
        let collection = Collection::new();
        let (log, sub) = recorder(&collection);
        assert_eq!(collection.listener_count(), 1);
        drop(sub);
        assert_eq!(collection.listener_count(), 0);
        collection.add_json(json!({}));
        assert!(log.borrow().is_empty());
    }
}
