// ============================================================================
// spark-bind - Collection Handler
// One child view per record, kept in collection order
// ============================================================================

use std::rc::Rc;

use tracing::debug;

use crate::binding::dom::{Dom, ElementId};
use crate::binding::handler::{BindingContext, BindingHandler, Trigger};
use crate::binding::source::Bound;
use crate::binding::view::View;
use crate::collections::{Collection, CollectionEvent, ItemViewFactory};
use crate::core::error::{Error, Result};
use crate::core::types::StoreId;

/// Child views, in collection order.
#[derive(Default)]
struct Children {
    views: Vec<(StoreId, View)>,
}

impl Children {
    fn position(&self, id: StoreId) -> Option<usize> {
        self.views.iter().position(|(record, _)| *record == id)
    }

    fn clear(&mut self) {
        for (_, view) in self.views.drain(..) {
            view.remove();
        }
    }
}

/// `collection:$collection` renders one item view per record.
///
/// Adds and removes touch only the affected children; a sort reorders the
/// existing children; a reset rebuilds them all.
pub struct CollectionView;

impl CollectionView {
    fn sync(
        dom: &Rc<dyn Dom>,
        el: ElementId,
        collection: &Collection,
        factory: &ItemViewFactory,
        trigger: Option<&Trigger>,
        children: &mut Children,
    ) -> Result<()> {
        match trigger {
            Some(Trigger::Collection(CollectionEvent::Add { records, index })) => {
                for (offset, record) in records.iter().enumerate() {
                    let view = factory(dom, record)?;
                    let at = (index + offset).min(children.views.len());
                    dom.insert_child(el, view.root(), at);
                    children.views.insert(at, (record.id(), view));
                }
            }
            Some(Trigger::Collection(CollectionEvent::Remove { record, .. })) => {
                if let Some(position) = children.position(record.id()) {
                    let (_, view) = children.views.remove(position);
                    view.remove();
                }
            }
            Some(Trigger::Collection(CollectionEvent::Sort)) => {
                for (target, record) in collection.records().iter().enumerate() {
                    if let Some(position) = children.position(record.id()) {
                        let entry = children.views.remove(position);
                        children.views.insert(target.min(children.views.len()), entry);
                    }
                }
                for (_, view) in &children.views {
                    dom.append_child(el, view.root());
                }
            }
            _ => {
                children.clear();
                for record in collection.records() {
                    let view = factory(dom, &record)?;
                    dom.append_child(el, view.root());
                    children.views.push((record.id(), view));
                }
            }
        }
        debug!(element = %el, children = children.views.len(), "collection synced");
        Ok(())
    }
}

impl BindingHandler for CollectionView {
    fn pull(&self, cx: &mut BindingContext<'_>, value: &Bound) -> Result<()> {
        let Some(collection) = value.as_collection() else {
            return Err(Error::binding_value(cx.binding(), "a collection source"));
        };
        let Some(factory) = collection.item_view() else {
            return Err(Error::binding_value(cx.binding(), "a collection with an item view"));
        };

        let dom = cx.dom_handle().clone();
        let el = cx.element();
        let trigger = cx.trigger().cloned();
        let mut children = cx.take_state::<Children>().unwrap_or_default();
        let result = Self::sync(&dom, el, collection, &factory, trigger.as_ref(), &mut children);
        *cx.state::<Children>() = children;
        result
    }

    fn clean(&self, cx: &mut BindingContext<'_>) {
        if let Some(mut children) = cx.take_state::<Children>() {
            children.clear();
        }
    }
}
