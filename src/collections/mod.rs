// ============================================================================
// spark-bind - Collections
// Ordered record lists rendered by `collection:` and `options:` bindings
// ============================================================================

mod collection;

pub use collection::{Collection, CollectionEvent, ItemViewFactory};
