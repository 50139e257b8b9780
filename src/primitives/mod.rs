// ============================================================================
// spark-bind - Primitives Module
// Stores, computed properties and the graph that ties them together
// ============================================================================

pub mod array;
pub mod computed;
pub mod graph;
pub mod store;

// Re-export for convenience
pub use array::ArrayOp;
pub use computed::{ComputedCell, ComputedDefinition, Getter, Setter};
pub use graph::ComputedGraph;
pub use store::{ChangeEvent, Store, StoreBuilder, StoreInner, WeakStore};
