// ============================================================================
// spark-bind - Reactivity Module
// Dependency recording, subscriptions and batched change delivery
// ============================================================================

pub mod batching;
pub mod subscription;
pub mod tracking;

// Re-export main tracking functions
pub use tracking::{record_all, record_read, track, untrack, DependencyRef};

// Re-export batching functions
pub use batching::{batch, flush};

// Re-export subscription types
pub use subscription::{DisposeFn, Emitter, ListenerId, Subscription};
