// ============================================================================
// spark-bind - Core Module
// Fundamental types, errors, constants and the thread-local context
// ============================================================================

pub mod constants;
pub mod context;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use context::{is_batching, is_tracking, with_context, ReactiveContext};
pub use error::{Error, Result};
pub use types::{as_number, display_string, is_truthy, number, Attributes, StoreId, Value};
