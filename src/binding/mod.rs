// ============================================================================
// spark-bind - Binding Module
// Declarative DOM bindings: parsing, resolution, handlers and views
// ============================================================================

pub mod config;
pub mod dom;
pub mod expr;
pub mod handler;
pub mod handlers;
pub mod memory;
pub mod modifier;
pub mod resolver;
pub mod source;
pub mod view;

// Re-export the DOM abstraction and its headless implementation
pub use dom::{Dom, DomEvent, DomListenerId, ElementId, EventCallback, Selector};
pub use memory::{El, MemoryDom};

// Re-export declaration parsing
pub use config::{Bindings, SourcePriority};
pub use expr::{parse_declarations, parse_expr, Declaration, Expr};
pub use modifier::Modifier;

// Re-export resolution
pub use resolver::{collect_descriptors, BindingDescriptor, Dependency, Node};
pub use source::{Bound, ResolvedProperty, Source, SourceRegistry};

// Re-export handlers and views
pub use handler::{BindingContext, BindingHandler, HandlerRegistry, Trigger};
pub use handlers::CustomHandler;
pub use view::{View, ViewOptions};
