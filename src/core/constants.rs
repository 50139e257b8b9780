// ============================================================================
// spark-bind - Constants
// Well-known names and limits shared by the store and the binding engine
// ============================================================================

// =============================================================================
// STORE TOPICS
// =============================================================================

/// Topic that matches every attribute change on a store.
///
/// Listeners registered under this topic fire once per settled mutation,
/// after all per-key listeners.
pub const ANY_TOPIC: &str = "*";

// =============================================================================
// BINDING SYNTAX
// =============================================================================

/// Default marker attribute scanned for inline binding declarations.
pub const DEFAULT_BINDING_ATTRIBUTE: &str = "data-bind";

/// Selector token that addresses the view's root element in a binding map.
pub const ROOT_SELECTOR: &str = ":el";

/// Prefix marking an explicit named source in a binding expression.
pub const SOURCE_PREFIX: char = '$';

/// Source name of the view's primary store.
pub const MODEL_SOURCE: &str = "model";

/// Source name of the view's secondary store.
pub const VIEW_MODEL_SOURCE: &str = "viewModel";

/// Source name of the view's record collection.
pub const COLLECTION_SOURCE: &str = "collection";

/// Source name of the store holding view-level computed properties.
pub const VIEW_SOURCE: &str = "view";

/// DOM event a writable binding listens to when nothing else is configured.
pub const DEFAULT_PUSH_EVENT: &str = "change";

// =============================================================================
// OPTION RECORDS
// =============================================================================

/// Attribute read as the visible text of an option record.
pub const OPTION_LABEL: &str = "label";

/// Attribute read as the submitted value of an option record.
pub const OPTION_VALUE: &str = "value";

// =============================================================================
// LIMITS
// =============================================================================

/// Upper bound on notification rounds in a single flush.
///
/// Listeners that keep writing to the stores they observe would otherwise
/// spin forever.
pub const MAX_FLUSH_ITERATIONS: u32 = 1000;
