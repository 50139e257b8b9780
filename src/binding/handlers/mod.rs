// ============================================================================
// spark-bind - Built-in Binding Handlers
// ============================================================================

mod basic;
mod collection;
mod custom;
mod form;
mod options;

use std::rc::Rc;

pub use basic::{Attr, Classes, Css, Disabled, Enabled, Html, Passive, Text, Toggle};
pub use collection::CollectionView;
pub use custom::{CustomHandler, ReadFn, RenderFn};
pub use form::{Checked, FormValue};
pub use options::Options;

use crate::binding::handler::HandlerRegistry;

pub(crate) fn register_builtins(registry: &mut HandlerRegistry) {
    registry.register("text", Rc::new(Text));
    registry.register("html", Rc::new(Html));
    registry.register("attr", Rc::new(Attr));
    registry.register("css", Rc::new(Css));
    registry.register("classes", Rc::new(Classes));
    registry.register("toggle", Rc::new(Toggle));
    registry.register("disabled", Rc::new(Disabled));
    registry.register("enabled", Rc::new(Enabled));
    registry.register("value", Rc::new(FormValue));
    registry.register("checked", Rc::new(Checked));
    registry.register("options", Rc::new(Options));
    registry.register("collection", Rc::new(CollectionView));
    registry.register("events", Rc::new(Passive));
    registry.register("optionsDefault", Rc::new(Passive));
    registry.register("optionsEmpty", Rc::new(Passive));
}
