// ============================================================================
// spark-bind - Closure Handlers
// Building a binding type from a render function and an optional reader
// ============================================================================

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::binding::dom::{Dom, ElementId};
use crate::binding::handler::{BindingContext, BindingHandler};
use crate::binding::source::Bound;
use crate::core::constants::DEFAULT_PUSH_EVENT;
use crate::core::error::Result;

pub type RenderFn = Rc<dyn Fn(&dyn Dom, ElementId, &Bound)>;
pub type ReadFn = Rc<dyn Fn(&dyn Dom, ElementId) -> Value>;

/// A binding type made of closures.
///
/// Without a reader it is one-way; [`CustomHandler::with_read`] makes it
/// two-way on `change` (or the events given to
/// [`CustomHandler::with_events`]).
///
/// # Example
///
/// ```
/// use spark_bind::binding::{BindingHandler, CustomHandler, Dom};
/// use spark_bind::display_string;
///
/// let shout = CustomHandler::render(|dom: &dyn Dom, el, value| {
///     dom.set_text(el, &display_string(&value.to_value()).to_uppercase());
/// });
/// assert!(shout.events().is_empty());
///
/// let editable = shout.with_read(|dom: &dyn Dom, el| dom.text(el).to_lowercase().into());
/// assert_eq!(editable.events(), ["change"]);
/// ```
#[derive(Clone)]
pub struct CustomHandler {
    render: RenderFn,
    read: Option<ReadFn>,
    events: Vec<&'static str>,
}

impl CustomHandler {
    pub fn render(render: impl Fn(&dyn Dom, ElementId, &Bound) + 'static) -> Self {
        Self {
            render: Rc::new(render),
            read: None,
            events: Vec::new(),
        }
    }

    /// Read the element back on DOM events.
    pub fn with_read(mut self, read: impl Fn(&dyn Dom, ElementId) -> Value + 'static) -> Self {
        self.read = Some(Rc::new(read));
        if self.events.is_empty() {
            self.events.push(DEFAULT_PUSH_EVENT);
        }
        self
    }

    pub fn with_events(mut self, events: &[&'static str]) -> Self {
        self.events = events.to_vec();
        self
    }
}

impl BindingHandler for CustomHandler {
    fn events(&self) -> &[&'static str] {
        if self.read.is_some() { &self.events } else { &[] }
    }

    fn pull(&self, cx: &mut BindingContext<'_>, value: &Bound) -> Result<()> {
        (self.render)(cx.dom(), cx.element(), value);
        Ok(())
    }

    fn push(&self, cx: &mut BindingContext<'_>, _current: &Bound) -> Result<Option<Value>> {
        Ok(self.read.as_ref().map(|read| read(cx.dom(), cx.element())))
    }
}

impl fmt::Debug for CustomHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomHandler")
            .field("two_way", &self.read.is_some())
            .field("events", &self.events)
            .finish()
    }
}
