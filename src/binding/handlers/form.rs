// ============================================================================
// spark-bind - Two-Way Form Handlers
// value and checked
// ============================================================================

use serde_json::Value;

use crate::binding::dom::{Dom, ElementId};
use crate::binding::handler::{BindingContext, BindingHandler};
use crate::binding::source::Bound;
use crate::core::constants::DEFAULT_PUSH_EVENT;
use crate::core::error::Result;
use crate::core::types::{display_string, is_truthy};

const PUSH_EVENTS: &[&str] = &[DEFAULT_PUSH_EVENT];

fn input_type(dom: &dyn Dom, el: ElementId) -> Option<String> {
    dom.attribute(el, "type").map(|t| t.to_ascii_lowercase())
}

/// Value as the list of strings a multi-select understands.
pub(crate) fn selection_list(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().map(display_string).collect(),
        other => vec![display_string(other)],
    }
}

// =============================================================================
// VALUE
// =============================================================================

/// `value:` keeps an input, textarea or select in sync with a property.
///
/// Multi-selects bind to an array of the selected option values.
pub struct FormValue;

impl BindingHandler for FormValue {
    fn events(&self) -> &[&'static str] {
        PUSH_EVENTS
    }

    fn pull(&self, cx: &mut BindingContext<'_>, value: &Bound) -> Result<()> {
        let dom = cx.dom();
        let el = cx.element();
        let value = value.to_value();
        if dom.is_multiple(el) {
            dom.set_selected_values(el, &selection_list(&value));
            return Ok(());
        }
        let text = display_string(&value);
        // Rewriting an unchanged value would reset the caret in a browser
        if dom.value(el) != text {
            dom.set_value(el, &text);
        }
        Ok(())
    }

    fn push(&self, cx: &mut BindingContext<'_>, _current: &Bound) -> Result<Option<Value>> {
        let dom = cx.dom();
        let el = cx.element();
        if dom.is_multiple(el) {
            let selected = dom.selected_values(el).into_iter().map(Value::String);
            return Ok(Some(Value::Array(selected.collect())));
        }
        Ok(Some(Value::String(dom.value(el))))
    }
}

// =============================================================================
// CHECKED
// =============================================================================

/// `checked:` binds checkboxes and radios.
///
/// A radio is checked while the bound value equals its own value and pushes
/// that value when chosen. A checkbox bound to an array is checked while the
/// array holds its value and adds or removes it when toggled; bound to
/// anything else it reads as a boolean.
pub struct Checked;

impl BindingHandler for Checked {
    fn events(&self) -> &[&'static str] {
        PUSH_EVENTS
    }

    fn pull(&self, cx: &mut BindingContext<'_>, value: &Bound) -> Result<()> {
        let dom = cx.dom();
        let el = cx.element();
        let value = value.to_value();
        let checked = match (input_type(dom, el).as_deref(), &value) {
            (Some("radio"), value) => display_string(value) == dom.value(el),
            (_, Value::Array(items)) => {
                let own = dom.value(el);
                items.iter().any(|item| display_string(item) == own)
            }
            (_, value) => is_truthy(value),
        };
        dom.set_checked(el, checked);
        Ok(())
    }

    fn push(&self, cx: &mut BindingContext<'_>, current: &Bound) -> Result<Option<Value>> {
        let dom = cx.dom();
        let el = cx.element();
        let checked = dom.checked(el);
        match (input_type(dom, el).as_deref(), current.to_value()) {
            (Some("radio"), _) => Ok(checked.then(|| Value::String(dom.value(el)))),
            (_, Value::Array(mut items)) => {
                let own = dom.value(el);
                let position = items.iter().position(|item| display_string(item) == own);
                match (checked, position) {
                    (true, None) => items.push(Value::String(own)),
                    (false, Some(index)) => {
                        items.remove(index);
                    }
                    _ => return Ok(None),
                }
                Ok(Some(Value::Array(items)))
            }
            _ => Ok(Some(Value::Bool(checked))),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
