// ============================================================================
// spark-bind - Options Handler
// Rebuilds a select's option list and keeps its selection consistent
// ============================================================================
//
// Items come from an array (strings, or objects with `label`/`value`) or a
// collection of such records. A truthy `optionsDefault:` sibling is listed
// first; with no items and no default, a truthy `optionsEmpty:` sibling is
// shown as a placeholder and the select is disabled. After rebuilding, the
// previous selection is restored where it still exists. When that changes
// the selection, the new value is written back through the `value:` sibling.
// ============================================================================

use serde_json::Value;
use tracing::trace;

use crate::binding::dom::{Dom, ElementId};
use crate::binding::handler::{BindingContext, BindingHandler};
use crate::binding::handlers::form::selection_list;
use crate::binding::source::Bound;
use crate::core::constants::{OPTION_LABEL, OPTION_VALUE};
use crate::core::error::{Error, Result};
use crate::core::types::display_string;

/// One `<option>` to render.
#[derive(Debug, Clone, PartialEq, Eq)]
struct OptionItem {
    label: String,
    value: String,
}

impl OptionItem {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(fields) => {
                let label = fields.get(OPTION_LABEL).map(display_string).unwrap_or_default();
                let value = fields
                    .get(OPTION_VALUE)
                    .map(display_string)
                    .unwrap_or_else(|| label.clone());
                Self { label, value }
            }
            other => {
                let text = display_string(other);
                Self {
                    label: text.clone(),
                    value: text,
                }
            }
        }
    }
}

fn items(binding: &str, value: &Bound) -> Result<Vec<OptionItem>> {
    match value {
        Bound::Collection(collection) => Ok(collection
            .records()
            .iter()
            .map(|record| OptionItem::from_value(&Value::Object(record.to_json(true))))
            .collect()),
        Bound::Value(Value::Array(values)) => Ok(values.iter().map(OptionItem::from_value).collect()),
        Bound::Value(Value::Null) => Ok(Vec::new()),
        _ => Err(Error::binding_value(binding, "an array or a collection")),
    }
}

fn append_option(dom: &dyn Dom, select: ElementId, item: &OptionItem) {
    let option = dom.create_element("option");
    dom.set_attribute(option, "value", &item.value);
    dom.set_text(option, &item.label);
    dom.append_child(select, option);
}

/// `options:` for `<select>` elements.
pub struct Options;

const INPUTS: &[&str] = &["optionsDefault", "optionsEmpty"];

impl BindingHandler for Options {
    fn inputs(&self) -> &[&'static str] {
        INPUTS
    }

    fn pull(&self, cx: &mut BindingContext<'_>, value: &Bound) -> Result<()> {
        let items = items(cx.binding(), value)?;
        let default = cx
            .sibling_value("optionsDefault")?
            .filter(Bound::is_truthy)
            .map(|bound| OptionItem::from_value(&bound.to_value()));
        let empty = cx
            .sibling_value("optionsEmpty")?
            .filter(Bound::is_truthy)
            .map(|bound| OptionItem::from_value(&bound.to_value()));

        let dom = cx.dom();
        let el = cx.element();
        let multiple = dom.is_multiple(el);

        let previous = match cx.sibling_value("value")? {
            Some(bound) => bound.to_value(),
            None if multiple => {
                Value::Array(dom.selected_values(el).into_iter().map(Value::String).collect())
            }
            None => Value::String(dom.value(el)),
        };

        for child in dom.children(el) {
            dom.detach(child);
        }
        if let Some(default) = &default {
            append_option(dom, el, default);
        }
        for item in &items {
            append_option(dom, el, item);
        }
        let placeholder = items.is_empty() && default.is_none();
        match (&empty, placeholder) {
            (Some(empty), true) => {
                append_option(dom, el, empty);
                dom.set_disabled(el, true);
            }
            _ => dom.set_disabled(el, false),
        }

        let (changed, revised) = if multiple {
            let wanted = selection_list(&previous);
            dom.set_selected_values(el, &wanted);
            let selected = dom.selected_values(el);
            let changed = selected != wanted;
            (changed, Value::Array(selected.into_iter().map(Value::String).collect()))
        } else {
            let wanted = display_string(&previous);
            dom.set_value(el, &wanted);
            let selected = dom.value(el);
            (selected != wanted, Value::String(selected))
        };

        trace!(options = items.len(), changed, "options rebuilt");
        if changed {
            cx.write_sibling("value", revised)?;
        }
        Ok(())
    }
}
