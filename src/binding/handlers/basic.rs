// ============================================================================
// spark-bind - One-Way Handlers
// text, html, attr, css, classes, toggle, disabled, enabled
// ============================================================================

use serde_json::Value;

use crate::binding::handler::{BindingContext, BindingHandler};
use crate::binding::source::Bound;
use crate::core::error::{Error, Result};
use crate::core::types::{display_string, is_truthy};

/// `text:` sets the element's text content.
pub struct Text;

impl BindingHandler for Text {
    fn pull(&self, cx: &mut BindingContext<'_>, value: &Bound) -> Result<()> {
        let text = display_string(&value.to_value());
        if cx.dom().text(cx.element()) != text {
            cx.dom().set_text(cx.element(), &text);
        }
        Ok(())
    }
}

/// `html:` sets the element's markup.
pub struct Html;

impl BindingHandler for Html {
    fn pull(&self, cx: &mut BindingContext<'_>, value: &Bound) -> Result<()> {
        cx.dom().set_html(cx.element(), &display_string(&value.to_value()));
        Ok(())
    }
}

/// `attr:{name: expr}` sets attributes; `null` removes one.
pub struct Attr;

impl BindingHandler for Attr {
    fn pull(&self, cx: &mut BindingContext<'_>, value: &Bound) -> Result<()> {
        let Value::Object(attributes) = value.to_value() else {
            return Err(Error::binding_value(cx.binding(), "an object of attribute values"));
        };
        for (name, value) in attributes {
            match value {
                Value::Null => cx.dom().remove_attribute(cx.element(), &name),
                value => cx.dom().set_attribute(cx.element(), &name, &display_string(&value)),
            }
        }
        Ok(())
    }
}

/// `css:{property: expr}` sets inline styles; `null` clears one.
pub struct Css;

impl BindingHandler for Css {
    fn pull(&self, cx: &mut BindingContext<'_>, value: &Bound) -> Result<()> {
        let Value::Object(styles) = value.to_value() else {
            return Err(Error::binding_value(cx.binding(), "an object of style values"));
        };
        for (property, value) in styles {
            cx.dom().set_style(cx.element(), &property, &display_string(&value));
        }
        Ok(())
    }
}

/// `classes:{name: expr}` toggles each class on the truthiness of its value.
pub struct Classes;

impl BindingHandler for Classes {
    fn pull(&self, cx: &mut BindingContext<'_>, value: &Bound) -> Result<()> {
        let Value::Object(classes) = value.to_value() else {
            return Err(Error::binding_value(cx.binding(), "an object of class flags"));
        };
        for (class, on) in classes {
            cx.dom().set_class(cx.element(), &class, is_truthy(&on));
        }
        Ok(())
    }
}

/// `toggle:` shows the element when truthy, hides it otherwise.
pub struct Toggle;

impl BindingHandler for Toggle {
    fn pull(&self, cx: &mut BindingContext<'_>, value: &Bound) -> Result<()> {
        let display = if value.is_truthy() { "" } else { "none" };
        cx.dom().set_style(cx.element(), "display", display);
        Ok(())
    }
}

/// `disabled:` disables the element when truthy.
pub struct Disabled;

impl BindingHandler for Disabled {
    fn pull(&self, cx: &mut BindingContext<'_>, value: &Bound) -> Result<()> {
        cx.dom().set_disabled(cx.element(), value.is_truthy());
        Ok(())
    }
}

/// `enabled:` disables the element when falsy.
pub struct Enabled;

impl BindingHandler for Enabled {
    fn pull(&self, cx: &mut BindingContext<'_>, value: &Bound) -> Result<()> {
        cx.dom().set_disabled(cx.element(), !value.is_truthy());
        Ok(())
    }
}

/// Declarations other handlers on the same element read, such as
/// `events:`, `optionsDefault:` and `optionsEmpty:`.
pub struct Passive;

impl BindingHandler for Passive {
    fn pull(&self, _cx: &mut BindingContext<'_>, _value: &Bound) -> Result<()> {
        Ok(())
    }
}
