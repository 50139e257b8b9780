// ============================================================================
// spark-bind - DOM Abstraction
// The element operations binding handlers need, plus CSS-like selectors
// ============================================================================
//
// Bindings never touch a concrete document. They go through `Dom`, an
// object-safe trait over element handles, so the same views run against a
// browser bridge, a terminal renderer or the in-memory tree in `memory`.
// ============================================================================

use std::fmt;
use std::rc::Rc;

use crate::core::error::{Error, Result};

// =============================================================================
// HANDLES AND EVENTS
// =============================================================================

/// Handle to one element of a [`Dom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A DOM event as delivered to a listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub name: String,
    pub target: ElementId,
}

/// Handle returned by [`Dom::listen`], used to unlisten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomListenerId(pub u64);

/// Callback registered for a DOM event.
pub type EventCallback = Rc<dyn Fn(&DomEvent)>;

// =============================================================================
// DOM TRAIT
// =============================================================================

/// Element tree operations used by views and binding handlers.
///
/// Every method takes `&self`; implementations use interior mutability so
/// event callbacks can mutate the tree they were fired from.
pub trait Dom {
    // ---------------------------------------------------------------- tree

    fn tag(&self, el: ElementId) -> String;
    fn parent(&self, el: ElementId) -> Option<ElementId>;
    fn children(&self, el: ElementId) -> Vec<ElementId>;
    fn create_element(&self, tag: &str) -> ElementId;
    fn append_child(&self, parent: ElementId, child: ElementId);
    /// Insert `child` at `index` among `parent`'s children, clamped to the end.
    fn insert_child(&self, parent: ElementId, child: ElementId, index: usize);
    /// Detach `el` from its parent. The element stays valid.
    fn detach(&self, el: ElementId);

    // ------------------------------------------------------------- content

    /// Text content of the element and its descendants.
    fn text(&self, el: ElementId) -> String;
    /// Replace all content with plain text.
    fn set_text(&self, el: ElementId, text: &str);
    fn html(&self, el: ElementId) -> String;
    /// Replace all content with markup.
    fn set_html(&self, el: ElementId, html: &str);

    // ---------------------------------------------------------- attributes

    fn attribute(&self, el: ElementId, name: &str) -> Option<String>;
    fn set_attribute(&self, el: ElementId, name: &str, value: &str);
    fn remove_attribute(&self, el: ElementId, name: &str);
    fn has_class(&self, el: ElementId, class: &str) -> bool;
    fn set_class(&self, el: ElementId, class: &str, on: bool);
    fn style(&self, el: ElementId, property: &str) -> Option<String>;
    fn set_style(&self, el: ElementId, property: &str, value: &str);

    // ---------------------------------------------------------------- form

    /// Current value of an input, textarea or select.
    fn value(&self, el: ElementId) -> String;
    fn set_value(&self, el: ElementId, value: &str);
    fn checked(&self, el: ElementId) -> bool;
    fn set_checked(&self, el: ElementId, checked: bool);
    fn disabled(&self, el: ElementId) -> bool;
    fn set_disabled(&self, el: ElementId, disabled: bool);
    /// Values of every selected option of a select.
    fn selected_values(&self, el: ElementId) -> Vec<String>;
    fn set_selected_values(&self, el: ElementId, values: &[String]);

    // -------------------------------------------------------------- events

    fn listen(&self, el: ElementId, event: &str, callback: EventCallback) -> DomListenerId;
    fn unlisten(&self, el: ElementId, id: DomListenerId);

    // ------------------------------------------------------------ provided

    fn is_multiple(&self, el: ElementId) -> bool {
        self.attribute(el, "multiple").is_some()
    }

    /// Every descendant of `root` in document order, `root` excluded.
    fn descendants(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack: Vec<ElementId> = self.children(root).into_iter().rev().collect();
        while let Some(el) = stack.pop() {
            out.push(el);
            stack.extend(self.children(el).into_iter().rev());
        }
        out
    }

    /// Elements under `root` (and `root` itself) that match `selector`.
    fn query_all(&self, root: ElementId, selector: &Selector) -> Vec<ElementId> {
        std::iter::once(root)
            .chain(self.descendants(root))
            .filter(|el| selector.matches(self, *el, root))
            .collect()
    }

    /// First match of [`Dom::query_all`].
    fn query(&self, root: ElementId, selector: &Selector) -> Option<ElementId> {
        self.query_all(root, selector).into_iter().next()
    }

    /// Position of `el` among its parent's children.
    fn index_in_parent(&self, el: ElementId) -> Option<usize> {
        let parent = self.parent(el)?;
        self.children(parent).iter().position(|child| *child == el)
    }
}

// =============================================================================
// SELECTORS
// =============================================================================

/// One condition of a compound selector.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Tag(String),
    Id(String),
    Class(String),
    HasAttribute(String),
    AttributeEquals(String, String),
}

/// A parsed CSS-like selector.
///
/// Supports tag names, `#id`, `.class`, `[attr]`, `[attr=value]` (value
/// optionally quoted), compounds of those, and the descendant combinator.
///
/// # Example
///
/// ```
/// use spark_bind::binding::Selector;
///
/// assert!(Selector::parse("ul.names li[data-id='7']").is_ok());
/// assert!(Selector::parse("[unclosed").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    /// Compounds from outermost ancestor to the subject
    compounds: Vec<Vec<Condition>>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidSelector {
            selector: source.to_string(),
            reason: reason.to_string(),
        };

        let mut compounds = Vec::new();
        for part in split_compounds(source).map_err(|reason| invalid(&reason))? {
            compounds.push(parse_compound(&part).map_err(|reason| invalid(&reason))?);
        }
        if compounds.is_empty() {
            return Err(invalid("empty selector"));
        }
        Ok(Self {
            source: source.to_string(),
            compounds,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `el` matches, with ancestors searched no higher than `scope`.
    pub fn matches<D: Dom + ?Sized>(&self, dom: &D, el: ElementId, scope: ElementId) -> bool {
        let Some((subject, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        if !compound_matches(dom, el, subject) {
            return false;
        }

        let mut current = el;
        for compound in ancestors.iter().rev() {
            loop {
                if current == scope {
                    return false;
                }
                let Some(parent) = dom.parent(current) else {
                    return false;
                };
                current = parent;
                if compound_matches(dom, current, compound) {
                    break;
                }
            }
        }
        true
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn compound_matches<D: Dom + ?Sized>(dom: &D, el: ElementId, conditions: &[Condition]) -> bool {
    conditions.iter().all(|condition| match condition {
        Condition::Tag(tag) => dom.tag(el).eq_ignore_ascii_case(tag),
        Condition::Id(id) => dom.attribute(el, "id").as_deref() == Some(id.as_str()),
        Condition::Class(class) => dom.has_class(el, class),
        Condition::HasAttribute(name) => dom.attribute(el, name).is_some(),
        Condition::AttributeEquals(name, value) => {
            // Form values live outside the attribute map once edited
            let actual = match name.as_str() {
                "value" => dom.attribute(el, name).or_else(|| Some(dom.value(el))),
                _ => dom.attribute(el, name),
            };
            actual.as_deref() == Some(value.as_str())
        }
    })
}

/// Split on whitespace outside brackets and quotes.
fn split_compounds(source: &str) -> std::result::Result<Vec<String>, String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_brackets = false;
    let mut quote: Option<char> = None;

    for ch in source.chars() {
        match ch {
            '\'' | '"' if in_brackets => {
                match quote {
                    Some(open) if open == ch => quote = None,
                    None => quote = Some(ch),
                    Some(_) => {}
                }
                current.push(ch);
            }
            '[' if quote.is_none() => {
                in_brackets = true;
                current.push(ch);
            }
            ']' if quote.is_none() => {
                in_brackets = false;
                current.push(ch);
            }
            c if c.is_whitespace() && !in_brackets => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }
    if in_brackets || quote.is_some() {
        return Err("unclosed attribute condition".into());
    }
    if !current.is_empty() {
        parts.push(current);
    }
    Ok(parts)
}

fn is_name_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '-' || ch == '_'
}

fn parse_compound(part: &str) -> std::result::Result<Vec<Condition>, String> {
    let chars: Vec<char> = part.chars().collect();
    let mut conditions = Vec::new();
    let mut i = 0;

    let read_name = |i: &mut usize| -> String {
        let start = *i;
        while *i < chars.len() && is_name_char(chars[*i]) {
            *i += 1;
        }
        chars[start..*i].iter().collect()
    };

    if chars.first().is_some_and(|c| is_name_char(*c) || *c == '*') {
        if chars[0] == '*' {
            i = 1;
        } else {
            conditions.push(Condition::Tag(read_name(&mut i)));
        }
    }

    while i < chars.len() {
        match chars[i] {
            '#' => {
                i += 1;
                let name = read_name(&mut i);
                if name.is_empty() {
                    return Err("expected an id after `#`".into());
                }
                conditions.push(Condition::Id(name));
            }
            '.' => {
                i += 1;
                let name = read_name(&mut i);
                if name.is_empty() {
                    return Err("expected a class after `.`".into());
                }
                conditions.push(Condition::Class(name));
            }
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|c| *c == ']')
                    .map(|offset| i + offset)
                    .ok_or_else(|| "unclosed attribute condition".to_string())?;
                let body: String = chars[i + 1..close].iter().collect();
                conditions.push(parse_attribute_condition(&body)?);
                i = close + 1;
            }
            other => return Err(format!("unexpected `{other}`")),
        }
    }
    Ok(conditions)
}

fn parse_attribute_condition(body: &str) -> std::result::Result<Condition, String> {
    match body.split_once('=') {
        None => {
            let name = body.trim();
            if name.is_empty() {
                return Err("empty attribute condition".into());
            }
            Ok(Condition::HasAttribute(name.to_string()))
        }
        Some((name, value)) => {
            let name = name.trim();
            if name.is_empty() {
                return Err("empty attribute name".into());
            }
            let value = value.trim();
            let value = value
                .strip_prefix('\'')
                .and_then(|v| v.strip_suffix('\''))
                .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
                .unwrap_or(value);
            Ok(Condition::AttributeEquals(name.to_string(), value.to_string()))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::memory::{El, MemoryDom};

    #[test]
    fn parses_compounds_and_descendants() {
        let selector = Selector::parse("ul.names li[data-id='7']").unwrap();
        assert_eq!(selector.compounds.len(), 2);
        assert_eq!(
            selector.compounds[1],
            vec![
                Condition::Tag("li".into()),
                Condition::AttributeEquals("data-id".into(), "7".into()),
            ]
        );
    }

    #[test]
    fn rejects_malformed_selectors() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("div[").is_err());
        assert!(Selector::parse(".").is_err());
        assert!(Selector::parse("a > b").is_err());
    }

    #[test]
    fn query_includes_root_and_respects_scope() {
        let dom = MemoryDom::new();
        let outer = dom.build(El::new("div").class("item").child(
            El::new("section").child(El::new("span").class("item").class("name")),
        ));
        let section = dom.children(outer)[0];

        let items = Selector::parse(".item").unwrap();
        assert_eq!(dom.query_all(outer, &items).len(), 2);

        let nested = Selector::parse("div .name").unwrap();
        assert_eq!(dom.query_all(outer, &nested).len(), 1);
        // The `div` ancestor lies outside the section scope
        assert!(dom.query_all(section, &nested).is_empty());
    }

    #[test]
    fn value_conditions_see_live_form_values() {
        let dom = MemoryDom::new();
        let root = dom.build(
            El::new("div")
                .child(El::new("input").attr("type", "radio").attr("value", "a"))
                .child(El::new("input").attr("type", "radio").attr("value", "b")),
        );
        let b = Selector::parse("input[value=b]").unwrap();
        let found = dom.query(root, &b).unwrap();
        assert_eq!(dom.attribute(found, "value").as_deref(), Some("b"));
    }

    #[test]
    fn index_in_parent() {
        let dom = MemoryDom::new();
        let root = dom.build(El::new("ul").child(El::new("li")).child(El::new("li")));
        let second = dom.children(root)[1];
        assert_eq!(dom.index_in_parent(second), Some(1));
        assert_eq!(dom.index_in_parent(root), None);
    }
}
