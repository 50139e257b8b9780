// ============================================================================
// spark-bind - In-Memory DOM
// A headless element tree implementing `Dom`, plus a builder for it
// ============================================================================
//
// Enough browser behavior to run real views without a browser: form values
// that diverge from their `value` attribute once edited, radio groups that
// uncheck their siblings, selects that fall back to their first option, and
// event listeners fired with `trigger`.
// ============================================================================

use std::cell::{Cell, RefCell};
use std::fmt;

use crate::binding::dom::{Dom, DomEvent, DomListenerId, ElementId, EventCallback};

// =============================================================================
// NODE
// =============================================================================

#[derive(Default)]
struct Node {
    tag: String,
    attributes: Vec<(String, String)>,
    classes: Vec<String>,
    styles: Vec<(String, String)>,
    text: String,
    /// Raw markup when content was set with `set_html`
    html: Option<String>,
    children: Vec<ElementId>,
    parent: Option<ElementId>,
    /// Live form value, diverging from the `value` attribute once written
    value: Option<String>,
    checked: bool,
    disabled: bool,
    selected: bool,
    listeners: Vec<(DomListenerId, String, EventCallback)>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

// =============================================================================
// MEMORY DOM
// =============================================================================

/// A headless [`Dom`].
///
/// # Example
///
/// ```
/// use spark_bind::binding::{Dom, El, MemoryDom};
///
/// let dom = MemoryDom::new();
/// let root = dom.build(
///     El::new("div")
///         .child(El::new("span").class("name").text("Luke"))
///         .child(El::new("input").attr("value", "Leia")),
/// );
///
/// let input = dom.children(root)[1];
/// assert_eq!(dom.text(root), "Luke");
/// assert_eq!(dom.value(input), "Leia");
/// ```
#[derive(Default)]
pub struct MemoryDom {
    nodes: RefCell<Vec<Node>>,
    next_listener: Cell<u64>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the elements described by `el`, returning the top one.
    pub fn build(&self, el: El) -> ElementId {
        el.mount(self)
    }

    /// Fire `event` on `el`, calling every listener registered for it.
    ///
    /// Listeners are collected before any of them runs, so they may freely
    /// mutate the tree or register and remove listeners.
    pub fn trigger(&self, el: ElementId, event: &str) {
        let callbacks: Vec<EventCallback> = self.with_node(el, |node| {
            node.listeners
                .iter()
                .filter(|(_, name, _)| name == event)
                .map(|(_, _, callback)| callback.clone())
                .collect()
        });
        let event = DomEvent {
            name: event.to_string(),
            target: el,
        };
        for callback in callbacks {
            callback(&event);
        }
    }

    /// Number of listeners registered on `el`.
    pub fn listener_count(&self, el: ElementId) -> usize {
        self.with_node(el, |node| node.listeners.len())
    }

    /// Total number of elements ever created.
    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Markup for `el` itself, including its tag.
    pub fn outer_html(&self, el: ElementId) -> String {
        let (open, close) = self.with_node(el, |node| {
            let mut open = format!("<{}", node.tag);
            if !node.classes.is_empty() {
                open.push_str(&format!(" class=\"{}\"", node.classes.join(" ")));
            }
            for (key, value) in &node.attributes {
                open.push_str(&format!(" {key}=\"{value}\""));
            }
            open.push('>');
            (open, format!("</{}>", node.tag))
        });
        format!("{open}{}{close}", self.html(el))
    }

    fn with_node<R>(&self, el: ElementId, f: impl FnOnce(&Node) -> R) -> R {
        f(&self.nodes.borrow()[el.0])
    }

    fn with_node_mut<R>(&self, el: ElementId, f: impl FnOnce(&mut Node) -> R) -> R {
        f(&mut self.nodes.borrow_mut()[el.0])
    }

    fn is_select(&self, el: ElementId) -> bool {
        self.with_node(el, |node| node.tag == "select")
    }

    fn options(&self, select: ElementId) -> Vec<ElementId> {
        self.descendants(select)
            .into_iter()
            .filter(|el| self.tag(*el) == "option")
            .collect()
    }

    fn option_value(&self, option: ElementId) -> String {
        self.attribute(option, "value")
            .unwrap_or_else(|| self.text(option))
    }

    fn root_of(&self, el: ElementId) -> ElementId {
        let mut current = el;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    fn is_radio(&self, el: ElementId) -> bool {
        self.with_node(el, |node| {
            node.tag == "input" && node.attribute("type") == Some("radio")
        })
    }

    fn clear_content(&self, el: ElementId) {
        let children = self.with_node_mut(el, |node| {
            node.text.clear();
            node.html = None;
            std::mem::take(&mut node.children)
        });
        for child in children {
            self.with_node_mut(child, |node| node.parent = None);
        }
    }
}

impl Dom for MemoryDom {
    fn tag(&self, el: ElementId) -> String {
        self.with_node(el, |node| node.tag.clone())
    }

    fn parent(&self, el: ElementId) -> Option<ElementId> {
        self.with_node(el, |node| node.parent)
    }

    fn children(&self, el: ElementId) -> Vec<ElementId> {
        self.with_node(el, |node| node.children.clone())
    }

    fn create_element(&self, tag: &str) -> ElementId {
        let mut nodes = self.nodes.borrow_mut();
        nodes.push(Node::new(tag));
        ElementId(nodes.len() - 1)
    }

    fn append_child(&self, parent: ElementId, child: ElementId) {
        let len = self.with_node(parent, |node| node.children.len());
        self.insert_child(parent, child, len);
    }

    fn insert_child(&self, parent: ElementId, child: ElementId, index: usize) {
        self.detach(child);
        self.with_node_mut(parent, |node| {
            let index = index.min(node.children.len());
            node.children.insert(index, child);
        });
        self.with_node_mut(child, |node| node.parent = Some(parent));
    }

    fn detach(&self, el: ElementId) {
        if let Some(parent) = self.with_node_mut(el, |node| node.parent.take()) {
            self.with_node_mut(parent, |node| node.children.retain(|child| *child != el));
        }
    }

    fn text(&self, el: ElementId) -> String {
        let (mut text, children) = self.with_node(el, |node| (node.text.clone(), node.children.clone()));
        for child in children {
            text.push_str(&self.text(child));
        }
        text
    }

    fn set_text(&self, el: ElementId, text: &str) {
        self.clear_content(el);
        self.with_node_mut(el, |node| node.text = text.to_string());
    }

    fn html(&self, el: ElementId) -> String {
        let (html, text, children) =
            self.with_node(el, |node| (node.html.clone(), node.text.clone(), node.children.clone()));
        if let Some(html) = html {
            return html;
        }
        let mut out = text;
        for child in children {
            out.push_str(&self.outer_html(child));
        }
        out
    }

    fn set_html(&self, el: ElementId, html: &str) {
        self.clear_content(el);
        self.with_node_mut(el, |node| {
            node.text = strip_tags(html);
            node.html = Some(html.to_string());
        });
    }

    fn attribute(&self, el: ElementId, name: &str) -> Option<String> {
        self.with_node(el, |node| {
            if name == "class" {
                return (!node.classes.is_empty()).then(|| node.classes.join(" "));
            }
            node.attribute(name).map(str::to_string)
        })
    }

    fn set_attribute(&self, el: ElementId, name: &str, value: &str) {
        self.with_node_mut(el, |node| {
            if name == "class" {
                node.classes = value.split_whitespace().map(str::to_string).collect();
                return;
            }
            match node.attributes.iter_mut().find(|(key, _)| key == name) {
                Some((_, existing)) => *existing = value.to_string(),
                None => node.attributes.push((name.to_string(), value.to_string())),
            }
        });
    }

    fn remove_attribute(&self, el: ElementId, name: &str) {
        self.with_node_mut(el, |node| {
            if name == "class" {
                node.classes.clear();
            } else {
                node.attributes.retain(|(key, _)| key != name);
            }
        });
    }

    fn has_class(&self, el: ElementId, class: &str) -> bool {
        self.with_node(el, |node| node.classes.iter().any(|c| c == class))
    }

    fn set_class(&self, el: ElementId, class: &str, on: bool) {
        self.with_node_mut(el, |node| {
            let present = node.classes.iter().any(|c| c == class);
            if on && !present {
                node.classes.push(class.to_string());
            } else if !on && present {
                node.classes.retain(|c| c != class);
            }
        });
    }

    fn style(&self, el: ElementId, property: &str) -> Option<String> {
        self.with_node(el, |node| {
            node.styles
                .iter()
                .find(|(key, _)| key == property)
                .map(|(_, value)| value.clone())
        })
    }

    fn set_style(&self, el: ElementId, property: &str, value: &str) {
        self.with_node_mut(el, |node| {
            if value.is_empty() {
                node.styles.retain(|(key, _)| key != property);
                return;
            }
            match node.styles.iter_mut().find(|(key, _)| key == property) {
                Some((_, existing)) => *existing = value.to_string(),
                None => node.styles.push((property.to_string(), value.to_string())),
            }
        });
    }

    fn value(&self, el: ElementId) -> String {
        if self.is_select(el) {
            return self.selected_values(el).into_iter().next().unwrap_or_default();
        }
        if self.tag(el) == "option" {
            return self.option_value(el);
        }
        self.with_node(el, |node| {
            node.value
                .clone()
                .or_else(|| node.attribute("value").map(str::to_string))
                .unwrap_or_default()
        })
    }

    fn set_value(&self, el: ElementId, value: &str) {
        if self.is_select(el) {
            let mut matched = false;
            for option in self.options(el) {
                let hit = !matched && self.option_value(option) == value;
                matched |= hit;
                self.with_node_mut(option, |node| node.selected = hit);
            }
            return;
        }
        self.with_node_mut(el, |node| node.value = Some(value.to_string()));
    }

    fn checked(&self, el: ElementId) -> bool {
        self.with_node(el, |node| node.checked)
    }

    fn set_checked(&self, el: ElementId, checked: bool) {
        if checked && self.is_radio(el) {
            if let Some(group) = self.attribute(el, "name") {
                let root = self.root_of(el);
                let others: Vec<ElementId> = std::iter::once(root)
                    .chain(self.descendants(root))
                    .filter(|other| {
                        *other != el
                            && self.is_radio(*other)
                            && self.attribute(*other, "name").as_deref() == Some(group.as_str())
                    })
                    .collect();
                for other in others {
                    self.with_node_mut(other, |node| node.checked = false);
                }
            }
        }
        self.with_node_mut(el, |node| node.checked = checked);
    }

    fn disabled(&self, el: ElementId) -> bool {
        self.with_node(el, |node| node.disabled)
    }

    fn set_disabled(&self, el: ElementId, disabled: bool) {
        self.with_node_mut(el, |node| node.disabled = disabled);
    }

    fn selected_values(&self, el: ElementId) -> Vec<String> {
        let options = self.options(el);
        let selected: Vec<String> = options
            .iter()
            .filter(|option| self.with_node(**option, |node| node.selected))
            .map(|option| self.option_value(*option))
            .collect();

        // A single select with nothing selected shows its first option
        if selected.is_empty() && !self.is_multiple(el) {
            return options
                .first()
                .map(|first| vec![self.option_value(*first)])
                .unwrap_or_default();
        }
        selected
    }

    fn set_selected_values(&self, el: ElementId, values: &[String]) {
        let multiple = self.is_multiple(el);
        let mut matched = false;
        for option in self.options(el) {
            let value = self.option_value(option);
            let hit = values.contains(&value) && (multiple || !matched);
            matched |= hit;
            self.with_node_mut(option, |node| node.selected = hit);
        }
    }

    fn listen(&self, el: ElementId, event: &str, callback: EventCallback) -> DomListenerId {
        let id = DomListenerId(self.next_listener.get());
        self.next_listener.set(id.0 + 1);
        self.with_node_mut(el, |node| node.listeners.push((id, event.to_string(), callback)));
        id
    }

    fn unlisten(&self, el: ElementId, id: DomListenerId) {
        self.with_node_mut(el, |node| node.listeners.retain(|(listener, _, _)| *listener != id));
    }
}

impl fmt::Debug for MemoryDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDom")
            .field("elements", &self.len())
            .finish()
    }
}

fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

// =============================================================================
// ELEMENT BUILDER
// =============================================================================

/// Declarative description of an element subtree.
///
/// Mounts into any [`Dom`], which is how item views for collections create
/// their own elements.
#[derive(Debug, Clone, Default)]
pub struct El {
    tag: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<El>,
    checked: bool,
    disabled: bool,
}

impl El {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    pub fn class(mut self, class: impl Into<String>) -> Self {
        let class = class.into();
        match self.attributes.iter_mut().find(|(key, _)| key == "class") {
            Some((_, existing)) => {
                existing.push(' ');
                existing.push_str(&class);
            }
            None => self.attributes.push(("class".into(), class)),
        }
        self
    }

    /// Shorthand for the default `data-bind` marker attribute.
    pub fn bind(self, declarations: impl Into<String>) -> Self {
        self.attr(crate::core::constants::DEFAULT_BINDING_ATTRIBUTE, declarations)
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn child(mut self, child: El) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = El>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Create the subtree in `dom`, returning the top element.
    pub fn mount<D: Dom + ?Sized>(self, dom: &D) -> ElementId {
        let el = dom.create_element(&self.tag);
        for (name, value) in &self.attributes {
            dom.set_attribute(el, name, value);
        }
        if let Some(text) = &self.text {
            dom.set_text(el, text);
        }
        if self.checked {
            dom.set_checked(el, true);
        }
        if self.disabled {
            dom.set_disabled(el, true);
        }
        for child in self.children {
            let child = child.mount(dom);
            dom.append_child(el, child);
        }
        el
    }
}

// =============================================================================
// TESTS
// =============================================================================
