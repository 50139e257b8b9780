// ============================================================================
// spark-bind - Binding Resolution
// From markup or selector maps to descriptors, and from expressions to nodes
// ============================================================================
//
// Resolution happens once, when a view is built. Descriptors are collected
// from the element tree (root included), then every expression is resolved
// against the view's sources into a `Node`: property names become
// (store, key) pairs and `$name` tokens become the sources themselves. Any
// name that cannot be resolved fails the whole view.
// ============================================================================

use serde_json::{Map, Value};
use tracing::debug;

use crate::binding::config::Bindings;
use crate::binding::dom::{Dom, ElementId, Selector};
use crate::binding::expr::{parse_declarations, Expr};
use crate::binding::modifier::Modifier;
use crate::binding::source::{Bound, ResolvedProperty, Source, SourceRegistry};
use crate::collections::Collection;
use crate::core::constants::ROOT_SELECTOR;
use crate::core::error::{Error, Result};
use crate::primitives::store::Store;
use crate::reactivity::tracking::untrack;

// =============================================================================
// DESCRIPTORS
// =============================================================================

/// One binding declared on one element.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingDescriptor {
    pub element: ElementId,
    pub kind: String,
    pub expr: Expr,
}

/// Collect every binding declared under `root`, root included.
///
/// Attribute mode scans the subtree in document order; map mode applies each
/// selector in turn (`:el` addresses the root).
pub fn collect_descriptors(
    dom: &dyn Dom,
    root: ElementId,
    bindings: &Bindings,
) -> Result<Vec<BindingDescriptor>> {
    let mut descriptors = Vec::new();
    match bindings {
        Bindings::Attribute(attribute) => {
            for element in std::iter::once(root).chain(dom.descendants(root)) {
                let Some(declarations) = dom.attribute(element, attribute) else {
                    continue;
                };
                push_declarations(&mut descriptors, element, &declarations)?;
            }
        }
        Bindings::Map(map) => {
            for (selector, declarations) in map {
                let elements = if selector.trim() == ROOT_SELECTOR {
                    vec![root]
                } else {
                    dom.query_all(root, &Selector::parse(selector)?)
                };
                if elements.is_empty() {
                    debug!(selector = %selector, "binding selector matched nothing");
                }
                for element in elements {
                    push_declarations(&mut descriptors, element, declarations)?;
                }
            }
        }
    }
    Ok(descriptors)
}

fn push_declarations(
    descriptors: &mut Vec<BindingDescriptor>,
    element: ElementId,
    declarations: &str,
) -> Result<()> {
    for declaration in parse_declarations(declarations)? {
        descriptors.push(BindingDescriptor {
            element,
            kind: declaration.kind,
            expr: declaration.expr,
        });
    }
    Ok(())
}

// =============================================================================
// NODES
// =============================================================================

/// A reference a binding re-pulls on.
#[derive(Debug, Clone, PartialEq)]
pub enum Dependency {
    /// One key of a store.
    Property(Store, String),
    /// Any key of a store, from a `$name` token.
    Store(Store),
    /// Structure of a collection.
    Collection(Collection),
}

/// A binding expression with every reference resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Literal(Value),
    Property(ResolvedProperty),
    Source(String, Source),
    Object(Vec<(String, Node)>),
    Array(Vec<Node>),
    Call(Modifier, Vec<Node>),
}

impl Node {
    /// Resolve `expr` against `sources`.
    ///
    /// # Errors
    /// [`Error::UnresolvedBinding`] for a property no source has,
    /// [`Error::UnknownSource`] for a `$name` that is not registered.
    pub fn resolve(expr: &Expr, sources: &SourceRegistry, binding: &str) -> Result<Node> {
        Ok(match expr {
            Expr::Literal(value) => Node::Literal(value.clone()),
            Expr::Property(name) => Node::Property(sources.resolve_property(name).ok_or_else(
                || Error::UnresolvedBinding {
                    binding: binding.to_string(),
                    name: name.clone(),
                },
            )?),
            Expr::Source(name) => {
                let source = sources.get(name).ok_or_else(|| Error::UnknownSource {
                    binding: binding.to_string(),
                    name: name.clone(),
                })?;
                Node::Source(name.clone(), source.clone())
            }
            Expr::Object(fields) => Node::Object(
                fields
                    .iter()
                    .map(|(key, expr)| Ok((key.clone(), Node::resolve(expr, sources, binding)?)))
                    .collect::<Result<_>>()?,
            ),
            Expr::Array(items) => Node::Array(
                items
                    .iter()
                    .map(|expr| Node::resolve(expr, sources, binding))
                    .collect::<Result<_>>()?,
            ),
            Expr::Call(modifier, args) => Node::Call(
                *modifier,
                args.iter()
                    .map(|expr| Node::resolve(expr, sources, binding))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    /// Current value. Reads are untracked.
    pub fn evaluate(&self) -> Result<Bound> {
        untrack(|| self.eval())
    }

    fn eval(&self) -> Result<Bound> {
        Ok(match self {
            Node::Literal(value) => Bound::Value(value.clone()),
            Node::Property(property) => Bound::Value(property.store.get(&property.key)),
            Node::Source(_, source) => source.to_bound(),
            Node::Object(fields) => {
                let mut object = Map::new();
                for (key, node) in fields {
                    object.insert(key.clone(), node.eval()?.to_value());
                }
                Bound::Value(Value::Object(object))
            }
            Node::Array(items) => Bound::Value(Value::Array(
                items
                    .iter()
                    .map(|node| node.eval().map(|bound| bound.to_value()))
                    .collect::<Result<_>>()?,
            )),
            Node::Call(modifier, args) => {
                let args = args.iter().map(Node::eval).collect::<Result<Vec<_>>>()?;
                modifier.apply(args)?
            }
        })
    }

    /// Write a value back through this expression.
    ///
    /// Properties are set on their store; objects route each key of an
    /// object value to the field of the same name; `$store` tokens take an
    /// object value as a multi-key set. Returns false when nothing here is
    /// writable.
    pub fn write(&self, value: Value) -> Result<bool> {
        match (self, value) {
            (Node::Property(property), value) => {
                property.store.set(&property.key, value)?;
                Ok(true)
            }
            (Node::Object(fields), Value::Object(values)) => {
                let mut wrote = false;
                for (key, value) in values {
                    if let Some((_, node)) = fields.iter().find(|(field, _)| *field == key) {
                        wrote |= node.write(value)?;
                    }
                }
                Ok(wrote)
            }
            (Node::Source(_, Source::Store(store)), Value::Object(values)) => {
                store.set_attributes(values)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Every source reference, for change subscriptions.
    pub fn dependencies(&self) -> Vec<Dependency> {
        let mut out = Vec::new();
        self.collect_dependencies(&mut out);
        out
    }

    fn collect_dependencies(&self, out: &mut Vec<Dependency>) {
        let dependency = match self {
            Node::Literal(_) => return,
            Node::Property(property) => {
                Dependency::Property(property.store.clone(), property.key.clone())
            }
            Node::Source(_, Source::Store(store)) => Dependency::Store(store.clone()),
            Node::Source(_, Source::Collection(collection)) => {
                Dependency::Collection(collection.clone())
            }
            Node::Object(fields) => {
                fields.iter().for_each(|(_, node)| node.collect_dependencies(out));
                return;
            }
            Node::Array(items) | Node::Call(_, items) => {
                items.iter().for_each(|node| node.collect_dependencies(out));
                return;
            }
        };
        if !out.contains(&dependency) {
            out.push(dependency);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
