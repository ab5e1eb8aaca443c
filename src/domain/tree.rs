//! Node-tree capability set used by the builder.
//!
//! The builder never touches a concrete node type. Anything that can create
//! elements and text nodes, apply settings and link children can be built into.

use std::fmt;

use serde_json::Value;

use crate::domain::error::{DomainError, DomainResult};

/// Event listener registration. Handlers are referred to by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBinding {
    pub event: String,
    /// Listen during the capture phase instead of bubbling.
    pub capture: bool,
    pub handler: String,
}

impl EventBinding {
    pub fn new(event: impl Into<String>, capture: bool, handler: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            capture,
            handler: handler.into(),
        }
    }
}

/// One option applied through the generic `set` contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    /// Replace the node content with a single text node.
    Text(String),
    /// Single inline style declaration.
    Style(String, String),
    /// Several inline style declarations at once.
    Styles(Vec<(String, String)>),
    /// Replace the node content with a parsed HTML fragment.
    Html(String),
    Events(Vec<EventBinding>),
    Attribute(String, String),
    RemoveAttribute(String),
}

impl Setting {
    /// Convert a loosely typed option into a `Setting`.
    ///
    /// Recognized option names are `text`, `style`, `styles`, `html` and
    /// `events`; every other name is an attribute. An attribute value of
    /// `false` removes the attribute.
    pub fn from_option(name: &str, value: &Value) -> DomainResult<Self> {
        match name {
            "text" => Ok(Setting::Text(scalar_text(name, value)?)),
            "html" => Ok(Setting::Html(scalar_text(name, value)?)),
            "style" => match value.as_array().map(Vec::as_slice) {
                Some([property, value]) => Ok(Setting::Style(
                    scalar_text("style property", property)?,
                    scalar_text("style value", value)?,
                )),
                _ => Err(DomainError::invalid_input(
                    "when setting style, value must be an array [property, value]",
                )),
            },
            "styles" => match value.as_object() {
                Some(map) => {
                    let declarations = map
                        .iter()
                        .map(|(property, value)| Ok((property.clone(), scalar_text(property, value)?)))
                        .collect::<DomainResult<Vec<_>>>()?;
                    Ok(Setting::Styles(declarations))
                }
                None => Err(DomainError::invalid_input(
                    "when setting styles, value must be an object {property: value}",
                )),
            },
            "events" => Ok(Setting::Events(parse_events(value)?)),
            _ => match value {
                Value::Bool(false) => Ok(Setting::RemoveAttribute(name.to_string())),
                _ => Ok(Setting::Attribute(name.to_string(), scalar_text(name, value)?)),
            },
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Setting::Text(_) => write!(f, "text"),
            Setting::Style(property, _) => write!(f, "style:{}", property),
            Setting::Styles(declarations) => write!(f, "styles({})", declarations.len()),
            Setting::Html(_) => write!(f, "html"),
            Setting::Events(bindings) => write!(f, "events({})", bindings.len()),
            Setting::Attribute(name, _) => write!(f, "{}", name),
            Setting::RemoveAttribute(name) => write!(f, "!{}", name),
        }
    }
}

/// Strings are taken verbatim, other scalars use their JSON spelling.
fn scalar_text(name: &str, value: &Value) -> DomainResult<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(_) | Value::Bool(_) | Value::Null => Ok(value.to_string()),
        Value::Array(_) | Value::Object(_) => Err(DomainError::invalid_input(format!(
            "value of '{}' must be a string, number, boolean or null",
            name
        ))),
    }
}

/// Accepted shapes:
/// - `[event, capture, handler]`
/// - `{event: handler}`
/// - `{event: [capture, handler]}`
/// - `{event: [[capture, handler], ...]}`
fn parse_events(value: &Value) -> DomainResult<Vec<EventBinding>> {
    match value {
        Value::Array(items) => match items.as_slice() {
            [Value::String(event), Value::Bool(capture), Value::String(handler)] => {
                Ok(vec![EventBinding::new(event, *capture, handler)])
            }
            _ => Err(DomainError::invalid_input(
                "events must be an array [event, capture, handler]",
            )),
        },
        Value::Object(map) => {
            let mut bindings = Vec::new();
            for (event, spec) in map {
                match spec {
                    Value::String(handler) => bindings.push(EventBinding::new(event, false, handler)),
                    Value::Array(items) if items.first().is_some_and(Value::is_array) => {
                        for item in items {
                            bindings.push(capture_pair(event, item)?);
                        }
                    }
                    Value::Array(_) => bindings.push(capture_pair(event, spec)?),
                    _ => {
                        return Err(DomainError::invalid_input(format!(
                            "listener for '{}' must be a handler name or an array",
                            event
                        )))
                    }
                }
            }
            Ok(bindings)
        }
        _ => Err(DomainError::invalid_input(
            "events must be an array or an object",
        )),
    }
}

fn capture_pair(event: &str, value: &Value) -> DomainResult<EventBinding> {
    match value.as_array().map(Vec::as_slice) {
        Some([Value::Bool(capture), Value::String(handler)]) => {
            Ok(EventBinding::new(event, *capture, handler))
        }
        _ => Err(DomainError::invalid_input(format!(
            "listener for '{}' must be [capture, handler]",
            event
        ))),
    }
}

/// Capabilities the builder needs from a host node tree.
pub trait NodeTree {
    /// Copyable handle to a node owned by the tree.
    type Node: Copy + Eq + fmt::Debug;

    fn create_element(&mut self, tag: &str) -> Self::Node;

    fn create_text(&mut self, content: &str) -> Self::Node;

    fn set(&mut self, node: Self::Node, setting: &Setting) -> DomainResult<()>;

    fn append_child(&mut self, parent: Self::Node, child: Self::Node) -> DomainResult<()>;

    /// Insert `child` into `parent` immediately before `reference`.
    fn insert_before(
        &mut self,
        parent: Self::Node,
        child: Self::Node,
        reference: Self::Node,
    ) -> DomainResult<()>;

    /// First descendant of `scope` matching `selector`, in document order.
    fn query(&self, scope: Self::Node, selector: &str) -> DomainResult<Option<Self::Node>>;

    /// Whether `node` is a live node that can own children.
    fn accepts_children(&self, node: Self::Node) -> bool;

    /// Whether `node` is live and its parent is `parent`.
    fn is_child_of(&self, node: Self::Node, parent: Self::Node) -> bool;
}
