//! Typed node descriptors.
//!
//! A descriptor arrives as a literal JSON value and is parsed once into a
//! tree of [`Descriptor`] values, so the builder never inspects value shapes.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::tree::Setting;

/// Reserved key names inside a descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Markers {
    /// Key (or `tagname` value) that produces a text node
    pub text: String,
    /// Key holding the child descriptors of an element with settings
    pub children: String,
    /// Explicit tag field, required under numeric keys
    pub tagname: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            text: "#text".into(),
            children: "children".into(),
            tagname: "tagname".into(),
        }
    }
}

/// One node to be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    /// Empty element of the given tag.
    Tag(String),
    /// Text node.
    TextLeaf(String),
    /// Element whose content steps run in mapping order.
    Node { tag: String, items: Vec<Item> },
}

/// One step in building an element, kept at its position in the mapping.
///
/// `text` and `html` replace the content, so a child block listed before
/// them is wiped while one listed after them survives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Set(Setting),
    Children(Vec<Descriptor>),
}

impl Descriptor {
    /// Parse a literal descriptor into the top-level sibling sequence.
    ///
    /// `null`, `false`, `""` and `0` count as a missing descriptor.
    pub fn parse(value: &Value, markers: &Markers) -> DomainResult<Vec<Descriptor>> {
        match value {
            Value::Null | Value::Bool(false) => Err(missing()),
            Value::String(s) if s.is_empty() => Err(missing()),
            Value::Number(n) if n.as_f64() == Some(0.0) => Err(missing()),
            Value::String(tag) if *tag == markers.text => Ok(Vec::new()),
            Value::String(tag) => Ok(vec![Descriptor::Tag(checked_tag(tag)?)]),
            Value::Object(map) => parse_entries(map.iter().map(|(k, v)| (k.as_str(), v)), markers),
            Value::Array(items) => parse_array(items, markers),
            Value::Number(_) | Value::Bool(true) => Err(DomainError::invalid_input(
                "descriptor must be a tag name or a mapping",
            )),
        }
    }

    /// Tag name for elements, `None` for text leaves.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Descriptor::Tag(tag) | Descriptor::Node { tag, .. } => Some(tag),
            Descriptor::TextLeaf(_) => None,
        }
    }

    /// Child descriptors across all child blocks, in order.
    pub fn children(&self) -> impl Iterator<Item = &Descriptor> {
        let items: &[Item] = match self {
            Descriptor::Node { items, .. } => items,
            _ => &[],
        };
        items.iter().flat_map(|item| match item {
            Item::Children(children) => children.as_slice(),
            Item::Set(_) => &[][..],
        })
    }
}

fn missing() -> DomainError {
    DomainError::invalid_input("descriptor must be specified")
}

/// Element names: a letter, then letters, digits, `-`, `_`, `.` or `:`.
fn tag_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9._:-]*$").expect("tag name pattern is valid")
    })
}

fn checked_tag(tag: &str) -> DomainResult<String> {
    if tag_name_regex().is_match(tag) {
        Ok(tag.to_string())
    } else {
        Err(DomainError::invalid_input(format!("invalid tag name '{}'", tag)))
    }
}

fn node(tag: &str, items: Vec<Item>) -> DomainResult<Descriptor> {
    Ok(Descriptor::Node {
        tag: checked_tag(tag)?,
        items,
    })
}

fn parse_array(items: &[Value], markers: &Markers) -> DomainResult<Vec<Descriptor>> {
    let keys: Vec<String> = (0..items.len()).map(|i| i.to_string()).collect();
    parse_entries(keys.iter().map(String::as_str).zip(items.iter()), markers)
}

fn parse_entries<'a>(
    entries: impl Iterator<Item = (&'a str, &'a Value)>,
    markers: &Markers,
) -> DomainResult<Vec<Descriptor>> {
    let mut result = Vec::new();
    for (key, value) in entries {
        if let Some(descriptor) = parse_entry(key, value, markers)? {
            result.push(descriptor);
        }
    }
    Ok(result)
}

/// A key is numeric when it starts with an ASCII digit.
fn is_numeric_key(key: &str) -> bool {
    key.as_bytes().first().is_some_and(u8::is_ascii_digit)
}

fn parse_entry(key: &str, value: &Value, markers: &Markers) -> DomainResult<Option<Descriptor>> {
    let tag = if is_numeric_key(key) {
        match value
            .as_object()
            .and_then(|spec| spec.get(&markers.tagname))
            .and_then(Value::as_str)
        {
            Some(tag) => tag.to_string(),
            None => {
                warn!("skipping numeric key '{}' without a {} field", key, markers.tagname);
                return Ok(None);
            }
        }
    } else {
        key.to_string()
    };

    match value {
        Value::String(content) if tag == markers.text => {
            Ok(Some(Descriptor::TextLeaf(content.clone())))
        }
        Value::String(content) => node(&tag, vec![Item::Set(Setting::Text(content.clone()))]).map(Some),
        Value::Object(spec) => parse_spec(tag, spec, markers).map(Some),
        Value::Array(items) if tag != markers.text => {
            node(&tag, vec![Item::Children(parse_array(items, markers)?)]).map(Some)
        }
        _ => {
            warn!("skipping '{}': unsupported descriptor value {}", key, value);
            Ok(None)
        }
    }
}

fn parse_spec(tag: String, spec: &Map<String, Value>, markers: &Markers) -> DomainResult<Descriptor> {
    if tag == markers.text {
        return Ok(Descriptor::TextLeaf(text_field(spec)));
    }

    if spec.contains_key(&markers.children) {
        let mut items = Vec::new();
        for (name, value) in spec {
            if *name == markers.tagname {
                continue;
            }
            if *name != markers.children {
                items.push(Item::Set(Setting::from_option(name, value)?));
                continue;
            }
            let children = match value {
                Value::Object(map) => parse_entries(map.iter().map(|(k, v)| (k.as_str(), v)), markers)?,
                Value::Array(entries) => parse_array(entries, markers)?,
                _ => {
                    warn!("ignoring non-mapping {} of <{}>", markers.children, tag);
                    Vec::new()
                }
            };
            items.push(Item::Children(children));
        }
        return node(&tag, items);
    }

    if spec.get(&markers.tagname).and_then(Value::as_str) == Some(markers.text.as_str()) {
        return Ok(Descriptor::TextLeaf(text_field(spec)));
    }

    let children = parse_entries(
        spec.iter()
            .filter(|(name, _)| **name != markers.tagname)
            .map(|(k, v)| (k.as_str(), v)),
        markers,
    )?;
    node(&tag, vec![Item::Children(children)])
}

fn text_field(spec: &Map<String, Value>) -> String {
    spec.get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
