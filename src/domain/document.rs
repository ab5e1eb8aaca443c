//! Arena-backed document: the in-memory node tree the builder writes into.

use std::fmt;

use generational_arena::{Arena, Index};
use serde_json::Value;
use tracing::instrument;

use crate::domain::builder::{Attach, Created, TreeBuilder};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::html::{self, Fragment};
use crate::domain::selector::{SelectorList, SelectorTarget};
use crate::domain::tree::{EventBinding, NodeTree, Setting};

/// Handle to a node in a [`Document`]. Stale once the node is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Index);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (index, generation) = self.0.into_raw_parts();
        write!(f, "{}v{}", index, generation)
    }
}

/// Element payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Lower-cased tag name
    pub tag: String,
    /// Attributes in insertion order, names unique
    pub attributes: Vec<(String, String)>,
    /// Inline style declarations in insertion order
    pub style: Vec<(String, String)>,
    pub listeners: Vec<EventBinding>,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            style: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The `style` attribute is kept as parsed declarations.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        if name == "style" {
            self.style = parse_declarations(value);
            return;
        }
        match self.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn remove_attribute(&mut self, name: &str) {
        if name == "style" {
            self.style.clear();
        } else {
            self.attributes.retain(|(k, _)| k != name);
        }
    }

    pub fn style(&self, property: &str) -> Option<&str> {
        self.style
            .iter()
            .find(|(k, _)| k == property)
            .map(|(_, v)| v.as_str())
    }

    /// An empty value removes the declaration.
    pub fn set_style(&mut self, property: &str, value: &str) {
        if value.is_empty() {
            self.style.retain(|(k, _)| k != property);
            return;
        }
        match self.style.iter_mut().find(|(k, _)| k == property) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.style.push((property.to_string(), value.to_string())),
        }
    }

    /// Declarations serialized as `a: b; c: d`.
    pub fn style_text(&self) -> String {
        self.style
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// "color: red; margin: 0" -> [("color", "red"), ("margin", "0")]
fn parse_declarations(input: &str) -> Vec<(String, String)> {
    input
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim();
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some((name, value.to_string()))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
}

/// Node in the arena. Children are owned: destroying a node frees its subtree.
#[derive(Debug)]
pub struct DomNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Document tree with an `html > (head, body)` skeleton.
#[derive(Debug)]
pub struct Document {
    arena: Arena<DomNode>,
    root: NodeId,
    head: NodeId,
    body: NodeId,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let mut element = |tag: &str, parent: Option<NodeId>| {
            NodeId(arena.insert(DomNode {
                kind: NodeKind::Element(ElementData::new(tag)),
                parent,
                children: Vec::new(),
            }))
        };
        let root = element("html", None);
        let head = element("head", Some(root));
        let body = element("body", Some(root));
        if let Some(node) = arena.get_mut(root.0) {
            node.children = vec![head, body];
        }
        Self {
            arena,
            root,
            head,
            body,
        }
    }

    /// Skeleton document whose body holds the parsed fragment.
    pub fn with_body_html(html: &str) -> Self {
        let mut document = Self::new();
        let body = document.body;
        for fragment in html::parse_fragment(html) {
            document.materialize(body, &fragment);
        }
        document
    }

    /// Skeleton document filled from a whole page.
    ///
    /// Content of `html`, `head` and `body` elements is merged into the
    /// skeleton; anything else lands in the body.
    pub fn from_page(markup: &str) -> Self {
        let mut document = Self::new();
        let fragments = html::parse_fragment(markup);
        document.merge_page(&fragments);
        document
    }

    fn merge_page(&mut self, fragments: &[Fragment]) {
        for fragment in fragments {
            match fragment {
                Fragment::Element { tag, children, .. } if tag == "html" => self.merge_page(children),
                Fragment::Element { tag, children, .. } if tag == "head" || tag == "body" => {
                    let target = if tag == "head" { self.head } else { self.body };
                    for child in children {
                        self.materialize(target, child);
                    }
                }
                Fragment::Text(content) if content.trim().is_empty() => {}
                other => {
                    let body = self.body;
                    self.materialize(body, other);
                }
            }
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn head(&self) -> NodeId {
        self.head
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn get_node(&self, id: NodeId) -> Option<&DomNode> {
        self.arena.get(id.0)
    }

    fn node(&self, id: NodeId) -> DomainResult<&DomNode> {
        self.arena
            .get(id.0)
            .ok_or_else(|| DomainError::invalid_input(format!("node {} does not exist", id)))
    }

    fn node_mut(&mut self, id: NodeId) -> DomainResult<&mut DomNode> {
        self.arena
            .get_mut(id.0)
            .ok_or_else(|| DomainError::invalid_input(format!("node {} does not exist", id)))
    }

    pub fn element(&self, id: NodeId) -> DomainResult<&ElementData> {
        match &self.node(id)?.kind {
            NodeKind::Element(data) => Ok(data),
            NodeKind::Text(_) => Err(DomainError::invalid_input(format!(
                "node {} is a text node, not an element",
                id
            ))),
        }
    }

    fn element_mut(&mut self, id: NodeId) -> DomainResult<&mut ElementData> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element(data) => Ok(data),
            NodeKind::Text(_) => Err(DomainError::invalid_input(format!(
                "node {} is a text node, not an element",
                id
            ))),
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.get_node(id)?.kind {
            NodeKind::Element(data) => Some(data.tag.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag_name(id).is_some()
    }

    /// Content of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.get_node(id)?.kind {
            NodeKind::Text(content) => Some(content.as_str()),
            NodeKind::Element(_) => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).ok()?.attribute(name)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.parent
    }

    /// All child nodes, text included.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get_node(id).map_or(&[], |node| node.children.as_slice())
    }

    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
            .collect()
    }

    /// The `n`-th element child, text nodes not counted.
    pub fn child_element(&self, id: NodeId, n: usize) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
            .nth(n)
    }

    /// Text node children, in order.
    pub fn text_children(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.text(child).is_some())
            .collect()
    }

    /// Whether `node` is `ancestor` or lies below it.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Pre-order iterator over the descendants of `scope`, `scope` excluded.
    pub fn descendants(&self, scope: NodeId) -> Descendants<'_> {
        Descendants::new(self, scope)
    }

    /// Unlink `id` from its parent. The node stays alive and owned by the caller.
    pub fn detach(&mut self, id: NodeId) -> DomainResult<()> {
        if let Some(parent) = self.node(id)?.parent {
            if let Some(parent_node) = self.arena.get_mut(parent.0) {
                parent_node.children.retain(|&child| child != id);
            }
            self.node_mut(id)?.parent = None;
        }
        Ok(())
    }

    /// Detach `id` and free it together with its whole subtree.
    #[instrument(level = "trace", skip(self))]
    pub fn destroy(&mut self, id: NodeId) -> DomainResult<()> {
        if id == self.root {
            return Err(DomainError::invalid_input("the document root cannot be destroyed"));
        }
        self.detach(id)?;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.arena.remove(current.0) {
                stack.extend(node.children);
            }
        }
        Ok(())
    }

    /// Destroy every child of `id`.
    pub fn empty(&mut self, id: NodeId) -> DomainResult<()> {
        let children = self.node(id)?.children.clone();
        for child in children {
            self.destroy(child)?;
        }
        Ok(())
    }

    /// Apply a loosely typed option, see [`Setting::from_option`].
    pub fn set_option(&mut self, id: NodeId, name: &str, value: &Value) -> DomainResult<()> {
        let setting = Setting::from_option(name, value)?;
        self.apply(id, &setting)
    }

    #[instrument(level = "trace", skip(self))]
    pub fn apply(&mut self, id: NodeId, setting: &Setting) -> DomainResult<()> {
        if self.text(id).is_some() {
            return match setting {
                Setting::Text(value) => {
                    self.node_mut(id)?.kind = NodeKind::Text(value.clone());
                    Ok(())
                }
                other => Err(DomainError::invalid_input(format!(
                    "text node {} does not accept '{}'",
                    id, other
                ))),
            };
        }

        match setting {
            Setting::Text(value) => {
                self.empty(id)?;
                if !value.is_empty() {
                    let text = self.create_text(value);
                    self.append_child(id, text)?;
                }
            }
            Setting::Style(property, value) => self.element_mut(id)?.set_style(property, value),
            Setting::Styles(declarations) => {
                let element = self.element_mut(id)?;
                for (property, value) in declarations {
                    element.set_style(property, value);
                }
            }
            Setting::Html(markup) => {
                self.empty(id)?;
                for fragment in html::parse_fragment(markup) {
                    self.materialize(id, &fragment);
                }
            }
            Setting::Events(bindings) => {
                self.element_mut(id)?
                    .listeners
                    .extend(bindings.iter().cloned());
            }
            Setting::Attribute(name, value) => self.element_mut(id)?.set_attribute(name, value),
            Setting::RemoveAttribute(name) => self.element_mut(id)?.remove_attribute(name),
        }
        Ok(())
    }

    /// Read an option: `text`, `html`, `style`, or an attribute.
    pub fn get(&self, id: NodeId, option: &str) -> DomainResult<Option<String>> {
        self.node(id)?;
        match option {
            "text" => Ok(Some(self.text_content(id))),
            "html" => Ok(Some(self.inner_html(id))),
            "style" => {
                let style = self.element(id)?.style_text();
                Ok((!style.is_empty()).then_some(style))
            }
            name => Ok(self.element(id)?.attribute(name).map(str::to_string)),
        }
    }

    pub fn style(&self, id: NodeId, property: &str) -> Option<&str> {
        self.element(id).ok()?.style(property)
    }

    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) -> DomainResult<()> {
        self.apply(id, &Setting::Style(property.into(), value.into()))
    }

    pub fn set_styles(&mut self, id: NodeId, declarations: &[(&str, &str)]) -> DomainResult<()> {
        let declarations = declarations
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.apply(id, &Setting::Styles(declarations))
    }

    pub fn add_event(&mut self, id: NodeId, binding: EventBinding) -> DomainResult<()> {
        self.element_mut(id)?.listeners.push(binding);
        Ok(())
    }

    /// Remove a matching listener. Returns whether one was registered.
    pub fn remove_event(&mut self, id: NodeId, binding: &EventBinding) -> DomainResult<bool> {
        let listeners = &mut self.element_mut(id)?.listeners;
        match listeners.iter().position(|existing| existing == binding) {
            Some(index) => {
                listeners.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Handler names a dispatch of `event` at `id` invokes, in order:
    /// capture listeners from the root down, target listeners, then bubble
    /// listeners from the nearest ancestor up.
    pub fn fire(&self, id: NodeId, event: &str) -> DomainResult<Vec<String>> {
        self.node(id)?;
        let mut path = Vec::new();
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            path.push(ancestor);
            current = self.parent(ancestor);
        }

        let listeners = |node: NodeId| {
            self.element(node)
                .map(|data| data.listeners.as_slice())
                .unwrap_or_default()
                .iter()
                .filter(move |binding| binding.event == event)
        };

        let mut handlers = Vec::new();
        for &ancestor in path.iter().rev() {
            handlers.extend(listeners(ancestor).filter(|b| b.capture).map(|b| b.handler.clone()));
        }
        handlers.extend(listeners(id).map(|b| b.handler.clone()));
        for &ancestor in &path {
            handlers.extend(listeners(ancestor).filter(|b| !b.capture).map(|b| b.handler.clone()));
        }
        Ok(handlers)
    }

    pub fn query_all(&self, scope: NodeId, selector: &str) -> DomainResult<Vec<NodeId>> {
        let selector = SelectorList::parse(selector)?;
        self.node(scope)?;
        Ok(self
            .descendants(scope)
            .filter(|&id| selector.matches(self, id))
            .collect())
    }

    pub fn by_id(&self, scope: NodeId, id: &str) -> Option<NodeId> {
        self.descendants(scope)
            .find(|&node| self.attribute(node, "id") == Some(id))
    }

    pub fn by_class(&self, scope: NodeId, class: &str) -> Option<NodeId> {
        self.by_class_all(scope, class).into_iter().next()
    }

    pub fn by_class_all(&self, scope: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|&node| {
                self.attribute(node, "class")
                    .is_some_and(|list| list.split_whitespace().any(|c| c == class))
            })
            .collect()
    }

    /// Build `descriptor` and append the result to `parent`.
    pub fn create(&mut self, parent: NodeId, descriptor: &Value) -> DomainResult<Created<NodeId>> {
        TreeBuilder::new().create(self, Some(descriptor), Some(Attach::Append(parent)))
    }

    /// Parse an HTML string and return its top-level elements, detached.
    pub fn from_html(&mut self, markup: &str) -> DomainResult<Created<NodeId>> {
        if markup.is_empty() {
            return Err(DomainError::invalid_input("html must be a non-empty string"));
        }
        let container = self.create_element("div");
        self.apply(container, &Setting::Html(markup.to_string()))?;
        let elements = self.element_children(container);
        for &element in &elements {
            self.detach(element)?;
        }
        self.destroy(container)?;
        Ok(Created::from_vec(elements))
    }

    fn materialize(&mut self, parent: NodeId, fragment: &Fragment) {
        let id = match fragment {
            Fragment::Text(content) => self.create_text(content),
            Fragment::Element {
                tag,
                attributes,
                children,
            } => {
                let id = self.create_element(tag);
                if let Some(NodeKind::Element(data)) = self.arena.get_mut(id.0).map(|n| &mut n.kind) {
                    for (name, value) in attributes {
                        data.set_attribute(name, value);
                    }
                }
                for child in children {
                    self.materialize(id, child);
                }
                id
            }
        };
        self.link(parent, id, None);
    }

    /// Insert a detached `child` under `parent` at `index` (or last).
    fn link(&mut self, parent: NodeId, child: NodeId, index: Option<usize>) {
        if let Some(parent_node) = self.arena.get_mut(parent.0) {
            match index {
                Some(i) => parent_node.children.insert(i, child),
                None => parent_node.children.push(child),
            }
        }
        if let Some(child_node) = self.arena.get_mut(child.0) {
            child_node.parent = Some(parent);
        }
    }

    fn check_insertable(&self, parent: NodeId, child: NodeId) -> DomainResult<()> {
        self.element(parent)?;
        self.node(child)?;
        if self.contains(child, parent) {
            return Err(DomainError::invalid_input(format!(
                "node {} cannot be inserted into itself or its descendant",
                child
            )));
        }
        if child == self.root {
            return Err(DomainError::invalid_input("the document root cannot be moved"));
        }
        Ok(())
    }
}

impl NodeTree for Document {
    type Node = NodeId;

    fn create_element(&mut self, tag: &str) -> NodeId {
        NodeId(self.arena.insert(DomNode {
            kind: NodeKind::Element(ElementData::new(tag)),
            parent: None,
            children: Vec::new(),
        }))
    }

    fn create_text(&mut self, content: &str) -> NodeId {
        NodeId(self.arena.insert(DomNode {
            kind: NodeKind::Text(content.to_string()),
            parent: None,
            children: Vec::new(),
        }))
    }

    fn set(&mut self, node: NodeId, setting: &Setting) -> DomainResult<()> {
        self.apply(node, setting)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomainResult<()> {
        self.check_insertable(parent, child)?;
        self.detach(child)?;
        self.link(parent, child, None);
        Ok(())
    }

    fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) -> DomainResult<()> {
        self.check_insertable(parent, child)?;
        if self.parent(reference) != Some(parent) {
            return Err(DomainError::invalid_input(format!(
                "reference node {} is not a child of {}",
                reference, parent
            )));
        }
        if child == reference {
            return Ok(());
        }
        self.detach(child)?;
        let index = self
            .children(parent)
            .iter()
            .position(|&id| id == reference)
            .ok_or_else(|| DomainError::invalid_input(format!("reference node {} vanished", reference)))?;
        self.link(parent, child, Some(index));
        Ok(())
    }

    fn query(&self, scope: NodeId, selector: &str) -> DomainResult<Option<NodeId>> {
        let selector = SelectorList::parse(selector)?;
        self.node(scope)?;
        Ok(self.descendants(scope).find(|&id| selector.matches(self, id)))
    }

    fn accepts_children(&self, node: NodeId) -> bool {
        self.element(node).is_ok()
    }

    fn is_child_of(&self, node: NodeId, parent: NodeId) -> bool {
        self.parent(node) == Some(parent)
    }
}

impl SelectorTarget for Document {
    type Node = NodeId;

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        Document::tag_name(self, node)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        Document::attribute(self, node, name)
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node).filter(|&parent| self.is_element(parent))
    }
}

pub struct Descendants<'a> {
    document: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Descendants<'a> {
    fn new(document: &'a Document, scope: NodeId) -> Self {
        let stack = document.children(scope).iter().rev().copied().collect();
        Self { document, stack }
    }
}

impl<'a> Iterator for Descendants<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        // Push children in reverse order for left-to-right traversal
        self.stack
            .extend(self.document.children(current).iter().rev().copied());
        Some(current)
    }
}
