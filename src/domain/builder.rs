//! Declarative tree builder.
//!
//! Turns a node descriptor into nodes of any [`NodeTree`] and optionally
//! attaches the top-level results to an existing parent.

use serde_json::Value;
use tracing::{debug, instrument};

use crate::domain::descriptor::{Descriptor, Item, Markers};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::tree::{NodeTree, Setting};

/// Where the produced top-level nodes go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach<N> {
    /// Append each node as the last child of the parent.
    Append(N),
    /// Insert each node immediately before `reference`, a child of `parent`.
    InsertBefore { parent: N, reference: Option<N> },
}

impl<N: Copy> Attach<N> {
    /// Accepts `append`, `insert-before` and `insertBefore`.
    pub fn from_mode(mode: &str, parent: N, reference: Option<N>) -> DomainResult<Self> {
        match mode {
            "append" => Ok(Attach::Append(parent)),
            "insert-before" | "insertBefore" => Ok(Attach::InsertBefore { parent, reference }),
            other => Err(DomainError::invalid_input(format!(
                "unknown attach mode '{}', expected append or insert-before",
                other
            ))),
        }
    }

    pub fn parent(&self) -> N {
        match *self {
            Attach::Append(parent) | Attach::InsertBefore { parent, .. } => parent,
        }
    }
}

/// Top-level nodes produced by one builder call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Created<N> {
    Empty,
    One(N),
    Many(Vec<N>),
}

impl<N: Copy> Created<N> {
    pub fn from_vec(mut nodes: Vec<N>) -> Self {
        match nodes.len() {
            0 => Created::Empty,
            1 => Created::One(nodes.remove(0)),
            _ => Created::Many(nodes),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Created::Empty => 0,
            Created::One(_) => 1,
            Created::Many(nodes) => nodes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Created::Empty)
    }

    pub fn get(&self, index: usize) -> Option<N> {
        self.iter().nth(index).copied()
    }

    pub fn first(&self) -> Option<N> {
        self.get(0)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, N> {
        match self {
            Created::Empty => <&[N]>::default().iter(),
            Created::One(node) => std::slice::from_ref(node).iter(),
            Created::Many(nodes) => nodes.iter(),
        }
    }

    pub fn into_vec(self) -> Vec<N> {
        match self {
            Created::Empty => Vec::new(),
            Created::One(node) => vec![node],
            Created::Many(nodes) => nodes,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    markers: Markers,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_markers(markers: Markers) -> Self {
        Self { markers }
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    /// Parse `descriptor` and build it into `tree`.
    ///
    /// A missing descriptor is `InvalidInput`.
    #[instrument(level = "debug", skip_all)]
    pub fn create<T: NodeTree>(
        &self,
        tree: &mut T,
        descriptor: Option<&Value>,
        attach: Option<Attach<T::Node>>,
    ) -> DomainResult<Created<T::Node>> {
        let descriptor =
            descriptor.ok_or_else(|| DomainError::invalid_input("descriptor must be specified"))?;
        let descriptors = Descriptor::parse(descriptor, &self.markers)?;
        self.build(tree, &descriptors, attach)
    }

    /// Build already parsed descriptors.
    ///
    /// The attachment is checked before any node is created.
    #[instrument(level = "debug", skip_all, fields(count = descriptors.len()))]
    pub fn build<T: NodeTree>(
        &self,
        tree: &mut T,
        descriptors: &[Descriptor],
        attach: Option<Attach<T::Node>>,
    ) -> DomainResult<Created<T::Node>> {
        if let Some(attach) = &attach {
            validate(tree, attach)?;
        }

        let mut nodes = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            nodes.push(build_node(tree, descriptor)?);
        }

        match attach {
            Some(Attach::Append(parent)) => {
                for &node in &nodes {
                    tree.append_child(parent, node)?;
                }
            }
            Some(Attach::InsertBefore {
                parent,
                reference: Some(reference),
            }) => {
                for &node in &nodes {
                    tree.insert_before(parent, node, reference)?;
                }
            }
            Some(Attach::InsertBefore { reference: None, .. }) | None => {}
        }
        debug!("built {} top-level node(s)", nodes.len());
        Ok(Created::from_vec(nodes))
    }
}

fn validate<T: NodeTree>(tree: &T, attach: &Attach<T::Node>) -> DomainResult<()> {
    let parent = attach.parent();
    if !tree.accepts_children(parent) {
        return Err(DomainError::invalid_input(format!(
            "attach target {:?} cannot hold children",
            parent
        )));
    }
    match *attach {
        Attach::InsertBefore { reference: None, .. } => Err(DomainError::invalid_input(
            "insert-before requires a reference sibling",
        )),
        Attach::InsertBefore {
            reference: Some(reference),
            ..
        } if !tree.is_child_of(reference, parent) => Err(DomainError::invalid_input(format!(
            "reference node {:?} is not a child of {:?}",
            reference, parent
        ))),
        _ => Ok(()),
    }
}

fn build_node<T: NodeTree>(tree: &mut T, descriptor: &Descriptor) -> DomainResult<T::Node> {
    match descriptor {
        Descriptor::Tag(tag) => Ok(tree.create_element(tag)),
        Descriptor::TextLeaf(content) => Ok(tree.create_text(content)),
        Descriptor::Node { tag, items } => {
            let node = tree.create_element(tag);
            for item in items {
                match item {
                    Item::Set(setting) => apply(tree, node, setting)?,
                    Item::Children(children) => {
                        for child in children {
                            let child = build_node(tree, child)?;
                            tree.append_child(node, child)?;
                        }
                    }
                }
            }
            Ok(node)
        }
    }
}

fn apply<T: NodeTree>(tree: &mut T, node: T::Node, setting: &Setting) -> DomainResult<()> {
    debug!("set {} on {:?}", setting, node);
    tree.set(node, setting)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::{Document, NodeId};
    use serde_json::json;

    fn build(
        doc: &mut Document,
        value: Value,
        attach: Option<Attach<NodeId>>,
    ) -> DomainResult<Created<NodeId>> {
        TreeBuilder::new().create(doc, Some(&value), attach)
    }

    #[test]
    fn given_missing_descriptor_when_creating_then_invalid_input() {
        let mut doc = Document::new();
        let result = TreeBuilder::new().create(&mut doc, None, None);
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn given_bare_tag_when_creating_then_one_detached_element() {
        let mut doc = Document::new();
        let created = build(&mut doc, json!("section"), None).unwrap();
        let node = created.first().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(doc.tag_name(node), Some("section"));
        assert_eq!(doc.parent(node), None);
    }

    #[test]
    fn given_bare_text_marker_when_creating_then_empty() {
        let mut doc = Document::new();
        let created = build(&mut doc, json!("#text"), None).unwrap();
        assert!(created.is_empty());
        assert_eq!(created.first(), None);
    }

    #[test]
    fn given_insert_before_without_reference_when_creating_then_invalid_input_and_nothing_built() {
        let mut doc = Document::new();
        let before = doc.len();
        let body = doc.body();
        let attach = Attach::InsertBefore {
            parent: body,
            reference: None,
        };
        let result = build(&mut doc, json!({"div": {}}), Some(attach));
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
        assert_eq!(doc.len(), before);
    }

    #[test]
    fn given_text_node_as_target_when_creating_then_invalid_input() {
        let mut doc = Document::new();
        let text = doc.create_text("x");
        let result = build(&mut doc, json!("div"), Some(Attach::Append(text)));
        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    #[test]
    fn given_unknown_mode_when_parsing_attach_then_invalid_input() {
        assert!(Attach::from_mode("prepend", 1, None).is_err());
        assert_eq!(Attach::from_mode("append", 1, None).unwrap(), Attach::Append(1));
        assert_eq!(
            Attach::from_mode("insertBefore", 1, Some(2)).unwrap(),
            Attach::InsertBefore {
                parent: 1,
                reference: Some(2)
            }
        );
    }

    #[test]
    fn given_text_before_children_when_creating_then_both_kept() {
        let mut doc = Document::new();
        let created = build(
            &mut doc,
            json!({"p": {"text": "intro", "children": {"b": "bold"}}}),
            None,
        )
        .unwrap();
        let p = created.first().unwrap();
        assert_eq!(doc.children(p).len(), 2);
        assert_eq!(doc.text_content(p), "introbold");
    }

    #[test]
    fn given_children_before_text_when_creating_then_text_replaces_children() {
        let mut doc = Document::new();
        let created = build(
            &mut doc,
            json!({"p": {"children": {"b": "bold"}, "text": "intro"}}),
            None,
        )
        .unwrap();
        assert_eq!(doc.inner_html(created.first().unwrap()), "intro");
    }

    #[test]
    fn given_children_before_html_when_creating_then_markup_replaces_children() {
        let mut doc = Document::new();
        let created = build(
            &mut doc,
            json!({"div": {"children": {"span": "gone"}, "html": "<i>kept</i>", "id": "x"}}),
            None,
        )
        .unwrap();
        let div = created.first().unwrap();
        assert_eq!(doc.outer_html(div), r#"<div id="x"><i>kept</i></div>"#);
    }

    #[test]
    fn given_stale_reference_when_inserting_before_then_nothing_built() {
        let mut doc = Document::new();
        let body = doc.body();
        let gone = doc.create_element("p");
        doc.append_child(body, gone).unwrap();
        doc.destroy(gone).unwrap();
        let before = doc.len();

        let attach = Attach::InsertBefore {
            parent: body,
            reference: Some(gone),
        };
        let result = build(&mut doc, json!({"span": {"b": "x"}}), Some(attach));

        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
        assert_eq!(doc.len(), before);
    }

    #[test]
    fn given_multiple_entries_when_creating_then_many_in_order() {
        let mut doc = Document::new();
        let created = build(&mut doc, json!({"h1": "a", "#text": "b", "p": "c"}), None).unwrap();
        assert!(matches!(created, Created::Many(_)));
        let nodes = created.into_vec();
        assert_eq!(doc.tag_name(nodes[0]), Some("h1"));
        assert_eq!(doc.text(nodes[1]), Some("b"));
        assert_eq!(doc.tag_name(nodes[2]), Some("p"));
    }

    #[test]
    fn given_created_collection_when_indexing_then_matches_order() {
        let created = Created::from_vec(vec![3, 5, 7]);
        assert_eq!(created.get(1), Some(5));
        assert_eq!(created.get(3), None);
        assert_eq!(created.iter().copied().collect::<Vec<_>>(), vec![3, 5, 7]);
        assert_eq!(Created::from_vec(vec![9]), Created::One(9));
        assert_eq!(Created::<i32>::from_vec(vec![]), Created::Empty);
    }
}
