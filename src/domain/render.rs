//! Serialization of document nodes: HTML, text content and tree display.

use itertools::Itertools;
use termtree::Tree;
use tracing::instrument;

use crate::domain::document::{Document, ElementData, NodeId, NodeKind};
use crate::domain::html::{escape_attribute, escape_text, is_void};

impl Document {
    /// Markup of `id` including the node itself. Empty for a stale handle.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    /// Markup of the children of `id`.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for &child in self.children(id) {
            self.write_html(child, &mut out);
        }
        out
    }

    /// Concatenated content of all text nodes at or below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(content) = self.text(id) {
            return content.to_string();
        }
        self.descendants(id)
            .filter_map(|node| self.text(node))
            .collect()
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.get_node(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(content) => out.push_str(&escape_text(content)),
            NodeKind::Element(data) => {
                out.push_str(&open_tag(data));
                if is_void(&data.tag) {
                    return;
                }
                for &child in &node.children {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(&data.tag);
                out.push('>');
            }
        }
    }
}

/// `<tag a="b" style="...">`, attributes in insertion order.
fn open_tag(data: &ElementData) -> String {
    let style = data.style_text();
    let attributes = data
        .attributes
        .iter()
        .map(|(name, value)| (name.as_str(), value.as_str()))
        .chain((!style.is_empty()).then_some(("style", style.as_str())))
        .map(|(name, value)| format!(" {}=\"{}\"", name, escape_attribute(value)))
        .join("");
    format!("<{}{}>", data.tag, attributes)
}

fn label(document: &Document, id: NodeId) -> String {
    match document.get_node(id).map(|node| &node.kind) {
        Some(NodeKind::Element(data)) => {
            let mut label = open_tag(data);
            if !data.listeners.is_empty() {
                let events = data.listeners.iter().map(|b| b.event.as_str()).unique().join(",");
                label.push_str(&format!(" on:{}", events));
            }
            label
        }
        Some(NodeKind::Text(content)) => format!("{:?}", content),
        None => format!("<stale {}>", id),
    }
}

/// Termtree view of a node hierarchy.
pub trait TreeNodeConvert {
    fn to_tree_string(&self, node: NodeId) -> Tree<String>;
}

impl TreeNodeConvert for Document {
    #[instrument(level = "trace", skip(self))]
    fn to_tree_string(&self, node: NodeId) -> Tree<String> {
        let leaves: Vec<_> = self
            .children(node)
            .iter()
            .map(|&child| self.to_tree_string(child))
            .collect();
        Tree::new(label(self, node)).with_leaves(leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tree::{EventBinding, NodeTree};
    use serde_json::json;

    #[test]
    fn given_built_nodes_when_serializing_then_html_matches() {
        let mut doc = Document::new();
        let body = doc.body();
        doc.create(
            body,
            &json!({"div": {"class": "c", "styles": {"color": "red"}, "children": {
                "br": {},
                "#text": "a < b & c",
                "a": {"href": "x\"y", "text": "go", "children": {}}
            }}}),
        )
        .unwrap();
        assert_eq!(
            doc.inner_html(body),
            r#"<div class="c" style="color: red"><br>a &lt; b &amp; c<a href="x&quot;y">go</a></div>"#
        );
    }

    #[test]
    fn given_nested_text_when_reading_text_content_then_concatenated_in_order() {
        let doc = Document::with_body_html("<p>one <b>two</b> three</p>");
        assert_eq!(doc.text_content(doc.body()), "one two three");
    }

    #[test]
    fn given_parsed_markup_when_serialized_then_round_trips() {
        let markup = r#"<ul id="l"><li>a</li><li><img src="x.png"></li></ul>"#;
        let doc = Document::with_body_html(markup);
        assert_eq!(doc.inner_html(doc.body()), markup);
        let ul = doc.child_element(doc.body(), 0).unwrap();
        assert_eq!(doc.outer_html(ul), markup);
    }

    #[test]
    fn given_subtree_when_rendering_tree_then_labels_nested() {
        let mut doc = Document::new();
        let div = doc.create_element("div");
        let text = doc.create_text("hi");
        doc.append_child(div, text).unwrap();
        doc.add_event(div, EventBinding::new("click", false, "go")).unwrap();

        let rendered = doc.to_tree_string(div).to_string();
        let lines: Vec<_> = rendered.lines().collect();
        assert_eq!(lines[0], "<div> on:click");
        assert!(lines[1].ends_with("\"hi\""));
    }
}
