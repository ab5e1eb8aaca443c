//! Tree builder behavior against the in-memory document.

use rstest::rstest;
use serde_json::{json, Map, Value};

use domkit::domain::{Attach, Created, Document, DomainError, Markers, NodeId, NodeTree, TreeBuilder};
use domkit::util::testing;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

fn create(
    doc: &mut Document,
    value: Value,
    attach: Option<Attach<NodeId>>,
) -> Result<Created<NodeId>, DomainError> {
    TreeBuilder::new().create(doc, Some(&value), attach)
}

/// `{key: value}` with a runtime key.
fn single(key: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    Value::Object(map)
}

#[test]
fn given_nested_descriptor_when_appended_to_empty_parent_then_one_node_per_level() {
    // Arrange
    let mut doc = Document::new();
    let parent = doc.create_element("section");
    let descriptor = json!({"div": {"p": {"id": "sandwich", "children": {
        "a": {"href": "link", "text": "Link", "children": {}}
    }}}});

    // Act
    let created = create(&mut doc, descriptor, Some(Attach::Append(parent))).unwrap();

    // Assert
    let div = created.first().unwrap();
    assert_eq!(doc.children(parent), &[div]);
    assert_eq!(doc.tag_name(div), Some("div"));

    let [p] = doc.children(div) else {
        panic!("div must have exactly one child");
    };
    assert_eq!(doc.tag_name(*p), Some("p"));
    assert_eq!(doc.attribute(*p, "id"), Some("sandwich"));

    let [a] = doc.children(*p) else {
        panic!("p must have exactly one child");
    };
    assert_eq!(doc.tag_name(*a), Some("a"));
    assert_eq!(doc.attribute(*a, "href"), Some("link"));
    assert_eq!(doc.text_content(*a), "Link");
    assert_eq!(doc.element_children(*a).len(), 0);
}

#[test]
fn given_numeric_keys_when_creating_then_ordered_pair_of_links() {
    // Arrange
    let mut doc = Document::new();
    let descriptor = json!({
        "0": {"tagname": "a", "href": "l1", "children": {}},
        "1": {"tagname": "a", "href": "l2", "children": {}}
    });

    // Act
    let created = create(&mut doc, descriptor, None).unwrap();

    // Assert
    assert_eq!(created.len(), 2);
    let hrefs: Vec<_> = created
        .iter()
        .map(|&a| {
            assert_eq!(doc.tag_name(a), Some("a"));
            doc.attribute(a, "href").unwrap().to_string()
        })
        .collect();
    assert_eq!(hrefs, vec!["l1", "l2"]);
}

#[rstest]
#[case("div")]
#[case("span")]
#[case("my-widget")]
fn given_empty_mapping_when_creating_then_single_empty_element(#[case] tag: &str) {
    let mut doc = Document::new();
    let created = create(&mut doc, single(tag, json!({})), None).unwrap();

    let node = created.first().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(doc.tag_name(node), Some(tag));
    assert!(doc.children(node).is_empty());
    assert_eq!(doc.text_content(node), "");
}

#[rstest]
#[case("hello")]
#[case("")]
#[case("a < b & c")]
#[case("  spaced  ")]
fn given_string_value_when_creating_then_text_content_matches(#[case] text: &str) {
    let mut doc = Document::new();
    let created = create(&mut doc, single("p", json!(text)), None).unwrap();
    assert_eq!(doc.text_content(created.first().unwrap()), text);
}

#[test]
fn given_children_mapping_when_creating_then_order_follows_mapping() {
    let mut doc = Document::new();
    let created = create(
        &mut doc,
        json!({"ul": {"class": "menu", "children": {"li": "first", "b": "second", "i": "third", "#text": "tail"}}}),
        None,
    )
    .unwrap();
    let ul = created.first().unwrap();
    let tags: Vec<_> = doc.element_children(ul).into_iter().filter_map(|c| doc.tag_name(c)).collect();
    assert_eq!(tags, vec!["li", "b", "i"]);
    assert_eq!(doc.text_content(ul), "firstsecondthirdtail");
}

#[rstest]
#[case(json!("div"), 1)]
#[case(json!({"a": "x", "b": "y"}), 2)]
#[case(json!([{"tagname": "li", "children": {}}, {"tagname": "li", "children": {}}, {"tagname": "li", "children": {}}]), 3)]
fn given_existing_children_when_appending_then_count_grows_by_created(
    #[case] descriptor: Value,
    #[case] expected: usize,
) {
    // Arrange
    let mut doc = Document::with_body_html("<header></header><footer></footer>");
    let body = doc.body();
    let before: Vec<_> = doc.children(body).to_vec();

    // Act
    let created = create(&mut doc, descriptor, Some(Attach::Append(body))).unwrap();

    // Assert
    assert_eq!(created.len(), expected);
    let after = doc.children(body);
    assert_eq!(after.len(), before.len() + expected);
    assert_eq!(&after[..before.len()], before.as_slice());
    assert_eq!(after[before.len()..].to_vec(), created.into_vec());
}

#[test]
fn given_reference_sibling_when_inserting_before_then_nodes_precede_it_in_order() {
    // Arrange
    let mut doc = Document::with_body_html("<h1></h1><footer></footer>");
    let body = doc.body();
    let footer = doc.child_element(body, 1).unwrap();
    let attach = Attach::from_mode("insert-before", body, Some(footer)).unwrap();

    // Act
    create(&mut doc, json!({"nav": {}, "main": {}}), Some(attach)).unwrap();

    // Assert
    let tags: Vec<_> = doc.element_children(body).into_iter().filter_map(|c| doc.tag_name(c)).collect();
    assert_eq!(tags, vec!["h1", "nav", "main", "footer"]);
}

#[rstest]
#[case(json!("div"))]
#[case(json!({"p": "text"}))]
#[case(json!("#text"))]
fn given_insert_before_without_reference_when_creating_then_invalid_input(#[case] descriptor: Value) {
    let mut doc = Document::new();
    let body = doc.body();
    let nodes_before = doc.len();
    let attach = Attach::from_mode("insert-before", body, None).unwrap();

    let result = create(&mut doc, descriptor, Some(attach));

    assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    assert_eq!(doc.len(), nodes_before);
    assert!(doc.children(body).is_empty());
}

#[test]
fn given_reference_of_other_parent_when_inserting_before_then_invalid_input() {
    let mut doc = Document::with_body_html("<div><p></p></div>");
    let body = doc.body();
    let p = doc.query(body, "p").unwrap().unwrap();
    let nodes_before = doc.len();
    let attach = Attach::InsertBefore {
        parent: body,
        reference: Some(p),
    };

    let result = create(&mut doc, json!({"span": {"b": "x"}}), Some(attach));

    assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    assert_eq!(doc.len(), nodes_before);
    assert_eq!(doc.outer_html(body), "<body><div><p></p></div></body>");
}

#[test]
fn given_destroyed_target_when_creating_then_invalid_input() {
    let mut doc = Document::new();
    let gone = doc.create_element("div");
    doc.destroy(gone).unwrap();
    let result = create(&mut doc, json!("p"), Some(Attach::Append(gone)));
    assert!(matches!(result, Err(DomainError::InvalidInput(_))));
}

#[test]
fn given_full_option_set_when_creating_then_applied_through_set() {
    let mut doc = Document::new();
    let created = create(
        &mut doc,
        json!({"button": {
            "type": "submit",
            "disabled": false,
            "style": ["color", "red"],
            "styles": {"margin": "0"},
            "events": {"click": "onSubmit"},
            "html": "<b>Go</b>",
            "children": {}
        }}),
        None,
    )
    .unwrap();
    let button = created.first().unwrap();
    assert_eq!(doc.attribute(button, "type"), Some("submit"));
    assert_eq!(doc.attribute(button, "disabled"), None);
    assert_eq!(doc.style(button, "color"), Some("red"));
    assert_eq!(doc.style(button, "margin"), Some("0"));
    assert_eq!(doc.fire(button, "click").unwrap(), vec!["onSubmit"]);
    assert_eq!(doc.inner_html(button), "<b>Go</b>");
}

#[test]
fn given_malformed_option_when_creating_then_invalid_input() {
    let mut doc = Document::new();
    let result = create(&mut doc, json!({"div": {"style": "color: red", "children": {}}}), None);
    assert!(matches!(result, Err(DomainError::InvalidInput(_))));
}

#[test]
fn given_unknown_keys_without_children_when_creating_then_nested_elements() {
    let mut doc = Document::new();
    let created = create(&mut doc, json!({"div": {"href": "x", "title": {}}}), None).unwrap();
    let div = created.first().unwrap();
    let tags: Vec<_> = doc.element_children(div).into_iter().filter_map(|c| doc.tag_name(c)).collect();
    assert_eq!(tags, vec!["href", "title"]);
    assert_eq!(doc.attribute(div, "href"), None);
}

#[test]
fn given_custom_markers_when_creating_then_markers_respected() {
    let markers = Markers {
        text: "$text".into(),
        children: "$kids".into(),
        tagname: "$tag".into(),
    };
    let builder = TreeBuilder::with_markers(markers);
    let mut doc = Document::new();
    let created = builder
        .create(
            &mut doc,
            Some(&json!({"p": {"class": "x", "$kids": [
                {"$tag": "$text", "text": "hi "},
                {"$tag": "em", "$kids": {"$text": "there"}}
            ]}})),
            None,
        )
        .unwrap();
    let p = created.first().unwrap();
    assert_eq!(doc.attribute(p, "class"), Some("x"));
    assert_eq!(doc.inner_html(p), "hi <em>there</em>");
}

#[test]
fn given_children_listed_before_text_when_creating_then_text_wins() {
    // Arrange
    let mut doc = Document::new();
    let body = doc.body();

    // Act
    let created = create(
        &mut doc,
        json!({"p": {"children": {"b": "bold"}, "text": "intro"}}),
        Some(Attach::Append(body)),
    )
    .unwrap();

    // Assert
    let p = created.first().unwrap();
    assert_eq!(doc.inner_html(p), "intro");
    assert!(doc.element_children(p).is_empty());
    assert_eq!(doc.text_children(p).len(), 1);
}

#[rstest]
#[case(json!({"x><script": "alert(1)"}))]
#[case(json!("img src=x onerror=y"))]
#[case(json!({"0": {"tagname": "a href=x", "children": {}}}))]
#[case(json!({"div": {"children": {"</div><b": {}}}}))]
fn given_markup_in_tag_name_when_creating_then_invalid_input_and_nothing_attached(#[case] descriptor: Value) {
    let mut doc = Document::new();
    let body = doc.body();
    let nodes_before = doc.len();

    let result = create(&mut doc, descriptor, Some(Attach::Append(body)));

    assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    assert_eq!(doc.len(), nodes_before);
    assert_eq!(doc.outer_html(body), "<body></body>");
}

#[test]
fn given_document_shortcut_when_creating_then_appends_to_parent() {
    let mut doc = Document::new();
    let body = doc.body();
    let created = doc.create(body, &json!({"p": "one", "hr": {}})).unwrap();
    assert!(matches!(created, Created::Many(_)));
    assert_eq!(doc.inner_html(body), "<p>one</p><hr>");
}
