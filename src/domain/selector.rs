//! CSS selector subset used by `query`.
//!
//! Supports selector lists, type/universal/id/class/attribute simple
//! selectors, and the descendant and child combinators.

use std::sync::OnceLock;

use regex::Regex;

use crate::domain::error::{DomainError, DomainResult};

/// Read access to element data needed for matching.
pub trait SelectorTarget {
    type Node: Copy;

    /// Lower-cased tag name, `None` for non-element nodes.
    fn tag_name(&self, node: Self::Node) -> Option<&str>;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    /// Nearest ancestor that is an element.
    fn parent_element(&self, node: Self::Node) -> Option<Self::Node>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeCondition {
    Exists(String),
    Equals(String, String),
}

/// Simple selectors that all apply to one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compound {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeCondition>,
}

/// Compounds joined by combinators, stored right to left:
/// `steps[0]` is the subject, each following step is related to the previous
/// one by its combinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Complex {
    steps: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<Complex>,
}

fn simple_selector_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"^(?:(\*|[A-Za-z][A-Za-z0-9_-]*)|#([A-Za-z0-9_-]+)|\.([A-Za-z0-9_-]+)|\[\s*([A-Za-z_][A-Za-z0-9_:-]*)\s*(?:=\s*(?:"([^"]*)"|'([^']*)'|([^\]\s"']+))\s*)?\])"#,
        )
        .expect("simple selector pattern is valid")
    })
}

impl SelectorList {
    pub fn parse(input: &str) -> DomainResult<Self> {
        let invalid = || DomainError::InvalidSelector(input.to_string());
        let regex = simple_selector_regex();

        let mut selectors = Vec::new();
        let mut steps: Vec<(Combinator, Compound)> = Vec::new();
        let mut pending: Option<Combinator> = None;
        let mut rest = input.trim_start();

        loop {
            let trimmed = rest.trim_start();
            let had_space = trimmed.len() < rest.len();
            rest = trimmed;

            if rest.is_empty() || rest.starts_with(',') {
                if steps.is_empty() || pending.is_some() {
                    return Err(invalid());
                }
                steps.reverse();
                selectors.push(Complex {
                    steps: std::mem::take(&mut steps),
                });
                if rest.is_empty() {
                    break;
                }
                rest = &rest[1..];
                continue;
            }

            if let Some(after) = rest.strip_prefix('>') {
                if steps.is_empty() || pending.is_some() {
                    return Err(invalid());
                }
                pending = Some(Combinator::Child);
                rest = after;
                continue;
            }

            let combinator = match pending.take() {
                Some(c) => c,
                None if steps.is_empty() => Combinator::Descendant,
                None if had_space => Combinator::Descendant,
                None => return Err(invalid()),
            };

            let mut compound = Compound::default();
            let mut matched_any = false;
            while let Some(caps) = regex.captures(rest) {
                let whole = caps.get(0).map_or(0, |m| m.end());
                if let Some(tag) = caps.get(1) {
                    if matched_any {
                        return Err(invalid());
                    }
                    if tag.as_str() != "*" {
                        compound.tag = Some(tag.as_str().to_ascii_lowercase());
                    }
                } else if let Some(id) = caps.get(2) {
                    compound.id = Some(id.as_str().to_string());
                } else if let Some(class) = caps.get(3) {
                    compound.classes.push(class.as_str().to_string());
                } else if let Some(name) = caps.get(4) {
                    let name = name.as_str().to_ascii_lowercase();
                    let value = caps.get(5).or_else(|| caps.get(6)).or_else(|| caps.get(7));
                    compound.attributes.push(match value {
                        Some(v) => AttributeCondition::Equals(name, v.as_str().to_string()),
                        None => AttributeCondition::Exists(name),
                    });
                }
                matched_any = true;
                rest = &rest[whole..];
            }
            if !matched_any {
                return Err(invalid());
            }
            steps.push((combinator, compound));
        }

        Ok(Self { selectors })
    }

    pub fn matches<T: SelectorTarget>(&self, target: &T, node: T::Node) -> bool {
        self.selectors
            .iter()
            .any(|complex| complex.matches_from(target, node, 0))
    }
}

impl Complex {
    fn matches_from<T: SelectorTarget>(&self, target: &T, node: T::Node, step: usize) -> bool {
        let Some((_, compound)) = self.steps.get(step) else {
            return true;
        };
        if !compound.matches(target, node) {
            return false;
        }
        if step + 1 == self.steps.len() {
            return true;
        }
        // The combinator stored on the subject-side step relates it to the next one.
        let combinator = self.steps[step].0;
        match combinator {
            Combinator::Child => target
                .parent_element(node)
                .is_some_and(|parent| self.matches_from(target, parent, step + 1)),
            Combinator::Descendant => {
                let mut ancestor = target.parent_element(node);
                while let Some(current) = ancestor {
                    if self.matches_from(target, current, step + 1) {
                        return true;
                    }
                    ancestor = target.parent_element(current);
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches<T: SelectorTarget>(&self, target: &T, node: T::Node) -> bool {
        let Some(tag) = target.tag_name(node) else {
            return false;
        };
        if let Some(want) = &self.tag {
            if !tag.eq_ignore_ascii_case(want) {
                return false;
            }
        }
        if let Some(want) = &self.id {
            if target.attribute(node, "id") != Some(want.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_list = target.attribute(node, "class").unwrap_or_default();
            if !self
                .classes
                .iter()
                .all(|want| class_list.split_whitespace().any(|c| c == want))
            {
                return false;
            }
        }
        self.attributes.iter().all(|condition| match condition {
            AttributeCondition::Exists(name) => target.attribute(node, name).is_some(),
            AttributeCondition::Equals(name, value) => {
                target.attribute(node, name) == Some(value.as_str())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal tree: (tag, attributes, parent index)
    struct Fixture(Vec<(&'static str, Vec<(&'static str, &'static str)>, Option<usize>)>);

    impl SelectorTarget for Fixture {
        type Node = usize;

        fn tag_name(&self, node: usize) -> Option<&str> {
            Some(self.0[node].0)
        }

        fn attribute(&self, node: usize, name: &str) -> Option<&str> {
            self.0[node].1.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
        }

        fn parent_element(&self, node: usize) -> Option<usize> {
            self.0[node].2
        }
    }

    fn fixture() -> Fixture {
        Fixture(vec![
            ("body", vec![], None),
            ("div", vec![("id", "main"), ("class", "box wide")], Some(0)),
            ("p", vec![("class", "note")], Some(1)),
            ("a", vec![("href", "link")], Some(2)),
            ("a", vec![("href", "other")], Some(1)),
        ])
    }

    #[test]
    fn given_compound_selectors_when_matching_then_all_parts_apply() {
        let f = fixture();
        assert!(SelectorList::parse("div#main.box.wide").unwrap().matches(&f, 1));
        assert!(!SelectorList::parse("div.box.narrow").unwrap().matches(&f, 1));
        assert!(SelectorList::parse("a[href=\"link\"]").unwrap().matches(&f, 3));
        assert!(SelectorList::parse("a[href]").unwrap().matches(&f, 4));
        assert!(!SelectorList::parse("a[href=link]").unwrap().matches(&f, 4));
        assert!(SelectorList::parse("*").unwrap().matches(&f, 0));
    }

    #[test]
    fn given_combinators_when_matching_then_ancestry_respected() {
        let f = fixture();
        assert!(SelectorList::parse("#main a").unwrap().matches(&f, 3));
        assert!(SelectorList::parse("div > a").unwrap().matches(&f, 4));
        assert!(!SelectorList::parse("div > a").unwrap().matches(&f, 3));
        assert!(SelectorList::parse("body div>p  a").unwrap().matches(&f, 3));
    }

    #[test]
    fn given_selector_list_when_matching_then_any_applies() {
        let f = fixture();
        let list = SelectorList::parse("span, .note").unwrap();
        assert!(list.matches(&f, 2));
        assert!(!list.matches(&f, 1));
    }

    #[test]
    fn given_uppercase_tag_when_matching_then_case_insensitive() {
        let f = fixture();
        assert!(SelectorList::parse("DIV").unwrap().matches(&f, 1));
    }

    #[test]
    fn given_malformed_selectors_when_parsing_then_invalid_selector() {
        for input in ["", "div >", "> a", "a,,b", "div:hover", "a..b", "div#"] {
            assert!(
                matches!(SelectorList::parse(input), Err(DomainError::InvalidSelector(_))),
                "expected failure for {:?}",
                input
            );
        }
    }
}
