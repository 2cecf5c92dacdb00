//! CSS selector subset used for lookup and delegation
//!
//! Supported: `tag`, `*`, `#id`, `.class`, `[attr]`, `[attr=value]`,
//! compounds of those (`div.loader[data-loader]`), the descendant
//! combinator (whitespace) and comma-separated lists.

use super::NodeId;

/// Read access to one element's matchable data
pub trait Element {
    fn tag(&self) -> &str;
    fn id(&self) -> Option<&str>;
    fn has_class(&self, class: &str) -> bool;
    fn attribute(&self, name: &str) -> Option<&str>;
}

/// Tree shape needed to evaluate descendant combinators
pub trait Tree {
    fn element(&self, node: NodeId) -> Option<&dyn Element>;
    fn parent_of(&self, node: NodeId) -> Option<NodeId>;
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Compound {
    fn parse(input: &str) -> Option<Self> {
        let mut compound = Compound::default();

        let tag_end = input.find(is_delimiter).unwrap_or(input.len());
        let tag = &input[..tag_end];
        if !tag.is_empty() {
            if tag != "*" && !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                return None;
            }
            if tag != "*" {
                compound.tag = Some(tag.to_ascii_lowercase());
            }
        }

        let mut rest = &input[tag_end..];
        while let Some(first) = rest.chars().next() {
            match first {
                '#' | '.' => {
                    let body = &rest[1..];
                    let end = body.find(is_delimiter).unwrap_or(body.len());
                    let name = &body[..end];
                    if name.is_empty() {
                        return None;
                    }
                    if first == '#' {
                        compound.id = Some(name.to_string());
                    } else {
                        compound.classes.push(name.to_string());
                    }
                    rest = &body[end..];
                }
                '[' => {
                    let end = rest.find(']')?;
                    let inner = &rest[1..end];
                    let (name, value) = match inner.split_once('=') {
                        Some((name, value)) => (
                            name.trim(),
                            Some(value.trim().trim_matches(['"', '\'']).to_string()),
                        ),
                        None => (inner.trim(), None),
                    };
                    if name.is_empty() {
                        return None;
                    }
                    compound.attrs.push((name.to_string(), value));
                    rest = &rest[end + 1..];
                }
                _ => return None,
            }
        }

        Some(compound)
    }

    fn matches(&self, element: &dyn Element) -> bool {
        if let Some(tag) = &self.tag {
            if !element.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if element.id() != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.iter().all(|class| element.has_class(class)) {
            return false;
        }
        self.attrs.iter().all(|(name, expected)| {
            match (element.attribute(name), expected) {
                (Some(actual), Some(expected)) => actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
    }
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '#' | '.' | '[')
}

/// A parsed selector list (`a, b .c`)
#[derive(Debug, Clone, PartialEq)]
pub struct SelectorList {
    // Each entry is a descendant chain, outermost ancestor first
    chains: Vec<Vec<Compound>>,
}

impl SelectorList {
    /// Parse a selector; `None` for anything outside the supported subset
    pub fn parse(input: &str) -> Option<Self> {
        let mut chains = Vec::new();
        for part in input.split(',') {
            let chain = part
                .split_whitespace()
                .map(Compound::parse)
                .collect::<Option<Vec<_>>>()?;
            if chain.is_empty() {
                return None;
            }
            chains.push(chain);
        }
        Some(Self { chains })
    }

    pub fn matches(&self, tree: &dyn Tree, node: NodeId) -> bool {
        self.chains
            .iter()
            .any(|chain| Self::chain_matches(chain, tree, node))
    }

    fn chain_matches(chain: &[Compound], tree: &dyn Tree, node: NodeId) -> bool {
        let Some((last, ancestors)) = chain.split_last() else {
            return false;
        };
        let Some(element) = tree.element(node) else {
            return false;
        };
        if !last.matches(element) {
            return false;
        }

        // Descendant-only chains can be matched greedily from the inside out
        let mut cursor = tree.parent_of(node);
        for compound in ancestors.iter().rev() {
            loop {
                let Some(current) = cursor else {
                    return false;
                };
                cursor = tree.parent_of(current);
                if tree.element(current).is_some_and(|e| compound.matches(e)) {
                    break;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    struct Node {
        tag: &'static str,
        id: Option<&'static str>,
        classes: Vec<&'static str>,
        attrs: BTreeMap<&'static str, &'static str>,
        parent: Option<NodeId>,
    }

    impl Element for Node {
        fn tag(&self) -> &str {
            self.tag
        }
        fn id(&self) -> Option<&str> {
            self.id
        }
        fn has_class(&self, class: &str) -> bool {
            self.classes.contains(&class)
        }
        fn attribute(&self, name: &str) -> Option<&str> {
            self.attrs.get(name).copied()
        }
    }

    struct Nodes(Vec<Node>);

    impl Tree for Nodes {
        fn element(&self, node: NodeId) -> Option<&dyn Element> {
            self.0.get(node.0).map(|n| n as &dyn Element)
        }
        fn parent_of(&self, node: NodeId) -> Option<NodeId> {
            self.0.get(node.0).and_then(|n| n.parent)
        }
    }

    // body > div#menu.nav > ul > li.item[data-index=2]
    fn tree() -> Nodes {
        Nodes(vec![
            Node {
                tag: "body",
                id: None,
                classes: vec![],
                attrs: BTreeMap::new(),
                parent: None,
            },
            Node {
                tag: "div",
                id: Some("menu"),
                classes: vec!["nav"],
                attrs: BTreeMap::new(),
                parent: Some(NodeId(0)),
            },
            Node {
                tag: "ul",
                id: None,
                classes: vec![],
                attrs: BTreeMap::new(),
                parent: Some(NodeId(1)),
            },
            Node {
                tag: "li",
                id: None,
                classes: vec!["item"],
                attrs: BTreeMap::from([("data-index", "2")]),
                parent: Some(NodeId(2)),
            },
        ])
    }

    fn matches(selector: &str, node: usize) -> bool {
        SelectorList::parse(selector)
            .unwrap_or_else(|| panic!("selector should parse: {selector}"))
            .matches(&tree(), NodeId(node))
    }

    #[test]
    fn test_simple_selectors() {
        assert!(matches("li", 3));
        assert!(matches("LI", 3));
        assert!(matches("#menu", 1));
        assert!(matches(".item", 3));
        assert!(matches("*", 2));
        assert!(!matches(".nav", 3));
    }

    #[test]
    fn test_compound_and_attributes() {
        assert!(matches("div#menu.nav", 1));
        assert!(!matches("span#menu", 1));
        assert!(matches("li[data-index]", 3));
        assert!(matches("li[data-index=\"2\"]", 3));
        assert!(!matches("li[data-index=3]", 3));
    }

    #[test]
    fn test_descendant_combinator() {
        assert!(matches("#menu .item", 3));
        assert!(matches("body ul li", 3));
        assert!(!matches("ul #menu", 1));
    }

    #[test]
    fn test_selector_list() {
        assert!(matches("span, .item", 3));
        assert!(!matches("span, p", 3));
    }

    #[test]
    fn test_unsupported_syntax_is_rejected() {
        assert!(SelectorList::parse("").is_none());
        assert!(SelectorList::parse("ul > li").is_none());
        assert!(SelectorList::parse("li:hover").is_none());
        assert!(SelectorList::parse("a,").is_none());
        assert!(SelectorList::parse("[=x]").is_none());
    }
}
