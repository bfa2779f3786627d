//! Ancestor tracking for cursor positions.
//!
//! The base cursor feeds every node it lands on into an [`ElementStack`], so
//! the stack always holds the open element chain of the current position no
//! matter which wrapper is driving the traversal.

use crate::markup;
use crate::node::{Attribute, Node, NodeKind};
use crate::{Error, Result};

/// Name and attributes of an open element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    name: String,
    attributes: Vec<Attribute>,
}

impl ElementSnapshot {
    pub fn from_node(node: &Node) -> Result<Self> {
        if node.kind != NodeKind::Element {
            return Err(Error::InvalidOperation(format!(
                "cannot snapshot {} as an element",
                node.kind
            )));
        }
        Ok(Self {
            name: node.name.clone(),
            attributes: node.attributes.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn start_tag(&self, self_closing: bool) -> String {
        markup::start_tag(&self.name, &self.attributes, self_closing)
    }

    pub fn end_tag(&self) -> String {
        markup::end_tag(&self.name)
    }

    /// This element's markup around `inner`.
    pub fn wrap(&self, inner: &str) -> String {
        markup::wrap(&self.name, &self.attributes, inner)
    }
}

/// Open elements from the document element down to the current position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementStack {
    slots: Vec<ElementSnapshot>,
}

impl ElementStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the stack for a node the cursor just landed on.
    ///
    /// An element at depth d replaces slot d and drops everything deeper. An
    /// end tag at depth d keeps its own element in slot d. Any other node at
    /// depth d drops slot d and below it.
    pub fn observe(&mut self, node: &Node) {
        match node.kind {
            NodeKind::Element => {
                self.slots.truncate(node.depth);
                self.slots.push(ElementSnapshot {
                    name: node.name.clone(),
                    attributes: node.attributes.clone(),
                });
            }
            NodeKind::EndElement => self.slots.truncate(node.depth + 1),
            _ => self.slots.truncate(node.depth),
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, depth: usize) -> Option<&ElementSnapshot> {
        self.slots.get(depth)
    }

    /// Innermost open element.
    pub fn current(&self) -> Option<&ElementSnapshot> {
        self.slots.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementSnapshot> {
        self.slots.iter()
    }

    /// Slash-separated element names, e.g. `/root/user/post`.
    pub fn path(&self) -> String {
        let names: Vec<&str> = self.slots.iter().map(ElementSnapshot::name).collect();
        format!("/{}", names.join("/"))
    }

    /// Skeleton document of the ancestor chain wrapped around `inner`.
    ///
    /// The innermost element self-closes when `inner` is empty.
    pub fn tree(&self, inner: &str) -> String {
        self.slots
            .iter()
            .rev()
            .fold(inner.to_string(), |acc, element| element.wrap(&acc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(name: &str, depth: usize) -> Node {
        Node::element(name, depth, vec![], false)
    }

    #[test]
    fn test_snapshot_rejects_non_elements() {
        let text = Node::character_data(NodeKind::Text, "x", 1);
        assert!(matches!(
            ElementSnapshot::from_node(&text),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_observe_builds_path() {
        let mut stack = ElementStack::new();
        stack.observe(&element("root", 0));
        stack.observe(&element("user", 1));
        stack.observe(&element("post", 2));
        assert_eq!(stack.path(), "/root/user/post");

        stack.observe(&Node::end_element("post", 2));
        assert_eq!(stack.path(), "/root/user/post");

        stack.observe(&Node::character_data(NodeKind::Whitespace, "\n", 2));
        assert_eq!(stack.path(), "/root/user");

        stack.observe(&element("user", 1));
        assert_eq!(stack.path(), "/root/user");
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_empty_stack_path() {
        assert_eq!(ElementStack::new().path(), "/");
    }

    #[test]
    fn test_tree_wraps_ancestors() {
        let mut stack = ElementStack::new();
        stack.observe(&element("root", 0));
        stack.observe(&Node::element(
            "user",
            1,
            vec![Attribute::new("id", "1")],
            false,
        ));
        insta::assert_snapshot!(stack.tree(""), @r#"
        <root>
          <user id="1"/>
        </root>
        "#);
    }

    #[test]
    fn test_tree_attribute_escapes_survive_reparse() {
        let mut stack = ElementStack::new();
        stack.observe(&Node::element(
            "a",
            0,
            vec![Attribute::new("v", "x\r\ny\tz")],
            false,
        ));
        let tree = stack.tree("");
        assert_eq!(tree, r#"<a v="x&#13;&#10;y&#9;z"/>"#);

        let mut reader = quick_xml::Reader::from_str(&tree);
        let event = reader.read_event().unwrap();
        let quick_xml::events::Event::Empty(start) = event else {
            panic!("expected an empty element, got {event:?}");
        };
        let attr = start.attributes().next().unwrap().unwrap();
        assert_eq!(attr.unescape_value().unwrap(), "x\r\ny\tz");
    }
}
