//! The node model exposed at every cursor position.
//!
//! A [`Node`] is an owned snapshot of the tokenizer's current position. Node
//! kinds carry the numeric codes used by libxml2's text reader so that dumps
//! and diagnostics line up with other reader implementations.

use std::fmt;

/// Kind of node the tokenizer is positioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    None = 0,
    Element = 1,
    Attribute = 2,
    Text = 3,
    CData = 4,
    EntityReference = 5,
    Entity = 6,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
    DocumentFragment = 11,
    Notation = 12,
    Whitespace = 13,
    SignificantWhitespace = 14,
    EndElement = 15,
    EndEntity = 16,
    XmlDeclaration = 17,
}

impl NodeKind {
    pub const ALL: [NodeKind; 18] = [
        NodeKind::None,
        NodeKind::Element,
        NodeKind::Attribute,
        NodeKind::Text,
        NodeKind::CData,
        NodeKind::EntityReference,
        NodeKind::Entity,
        NodeKind::ProcessingInstruction,
        NodeKind::Comment,
        NodeKind::Document,
        NodeKind::DocumentType,
        NodeKind::DocumentFragment,
        NodeKind::Notation,
        NodeKind::Whitespace,
        NodeKind::SignificantWhitespace,
        NodeKind::EndElement,
        NodeKind::EndEntity,
        NodeKind::XmlDeclaration,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// Upper-case symbolic name, e.g. `END_ELEMENT`.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::None => "NONE",
            NodeKind::Element => "ELEMENT",
            NodeKind::Attribute => "ATTRIBUTE",
            NodeKind::Text => "TEXT",
            NodeKind::CData => "CDATA",
            NodeKind::EntityReference => "ENTITY_REF",
            NodeKind::Entity => "ENTITY",
            NodeKind::ProcessingInstruction => "PI",
            NodeKind::Comment => "COMMENT",
            NodeKind::Document => "DOC",
            NodeKind::DocumentType => "DOC_TYPE",
            NodeKind::DocumentFragment => "DOC_FRAGMENT",
            NodeKind::Notation => "NOTATION",
            NodeKind::Whitespace => "WHITESPACE",
            NodeKind::SignificantWhitespace => "SIGNIFICANT_WHITESPACE",
            NodeKind::EndElement => "END_ELEMENT",
            NodeKind::EndEntity => "END_ENTITY",
            NodeKind::XmlDeclaration => "XML_DECLARATION",
        }
    }

    /// Parse a symbolic name as produced by [`NodeKind::name`], ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    /// Kinds whose value is character data.
    pub fn is_text_like(self) -> bool {
        matches!(
            self,
            NodeKind::Text
                | NodeKind::CData
                | NodeKind::Whitespace
                | NodeKind::SignificantWhitespace
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(#{}) {}", self.code(), self.name())
    }
}

/// An attribute on an element node, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn local_name(&self) -> &str {
        split_name(&self.name).1
    }

    pub fn prefix(&self) -> Option<&str> {
        split_name(&self.name).0
    }
}

/// Snapshot of the node at a cursor position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    /// Qualified name. Character data uses the DOM pseudo-names (`#text`,
    /// `#cdata-section`, `#comment`).
    pub name: String,
    pub local_name: String,
    pub prefix: Option<String>,
    /// Nesting depth; the document element is at depth 0.
    pub depth: usize,
    pub is_empty_element: bool,
    pub value: String,
    pub attributes: Vec<Attribute>,
}

impl Node {
    pub fn new(kind: NodeKind, name: impl Into<String>, depth: usize) -> Self {
        let name = name.into();
        let (prefix, local_name) = split_name(&name);
        Self {
            kind,
            prefix: prefix.map(str::to_string),
            local_name: local_name.to_string(),
            name,
            depth,
            is_empty_element: false,
            value: String::new(),
            attributes: Vec::new(),
        }
    }

    pub fn element(
        name: impl Into<String>,
        depth: usize,
        attributes: Vec<Attribute>,
        is_empty_element: bool,
    ) -> Self {
        Self {
            attributes,
            is_empty_element,
            ..Self::new(NodeKind::Element, name, depth)
        }
    }

    pub fn end_element(name: impl Into<String>, depth: usize) -> Self {
        Self::new(NodeKind::EndElement, name, depth)
    }

    /// Character data node; the name is derived from the kind.
    pub fn character_data(kind: NodeKind, value: impl Into<String>, depth: usize) -> Self {
        let name = match kind {
            NodeKind::CData => "#cdata-section",
            NodeKind::Comment => "#comment",
            _ => "#text",
        };
        Self {
            value: value.into(),
            ..Self::new(kind, name, depth)
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    pub fn is_end_element(&self) -> bool {
        self.kind == NodeKind::EndElement
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Value of the attribute with this qualified name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    pub fn attribute_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.attribute(name).unwrap_or(default)
    }

    pub fn attribute_at(&self, index: usize) -> Option<&Attribute> {
        self.attributes.get(index)
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|attr| attr.name.as_str())
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }

    /// One-line debugging label, e.g. `(#1) ELEMENT <item> (isEmptyElement: No)`.
    pub fn dump_label(&self) -> String {
        let mut label = self.kind.to_string();
        match self.kind {
            NodeKind::Element => {
                let empty = if self.is_empty_element { "Yes" } else { "No" };
                label.push_str(&format!(" <{}> (isEmptyElement: {empty})", self.name));
            }
            NodeKind::EndElement => label.push_str(&format!(" </{}>", self.name)),
            NodeKind::ProcessingInstruction => {
                label.push_str(&format!(" {} {:?}", self.name, self.value));
            }
            NodeKind::DocumentType => label.push_str(&format!(" {}", self.name)),
            kind if kind.is_text_like() || kind == NodeKind::Comment => {
                label.push_str(&format!(" {:?}", self.value));
            }
            _ => {}
        }
        label
    }
}

/// Split `prefix:local` into its parts.
pub fn split_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}
