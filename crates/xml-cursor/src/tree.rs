//! Materialized views of a subtree.
//!
//! A cursor hands out subtrees as flat node lists (start tag, descendants,
//! end tag). This module turns such a list into markup, text content, an
//! owned [`XmlElement`] tree, or a node in a `Xot` arena.

use xot::Xot;

use crate::node::{Node, NodeKind, split_name};
use crate::writer::NodeWriter;
use crate::{Error, Result};

/// An owned element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// The local name of the element (without namespace prefix).
    pub name: String,

    /// Namespace prefix, if any.
    pub prefix: Option<String>,

    pub attributes: Vec<XmlAttribute>,

    pub children: XmlChildren,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: String,
    pub prefix: Option<String>,
    pub value: String,
}

/// Children of an element.
///
/// Whitespace-only text between child elements is dropped; CDATA sections
/// count as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlChildren {
    Elements(Vec<XmlElement>),
    Text(String),
    Mixed(Vec<XmlChild>),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlChild {
    Element(XmlElement),
    Text(String),
}

struct BuildNode {
    name: String,
    prefix: Option<String>,
    attributes: Vec<XmlAttribute>,
    children: Vec<XmlChild>,
}

impl BuildNode {
    fn from_node(node: &Node) -> Self {
        let (prefix, local) = split_name(&node.name);
        let attributes = node
            .attributes
            .iter()
            .map(|attr| XmlAttribute {
                name: attr.local_name().to_string(),
                prefix: attr.prefix().map(str::to_string),
                value: attr.value.clone(),
            })
            .collect();
        Self {
            name: local.to_string(),
            prefix: prefix.map(str::to_string),
            attributes,
            children: Vec::new(),
        }
    }

    fn finish(self) -> XmlElement {
        XmlElement {
            name: self.name,
            prefix: self.prefix,
            attributes: self.attributes,
            children: finalize_children(self.children),
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(XmlChild::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(XmlChild::Text(text.to_string()));
        }
    }
}

fn finalize_children(children: Vec<XmlChild>) -> XmlChildren {
    let has_elements = children.iter().any(|c| matches!(c, XmlChild::Element(_)));
    let children: Vec<XmlChild> = if has_elements {
        children
            .into_iter()
            .filter(|c| !matches!(c, XmlChild::Text(text) if text.trim().is_empty()))
            .collect()
    } else {
        children
    };

    if children.is_empty() {
        return XmlChildren::Empty;
    }
    if children.iter().all(|c| matches!(c, XmlChild::Element(_))) {
        let elements = children
            .into_iter()
            .filter_map(|c| match c {
                XmlChild::Element(e) => Some(e),
                XmlChild::Text(_) => None,
            })
            .collect();
        return XmlChildren::Elements(elements);
    }
    if let [XmlChild::Text(text)] = children.as_slice() {
        return XmlChildren::Text(text.clone());
    }
    XmlChildren::Mixed(children)
}

impl XmlAttribute {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        let (prefix, local) = split_name(name);
        Self {
            name: local.to_string(),
            prefix: prefix.map(str::to_string),
            value: value.into(),
        }
    }

    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl XmlElement {
    /// An element without attributes or children. `name` may be prefixed.
    pub fn new(name: &str) -> Self {
        let (prefix, local) = split_name(name);
        Self {
            name: local.to_string(),
            prefix: prefix.map(str::to_string),
            attributes: Vec::new(),
            children: XmlChildren::Empty,
        }
    }

    /// An element holding only `text`.
    pub fn with_text(name: &str, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut element = Self::new(name);
        if !text.is_empty() {
            element.children = XmlChildren::Text(text);
        }
        element
    }

    /// Children in document order, text included.
    pub fn child_nodes(&self) -> Vec<XmlChild> {
        match &self.children {
            XmlChildren::Empty => Vec::new(),
            XmlChildren::Text(text) => vec![XmlChild::Text(text.clone())],
            XmlChildren::Elements(elements) => {
                elements.iter().cloned().map(XmlChild::Element).collect()
            }
            XmlChildren::Mixed(children) => children.clone(),
        }
    }

    /// Insert `child` before the child node at `index`, or append when
    /// `index` is past the end.
    pub fn insert_child(&mut self, index: usize, child: XmlElement) {
        let mut children = self.child_nodes();
        children.insert(index.min(children.len()), XmlChild::Element(child));
        self.children = finalize_children(children);
    }

    /// Build a tree from a subtree node list whose first node is an element.
    pub fn from_nodes(nodes: &[Node]) -> Result<Self> {
        let Some(first) = nodes.first() else {
            return Err(Error::Expansion {
                name: NodeKind::None.name().to_string(),
                message: "no current node".to_string(),
            });
        };
        if first.kind != NodeKind::Element {
            return Err(Error::UnsupportedNodeKind {
                kind: first.kind,
                context: "only elements can be expanded".to_string(),
            });
        }

        let mut stack: Vec<BuildNode> = Vec::new();
        let mut root = None;
        let mut attach = |stack: &mut Vec<BuildNode>, element: XmlElement| match stack.last_mut() {
            Some(parent) => parent.children.push(XmlChild::Element(element)),
            None => root = Some(element),
        };

        for node in nodes {
            match node.kind {
                NodeKind::Element if node.is_empty_element => {
                    attach(&mut stack, BuildNode::from_node(node).finish());
                }
                NodeKind::Element => stack.push(BuildNode::from_node(node)),
                NodeKind::EndElement => {
                    let Some(open) = stack.pop() else {
                        return Err(Error::Expansion {
                            name: first.name.clone(),
                            message: format!("unbalanced end tag </{}>", node.name),
                        });
                    };
                    attach(&mut stack, open.finish());
                }
                kind if kind.is_text_like() => {
                    if let Some(parent) = stack.last_mut() {
                        parent.push_text(&node.value);
                    }
                }
                NodeKind::Comment | NodeKind::ProcessingInstruction => {}
                kind => {
                    return Err(Error::UnsupportedNodeKind {
                        kind,
                        context: "unexpected inside an element".to_string(),
                    });
                }
            }
        }

        if !stack.is_empty() {
            return Err(Error::Expansion {
                name: first.name.clone(),
                message: "subtree ended before the closing tag".to_string(),
            });
        }
        root.ok_or_else(|| Error::Expansion {
            name: first.name.clone(),
            message: "subtree produced no element".to_string(),
        })
    }

    /// Qualified name, `prefix:name` when prefixed.
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.name),
            None => self.name.clone(),
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn has_elements(&self) -> bool {
        matches!(&self.children, XmlChildren::Elements(e) if !e.is_empty())
    }

    pub fn has_text(&self) -> bool {
        matches!(&self.children, XmlChildren::Text(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(&self.children, XmlChildren::Empty)
    }

    /// Text content, if this element contains only text.
    pub fn text(&self) -> Option<&str> {
        match &self.children {
            XmlChildren::Text(content) => Some(content),
            _ => None,
        }
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        match &self.children {
            XmlChildren::Empty => String::new(),
            XmlChildren::Text(text) => text.clone(),
            XmlChildren::Elements(elements) => {
                elements.iter().map(XmlElement::text_content).collect()
            }
            XmlChildren::Mixed(children) => children
                .iter()
                .map(|child| match child {
                    XmlChild::Element(e) => e.text_content(),
                    XmlChild::Text(text) => text.clone(),
                })
                .collect(),
        }
    }

    /// Child elements with the given local name.
    pub fn get_children(&self, name: &str) -> Vec<&XmlElement> {
        self.all_children()
            .into_iter()
            .filter(|e| e.name == name)
            .collect()
    }

    /// All child elements, ignoring text in mixed content.
    pub fn all_children(&self) -> Vec<&XmlElement> {
        match &self.children {
            XmlChildren::Elements(elements) => elements.iter().collect(),
            XmlChildren::Mixed(children) => children
                .iter()
                .filter_map(|c| match c {
                    XmlChild::Element(e) => Some(e),
                    XmlChild::Text(_) => None,
                })
                .collect(),
            _ => vec![],
        }
    }
}

/// Markup of the whole subtree.
pub fn outer_xml(nodes: &[Node]) -> Result<String> {
    serialize(nodes)
}

/// Markup between the start and end tag; empty for anything that is not an
/// element with content.
pub fn inner_xml(nodes: &[Node]) -> Result<String> {
    match nodes {
        [first, inner @ .., last]
            if first.kind == NodeKind::Element && last.kind == NodeKind::EndElement =>
        {
            serialize(inner)
        }
        _ => Ok(String::new()),
    }
}

/// Concatenated character data of the subtree.
pub fn text_content(nodes: &[Node]) -> String {
    nodes
        .iter()
        .filter(|node| node.kind.is_text_like())
        .map(|node| node.value.as_str())
        .collect()
}

/// Parse the subtree into `xot` and return its element node.
pub fn expand_into(xot: &mut Xot, nodes: &[Node]) -> Result<xot::Node> {
    let markup = outer_xml(nodes)?;
    let document = xot.parse(&markup).map_err(|err| Error::Expansion {
        name: nodes.first().map(|n| n.name.clone()).unwrap_or_default(),
        message: err.to_string(),
    })?;
    xot.document_element(document).map_err(|err| Error::Expansion {
        name: nodes.first().map(|n| n.name.clone()).unwrap_or_default(),
        message: err.to_string(),
    })
}

fn serialize(nodes: &[Node]) -> Result<String> {
    let mut writer = NodeWriter::new(Vec::new());
    for node in nodes {
        writer.write_node(node)?;
    }
    String::from_utf8(writer.into_inner()).map_err(|err| Error::Xml {
        message: format!("Serialized markup is not UTF-8: {err}"),
        position: None,
    })
}
