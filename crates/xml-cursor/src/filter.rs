//! Predicate-based filtering of cursor positions.

use regex::Regex;

use crate::cursor::Cursor;
use crate::node::{Node, NodeKind};
use crate::path::ElementStack;
use crate::{Error, Result};

/// Decides whether a position is exposed by a [`FilterCursor`].
///
/// `elements` is the ancestor chain of the position, which includes `node`
/// itself when it is an element.
pub trait Predicate {
    fn accept(&self, node: &Node, elements: &ElementStack) -> Result<bool>;
}

impl<F> Predicate for F
where
    F: Fn(&Node) -> bool,
{
    fn accept(&self, node: &Node, _elements: &ElementStack) -> Result<bool> {
        Ok(self(node))
    }
}

/// Exposes the positions of `inner` accepted by a predicate.
///
/// Keys are passed through from the inner cursor, so they may have gaps.
pub struct FilterCursor<C, P> {
    inner: C,
    predicate: P,
    did_rewind: bool,
    accepted: bool,
}

impl<C: Cursor, P: Predicate> FilterCursor<C, P> {
    pub fn new(inner: C, predicate: P) -> Self {
        Self {
            inner,
            predicate,
            did_rewind: false,
            accepted: false,
        }
    }

    pub fn predicate(&self) -> &P {
        &self.predicate
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Advance the inner cursor until the predicate accepts, current
    /// position included.
    fn fetch(&mut self) -> Result<bool> {
        loop {
            let accepted = match self.inner.node() {
                Some(node) => self.predicate.accept(node, self.inner.elements())?,
                None => {
                    self.accepted = false;
                    return Ok(false);
                }
            };
            if accepted {
                self.accepted = true;
                return Ok(true);
            }
            if !self.inner.advance()? {
                self.accepted = false;
                return Ok(false);
            }
        }
    }
}

impl<C: Cursor, P: Predicate> Cursor for FilterCursor<C, P> {
    fn advance(&mut self) -> Result<bool> {
        if !self.did_rewind {
            self.rewind()?;
            return Ok(self.valid());
        }
        if !self.inner.advance()? {
            self.accepted = false;
            return Ok(false);
        }
        self.fetch()
    }

    fn advance_node(&mut self) -> Result<bool> {
        self.accepted = false;
        self.inner.advance_node()
    }

    fn rewind(&mut self) -> Result<()> {
        self.inner.rewind()?;
        self.did_rewind = true;
        self.fetch()?;
        Ok(())
    }

    fn valid(&self) -> bool {
        self.did_rewind && self.accepted && self.inner.valid()
    }

    fn node(&self) -> Option<&Node> {
        if self.valid() { self.inner.node() } else { None }
    }

    fn position(&self) -> Option<&Node> {
        self.inner.position()
    }

    fn key(&self) -> Option<usize> {
        if self.valid() { self.inner.key() } else { None }
    }

    fn skip_next_advance(&mut self) {
        self.inner.skip_next_advance();
    }

    fn elements(&self) -> &ElementStack {
        self.inner.elements()
    }

    fn subtree(&mut self) -> Result<Vec<Node>> {
        self.inner.subtree()
    }

    fn current(&mut self) -> Result<Option<&Node>> {
        if !self.did_rewind {
            self.rewind()?;
        }
        Ok(Self::node(self))
    }
}

/// Accepts nodes whose kind is in a set, or not in it when inverted.
#[derive(Debug, Clone)]
pub struct NodeKindFilter {
    kinds: Vec<NodeKind>,
    invert: bool,
}

impl NodeKindFilter {
    pub fn new(kinds: &[NodeKind]) -> Self {
        Self {
            kinds: kinds.to_vec(),
            invert: false,
        }
    }

    pub fn excluding(kinds: &[NodeKind]) -> Self {
        Self {
            kinds: kinds.to_vec(),
            invert: true,
        }
    }
}

impl Predicate for NodeKindFilter {
    fn accept(&self, node: &Node, _elements: &ElementStack) -> Result<bool> {
        Ok(self.kinds.contains(&node.kind) != self.invert)
    }
}

/// Which attributes an attribute predicate looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeSelector {
    Named(String),
    /// Every attribute of the node (`"*"`).
    Any,
}

impl AttributeSelector {
    pub fn parse(name: &str) -> Self {
        if name == "*" {
            AttributeSelector::Any
        } else {
            AttributeSelector::Named(name.to_string())
        }
    }

    /// Values of the selected attributes on `node`.
    pub fn values<'n>(&self, node: &'n Node) -> Vec<&'n str> {
        match self {
            AttributeSelector::Any => node.attributes.iter().map(|a| a.value.as_str()).collect(),
            AttributeSelector::Named(name) => node.attribute(name).into_iter().collect(),
        }
    }
}

/// Accepts nodes where a selected attribute equals one of the given values.
///
/// Inversion negates the whole result, so an inverted filter also accepts
/// nodes that lack the attribute.
#[derive(Debug, Clone)]
pub struct AttributeFilter {
    attribute: AttributeSelector,
    values: Vec<String>,
    invert: bool,
}

impl AttributeFilter {
    pub fn new(attribute: &str, values: &[&str]) -> Self {
        Self {
            attribute: AttributeSelector::parse(attribute),
            values: values.iter().map(|v| v.to_string()).collect(),
            invert: false,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.invert = !self.invert;
        self
    }
}

impl Predicate for AttributeFilter {
    fn accept(&self, node: &Node, _elements: &ElementStack) -> Result<bool> {
        let found = self
            .attribute
            .values(node)
            .into_iter()
            .any(|value| self.values.iter().any(|wanted| wanted == value));
        Ok(found != self.invert)
    }
}

/// Accepts nodes where a selected attribute matches a regular expression.
///
/// When inverted, a node is accepted if any selected value does not match.
#[derive(Debug, Clone)]
pub struct AttributePattern {
    attribute: AttributeSelector,
    pattern: Regex,
    invert: bool,
}

impl AttributePattern {
    pub fn new(attribute: &str, pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|err| Error::InvalidArgument(format!("Invalid pattern '{pattern}': {err}")))?;
        Ok(Self {
            attribute: AttributeSelector::parse(attribute),
            pattern,
            invert: false,
        })
    }

    pub fn inverted(mut self) -> Self {
        self.invert = !self.invert;
        self
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl Predicate for AttributePattern {
    fn accept(&self, node: &Node, _elements: &ElementStack) -> Result<bool> {
        Ok(self
            .attribute
            .values(node)
            .into_iter()
            .any(|value| self.pattern.is_match(value) != self.invert))
    }
}
