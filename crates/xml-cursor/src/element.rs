//! Cursor over the elements of a document, optionally restricted by name.

use crate::cursor::Cursor;
use crate::filter::{AttributeFilter, AttributePattern, FilterCursor};
use crate::node::Node;
use crate::path::ElementStack;
use crate::xpath::XPathFilter;
use crate::Result;

/// Exposes only element nodes, optionally only those with a given name.
///
/// Keys count matched elements from 0. The cursor rewinds itself lazily on
/// the first `advance` or `current`.
pub struct ElementCursor<C> {
    inner: C,
    name: Option<String>,
    index: usize,
    did_rewind: bool,
}

impl<C: Cursor> ElementCursor<C> {
    /// `None` or `"*"` matches every element.
    pub fn new(inner: C, name: Option<&str>) -> Self {
        Self {
            inner,
            name: name.filter(|name| *name != "*").map(str::to_string),
            index: 0,
            did_rewind: false,
        }
    }

    pub fn all(inner: C) -> Self {
        Self::new(inner, None)
    }

    pub fn named(inner: C, name: &str) -> Self {
        Self::new(inner, Some(name))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    /// Keep only elements whose `attribute` has one of `values`.
    pub fn with_attribute(
        self,
        attribute: &str,
        values: &[&str],
    ) -> FilterCursor<Self, AttributeFilter> {
        FilterCursor::new(self, AttributeFilter::new(attribute, values))
    }

    /// Keep only elements whose `attribute` matches the regular expression.
    pub fn with_attribute_pattern(
        self,
        attribute: &str,
        pattern: &str,
    ) -> Result<FilterCursor<Self, AttributePattern>> {
        Ok(FilterCursor::new(self, AttributePattern::new(attribute, pattern)?))
    }

    /// Keep only elements selected by an XPath expression evaluated against
    /// their ancestor skeleton.
    pub fn with_xpath(self, expression: &str) -> Result<FilterCursor<Self, XPathFilter>> {
        Ok(FilterCursor::new(self, XPathFilter::new(expression)?))
    }

    /// `(name, text content)` of every remaining matching element.
    pub fn collect_strings(&mut self) -> Result<Vec<(String, String)>> {
        let mut pairs = Vec::new();
        self.rewind()?;
        while self.valid() {
            let name = self.node().map(|node| node.name.clone()).unwrap_or_default();
            pairs.push((name, self.read_string()?));
            self.advance()?;
        }
        Ok(pairs)
    }

    fn matches(&self, node: &Node) -> bool {
        node.is_element() && self.name.as_deref().is_none_or(|name| node.name == name)
    }

    /// Advance the inner cursor until it sits on a match, current node
    /// included.
    fn seek(&mut self) -> Result<bool> {
        loop {
            match self.inner.node() {
                Some(node) if self.matches(node) => return Ok(true),
                Some(_) => {
                    if !self.inner.advance()? {
                        return Ok(false);
                    }
                }
                None => return Ok(false),
            }
        }
    }
}

impl<C: Cursor> Cursor for ElementCursor<C> {
    fn advance(&mut self) -> Result<bool> {
        if !self.did_rewind {
            self.rewind()?;
            return Ok(self.valid());
        }
        if !self.inner.advance()? {
            return Ok(false);
        }
        let found = self.seek()?;
        if found {
            self.index += 1;
        }
        Ok(found)
    }

    fn advance_node(&mut self) -> Result<bool> {
        self.inner.advance_node()
    }

    fn rewind(&mut self) -> Result<()> {
        self.inner.rewind()?;
        self.did_rewind = true;
        self.index = 0;
        self.seek()?;
        Ok(())
    }

    fn valid(&self) -> bool {
        self.did_rewind && self.inner.node().is_some_and(|node| self.matches(node))
    }

    fn node(&self) -> Option<&Node> {
        if self.valid() { self.inner.node() } else { None }
    }

    fn position(&self) -> Option<&Node> {
        self.inner.position()
    }

    fn key(&self) -> Option<usize> {
        self.valid().then_some(self.index)
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
