//! The cursor protocol and the base cursor over a tokenizer.
//!
//! Every traversal in this crate is a [`Cursor`]: a forward-only position
//! with `rewind`/`valid`/`node`/`key`/`advance`. Wrappers (element,
//! scoped-child, filter) hold another cursor and narrow what it exposes,
//! while all of them ultimately move the same [`XmlCursor`].
//!
//! `rewind` never goes backwards. On a cursor that has not started it
//! performs the first read; afterwards it only resets the ordinal key and
//! leaves the position alone.

use xot::Xot;

use crate::node::{Node, NodeKind};
use crate::path::ElementStack;
use crate::scoped::ScopedChildCursor;
use crate::tokenizer::Tokenizer;
use crate::tree::{self, XmlElement};
use crate::{Error, Result};

pub trait Cursor {
    /// Move to the next position this cursor exposes.
    ///
    /// On a wrapper that has not been rewound yet this performs the rewind
    /// instead, so `while cursor.advance()? { .. }` visits every position.
    fn advance(&mut self) -> Result<bool>;

    /// Move the underlying base cursor by exactly one node, bypassing any
    /// narrowing done by this layer.
    fn advance_node(&mut self) -> Result<bool>;

    fn rewind(&mut self) -> Result<()>;

    fn valid(&self) -> bool;

    /// Node at this cursor's position, `None` when not valid.
    fn node(&self) -> Option<&Node>;

    /// Node at the underlying tokenizer position, even when this layer does
    /// not consider it valid.
    fn position(&self) -> Option<&Node>;

    /// Zero-based ordinal of the current position within this cursor.
    fn key(&self) -> Option<usize>;

    /// Make the next advance of the base cursor report the current node
    /// again instead of reading.
    fn skip_next_advance(&mut self);

    /// Ancestor chain of the current position.
    fn elements(&self) -> &ElementStack;

    /// The current node followed by its descendants, without moving.
    fn subtree(&mut self) -> Result<Vec<Node>>;

    /// Node at the current position, rewinding first if this cursor has
    /// never been positioned.
    fn current(&mut self) -> Result<Option<&Node>> {
        Ok(Self::node(self))
    }

    /// Slash-separated element names from the document element down to the
    /// current position.
    fn node_path(&self) -> String {
        self.elements().path()
    }

    /// Ancestor chain of the current position as a skeleton document.
    fn node_tree(&self) -> String {
        self.elements().tree("")
    }

    fn read_outer_xml(&mut self) -> Result<String> {
        self.current()?;
        tree::outer_xml(&self.subtree()?)
    }

    fn read_inner_xml(&mut self) -> Result<String> {
        self.current()?;
        tree::inner_xml(&self.subtree()?)
    }

    /// Concatenated text content of the current node.
    fn read_string(&mut self) -> Result<String> {
        self.current()?;
        Ok(tree::text_content(&self.subtree()?))
    }

    /// Materialize the current element as an owned tree.
    fn expand(&mut self) -> Result<XmlElement> {
        let nodes = self.current_subtree("expand")?;
        XmlElement::from_nodes(&nodes)
    }

    /// Materialize the current element into a `Xot` arena.
    fn expand_into(&mut self, xot: &mut Xot) -> Result<xot::Node> {
        let nodes = self.current_subtree("expand_into")?;
        tree::expand_into(xot, &nodes)
    }

    /// Subtree of the current position, which must be an element.
    fn current_subtree(&mut self, context: &str) -> Result<Vec<Node>> {
        let kind = self.current()?.map_or(NodeKind::None, |node| node.kind);
        if kind != NodeKind::Element {
            return Err(Error::UnsupportedNodeKind {
                kind,
                context: format!("{context} requires an element position"),
            });
        }
        self.subtree()
    }

    /// Elements below the current element, children only unless
    /// `descendants` is set. `None` or `"*"` accepts every name.
    fn child_elements(
        &mut self,
        name: Option<&str>,
        descendants: bool,
    ) -> Result<ScopedChildCursor<&mut Self>>
    where
        Self: Sized,
    {
        self.current()?;
        Ok(ScopedChildCursor::elements(self, name, descendants))
    }

    /// Every node below the current element.
    fn child_nodes(&mut self) -> Result<ScopedChildCursor<&mut Self>>
    where
        Self: Sized,
    {
        self.current()?;
        Ok(ScopedChildCursor::nodes(self))
    }

    /// Iterate the remaining positions as owned nodes, starting with the
    /// current one.
    fn nodes(&mut self) -> Nodes<'_, Self>
    where
        Self: Sized,
    {
        Nodes {
            cursor: self,
            started: false,
        }
    }
}

impl<C: Cursor + ?Sized> Cursor for &mut C {
    fn advance(&mut self) -> Result<bool> {
        (**self).advance()
    }

    fn advance_node(&mut self) -> Result<bool> {
        (**self).advance_node()
    }

    fn rewind(&mut self) -> Result<()> {
        (**self).rewind()
    }

    fn valid(&self) -> bool {
        (**self).valid()
    }

    fn node(&self) -> Option<&Node> {
        (**self).node()
    }

    fn position(&self) -> Option<&Node> {
        (**self).position()
    }

    fn key(&self) -> Option<usize> {
        (**self).key()
    }

    fn skip_next_advance(&mut self) {
        (**self).skip_next_advance();
    }

    fn elements(&self) -> &ElementStack {
        (**self).elements()
    }

    fn subtree(&mut self) -> Result<Vec<Node>> {
        (**self).subtree()
    }

    fn current(&mut self) -> Result<Option<&Node>> {
        (**self).current()
    }
}

/// Iterator returned by [`Cursor::nodes`].
pub struct Nodes<'c, C: ?Sized> {
    cursor: &'c mut C,
    started: bool,
}

impl<C: Cursor + ?Sized> Iterator for Nodes<'_, C> {
    type Item = Result<Node>;

    fn next(&mut self) -> Option<Self::Item> {
        let step = if self.started {
            self.cursor.advance()
        } else {
            self.started = true;
            self.cursor.rewind().map(|()| self.cursor.valid())
        };
        match step {
            Ok(true) => self.cursor.node().cloned().map(Ok),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }
}

/// Lifecycle of a [`XmlCursor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    Started,
    Exhausted,
}

/// Base cursor: exposes every node the tokenizer produces, in order.
pub struct XmlCursor<T> {
    tokenizer: T,
    phase: Phase,
    index: usize,
    skip_next: bool,
    stack: ElementStack,
}

impl<T: Tokenizer> XmlCursor<T> {
    pub fn new(tokenizer: T) -> Self {
        let mut stack = ElementStack::new();
        let phase = match tokenizer.node() {
            Some(node) => {
                stack.observe(node);
                Phase::Started
            }
            None => Phase::NotStarted,
        };
        Self {
            tokenizer,
            phase,
            index: 0,
            skip_next: false,
            stack,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tokenizer(&self) -> &T {
        &self.tokenizer
    }

    pub fn into_tokenizer(self) -> T {
        self.tokenizer
    }

    fn step(&mut self) -> Result<bool> {
        if self.skip_next {
            self.skip_next = false;
            let valid = self.tokenizer.node().is_some();
            if !valid {
                self.phase = Phase::Exhausted;
            }
            return Ok(valid);
        }

        let advanced = match self.tokenizer.read() {
            Ok(advanced) => advanced,
            Err(err) => {
                self.phase = Phase::Exhausted;
                return Err(err);
            }
        };
        match self.tokenizer.node() {
            Some(node) if advanced => {
                self.stack.observe(node);
                self.phase = Phase::Started;
            }
            _ => self.phase = Phase::Exhausted,
        }
        Ok(advanced)
    }

    /// Position on the first node of `kind`, starting with the current node.
    pub fn move_to_next_by_kind(&mut self, kind: NodeKind) -> Result<Option<&Node>> {
        if self.phase == Phase::NotStarted {
            self.rewind()?;
        }
        while let Some(node) = self.node() {
            if node.kind == kind {
                break;
            }
            self.advance()?;
        }
        Ok(Self::node(self))
    }

    /// Position on the next element, starting with the current node.
    pub fn move_to_next_element(&mut self) -> Result<Option<&Node>> {
        self.move_to_next_element_by_name(None)
    }

    /// Position on the next element named `name` (any name for `None` or
    /// `"*"`), starting with the current node.
    pub fn move_to_next_element_by_name(&mut self, name: Option<&str>) -> Result<Option<&Node>> {
        let name = name.filter(|name| *name != "*");
        loop {
            let Some(node) = self.move_to_next_by_kind(NodeKind::Element)? else {
                return Ok(None);
            };
            if name.is_none_or(|name| node.name == name) {
                break;
            }
            self.advance()?;
        }
        Ok(Self::node(self))
    }

    /// Read at least once, then stop on the next element.
    pub fn next_element(&mut self) -> Result<bool> {
        self.next_matching(|_| true)
    }

    pub fn next_element_by_name(&mut self, name: &str) -> Result<bool> {
        self.next_matching(|node| node.name == name)
    }

    pub fn next_element_by_local_name(&mut self, local_name: &str) -> Result<bool> {
        self.next_matching(|node| node.local_name == local_name)
    }

    /// Move past the current element and everything inside it, onto the
    /// node after its end tag. On any other node this is a plain advance.
    ///
    /// Pair with [`Cursor::skip_next_advance`] when the enclosing loop
    /// advances on its own.
    pub fn skip_subtree(&mut self) -> Result<bool> {
        let depth = Self::node(self)
            .filter(|node| node.is_element() && !node.is_empty_element)
            .map(|node| node.depth);
        let Some(depth) = depth else {
            return self.advance();
        };
        self.skip_next = false;
        loop {
            if !self.step()? {
                return Ok(false);
            }
            if self
                .tokenizer
                .node()
                .is_some_and(|node| node.is_end_element() && node.depth == depth)
            {
                break;
            }
        }
        self.index += 1;
        self.step()
    }

    fn next_matching(&mut self, accept: impl Fn(&Node) -> bool) -> Result<bool> {
        while self.advance()? {
            if self.node().is_some_and(|node| node.is_element() && accept(node)) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl<T: Tokenizer> Cursor for XmlCursor<T> {
    fn advance(&mut self) -> Result<bool> {
        match self.phase {
            Phase::Exhausted => Ok(false),
            Phase::NotStarted => {
                let advanced = self.step()?;
                self.index = 0;
                Ok(advanced)
            }
            Phase::Started => {
                self.index += 1;
                self.step()
            }
        }
    }

    fn advance_node(&mut self) -> Result<bool> {
        self.advance()
    }

    fn rewind(&mut self) -> Result<()> {
        match self.phase {
            Phase::NotStarted => {
                self.skip_next = false;
                self.step()?;
            }
            Phase::Started => self.skip_next = false,
            Phase::Exhausted => {
                return Err(Error::InvalidOperation(
                    "cannot rewind a forward-only cursor after the end of input".to_string(),
                ));
            }
        }
        self.index = 0;
        Ok(())
    }

    fn valid(&self) -> bool {
        self.phase == Phase::Started && self.tokenizer.node().is_some()
    }

    fn node(&self) -> Option<&Node> {
        match self.phase {
            Phase::Started => self.tokenizer.node(),
            _ => None,
        }
    }

    fn position(&self) -> Option<&Node> {
        self.node()
    }

    fn key(&self) -> Option<usize> {
        self.valid().then_some(self.index)
    }

    fn skip_next_advance(&mut self) {
        self.skip_next = true;
    }

    fn elements(&self) -> &ElementStack {
        &self.stack
    }

    fn subtree(&mut self) -> Result<Vec<Node>> {
        if self.phase != Phase::Started {
            return Ok(Vec::new());
        }
        self.tokenizer.subtree()
    }
}
