//! Cursor confined to the subtree of one element.
//!
//! The element the inner cursor sits on when the scope is created is the
//! scope root. Traversal stops at the first node that is not deeper than
//! the root, so a nested scope never leaks into its parent's siblings. If
//! that node is the root's own end tag it is consumed; any other node is
//! handed back to the enclosing loop by arming the base cursor's
//! skip-next-advance flag.

use tracing::trace;

use crate::cursor::Cursor;
use crate::node::{Node, NodeKind};
use crate::path::ElementStack;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Pending,
    Open,
    Closed,
}

#[derive(Debug, Clone)]
struct ScopeRoot {
    name: String,
    depth: usize,
    is_empty_element: bool,
}

impl ScopeRoot {
    fn from_node(node: &Node) -> Self {
        Self {
            name: node.name.clone(),
            depth: node.depth,
            is_empty_element: node.kind != NodeKind::Element || node.is_empty_element,
        }
    }
}

pub struct ScopedChildCursor<C> {
    inner: C,
    name: Option<String>,
    descendants: bool,
    elements_only: bool,
    root: Option<ScopeRoot>,
    scope: Scope,
    index: usize,
}

impl<C: Cursor> ScopedChildCursor<C> {
    /// Elements below the current element of `inner`. Only direct children
    /// unless `descendants` is set; `None` or `"*"` accepts every name.
    pub fn elements(inner: C, name: Option<&str>, descendants: bool) -> Self {
        Self::with_mode(inner, name, descendants, true)
    }

    /// Every node below the current element of `inner`.
    pub fn nodes(inner: C) -> Self {
        Self::with_mode(inner, None, true, false)
    }

    fn with_mode(inner: C, name: Option<&str>, descendants: bool, elements_only: bool) -> Self {
        let root = inner.position().map(ScopeRoot::from_node);
        Self {
            inner,
            name: name.filter(|name| *name != "*").map(str::to_string),
            descendants,
            elements_only,
            root,
            scope: Scope::Pending,
            index: 0,
        }
    }

    /// Depth of the scope root, once known.
    pub fn root_depth(&self) -> Option<usize> {
        self.root.as_ref().map(|root| root.depth)
    }

    pub fn is_closed(&self) -> bool {
        self.scope == Scope::Closed
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    fn accepts(&self, node: &Node, root_depth: usize) -> bool {
        if node.depth <= root_depth {
            return false;
        }
        if !self.elements_only {
            return true;
        }
        node.is_element()
            && (self.descendants || node.depth == root_depth + 1)
            && self.name.as_deref().is_none_or(|name| node.name == name)
    }

    /// Pick the scope root when the inner cursor had no position yet: the
    /// first element from the start of the document.
    fn locate_root(&mut self) -> Result<()> {
        if self.inner.position().is_none() {
            self.inner.rewind()?;
        }
        while let Some(node) = self.inner.position() {
            if node.is_element() {
                break;
            }
            if !self.inner.advance_node()? {
                break;
            }
        }
        self.root = self.inner.position().map(ScopeRoot::from_node);
        Ok(())
    }

    /// Step the base cursor until an accepted node or the end of the scope.
    fn seek(&mut self) -> Result<bool> {
        let Some(root_depth) = self.root_depth() else {
            self.scope = Scope::Closed;
            return Ok(false);
        };
        loop {
            if !self.inner.advance_node()? {
                self.scope = Scope::Closed;
                return Ok(false);
            }
            let Some(node) = self.inner.position() else {
                self.scope = Scope::Closed;
                return Ok(false);
            };
            if node.depth <= root_depth {
                let closing = node.kind == NodeKind::EndElement && node.depth == root_depth;
                let label = node.dump_label();
                self.scope = Scope::Closed;
                if !closing {
                    self.inner.skip_next_advance();
                }
                trace!(depth = root_depth, node = %label, consumed = closing, "scope closed");
                return Ok(false);
            }
            if self.accepts(node, root_depth) {
                return Ok(true);
            }
        }
    }
}

impl<C: Cursor> Cursor for ScopedChildCursor<C> {
    fn advance(&mut self) -> Result<bool> {
        match self.scope {
            Scope::Pending => {
                self.rewind()?;
                Ok(self.valid())
            }
            Scope::Closed => Ok(false),
            Scope::Open => {
                let found = self.seek()?;
                if found {
                    self.index += 1;
                }
                Ok(found)
            }
        }
    }

    fn advance_node(&mut self) -> Result<bool> {
        self.inner.advance_node()
    }

    /// Enter the scope and move to its first accepted node. A scope can be
    /// entered once; rewinding an open or closed scope does nothing.
    fn rewind(&mut self) -> Result<()> {
        if self.scope != Scope::Pending {
            return Ok(());
        }
        if self.root.is_none() {
            self.locate_root()?;
        }
        self.scope = Scope::Open;
        self.index = 0;
        let has_content = match &self.root {
            Some(root) if root.is_empty_element => {
                trace!(root = %root.name, "scope root has no content");
                false
            }
            Some(_) => true,
            None => false,
        };
        if has_content {
            self.seek()?;
        } else {
            self.scope = Scope::Closed;
        }
        Ok(())
    }

    fn valid(&self) -> bool {
        match (self.scope, self.root_depth(), self.inner.position()) {
            (Scope::Open, Some(root_depth), Some(node)) => self.accepts(node, root_depth),
            _ => false,
        }
    }

    fn node(&self) -> Option<&Node> {
        if self.valid() { self.inner.position() } else { None }
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
        if self.scope == Scope::Pending {
            self.rewind()?;
        }
        Ok(Self::node(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::XmlCursor;
    use crate::element::ElementCursor;
    use crate::tokenizer::QuickXmlTokenizer;

    const NESTED: &str =
        "<root><none/><one><child/></one><none/></root>";

    fn names<C: Cursor>(cursor: &mut C) -> Vec<String> {
        let mut names = Vec::new();
        while cursor.advance().unwrap() {
            names.push(cursor.node().unwrap().name.clone());
        }
        names
    }

    #[test]
    fn test_direct_children() {
        let mut base = XmlCursor::new(QuickXmlTokenizer::from_xml(NESTED));
        let mut children = ScopedChildCursor::elements(&mut base, None, false);
        assert_eq!(names(&mut children), ["none", "one", "none"]);
    }

    #[test]
    fn test_descendants() {
        let mut base = XmlCursor::new(QuickXmlTokenizer::from_xml(NESTED));
        let mut all = ScopedChildCursor::elements(&mut base, None, true);
        assert_eq!(names(&mut all), ["none", "one", "child", "none"]);
    }

    #[test]
    fn test_leading_comment_is_skipped_when_locating_root() {
        let xml = "<!-- comment --><root><child></child></root>";
        let mut base = XmlCursor::new(QuickXmlTokenizer::from_xml(xml));
        let mut children = ScopedChildCursor::elements(&mut base, None, false);
        assert!(!children.valid());
        children.rewind().unwrap();
        assert!(children.valid());
        assert_eq!(children.node().unwrap().name, "child");
        assert_eq!(children.root_depth(), Some(0));
        assert!(!children.advance().unwrap());
    }

    #[test]
    fn test_empty_root_never_reads() {
        let mut base = XmlCursor::new(QuickXmlTokenizer::from_xml("<r><a/><b/></r>"));
        base.next_element_by_name("a").unwrap();
        {
            let mut children = ScopedChildCursor::elements(&mut base, None, true);
            assert!(!children.advance().unwrap());
            assert!(children.is_closed());
        }
        assert_eq!(base.node().unwrap().name, "a");
        assert_eq!(base.key(), Some(1));
    }

    #[test]
    fn test_named_children_do_not_leak_into_siblings() {
        let xml = "<users>\
            <user><post>a1</post><post>a2</post></user>\
            <user><comment>x</comment></user>\
            <user><post>c1</post></user>\
        </users>";
        let mut base = XmlCursor::new(QuickXmlTokenizer::from_xml(xml));
        let mut users = ElementCursor::named(&mut base, "user");
        let mut counts = Vec::new();
        while users.advance().unwrap() {
            let mut posts = users.child_elements(Some("post"), false).unwrap();
            let mut count = 0;
            while posts.advance().unwrap() {
                count += 1;
            }
            counts.push(count);
        }
        assert_eq!(counts, [2, 0, 1]);
    }

    #[test]
    fn test_child_nodes_include_text_and_end_tags() {
        let mut base = XmlCursor::new(QuickXmlTokenizer::from_xml("<r><a>t</a><!--c--></r><!--after-->"));
        let mut nodes = ScopedChildCursor::nodes(&mut base);
        let mut kinds = Vec::new();
        while nodes.advance().unwrap() {
            kinds.push(nodes.node().unwrap().kind);
        }
        assert_eq!(
            kinds,
            [
                NodeKind::Element,
                NodeKind::Text,
                NodeKind::EndElement,
                NodeKind::Comment,
            ]
        );
        assert_eq!(base.node().unwrap().kind, NodeKind::EndElement);
        assert!(base.advance().unwrap());
        assert_eq!(base.node().unwrap().kind, NodeKind::Comment);
    }

    #[test]
    fn test_child_keys_are_dense() {
        let mut base = XmlCursor::new(QuickXmlTokenizer::from_xml(NESTED));
        let mut children = ScopedChildCursor::elements(&mut base, None, true);
        let mut keys = Vec::new();
        while children.advance().unwrap() {
            keys.push(children.key().unwrap());
        }
        assert_eq!(keys, [0, 1, 2, 3]);
    }

    #[test]
    fn test_current_enters_the_scope() {
        let mut base = XmlCursor::new(QuickXmlTokenizer::from_xml(NESTED));
        let mut children = ScopedChildCursor::elements(&mut base, Some("one"), false);
        let first = children.current().unwrap().map(|node| node.name.clone());
        assert_eq!(first.as_deref(), Some("one"));
        assert_eq!(children.key(), Some(0));
    }
}
