//! XPath-based element filtering.
//!
//! The cursor never holds a document, so the expression is evaluated against
//! the ancestor skeleton of the current element (see
//! [`crate::ElementStack::tree`]). The skeleton has the current element as
//! its innermost, childless element. An element is accepted when the
//! expression selects exactly one node and that node has no element
//! children, i.e. the expression singled out the current element.

use xee_xpath::{Documents, Item, Queries, Query};

use crate::filter::Predicate;
use crate::node::Node;
use crate::path::ElementStack;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct XPathFilter {
    expression: String,
}

impl XPathFilter {
    /// Compile `expression` once to reject syntax errors up front.
    pub fn new(expression: &str) -> Result<Self> {
        Queries::default().sequence(expression).map_err(|err| {
            Error::InvalidArgument(format!("Invalid XPath expression '{expression}': {err:?}"))
        })?;
        Ok(Self {
            expression: expression.to_string(),
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Evaluate against a skeleton document.
    pub fn matches_tree(&self, tree: &str) -> Result<bool> {
        let mut documents = Documents::new();
        let handle = documents
            .add_string_without_uri(tree)
            .map_err(|err| Error::XPath(format!("{err:?}")))?;

        let queries = Queries::default();
        let query = queries
            .sequence(self.expression.as_str())
            .map_err(|err| Error::XPath(format!("{err:?}")))?;
        let sequence = query
            .execute(&mut documents, handle)
            .map_err(|err| Error::XPath(format!("{err:?}")))?;

        let items: Vec<Item> = sequence.iter().collect();
        if items.len() != 1 {
            return Ok(false);
        }
        match &items[0] {
            Item::Node(node) => {
                let xot = documents.xot();
                Ok(!xot.children(*node).any(|child| xot.is_element(child)))
            }
            _ => Ok(false),
        }
    }
}

impl Predicate for XPathFilter {
    fn accept(&self, node: &Node, elements: &ElementStack) -> Result<bool> {
        if !node.is_element() {
            return Ok(false);
        }
        self.matches_tree(&elements.tree(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::{Cursor, XmlCursor};
    use crate::element::ElementCursor;
    use crate::tokenizer::QuickXmlTokenizer;

    const LIBRARY: &str = r#"<library>
  <shelf genre="fiction">
    <book lang="en">A</book>
    <book lang="de">B</book>
  </shelf>
  <shelf genre="poetry">
    <book lang="en">C</book>
  </shelf>
</library>"#;

    #[test]
    fn test_invalid_expression_fails_at_construction() {
        assert!(matches!(
            XPathFilter::new("//book[@lang="),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_matches_tree_requires_single_leaf() {
        let filter = XPathFilter::new("//book").unwrap();
        assert!(filter.matches_tree("<library><shelf><book/></shelf></library>").unwrap());

        let shelves = XPathFilter::new("//shelf").unwrap();
        assert!(!shelves.matches_tree("<library><shelf><book/></shelf></library>").unwrap());

        let none = XPathFilter::new("//magazine").unwrap();
        assert!(!none.matches_tree("<library><shelf><book/></shelf></library>").unwrap());
    }

    #[test]
    fn test_filter_uses_ancestor_attributes() {
        let mut base = XmlCursor::new(QuickXmlTokenizer::from_xml(LIBRARY));
        let mut books = ElementCursor::named(&mut base, "book")
            .with_xpath("/library/shelf[@genre='fiction']/book[@lang='en']")
            .unwrap();
        let mut texts = Vec::new();
        while books.advance().unwrap() {
            texts.push(books.read_string().unwrap());
        }
        assert_eq!(texts, ["A"]);
    }
}
