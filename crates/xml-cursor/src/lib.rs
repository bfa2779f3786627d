//! Composable forward-only cursors over streaming XML.
//!
//! This crate wraps [`quick-xml`] in a small cursor protocol so that large
//! documents can be walked, filtered and partially materialized without ever
//! building the whole tree. It also splits files that contain several
//! concatenated XML documents into one stream per document.
//!
//! # Overview
//!
//! - [`XmlCursor`]: every node of a [`Tokenizer`], in document order
//! - [`ElementCursor`]: only elements, optionally only one name
//! - [`ScopedChildCursor`]: children or descendants of one element
//! - [`FilterCursor`]: positions accepted by a [`Predicate`] such as
//!   [`AttributeFilter`], [`AttributePattern`] or [`XPathFilter`]
//! - [`SequenceRegistry`]: one [`SequenceStream`] per concatenated document
//!
//! All cursors stacked on one base move the same tokenizer. An inner loop
//! over the children of an element leaves the base right after that
//! element, and the outer loop carries on from there.
//!
//! # Example
//!
//! ```rust
//! use xml_cursor::{Cursor, ElementCursor, QuickXmlTokenizer, XmlCursor};
//!
//! let xml = r#"<users>
//!   <user name="ana"><post>a1</post><post>a2</post></user>
//!   <user name="bo"><post>b1</post></user>
//! </users>"#;
//!
//! let mut base = XmlCursor::new(QuickXmlTokenizer::from_xml(xml));
//! let mut users = ElementCursor::named(&mut base, "user");
//! let mut counts = Vec::new();
//! while users.advance()? {
//!     let name = users.node().and_then(|u| u.attribute("name")).unwrap_or_default().to_string();
//!     let mut posts = users.child_elements(Some("post"), false)?;
//!     let mut count = 0;
//!     while posts.advance()? {
//!         count += 1;
//!     }
//!     counts.push((name, count));
//! }
//! assert_eq!(counts, [("ana".to_string(), 2), ("bo".to_string(), 1)]);
//! # Ok::<(), xml_cursor::Error>(())
//! ```

pub mod config;
pub mod cursor;
pub mod element;
pub mod error;
pub mod filter;
pub mod markup;
pub mod node;
pub mod path;
pub mod scoped;
pub mod sequence;
pub mod tokenizer;
pub mod tree;
pub mod writer;
pub mod xpath;

pub use config::{Config, ReaderOptions, SequenceOptions};
pub use cursor::{Cursor, Nodes, Phase, XmlCursor};
pub use element::ElementCursor;
pub use error::{Error, Result};
pub use filter::{
    AttributeFilter, AttributePattern, AttributeSelector, FilterCursor, NodeKindFilter, Predicate,
};
pub use node::{Attribute, Node, NodeKind};
pub use path::{ElementSnapshot, ElementStack};
pub use scoped::ScopedChildCursor;
pub use sequence::{SCHEME, SequenceRegistry, SequenceStream, split_file, strip_scheme};
pub use tokenizer::{QuickXmlTokenizer, Tokenizer};
pub use tree::{XmlAttribute, XmlChild, XmlChildren, XmlElement};
pub use writer::{NodeWriter, copy_document};
pub use xpath::XPathFilter;
