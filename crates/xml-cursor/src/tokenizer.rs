//! The forward-only tokenizer underneath every cursor.
//!
//! [`Tokenizer`] is the seam the cursor layer is written against: read the
//! next node, look at the current node, and materialize the current subtree.
//! [`QuickXmlTokenizer`] implements it on top of `quick_xml::Reader`.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::config::ReaderOptions;
use crate::node::{Attribute, Node, NodeKind};
use crate::{Error, Result};

/// Pull-based XML tokenizer.
pub trait Tokenizer {
    /// Move to the next node. Returns `false` once input is exhausted.
    fn read(&mut self) -> Result<bool>;

    /// Node at the current position, `None` before the first read and after
    /// the last one.
    fn node(&self) -> Option<&Node>;

    /// The current node followed by all of its descendants and its end tag,
    /// without moving the position. Non-element and empty element nodes
    /// yield just themselves.
    fn subtree(&mut self) -> Result<Vec<Node>>;
}

impl<T: Tokenizer + ?Sized> Tokenizer for &mut T {
    fn read(&mut self) -> Result<bool> {
        (**self).read()
    }

    fn node(&self) -> Option<&Node> {
        (**self).node()
    }

    fn subtree(&mut self) -> Result<Vec<Node>> {
        (**self).subtree()
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for Box<T> {
    fn read(&mut self) -> Result<bool> {
        (**self).read()
    }

    fn node(&self) -> Option<&Node> {
        (**self).node()
    }

    fn subtree(&mut self) -> Result<Vec<Node>> {
        (**self).subtree()
    }
}

/// [`Tokenizer`] backed by quick-xml.
///
/// Subtree materialization reads ahead and queues the nodes it consumed, so
/// the position reported by [`Tokenizer::node`] never jumps.
pub struct QuickXmlTokenizer<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    options: ReaderOptions,
    open: Vec<String>,
    lookahead: VecDeque<Node>,
    current: Option<Node>,
    finished: bool,
    /// Failure hit while reading ahead, reported once the queue drains.
    deferred: Option<Error>,
}

impl<'a> QuickXmlTokenizer<&'a [u8]> {
    pub fn from_xml(xml: &'a str) -> Self {
        Self::with_options(xml.as_bytes(), ReaderOptions::default())
    }
}

impl QuickXmlTokenizer<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, ReaderOptions::default())
    }

    pub fn open_with_options(path: impl AsRef<Path>, options: ReaderOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::with_options(BufReader::new(file), options))
    }
}

impl<R: BufRead> QuickXmlTokenizer<R> {
    pub fn from_reader(source: R) -> Self {
        Self::with_options(source, ReaderOptions::default())
    }

    pub fn with_options(source: R, options: ReaderOptions) -> Self {
        let mut reader = Reader::from_reader(source);
        let config = reader.config_mut();
        config.trim_text_start = false;
        config.trim_text_end = false;
        config.expand_empty_elements = false;
        config.check_end_names = options.check_end_names;

        Self {
            reader,
            buf: Vec::new(),
            options,
            open: Vec::new(),
            lookahead: VecDeque::new(),
            current: None,
            finished: false,
            deferred: None,
        }
    }

    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Byte offset of the underlying reader, which runs ahead of the current
    /// node after a subtree was materialized.
    pub fn buffer_position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    /// Pull the next node from quick-xml.
    fn pull(&mut self) -> Result<Option<Node>> {
        loop {
            if self.finished {
                return Ok(None);
            }
            self.buf.clear();
            let depth = self.open.len();

            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event,
                Err(err) => {
                    self.finished = true;
                    return Err(Error::from_xml(err, self.reader.error_position()));
                }
            };

            let node = match event {
                Event::Start(e) => {
                    let node = element_node(&e, depth, false)?;
                    self.open.push(node.name.clone());
                    node
                }
                Event::Empty(e) => element_node(&e, depth, true)?,
                Event::End(e) => {
                    let name = utf8(e.name().as_ref())?;
                    self.open.pop();
                    Node::end_element(name, self.open.len())
                }
                Event::Text(e) => {
                    let value = e
                        .unescape()
                        .map_err(|err| Error::Xml {
                            message: format!("Invalid text content: {err}"),
                            position: Some(self.reader.buffer_position() as u64),
                        })?
                        .into_owned();
                    if is_xml_whitespace(&value) {
                        if self.options.skip_whitespace {
                            continue;
                        }
                        Node::character_data(NodeKind::Whitespace, value, depth)
                    } else {
                        Node::character_data(NodeKind::Text, value, depth)
                    }
                }
                Event::CData(e) => Node::character_data(NodeKind::CData, utf8(&e)?, depth),
                Event::Comment(e) => Node::character_data(NodeKind::Comment, utf8(&e)?, depth),
                Event::PI(e) => {
                    let content = utf8(&e)?;
                    let (target, data) = match content.split_once(char::is_whitespace) {
                        Some((target, data)) => (target.to_string(), data.trim_start().to_string()),
                        None => (content.clone(), String::new()),
                    };
                    Node::new(NodeKind::ProcessingInstruction, target, depth).with_value(data)
                }
                Event::DocType(e) => {
                    let content = utf8(&e)?;
                    let content = content.trim();
                    let name = content
                        .split(|c: char| c.is_whitespace() || c == '[')
                        .next()
                        .unwrap_or_default()
                        .to_string();
                    Node::new(NodeKind::DocumentType, name, depth).with_value(content)
                }
                Event::Decl(e) => {
                    let mut attributes = Vec::new();
                    let version = e.version()?;
                    attributes.push(Attribute::new("version", utf8(&version)?));
                    if let Some(encoding) = e.encoding() {
                        let encoding = encoding?;
                        attributes.push(Attribute::new("encoding", utf8(&encoding)?));
                    }
                    if let Some(standalone) = e.standalone() {
                        let standalone = standalone?;
                        attributes.push(Attribute::new("standalone", utf8(&standalone)?));
                    }
                    let mut node = Node::new(NodeKind::XmlDeclaration, "xml", depth);
                    node.attributes = attributes;
                    node
                }
                Event::Eof => {
                    self.finished = true;
                    if let Some(open) = self.open.last() {
                        return Err(Error::Xml {
                            message: format!("unexpected end of input, <{open}> is not closed"),
                            position: Some(self.reader.buffer_position() as u64),
                        });
                    }
                    return Ok(None);
                }
            };
            return Ok(Some(node));
        }
    }
}

impl<R: BufRead> Tokenizer for QuickXmlTokenizer<R> {
    fn read(&mut self) -> Result<bool> {
        let next = match self.lookahead.pop_front() {
            Some(node) => Some(node),
            None => {
                if let Some(err) = self.deferred.take() {
                    self.current = None;
                    return Err(err);
                }
                self.pull()?
            }
        };
        let advanced = next.is_some();
        self.current = next;
        Ok(advanced)
    }

    fn node(&self) -> Option<&Node> {
        self.current.as_ref()
    }

    fn subtree(&mut self) -> Result<Vec<Node>> {
        let Some(current) = self.current.clone() else {
            return Ok(Vec::new());
        };
        if current.kind != NodeKind::Element || current.is_empty_element {
            return Ok(vec![current]);
        }

        let mut nodes = vec![current.clone()];
        let mut index = 0;
        loop {
            if index == self.lookahead.len() {
                match self.pull() {
                    Ok(Some(node)) => self.lookahead.push_back(node),
                    Ok(None) => {
                        return Err(Error::Expansion {
                            name: current.name,
                            message: "input ended before the closing tag".to_string(),
                        });
                    }
                    Err(err) => {
                        let message = err.to_string();
                        self.deferred = Some(err);
                        return Err(Error::Expansion {
                            name: current.name,
                            message,
                        });
                    }
                }
            }
            let node = &self.lookahead[index];
            nodes.push(node.clone());
            if node.kind == NodeKind::EndElement && node.depth == current.depth {
                return Ok(nodes);
            }
            index += 1;
        }
    }
}

fn element_node(start: &BytesStart<'_>, depth: usize, is_empty: bool) -> Result<Node> {
    let name = utf8(start.name().as_ref())?;
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr?;
        let key = utf8(attr.key.as_ref())?;
        let value = attr.unescape_value()?.into_owned();
        attributes.push(Attribute::new(key, value));
    }
    Ok(Node::element(name, depth, attributes, is_empty))
}

fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|err| Error::Xml {
            message: format!("Invalid UTF-8: {err}"),
            position: None,
        })
}

fn is_xml_whitespace(text: &str) -> bool {
    text.bytes()
        .all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}
