//! Writing cursor positions back out as XML.

use std::io::Write;

use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use tracing::warn;

use crate::Result;
use crate::cursor::Cursor;
use crate::markup;
use crate::node::{Attribute, Node, NodeKind};
use crate::tree::{XmlChild, XmlChildren, XmlElement};

/// Serializes nodes one at a time through a `quick_xml::Writer`.
pub struct NodeWriter<W: Write> {
    writer: quick_xml::Writer<W>,
}

impl<W: Write> NodeWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: quick_xml::Writer::new(inner),
        }
    }

    pub fn get_ref(&self) -> &W {
        self.writer.get_ref()
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    /// Write one node. Returns `false` (after logging a warning) for kinds
    /// that have no standalone markup.
    pub fn write_node(&mut self, node: &Node) -> Result<bool> {
        let pi;
        let event = match node.kind {
            NodeKind::Element => {
                let content = format!("{}{}", node.name, markup::attribute_list(&node.attributes));
                let start = BytesStart::from_content(content, node.name.len());
                if node.is_empty_element {
                    Event::Empty(start)
                } else {
                    Event::Start(start)
                }
            }
            NodeKind::EndElement => Event::End(BytesEnd::new(node.name.as_str())),
            NodeKind::Text => Event::Text(BytesText::from_escaped(partial_escape(&node.value))),
            NodeKind::Whitespace | NodeKind::SignificantWhitespace => {
                Event::Text(BytesText::from_escaped(node.value.as_str()))
            }
            NodeKind::CData => Event::CData(BytesCData::new(node.value.as_str())),
            NodeKind::Comment => Event::Comment(BytesText::from_escaped(node.value.as_str())),
            NodeKind::ProcessingInstruction => {
                pi = if node.value.is_empty() {
                    node.name.clone()
                } else {
                    format!("{} {}", node.name, node.value)
                };
                Event::PI(BytesPI::new(pi.as_str()))
            }
            NodeKind::DocumentType => Event::DocType(BytesText::from_escaped(node.value.as_str())),
            NodeKind::XmlDeclaration => Event::Decl(BytesDecl::new(
                node.attribute("version").unwrap_or("1.0"),
                node.attribute("encoding"),
                node.attribute("standalone"),
            )),
            kind => {
                warn!(kind = %kind, "Node-type not implemented: {kind}");
                return Ok(false);
            }
        };
        self.writer.write_event(event)?;
        Ok(true)
    }

    /// Write `markup` as is, without escaping or checking it.
    pub fn write_raw(&mut self, markup: &str) -> Result<()> {
        self.writer.get_mut().write_all(markup.as_bytes())?;
        Ok(())
    }

    /// Write an element tree, typically one obtained from
    /// [`Cursor::expand`] and then modified.
    pub fn write_element(&mut self, element: &XmlElement) -> Result<()> {
        let name = element.qualified_name();
        let attributes: Vec<Attribute> = element
            .attributes
            .iter()
            .map(|attr| Attribute::new(attr.qualified_name(), attr.value.as_str()))
            .collect();
        let content = format!("{name}{}", markup::attribute_list(&attributes));
        let start = BytesStart::from_content(content, name.len());
        if element.is_empty() {
            self.writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        self.writer.write_event(Event::Start(start))?;
        match &element.children {
            XmlChildren::Empty => {}
            XmlChildren::Text(text) => self.write_text(text)?,
            XmlChildren::Elements(elements) => {
                for child in elements {
                    self.write_element(child)?;
                }
            }
            XmlChildren::Mixed(children) => {
                for child in children {
                    match child {
                        XmlChild::Element(child) => self.write_element(child)?,
                        XmlChild::Text(text) => self.write_text(text)?,
                    }
                }
            }
        }
        self.writer.write_event(Event::End(BytesEnd::new(name.as_str())))?;
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
        Ok(())
    }

    /// Write the node at the cursor's position.
    pub fn write_current<C: Cursor + ?Sized>(&mut self, cursor: &C) -> Result<bool> {
        match cursor.node() {
            Some(node) => self.write_node(node),
            None => {
                warn!("Node-type not implemented: {}", NodeKind::None);
                Ok(false)
            }
        }
    }
}

/// Write every remaining position of `cursor`, starting with the current
/// one. Returns the number of nodes written.
pub fn copy_document<C, W>(cursor: &mut C, writer: &mut NodeWriter<W>) -> Result<usize>
where
    C: Cursor + ?Sized,
    W: Write,
{
    let mut written = 0;
    cursor.rewind()?;
    while cursor.valid() {
        if writer.write_current(cursor)? {
            written += 1;
        }
        cursor.advance()?;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::XmlCursor;
    use crate::node::Attribute;
    use crate::tokenizer::QuickXmlTokenizer;

    fn copy(xml: &str) -> String {
        let mut cursor = XmlCursor::new(QuickXmlTokenizer::from_xml(xml));
        let mut writer = NodeWriter::new(Vec::new());
        copy_document(&mut cursor, &mut writer).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn test_copy_round_trips_markup() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
                   <!DOCTYPE note>\n\
                   <note a=\"1 &amp; 2\"><!-- c --><?pi data?>\n  <to>Tove &lt;3</to><br/><![CDATA[<raw>]]></note>";
        assert_eq!(copy(xml), xml);
    }

    #[test]
    fn test_attribute_control_characters_are_preserved() {
        let mut writer = NodeWriter::new(Vec::new());
        let node = Node::element("a", 0, vec![Attribute::new("v", "1\t2\r\n")], true);
        assert!(writer.write_node(&node).unwrap());
        assert_eq!(writer.get_ref().as_slice(), br#"<a v="1&#9;2&#13;&#10;"/>"#);
    }

    #[test]
    fn test_unsupported_kind_is_skipped() {
        let mut writer = NodeWriter::new(Vec::new());
        let node = Node::new(NodeKind::EntityReference, "amp", 0);
        assert!(!writer.write_node(&node).unwrap());
        assert!(writer.get_ref().is_empty());
    }

    #[test]
    fn test_write_element_and_raw() {
        let mut offer = XmlElement::new("offer");
        offer.attributes.push(crate::tree::XmlAttribute::new("xml:lang", "en & de"));
        offer.insert_child(0, XmlElement::with_text("price", "<9"));
        offer.insert_child(1, XmlElement::new("sold"));

        let mut writer = NodeWriter::new(Vec::new());
        writer.write_element(&offer).unwrap();
        writer.write_raw("<!-- done -->").unwrap();
        assert_eq!(
            String::from_utf8(writer.into_inner()).unwrap(),
            r#"<offer xml:lang="en &amp; de"><price>&lt;9</price><sold/></offer><!-- done -->"#
        );
    }

    #[test]
    fn test_write_current_on_invalid_cursor() {
        let cursor = XmlCursor::new(QuickXmlTokenizer::from_xml("<a/>"));
        let mut writer = NodeWriter::new(Vec::new());
        assert!(!writer.write_current(&cursor).unwrap());
    }
}
