//! Small helpers for producing tag markup.

use crate::node::Attribute;

/// Escape an attribute value for a double-quoted attribute.
///
/// Carriage returns, line feeds and tabs become character references so they
/// survive attribute-value normalization when the markup is parsed again.
pub fn escape_attribute_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            '\r' => out.push_str("&#13;"),
            '\n' => out.push_str("&#10;"),
            '\t' => out.push_str("&#9;"),
            _ => out.push(ch),
        }
    }
    out
}

/// ` a="1" b="2"` for the given attributes, with a leading space per attribute.
pub fn attribute_list(attributes: &[Attribute]) -> String {
    attributes
        .iter()
        .map(|attr| format!(" {}=\"{}\"", attr.name, escape_attribute_value(&attr.value)))
        .collect()
}

pub fn start_tag(name: &str, attributes: &[Attribute], self_closing: bool) -> String {
    let close = if self_closing { "/>" } else { ">" };
    format!("<{name}{}{close}", attribute_list(attributes))
}

pub fn end_tag(name: &str) -> String {
    format!("</{name}>")
}

/// Wrap `inner` in an element; an empty `inner` gives a self-closing tag,
/// otherwise every line of `inner` is indented by two spaces.
pub fn wrap(name: &str, attributes: &[Attribute], inner: &str) -> String {
    if inner.is_empty() {
        return start_tag(name, attributes, true);
    }
    let mut out = start_tag(name, attributes, false);
    out.push('\n');
    for line in inner.lines() {
        if !line.is_empty() {
            out.push_str("  ");
            out.push_str(line);
        }
        out.push('\n');
    }
    out.push_str(&end_tag(name));
    out
}
