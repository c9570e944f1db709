//! In-memory XML element tree.
//!
//! The encoder appends children to an [`Element`] and the decoder walks one.
//! [`Element::to_xml`] and [`Element::parse`] convert to and from text
//! through `quick-xml`.

use std::borrow::Cow;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::codec::EncodeOptions;
use crate::error::{DecodeError, EncodeError};
use crate::limits::MAX_ELEMENT_DEPTH;

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An XML element with qualified names, attributes in insertion order and
/// mixed content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Creates an element with the given qualified name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Returns the qualified name as written.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the part of the name after any prefix.
    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    /// Sets an attribute, replacing an existing one with the same name.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
        self
    }

    /// Returns the value of an attribute by qualified name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates attributes as `(qualified name, value)` in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Declares a namespace on this element. `None` declares the default
    /// namespace. Returns false if the prefix was already declared.
    pub fn add_namespace(&mut self, prefix: Option<&str>, uri: &str) -> bool {
        let name = match prefix {
            Some(p) => format!("xmlns:{p}"),
            None => "xmlns".to_string(),
        };
        if self.attribute(&name).is_some() {
            return false;
        }
        self.attributes.push((name, uri.to_string()));
        true
    }

    /// Iterates the namespace declarations of this element as
    /// `(prefix, uri)`; the default namespace has an empty prefix.
    pub fn namespace_declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes().filter_map(|(name, uri)| {
            if name == "xmlns" {
                Some(("", uri))
            } else {
                name.strip_prefix("xmlns:").map(|p| (p, uri))
            }
        })
    }

    /// Appends a new child element and returns it.
    pub fn add_child(&mut self, name: impl Into<String>) -> &mut Element {
        self.push_child(Element::new(name))
    }

    /// Appends an existing element as a child and returns it.
    pub fn push_child(&mut self, child: Element) -> &mut Element {
        self.children.push(Node::Element(child));
        match self.children.last_mut() {
            Some(Node::Element(el)) => el,
            _ => unreachable!("an element was just pushed"),
        }
    }

    /// Appends a text node.
    pub fn add_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Replaces all text children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.children.retain(|n| matches!(n, Node::Element(_)));
        self.add_text(text)
    }

    /// Returns the concatenated direct text content.
    pub fn text(&self) -> Cow<'_, str> {
        let mut texts = self.children.iter().filter_map(|n| match n {
            Node::Text(t) => Some(t.as_str()),
            Node::Element(_) => None,
        });
        match (texts.next(), texts.next()) {
            (None, _) => Cow::Borrowed(""),
            (Some(first), None) => Cow::Borrowed(first),
            (Some(first), Some(second)) => {
                let mut joined = String::from(first);
                joined.push_str(second);
                texts.for_each(|t| joined.push_str(t));
                Cow::Owned(joined)
            }
        }
    }

    /// Returns all child nodes.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Iterates child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(el) => Some(el),
            Node::Text(_) => None,
        })
    }

    /// Returns the first child element with the given local name.
    pub fn find_child(&self, local_name: &str) -> Option<&Element> {
        self.child_elements().find(|el| el.local_name() == local_name)
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Serializes this element as a document.
    pub fn to_xml(&self, options: &EncodeOptions) -> Result<String, EncodeError> {
        let mut writer = match options.indent {
            Some(size) => Writer::new_with_indent(Vec::new(), b' ', size),
            None => Writer::new(Vec::new()),
        };

        if options.xml_declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
                .map_err(|e| EncodeError::Xml(e.to_string()))?;
        }
        write_element(&mut writer, self)?;

        String::from_utf8(writer.into_inner()).map_err(|e| EncodeError::Xml(e.to_string()))
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    /// Parses a document and returns its root element.
    pub fn parse(xml: &str) -> Result<Element, DecodeError> {
        Self::parse_with_depth(xml, MAX_ELEMENT_DEPTH)
    }

    /// Parses a document, rejecting nesting deeper than `max_depth`.
    pub fn parse_with_depth(xml: &str, max_depth: usize) -> Result<Element, DecodeError> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let position = reader.buffer_position() as u64;
            let syntax = |message: String| DecodeError::Xml { position, message };

            let event = reader.read_event().map_err(|e| syntax(e.to_string()))?;
            match event {
                Event::Start(start) => {
                    if stack.len() >= max_depth {
                        return Err(DecodeError::LimitExceeded {
                            location: path_of(&stack),
                            limit: "element depth",
                            max: max_depth,
                        });
                    }
                    stack.push(start_to_element(&start).map_err(syntax)?);
                }
                Event::Empty(start) => {
                    let el = start_to_element(&start).map_err(syntax)?;
                    attach(&mut stack, &mut root, el).map_err(syntax)?;
                }
                Event::End(_) => {
                    let el = stack
                        .pop()
                        .ok_or_else(|| syntax("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, el).map_err(syntax)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(|e| syntax(e.to_string()))?;
                    add_text(&mut stack, &text).map_err(syntax)?;
                }
                Event::CData(cdata) => {
                    let bytes = cdata.into_inner();
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|_| syntax("CDATA section is not valid UTF-8".to_string()))?;
                    add_text(&mut stack, text).map_err(syntax)?;
                }
                Event::Eof => break,
                // Declaration, comments, processing instructions, doctype
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(DecodeError::Xml {
                position: reader.buffer_position() as u64,
                message: format!("unclosed element <{}>", stack[stack.len() - 1].name),
            });
        }
        root.ok_or_else(|| DecodeError::Xml {
            position: 0,
            message: "document has no root element".to_string(),
        })
    }
}

/// Splits a qualified name into `(prefix, local)`.
pub(crate) fn split_qname(name: &str) -> (Option<&str>, &str) {
    match name.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

/// Escapes character data. CR is written as a character reference so that
/// end-of-line normalization in the reading parser leaves it intact.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escapes an attribute value. TAB, LF and CR become character references,
/// which attribute-value normalization does not replace with spaces.
fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
    out
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &Element) -> Result<(), EncodeError> {
    let mut start = BytesStart::new(el.name.as_str());
    for (name, value) in &el.attributes {
        let value = escape_attribute(value);
        start.push_attribute((name.as_bytes(), value.as_bytes()));
    }

    if el.children.is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| EncodeError::Xml(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| EncodeError::Xml(e.to_string()))?;
    for child in &el.children {
        match child {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(text) => writer
                .write_event(Event::Text(BytesText::from_escaped(escape_text(text))))
                .map_err(|e| EncodeError::Xml(e.to_string()))?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(el.name.as_str())))
        .map_err(|e| EncodeError::Xml(e.to_string()))
}

fn start_to_element(start: &BytesStart<'_>) -> Result<Element, String> {
    let qname = start.name();
    let name = std::str::from_utf8(qname.as_ref())
        .map_err(|_| "element name is not valid UTF-8".to_string())?;
    let mut el = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|_| "attribute name is not valid UTF-8".to_string())?;
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        el.attributes.push((key.to_string(), value.into_owned()));
    }
    Ok(el)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Element(el));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(el);
            Ok(())
        }
        None => Err("document has more than one root element".to_string()),
    }
}

fn add_text(stack: &mut [Element], text: &str) -> Result<(), String> {
    match stack.last_mut() {
        Some(parent) => {
            // Adjacent text and CDATA events form one text node.
            if let Some(Node::Text(prev)) = parent.children.last_mut() {
                prev.push_str(text);
            } else {
                parent.children.push(Node::Text(text.to_string()));
            }
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err("text outside the root element".to_string()),
    }
}

fn path_of(stack: &[Element]) -> String {
    stack.iter().map(Element::local_name).collect::<Vec<_>>().join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_serialize() {
        let mut root = Element::new("batchRequest");
        root.add_namespace(None, "urn:example");
        root.add_child("delRequest").set_attribute("dn", "cn=a&b");
        root.add_child("note").add_text("1 < 2");

        let xml = root.to_xml(&EncodeOptions::default()).unwrap();
        assert_eq!(
            xml,
            r#"<batchRequest xmlns="urn:example"><delRequest dn="cn=a&amp;b"/><note>1 &lt; 2</note></batchRequest>"#
        );
    }

    #[test]
    fn test_parse_roundtrip() {
        let xml = r#"<?xml version="1.0"?>
            <!-- comment -->
            <a x="1" p:y="2"><b>text<![CDATA[ & more]]></b><c/></a>"#;
        let root = Element::parse(xml).unwrap();
        assert_eq!(root.name(), "a");
        assert_eq!(root.attribute("p:y"), Some("2"));

        let b = root.find_child("b").unwrap();
        assert_eq!(b.text(), "text & more");
        assert!(root.find_child("c").unwrap().children().is_empty());
    }

    #[test]
    fn test_pretty_output_keeps_text_exact() {
        let mut root = Element::new("a");
        root.add_child("value").add_text("alice");
        let xml = root.to_xml(&EncodeOptions::pretty()).unwrap();
        assert!(xml.contains("<value>alice</value>"));

        let reparsed = Element::parse(&xml).unwrap();
        assert_eq!(reparsed.find_child("value").unwrap().text(), "alice");
    }

    #[test]
    fn test_carriage_return_written_as_reference() {
        let mut root = Element::new("a");
        root.add_child("value").add_text("a\r\nb");
        let xml = root.to_xml(&EncodeOptions::default()).unwrap();
        assert_eq!(xml, "<a><value>a&#13;\nb</value></a>");
        assert!(!xml.contains('\r'));

        let reparsed = Element::parse(&xml).unwrap();
        assert_eq!(reparsed.find_child("value").unwrap().text(), "a\r\nb");
    }

    #[test]
    fn test_attribute_whitespace_written_as_reference() {
        let mut root = Element::new("a");
        root.set_attribute("dn", "cn=x\ty\nz\r\"q\"");
        let xml = root.to_xml(&EncodeOptions::default()).unwrap();
        assert_eq!(xml, r#"<a dn="cn=x&#9;y&#10;z&#13;&quot;q&quot;"/>"#);

        let reparsed = Element::parse(&xml).unwrap();
        assert_eq!(reparsed.attribute("dn"), Some("cn=x\ty\nz\r\"q\""));
    }

    #[test]
    fn test_namespace_declared_once() {
        let mut root = Element::new("r");
        assert!(root.add_namespace(Some("xsi"), "urn:xsi"));
        assert!(!root.add_namespace(Some("xsi"), "urn:xsi"));
        let decls: Vec<_> = root.namespace_declarations().collect();
        assert_eq!(decls, [("xsi", "urn:xsi")]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Element::parse(""), Err(DecodeError::Xml { .. })));
        assert!(matches!(Element::parse("<a><b></a>"), Err(DecodeError::Xml { .. })));
        assert!(matches!(Element::parse("<a/><b/>"), Err(DecodeError::Xml { .. })));
        assert!(matches!(Element::parse("<a>"), Err(DecodeError::Xml { .. })));
    }

    #[test]
    fn test_depth_limit() {
        let xml = "<a><a><a><a/></a></a></a>";
        assert!(Element::parse_with_depth(xml, 8).is_ok());
        let err = Element::parse_with_depth(xml, 2).unwrap_err();
        assert!(matches!(err, DecodeError::LimitExceeded { max: 2, .. }));
    }
}
