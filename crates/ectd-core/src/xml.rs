//! # Structured XML Builder
//!
//! Index manifests and regional envelopes are built as trees of
//! [`XmlElement`] and serialized by a single canonical writer. The writer
//! fixes the byte-level contract the gateway diffs against:
//!
//! - declaration `<?xml version='1.0' encoding='utf-8'?>` followed by one
//!   `\n`, then the root element, with no trailing newline;
//! - no indentation and no whitespace between elements;
//! - attributes in insertion order, double-quoted;
//! - childless elements written as `<name />`;
//! - text escapes `&`, `<`, `>`; attribute values additionally escape `"`,
//!   newline, carriage return, and tab as character references.

use std::borrow::Cow;

use quick_xml::escape::partial_escape;

/// A node in an XML tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// A nested element.
    Element(XmlElement),
    /// Character data.
    Text(String),
}

/// An element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Append an attribute. Order of calls is the serialized order.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    /// Append a child element.
    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Append character data.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Append a child element in place.
    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Convenience: `<name>text</name>`.
    pub fn text_element(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).text(text)
    }

    /// The element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attributes in serialized order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Child nodes in serialized order.
    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Serialize this element (without declaration) onto `out`.
    pub fn write_to(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape_attribute(value));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str(" />");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                XmlNode::Element(e) => e.write_to(out),
                XmlNode::Text(t) => out.push_str(&partial_escape(t.as_str())),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// A complete XML document: declaration plus root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: XmlElement,
}

impl XmlDocument {
    /// The declaration line emitted ahead of every root element.
    pub const DECLARATION: &'static str = "<?xml version='1.0' encoding='utf-8'?>";

    /// Wrap a root element.
    pub fn new(root: XmlElement) -> Self {
        Self { root }
    }

    /// The root element.
    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Serialize with the canonical declaration.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::with_capacity(256);
        out.push_str(Self::DECLARATION);
        out.push('\n');
        self.root.write_to(&mut out);
        out
    }
}

fn escape_attribute(value: &str) -> Cow<'_, str> {
    let escaped = partial_escape(value);
    if !escaped.contains(['"', '\n', '\r', '\t']) {
        return escaped;
    }
    Cow::Owned(
        escaped
            .replace('"', "&quot;")
            .replace('\n', "&#10;")
            .replace('\r', "&#13;")
            .replace('\t', "&#09;"),
    )
}
