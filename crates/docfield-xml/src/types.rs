//! Core types for the mutable XML tree.

/// A parsed XML document.
///
/// Holds the root element plus the original XML declaration (if the source
/// had one) and any document-level whitespace or comments around the root,
/// so serialization can reproduce all of them verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    /// The root element of the document.
    pub root: XmlElement,

    /// The raw XML declaration, e.g. `<?xml version="1.0"?>`, if present.
    pub declaration: Option<String>,

    /// Raw content between the declaration and the root start tag
    /// (whitespace and comments).
    pub leading: String,

    /// Raw content after the root end tag.
    pub trailing: String,
}

/// An XML element with namespace prefix, attributes, and ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Namespace prefix, if any (e.g. "w" in `<w:p>`).
    pub prefix: Option<String>,

    /// The local name of the element (without namespace prefix).
    pub name: String,

    /// Attributes in source order.
    pub attributes: Vec<XmlAttribute>,

    /// Child nodes in source order.
    pub children: Vec<XmlNode>,

    /// When the element has no children, whether it serializes as `<x/>`
    /// rather than `<x></x>`. Parsed elements keep the source form.
    pub self_closing: bool,
}

/// A single child node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// A child element.
    Element(XmlElement),

    /// Text content (after unescaping XML entities).
    Text(String),

    /// A comment, preserved verbatim (without the `<!--`/`-->` delimiters).
    Comment(String),
}

/// An XML attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Namespace prefix, if any.
    pub prefix: Option<String>,

    /// The local name of the attribute.
    pub name: String,

    /// The attribute value (after unescaping XML entities).
    pub value: String,
}

impl XmlElement {
    /// Create a new element with no attributes or children.
    pub fn new(prefix: Option<&str>, name: &str) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: true,
        }
    }

    /// The qualified name as it appears in source (`w:p` or `body`).
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.name),
            None => self.name.clone(),
        }
    }

    /// Whether this element has the given namespace prefix and local name.
    pub fn is_named(&self, prefix: &str, name: &str) -> bool {
        self.prefix.as_deref() == Some(prefix) && self.name == name
    }

    /// Get an attribute value by local name.
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute, replacing an existing one with the same
    /// prefix/name or appending a new one.
    pub fn set_attribute(&mut self, prefix: Option<&str>, name: &str, value: &str) {
        let existing = self
            .attributes
            .iter_mut()
            .find(|a| a.prefix.as_deref() == prefix && a.name == name);
        match existing {
            Some(attr) => attr.value = value.to_string(),
            None => self.attributes.push(XmlAttribute {
                prefix: prefix.map(str::to_string),
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, prefix: Option<&str>, name: &str, value: &str) -> Self {
        self.set_attribute(prefix, name, value);
        self
    }

    /// Builder-style child appender.
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Builder-style text appender.
    pub fn with_text(mut self, text: &str) -> Self {
        self.children.push(XmlNode::Text(text.to_string()));
        self
    }

    /// Get child elements by local name.
    pub fn get_children(&self, name: &str) -> Vec<&XmlElement> {
        self.child_elements().filter(|e| e.name == name).collect()
    }

    /// Find the first child element with the given local name.
    pub fn find_child(&self, name: &str) -> Option<&XmlElement> {
        self.child_elements().find(|e| e.name == name)
    }

    /// Find the first child element with the given local name, mutably.
    pub fn find_child_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find_map(|c| match c {
            XmlNode::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    /// Iterate over all child elements, skipping text and comments.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// Concatenated text of all direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                XmlNode::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl XmlNode {
    /// View this node as an element, if it is one.
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(e) => Some(e),
            _ => None,
        }
    }

    /// View this node as an element, mutably.
    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(e) => Some(e),
            _ => None,
        }
    }
}
