//! XML parser that builds mutable XmlDocument trees.

use crate::{Error, Result, XmlAttribute, XmlDocument, XmlElement, XmlNode};
use quick_xml::Reader;
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};

/// Parse XML from a string, producing an [`XmlDocument`] tree.
///
/// All text nodes are preserved, including whitespace-only text between
/// elements; this is what allows a serialized edit to leave untouched
/// regions of the document unchanged.
///
/// # Example
///
/// ```rust
/// use docfield_xml::parse;
///
/// let doc = parse("<root><child/></root>").unwrap();
/// assert_eq!(doc.root.name, "root");
/// ```
///
/// # Errors
///
/// Returns an error if the XML is malformed or if parsing fails.
pub fn parse(content: &str) -> Result<XmlDocument> {
    let mut parser = XmlParser::new(content);
    parser.parse()
}

/// Internal parser state.
struct XmlParser<'a> {
    /// The source content being parsed.
    source: &'a str,

    /// The quick-xml reader.
    reader: Reader<&'a [u8]>,

    /// Stack of elements being built.
    stack: Vec<XmlElement>,
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            source,
            reader,
            stack: Vec::new(),
        }
    }

    fn parse(&mut self) -> Result<XmlDocument> {
        let mut root: Option<XmlElement> = None;
        let mut declaration: Option<String> = None;
        let mut leading = String::new();
        let mut trailing = String::new();

        loop {
            // Capture position before reading the event
            let event_start = self.reader.buffer_position() as usize;

            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    let element = self.open_element(&e)?;
                    self.stack.push(element);
                }
                Ok(Event::End(e)) => {
                    let element = self.close_element(&e)?;
                    self.attach(element, &mut root)?;
                }
                Ok(Event::Empty(e)) => {
                    let element = self.open_element(&e)?;
                    self.attach(element, &mut root)?;
                }
                Ok(Event::Text(e)) => {
                    if self.stack.is_empty() {
                        // Document-level text (whitespace around the root)
                        // is kept so a rewrite reproduces it.
                        let text = e.unescape().map_err(|err| Error::XmlSyntax {
                            message: format!("Invalid text content: {}", err),
                            position: Some(event_start as u64),
                        })?;
                        let target = if root.is_some() { &mut trailing } else { &mut leading };
                        target.push_str(&text);
                    } else {
                        self.handle_text(e, event_start)?;
                    }
                }
                Ok(Event::CData(e)) => {
                    self.handle_cdata(e)?;
                }
                Ok(Event::Comment(e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    match self.stack.last_mut() {
                        Some(node) => node.children.push(XmlNode::Comment(text)),
                        None => {
                            let target = if root.is_some() { &mut trailing } else { &mut leading };
                            target.push_str("<!--");
                            target.push_str(&text);
                            target.push_str("-->");
                        }
                    }
                }
                Ok(Event::Decl(_)) => {
                    // Keep the declaration verbatim so serialization can
                    // reproduce it byte for byte.
                    let end = self.reader.buffer_position() as usize;
                    declaration = Some(self.source[event_start..end].to_string());
                }
                Ok(Event::PI(_) | Event::DocType(_)) => {
                    // Processing instructions and DOCTYPE do not occur in
                    // WordprocessingML part files; skip them.
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlSyntax {
                        message: e.to_string(),
                        position: Some(self.reader.error_position()),
                    });
                }
            }
        }

        // Check for unclosed elements
        if let Some(node) = self.stack.last() {
            return Err(Error::UnexpectedEof {
                expected: format!("closing tag </{}>", node.qualified_name()),
            });
        }

        let root = root.ok_or(Error::EmptyDocument)?;

        Ok(XmlDocument {
            root,
            declaration,
            leading,
            trailing,
        })
    }

    /// Add a completed element to its parent, or make it the root.
    fn attach(&mut self, element: XmlElement, root: &mut Option<XmlElement>) -> Result<()> {
        match self.stack.last_mut() {
            Some(parent) => {
                parent.children.push(XmlNode::Element(element));
                Ok(())
            }
            None => {
                if root.is_some() {
                    return Err(Error::MultipleRoots);
                }
                *root = Some(element);
                Ok(())
            }
        }
    }

    fn open_element(&self, e: &BytesStart<'_>) -> Result<XmlElement> {
        let (name, prefix) = split_name(e.name().as_ref());
        let attributes = self.parse_attributes(e)?;

        Ok(XmlElement {
            prefix,
            name,
            attributes,
            children: Vec::new(),
            self_closing: true,
        })
    }

    fn close_element(&mut self, e: &BytesEnd<'_>) -> Result<XmlElement> {
        let (end_name, _) = split_name(e.name().as_ref());

        let mut node = self.stack.pop().ok_or_else(|| Error::InvalidStructure {
            message: format!("Unexpected closing tag </{}>", end_name),
        })?;

        // This element came from a start/end tag pair, so if it turned out
        // empty it must be re-emitted as `<x></x>`, not `<x/>`.
        node.self_closing = false;

        // Verify tag names match
        if node.name != end_name {
            return Err(Error::MismatchedEndTag {
                expected: node.qualified_name(),
                found: end_name,
            });
        }

        Ok(node)
    }

    fn handle_text(&mut self, e: BytesText<'_>, event_start: usize) -> Result<()> {
        let text = e.unescape().map_err(|err| Error::XmlSyntax {
            message: format!("Invalid text content: {}", err),
            position: Some(event_start as u64),
        })?;

        if let Some(node) = self.stack.last_mut() {
            node.children.push(XmlNode::Text(text.into_owned()));
        }
        Ok(())
    }

    fn handle_cdata(&mut self, e: BytesCData<'_>) -> Result<()> {
        let text = String::from_utf8_lossy(e.as_ref()).into_owned();
        if let Some(node) = self.stack.last_mut() {
            node.children.push(XmlNode::Text(text));
        }
        Ok(())
    }

    fn parse_attributes(&self, e: &BytesStart<'_>) -> Result<Vec<XmlAttribute>> {
        let mut attributes = Vec::new();

        for attr_result in e.attributes() {
            let attr = attr_result?;
            let (name, prefix) = split_name(attr.key.as_ref());

            let value = attr.unescape_value().map_err(|err| Error::XmlSyntax {
                message: format!("Invalid attribute value: {}", err),
                position: None,
            })?;

            attributes.push(XmlAttribute {
                prefix,
                name,
                value: value.into_owned(),
            });
        }

        Ok(attributes)
    }
}

/// Split a qualified name into (local name, prefix).
fn split_name(raw: &[u8]) -> (String, Option<String>) {
    let full = String::from_utf8_lossy(raw);
    match full.find(':') {
        Some(pos) => (full[pos + 1..].to_string(), Some(full[..pos].to_string())),
        None => (full.into_owned(), None),
    }
}
