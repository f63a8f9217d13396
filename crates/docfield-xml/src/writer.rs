//! Serialization of XmlDocument trees back to XML text.

use crate::{XmlDocument, XmlElement, XmlNode};

/// Serialize a document to an XML string.
///
/// The original XML declaration and document-level whitespace (if any) are
/// reproduced verbatim; element and attribute order follow the tree; empty
/// elements keep their source form (`<x/>` vs `<x></x>`); escaping is
/// canonical, so a parse/serialize cycle with no intervening edits is
/// stable under repetition.
pub fn serialize(doc: &XmlDocument) -> String {
    let mut out = String::new();
    if let Some(decl) = &doc.declaration {
        out.push_str(decl);
    }
    out.push_str(&doc.leading);
    write_element(&doc.root, &mut out);
    out.push_str(&doc.trailing);
    out
}

fn write_element(element: &XmlElement, out: &mut String) {
    out.push('<');
    push_qname(element, out);

    for attr in &element.attributes {
        out.push(' ');
        if let Some(prefix) = &attr.prefix {
            out.push_str(prefix);
            out.push(':');
        }
        out.push_str(&attr.name);
        out.push_str("=\"");
        push_escaped_attr(&attr.value, out);
        out.push('"');
    }

    if element.children.is_empty() && element.self_closing {
        out.push_str("/>");
        return;
    }

    out.push('>');
    for child in &element.children {
        match child {
            XmlNode::Element(e) => write_element(e, out),
            XmlNode::Text(t) => push_escaped_text(t, out),
            XmlNode::Comment(c) => {
                out.push_str("<!--");
                out.push_str(c);
                out.push_str("-->");
            }
        }
    }
    out.push_str("</");
    push_qname(element, out);
    out.push('>');
}

fn push_qname(element: &XmlElement, out: &mut String) {
    if let Some(prefix) = &element.prefix {
        out.push_str(prefix);
        out.push(':');
    }
    out.push_str(&element.name);
}

fn push_escaped_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn push_escaped_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
