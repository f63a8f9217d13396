//! WordprocessingML view over the generic XML tree.
//!
//! Paragraphs and runs are addressed by child index rather than by
//! reference, so the rest of the engine can record positions, drop the
//! borrow, and come back to mutate.

use crate::{Error, Result};
use docfield_xml::{XmlDocument, XmlElement, XmlNode};

/// The WordprocessingML namespace prefix used for injected elements.
pub const W: &str = "w";

/// Role of a `w:fldChar` boundary element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldBoundary {
    Begin,
    Separate,
    End,
}

impl FieldBoundary {
    /// The `w:fldCharType` attribute value.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldBoundary::Begin => "begin",
            FieldBoundary::Separate => "separate",
            FieldBoundary::End => "end",
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "begin" => Some(FieldBoundary::Begin),
            "separate" => Some(FieldBoundary::Separate),
            "end" => Some(FieldBoundary::End),
            _ => None,
        }
    }
}

/// Get the document body element.
pub fn body(doc: &XmlDocument) -> Result<&XmlElement> {
    doc.root.find_child("body").ok_or(Error::MissingBody)
}

/// Get the document body element, mutably.
pub fn body_mut(doc: &mut XmlDocument) -> Result<&mut XmlElement> {
    doc.root.find_child_mut("body").ok_or(Error::MissingBody)
}

/// Child-index paths from the body to every paragraph, in document order.
///
/// Descends into containers such as tables (`w:tbl/w:tr/w:tc`), where
/// manuscripts also cite; does not descend into paragraphs themselves. A
/// body-level paragraph has a single-element path.
pub fn paragraph_paths(body: &XmlElement) -> Vec<Vec<usize>> {
    let mut paths = Vec::new();
    let mut prefix = Vec::new();
    collect_paragraphs(body, &mut prefix, &mut paths);
    paths
}

fn collect_paragraphs(el: &XmlElement, prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    for (idx, child) in el.children.iter().enumerate() {
        let XmlNode::Element(e) = child else {
            continue;
        };
        prefix.push(idx);
        if e.name == "p" {
            out.push(prefix.clone());
        } else {
            collect_paragraphs(e, prefix, out);
        }
        prefix.pop();
    }
}

/// Resolve a paragraph path produced by [`paragraph_paths`].
pub fn paragraph_at<'a>(body: &'a XmlElement, path: &[usize]) -> &'a XmlElement {
    let mut el = body;
    for &idx in path {
        el = el.children[idx].as_element().expect("paragraph path");
    }
    el
}

/// Resolve a paragraph path, mutably.
pub fn paragraph_at_mut<'a>(body: &'a mut XmlElement, path: &[usize]) -> &'a mut XmlElement {
    let mut el = body;
    for &idx in path {
        el = el.children[idx].as_element_mut().expect("paragraph path");
    }
    el
}

/// Whether an element is a text run.
pub fn is_run(el: &XmlElement) -> bool {
    el.name == "r"
}

/// Visible text of a run: the concatenation of its `w:t` children.
pub fn run_text(run: &XmlElement) -> String {
    run.get_children("t").iter().map(|t| t.text()).collect()
}

/// The run's formatting properties element, if present.
pub fn run_properties(run: &XmlElement) -> Option<&XmlElement> {
    run.find_child("rPr")
}

/// If the run is a field boundary (`w:fldChar`), its role.
pub fn field_boundary(run: &XmlElement) -> Option<FieldBoundary> {
    let fld = run.find_child("fldChar")?;
    FieldBoundary::from_str(fld.get_attribute("fldCharType")?)
}

/// The run's instruction text (`w:instrText`), if it carries one.
pub fn instruction_text(run: &XmlElement) -> Option<String> {
    run.find_child("instrText").map(|el| el.text())
}

/// A run whose shape the field transform understands: an optional leading
/// `w:rPr` followed by exactly one `w:t`, nothing else.
pub fn has_simple_shape(run: &XmlElement) -> bool {
    let elements: Vec<&XmlElement> = run.child_elements().collect();
    match elements.as_slice() {
        [t] => t.name == "t",
        [rpr, t] => rpr.name == "rPr" && t.name == "t",
        _ => false,
    }
}

/// Build a bare field boundary run (no formatting properties, only the
/// structural role).
pub fn make_boundary_run(boundary: FieldBoundary) -> XmlElement {
    XmlElement::new(Some(W), "r").with_child(
        XmlElement::new(Some(W), "fldChar").with_attribute(Some(W), "fldCharType", boundary.as_str()),
    )
}

/// Build an instruction run carrying the payload verbatim, padded with
/// single spaces the way reference managers emit it.
pub fn make_instruction_run(instruction: &str) -> XmlElement {
    XmlElement::new(Some(W), "r").with_child(
        XmlElement::new(Some(W), "instrText")
            .with_attribute(Some("xml"), "space", "preserve")
            .with_text(&format!(" {} ", instruction)),
    )
}

/// Build a visible text run, cloning the given formatting properties.
///
/// `xml:space="preserve"` is set when the text has leading or trailing
/// whitespace, so the consumer application does not strip it.
pub fn make_text_run(text: &str, properties: Option<&XmlElement>) -> XmlElement {
    let mut run = XmlElement::new(Some(W), "r");
    if let Some(rpr) = properties {
        run.children.push(XmlNode::Element(rpr.clone()));
    }

    let mut t = XmlElement::new(Some(W), "t");
    if text.starts_with(' ') || text.ends_with(' ') {
        t.set_attribute(Some("xml"), "space", "preserve");
    }
    run.children.push(XmlNode::Element(t.with_text(text)));
    run
}

/// Visible text of the whole document: every `w:t` in document order,
/// excluding instruction payloads (which are not `w:t` elements).
pub fn visible_text(doc: &XmlDocument) -> String {
    let mut out = String::new();
    collect_visible(&doc.root, &mut out);
    out
}

fn collect_visible(el: &XmlElement, out: &mut String) {
    if el.name == "t" {
        out.push_str(&el.text());
        return;
    }
    for child in el.child_elements() {
        collect_visible(child, out);
    }
}
