//! Marker location over flattened paragraph text.
//!
//! A visible citation like `[12]` can be split across any number of runs
//! by formatting boundaries, so matching happens on the logical text of a
//! paragraph (its run texts concatenated) with an explicit offset table
//! mapping logical positions back to physical run fragments. Matching is
//! never done against serialized markup.

use crate::document::{self, FieldBoundary};
use crate::report::SkipReason;
use docfield_xml::{XmlElement, XmlNode};
use regex::Regex;
use std::sync::LazyLock;

/// Bracketed candidates: `[` digit, then digits/commas/whitespace/hyphens.
/// Anything looser (e.g. `[see 3]`) is not a candidate and is never
/// touched or reported.
static CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([0-9][0-9,\s\-]*)\]").expect("candidate regex"));

/// One run's contribution to a paragraph's logical text.
#[derive(Debug, Clone)]
pub struct RunSpan {
    /// Index of the run in the paragraph's child list.
    pub child_idx: usize,
    /// Start offset of this run's text in the logical text.
    pub start: usize,
    /// End offset (exclusive) in the logical text.
    pub end: usize,
    /// Whether the run sits inside an existing field construct.
    pub in_field: bool,
}

/// A paragraph's logical text plus the offset table back to its runs.
#[derive(Debug, Clone)]
pub struct FlatParagraph {
    pub text: String,
    pub spans: Vec<RunSpan>,
}

/// A slice of a single run covered by a marker match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFragment {
    /// Index of the run in the paragraph's child list.
    pub child_idx: usize,
    /// Start offset within the run's own text.
    pub start: usize,
    /// End offset (exclusive) within the run's own text.
    pub end: usize,
}

/// A located citation marker, ready for synthesis.
#[derive(Debug, Clone)]
pub struct CitationMarker {
    /// Match range in the paragraph's logical text.
    pub start: usize,
    pub end: usize,
    /// The visible marker text, brackets included.
    pub raw_text: String,
    /// Cited ids in bracket order.
    pub ids: Vec<u32>,
    /// Physical run fragments covering the match, in document order.
    pub fragments: Vec<RunFragment>,
}

/// A candidate that was found but will not be synthesized.
#[derive(Debug, Clone)]
pub struct LocatorEvent {
    pub raw_text: String,
    pub reason: SkipReason,
}

/// Flatten a paragraph's runs into logical text with an offset table.
///
/// Field boundary runs contribute no text but toggle field containment:
/// every run from a `begin` boundary through the matching `end` is marked
/// `in_field`, which is what the idempotency gate keys on.
pub fn flatten_paragraph(paragraph: &XmlElement) -> FlatParagraph {
    let mut text = String::new();
    let mut spans = Vec::new();
    let mut field_depth: u32 = 0;

    for (child_idx, child) in paragraph.children.iter().enumerate() {
        let XmlNode::Element(el) = child else {
            continue;
        };
        if !document::is_run(el) {
            continue;
        }

        match document::field_boundary(el) {
            Some(FieldBoundary::Begin) => {
                field_depth += 1;
                continue;
            }
            Some(FieldBoundary::Separate) => continue,
            Some(FieldBoundary::End) => {
                field_depth = field_depth.saturating_sub(1);
                continue;
            }
            None => {}
        }

        let run_text = document::run_text(el);
        if run_text.is_empty() {
            continue;
        }

        let start = text.len();
        text.push_str(&run_text);
        spans.push(RunSpan {
            child_idx,
            start,
            end: text.len(),
            in_field: field_depth > 0,
        });
    }

    FlatParagraph { text, spans }
}

/// Locate citation markers in a flattened paragraph.
///
/// Returns markers in document order, plus events for candidates that
/// were rejected: malformed bracket content, or spans nested inside an
/// existing field construct.
pub fn locate_markers(flat: &FlatParagraph) -> (Vec<CitationMarker>, Vec<LocatorEvent>) {
    let mut markers = Vec::new();
    let mut events = Vec::new();

    for m in CANDIDATE.captures_iter(&flat.text) {
        let whole = m.get(0).expect("group 0");
        let raw_text = whole.as_str().to_string();

        let Some(ids) = parse_id_list(&m[1]) else {
            events.push(LocatorEvent {
                raw_text,
                reason: SkipReason::MalformedMarker,
            });
            continue;
        };

        let fragments = fragments_for(flat, whole.start(), whole.end());

        if covers_field_content(flat, whole.start(), whole.end()) {
            events.push(LocatorEvent {
                raw_text,
                reason: SkipReason::AlreadyInjected,
            });
            continue;
        }

        markers.push(CitationMarker {
            start: whole.start(),
            end: whole.end(),
            raw_text,
            ids,
            fragments,
        });
    }

    (markers, events)
}

/// Parse bracket content as a non-empty comma-separated integer list.
///
/// Range syntax (`1-3`) is deliberately not expanded: the upstream grammar
/// for ranges is unsettled, so anything containing `-` fails the strict
/// parse and surfaces as a malformed-marker event instead.
fn parse_id_list(content: &str) -> Option<Vec<u32>> {
    let mut ids = Vec::new();
    for part in content.split(',') {
        let part = part.trim();
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        ids.push(part.parse().ok()?);
    }
    if ids.is_empty() { None } else { Some(ids) }
}

/// Map a logical-text range to per-run fragments.
fn fragments_for(flat: &FlatParagraph, start: usize, end: usize) -> Vec<RunFragment> {
    flat.spans
        .iter()
        .filter(|span| span.start < end && span.end > start)
        .map(|span| RunFragment {
            child_idx: span.child_idx,
            start: start.saturating_sub(span.start).min(span.end - span.start),
            end: end.min(span.end) - span.start,
        })
        .collect()
}

/// Whether any run covered by the range sits inside an existing field.
fn covers_field_content(flat: &FlatParagraph, start: usize, end: usize) -> bool {
    flat.spans
        .iter()
        .any(|span| span.start < end && span.end > start && span.in_field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfield_xml::parse;

    fn paragraph(xml: &str) -> XmlElement {
        parse(xml).unwrap().root
    }

    fn run(text: &str) -> String {
        format!("<w:r><w:t>{}</w:t></w:r>", text)
    }

    #[test]
    fn test_single_run_marker() {
        let para = paragraph(&format!(
            r#"<w:p xmlns:w="ns">{}</w:p>"#,
            run("As shown in [3], results hold.")
        ));
        let flat = flatten_paragraph(&para);
        let (markers, events) = locate_markers(&flat);

        assert!(events.is_empty());
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].raw_text, "[3]");
        assert_eq!(markers[0].ids, vec![3]);
        assert_eq!(markers[0].fragments.len(), 1);
    }

    #[test]
    fn test_marker_split_across_runs() {
        // "[1," + "2]" split by a formatting boundary
        let para = paragraph(&format!(
            r#"<w:p xmlns:w="ns">{}{}{}</w:p>"#,
            run("see ["),
            run("1,"),
            run("2] here")
        ));
        let flat = flatten_paragraph(&para);
        assert_eq!(flat.text, "see [1,2] here");

        let (markers, _) = locate_markers(&flat);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].ids, vec![1, 2]);
        assert_eq!(
            markers[0].fragments,
            vec![
                RunFragment { child_idx: 0, start: 4, end: 5 },
                RunFragment { child_idx: 1, start: 0, end: 2 },
                RunFragment { child_idx: 2, start: 0, end: 2 },
            ]
        );
    }

    #[test]
    fn test_multi_id_order_preserved() {
        let para = paragraph(&format!(r#"<w:p xmlns:w="ns">{}</w:p>"#, run("[9, 1, 4]")));
        let (markers, _) = locate_markers(&flatten_paragraph(&para));
        assert_eq!(markers[0].ids, vec![9, 1, 4]);
    }

    #[test]
    fn test_non_numeric_bracket_ignored_silently() {
        let para = paragraph(&format!(r#"<w:p xmlns:w="ns">{}</w:p>"#, run("[sic] and [NOTE]")));
        let (markers, events) = locate_markers(&flatten_paragraph(&para));
        assert!(markers.is_empty());
        assert!(events.is_empty());
    }

    #[test]
    fn test_range_syntax_is_malformed() {
        let para = paragraph(&format!(r#"<w:p xmlns:w="ns">{}</w:p>"#, run("see [1-3]")));
        let (markers, events) = locate_markers(&flatten_paragraph(&para));

        assert!(markers.is_empty());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].raw_text, "[1-3]");
        assert_eq!(events[0].reason, SkipReason::MalformedMarker);
    }

    #[test]
    fn test_trailing_comma_is_malformed() {
        let para = paragraph(&format!(r#"<w:p xmlns:w="ns">{}</w:p>"#, run("[1,]")));
        let (markers, events) = locate_markers(&flatten_paragraph(&para));
        assert!(markers.is_empty());
        assert_eq!(events[0].reason, SkipReason::MalformedMarker);
    }

    #[test]
    fn test_marker_inside_field_reported_already_injected() {
        let para = paragraph(
            r#"<w:p xmlns:w="ns"><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:instrText xml:space="preserve"> ADDIN ZOTERO_ITEM </w:instrText></w:r><w:r><w:fldChar w:fldCharType="separate"/></w:r><w:r><w:t>[2]</w:t></w:r><w:r><w:fldChar w:fldCharType="end"/></w:r></w:p>"#,
        );
        let flat = flatten_paragraph(&para);
        // Display text is visible, so it flattens...
        assert_eq!(flat.text, "[2]");
        // ...but the idempotency gate rejects it.
        let (markers, events) = locate_markers(&flat);
        assert!(markers.is_empty());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].reason, SkipReason::AlreadyInjected);
    }

    #[test]
    fn test_text_after_field_still_matched() {
        let para = paragraph(&format!(
            r#"<w:p xmlns:w="ns"><w:r><w:fldChar w:fldCharType="begin"/></w:r><w:r><w:fldChar w:fldCharType="end"/></w:r>{}</w:p>"#,
            run("later [7]")
        ));
        let (markers, events) = locate_markers(&flatten_paragraph(&para));
        assert!(events.is_empty());
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].ids, vec![7]);
    }

    #[test]
    fn test_multiple_markers_in_document_order() {
        let para = paragraph(&format!(
            r#"<w:p xmlns:w="ns">{}</w:p>"#,
            run("a [1] b [2,3] c [4]")
        ));
        let (markers, _) = locate_markers(&flatten_paragraph(&para));
        let raw: Vec<&str> = markers.iter().map(|m| m.raw_text.as_str()).collect();
        assert_eq!(raw, vec!["[1]", "[2,3]", "[4]"]);
        assert!(markers.windows(2).all(|w| w[0].start < w[1].start));
    }
}
