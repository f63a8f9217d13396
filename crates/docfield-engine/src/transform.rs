//! Splicing marker spans into field constructs.
//!
//! For each synthesized marker the covered run range is replaced by:
//! optional leading text, begin boundary, instruction run, separate
//! boundary, display run (original text, original formatting), end
//! boundary, optional trailing text. Boundary runs are bare.
//!
//! Edits within a paragraph are applied in reverse document order purely
//! so that fragment offsets computed up front stay valid while the child
//! list grows; the resulting tree does not depend on input order.

use crate::document::{self, FieldBoundary};
use crate::locator::CitationMarker;
use crate::report::SkipReason;
use docfield_xml::{XmlElement, XmlNode};
use tracing::debug;

/// A marker paired with its synthesized instruction payload.
#[derive(Debug, Clone)]
pub struct SynthesizedMarker {
    pub marker: CitationMarker,
    pub instruction: String,
}

/// Inject all synthesized markers into one paragraph.
///
/// All-or-nothing per paragraph: every marker's span is validated against
/// the run structure before any edit is made. If any span covers a run
/// shape the transform does not understand, the paragraph is left
/// completely unmodified and `UnsupportedSpanStructure` is returned.
///
/// On success, returns the number of constructs injected.
pub fn inject_into_paragraph(
    paragraph: &mut XmlElement,
    markers: &[SynthesizedMarker],
) -> Result<usize, SkipReason> {
    if markers.is_empty() {
        return Ok(0);
    }

    for sm in markers {
        validate_span(paragraph, &sm.marker)?;
    }

    // Reverse document order keeps earlier fragment offsets valid.
    let mut ordered: Vec<&SynthesizedMarker> = markers.iter().collect();
    ordered.sort_by(|a, b| b.marker.start.cmp(&a.marker.start));

    for sm in &ordered {
        apply_marker(paragraph, &sm.marker, &sm.instruction);
        debug!(marker = %sm.marker.raw_text, "injected citation field");
    }

    Ok(ordered.len())
}

/// Check that a marker's span covers only simple text runs, with no
/// foreign element or boundary interposed inside the span.
fn validate_span(paragraph: &XmlElement, marker: &CitationMarker) -> Result<(), SkipReason> {
    let Some(first) = marker.fragments.first() else {
        return Err(SkipReason::UnsupportedSpanStructure);
    };
    let last = marker.fragments.last().expect("non-empty fragments");

    let mut fragment_iter = marker.fragments.iter();
    for idx in first.child_idx..=last.child_idx {
        let run = paragraph
            .children
            .get(idx)
            .and_then(XmlNode::as_element)
            .filter(|el| document::is_run(el));

        let Some(run) = run else {
            return Err(SkipReason::UnsupportedSpanStructure);
        };

        // Every child in the covered range must be one of the match's own
        // fragments; an uncovered run (field boundary, empty run) sitting
        // inside the span is a structure we refuse to edit.
        match fragment_iter.next() {
            Some(frag) if frag.child_idx == idx => {}
            _ => return Err(SkipReason::UnsupportedSpanStructure),
        }

        if !document::has_simple_shape(run) {
            return Err(SkipReason::UnsupportedSpanStructure);
        }
    }

    Ok(())
}

/// Replace the marker's covered runs with the field construct sequence.
fn apply_marker(paragraph: &mut XmlElement, marker: &CitationMarker, instruction: &str) {
    let first = marker.fragments.first().expect("validated non-empty");
    let last = marker.fragments.last().expect("validated non-empty");

    let first_run = paragraph.children[first.child_idx]
        .as_element()
        .expect("validated run");
    let last_run = paragraph.children[last.child_idx]
        .as_element()
        .expect("validated run");

    let first_text = document::run_text(first_run);
    let last_text = document::run_text(last_run);
    let first_rpr = document::run_properties(first_run).cloned();
    let last_rpr = document::run_properties(last_run).cloned();

    let leading = &first_text[..first.start];
    let trailing = &last_text[last.end..];

    let mut replacement: Vec<XmlNode> = Vec::with_capacity(7);
    if !leading.is_empty() {
        replacement.push(XmlNode::Element(document::make_text_run(
            leading,
            first_rpr.as_ref(),
        )));
    }
    replacement.push(XmlNode::Element(document::make_boundary_run(
        FieldBoundary::Begin,
    )));
    replacement.push(XmlNode::Element(document::make_instruction_run(instruction)));
    replacement.push(XmlNode::Element(document::make_boundary_run(
        FieldBoundary::Separate,
    )));
    replacement.push(XmlNode::Element(document::make_text_run(
        &marker.raw_text,
        first_rpr.as_ref(),
    )));
    replacement.push(XmlNode::Element(document::make_boundary_run(
        FieldBoundary::End,
    )));
    if !trailing.is_empty() {
        replacement.push(XmlNode::Element(document::make_text_run(
            trailing,
            last_rpr.as_ref(),
        )));
    }

    paragraph
        .children
        .splice(first.child_idx..=last.child_idx, replacement);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::{flatten_paragraph, locate_markers};
    use docfield_xml::parse;

    fn paragraph(xml: &str) -> XmlElement {
        parse(xml).unwrap().root
    }

    fn synthesized(paragraph: &XmlElement) -> Vec<SynthesizedMarker> {
        let (markers, _) = locate_markers(&flatten_paragraph(paragraph));
        markers
            .into_iter()
            .map(|marker| SynthesizedMarker {
                instruction: format!("ADDIN TEST {}", marker.raw_text),
                marker,
            })
            .collect()
    }

    fn visible(paragraph: &XmlElement) -> String {
        flatten_paragraph(paragraph).text
    }

    #[test]
    fn test_single_marker_field_sequence() {
        let mut para = paragraph(
            r#"<w:p xmlns:w="ns"><w:r><w:rPr><w:i/></w:rPr><w:t>Known [3]. More.</w:t></w:r></w:p>"#,
        );
        let markers = synthesized(&para);
        let count = inject_into_paragraph(&mut para, &markers).unwrap();
        assert_eq!(count, 1);

        // leading, begin, instr, separate, display, end, trailing
        assert_eq!(para.children.len(), 7);

        let kinds: Vec<Option<FieldBoundary>> = para
            .children
            .iter()
            .map(|c| document::field_boundary(c.as_element().unwrap()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                None,
                Some(FieldBoundary::Begin),
                None,
                Some(FieldBoundary::Separate),
                None,
                Some(FieldBoundary::End),
                None,
            ]
        );

        // Display run keeps the original formatting; boundaries are bare.
        let display = para.children[4].as_element().unwrap();
        assert!(document::run_properties(display).is_some());
        assert_eq!(document::run_text(display), "[3]");

        let begin = para.children[1].as_element().unwrap();
        assert!(document::run_properties(begin).is_none());

        let instr = para.children[2].as_element().unwrap();
        assert_eq!(
            document::instruction_text(instr).unwrap(),
            " ADDIN TEST [3] "
        );
    }

    #[test]
    fn test_visible_text_unchanged() {
        let mut para = paragraph(
            r#"<w:p xmlns:w="ns"><w:r><w:t>Alpha [1] beta [2,3] gamma.</w:t></w:r></w:p>"#,
        );
        let before = visible(&para);
        let markers = synthesized(&para);
        inject_into_paragraph(&mut para, &markers).unwrap();
        assert_eq!(visible(&para), before);
    }

    #[test]
    fn test_marker_split_across_runs() {
        let mut para = paragraph(
            r#"<w:p xmlns:w="ns"><w:r><w:t>see [</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>1,</w:t></w:r><w:r><w:t>2] done</w:t></w:r></w:p>"#,
        );
        let before = visible(&para);
        let markers = synthesized(&para);
        assert_eq!(markers.len(), 1);

        inject_into_paragraph(&mut para, &markers).unwrap();
        assert_eq!(visible(&para), before);

        // The covered runs collapse into one construct; display text uses
        // the first covered run's formatting (none here).
        let display_texts: Vec<String> = para
            .children
            .iter()
            .filter_map(|c| c.as_element())
            .filter(|r| document::field_boundary(r).is_none())
            .filter(|r| r.find_child("instrText").is_none())
            .map(document::run_text)
            .collect();
        assert_eq!(display_texts, vec!["see ", "[1,2]", " done"]);
    }

    #[test]
    fn test_input_order_does_not_change_result() {
        let src = r#"<w:p xmlns:w="ns"><w:r><w:t>a [1] b [2] c</w:t></w:r></w:p>"#;

        let mut forward = paragraph(src);
        let mut markers = synthesized(&forward);
        inject_into_paragraph(&mut forward, &markers).unwrap();

        let mut reverse = paragraph(src);
        markers = synthesized(&reverse);
        markers.reverse();
        inject_into_paragraph(&mut reverse, &markers).unwrap();

        assert_eq!(forward, reverse);
    }

    #[test]
    fn test_nested_boundary_inside_span_rejected() {
        // An empty run (no text) sits between the two halves of the
        // marker; the span covers it without a fragment for it.
        let mut para = paragraph(
            r#"<w:p xmlns:w="ns"><w:r><w:t>[1,</w:t></w:r><w:r><w:br/></w:r><w:r><w:t>2]</w:t></w:r></w:p>"#,
        );
        let before = para.clone();
        let markers = synthesized(&para);
        assert_eq!(markers.len(), 1);

        let result = inject_into_paragraph(&mut para, &markers);
        assert_eq!(result, Err(SkipReason::UnsupportedSpanStructure));
        // Paragraph left completely unmodified.
        assert_eq!(para, before);
    }

    #[test]
    fn test_paragraph_atomicity_one_bad_span_blocks_all() {
        // First marker is fine, second covers a run with two w:t children.
        let mut para = paragraph(
            r#"<w:p xmlns:w="ns"><w:r><w:t>a [1] b </w:t></w:r><w:r><w:t>[</w:t><w:t>2]</w:t></w:r></w:p>"#,
        );
        let before = para.clone();
        let markers = synthesized(&para);
        assert_eq!(markers.len(), 2);

        let result = inject_into_paragraph(&mut para, &markers);
        assert_eq!(result, Err(SkipReason::UnsupportedSpanStructure));
        assert_eq!(para, before);
    }

    #[test]
    fn test_marker_at_run_edges_has_no_empty_fragments() {
        let mut para =
            paragraph(r#"<w:p xmlns:w="ns"><w:r><w:t>[4]</w:t></w:r></w:p>"#);
        let markers = synthesized(&para);
        inject_into_paragraph(&mut para, &markers).unwrap();

        // No leading or trailing run: begin, instr, separate, display, end.
        assert_eq!(para.children.len(), 5);
    }
}
