//! Wrapping the reference list in a single bibliography field.
//!
//! The reference list is the contiguous block of body paragraphs whose
//! visible text starts with `N. ` numbering. The whole block becomes one
//! field construct: begin boundary + instruction + separate boundary
//! inserted before the first run of the first entry, end boundary after
//! the last run of the last entry. Nothing visible changes.

use crate::document;
use crate::locator::flatten_paragraph;
use docfield_xml::{XmlElement, XmlNode};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static ENTRY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+\.\s").expect("entry regex"));

/// Result of the bibliography wrap step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BibliographyOutcome {
    /// The block was wrapped; `entries` reference paragraphs are covered.
    Wrapped { entries: usize },

    /// A bibliography construct already exists; nothing was changed.
    AlreadyWrapped,

    /// No reference-numbered paragraphs were found.
    NotFound,

    /// A non-entry paragraph sits inside the expected block. The
    /// offending paragraph's document-order ordinal is recorded; the
    /// block is left unmodified.
    NonContiguous { paragraph: usize },
}

/// Locate and wrap the reference-list block.
///
/// The document is only modified on the `Wrapped` outcome.
pub fn wrap_bibliography(body: &mut XmlElement, instruction: &str) -> BibliographyOutcome {
    if has_bibliography_field(body) {
        debug!("bibliography construct already present, skipping wrap");
        return BibliographyOutcome::AlreadyWrapped;
    }

    // Entries live at body level (table-cell paragraphs are never
    // reference entries); ordinals still count every paragraph so they
    // match the rest of the report.
    let entry_flags: Vec<(usize, usize, bool)> = document::paragraph_paths(body)
        .iter()
        .enumerate()
        .filter_map(|(ordinal, path)| {
            let [child_idx] = path.as_slice() else {
                return None;
            };
            let para = body.children[*child_idx]
                .as_element()
                .expect("paragraph path");
            Some((ordinal, *child_idx, is_entry_paragraph(para)))
        })
        .collect();

    let Some(first_pos) = entry_flags.iter().position(|&(_, _, e)| e) else {
        return BibliographyOutcome::NotFound;
    };
    let last_pos = entry_flags
        .iter()
        .rposition(|&(_, _, e)| e)
        .expect("entry exists");

    // The block must be exactly contiguous.
    for &(ordinal, _, is_entry) in &entry_flags[first_pos..=last_pos] {
        if !is_entry {
            warn!(
                paragraph = ordinal,
                "non-entry paragraph inside reference block"
            );
            return BibliographyOutcome::NonContiguous { paragraph: ordinal };
        }
    }

    let first_idx = entry_flags[first_pos].1;
    let last_idx = entry_flags[last_pos].1;
    let entries = last_pos - first_pos + 1;

    // End boundary after the last run of the last entry. Applied before
    // the opening insert only because both paragraphs may be the same
    // element; child indices within each paragraph are independent.
    {
        let last_para = body.children[last_idx]
            .as_element_mut()
            .expect("paragraph index");
        let insert_at = last_run_position(last_para);
        last_para.children.insert(
            insert_at,
            XmlNode::Element(document::make_boundary_run(document::FieldBoundary::End)),
        );
    }

    // Begin boundary, instruction, separate boundary before the first run
    // of the first entry.
    {
        let first_para = body.children[first_idx]
            .as_element_mut()
            .expect("paragraph index");
        let insert_at = first_run_position(first_para);
        first_para.children.splice(
            insert_at..insert_at,
            [
                XmlNode::Element(document::make_boundary_run(document::FieldBoundary::Begin)),
                XmlNode::Element(document::make_instruction_run(instruction)),
                XmlNode::Element(document::make_boundary_run(
                    document::FieldBoundary::Separate,
                )),
            ],
        );
    }

    debug!(entries, "wrapped bibliography block");
    BibliographyOutcome::Wrapped { entries }
}

/// Whether any instruction run in the body already carries a bibliography
/// payload.
fn has_bibliography_field(body: &XmlElement) -> bool {
    fn walk(el: &XmlElement) -> bool {
        if el.name == "instrText" && el.text().contains("ZOTERO_BIBL") {
            return true;
        }
        el.child_elements().any(walk)
    }
    walk(body)
}

/// Whether a paragraph's visible text begins with reference numbering.
fn is_entry_paragraph(paragraph: &XmlElement) -> bool {
    ENTRY.is_match(&flatten_paragraph(paragraph).text)
}

/// Position of the first run child, or the end of the child list.
fn first_run_position(paragraph: &XmlElement) -> usize {
    paragraph
        .children
        .iter()
        .position(|c| matches!(c, XmlNode::Element(e) if document::is_run(e)))
        .unwrap_or(paragraph.children.len())
}

/// Position just after the last run child, or the end of the child list.
fn last_run_position(paragraph: &XmlElement) -> usize {
    paragraph
        .children
        .iter()
        .rposition(|c| matches!(c, XmlNode::Element(e) if document::is_run(e)))
        .map_or(paragraph.children.len(), |p| p + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FieldBoundary;
    use docfield_xml::parse;

    fn body_with(paragraphs: &[&str]) -> XmlElement {
        let paras: String = paragraphs
            .iter()
            .map(|text| format!("<w:p><w:pPr/><w:r><w:t>{}</w:t></w:r></w:p>", text))
            .collect();
        parse(&format!(r#"<w:body xmlns:w="ns">{}</w:body>"#, paras))
            .unwrap()
            .root
    }

    fn boundary_at(body: &XmlElement, para_idx: usize, child_idx: usize) -> Option<FieldBoundary> {
        let para = body.children[para_idx].as_element().unwrap();
        document::field_boundary(para.children[child_idx].as_element().unwrap())
    }

    #[test]
    fn test_wraps_contiguous_block() {
        let mut body = body_with(&[
            "Introduction text",
            "1. First ref",
            "2. Second ref",
            "3. Third ref",
        ]);

        let outcome = wrap_bibliography(&mut body, "ADDIN ZOTERO_BIBL {} CSL_BIBLIOGRAPHY");
        assert_eq!(outcome, BibliographyOutcome::Wrapped { entries: 3 });

        // First entry paragraph: pPr, begin, instr, separate, original run.
        let first = body.children[1].as_element().unwrap();
        assert_eq!(first.children.len(), 5);
        assert_eq!(boundary_at(&body, 1, 1), Some(FieldBoundary::Begin));
        assert_eq!(boundary_at(&body, 1, 3), Some(FieldBoundary::Separate));

        // Last entry paragraph: pPr, original run, end.
        let last = body.children[3].as_element().unwrap();
        assert_eq!(last.children.len(), 3);
        assert_eq!(boundary_at(&body, 3, 2), Some(FieldBoundary::End));

        // Middle entry untouched.
        let middle = body.children[2].as_element().unwrap();
        assert_eq!(middle.children.len(), 2);
    }

    #[test]
    fn test_ten_entries_single_construct_at_extremes() {
        let texts: Vec<String> = (1..=10).map(|i| format!("{}. Ref", i)).collect();
        let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let mut body = body_with(&refs);

        let outcome = wrap_bibliography(&mut body, "BIBL");
        assert_eq!(outcome, BibliographyOutcome::Wrapped { entries: 10 });

        // Boundaries only in the very first and very last paragraphs.
        assert_eq!(boundary_at(&body, 0, 1), Some(FieldBoundary::Begin));
        assert_eq!(boundary_at(&body, 9, 2), Some(FieldBoundary::End));
        for idx in 1..9 {
            let para = body.children[idx].as_element().unwrap();
            assert_eq!(para.children.len(), 2, "paragraph {} modified", idx);
        }
    }

    #[test]
    fn test_single_entry_block() {
        let mut body = body_with(&["1. Only ref"]);
        let outcome = wrap_bibliography(&mut body, "BIBL");
        assert_eq!(outcome, BibliographyOutcome::Wrapped { entries: 1 });

        // Same paragraph holds all boundaries: pPr, begin, instr,
        // separate, run, end.
        let para = body.children[0].as_element().unwrap();
        assert_eq!(para.children.len(), 6);
        assert_eq!(boundary_at(&body, 0, 1), Some(FieldBoundary::Begin));
        assert_eq!(boundary_at(&body, 0, 5), Some(FieldBoundary::End));
    }

    #[test]
    fn test_non_contiguous_block_unmodified() {
        let mut body = body_with(&["1. First", "2. Second", "An interloper", "3. Third"]);
        let before = body.clone();

        let outcome = wrap_bibliography(&mut body, "BIBL");
        assert_eq!(outcome, BibliographyOutcome::NonContiguous { paragraph: 2 });
        assert_eq!(body, before);
    }

    #[test]
    fn test_non_contiguous_reports_paragraph_ordinal() {
        // Two paragraphs inside a leading table shift ordinal numbering
        // away from body child indices.
        let mut body = parse(
            r#"<w:body xmlns:w="ns"><w:tbl><w:tr><w:tc><w:p><w:r><w:t>cell a</w:t></w:r></w:p><w:p><w:r><w:t>cell b</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p><w:r><w:t>1. First</w:t></w:r></w:p><w:p><w:r><w:t>Interloper</w:t></w:r></w:p><w:p><w:r><w:t>2. Second</w:t></w:r></w:p></w:body>"#,
        )
        .unwrap()
        .root;

        let outcome = wrap_bibliography(&mut body, "BIBL");
        assert_eq!(outcome, BibliographyOutcome::NonContiguous { paragraph: 3 });
    }

    #[test]
    fn test_numbered_table_cell_paragraph_is_not_an_entry() {
        let mut body = parse(
            r#"<w:body xmlns:w="ns"><w:tbl><w:tr><w:tc><w:p><w:r><w:t>1. looks numbered</w:t></w:r></w:p></w:tc></w:tr></w:tbl><w:p><w:r><w:t>prose</w:t></w:r></w:p></w:body>"#,
        )
        .unwrap()
        .root;

        assert_eq!(wrap_bibliography(&mut body, "BIBL"), BibliographyOutcome::NotFound);
    }

    #[test]
    fn test_no_entries_found() {
        let mut body = body_with(&["Just prose", "No numbering here"]);
        let before = body.clone();
        assert_eq!(wrap_bibliography(&mut body, "BIBL"), BibliographyOutcome::NotFound);
        assert_eq!(body, before);
    }

    #[test]
    fn test_already_wrapped_skipped() {
        let mut body = body_with(&["1. First", "2. Second"]);
        assert!(matches!(
            wrap_bibliography(&mut body, "ADDIN ZOTERO_BIBL {} CSL_BIBLIOGRAPHY"),
            BibliographyOutcome::Wrapped { .. }
        ));

        let after_first = body.clone();
        let outcome = wrap_bibliography(&mut body, "ADDIN ZOTERO_BIBL {} CSL_BIBLIOGRAPHY");
        assert_eq!(outcome, BibliographyOutcome::AlreadyWrapped);
        assert_eq!(body, after_first);
    }

    #[test]
    fn test_numbering_without_separator_not_an_entry() {
        let mut body = body_with(&["1999 was a year", "12 monkeys"]);
        assert_eq!(wrap_bibliography(&mut body, "BIBL"), BibliographyOutcome::NotFound);
    }
}
