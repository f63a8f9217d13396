//! Citation field-code injection engine for WordprocessingML documents.
//!
//! This crate takes:
//! - A parsed document tree ([`docfield_xml::XmlDocument`])
//! - A resolved, ordered reference [`Ledger`](docfield_ledger::Ledger)
//!
//! And rewrites plain `[N]` / `[N,N]` citation markers and the numbered
//! reference list into reference-manager field constructs, leaving the
//! visible text byte-identical.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        docfield-engine                         │
//! │  Ledger + XmlDocument → locate → synthesize → splice → wrap →  │
//! │  repair namespaces → RunReport                                 │
//! └───────────────┬───────────────────────────┬────────────────────┘
//!                 │                           │
//!                 ▼                           ▼
//! ┌───────────────────────────┐ ┌────────────────────────────────┐
//! │      docfield-ledger      │ │          docfield-xml          │
//! │ ordered reference records │ │ whitespace-preserving XML tree │
//! └───────────────────────────┘ └────────────────────────────────┘
//! ```
//!
//! The pipeline is single-threaded and single-pass: later edits depend on
//! earlier offsets, so mutation is inherently sequential. Every
//! recoverable condition becomes a [`report::RunReport`] event; only
//! conditions that would corrupt output are [`Error`]s. The engine never
//! touches disk — callers own the read/serialize/commit boundary.

pub mod bibliography;
pub mod document;
pub mod error;
pub mod locator;
pub mod namespace;
pub mod payload;
pub mod report;
pub mod transform;

// Re-export main types
pub use bibliography::BibliographyOutcome;
pub use error::{Error, Result};
pub use report::{RunReport, SkipReason, SkippedMarker};

use docfield_ledger::Ledger;
use docfield_xml::XmlDocument;
use tracing::info;
use transform::SynthesizedMarker;

/// Engine options.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Treat failed namespace validation as fatal instead of degrading to
    /// lenient output.
    pub strict: bool,
}

/// Run the full injection pipeline over a document tree.
///
/// The tree is mutated in place; callers serialize and commit it only on
/// `Ok`, which is what makes a run atomic at the document level.
///
/// # Errors
///
/// Returns an error only for fatal conditions: a document without a body,
/// or failed namespace validation under [`Options::strict`]. Everything
/// else is reported in the returned [`RunReport`].
pub fn inject(doc: &mut XmlDocument, ledger: &Ledger, options: Options) -> Result<RunReport> {
    let mut injected = 0usize;
    let mut skipped: Vec<SkippedMarker> = Vec::new();

    let body = document::body_mut(doc)?;
    let paragraph_paths = document::paragraph_paths(body);

    for (ordinal, path) in paragraph_paths.iter().enumerate() {
        let paragraph = document::paragraph_at_mut(body, path);

        let flat = locator::flatten_paragraph(paragraph);
        let (markers, events) = locator::locate_markers(&flat);

        for event in events {
            skipped.push(SkippedMarker {
                paragraph: ordinal,
                raw_text: event.raw_text,
                reason: event.reason,
            });
        }

        // Resolve ids against the ledger; unresolved markers stay as
        // plain text and are reported, without blocking their paragraph.
        let mut synthesized = Vec::new();
        for marker in markers {
            let missing = ledger.unresolved_ids(&marker.ids);
            if missing.is_empty() {
                let instruction = payload::citation_instruction(ordinal, &marker, ledger);
                synthesized.push(SynthesizedMarker {
                    marker,
                    instruction,
                });
            } else {
                skipped.push(SkippedMarker {
                    paragraph: ordinal,
                    raw_text: marker.raw_text,
                    reason: SkipReason::UnresolvedReferenceId { missing },
                });
            }
        }

        match transform::inject_into_paragraph(paragraph, &synthesized) {
            Ok(count) => injected += count,
            Err(reason) => {
                // All-or-nothing per paragraph: none of its markers were
                // applied.
                for sm in synthesized {
                    skipped.push(SkippedMarker {
                        paragraph: ordinal,
                        raw_text: sm.marker.raw_text,
                        reason: reason.clone(),
                    });
                }
            }
        }
    }

    let bibliography =
        bibliography::wrap_bibliography(body, &payload::bibliography_instruction(ledger));

    let namespace = namespace::repair_namespaces(doc);
    if options.strict && !namespace.is_valid() {
        return Err(Error::StrictNamespaceFailure {
            prefixes: namespace.unrepairable,
        });
    }

    info!(
        injected,
        skipped = skipped.len(),
        "injection pipeline complete"
    );

    Ok(RunReport {
        markers_injected: injected,
        skipped,
        bibliography,
        namespace,
    })
}

/// Resolution status of a scanned marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanStatus {
    /// All ids resolve; injection would synthesize this marker.
    Ready,
    /// Some ids are absent from the ledger.
    Unresolved { missing: Vec<u32> },
    /// Already nested inside a field construct.
    AlreadyInjected,
    /// Bracket content failed the marker grammar.
    Malformed,
}

/// One marker found by a scan.
#[derive(Debug, Clone)]
pub struct ScanEntry {
    /// Zero-based paragraph ordinal in document order, table-cell
    /// paragraphs included.
    pub paragraph: usize,
    pub raw_text: String,
    pub ids: Vec<u32>,
    pub status: ScanStatus,
}

/// Locate markers and report their resolution status without editing.
pub fn scan(doc: &XmlDocument, ledger: &Ledger) -> Result<Vec<ScanEntry>> {
    let body = document::body(doc)?;
    let mut entries = Vec::new();

    for (ordinal, path) in document::paragraph_paths(body).iter().enumerate() {
        let paragraph = document::paragraph_at(body, path);
        let flat = locator::flatten_paragraph(paragraph);
        let (markers, events) = locator::locate_markers(&flat);

        for event in events {
            entries.push(ScanEntry {
                paragraph: ordinal,
                raw_text: event.raw_text,
                ids: Vec::new(),
                status: match event.reason {
                    SkipReason::AlreadyInjected => ScanStatus::AlreadyInjected,
                    _ => ScanStatus::Malformed,
                },
            });
        }

        for marker in markers {
            let missing = ledger.unresolved_ids(&marker.ids);
            entries.push(ScanEntry {
                paragraph: ordinal,
                raw_text: marker.raw_text,
                ids: marker.ids,
                status: if missing.is_empty() {
                    ScanStatus::Ready
                } else {
                    ScanStatus::Unresolved { missing }
                },
            });
        }
    }

    Ok(entries)
}
