//! Run report: the aggregated, non-fatal event stream of one injection.
//!
//! Recoverable conditions never abort the run; they accumulate here and
//! are rendered as the summary the CLI prints. Fatal conditions are the
//! engine's `Error` type instead.

use crate::bibliography::BibliographyOutcome;
use crate::namespace::NamespaceOutcome;
use std::fmt;

/// Why a located marker was not injected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Bracket content is not a valid integer list (includes range
    /// syntax, which is deliberately not expanded).
    MalformedMarker,

    /// One or more cited ids are absent from the ledger.
    UnresolvedReferenceId { missing: Vec<u32> },

    /// The match span covers run structure the transform refuses to edit.
    UnsupportedSpanStructure,

    /// The span is already nested inside an existing field construct.
    AlreadyInjected,
}

impl SkipReason {
    /// Stable reason code for the summary report.
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::MalformedMarker => "malformed-marker",
            SkipReason::UnresolvedReferenceId { .. } => "unresolved-reference-id",
            SkipReason::UnsupportedSpanStructure => "unsupported-span-structure",
            SkipReason::AlreadyInjected => "already-injected",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnresolvedReferenceId { missing } => {
                let ids: Vec<String> = missing.iter().map(u32::to_string).collect();
                write!(f, "{} (missing {})", self.code(), ids.join(", "))
            }
            _ => write!(f, "{}", self.code()),
        }
    }
}

/// One skipped marker, with enough context to find it in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedMarker {
    /// Zero-based paragraph ordinal in document order, table-cell
    /// paragraphs included.
    pub paragraph: usize,

    /// The visible marker text.
    pub raw_text: String,

    pub reason: SkipReason,
}

/// The aggregated outcome of one injection run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Citation field constructs injected.
    pub markers_injected: usize,

    /// Markers located but skipped, in document order.
    pub skipped: Vec<SkippedMarker>,

    /// Outcome of the bibliography wrap step.
    pub bibliography: BibliographyOutcome,

    /// Outcome of the namespace repair pass.
    pub namespace: NamespaceOutcome,
}

impl RunReport {
    /// Whether the run changed the document tree at all.
    pub fn modified(&self) -> bool {
        self.markers_injected > 0
            || matches!(self.bibliography, BibliographyOutcome::Wrapped { .. })
            || !self.namespace.repairs.is_empty()
    }

    /// Whether output was emitted despite failed namespace validation.
    pub fn degraded(&self) -> bool {
        !self.namespace.is_valid()
    }

    /// Count of skipped markers with the given reason code.
    pub fn skipped_with_code(&self, code: &str) -> usize {
        self.skipped.iter().filter(|s| s.reason.code() == code).count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Citation fields injected: {}", self.markers_injected)?;

        if !self.skipped.is_empty() {
            writeln!(f, "Markers skipped: {}", self.skipped.len())?;
            for skip in &self.skipped {
                writeln!(
                    f,
                    "  {} (paragraph {}): {}",
                    skip.raw_text, skip.paragraph, skip.reason
                )?;
            }
        }

        match &self.bibliography {
            BibliographyOutcome::Wrapped { entries } => {
                writeln!(f, "Bibliography: wrapped {} entries", entries)?;
            }
            BibliographyOutcome::AlreadyWrapped => {
                writeln!(f, "Bibliography: already wrapped, skipped")?;
            }
            BibliographyOutcome::NotFound => {
                writeln!(f, "Bibliography: no reference paragraphs found")?;
            }
            BibliographyOutcome::NonContiguous { paragraph } => {
                writeln!(
                    f,
                    "Bibliography: non-contiguous block (paragraph {}), left unmodified",
                    paragraph
                )?;
            }
        }

        if !self.namespace.repairs.is_empty() {
            let prefixes: Vec<&str> = self
                .namespace
                .repairs
                .iter()
                .map(|(p, _)| p.as_str())
                .collect();
            writeln!(f, "Namespace repairs: {}", prefixes.join(", "))?;
        }

        if self.degraded() {
            writeln!(
                f,
                "WARNING: emitting document despite undeclarable prefix(es): {}",
                self.namespace.unrepairable.join(", ")
            )?;
        }

        Ok(())
    }
}
