//! Reference ledger: the ordered, resolved bibliographic records consumed
//! by the injection engine.
//!
//! The ledger is produced upstream (metadata retrieval and style
//! formatting happen there); this crate only loads the resulting JSON,
//! indexes it by id, and answers lookups. Records are immutable for the
//! duration of a run.
//!
//! The upstream fetcher writes records as
//! `{"id": 3, "doi": "10/x", "formatted": "...", "source": "crossref"}`;
//! the loader also accepts the `formattedText`/`provenance` spellings via
//! serde aliases.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading a ledger.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Failed to read ledger file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse ledger JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate reference id {0} in ledger")]
    DuplicateId(u32),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// How a record's formatted text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Resolved from the upstream metadata registry.
    #[serde(alias = "crossref")]
    Resolved,

    /// The upstream fetch failed; the fallback string was used.
    Fallback,

    /// Hand-edited after fetching.
    ManuallyCorrected,
}

/// One resolved bibliographic record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceRecord {
    /// 1-based id matching the inline marker numbering.
    pub id: u32,

    /// DOI, if the record has one.
    #[serde(default)]
    pub doi: Option<String>,

    /// The fully formatted reference string (Vancouver/APA/...).
    #[serde(rename = "formatted", alias = "formattedText")]
    pub formatted_text: String,

    /// Where the formatted text came from.
    #[serde(rename = "source", alias = "provenance")]
    pub provenance: Provenance,
}

/// The ordered collection of reference records, indexed by id.
#[derive(Debug, Clone)]
pub struct Ledger {
    records: Vec<ReferenceRecord>,
    by_id: HashMap<u32, usize>,
}

impl Ledger {
    /// Build a ledger from records, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns an error if two records share an id.
    pub fn new(records: Vec<ReferenceRecord>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            if by_id.insert(record.id, idx).is_some() {
                return Err(LedgerError::DuplicateId(record.id));
            }
        }
        Ok(Self { records, by_id })
    }

    /// Load a ledger from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a ledger from a JSON string.
    pub fn from_json(content: &str) -> Result<Self> {
        let records: Vec<ReferenceRecord> = serde_json::from_str(content)?;
        Self::new(records)
    }

    /// Look up a record by id.
    pub fn get(&self, id: u32) -> Option<&ReferenceRecord> {
        self.by_id.get(&id).map(|&idx| &self.records[idx])
    }

    /// Whether every id in the list resolves to a record.
    pub fn resolves_all(&self, ids: &[u32]) -> bool {
        ids.iter().all(|id| self.by_id.contains_key(id))
    }

    /// Ids from the list that do not resolve to a record.
    pub fn unresolved_ids(&self, ids: &[u32]) -> Vec<u32> {
        ids.iter()
            .copied()
            .filter(|id| !self.by_id.contains_key(id))
            .collect()
    }

    /// All records in ledger order.
    pub fn records(&self) -> &[ReferenceRecord] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the ledger has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Resolved => write!(f, "resolved"),
            Provenance::Fallback => write!(f, "fallback"),
            Provenance::ManuallyCorrected => write!(f, "manually-corrected"),
        }
    }
}
