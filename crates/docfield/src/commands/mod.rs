//! CLI command implementations.

pub mod inject;
pub mod scan;

use anyhow::{Context, Result};
use docfield_xml::XmlDocument;
use std::path::{Path, PathBuf};

/// The document part edited inside the unpacked working directory.
pub fn document_path(unpacked: &Path) -> PathBuf {
    unpacked.join("word").join("document.xml")
}

/// Read and parse the main document part. A parse failure is fatal for
/// the whole run; nothing has been written at this point.
pub fn load_document(unpacked: &Path) -> Result<(PathBuf, XmlDocument)> {
    let path = document_path(unpacked);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read document part: {}", path.display()))?;
    let doc = docfield_xml::parse(&content)
        .with_context(|| format!("Document parse failure: {}", path.display()))?;
    Ok((path, doc))
}

/// Load the reference ledger.
pub fn load_ledger(refs: &Path) -> Result<docfield_ledger::Ledger> {
    docfield_ledger::Ledger::load(refs)
        .with_context(|| format!("Failed to load reference ledger: {}", refs.display()))
}
