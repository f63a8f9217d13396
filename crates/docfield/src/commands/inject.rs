//! The `inject` command: run the pipeline and commit atomically.

use anyhow::{Context, Result};
use docfield_engine::Options;
use std::path::Path;
use tracing::info;

pub fn execute(unpacked: &Path, refs: &Path, strict: bool, dry_run: bool) -> Result<()> {
    let ledger = super::load_ledger(refs)?;
    let (doc_path, mut doc) = super::load_document(unpacked)?;

    info!(
        document = %doc_path.display(),
        references = ledger.len(),
        "starting injection"
    );

    let report = docfield_engine::inject(&mut doc, &ledger, Options { strict })?;

    print!("{}", report);

    if dry_run {
        println!("Dry run: no changes written");
        return Ok(());
    }

    if !report.modified() {
        println!("No changes to write");
        return Ok(());
    }

    // Commit is all-or-nothing: serialize to a sibling temp file, then
    // rename over the original. A failure anywhere leaves the original
    // document untouched.
    let serialized = docfield_xml::serialize(&doc);
    let tmp_path = doc_path.with_extension("xml.tmp");
    std::fs::write(&tmp_path, &serialized)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, &doc_path)
        .with_context(|| format!("Failed to replace {}", doc_path.display()))?;

    println!("Wrote {}", doc_path.display());
    Ok(())
}
