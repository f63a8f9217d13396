//! The `scan` command: report marker resolution without editing.

use anyhow::Result;
use docfield_engine::ScanStatus;
use std::path::Path;

pub fn execute(unpacked: &Path, refs: &Path) -> Result<()> {
    let ledger = super::load_ledger(refs)?;
    let (_, doc) = super::load_document(unpacked)?;

    let entries = docfield_engine::scan(&doc, &ledger)?;

    if entries.is_empty() {
        println!("No citation markers found");
        return Ok(());
    }

    let mut ready = 0usize;
    for entry in &entries {
        let status = match &entry.status {
            ScanStatus::Ready => {
                ready += 1;
                "ready".to_string()
            }
            ScanStatus::Unresolved { missing } => {
                let ids: Vec<String> = missing.iter().map(u32::to_string).collect();
                format!("unresolved (missing {})", ids.join(", "))
            }
            ScanStatus::AlreadyInjected => "already injected".to_string(),
            ScanStatus::Malformed => "malformed".to_string(),
        };
        println!(
            "paragraph {:>4}  {:<12} {}",
            entry.paragraph, entry.raw_text, status
        );
    }

    println!("{} marker(s), {} ready for injection", entries.len(), ready);
    Ok(())
}
