//! Deterministic field instruction payloads.
//!
//! Citation fields carry `ADDIN ZOTERO_ITEM CSL_CITATION {json}` and the
//! bibliography field carries `ADDIN ZOTERO_BIBL {json} CSL_BIBLIOGRAPHY`,
//! matching what reference-manager plugins write into Word documents.
//!
//! Everything here is a pure function of content and position: construct
//! identifiers come from an FNV-1a hash over the marker's paragraph index,
//! logical offset, raw text and id list — never from time, randomness, or
//! a shared counter — so re-running the engine on unchanged input yields
//! byte-identical payload strings.

use crate::locator::CitationMarker;
use docfield_ledger::Ledger;
use serde::Serialize;

const CSL_SCHEMA: &str =
    "https://github.com/citation-style-language/schema/raw/master/csl-citation.json";

/// The CSL_CITATION JSON body.
#[derive(Debug, Serialize)]
struct CslCitation {
    #[serde(rename = "citationID")]
    citation_id: String,
    properties: CitationProperties,
    #[serde(rename = "citationItems")]
    citation_items: Vec<CitationItem>,
    schema: &'static str,
}

#[derive(Debug, Serialize)]
struct CitationProperties {
    #[serde(rename = "formattedCitation")]
    formatted_citation: String,
    #[serde(rename = "plainCitation")]
    plain_citation: String,
    #[serde(rename = "noteIndex")]
    note_index: u32,
}

#[derive(Debug, Serialize)]
struct CitationItem {
    id: u32,
    uris: Vec<String>,
    uri: Vec<String>,
    #[serde(rename = "itemData")]
    item_data: ItemData,
}

#[derive(Debug, Serialize)]
struct ItemData {
    id: u32,
    #[serde(rename = "type")]
    item_type: &'static str,
    note: String,
}

/// The ZOTERO_BIBL JSON body.
#[derive(Debug, Serialize)]
struct BibliographyData {
    uncited: Vec<String>,
    omitted: Vec<String>,
    custom: Vec<String>,
    items: Vec<String>,
    schema: &'static str,
}

/// Stable local item URI for a ledger id.
fn item_uri(id: u32) -> String {
    format!("http://zotero.org/users/local/gen/items/REF{:04}", id)
}

/// Derive the construct identifier for a marker.
///
/// FNV-1a over (paragraph index, logical offset, raw text, id list),
/// rendered in base36. Stable across runs for unchanged input.
pub fn construct_id(paragraph_idx: usize, marker: &CitationMarker) -> String {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    let mut feed = |bytes: &[u8]| {
        for &b in bytes {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
    };

    feed(&(paragraph_idx as u64).to_le_bytes());
    feed(&(marker.start as u64).to_le_bytes());
    feed(marker.raw_text.as_bytes());
    for id in &marker.ids {
        feed(&id.to_le_bytes());
    }

    base36(hash)
}

fn base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ASCII")
}

/// Build the full citation field instruction for a resolved marker.
///
/// Every id must resolve in the ledger; callers gate on that before
/// synthesis and report unresolved markers instead of calling this.
pub fn citation_instruction(
    paragraph_idx: usize,
    marker: &CitationMarker,
    ledger: &Ledger,
) -> String {
    let items = marker
        .ids
        .iter()
        .map(|&id| {
            let note = ledger
                .get(id)
                .map(|record| record.formatted_text.clone())
                .unwrap_or_default();
            CitationItem {
                id,
                uris: vec![item_uri(id)],
                uri: vec![item_uri(id)],
                item_data: ItemData {
                    id,
                    item_type: "article-journal",
                    note,
                },
            }
        })
        .collect();

    let citation = CslCitation {
        citation_id: construct_id(paragraph_idx, marker),
        properties: CitationProperties {
            formatted_citation: marker.raw_text.clone(),
            plain_citation: marker.raw_text.clone(),
            note_index: 0,
        },
        citation_items: items,
        schema: CSL_SCHEMA,
    };

    let json = serde_json::to_string(&citation).expect("citation payload serializes");
    format!("ADDIN ZOTERO_ITEM CSL_CITATION {}", json)
}

/// Build the bibliography field instruction, items in ledger order.
pub fn bibliography_instruction(ledger: &Ledger) -> String {
    let data = BibliographyData {
        uncited: Vec::new(),
        omitted: Vec::new(),
        custom: Vec::new(),
        items: ledger.records().iter().map(|r| item_uri(r.id)).collect(),
        schema: CSL_SCHEMA,
    };

    let json = serde_json::to_string(&data).expect("bibliography payload serializes");
    format!("ADDIN ZOTERO_BIBL {} CSL_BIBLIOGRAPHY", json)
}
