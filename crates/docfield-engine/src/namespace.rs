//! Namespace declaration repair after structural edits.
//!
//! Injected elements reference prefixes (`w:`, `xml:`) that must be
//! declared somewhere in scope. This pass walks the tree tracking in-scope
//! `xmlns:` declarations (Word declares some prefixes on descendant
//! elements, not the root), collects every element or attribute prefix
//! with no declaration on any ancestor, and injects the minimal missing
//! set at the root from the known OOXML namespace table. Unrelated root
//! attributes are untouched.
//!
//! A used prefix with no known URI cannot be repaired; callers decide
//! whether that degrades to lenient output or aborts (strict mode).

use docfield_xml::{XmlDocument, XmlElement};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Known OOXML namespace URIs by prefix.
const KNOWN_NAMESPACES: &[(&str, &str)] = &[
    ("w", "http://schemas.openxmlformats.org/wordprocessingml/2006/main"),
    (
        "r",
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
    ),
    (
        "wp",
        "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing",
    ),
    ("a", "http://schemas.openxmlformats.org/drawingml/2006/main"),
    (
        "mc",
        "http://schemas.openxmlformats.org/markup-compatibility/2006",
    ),
    ("w14", "http://schemas.microsoft.com/office/word/2010/wordml"),
    ("w15", "http://schemas.microsoft.com/office/word/2012/wordml"),
    (
        "wp14",
        "http://schemas.microsoft.com/office/word/2010/wordprocessingDrawing",
    ),
    (
        "wps",
        "http://schemas.microsoft.com/office/word/2010/wordprocessingShape",
    ),
];

/// Result of the namespace repair pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceOutcome {
    /// Declarations injected at the root: (prefix, uri).
    pub repairs: Vec<(String, String)>,

    /// Used prefixes with neither a declaration nor a known URI.
    pub unrepairable: Vec<String>,
}

impl NamespaceOutcome {
    /// Whether validation holds after repair.
    pub fn is_valid(&self) -> bool {
        self.unrepairable.is_empty()
    }
}

/// Verify and repair namespace declarations.
pub fn repair_namespaces(doc: &mut XmlDocument) -> NamespaceOutcome {
    let mut undeclared = BTreeSet::new();
    collect_undeclared(&doc.root, &BTreeSet::new(), &mut undeclared);

    let mut outcome = NamespaceOutcome::default();
    for prefix in undeclared {
        // `xml` and `xmlns` are implicitly declared by the XML spec.
        if prefix == "xml" || prefix == "xmlns" {
            continue;
        }
        match known_uri(&prefix) {
            Some(uri) => {
                doc.root
                    .set_attribute(Some("xmlns"), &prefix, uri);
                info!(prefix = %prefix, "injected missing namespace declaration");
                outcome.repairs.push((prefix, uri.to_string()));
            }
            None => {
                warn!(prefix = %prefix, "prefix has no known namespace URI");
                outcome.unrepairable.push(prefix);
            }
        }
    }

    outcome
}

fn known_uri(prefix: &str) -> Option<&'static str> {
    KNOWN_NAMESPACES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, uri)| *uri)
}

/// Collect prefixes used with no `xmlns:` declaration on the element
/// itself or any ancestor. Declarations scope to their subtree.
fn collect_undeclared(el: &XmlElement, scope: &BTreeSet<String>, out: &mut BTreeSet<String>) {
    let extended;
    let scope = if el
        .attributes
        .iter()
        .any(|a| a.prefix.as_deref() == Some("xmlns"))
    {
        let mut with_local = scope.clone();
        for attr in &el.attributes {
            if attr.prefix.as_deref() == Some("xmlns") {
                with_local.insert(attr.name.clone());
            }
        }
        extended = with_local;
        &extended
    } else {
        scope
    };

    if let Some(prefix) = &el.prefix {
        if !scope.contains(prefix) {
            out.insert(prefix.clone());
        }
    }
    for attr in &el.attributes {
        if let Some(prefix) = &attr.prefix {
            if prefix != "xmlns" && !scope.contains(prefix) {
                out.insert(prefix.clone());
            }
        }
    }
    for child in el.child_elements() {
        collect_undeclared(child, scope, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfield_xml::parse;

    #[test]
    fn test_all_declared_no_repairs() {
        let mut doc = parse(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body/></w:document>"#,
        )
        .unwrap();
        let before = doc.root.attributes.clone();

        let outcome = repair_namespaces(&mut doc);
        assert!(outcome.repairs.is_empty());
        assert!(outcome.is_valid());
        assert_eq!(doc.root.attributes, before);
    }

    #[test]
    fn test_injects_missing_known_prefix() {
        // w14 is used below the root but never declared.
        let mut doc = parse(
            r#"<w:document xmlns:w="ns"><w:body><w:p w14:paraId="1A2B"/></w:body></w:document>"#,
        )
        .unwrap();

        let outcome = repair_namespaces(&mut doc);
        assert_eq!(outcome.repairs.len(), 1);
        assert_eq!(outcome.repairs[0].0, "w14");
        assert!(outcome.is_valid());
        assert_eq!(
            doc.root.get_attribute("w14"),
            Some("http://schemas.microsoft.com/office/word/2010/wordml")
        );
    }

    #[test]
    fn test_unknown_prefix_reported() {
        let mut doc = parse(
            r#"<w:document xmlns:w="ns"><w:body><custom:thing xmlns:ignored="x"/></w:body></w:document>"#,
        )
        .unwrap();

        let outcome = repair_namespaces(&mut doc);
        assert_eq!(outcome.unrepairable, vec!["custom".to_string()]);
        assert!(!outcome.is_valid());
    }

    #[test]
    fn test_locally_declared_prefix_needs_no_repair() {
        // Word declares extension prefixes on descendant elements.
        let mut doc = parse(
            r#"<w:document xmlns:w="ns"><w:body><w:r><a14:hint xmlns:a14="urn:a14"/></w:r></w:body></w:document>"#,
        )
        .unwrap();

        let outcome = repair_namespaces(&mut doc);
        assert!(outcome.repairs.is_empty());
        assert!(outcome.unrepairable.is_empty());
        assert!(outcome.is_valid());
        assert_eq!(doc.root.attributes.len(), 1);
    }

    #[test]
    fn test_declaration_does_not_leak_across_siblings() {
        let mut doc = parse(
            r#"<w:document xmlns:w="ns"><w:a xmlns:q="u"><q:inner/></w:a><q:b/></w:document>"#,
        )
        .unwrap();

        let outcome = repair_namespaces(&mut doc);
        // q:inner is covered by its ancestor's declaration; q:b is not.
        assert_eq!(outcome.unrepairable, vec!["q".to_string()]);
    }

    #[test]
    fn test_xml_prefix_needs_no_declaration() {
        let mut doc = parse(
            r#"<w:document xmlns:w="ns"><w:t xml:space="preserve"> </w:t></w:document>"#,
        )
        .unwrap();

        let outcome = repair_namespaces(&mut doc);
        assert!(outcome.repairs.is_empty());
        assert!(outcome.is_valid());
    }

    #[test]
    fn test_unrelated_root_attributes_untouched() {
        let mut doc = parse(
            r#"<w:document xmlns:w="ns" mc:Ignorable="w14"><w:body><w:p w14:x="1"/></w:body></w:document>"#,
        )
        .unwrap();

        let outcome = repair_namespaces(&mut doc);
        // mc (used by the root attribute) and w14 both get declared.
        let repaired: Vec<&str> = outcome.repairs.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(repaired, vec!["mc", "w14"]);

        // The original attributes are still first, in order.
        assert_eq!(doc.root.attributes[0].name, "w");
        assert_eq!(doc.root.attributes[1].name, "Ignorable");
    }
}
