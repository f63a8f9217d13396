//! Whitespace-preserving XML tree editing for docfield.
//!
//! This crate wraps [`quick-xml`] to provide an owned, mutable tree of
//! [`XmlElement`]s suitable for structural editing of WordprocessingML
//! documents. Unlike a reader aimed purely at data extraction, the tree
//! here keeps everything needed to re-emit the document without visible
//! drift: text nodes are preserved verbatim (including whitespace-only
//! nodes between elements), namespace prefixes stay attached to element
//! and attribute names, attributes keep their original order, and comments
//! survive a round trip.
//!
//! # Example
//!
//! ```rust
//! use docfield_xml::parse;
//!
//! let doc = parse(r#"<w:p xmlns:w="ns"><w:r><w:t>Hello</w:t></w:r></w:p>"#).unwrap();
//! assert_eq!(doc.root.name, "p");
//! assert_eq!(doc.root.prefix.as_deref(), Some("w"));
//!
//! let runs = doc.root.get_children("r");
//! assert_eq!(runs.len(), 1);
//! ```
//!
//! Serialization back to a string is exact for everything the parser
//! models; entity escaping is canonical (`&`, `<`, `>` in text, plus
//! quotes in attribute values), so an edit-free parse/serialize cycle is
//! stable under repetition.

pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

// Re-export main types
pub use error::{Error, Result};
pub use parser::parse;
pub use types::{XmlAttribute, XmlDocument, XmlElement, XmlNode};
pub use writer::serialize;
