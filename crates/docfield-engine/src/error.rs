//! Error types for the injection engine.
//!
//! Only conditions that abort a whole run live here. Everything
//! recoverable (malformed markers, unresolved ids, odd span shapes) is a
//! reported event, not an error; see [`crate::report`].

use std::fmt;

/// Result type alias for docfield-engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors that abort an injection run before anything is written.
#[derive(Debug, Clone)]
pub enum Error {
    /// The document is not well-formed XML.
    DocumentParse(docfield_xml::Error),

    /// The document has no `w:body` element.
    MissingBody,

    /// Strict mode: namespace repair could not produce a conformant
    /// document (prefixes with no known declaration).
    StrictNamespaceFailure { prefixes: Vec<String> },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::DocumentParse(e) => write!(f, "Document parse failure: {}", e),
            Error::MissingBody => {
                write!(f, "Document has no body element")
            }
            Error::StrictNamespaceFailure { prefixes } => {
                write!(
                    f,
                    "Namespace repair failed in strict mode: no known declaration for prefix(es) {}",
                    prefixes.join(", ")
                )
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<docfield_xml::Error> for Error {
    fn from(err: docfield_xml::Error) -> Self {
        Error::DocumentParse(err)
    }
}
