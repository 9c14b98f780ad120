//! bixml - bidirectional XML grammar engine
//!
//! One grammar definition drives both directions: parsing raw text into a
//! [`Document`] tree and printing a tree back into text, with two canonical
//! formatting modes (flat, and indented by four spaces per level). Parsing
//! accepts loosely formatted input in either mode; printing always produces
//! the mode's canonical form, so `parse(print(doc))` returns the same tree.
//!
//! The supported markup is a practical subset: elements with ordered
//! attributes, text, comments and an optional `<?xml ...?>` prolog. No
//! CDATA, no namespaces, no entity expansion.
//!
//! # Quick Start
//!
//! ```
//! # fn main() -> Result<(), bixml::Error> {
//! let doc = bixml::from_str("<library>\n    <book title=\"Dune\"/>\n</library>")?;
//! assert_eq!(doc.root.name, "library");
//!
//! let flat = bixml::to_flat_string(&doc)?;
//! assert_eq!(flat, "<library><book title=\"Dune\"/></library>");
//!
//! let reparsed = bixml::from_str(&flat)?;
//! assert_eq!(reparsed, doc);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub use error::{Error, ErrorKind, InvariantViolation, Pos, Result, Span, UnexpectedInput};

pub mod input;
pub use input::{Cursor, Output};

pub mod grammar;
pub use grammar::{Grammar, GrammarExt};

pub mod xml;
pub use xml::{Attributes, Config, Document, Element, Node, PrintMode, Xml};

/// Parse a document from a string
pub fn from_str(s: &str) -> Result<Document> {
    from_bytes(s.as_bytes())
}

/// Parse a document from raw UTF-8 bytes
pub fn from_bytes(bytes: &[u8]) -> Result<Document> {
    Xml::indented().parse(bytes)
}

/// Parse with custom limits
pub fn from_str_with_config(s: &str, config: Config) -> Result<Document> {
    Xml::indented().with_config(config).parse(s.as_bytes())
}

/// Print a document in flat canonical form
pub fn to_flat_string(doc: &Document) -> Result<String> {
    Xml::flat().print(doc)
}

/// Print a document in indented canonical form
pub fn to_indented_string(doc: &Document) -> Result<String> {
    Xml::indented().print(doc)
}
