//! Byte-faithful document store for the `.bsmx` brewing file family
//!
//! The format looks like XML but is not: a document may carry several
//! top-level sibling roots, HTML-style entities appear in text, and the
//! originating application is intolerant of cosmetic rewrites. This crate
//! therefore treats the file as bytes first and markup second:
//!
//! - [`fragment`] scans top-level element boundaries and parses each
//!   fragment into a span-tagged tree,
//! - [`document`] extracts records into owned [`model::Entity`] values,
//! - [`writer`] persists field updates by splicing spans, with a
//!   timestamped backup and an atomic rename per touched file.
//!
//! Loading a document and writing zero updates reproduces its bytes
//! exactly; writing one field changes only that field's content bytes.

pub mod document;
pub mod error;
pub mod fragment;
pub mod model;
pub mod value;
pub mod writer;

pub use document::{DocumentStore, StoreDocument, DEFAULT_LOCK_TIMEOUT};
pub use error::{FormatError, PersistenceError, StoreError};
pub use fragment::{Fragment, XmlElement};
pub use model::{Entity, EntityKind, FieldSpan, Provenance, ALL_KINDS};
pub use value::{decode_text, xml_escape, FieldMap, FieldValue};
pub use writer::{EntityUpdate, WriteReceipt};

#[cfg(test)]
mod tests;
