//! Error types for the document store.

use std::path::PathBuf;
use thiserror::Error;

/// Malformed or unrecognized document structure. Never retried; the
/// offending section is carried verbatim for the caller to surface.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("malformed XML in section `{section}`: {detail}")]
    Syntax { section: String, detail: String },

    #[error("unbalanced element `{section}` at byte {offset}")]
    Unbalanced { section: String, offset: usize },

    #[error("document ended inside section `{section}`")]
    UnexpectedEof { section: String },

    #[error("document is not valid UTF-8 in section `{section}`")]
    Encoding { section: String },
}

/// I/O failure during backup or write. The write-or-nothing discipline
/// guarantees the original file is unmodified whenever one of these
/// surfaces.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("backup of {path} failed: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not acquire write lock on {path} within {timeout_ms}ms")]
    LockTimeout { path: PathBuf, timeout_ms: u64 },

    #[error("no document in the store contains {kind} `{id}`")]
    NoSuchEntity { kind: String, id: String },

    #[error("{kind} `{id}` has no field `{field}` to update")]
    UnknownField {
        kind: String,
        id: String,
        field: String,
    },

    #[error("field `{field}` holds a nested list and cannot be updated in place")]
    NestedFieldUpdate { field: String },
}

/// Umbrella error for operations that touch both disk and parsing, such
/// as loading or reloading a store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
