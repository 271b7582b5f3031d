//! Error types for entity parsing and dump I/O.
//!
//! Absent optional data (a missing language, property or sitelink) is never an error;
//! the accessors return empty values instead. The variants here cover input that is
//! structurally wrong and would otherwise produce incorrect facts.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed snak for property {property}: {reason}")]
    MalformedSnak { property: String, reason: String },

    #[error("unknown datavalue type: {0}")]
    UnknownDataValueType(String),

    #[error("malformed {kind} datavalue: {reason}")]
    MalformedDataValue { kind: &'static str, reason: String },

    #[error("malformed dump line {line_number}: {reason}")]
    MalformedDumpLine { line_number: u64, reason: String },

    #[error("unsupported compression for {path:?} (expected .json, .json.gz or .json.bz2)")]
    UnsupportedCompression { path: PathBuf },

    #[error("{context} is missing required key `{key}`")]
    MissingKey {
        context: &'static str,
        key: &'static str,
    },

    #[error("entity type mismatch: expected {expected}, found {found}")]
    EntityTypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("invalid {context}: {reason}")]
    Invalid {
        context: &'static str,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(context: &'static str, reason: impl Into<String>) -> Self {
        Error::Invalid {
            context,
            reason: reason.into(),
        }
    }
}
