//! Error types for schema loading.

use thiserror::Error;

use crate::{FieldId, FieldKind};

/// Errors that can occur while loading or validating a schema catalog.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON.
    #[error("schema JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A section with zero stride.
    #[error("section {section} has a zero stride")]
    ZeroStride { section: String },

    /// A field extends past the element stride.
    #[error("field {field} of {section} ({size} bytes at {offset:#x}) exceeds stride {stride:#x}")]
    FieldOutOfBounds {
        section: String,
        field: FieldId,
        offset: u32,
        size: usize,
        stride: u32,
    },

    /// A nested block header extends past the owning element.
    #[error("block header of {section} at {offset:#x} exceeds owning stride {stride:#x}")]
    BlockHeaderOutOfBounds {
        section: String,
        offset: u32,
        stride: u32,
    },

    /// An index field whose kind cannot hold the `-1` sentinel.
    #[error("index field {field} of {section} must be a signed integer, not {kind}")]
    UnsignedReference {
        section: String,
        field: FieldId,
        kind: FieldKind,
    },

    /// A section the caller required is not described.
    #[error("section not described by schema: {0}")]
    MissingSection(String),
}

/// Result type for schema operations.
pub type Result<T> = std::result::Result<T, Error>;
