//! Error types for scnr-common.

use thiserror::Error;

/// Common error type for byte store operations.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading through a cursor.
    #[error("unexpected end of buffer: needed {needed} bytes but only {available} available")]
    UnexpectedEof { needed: usize, available: usize },

    /// An absolute access fell outside the store.
    ///
    /// This always points at a schema or index bookkeeping bug and is never clamped.
    #[error("address out of range: {len} bytes at {offset:#x} (store size {size:#x})")]
    OutOfRange { offset: u64, len: usize, size: usize },

    /// I/O error while loading a store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 decoding error.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// Missing null terminator in string.
    #[error("string missing null terminator")]
    MissingNullTerminator,

    /// Flushing the store back to its origin failed. In-memory edits are kept.
    #[error("failed to commit to {origin}: {source}")]
    Commit {
        origin: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
