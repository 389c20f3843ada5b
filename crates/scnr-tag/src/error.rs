//! Error types for the scenario object model.

use scnr_schema::{FieldId, FieldKind};
use thiserror::Error;

use crate::{EntityHandle, SelectionKind};

/// Errors that can occur while loading or editing a scenario.
#[derive(Debug, Error)]
pub enum Error {
    /// Byte store error, including out-of-range addresses and commit failures.
    #[error("{0}")]
    Store(#[from] scnr_common::Error),

    /// Schema error.
    #[error("{0}")]
    Schema(#[from] scnr_schema::Error),

    /// A block header holds a negative count or an untranslatable pointer.
    #[error("corrupt block header at {address:#x}: count {count}, pointer {pointer:#x}")]
    CorruptHeader { address: u64, count: i32, pointer: u32 },

    /// A block id that was never registered or has been released.
    #[error("unknown or released block #{0}")]
    UnknownBlock(usize),

    /// Raw element access outside a block's bounds.
    #[error("element {index} out of range for block #{block} (count {count})")]
    ElementOutOfRange {
        block: usize,
        index: usize,
        count: usize,
    },

    /// Structural edit on an index outside `[0, count)`.
    #[error("index {index} out of range for {kind} (count {count})")]
    InvalidIndex {
        kind: SelectionKind,
        index: usize,
        count: usize,
    },

    /// Field access on an entity that does not exist.
    #[error("no entity at {0}")]
    UnknownEntity(EntityHandle),

    /// Write to an entity whose backing record was removed.
    #[error("entity {kind}[{index}] is detached")]
    EntityDetached { kind: SelectionKind, index: usize },

    /// Value kind does not match the field's schema kind.
    #[error("field {field} expects {expected}, got {found}")]
    TypeMismatch {
        field: FieldId,
        expected: FieldKind,
        found: &'static str,
    },

    /// A shifted cross-reference no longer fits its field.
    #[error("index {value} does not fit field {field} ({kind})")]
    IndexOverflow {
        field: FieldId,
        kind: FieldKind,
        value: i64,
    },

    /// The target cannot be edited: not loaded, absent from this format, or synthetic.
    #[error("{0} is not editable in this scenario")]
    NotEditable(SelectionKind),

    /// Structural edit requested while a field write is still notifying listeners.
    #[error("structural edit on {0} while a field write is in flight")]
    EditInProgress(SelectionKind),

    /// A value cannot be parsed as, or encoded in, the field kind.
    #[error("{text:?} is not a valid {kind} value")]
    InvalidValue { kind: FieldKind, text: String },

    /// A selection path could not be parsed.
    #[error("unknown selection: {0}")]
    InvalidSelection(String),
}

/// Result type for scenario operations.
pub type Result<T> = std::result::Result<T, Error>;
