//! Common utilities for scnr.
//!
//! This crate provides the byte-level foundation used across all scnr crates:
//!
//! - [`ByteStore`] - Growable, bounds-checked buffer holding a scenario tag's raw data
//! - [`Origin`] - Where a store commits to ([`FileOrigin`], [`MemoryOrigin`])
//! - [`BinaryReader`] / [`BinaryWriter`] - Cursor decoding and encoding
//! - [`Endian`] - Runtime byte-order policy

mod endian;
mod error;
mod reader;
mod store;
mod writer;

pub use endian::Endian;
pub use error::{Error, Result};
pub use reader::BinaryReader;
pub use store::{ByteStore, FileOrigin, MemoryOrigin, Origin};
pub use writer::BinaryWriter;
