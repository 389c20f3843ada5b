//! Layout catalog for scenario tag data.
//!
//! A [`SchemaCatalog`] maps section names to a [`SectionLayout`]: the element
//! stride, where the block's `(count, pointer)` header sits, the fields of one
//! element and any nested blocks. Layouts are supplied externally (usually as
//! JSON), validated once and then only read.
//!
//! ```
//! use scnr_schema::{FieldId, FieldKind, SectionLayout};
//!
//! let scenery = SectionLayout::new(0x54)
//!     .at(0x10)
//!     .with_field(FieldId::PaletteIndex, 0x00, FieldKind::Int16)
//!     .with_field(FieldId::Position, 0x08, FieldKind::Vector3);
//!
//! // Field offsets are per element: absolute = element base + offset.
//! assert_eq!(scenery.resolve(FieldId::Position, 0x2000), Some(0x2008));
//! ```

mod catalog;
mod error;
mod field;
mod section;

pub use catalog::{FormatVersion, SchemaCatalog};
pub use error::{Error, Result};
pub use field::{FieldDef, FieldId, FieldKind};
pub use section::{SectionLayout, BLOCK_HEADER_SIZE};
