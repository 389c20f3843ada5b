//! Per-section layout: element stride, header location and field table.

use std::hash::BuildHasherDefault;

use hashbrown::HashMap as FastHashMap;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use crate::{Error, FieldDef, FieldId, FieldKind, Result};

pub(crate) type FxHashMap<K, V> = FastHashMap<K, V, BuildHasherDefault<FxHasher>>;

/// Size of a block header: `count: i32` followed by `pointer: u32`.
pub const BLOCK_HEADER_SIZE: u32 = 8;

/// Layout of one variable-length record array.
///
/// `header_offset` locates the block's `(count, pointer)` header relative to
/// the owning element (or the scenario root for top-level sections). Field
/// offsets are relative to the start of one element of this block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionLayout {
    #[serde(default)]
    pub header_offset: u32,
    pub stride: u32,
    #[serde(default)]
    pub fields: FxHashMap<FieldId, FieldDef>,
    #[serde(default)]
    pub blocks: FxHashMap<String, SectionLayout>,
}

impl SectionLayout {
    /// Create an empty layout with the given element stride.
    pub fn new(stride: u32) -> Self {
        Self {
            stride,
            ..Self::default()
        }
    }

    /// Set the header offset.
    pub fn at(mut self, header_offset: u32) -> Self {
        self.header_offset = header_offset;
        self
    }

    /// Add a field.
    pub fn with_field(mut self, id: FieldId, offset: u32, kind: FieldKind) -> Self {
        self.fields.insert(id, FieldDef::new(offset, kind));
        self
    }

    /// Add a nested block.
    pub fn with_block(mut self, name: impl Into<String>, layout: SectionLayout) -> Self {
        self.blocks.insert(name.into(), layout);
        self
    }

    #[inline]
    pub fn field(&self, id: FieldId) -> Option<&FieldDef> {
        self.fields.get(&id)
    }

    #[inline]
    pub fn has_field(&self, id: FieldId) -> bool {
        self.fields.contains_key(&id)
    }

    #[inline]
    pub fn offset_of(&self, id: FieldId) -> Option<u32> {
        self.field(id).map(|f| f.offset)
    }

    /// Absolute address of `id` within the element at `element_base`.
    ///
    /// Returns `None` when this format version has no such field.
    #[inline]
    pub fn resolve(&self, id: FieldId, element_base: u64) -> Option<u64> {
        self.field(id).map(|f| f.address(element_base))
    }

    /// Nested block layout by name.
    #[inline]
    pub fn block(&self, name: &str) -> Option<&SectionLayout> {
        self.blocks.get(name)
    }

    /// Fields ordered by offset.
    pub fn fields_by_offset(&self) -> Vec<(FieldId, FieldDef)> {
        let mut fields: Vec<_> = self.fields.iter().map(|(id, def)| (*id, *def)).collect();
        fields.sort_by_key(|(id, def)| (def.offset, *id));
        fields
    }

    /// Nested block names in a stable order.
    pub fn block_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.blocks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check that every field and nested header fits inside one element.
    pub fn validate(&self, path: &str) -> Result<()> {
        if self.stride == 0 {
            return Err(Error::ZeroStride {
                section: path.to_string(),
            });
        }

        for (id, def) in &self.fields {
            if def.end() > u64::from(self.stride) {
                return Err(Error::FieldOutOfBounds {
                    section: path.to_string(),
                    field: *id,
                    offset: def.offset,
                    size: def.kind.size(),
                    stride: self.stride,
                });
            }
            if id.is_cross_reference() && !def.kind.is_signed_index() {
                return Err(Error::UnsignedReference {
                    section: path.to_string(),
                    field: *id,
                    kind: def.kind,
                });
            }
        }

        for (name, child) in &self.blocks {
            let child_path = format!("{path}/{name}");
            if u64::from(child.header_offset) + u64::from(BLOCK_HEADER_SIZE) > u64::from(self.stride) {
                return Err(Error::BlockHeaderOutOfBounds {
                    section: child_path,
                    offset: child.header_offset,
                    stride: self.stride,
                });
            }
            child.validate(&child_path)?;
        }

        Ok(())
    }
}
