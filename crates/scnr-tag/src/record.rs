//! Bound records and the ordered collections that own them.
//!
//! A [`Collection`] mirrors one block: `records[i]` is bound to element `i`.
//! Each [`BoundRecord`] caches the decoded value of every schema field of its
//! element and owns the collections of its nested blocks.

use std::hash::BuildHasherDefault;

use hashbrown::HashMap as FastHashMap;
use rustc_hash::FxHasher;
use scnr_common::{BinaryReader, ByteStore, Endian};
use scnr_schema::{FieldDef, FieldId, SectionLayout};
use tracing::{trace, warn};

use crate::binding::Binding;
use crate::block::{BlockId, BlockRef, BlockTable};
use crate::value::FieldValue;
use crate::Result;

pub(crate) type FxHashMap<K, V> = FastHashMap<K, V, BuildHasherDefault<FxHasher>>;

type FieldValues = FxHashMap<FieldId, FieldValue>;

/// One entity: a binding plus cached field values and nested collections.
#[derive(Debug, Clone)]
pub struct BoundRecord {
    binding: Binding,
    values: FieldValues,
    children: FxHashMap<String, Collection>,
}

impl BoundRecord {
    #[inline]
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    #[inline]
    pub(crate) fn binding_mut(&mut self) -> &mut Binding {
        &mut self.binding
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.binding.index()
    }

    /// Cached value of `field`, if the layout has it.
    #[inline]
    pub fn get(&self, field: FieldId) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    /// Cached value of an integer field.
    pub fn index_ref(&self, field: FieldId) -> Option<i64> {
        self.get(field).and_then(FieldValue::as_index)
    }

    /// Cross-reference as a usable index: `None` when unset or negative.
    pub fn valid_ref(&self, field: FieldId) -> Option<usize> {
        self.index_ref(field).and_then(|v| usize::try_from(v).ok())
    }

    pub fn name(&self) -> Option<&str> {
        self.get(FieldId::Name).and_then(FieldValue::as_str)
    }

    /// Nested collection by block name.
    pub fn child(&self, name: &str) -> Option<&Collection> {
        self.children.get(name)
    }

    pub(crate) fn child_mut(&mut self, name: &str) -> Option<&mut Collection> {
        self.children.get_mut(name)
    }

    /// Cached values in no particular order.
    pub fn values(&self) -> impl Iterator<Item = (FieldId, &FieldValue)> {
        self.values.iter().map(|(id, v)| (*id, v))
    }

    /// Update the cache only.
    pub(crate) fn set_cached(&mut self, field: FieldId, value: FieldValue) {
        self.values.insert(field, value);
    }

    /// Write `value` to the store at the field's address, then update the cache.
    pub(crate) fn store_value(
        &mut self,
        store: &mut ByteStore,
        blocks: &BlockTable,
        field: FieldId,
        def: &FieldDef,
        value: FieldValue,
    ) -> Result<()> {
        let address = def.address(self.binding.element_address(blocks)?);
        let mut writer = store.writer(address, def.kind.size())?;
        value.write(&mut writer)?;
        trace!(field = field.as_str(), address, %value, "wrote field");
        self.values.insert(field, value);
        Ok(())
    }

    /// Mark this record and everything nested below it as detached.
    pub(crate) fn detach(&mut self) {
        self.binding.detach();
        for child in self.children.values_mut() {
            for record in &mut child.records {
                record.detach();
            }
        }
    }

    /// Decode element `index` of `block` and resolve its nested blocks.
    pub(crate) fn load(
        store: &ByteStore,
        blocks: &mut BlockTable,
        block: BlockId,
        index: usize,
        layout: &SectionLayout,
        path: &str,
    ) -> Result<Self> {
        let binding = Binding::loading(block, index);
        let base = binding.element_address(blocks)?;
        let values = decode_values(store.as_bytes(), store.endian(), layout, base, path);
        let mut record = Self {
            binding,
            values,
            children: FxHashMap::default(),
        };
        record.load_children(store, blocks, base, layout, path);
        record.binding.finish_load();
        Ok(record)
    }

    fn load_children(
        &mut self,
        store: &ByteStore,
        blocks: &mut BlockTable,
        base: u64,
        layout: &SectionLayout,
        path: &str,
    ) {
        for name in layout.block_names() {
            let Some(child) = layout.block(name) else { continue };
            let child_path = format!("{path}/{name}");
            let header = base + u64::from(child.header_offset);
            if let Some(collection) =
                Collection::load(store, blocks, header, child, Some(self.binding.block()), &child_path)
            {
                self.children.insert(name.to_string(), collection);
            }
        }
    }
}

/// Ordered records of one block.
#[derive(Debug, Clone)]
pub struct Collection {
    block: BlockId,
    pub(crate) records: Vec<BoundRecord>,
}

impl Collection {
    #[inline]
    pub fn block(&self) -> BlockId {
        self.block
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&BoundRecord> {
        self.records.get(index)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut BoundRecord> {
        self.records.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BoundRecord> {
        self.records.iter()
    }

    /// Resolve the block whose header is at `header_address` and bind every
    /// element.
    ///
    /// Best effort: an unreadable header or an element range outside the store
    /// logs a warning and yields `None`, leaving the rest of the scenario
    /// loadable.
    pub(crate) fn load(
        store: &ByteStore,
        blocks: &mut BlockTable,
        header_address: u64,
        layout: &SectionLayout,
        parent: Option<BlockId>,
        path: &str,
    ) -> Option<Self> {
        let block = match blocks.resolve(store, header_address, layout.stride, parent) {
            Ok(block) => block,
            Err(e) => {
                warn!(path, error = %e, "skipping unreadable block");
                return None;
            }
        };
        let reference = blocks.get(block).ok()?;
        if !fits(&reference, store.len()) {
            warn!(path, count = reference.count, first = ?reference.first_address, "block exceeds the buffer, skipping");
            blocks.release(block);
            return None;
        }

        let values = decode_all(store, layout, &reference, path);
        let mut records = Vec::with_capacity(values.len());
        for (index, values) in values.into_iter().enumerate() {
            let mut record = BoundRecord {
                binding: Binding::loading(block, index),
                values,
                children: FxHashMap::default(),
            };
            if let Some(base) = reference.element_address(index) {
                record.load_children(store, blocks, base, layout, path);
            }
            record.binding.finish_load();
            records.push(record);
        }

        Some(Self { block, records })
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a BoundRecord;
    type IntoIter = std::slice::Iter<'a, BoundRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn fits(reference: &BlockRef, size: usize) -> bool {
    match reference.first_address {
        None => reference.count == 0,
        Some(first) => first
            .checked_add(reference.byte_len())
            .is_some_and(|end| end <= size as u64),
    }
}

/// Decode the fields of every element of a block.
fn decode_all(store: &ByteStore, layout: &SectionLayout, reference: &BlockRef, path: &str) -> Vec<FieldValues> {
    let bases: Vec<u64> = (0..reference.count)
        .filter_map(|i| reference.element_address(i))
        .collect();
    let bytes = store.as_bytes();
    let endian = store.endian();

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        bases
            .par_iter()
            .map(|&base| decode_values(bytes, endian, layout, base, path))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        bases
            .iter()
            .map(|&base| decode_values(bytes, endian, layout, base, path))
            .collect()
    }
}

/// Decode every schema field of the element at `base`.
///
/// A field that cannot be decoded is left out of the cache and logged.
fn decode_values(bytes: &[u8], endian: Endian, layout: &SectionLayout, base: u64, path: &str) -> FieldValues {
    let mut values = FieldValues::default();
    let start = usize::try_from(base).unwrap_or(usize::MAX);
    let element = bytes
        .get(start..)
        .map(|rest| &rest[..rest.len().min(layout.stride as usize)])
        .unwrap_or_default();

    let mut reader = BinaryReader::new(element, endian);
    for (id, def) in layout.fields_by_offset() {
        reader.seek(def.offset as usize);
        match FieldValue::read(&mut reader, def.kind) {
            Ok(value) => {
                values.insert(id, value);
            }
            Err(e) => warn!(path, field = id.as_str(), base, error = %e, "skipping unreadable field"),
        }
    }
    values
}
