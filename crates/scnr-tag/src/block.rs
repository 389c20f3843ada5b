//! Block references and the registry of every block header resolved so far.
//!
//! A block is a variable-length array of fixed-stride records located through
//! a `(count: i32, pointer: u32)` header. Stored pointers are translated to
//! buffer offsets by subtracting the schema's `pointer_base`; a null pointer
//! marks a block that has never been allocated.
//!
//! Structural edits shift bytes, so [`BlockTable`] keeps the header address and
//! target address of every registered block and moves them (rewriting the
//! stored pointers) whenever bytes are inserted or removed in front of them.

use scnr_common::ByteStore;
use scnr_schema::BLOCK_HEADER_SIZE;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Handle to a registered block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

impl BlockId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Raw block header as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHeader {
    pub count: i32,
    pub pointer: u32,
}

impl BlockHeader {
    pub fn read(store: &ByteStore, address: u64) -> Result<Self> {
        let mut reader = store.reader(address, BLOCK_HEADER_SIZE as usize)?;
        Ok(Self {
            count: reader.read_i32()?,
            pointer: reader.read_u32()?,
        })
    }

    pub fn write(&self, store: &mut ByteStore, address: u64) -> Result<()> {
        let mut writer = store.writer(address, BLOCK_HEADER_SIZE as usize)?;
        writer.write_i32(self.count)?;
        writer.write_u32(self.pointer)?;
        Ok(())
    }
}

/// One resolved record array: stride, element count and first element address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRef {
    pub stride: u32,
    pub count: usize,
    /// `None` while the block has never been allocated.
    pub first_address: Option<u64>,
}

impl BlockRef {
    /// Address of element `index`, if it exists.
    #[inline]
    pub fn element_address(&self, index: usize) -> Option<u64> {
        if index >= self.count {
            return None;
        }
        self.first_address
            .map(|first| first + index as u64 * u64::from(self.stride))
    }

    /// Address at which element `index` would be inserted (`index <= count`).
    #[inline]
    pub fn slot_address(&self, index: usize) -> Option<u64> {
        self.first_address
            .map(|first| first + index as u64 * u64::from(self.stride))
    }

    /// Total size of all elements in bytes.
    #[inline]
    pub fn byte_len(&self) -> u64 {
        self.count as u64 * u64::from(self.stride)
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.first_address.is_some()
    }
}

#[derive(Debug, Clone)]
struct BlockSlot {
    header_address: u64,
    reference: BlockRef,
    parent: Option<BlockId>,
}

/// Registry of resolved blocks.
#[derive(Debug, Default)]
pub struct BlockTable {
    slots: Vec<Option<BlockSlot>>,
    pointer_base: u32,
}

impl BlockTable {
    pub fn new(pointer_base: u32) -> Self {
        Self {
            slots: Vec::new(),
            pointer_base,
        }
    }

    /// Value subtracted from stored pointers to obtain buffer offsets.
    #[inline]
    pub fn pointer_base(&self) -> u32 {
        self.pointer_base
    }

    /// Read the header at `header_address` and register the block.
    ///
    /// `parent` is the block whose element contains the header, if any; when
    /// that element goes away the block is released with it.
    pub fn resolve(
        &mut self,
        store: &ByteStore,
        header_address: u64,
        stride: u32,
        parent: Option<BlockId>,
    ) -> Result<BlockId> {
        let reference = self.decode(store, header_address, stride)?;
        let id = BlockId(self.slots.len());
        debug!(
            block = id.0,
            header = header_address,
            count = reference.count,
            first = ?reference.first_address,
            "resolved block"
        );
        self.slots.push(Some(BlockSlot {
            header_address,
            reference,
            parent,
        }));
        Ok(id)
    }

    /// Re-read the header of a registered block.
    ///
    /// Never reuses the cached count, so this is safe to call after any edit.
    pub fn refresh(&mut self, store: &ByteStore, id: BlockId) -> Result<BlockRef> {
        let (header_address, stride) = {
            let slot = self.slot(id)?;
            (slot.header_address, slot.reference.stride)
        };
        let reference = self.decode(store, header_address, stride)?;
        self.slot_mut(id)?.reference = reference;
        Ok(reference)
    }

    fn decode(&self, store: &ByteStore, header_address: u64, stride: u32) -> Result<BlockRef> {
        let header = BlockHeader::read(store, header_address)?;
        let corrupt = || Error::CorruptHeader {
            address: header_address,
            count: header.count,
            pointer: header.pointer,
        };

        let count = usize::try_from(header.count).map_err(|_| corrupt())?;
        let first_address = match header.pointer {
            0 if count == 0 => None,
            0 => return Err(corrupt()),
            pointer => Some(u64::from(pointer.checked_sub(self.pointer_base).ok_or_else(corrupt)?)),
        };

        Ok(BlockRef {
            stride,
            count,
            first_address,
        })
    }

    fn encode(&self, reference: &BlockRef) -> Result<BlockHeader> {
        let count = i32::try_from(reference.count).map_err(|_| Error::CorruptHeader {
            address: reference.first_address.unwrap_or_default(),
            count: i32::MAX,
            pointer: 0,
        })?;
        let pointer = match reference.first_address {
            None => 0,
            Some(address) => address
                .checked_add(u64::from(self.pointer_base))
                .and_then(|p| u32::try_from(p).ok())
                .ok_or(Error::CorruptHeader {
                    address,
                    count,
                    pointer: u32::MAX,
                })?,
        };
        Ok(BlockHeader { count, pointer })
    }

    fn slot(&self, id: BlockId) -> Result<&BlockSlot> {
        self.slots
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(Error::UnknownBlock(id.0))
    }

    fn slot_mut(&mut self, id: BlockId) -> Result<&mut BlockSlot> {
        self.slots
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(Error::UnknownBlock(id.0))
    }

    /// Current reference of a live block.
    pub fn get(&self, id: BlockId) -> Result<BlockRef> {
        self.slot(id).map(|s| s.reference)
    }

    /// Address of the block's header.
    pub fn header_address(&self, id: BlockId) -> Result<u64> {
        self.slot(id).map(|s| s.header_address)
    }

    /// Block whose element holds this block's header.
    pub fn parent(&self, id: BlockId) -> Result<Option<BlockId>> {
        self.slot(id).map(|s| s.parent)
    }

    #[inline]
    pub fn is_live(&self, id: BlockId) -> bool {
        self.slot(id).is_ok()
    }

    /// Number of live blocks.
    pub fn live_count(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    /// Store a new reference and write its header.
    pub(crate) fn update(&mut self, store: &mut ByteStore, id: BlockId, reference: BlockRef) -> Result<()> {
        let header = self.encode(&reference)?;
        let slot = self.slot_mut(id)?;
        header.write(store, slot.header_address)?;
        slot.reference = reference;
        Ok(())
    }

    /// Account for `len` bytes inserted at `at` while growing `edited`.
    pub(crate) fn shift_for_insert(
        &mut self,
        store: &mut ByteStore,
        at: u64,
        len: u64,
        edited: BlockId,
    ) -> Result<()> {
        let mut moved = Vec::new();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let Some(slot) = slot else { continue };
            if slot.header_address >= at {
                slot.header_address += len;
            }
            if i == edited.0 {
                continue;
            }
            if let Some(first) = slot.reference.first_address.filter(|first| *first >= at) {
                slot.reference.first_address = Some(first + len);
                moved.push(BlockId(i));
            }
        }

        for id in moved {
            self.rewrite_header(store, id)?;
        }
        Ok(())
    }

    /// Account for `len` bytes removed at `at` while shrinking `edited`.
    ///
    /// Blocks whose headers lived inside the removed range are released, along
    /// with everything nested below them. Returns the released ids.
    pub(crate) fn shift_for_remove(
        &mut self,
        store: &mut ByteStore,
        at: u64,
        len: u64,
        edited: BlockId,
    ) -> Result<Vec<BlockId>> {
        let end = at + len;
        let mut orphaned = Vec::new();
        let mut moved = Vec::new();

        for (i, entry) in self.slots.iter_mut().enumerate() {
            let Some(slot) = entry else { continue };
            if i != edited.0 && (at..end).contains(&slot.header_address) {
                orphaned.push(BlockId(i));
                continue;
            }
            if slot.header_address >= end {
                slot.header_address -= len;
            }
            if i == edited.0 {
                continue;
            }
            match slot.reference.first_address {
                Some(first) if first >= end => {
                    slot.reference.first_address = Some(first - len);
                    moved.push(BlockId(i));
                }
                Some(first) if first > at => {
                    warn!(block = i, first, "block data overlapped a removed record");
                    slot.reference.first_address = Some(at);
                    moved.push(BlockId(i));
                }
                _ => {}
            }
        }

        let mut released = Vec::new();
        for id in orphaned {
            released.extend(self.release(id));
        }
        for id in moved {
            if !self.is_live(id) {
                continue;
            }
            self.rewrite_header(store, id)?;
        }
        Ok(released)
    }

    fn rewrite_header(&mut self, store: &mut ByteStore, id: BlockId) -> Result<()> {
        let reference = self.get(id)?;
        self.update(store, id, reference)
    }

    /// Release a block and every block nested below it.
    pub fn release(&mut self, id: BlockId) -> Vec<BlockId> {
        let mut released = Vec::new();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let Some(entry) = self.slots.get_mut(current.0) else { continue };
            if entry.take().is_none() {
                continue;
            }
            released.push(current);
            pending.extend(
                self.slots
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| s.as_ref().is_some_and(|s| s.parent == Some(current)))
                    .map(|(i, _)| BlockId(i)),
            );
        }
        released
    }
}
