//! Raw structural mutation of record arrays.
//!
//! The editor only moves bytes and keeps block headers consistent. It knows
//! nothing about entities or cross-references; the scenario layer re-indexes
//! those after each call.
//!
//! Every operation shifts or copies bytes first and rewrites the block's
//! header last, so an interrupted edit never advertises a count that the
//! buffer cannot back.

use scnr_common::ByteStore;
use scnr_schema::SectionLayout;
use tracing::debug;

use crate::block::{BlockHeader, BlockId, BlockRef, BlockTable};
use crate::{Error, Result};

/// Insert, remove and duplicate elements of registered blocks.
pub struct BlockEditor<'a> {
    store: &'a mut ByteStore,
    blocks: &'a mut BlockTable,
}

impl<'a> BlockEditor<'a> {
    pub fn new(store: &'a mut ByteStore, blocks: &'a mut BlockTable) -> Self {
        Self { store, blocks }
    }

    /// Append one zero-initialized element. Returns its index.
    pub fn add(&mut self, id: BlockId) -> Result<usize> {
        let (block, _) = self.open_slot(id, None)?;
        self.blocks.update(self.store, id, block)?;
        debug!(block = id.index(), count = block.count, "added element");
        Ok(block.count - 1)
    }

    /// Insert one zero-initialized element at `index` (`index <= count`).
    pub fn insert(&mut self, id: BlockId, index: usize) -> Result<u64> {
        let (block, address) = self.open_slot(id, Some(index))?;
        self.blocks.update(self.store, id, block)?;
        Ok(address)
    }

    /// Delete element `index`, shifting the following elements back.
    ///
    /// Returns the nested blocks whose headers were inside the removed element.
    pub fn remove(&mut self, id: BlockId, index: usize) -> Result<Vec<BlockId>> {
        let mut block = self.blocks.get(id)?;
        let at = block
            .element_address(index)
            .ok_or(Error::ElementOutOfRange {
                block: id.index(),
                index,
                count: block.count,
            })?;
        let stride = u64::from(block.stride);

        self.store.remove_range(at, block.stride as usize)?;
        let released = self.blocks.shift_for_remove(self.store, at, stride, id)?;

        block.count -= 1;
        self.blocks.update(self.store, id, block)?;
        debug!(block = id.index(), index, count = block.count, released = released.len(), "removed element");
        Ok(released)
    }

    /// Duplicate element `source` into a new slot at `dest` (`dest <= count`).
    ///
    /// Elements at and after `dest` move forward by one. Returns the address of
    /// the new element.
    pub fn copy(&mut self, id: BlockId, source: usize, dest: usize) -> Result<u64> {
        let current = self.blocks.get(id)?;
        if source >= current.count {
            return Err(Error::ElementOutOfRange {
                block: id.index(),
                index: source,
                count: current.count,
            });
        }

        let (block, address) = self.open_slot(id, Some(dest))?;
        let shifted_source = if source >= dest { source + 1 } else { source };
        let from = block
            .element_address(shifted_source)
            .ok_or(Error::ElementOutOfRange {
                block: id.index(),
                index: shifted_source,
                count: block.count,
            })?;
        self.store.copy_within(from, address, block.stride as usize)?;

        self.blocks.update(self.store, id, block)?;
        debug!(block = id.index(), source, dest, count = block.count, "copied element");
        Ok(address)
    }

    /// Make room for one element without touching the header.
    ///
    /// Returns the grown reference (count already incremented) and the address
    /// of the new slot. `None` appends.
    fn open_slot(&mut self, id: BlockId, index: Option<usize>) -> Result<(BlockRef, u64)> {
        let mut block = self.blocks.get(id)?;
        let index = index.unwrap_or(block.count);
        if index > block.count {
            return Err(Error::ElementOutOfRange {
                block: id.index(),
                index,
                count: block.count,
            });
        }

        let stride = u64::from(block.stride);
        let address = match block.slot_address(index) {
            Some(at) => {
                self.store.insert_zeroed(at, block.stride as usize)?;
                self.blocks.shift_for_insert(self.store, at, stride, id)?;
                at
            }
            None => {
                let at = self.store.append_zeroed(block.stride as usize);
                block.first_address = Some(at);
                at
            }
        };

        block.count += 1;
        Ok((block, address))
    }

    /// Give every nested block of the element at `element` its own storage.
    ///
    /// Used after [`copy`](Self::copy): the duplicate's headers still point at
    /// the source's nested records. Each non-empty nested block is copied to the
    /// end of the store and its header repointed, recursively.
    pub fn detach_nested(&mut self, element: u64, layout: &SectionLayout) -> Result<()> {
        let base = self.blocks.pointer_base();
        for name in layout.block_names() {
            let Some(child) = layout.block(name) else { continue };
            let header_address = element + u64::from(child.header_offset);
            let header = BlockHeader::read(self.store, header_address)?;
            if header.count <= 0 || header.pointer == 0 {
                continue;
            }

            let corrupt = Error::CorruptHeader {
                address: header_address,
                count: header.count,
                pointer: header.pointer,
            };
            let Some(source) = header.pointer.checked_sub(base) else {
                return Err(corrupt);
            };
            let len = header.count as usize * child.stride as usize;
            let bytes = self.store.read(u64::from(source), len)?.to_vec();

            let target = self.store.append_zeroed(len);
            self.store.write(target, &bytes)?;
            let pointer = target
                .checked_add(u64::from(base))
                .and_then(|p| u32::try_from(p).ok())
                .ok_or(corrupt)?;
            BlockHeader {
                count: header.count,
                pointer,
            }
            .write(self.store, header_address)?;

            for i in 0..header.count as u64 {
                self.detach_nested(target + i * u64::from(child.stride), child)?;
            }
        }
        Ok(())
    }
}
