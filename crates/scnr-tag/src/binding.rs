//! Per-entity binding to a record and its write-through state machine.
//!
//! ```text
//!   Loading --finish_load--> Live --begin_write--> Busy
//!                             ^                      |
//!                             +------end_write-------+
//!   any --detach--> Detached
//! ```
//!
//! `Loading` and `Busy` entities take cache-only writes. A `Busy` entity is
//! one whose write is still notifying listeners, so a listener that sets the
//! same entity cannot loop back into the store.

use scnr_common::ByteStore;
use scnr_schema::{FieldId, SectionLayout};

use crate::block::{BlockId, BlockTable};
use crate::{Error, Result};

/// Lifecycle state of a bound entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntityState {
    /// Initial bulk read.
    #[default]
    Loading,
    Live,
    /// A write is in flight.
    Busy,
    /// The backing record was removed.
    Detached,
}

/// What a setter should do in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    CacheOnly,
    WriteThrough,
    Rejected,
}

/// Locates an entity's bytes: owning block plus current position in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    block: BlockId,
    index: usize,
    state: EntityState,
}

impl Binding {
    /// A binding in the `Loading` state.
    pub fn loading(block: BlockId, index: usize) -> Self {
        Self {
            block,
            index,
            state: EntityState::Loading,
        }
    }

    #[inline]
    pub fn block(&self) -> BlockId {
        self.block
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn state(&self) -> EntityState {
        self.state
    }

    #[inline]
    pub fn is_detached(&self) -> bool {
        self.state == EntityState::Detached
    }

    /// Leave the bulk-load state.
    pub fn finish_load(&mut self) {
        if self.state == EntityState::Loading {
            self.state = EntityState::Live;
        }
    }

    /// Start a write. A `Live` binding becomes `Busy` until [`end_write`](Self::end_write).
    pub fn begin_write(&mut self) -> WriteMode {
        match self.state {
            EntityState::Live => {
                self.state = EntityState::Busy;
                WriteMode::WriteThrough
            }
            EntityState::Loading | EntityState::Busy => WriteMode::CacheOnly,
            EntityState::Detached => WriteMode::Rejected,
        }
    }

    pub fn end_write(&mut self) {
        if self.state == EntityState::Busy {
            self.state = EntityState::Live;
        }
    }

    pub fn detach(&mut self) {
        self.state = EntityState::Detached;
    }

    /// Move to a new position. Returns the previous one.
    pub fn reindex(&mut self, index: usize) -> usize {
        std::mem::replace(&mut self.index, index)
    }

    /// Absolute address of the bound element.
    ///
    /// Always derived from the block table, so it follows relocations.
    pub fn element_address(&self, blocks: &BlockTable) -> Result<u64> {
        let block = blocks.get(self.block)?;
        block
            .element_address(self.index)
            .ok_or(Error::ElementOutOfRange {
                block: self.block.index(),
                index: self.index,
                count: block.count,
            })
    }

    /// Absolute address of `field` in the bound element, or `None` if the
    /// layout has no such field.
    pub fn field_address(
        &self,
        blocks: &BlockTable,
        layout: &SectionLayout,
        field: FieldId,
    ) -> Result<Option<u64>> {
        if !layout.has_field(field) {
            return Ok(None);
        }
        let base = self.element_address(blocks)?;
        Ok(layout.resolve(field, base))
    }

    /// Debug check that the element still lies inside the store.
    pub(crate) fn in_bounds(&self, store: &ByteStore, blocks: &BlockTable) -> bool {
        match (self.element_address(blocks), blocks.get(self.block)) {
            (Ok(address), Ok(block)) => address + u64::from(block.stride) <= store.len() as u64,
            _ => false,
        }
    }
}
