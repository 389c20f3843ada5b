//! Live object model over scenario tag data.
//!
//! A [`Scenario`] binds every block described by a
//! [`SchemaCatalog`](scnr_schema::SchemaCatalog) to ordered collections of
//! [`BoundRecord`]s. Field writes go straight through to the byte store;
//! structural edits (add, remove, copy) shift the bytes, relocate every
//! registered block header and rewrite every cross-reference into the edited
//! collection.
//!
//! # Example
//!
//! ```no_run
//! use scnr_schema::{FieldId, SchemaCatalog};
//! use scnr_tag::{EntityHandle, FieldValue, PlacementKind, Scenario, SelectionKind};
//!
//! let catalog = SchemaCatalog::load("halo3.json")?;
//! let mut scenario = Scenario::open("010_jungle.scenario", catalog)?;
//!
//! let scenery = SelectionKind::Placements(PlacementKind::Scenery);
//! for item in scenario.items(scenery)? {
//!     println!("{}", item.label);
//! }
//!
//! let handle = EntityHandle::new(scenery, 0);
//! scenario.set_field(handle, FieldId::Position, FieldValue::Vector3([1.0, 2.0, 3.0]))?;
//!
//! // Removing a placement rewrites object-name references to it.
//! let report = scenario.remove(scenery, 0)?;
//! println!("{} entities changed", report.touched().len());
//!
//! scenario.commit()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod ai;
mod binding;
mod block;
mod change;
pub mod coordinator;
mod editor;
mod entity;
mod error;
pub mod locator;
mod record;
mod scenario;
mod selection;
mod value;

#[cfg(test)]
mod test_support;

pub use ai::{AiTree, AiTreeBuilder, LocationOwner, LocationSet, ZoneSlot};
pub use binding::{Binding, EntityState, WriteMode};
pub use block::{BlockHeader, BlockId, BlockRef, BlockTable};
pub use change::{
    ChangeEvent, ChangeListener, EditAction, EditReport, FieldChange, IndexChange, StructuralOp, WriteOutcome,
};
pub use coordinator::{shift_reference, IndexEdit};
pub use editor::BlockEditor;
pub use entity::{ObjectName, PaletteEntry, Placement, StartingPosition, TriggerVolume};
pub use error::{Error, Result};
pub use locator::{AuxiliaryTable, PropertyContext};
pub use record::{BoundRecord, Collection};
pub use scenario::{ItemLabel, Scenario};
pub use selection::{EntityHandle, PlacementKind, Selection, SelectionKind};
pub use value::{FieldValue, TagReference, SENTINEL};
