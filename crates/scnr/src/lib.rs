//! Scnr - scenario tag inspection and editing library.
//!
//! This crate provides a unified interface to the scnr crates for working
//! with scenario tag data in place.
//!
//! # Crates
//!
//! - [`scnr_common`] - Byte store, origins and binary cursors
//! - [`scnr_schema`] - Section layouts and the JSON schema catalog
//! - [`scnr_tag`] - Bound object model, structural edits and the AI hierarchy
//!
//! # Example
//!
//! ```no_run
//! use scnr::prelude::*;
//!
//! let catalog = SchemaCatalog::load("halo2.json")?;
//! let mut scenario = Scenario::open("03a_oldmombasa.scenario", catalog)?;
//!
//! for zone in scenario.ai_tree().iter_zones() {
//!     println!("{} ({} squads)", zone.name, zone.squads.len());
//! }
//!
//! scenario.copy(SelectionKind::Squads, 0, 1)?;
//! scenario.commit()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use scnr_common as common;
pub use scnr_schema as schema;
pub use scnr_tag as tag;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use scnr_common::{ByteStore, Endian, FileOrigin, MemoryOrigin};
    pub use scnr_schema::{FieldId, FieldKind, FormatVersion, SchemaCatalog, SectionLayout};
    pub use scnr_tag::{
        AiTree, ChangeEvent, EditReport, EntityHandle, FieldValue, PlacementKind, Scenario, Selection, SelectionKind,
        StructuralOp, WriteOutcome,
    };
}

// Re-export commonly used types at the crate root
pub use scnr_tag::{Scenario, SelectionKind};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
