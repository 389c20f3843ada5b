//! Cross-reference maintenance across structural edits.
//!
//! Every collection that stores an index into another collection is listed in
//! [`dependents`]. After an insert or remove at position `p`, each such stored
//! index is shifted with [`shift_reference`]; a reference to a removed element
//! becomes [`SENTINEL`].

use scnr_schema::FieldId;

use crate::selection::{PlacementKind, SelectionKind};
use crate::value::SENTINEL;

/// A positional change to one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexEdit {
    /// An element was inserted at this position.
    Inserted(usize),
    /// The element at this position was removed.
    Removed(usize),
}

impl IndexEdit {
    #[inline]
    pub fn position(&self) -> usize {
        match *self {
            Self::Inserted(p) | Self::Removed(p) => p,
        }
    }

    /// New position of an element that sat at `index` before the edit.
    ///
    /// `None` for the removed element.
    pub fn remap(&self, index: usize) -> Option<usize> {
        match *self {
            Self::Inserted(p) if index >= p => Some(index + 1),
            Self::Removed(p) if index == p => None,
            Self::Removed(p) if index > p => Some(index - 1),
            _ => Some(index),
        }
    }
}

/// Shift a stored cross-reference to follow an edit of the referenced collection.
///
/// Negative values are sentinels and never change.
pub fn shift_reference(value: i64, edit: IndexEdit) -> i64 {
    if value < 0 {
        return value;
    }
    match edit {
        IndexEdit::Removed(p) if value == p as i64 => i64::from(SENTINEL),
        IndexEdit::Removed(p) if value > p as i64 => value - 1,
        IndexEdit::Inserted(p) if value >= p as i64 => value + 1,
        _ => value,
    }
}

/// A field on `holder` records that indexes into some other collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dependent {
    pub holder: SelectionKind,
    pub field: FieldId,
    /// Only holders whose `ObjectType` field equals this code reference the
    /// edited collection.
    pub object_type: Option<i64>,
}

impl Dependent {
    const fn new(holder: SelectionKind, field: FieldId) -> Self {
        Self {
            holder,
            field,
            object_type: None,
        }
    }
}

/// Fields that index into another collection, initialised to the sentinel
/// when a record is added.
pub const CROSS_REFERENCE_FIELDS: [FieldId; 7] = FieldId::CROSS_REFERENCES;

/// Every collection holding an index into `edited`.
pub fn dependents(edited: SelectionKind) -> Vec<Dependent> {
    match edited {
        SelectionKind::Placements(kind) => vec![Dependent {
            holder: SelectionKind::ObjectNames,
            field: FieldId::PlacementIndex,
            object_type: Some(kind.object_type()),
        }],
        SelectionKind::Palette(kind) => {
            vec![Dependent::new(SelectionKind::Placements(kind), FieldId::PaletteIndex)]
        }
        SelectionKind::ObjectNames => PlacementKind::ALL
            .into_iter()
            .map(|kind| Dependent::new(SelectionKind::Placements(kind), FieldId::NameIndex))
            .collect(),
        SelectionKind::Zones => vec![Dependent::new(SelectionKind::Squads, FieldId::ZoneIndex)],
        SelectionKind::SquadGroups => vec![
            Dependent::new(SelectionKind::Squads, FieldId::SquadGroupIndex),
            Dependent::new(SelectionKind::SquadGroups, FieldId::ParentIndex),
        ],
        SelectionKind::Areas { zone } => vec![Dependent::new(
            SelectionKind::FiringPositions { zone },
            FieldId::AreaIndex,
        )],
        _ => Vec::new(),
    }
}
