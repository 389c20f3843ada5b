//! Typed read views over bound records.
//!
//! Each view borrows one [`BoundRecord`] and exposes the fields its entity kind
//! carries. A field the schema does not define reads as `None`.

use scnr_schema::FieldId;

use crate::record::BoundRecord;
use crate::selection::PlacementKind;
use crate::value::{FieldValue, TagReference};

macro_rules! entity_view {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub struct $name<'a> {
            record: &'a BoundRecord,
        }

        impl<'a> $name<'a> {
            #[inline]
            pub fn new(record: &'a BoundRecord) -> Self {
                Self { record }
            }

            #[inline]
            pub fn record(&self) -> &'a BoundRecord {
                self.record
            }

            /// Position in the owning collection.
            #[inline]
            pub fn index(&self) -> usize {
                self.record.index()
            }
        }
    };
}

entity_view!(
    /// Entry of the object-name table.
    ObjectName
);
entity_view!(
    /// An object instance in one of the placement blocks.
    Placement
);
entity_view!(
    /// Palette entry referenced by placements.
    PaletteEntry
);
entity_view!(TriggerVolume);
entity_view!(
    /// Player starting position.
    StartingPosition
);

fn vector3(record: &BoundRecord, field: FieldId) -> Option<[f32; 3]> {
    record.get(field).and_then(FieldValue::as_vector3)
}

/// Scalar facing read from either a plain float or the yaw of a vector.
pub(crate) fn facing(record: &BoundRecord) -> Option<f32> {
    match record.get(FieldId::Rotation)? {
        FieldValue::Float(v) => Some(*v),
        FieldValue::Vector2([yaw, _]) => Some(*yaw),
        FieldValue::Vector3([yaw, _, _]) => Some(*yaw),
        _ => None,
    }
}

impl<'a> ObjectName<'a> {
    pub fn name(&self) -> Option<&'a str> {
        self.record.name()
    }

    /// Placement family this name belongs to.
    pub fn object_type(&self) -> Option<PlacementKind> {
        self.record
            .index_ref(FieldId::ObjectType)
            .and_then(PlacementKind::from_object_type)
    }

    pub fn placement_index(&self) -> Option<usize> {
        self.record.valid_ref(FieldId::PlacementIndex)
    }
}

impl Placement<'_> {
    pub fn palette_index(&self) -> Option<usize> {
        self.record.valid_ref(FieldId::PaletteIndex)
    }

    pub fn name_index(&self) -> Option<usize> {
        self.record.valid_ref(FieldId::NameIndex)
    }

    pub fn position(&self) -> Option<[f32; 3]> {
        vector3(self.record, FieldId::Position)
    }

    pub fn rotation(&self) -> Option<[f32; 3]> {
        vector3(self.record, FieldId::Rotation)
    }

    pub fn scale(&self) -> Option<f32> {
        self.record.get(FieldId::Scale).and_then(FieldValue::as_f32)
    }
}

impl PaletteEntry<'_> {
    /// Referenced object tag, `None` when unset.
    pub fn object(&self) -> Option<TagReference> {
        self.record
            .get(FieldId::ObjectRef)
            .and_then(FieldValue::as_tag_ref)
            .filter(|r| !r.is_null())
    }
}

impl<'a> TriggerVolume<'a> {
    pub fn name(&self) -> Option<&'a str> {
        self.record.name()
    }

    pub fn position(&self) -> Option<[f32; 3]> {
        vector3(self.record, FieldId::Position)
    }

    pub fn forward(&self) -> Option<[f32; 3]> {
        vector3(self.record, FieldId::Forward)
    }

    pub fn up(&self) -> Option<[f32; 3]> {
        vector3(self.record, FieldId::Up)
    }

    pub fn size(&self) -> Option<[f32; 3]> {
        vector3(self.record, FieldId::Size)
    }
}

impl StartingPosition<'_> {
    pub fn position(&self) -> Option<[f32; 3]> {
        vector3(self.record, FieldId::Position)
    }

    pub fn facing(&self) -> Option<f32> {
        facing(self.record)
    }
}
