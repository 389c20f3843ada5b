//! Field identifiers and on-disk field types.

use serde::{Deserialize, Serialize};

/// Stable identifier of a field, independent of format version.
///
/// A section that lacks a given id simply does not carry that field in this
/// format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldId {
    /// Display name (fixed string or string id).
    Name,
    /// Object type code of the placement an object name belongs to.
    ObjectType,
    /// Index into the placement block selected by `ObjectType`.
    PlacementIndex,
    /// Index into a placement palette.
    PaletteIndex,
    /// Index into the object name table.
    NameIndex,
    Position,
    Rotation,
    Scale,
    Forward,
    Up,
    Size,
    /// Index of a parent record in the same block.
    ParentIndex,
    /// Index into the AI zone block.
    ZoneIndex,
    /// Index into the AI squad group block.
    SquadGroupIndex,
    /// Index into the owning zone's area block.
    AreaIndex,
    /// Tag reference held by a palette entry.
    ObjectRef,
    Flags,
}

impl FieldId {
    pub const ALL: [FieldId; 17] = [
        FieldId::Name,
        FieldId::ObjectType,
        FieldId::PlacementIndex,
        FieldId::PaletteIndex,
        FieldId::NameIndex,
        FieldId::Position,
        FieldId::Rotation,
        FieldId::Scale,
        FieldId::Forward,
        FieldId::Up,
        FieldId::Size,
        FieldId::ParentIndex,
        FieldId::ZoneIndex,
        FieldId::SquadGroupIndex,
        FieldId::AreaIndex,
        FieldId::ObjectRef,
        FieldId::Flags,
    ];

    /// Fields holding an index into another collection. They must be able to
    /// store the `-1` sentinel.
    pub const CROSS_REFERENCES: [FieldId; 7] = [
        FieldId::PaletteIndex,
        FieldId::NameIndex,
        FieldId::PlacementIndex,
        FieldId::ZoneIndex,
        FieldId::SquadGroupIndex,
        FieldId::ParentIndex,
        FieldId::AreaIndex,
    ];

    #[inline]
    pub fn is_cross_reference(&self) -> bool {
        Self::CROSS_REFERENCES.contains(self)
    }

    /// Get the schema name of this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::ObjectType => "object_type",
            Self::PlacementIndex => "placement_index",
            Self::PaletteIndex => "palette_index",
            Self::NameIndex => "name_index",
            Self::Position => "position",
            Self::Rotation => "rotation",
            Self::Scale => "scale",
            Self::Forward => "forward",
            Self::Up => "up",
            Self::Size => "size",
            Self::ParentIndex => "parent_index",
            Self::ZoneIndex => "zone_index",
            Self::SquadGroupIndex => "squad_group_index",
            Self::AreaIndex => "area_index",
            Self::ObjectRef => "object_ref",
            Self::Flags => "flags",
        }
    }

    /// Parse from the schema name (`-` and `_` are interchangeable).
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name.replace('-', "_");
        Self::ALL.into_iter().find(|id| id.as_str() == normalized)
    }
}

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// On-disk representation of a field. The byte length is implied by the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
    Vector2,
    Vector3,
    Vector4,
    /// 32-byte null-padded ASCII string.
    String32,
    /// 32-bit string id.
    StringId,
    /// 16-byte tag reference: group tag, two unused words, datum index.
    TagRef,
}

impl FieldKind {
    /// Get the size in bytes of this kind.
    pub fn size(&self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 | Self::StringId => 4,
            Self::Vector2 => 8,
            Self::Vector3 => 12,
            Self::Vector4 | Self::TagRef => 16,
            Self::String32 => 32,
        }
    }

    /// Whether this kind can hold the `-1` "no reference" sentinel.
    pub fn is_signed_index(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Float32 => "float32",
            Self::Vector2 => "vector2",
            Self::Vector3 => "vector3",
            Self::Vector4 => "vector4",
            Self::String32 => "string32",
            Self::StringId => "string_id",
            Self::TagRef => "tag_ref",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A field within one element of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Byte offset from the start of the element.
    pub offset: u32,
    /// Encoding of the field.
    #[serde(rename = "type")]
    pub kind: FieldKind,
}

impl FieldDef {
    pub const fn new(offset: u32, kind: FieldKind) -> Self {
        Self { offset, kind }
    }

    /// Offset one past the last byte of the field.
    pub fn end(&self) -> u64 {
        u64::from(self.offset) + self.kind.size() as u64
    }

    /// Absolute address of this field inside the element at `element_base`.
    #[inline]
    pub fn address(&self, element_base: u64) -> u64 {
        element_base + u64::from(self.offset)
    }
}
