//! Typed field values and their byte encoding.

use std::fmt;

use scnr_common::{BinaryReader, BinaryWriter};
use scnr_schema::FieldKind;

use crate::{Error, Result};

/// Value of the "no reference" sentinel in index fields.
pub const SENTINEL: i32 = -1;

/// Group tag of a null tag reference.
const NULL_GROUP: u32 = 0xFFFF_FFFF;

/// A reference to another tag: four-character group plus datum index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagReference {
    pub group: u32,
    pub datum: u32,
}

impl TagReference {
    pub const NULL: TagReference = TagReference {
        group: NULL_GROUP,
        datum: NULL_GROUP,
    };

    pub fn new(group: [u8; 4], datum: u32) -> Self {
        Self {
            group: u32::from_be_bytes(group),
            datum,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.group == NULL_GROUP
    }

    /// Group tag as text, e.g. `scen`.
    pub fn group_name(&self) -> String {
        let bytes = self.group.to_be_bytes();
        if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            String::from_utf8_lossy(&bytes).into_owned()
        } else {
            format!("{:#010x}", self.group)
        }
    }

    fn parse(text: &str) -> Option<Self> {
        if text.eq_ignore_ascii_case("none") {
            return Some(Self::NULL);
        }
        let (group, datum) = text.split_once(':')?;
        let group: [u8; 4] = group.as_bytes().try_into().ok()?;
        Some(Self::new(group, parse_u32(datum)?))
    }
}

impl fmt::Display for TagReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("none")
        } else {
            write!(f, "{}:{:#010x}", self.group_name(), self.datum)
        }
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Float(f32),
    Vector2([f32; 2]),
    Vector3([f32; 3]),
    Vector4([f32; 4]),
    String(String),
    StringId(u32),
    TagRef(TagReference),
}

impl FieldValue {
    /// The schema kind this value encodes as.
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Int8(_) => FieldKind::Int8,
            Self::UInt8(_) => FieldKind::UInt8,
            Self::Int16(_) => FieldKind::Int16,
            Self::UInt16(_) => FieldKind::UInt16,
            Self::Int32(_) => FieldKind::Int32,
            Self::UInt32(_) => FieldKind::UInt32,
            Self::Float(_) => FieldKind::Float32,
            Self::Vector2(_) => FieldKind::Vector2,
            Self::Vector3(_) => FieldKind::Vector3,
            Self::Vector4(_) => FieldKind::Vector4,
            Self::String(_) => FieldKind::String32,
            Self::StringId(_) => FieldKind::StringId,
            Self::TagRef(_) => FieldKind::TagRef,
        }
    }

    /// Build an integer value of `kind`, or `None` if it does not fit.
    pub fn from_index(kind: FieldKind, value: i64) -> Option<Self> {
        Some(match kind {
            FieldKind::Int8 => Self::Int8(i8::try_from(value).ok()?),
            FieldKind::UInt8 => Self::UInt8(u8::try_from(value).ok()?),
            FieldKind::Int16 => Self::Int16(i16::try_from(value).ok()?),
            FieldKind::UInt16 => Self::UInt16(u16::try_from(value).ok()?),
            FieldKind::Int32 => Self::Int32(i32::try_from(value).ok()?),
            FieldKind::UInt32 => Self::UInt32(u32::try_from(value).ok()?),
            _ => return None,
        })
    }

    /// Integer payload widened to `i64`.
    pub fn as_index(&self) -> Option<i64> {
        match *self {
            Self::Int8(v) => Some(v.into()),
            Self::UInt8(v) => Some(v.into()),
            Self::Int16(v) => Some(v.into()),
            Self::UInt16(v) => Some(v.into()),
            Self::Int32(v) => Some(v.into()),
            Self::UInt32(v) => Some(v.into()),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match *self {
            Self::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vector3(&self) -> Option<[f32; 3]> {
        match *self {
            Self::Vector3(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tag_ref(&self) -> Option<TagReference> {
        match *self {
            Self::TagRef(r) => Some(r),
            _ => None,
        }
    }

    /// Decode a value of `kind` at the reader's position.
    pub fn read(reader: &mut BinaryReader<'_>, kind: FieldKind) -> scnr_common::Result<Self> {
        Ok(match kind {
            FieldKind::Int8 => Self::Int8(reader.read_i8()?),
            FieldKind::UInt8 => Self::UInt8(reader.read_u8()?),
            FieldKind::Int16 => Self::Int16(reader.read_i16()?),
            FieldKind::UInt16 => Self::UInt16(reader.read_u16()?),
            FieldKind::Int32 => Self::Int32(reader.read_i32()?),
            FieldKind::UInt32 => Self::UInt32(reader.read_u32()?),
            FieldKind::Float32 => Self::Float(reader.read_f32()?),
            FieldKind::Vector2 => Self::Vector2([reader.read_f32()?, reader.read_f32()?]),
            FieldKind::Vector3 => Self::Vector3([
                reader.read_f32()?,
                reader.read_f32()?,
                reader.read_f32()?,
            ]),
            FieldKind::Vector4 => Self::Vector4([
                reader.read_f32()?,
                reader.read_f32()?,
                reader.read_f32()?,
                reader.read_f32()?,
            ]),
            FieldKind::String32 => {
                let bytes = reader.read_bytes(FieldKind::String32.size())?;
                let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
                Self::String(String::from_utf8_lossy(&bytes[..end]).into_owned())
            }
            FieldKind::StringId => Self::StringId(reader.read_u32()?),
            FieldKind::TagRef => {
                let group = reader.read_u32()?;
                reader.advance(8);
                let datum = reader.read_u32()?;
                Self::TagRef(TagReference { group, datum })
            }
        })
    }

    /// Encode this value at the writer's position.
    pub fn write(&self, writer: &mut BinaryWriter<'_>) -> scnr_common::Result<()> {
        match self {
            Self::Int8(v) => writer.write_i8(*v),
            Self::UInt8(v) => writer.write_u8(*v),
            Self::Int16(v) => writer.write_i16(*v),
            Self::UInt16(v) => writer.write_u16(*v),
            Self::Int32(v) => writer.write_i32(*v),
            Self::UInt32(v) => writer.write_u32(*v),
            Self::Float(v) => writer.write_f32(*v),
            Self::Vector2(v) => v.iter().try_for_each(|c| writer.write_f32(*c)),
            Self::Vector3(v) => v.iter().try_for_each(|c| writer.write_f32(*c)),
            Self::Vector4(v) => v.iter().try_for_each(|c| writer.write_f32(*c)),
            Self::String(s) => writer.write_string_in_buffer(s, FieldKind::String32.size()),
            Self::StringId(v) => writer.write_u32(*v),
            Self::TagRef(r) => {
                writer.write_u32(r.group)?;
                let skip = writer.position() + 8;
                writer.seek(skip);
                writer.write_u32(r.datum)
            }
        }
    }

    /// Reject values the field encoding cannot hold exactly.
    ///
    /// A fixed string keeps at least one terminating NUL, so it holds at most
    /// 31 ASCII bytes.
    pub fn check_encodable(&self) -> Result<()> {
        match self {
            Self::String(s) if !fits_string32(s) => Err(Error::InvalidValue {
                kind: FieldKind::String32,
                text: s.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Parse text into a value of `kind`.
    ///
    /// Vectors are comma separated, tag references are `grp:datum` or `none`,
    /// unsigned values and string ids also accept `0x` hex.
    pub fn parse(kind: FieldKind, text: &str) -> Result<Self> {
        let text = text.trim();
        let invalid = || Error::InvalidValue {
            kind,
            text: text.to_string(),
        };

        let value = match kind {
            FieldKind::Int8
            | FieldKind::UInt8
            | FieldKind::Int16
            | FieldKind::UInt16
            | FieldKind::Int32
            | FieldKind::UInt32 => {
                let wide = match text.parse::<i64>() {
                    Ok(v) => v,
                    Err(_) => i64::from(parse_u32(text).ok_or_else(invalid)?),
                };
                Self::from_index(kind, wide)
            }
            FieldKind::Float32 => text.parse().ok().map(Self::Float),
            FieldKind::Vector2 => parse_floats::<2>(text).map(Self::Vector2),
            FieldKind::Vector3 => parse_floats::<3>(text).map(Self::Vector3),
            FieldKind::Vector4 => parse_floats::<4>(text).map(Self::Vector4),
            FieldKind::String32 => fits_string32(text).then(|| Self::String(text.to_string())),
            FieldKind::StringId => parse_u32(text).map(Self::StringId),
            FieldKind::TagRef => TagReference::parse(text).map(Self::TagRef),
        };

        value.ok_or_else(invalid)
    }
}

fn fits_string32(text: &str) -> bool {
    text.len() < FieldKind::String32.size() && text.is_ascii()
}

fn parse_u32(text: &str) -> Option<u32> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn parse_floats<const N: usize>(text: &str) -> Option<[f32; N]> {
    let mut out = [0.0; N];
    let mut parts = text.split(',');
    for slot in &mut out {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    parts.next().is_none().then_some(out)
}

fn write_floats(f: &mut fmt::Formatter<'_>, values: &[f32]) -> fmt::Result {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{v}")?;
    }
    Ok(())
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int8(v) => write!(f, "{v}"),
            Self::UInt8(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Vector2(v) => write_floats(f, v),
            Self::Vector3(v) => write_floats(f, v),
            Self::Vector4(v) => write_floats(f, v),
            Self::String(s) => f.write_str(s),
            Self::StringId(v) => write!(f, "{v:#010x}"),
            Self::TagRef(r) => write!(f, "{r}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scnr_common::Endian;

    fn encode(value: &FieldValue, endian: Endian) -> Vec<u8> {
        let mut buf = vec![0u8; value.kind().size()];
        value.write(&mut BinaryWriter::new(&mut buf, endian)).unwrap();
        buf
    }

    fn decode(bytes: &[u8], kind: FieldKind, endian: Endian) -> FieldValue {
        FieldValue::read(&mut BinaryReader::new(bytes, endian), kind).unwrap()
    }

    #[test]
    fn test_index_boundaries_survive_encoding() {
        for v in [SENTINEL as i16, 0, i16::MIN, i16::MAX] {
            let value = FieldValue::Int16(v);
            assert_eq!(decode(&encode(&value, Endian::Big), FieldKind::Int16, Endian::Big), value);
        }
    }

    #[test]
    fn test_tag_ref_layout() {
        let value = FieldValue::TagRef(TagReference::new(*b"scen", 0xE123_0004));
        let bytes = encode(&value, Endian::Big);
        assert_eq!(&bytes[..4], b"scen");
        assert_eq!(&bytes[4..12], &[0; 8]);
        assert_eq!(&bytes[12..], &[0xE1, 0x23, 0x00, 0x04]);
        assert_eq!(decode(&bytes, FieldKind::TagRef, Endian::Big), value);
        assert_eq!(value.to_string(), "scen:0xe1230004");
    }

    #[test]
    fn test_from_index_rejects_overflow() {
        assert_eq!(FieldValue::from_index(FieldKind::Int16, -1), Some(FieldValue::Int16(-1)));
        assert_eq!(FieldValue::from_index(FieldKind::Int16, 40_000), None);
        assert_eq!(FieldValue::from_index(FieldKind::UInt8, -1), None);
        assert_eq!(FieldValue::from_index(FieldKind::Float32, 0), None);
    }

    #[test]
    fn test_parse() {
        assert_eq!(
            FieldValue::parse(FieldKind::Vector3, "1, -2.5,3").unwrap(),
            FieldValue::Vector3([1.0, -2.5, 3.0])
        );
        assert_eq!(FieldValue::parse(FieldKind::Int16, "-1").unwrap(), FieldValue::Int16(-1));
        assert_eq!(
            FieldValue::parse(FieldKind::StringId, "0x10").unwrap(),
            FieldValue::StringId(16)
        );
        assert_eq!(
            FieldValue::parse(FieldKind::TagRef, "none").unwrap(),
            FieldValue::TagRef(TagReference::NULL)
        );
        assert!(FieldValue::parse(FieldKind::Vector3, "1,2").is_err());
        assert!(FieldValue::parse(FieldKind::Int8, "300").is_err());
        assert!(FieldValue::parse(FieldKind::String32, &"x".repeat(32)).is_err());
    }

    #[test]
    fn test_check_encodable_string_boundary() {
        assert!(FieldValue::String("x".repeat(31)).check_encodable().is_ok());
        assert!(matches!(
            FieldValue::String("x".repeat(32)).check_encodable(),
            Err(Error::InvalidValue {
                kind: FieldKind::String32,
                ..
            })
        ));
        assert!(FieldValue::String("caf\u{e9}".to_string()).check_encodable().is_err());
        assert!(FieldValue::Int8(i8::MIN).check_encodable().is_ok());
    }

    #[test]
    fn test_display_parse_agree() {
        for (kind, text) in [
            (FieldKind::Vector2, "0.5, 1"),
            (FieldKind::UInt16, "65535"),
            (FieldKind::String32, "marine_01"),
            (FieldKind::TagRef, "bipd:0x00010002"),
        ] {
            assert_eq!(FieldValue::parse(kind, text).unwrap().to_string(), text);
        }
    }
}
