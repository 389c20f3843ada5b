//! Byte-order policy.
//!
//! Scenario data exists in both byte orders depending on the platform the
//! cache was built for, so the order is chosen at runtime and every primitive
//! access dispatches through [`Endian`].

use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Byte order of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Endian {
    #[default]
    Little,
    Big,
}

macro_rules! endian_rw {
    ($read:ident, $write:ident, $ty:ty) => {
        #[inline]
        pub fn $read(self, buf: &[u8]) -> $ty {
            match self {
                Endian::Little => LittleEndian::$read(buf),
                Endian::Big => BigEndian::$read(buf),
            }
        }

        #[inline]
        pub fn $write(self, buf: &mut [u8], value: $ty) {
            match self {
                Endian::Little => LittleEndian::$write(buf, value),
                Endian::Big => BigEndian::$write(buf, value),
            }
        }
    };
}

impl Endian {
    endian_rw!(read_u16, write_u16, u16);
    endian_rw!(read_i16, write_i16, i16);
    endian_rw!(read_u32, write_u32, u32);
    endian_rw!(read_i32, write_i32, i32);
    endian_rw!(read_u64, write_u64, u64);
    endian_rw!(read_i64, write_i64, i64);
    endian_rw!(read_f32, write_f32, f32);
    endian_rw!(read_f64, write_f64, f64);

    /// Get the string name for this byte order.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Little => "little",
            Self::Big => "big",
        }
    }
}

impl std::fmt::Display for Endian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_matches_byte_order() {
        let mut buf = [0u8; 4];
        Endian::Big.write_i32(&mut buf, 0x0102_0304);
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(Endian::Little.read_i32(&buf), 0x0403_0201);

        Endian::Little.write_i16(&mut buf[..2], -1);
        assert_eq!(&buf[..2], &[0xFF, 0xFF]);
        assert_eq!(Endian::Big.read_i16(&buf[..2]), -1);
    }
}
