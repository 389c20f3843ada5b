//! Cursor reader over a byte slice.
//!
//! This module provides [`BinaryReader`], a cursor-like type that decodes
//! primitives from a byte slice in the store's byte order without copying.

use crate::{Endian, Error, Result};

/// A binary reader that provides zero-copy reading from a byte slice.
///
/// # Example
///
/// ```
/// use scnr_common::{BinaryReader, Endian};
///
/// let data = [0x00, 0x00, 0x00, 0x2A, 0xFF, 0xFF];
/// let mut reader = BinaryReader::new(&data, Endian::Big);
///
/// assert_eq!(reader.read_i32().unwrap(), 42);
/// assert_eq!(reader.read_i16().unwrap(), -1);
/// assert!(reader.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
    endian: Endian,
}

macro_rules! read_primitive {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $size:expr) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self) -> Result<$ty> {
            let bytes = self.read_bytes($size)?;
            Ok(self.endian.$name(bytes))
        }
    };
}

impl<'a> BinaryReader<'a> {
    /// Create a new reader from a byte slice.
    #[inline]
    pub const fn new(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data,
            position: 0,
            endian,
        }
    }

    /// Create a new reader starting at a specific position.
    #[inline]
    pub const fn new_at(data: &'a [u8], position: usize, endian: Endian) -> Self {
        Self {
            data,
            position,
            endian,
        }
    }

    /// Get the current position in the buffer.
    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Byte order used for multi-byte reads.
    #[inline]
    pub const fn endian(&self) -> Endian {
        self.endian
    }

    /// Get the total length of the underlying buffer.
    #[inline]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    /// Get the number of bytes remaining to read.
    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Check if there are no more bytes to read.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.position >= self.data.len()
    }

    /// Seek to an absolute position.
    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// Advance the position by a number of bytes.
    #[inline]
    pub fn advance(&mut self, count: usize) {
        self.position = self.position.saturating_add(count);
    }

    /// Peek at bytes without advancing the position.
    #[inline]
    pub fn peek_bytes(&self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(Error::UnexpectedEof {
                needed: count,
                available: self.remaining(),
            });
        }
        Ok(&self.data[self.position..self.position + count])
    }

    /// Read bytes and advance the position.
    #[inline]
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(count)?;
        self.position += count;
        Ok(bytes)
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    /// Read a signed byte.
    #[inline]
    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_u8().map(|b| b as i8)
    }

    read_primitive!(
        /// Read a u16.
        read_u16, u16, 2
    );
    read_primitive!(
        /// Read an i16.
        read_i16, i16, 2
    );
    read_primitive!(
        /// Read a u32.
        read_u32, u32, 4
    );
    read_primitive!(
        /// Read an i32.
        read_i32, i32, 4
    );
    read_primitive!(
        /// Read a u64.
        read_u64, u64, 8
    );
    read_primitive!(
        /// Read an i64.
        read_i64, i64, 8
    );
    read_primitive!(
        /// Read an f32.
        read_f32, f32, 4
    );
    read_primitive!(
        /// Read an f64.
        read_f64, f64, 8
    );

    /// Read a string from a fixed-size buffer, stopping at the first null.
    pub fn read_string_in_buffer(&mut self, buffer_size: usize) -> Result<&'a str> {
        let bytes = self.read_bytes(buffer_size)?;
        let null_pos = memchr::memchr(0, bytes).unwrap_or(buffer_size);
        std::str::from_utf8(&bytes[..null_pos]).map_err(Error::Utf8)
    }

    /// Read a null-terminated string.
    pub fn read_cstring(&mut self) -> Result<&'a str> {
        let start = self.position.min(self.data.len());
        let remaining = &self.data[start..];

        let null_pos = memchr::memchr(0, remaining).ok_or(Error::MissingNullTerminator)?;
        self.position = start + null_pos + 1;

        std::str::from_utf8(&remaining[..null_pos]).map_err(Error::Utf8)
    }
}
