//! Cursor writer over a mutable byte slice.

use crate::{Endian, Error, Result};

/// A bounds-checked cursor that encodes primitives into a mutable slice.
///
/// The writer never grows its slice. Writing past the end fails with
/// [`Error::UnexpectedEof`] and leaves the bytes untouched.
#[derive(Debug)]
pub struct BinaryWriter<'a> {
    data: &'a mut [u8],
    position: usize,
    endian: Endian,
}

macro_rules! write_primitive {
    ($name:ident, $encode:ident, $ty:ty, $size:expr) => {
        #[inline]
        pub fn $name(&mut self, value: $ty) -> Result<()> {
            let endian = self.endian;
            let slot = self.slot($size)?;
            endian.$encode(slot, value);
            Ok(())
        }
    };
}

impl<'a> BinaryWriter<'a> {
    /// Create a writer at the start of `data`.
    #[inline]
    pub fn new(data: &'a mut [u8], endian: Endian) -> Self {
        Self {
            data,
            position: 0,
            endian,
        }
    }

    /// Get the current position in the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Seek to an absolute position.
    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// Get the number of bytes that can still be written.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    fn slot(&mut self, count: usize) -> Result<&mut [u8]> {
        if self.remaining() < count {
            return Err(Error::UnexpectedEof {
                needed: count,
                available: self.remaining(),
            });
        }
        let start = self.position;
        self.position += count;
        Ok(&mut self.data[start..start + count])
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.slot(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    #[inline]
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.slot(1)?[0] = value;
        Ok(())
    }

    #[inline]
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_u8(value as u8)
    }

    write_primitive!(write_u16, write_u16, u16, 2);
    write_primitive!(write_i16, write_i16, i16, 2);
    write_primitive!(write_u32, write_u32, u32, 4);
    write_primitive!(write_i32, write_i32, i32, 4);
    write_primitive!(write_u64, write_u64, u64, 8);
    write_primitive!(write_i64, write_i64, i64, 8);
    write_primitive!(write_f32, write_f32, f32, 4);
    write_primitive!(write_f64, write_f64, f64, 8);

    /// Write a string into a fixed-size, null-padded buffer.
    ///
    /// The string is truncated so that at least one terminating null fits.
    pub fn write_string_in_buffer(&mut self, value: &str, buffer_size: usize) -> Result<()> {
        let slot = self.slot(buffer_size)?;
        slot.fill(0);
        let bytes = value.as_bytes();
        let len = bytes.len().min(buffer_size.saturating_sub(1));
        slot[..len].copy_from_slice(&bytes[..len]);
        Ok(())
    }
}
