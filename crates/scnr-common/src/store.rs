//! In-memory byte store backing a scenario tag.
//!
//! The store is a single growable buffer. Every absolute access is bounds
//! checked and fails with [`Error::OutOfRange`] instead of clamping, so a bad
//! address can never surface as a plausible field value.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::{BinaryReader, BinaryWriter, Endian, Error, Result};

/// The medium a store was loaded from and is committed back to.
pub trait Origin: fmt::Debug + Send {
    /// Human-readable description used in commit errors.
    fn describe(&self) -> String;

    /// Persist the full buffer.
    fn persist(&mut self, data: &[u8]) -> io::Result<()>;
}

/// A file on disk.
#[derive(Debug, Clone)]
pub struct FileOrigin {
    path: PathBuf,
}

impl FileOrigin {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Origin for FileOrigin {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn persist(&mut self, data: &[u8]) -> io::Result<()> {
        fs::write(&self.path, data)
    }
}

/// A shared in-memory buffer, for embedding and tests.
///
/// Clones share the same backing buffer, so the caller can keep a handle and
/// observe what was committed.
#[derive(Debug, Clone, Default)]
pub struct MemoryOrigin {
    committed: Arc<Mutex<Vec<u8>>>,
}

impl MemoryOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the last committed bytes.
    pub fn committed(&self) -> Vec<u8> {
        self.committed.lock().clone()
    }
}

impl Origin for MemoryOrigin {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn persist(&mut self, data: &[u8]) -> io::Result<()> {
        let mut committed = self.committed.lock();
        committed.clear();
        committed.extend_from_slice(data);
        Ok(())
    }
}

/// Randomly addressable, growable buffer with a byte-order policy.
pub struct ByteStore {
    data: Vec<u8>,
    endian: Endian,
    origin: Box<dyn Origin>,
    dirty: bool,
}

impl ByteStore {
    /// Create a store over `data` that commits to `origin`.
    pub fn new(data: Vec<u8>, endian: Endian, origin: Box<dyn Origin>) -> Self {
        Self {
            data,
            endian,
            origin,
            dirty: false,
        }
    }

    /// Create a store over `data` backed by a fresh [`MemoryOrigin`].
    pub fn from_bytes(data: Vec<u8>, endian: Endian) -> Self {
        Self::new(data, endian, Box::new(MemoryOrigin::new()))
    }

    /// Load a store from a file; commits write back to the same file.
    pub fn open<P: AsRef<Path>>(path: P, endian: Endian) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        debug!(path = %path.display(), size = data.len(), "loaded byte store");
        Ok(Self::new(data, endian, Box::new(FileOrigin::new(path))))
    }

    /// Redirect future commits to a different origin.
    pub fn set_origin(&mut self, origin: Box<dyn Origin>) {
        self.origin = origin;
    }

    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the buffer holds edits that have not been committed.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The whole buffer.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    fn range(&self, offset: u64, len: usize) -> Result<std::ops::Range<usize>> {
        let out_of_range = || Error::OutOfRange {
            offset,
            len,
            size: self.data.len(),
        };
        let start = usize::try_from(offset).map_err(|_| out_of_range())?;
        let end = start.checked_add(len).ok_or_else(out_of_range)?;
        if end > self.data.len() {
            return Err(out_of_range());
        }
        Ok(start..end)
    }

    /// Borrow `len` bytes at `offset`.
    pub fn read(&self, offset: u64, len: usize) -> Result<&[u8]> {
        let range = self.range(offset, len)?;
        Ok(&self.data[range])
    }

    /// Overwrite bytes at `offset`. The buffer does not grow.
    pub fn write(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        let range = self.range(offset, bytes.len())?;
        self.data[range].copy_from_slice(bytes);
        self.dirty = true;
        Ok(())
    }

    /// Cursor over `len` bytes starting at `offset`.
    pub fn reader(&self, offset: u64, len: usize) -> Result<BinaryReader<'_>> {
        let bytes = self.read(offset, len)?;
        Ok(BinaryReader::new(bytes, self.endian))
    }

    /// Cursor writer over `len` bytes starting at `offset`.
    pub fn writer(&mut self, offset: u64, len: usize) -> Result<BinaryWriter<'_>> {
        let range = self.range(offset, len)?;
        self.dirty = true;
        let endian = self.endian;
        Ok(BinaryWriter::new(&mut self.data[range], endian))
    }

    pub fn read_i32(&self, offset: u64) -> Result<i32> {
        self.reader(offset, 4)?.read_i32()
    }

    pub fn read_u32(&self, offset: u64) -> Result<u32> {
        self.reader(offset, 4)?.read_u32()
    }

    pub fn write_i32(&mut self, offset: u64, value: i32) -> Result<()> {
        self.writer(offset, 4)?.write_i32(value)
    }

    pub fn write_u32(&mut self, offset: u64, value: u32) -> Result<()> {
        self.writer(offset, 4)?.write_u32(value)
    }

    /// Insert `len` zero bytes at `offset`, shifting everything after it.
    ///
    /// `offset` may equal the current length, which appends.
    pub fn insert_zeroed(&mut self, offset: u64, len: usize) -> Result<()> {
        let start = self.range(offset, 0)?.start;
        self.data
            .splice(start..start, std::iter::repeat(0u8).take(len));
        self.dirty = true;
        Ok(())
    }

    /// Remove `len` bytes at `offset`, shifting everything after it back.
    pub fn remove_range(&mut self, offset: u64, len: usize) -> Result<()> {
        let range = self.range(offset, len)?;
        self.data.drain(range);
        self.dirty = true;
        Ok(())
    }

    /// Append `len` zero bytes and return the address of the first one.
    pub fn append_zeroed(&mut self, len: usize) -> u64 {
        let address = self.data.len() as u64;
        self.data.resize(self.data.len() + len, 0);
        self.dirty = true;
        address
    }

    /// Copy `len` bytes from `src` to `dest` inside the store. Ranges may overlap.
    pub fn copy_within(&mut self, src: u64, dest: u64, len: usize) -> Result<()> {
        let from = self.range(src, len)?;
        let to = self.range(dest, len)?;
        self.data.copy_within(from, to.start);
        self.dirty = true;
        Ok(())
    }

    /// Flush the buffer to its origin.
    ///
    /// On failure the buffer and the dirty flag are left as they were so the
    /// caller can retry.
    pub fn commit(&mut self) -> Result<()> {
        self.origin
            .persist(&self.data)
            .map_err(|source| Error::Commit {
                origin: self.origin.describe(),
                source,
            })?;
        debug!(origin = %self.origin.describe(), size = self.data.len(), "committed byte store");
        self.dirty = false;
        Ok(())
    }
}

impl fmt::Debug for ByteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStore")
            .field("len", &self.data.len())
            .field("endian", &self.endian)
            .field("origin", &self.origin)
            .field("dirty", &self.dirty)
            .finish()
    }
}
