//! Storage backend trait definition.

use crate::error::StorageResult;

/// A low-level storage backend for journal files.
///
/// Storage backends are **opaque byte stores**. They provide positioned
/// reads and positioned writes; journal writers address every header block
/// and record by offset. The journal layer owns all format interpretation -
/// backends do not understand headers or records.
///
/// # Invariants
///
/// - `read_at` returns exactly the bytes previously written at that offset
/// - `write_at` never leaves a hole: writing past the end zero-fills the gap
/// - after `release`, every operation fails with [`crate::StorageError::Closed`]
///
/// # Implementors
///
/// - [`super::InMemoryBackend`] - For tests and decompressed journal images
/// - [`super::FileBackend`] - For on-disk journals
pub trait StorageBackend: Send + Sync {
    /// Reads exactly `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The read would extend beyond the current size
    /// - An I/O error occurs
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Reads up to `len` bytes starting at `offset`.
    ///
    /// Returns fewer bytes than requested (possibly none) when the end of
    /// storage is reached, which lets callers tell a clean EOF apart from a
    /// short trailing block.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn read_up_to(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        if offset >= size {
            return Ok(Vec::new());
        }
        let available = usize::try_from(size - offset).unwrap_or(usize::MAX).min(len);
        self.read_at(offset, available)
    }

    /// Writes bytes starting at `offset`, overwriting or extending.
    ///
    /// The two fixed header blocks are rewritten in place once their
    /// checksum (or the final extents) is known; records land at the end.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs.
    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()>;

    /// Flushes all pending writes to the OS.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush operation fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the current size of the storage in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Syncs all data and metadata to durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync operation fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Releases the underlying resource.
    ///
    /// File backends advise the OS that cached pages for the file are no
    /// longer needed and close the descriptor. Calling `release` twice is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if pending writes cannot be flushed.
    fn release(&mut self) -> StorageResult<()>;
}
