//! Little-endian byte cursor.

use crate::error::{CodecError, CodecResult};
use crate::schema::Width;

/// A forward-only little-endian reader over a byte slice.
///
/// Every read is bounds checked and fails with `UnexpectedEof` instead of
/// panicking.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Reads `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedEof` if fewer than `len` bytes remain.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(CodecError::UnexpectedEof {
                needed: len,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Reads a fixed-size array.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedEof` if fewer than `N` bytes remain.
    #[inline]
    pub fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Reads a `u16`.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedEof` at end of input.
    pub fn read_u16(&mut self) -> CodecResult<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    /// Reads a `u32`.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedEof` at end of input.
    pub fn read_u32(&mut self) -> CodecResult<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Reads a `u64`.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedEof` at end of input.
    pub fn read_u64(&mut self) -> CodecResult<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Reads an `i64`.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedEof` at end of input.
    pub fn read_i64(&mut self) -> CodecResult<i64> {
        self.read_array().map(i64::from_le_bytes)
    }

    /// Reads an unsigned integer of the given width, widened to `u64`.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedEof` at end of input.
    pub fn read_uint(&mut self, width: Width) -> CodecResult<u64> {
        match width {
            Width::U16 => self.read_u16().map(u64::from),
            Width::U32 => self.read_u32().map(u64::from),
            Width::U64 => self.read_u64(),
        }
    }
}

/// Appends `value` to `out` using `width` bytes.
pub(crate) fn put_uint(out: &mut Vec<u8>, width: Width, value: u64) {
    match width {
        Width::U16 => out.extend_from_slice(&(value as u16).to_le_bytes()),
        Width::U32 => out.extend_from_slice(&(value as u32).to_le_bytes()),
        Width::U64 => out.extend_from_slice(&value.to_le_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u16().unwrap(), 0x0201);
        assert_eq!(reader.read_u32().unwrap(), 0x0605_0403);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn short_read_fails() {
        let mut reader = ByteReader::new(&[1, 2, 3]);
        assert_eq!(
            reader.read_u32(),
            Err(CodecError::UnexpectedEof {
                needed: 4,
                available: 3
            })
        );
        // A failed read does not advance.
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn put_uint_widths() {
        let mut out = Vec::new();
        put_uint(&mut out, Width::U16, 0x0102);
        put_uint(&mut out, Width::U32, 7);
        put_uint(&mut out, Width::U64, u64::MAX);
        assert_eq!(out.len(), 14);
        let mut reader = ByteReader::new(&out);
        assert_eq!(reader.read_uint(Width::U16).unwrap(), 0x0102);
        assert_eq!(reader.read_uint(Width::U32).unwrap(), 7);
        assert_eq!(reader.read_uint(Width::U64).unwrap(), u64::MAX);
    }
}
