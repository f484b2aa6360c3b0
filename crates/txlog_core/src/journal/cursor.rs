//! The record scan as a step machine over byte buffers.
//!
//! A scan step is two calls: [`ScanCursor::frame`] inspects the first
//! 256-byte block at the cursor and says how many bytes the record spans,
//! then [`ScanCursor::accept`] decodes the full record bytes and advances.
//! The cursor never touches storage, so the reader owns all I/O.

use crate::journal::extents::SourceExtents;
use txlog_codec::{decode_fixed_header, decode_record, CodecError, CodecResult, Record, MIN_RECORD_SIZE};

/// Block size the scan reads at a time.
pub const BLOCK_LEN: u64 = MIN_RECORD_SIZE as u64;

/// What the first block at the cursor holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame {
    /// The zero crc / zero size marker. Nothing follows.
    EndOfStream,
    /// A record spanning `size` bytes from the cursor.
    Record {
        /// Declared on-disk size, a multiple of [`BLOCK_LEN`].
        size: u64,
    },
}

/// Scan position and running statistics for one journal body.
#[derive(Debug, Clone)]
pub struct ScanCursor {
    version: u32,
    offset: u64,
    entry: u64,
    bytes_scanned: u64,
    limit: Option<u64>,
    max_local_txid: u64,
    source_extents: SourceExtents,
}

impl ScanCursor {
    /// Creates a cursor at the start of a body.
    ///
    /// `limit` is the measured size of an uncompressed file; a record whose
    /// first block would extend past it is not read. Compressed files pass
    /// `None` and end at the sentinel or at end of data.
    #[must_use]
    pub fn new(version: u32, body_offset: u64, limit: Option<u64>) -> Self {
        Self {
            version,
            offset: body_offset,
            entry: 0,
            bytes_scanned: 0,
            limit,
            max_local_txid: 0,
            source_extents: SourceExtents::new(),
        }
    }

    /// Schema version being scanned.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Offset of the next record.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of records accepted.
    #[must_use]
    pub const fn entry_count(&self) -> u64 {
        self.entry
    }

    /// Sum of the sizes of accepted records.
    #[must_use]
    pub const fn bytes_scanned(&self) -> u64 {
        self.bytes_scanned
    }

    /// Highest local txid accepted so far.
    #[must_use]
    pub const fn max_local_txid(&self) -> u64 {
        self.max_local_txid
    }

    /// Replication extents of accepted records.
    #[must_use]
    pub fn source_extents(&self) -> &SourceExtents {
        &self.source_extents
    }

    /// True when a full block may still follow within the file size.
    #[must_use]
    pub fn has_room(&self) -> bool {
        !self
            .limit
            .is_some_and(|size| self.offset.saturating_add(BLOCK_LEN) > size)
    }

    /// Inspects the first block of the next record.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRecord` when the declared size is not a positive
    /// multiple of [`BLOCK_LEN`], and `UnexpectedEof` when `first_block` is
    /// shorter than the fixed header.
    pub fn frame(&self, first_block: &[u8]) -> CodecResult<Frame> {
        let header = decode_fixed_header(self.version, first_block)?;
        if header.is_end_of_stream() {
            return Ok(Frame::EndOfStream);
        }
        let size = u64::from(header.size);
        if size < BLOCK_LEN || size % BLOCK_LEN != 0 {
            return Err(CodecError::malformed(
                self.version,
                format!("record size {size} is not a positive multiple of {BLOCK_LEN}"),
            ));
        }
        Ok(Frame::Record { size })
    }

    /// Decodes the record at the cursor and moves past it.
    ///
    /// `bytes` is the whole record as framed. The returned record carries
    /// its offset and its zero-based entry index.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRecord` when the declared lengths do not fit.
    pub fn accept(&mut self, bytes: &[u8]) -> CodecResult<Record> {
        let mut record = decode_record(self.version, bytes)?;
        record.offset = self.offset;
        record.entry = self.entry;

        if record.source_name_hash != 0 {
            self.source_extents.observe(
                record.source_name_hash,
                &record.replication_path,
                record.source_txid,
            );
        }
        self.max_local_txid = self.max_local_txid.max(record.local_txid);

        let size = u64::from(record.size);
        self.offset += size;
        self.bytes_scanned += size;
        self.entry += 1;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txlog_codec::{encode_record, Payload, RecordType, SoftwareChecksum, LATEST_VERSION};

    fn encoded(txid: u64, data_len: usize) -> Vec<u8> {
        let mut record = Record::new(RecordType::Publish);
        record.local_txid = txid;
        record.topic = b"orders".to_vec();
        record.data = Payload::Bytes(vec![b'x'; data_len]);
        encode_record(LATEST_VERSION, &record, &SoftwareChecksum)
            .unwrap()
            .bytes
    }

    fn scan(cursor: &mut ScanCursor, body: &[u8]) -> Vec<Record> {
        let mut out = Vec::new();
        let mut pos = 0usize;
        while pos + BLOCK_LEN as usize <= body.len() {
            let block = &body[pos..pos + BLOCK_LEN as usize];
            match cursor.frame(block).unwrap() {
                Frame::EndOfStream => break,
                Frame::Record { size } => {
                    let end = pos + size as usize;
                    out.push(cursor.accept(&body[pos..end]).unwrap());
                    pos = end;
                }
            }
        }
        out
    }

    #[test]
    fn scans_buffers_without_storage() {
        let mut body = encoded(1, 10);
        body.extend(encoded(2, 400));
        body.extend(vec![0u8; 256]);

        let mut cursor = ScanCursor::new(LATEST_VERSION, 4096, None);
        let records = scan(&mut cursor, &body);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].offset, 4096);
        assert_eq!(records[1].offset, 4096 + 256);
        assert_eq!(records[1].entry, 1);
        assert_eq!(cursor.offset(), 4096 + 256 + 512);
        assert_eq!(cursor.entry_count(), 2);
        assert_eq!(cursor.bytes_scanned(), 768);
        assert_eq!(cursor.max_local_txid(), 2);
    }

    #[test]
    fn zero_block_is_end_of_stream() {
        let cursor = ScanCursor::new(LATEST_VERSION, 4096, None);
        assert_eq!(cursor.frame(&[0u8; 256]).unwrap(), Frame::EndOfStream);
    }

    #[test]
    fn unaligned_size_is_malformed() {
        let mut block = encoded(1, 0);
        block[4..8].copy_from_slice(&300u32.to_le_bytes());
        let cursor = ScanCursor::new(LATEST_VERSION, 4096, None);
        assert!(matches!(
            cursor.frame(&block),
            Err(CodecError::MalformedRecord { version: 8, .. })
        ));

        block[4..8].copy_from_slice(&0u32.to_le_bytes());
        assert!(cursor.frame(&block).is_err());
    }

    #[test]
    fn room_check_uses_limit() {
        let cursor = ScanCursor::new(LATEST_VERSION, 4096, Some(4096 + 255));
        assert!(!cursor.has_room());
        let cursor = ScanCursor::new(LATEST_VERSION, 4096, Some(4096 + 256));
        assert!(cursor.has_room());
        let cursor = ScanCursor::new(LATEST_VERSION, 4096, None);
        assert!(cursor.has_room());
    }

    #[test]
    fn tracks_source_extents() {
        let mut body = Vec::new();
        for (txid, source_txid) in [(1, 40), (2, 41), (3, 45)] {
            let mut record = Record::new(RecordType::Publish);
            record.local_txid = txid;
            record.source_txid = source_txid;
            record.source_name_hash = 99;
            record.replication_path = b"upstream".to_vec();
            body.extend(
                encode_record(LATEST_VERSION, &record, &SoftwareChecksum)
                    .unwrap()
                    .bytes,
            );
        }
        body.extend(encoded(4, 0));

        let mut cursor = ScanCursor::new(LATEST_VERSION, 4096, None);
        assert_eq!(scan(&mut cursor, &body).len(), 4);
        let extent = cursor.source_extents().get(99).unwrap();
        assert_eq!((extent.first, extent.latest), (40, 45));
        assert_eq!(cursor.source_extents().len(), 1);
    }
}
