//! Journal reader.

use crate::compression::{decompress_file, gzip_uncompressed_size, is_compressed_path};
use crate::config::ReaderConfig;
use crate::error::{CoreError, CoreResult};
use crate::header::{body_offset, Extents, ExtentsHeader, FileHeader, EXTENTS_OFFSET, HEADER_BLOCK_LEN};
use crate::journal::cursor::{Frame, ScanCursor, BLOCK_LEN};
use crate::journal::extents::SourceExtents;
use crate::journal::SEPARATOR;
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};
use txlog_codec::{
    default_checksum, iso_timestamp, record_crc, Checksum, CodecError, Record, RenderOptions,
};
use txlog_storage::{FileBackend, InMemoryBackend, StorageBackend};

/// Reads a journal file of any schema version.
///
/// Opening parses both header blocks. [`records`](Self::records) then scans
/// the body forward once; the running statistics (entry count, source
/// extents, active detection) reflect how far the scan has got.
///
/// # Example
///
/// ```rust,ignore
/// let mut reader = JournalReader::open("journal/00000.journal")?;
/// for record in reader.records() {
///     let record = record?;
///     println!("{} {}", record.local_txid, record.record_type);
/// }
/// if reader.is_active() {
///     eprintln!("journal is still being written");
/// }
/// reader.close()?;
/// ```
pub struct JournalReader {
    path: String,
    backend: Box<dyn StorageBackend>,
    header: FileHeader,
    extents: ExtentsHeader,
    file_size: u64,
    compressed: bool,
    config: ReaderConfig,
    checksum: &'static dyn Checksum,
    cursor: ScanCursor,
    exhausted: bool,
    released: bool,
}

impl JournalReader {
    /// Opens a journal with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` for a bad magic and `Io`/`Storage` if the
    /// file cannot be read.
    pub fn open(path: impl AsRef<Path>) -> CoreResult<Self> {
        Self::open_with(path, ReaderConfig::default())
    }

    /// Opens a journal.
    ///
    /// A path ending in `.gz` is decompressed into memory first; its logical
    /// size is taken from the gzip trailer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` for a bad magic and `Io`/`Storage` if the
    /// file cannot be read.
    pub fn open_with(path: impl AsRef<Path>, config: ReaderConfig) -> CoreResult<Self> {
        let path = path.as_ref();
        let name = path.display().to_string();
        if is_compressed_path(path) {
            let size = gzip_uncompressed_size(path)?;
            let data = decompress_file(path)?;
            Self::from_backend(name, Box::new(InMemoryBackend::with_data(data)), Some(size), config)
        } else {
            let backend = FileBackend::open_read_only(path)?;
            Self::from_backend(name, Box::new(backend), None, config)
        }
    }

    /// Opens a journal held by any backend.
    ///
    /// `compressed_size` is the logical size of a decompressed image; when
    /// set, the scan relies on the end-of-stream marker instead of the
    /// backend size.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` for a bad magic or short header blocks.
    pub fn from_backend(
        name: impl Into<String>,
        backend: Box<dyn StorageBackend>,
        compressed_size: Option<u64>,
        config: ReaderConfig,
    ) -> CoreResult<Self> {
        let path = name.into();
        let block = backend.read_up_to(0, HEADER_BLOCK_LEN as usize)?;
        let header = FileHeader::parse(&path, &block)?;
        let block = backend.read_up_to(EXTENTS_OFFSET, HEADER_BLOCK_LEN as usize)?;
        let extents = ExtentsHeader::parse(&path, header.version, &block)?;

        let checksum = default_checksum();
        if config.verify_checksums && !header.crc_matches(checksum) {
            warn!(path = %path, "file header checksum does not match");
        }

        let compressed = compressed_size.is_some();
        let file_size = match compressed_size {
            Some(size) => size,
            None => backend.size()?,
        };
        let limit = if compressed { None } else { Some(file_size) };
        let cursor = ScanCursor::new(header.version, body_offset(header.version), limit);

        debug!(
            path = %path,
            version = header.version,
            label = %header.label_text(),
            instance_id = header.instance_id,
            file_size,
            compressed,
            "opened journal"
        );

        Ok(Self {
            path,
            backend,
            header,
            extents,
            file_size,
            compressed,
            config,
            checksum,
            cursor,
            exhausted: false,
            released: false,
        })
    }

    /// Path or name the journal was opened from.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The parsed file header.
    #[must_use]
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Schema version of the records.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// Version label from the file header.
    #[must_use]
    pub fn version_label(&self) -> String {
        self.header.label_text()
    }

    /// Instance id from the file header.
    #[must_use]
    pub fn instance_id(&self) -> u32 {
        self.header.instance_id
    }

    /// Compression type from the file header; empty before version 7.
    #[must_use]
    pub fn compression_type(&self) -> String {
        self.header.compression_text()
    }

    /// Size of the file, or the uncompressed size of a compressed one.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// True when the journal was read through gzip.
    #[must_use]
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Extents exactly as declared in the extents header.
    #[must_use]
    pub fn extents(&self) -> Extents {
        self.extents.extents
    }

    /// Replication extents of the records scanned so far.
    #[must_use]
    pub fn source_extents(&self) -> &SourceExtents {
        self.cursor.source_extents()
    }

    /// Number of records scanned so far.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cursor.entry_count()
    }

    /// Sum of the sizes of the records scanned so far.
    #[must_use]
    pub fn bytes_scanned(&self) -> u64 {
        self.cursor.bytes_scanned()
    }

    /// True when a scanned record is newer than the declared last extent,
    /// meaning another writer is still appending to the file.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cursor.max_local_txid() > self.extents.extents.last
    }

    /// Returns the records of the journal.
    ///
    /// The scan is forward-only: records already yielded are not yielded
    /// again by a later call.
    pub fn records(&mut self) -> Records<'_> {
        Records {
            reader: self,
            finished: false,
        }
    }

    /// Renders the header report printed before a dump.
    ///
    /// Extents that were never finalized print as `unwritten` unless
    /// `journal_extents` asks for the raw values.
    #[must_use]
    pub fn format_extents(&self, journal_extents: bool, options: &RenderOptions) -> String {
        let extents = self.extents();
        let range = if extents.is_unwritten() && !journal_extents {
            "unwritten".to_string()
        } else {
            format!("[{}:{}]", extents.first, extents.last)
        };

        if self.version() < 7 {
            format!(
                "\nFile Name   : {}\nFile Size   : {}\nVersion     : {}\nExtents     : {}\n{SEPARATOR}",
                self.path,
                self.file_size,
                self.version_label(),
                range
            )
        } else {
            let stamp = |ts: i64| iso_timestamp(u64::try_from(ts).unwrap_or(0), options.zone);
            format!(
                "\nFile Name       : {}\nFile Size       : {}\nVersion         : {}\nExtents         : {}\nFirst Timestamp : {}\nLast Timestamp  : {}\n{SEPARATOR}",
                self.path,
                self.file_size,
                self.version_label(),
                range,
                stamp(extents.first_timestamp),
                stamp(extents.last_timestamp)
            )
        }
    }

    /// Releases the underlying storage.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the backend fails to release.
    pub fn close(mut self) -> CoreResult<()> {
        self.released = true;
        self.backend.release()?;
        Ok(())
    }

    fn malformed(&self, offset: u64, err: CodecError) -> CoreError {
        CoreError::malformed_record(&self.path, offset, self.version(), err)
    }

    fn next_record(&mut self) -> CoreResult<Option<Record>> {
        if self.exhausted {
            return Ok(None);
        }
        let result = self.read_next_record();
        if !matches!(result, Ok(Some(_))) {
            self.exhausted = true;
        }
        result
    }

    fn read_next_record(&mut self) -> CoreResult<Option<Record>> {
        if !self.cursor.has_room() {
            return Ok(None);
        }
        let offset = self.cursor.offset();
        let mut bytes = self.backend.read_up_to(offset, BLOCK_LEN as usize)?;
        if (bytes.len() as u64) < BLOCK_LEN {
            if !bytes.is_empty() {
                warn!(path = %self.path, offset, len = bytes.len(), "ignoring partial trailing block");
            }
            return Ok(None);
        }

        let size = match self.cursor.frame(&bytes) {
            Ok(Frame::EndOfStream) => return Ok(None),
            Ok(Frame::Record { size }) => size,
            Err(err) => return Err(self.malformed(offset, err)),
        };

        if size > BLOCK_LEN {
            let wanted = size - BLOCK_LEN;
            let rest = self
                .backend
                .read_up_to(offset + BLOCK_LEN, usize::try_from(wanted).unwrap_or(usize::MAX))?;
            if (rest.len() as u64) < wanted {
                return Err(CoreError::Truncated {
                    path: self.path.clone(),
                    offset,
                    declared: size,
                    available: BLOCK_LEN + rest.len() as u64,
                });
            }
            bytes.extend_from_slice(&rest);
        }

        if self.config.verify_checksums {
            self.verify(offset, &bytes)?;
        }

        let mut record = match self.cursor.accept(&bytes) {
            Ok(record) => record,
            Err(err) => return Err(self.malformed(offset, err)),
        };
        if self.config.redact_data {
            record.redact_data();
        }
        Ok(Some(record))
    }

    fn verify(&self, offset: u64, bytes: &[u8]) -> CoreResult<()> {
        let actual = record_crc(self.version(), bytes, self.checksum)
            .map_err(|err| self.malformed(offset, err))?;
        let expected = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        if expected != actual {
            return Err(CoreError::ChecksumMismatch {
                path: self.path.clone(),
                offset,
                expected,
                actual,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for JournalReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JournalReader")
            .field("path", &self.path)
            .field("version", &self.header.version)
            .field("file_size", &self.file_size)
            .field("compressed", &self.compressed)
            .field("offset", &self.cursor.offset())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for JournalReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_extents(false, &RenderOptions::default()))
    }
}

impl Drop for JournalReader {
    fn drop(&mut self) {
        if !self.released {
            let _ = self.backend.release();
        }
    }
}

/// Iterator over the records of a [`JournalReader`].
///
/// Yields `Err` at most once; the iteration ends after an error.
pub struct Records<'a> {
    reader: &'a mut JournalReader,
    finished: bool,
}

impl Iterator for Records<'_> {
    type Item = CoreResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.reader.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txlog_codec::{encode_record, Payload, RecordType, SoftwareChecksum, LATEST_VERSION};

    fn image(extents: Extents, records: &[Record], tail: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; 4096];
        let mut header = FileHeader::latest(3, "gz", 9);
        header.seal(&SoftwareChecksum);
        let bytes = header.encode();
        out[..bytes.len()].copy_from_slice(&bytes);
        let mut ext = ExtentsHeader::new(LATEST_VERSION, extents);
        ext.seal(&SoftwareChecksum);
        let bytes = ext.encode();
        out[512..512 + bytes.len()].copy_from_slice(&bytes);
        for record in records {
            out.extend(
                encode_record(LATEST_VERSION, record, &SoftwareChecksum)
                    .unwrap()
                    .bytes,
            );
        }
        out.extend_from_slice(tail);
        out
    }

    fn publish(txid: u64, data: &[u8]) -> Record {
        let mut record = Record::new(RecordType::Publish);
        record.local_txid = txid;
        record.topic = b"orders".to_vec();
        record.data = Payload::Bytes(data.to_vec());
        record
    }

    fn reader(bytes: Vec<u8>, config: ReaderConfig) -> JournalReader {
        JournalReader::from_backend(
            "mem.journal",
            Box::new(InMemoryBackend::with_data(bytes)),
            None,
            config,
        )
        .unwrap()
    }

    #[test]
    fn reads_headers_and_records() {
        let bytes = image(Extents::new(1, 2), &[publish(1, b"a"), publish(2, b"b")], &[]);
        let mut reader = reader(bytes, ReaderConfig::default());
        assert_eq!(reader.version(), 8);
        assert_eq!(reader.instance_id(), 3);
        assert_eq!(reader.version_label(), "amps::txlog/v8");
        assert_eq!(reader.compression_type(), "gz");
        assert_eq!(reader.file_size(), 4096 + 512);

        let records: Vec<_> = reader.records().collect::<CoreResult<_>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].data, Payload::Bytes(b"b".to_vec()));
        assert_eq!(records[1].offset, 4096 + 256);
        assert_eq!(reader.entry_count(), 2);
        assert!(!reader.is_active());

        // The scan does not restart.
        assert_eq!(reader.records().count(), 0);
    }

    #[test]
    fn sentinel_only_body_is_empty() {
        let bytes = image(Extents::default(), &[], &[0u8; 256]);
        let mut reader = reader(bytes, ReaderConfig::default());
        assert_eq!(reader.records().count(), 0);
        assert_eq!(reader.entry_count(), 0);
    }

    #[test]
    fn partial_trailing_block_ends_scan() {
        let bytes = image(Extents::new(1, 1), &[publish(1, b"a")], &[7u8; 100]);
        let mut reader = reader(bytes, ReaderConfig::default());
        assert_eq!(reader.records().filter(Result::is_ok).count(), 1);
    }

    #[test]
    fn declared_size_past_eof_is_truncated() {
        let mut bytes = image(Extents::new(1, 1), &[publish(1, &[b'x'; 600])], &[]);
        bytes.truncate(4096 + 512);
        let mut reader = reader(bytes, ReaderConfig::default());
        let results: Vec<_> = reader.records().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0],
            Err(CoreError::Truncated {
                offset: 4096,
                declared: 768,
                available: 512,
                ..
            })
        ));
    }

    #[test]
    fn bad_lengths_are_malformed() {
        let mut bytes = image(Extents::new(1, 1), &[publish(1, b"a")], &[]);
        // Topic length field of the first record.
        let at = 4096 + 100;
        bytes[at..at + 4].copy_from_slice(&1000u32.to_le_bytes());
        let mut reader = reader(bytes, ReaderConfig::default());
        let err = reader.records().next().unwrap().unwrap_err();
        assert!(matches!(
            err,
            CoreError::MalformedRecord {
                offset: 4096,
                version: 8,
                ..
            }
        ));
    }

    #[test]
    fn active_when_records_pass_declared_last() {
        let bytes = image(Extents::new(1, 1), &[publish(1, b"a"), publish(2, b"b")], &[]);
        let mut reader = reader(bytes, ReaderConfig::default());
        assert!(!reader.is_active());
        reader.records().for_each(drop);
        assert!(reader.is_active());
    }

    #[test]
    fn redaction_keeps_structural_payloads() {
        let mut transfer = Record::new(RecordType::Transfer);
        transfer.local_txid = 2;
        transfer.data = Payload::Bytes(vec![1, 0, 0, 0, 0, 0, 0, 0, b'/', b'q']);
        let bytes = image(Extents::new(1, 2), &[publish(1, b"secret"), transfer], &[]);
        let mut reader = reader(bytes, ReaderConfig::new().redact_data(true));
        let records: Vec<_> = reader.records().collect::<CoreResult<_>>().unwrap();
        assert_eq!(records[0].data, Payload::Redacted { len: 6 });
        assert_eq!(records[1].transfer().unwrap().owner, 1);
    }

    #[test]
    fn checksum_verification_is_opt_in() {
        let mut bytes = image(Extents::new(1, 1), &[publish(1, b"payload")], &[]);
        let last = bytes.len() - 256 + 130;
        bytes[last] ^= 0xff;

        let mut lenient = reader(bytes.clone(), ReaderConfig::default());
        assert!(lenient.records().next().unwrap().is_ok());

        let mut strict = reader(bytes, ReaderConfig::new().verify_checksums(true));
        assert!(matches!(
            strict.records().next().unwrap(),
            Err(CoreError::ChecksumMismatch { offset: 4096, .. })
        ));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = image(Extents::default(), &[], &[]);
        bytes[0] = b'X';
        let result = JournalReader::from_backend(
            "bad.journal",
            Box::new(InMemoryBackend::with_data(bytes)),
            None,
            ReaderConfig::default(),
        );
        assert!(matches!(result, Err(CoreError::InvalidFormat { .. })));
    }

    #[test]
    fn extents_report() {
        let bytes = image(Extents::new(5, 0), &[], &[]);
        let reader = reader(bytes, ReaderConfig::default());
        let report = reader.format_extents(false, &RenderOptions::default());
        assert!(report.starts_with("\nFile Name       : mem.journal\n"));
        assert!(report.contains("Extents         : unwritten\n"));
        assert!(report.contains("First Timestamp : unknown\n"));
        assert!(report.ends_with(SEPARATOR));

        let raw = reader.format_extents(true, &RenderOptions::default());
        assert!(raw.contains("Extents         : [5:0]\n"));
    }
}
