//! Journal writer.
//!
//! Writes the latest schema version only. Records are appended at 256-byte
//! aligned offsets; `close` pads the body to a segment boundary with a noop
//! and persists the final extents.

use crate::config::WriterConfig;
use crate::error::{CoreError, CoreResult};
use crate::header::{Extents, ExtentsHeader, FileHeader, EXTENTS_OFFSET, SEGMENT_LEN};
use std::fmt;
use std::path::Path;
use tracing::{debug, warn};
use txlog_codec::{
    default_checksum, encode_record, Checksum, Payload, Record, RecordSchema, RecordType,
    LATEST_VERSION,
};
use txlog_storage::{FileBackend, StorageBackend};

/// Writes a journal file in the latest schema version.
pub struct JournalWriter {
    path: String,
    backend: Box<dyn StorageBackend>,
    config: WriterConfig,
    checksum: &'static dyn Checksum,
    extents: Extents,
    offset: u64,
    last_write_size: u32,
    last_txid: u64,
    last_timestamp: u64,
    write_count: u64,
    closed: bool,
}

impl JournalWriter {
    /// Creates a journal file, replacing any existing one.
    ///
    /// `extents` seeds the declared range; written records only widen it.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the file cannot be created or written.
    pub fn create(path: impl AsRef<Path>, instance_id: u32, extents: Extents) -> CoreResult<Self> {
        let path = path.as_ref();
        let backend = FileBackend::create_with_dirs(path)?;
        Self::create_with(
            path.display().to_string(),
            Box::new(backend),
            instance_id,
            extents,
            WriterConfig::default(),
        )
    }

    /// Creates a journal on any backend.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the headers cannot be written.
    pub fn create_with(
        name: impl Into<String>,
        backend: Box<dyn StorageBackend>,
        instance_id: u32,
        extents: Extents,
        config: WriterConfig,
    ) -> CoreResult<Self> {
        let mut writer = Self {
            path: name.into(),
            backend,
            checksum: default_checksum(),
            extents,
            offset: SEGMENT_LEN,
            last_write_size: 0,
            last_txid: 0,
            last_timestamp: 0,
            write_count: 0,
            closed: false,
            config,
        };

        writer.backend.write_at(0, &[0u8; SEGMENT_LEN as usize])?;
        let mut header = FileHeader::latest(
            instance_id,
            &writer.config.compression_type,
            writer.config.compression_options,
        );
        writer.backend.write_at(0, &header.encode())?;
        header.seal(writer.checksum);
        writer.backend.write_at(0, &header.encode())?;
        writer.write_extents()?;

        debug!(path = %writer.path, instance_id, ?extents, "created journal");
        Ok(writer)
    }

    /// Path or name of the journal.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Offset the next record will be written at.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Extents as they will be persisted.
    #[must_use]
    pub fn extents(&self) -> Extents {
        self.extents
    }

    /// Number of records written, excluding the closing noop.
    #[must_use]
    pub fn write_count(&self) -> u64 {
        self.write_count
    }

    /// Appends a record and returns the offset it was written at.
    ///
    /// Size, CRC and previous size are recomputed; values stored in the
    /// record are ignored.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRecord` if the record cannot be encoded (redacted
    /// data, oversized fields) and `Storage` if the write fails.
    pub fn write(&mut self, mut record: Record) -> CoreResult<u64> {
        self.ensure_open()?;
        record.previous_size = self.last_write_size;
        let size = self.append(&record)?;

        self.last_txid = record.local_txid;
        self.last_timestamp = record.timestamp;
        self.extents.widen(
            record.local_txid,
            i64::try_from(record.timestamp).unwrap_or(i64::MAX),
        );
        self.write_count += 1;
        Ok(self.offset - size)
    }

    /// Pads the body to a segment boundary, persists the extents and
    /// releases the file.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if any write, sync or release fails.
    pub fn close(mut self) -> CoreResult<()> {
        self.ensure_open()?;
        let gap = SEGMENT_LEN - self.offset % SEGMENT_LEN;
        if gap != SEGMENT_LEN {
            self.write_noop(gap)?;
        }
        self.write_extents()?;
        if self.config.sync_on_close {
            self.backend.sync()?;
        } else {
            self.backend.flush()?;
        }
        self.closed = true;
        self.backend.release()?;
        debug!(
            path = %self.path,
            records = self.write_count,
            size = self.offset,
            extents = ?self.extents,
            "closed journal"
        );
        Ok(())
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.closed {
            return Err(CoreError::invalid_argument(format!(
                "journal {} is closed",
                self.path
            )));
        }
        Ok(())
    }

    /// Encodes and writes at the current offset; returns the aligned size.
    fn append(&mut self, record: &Record) -> CoreResult<u64> {
        let encoded = encode_record(LATEST_VERSION, record, self.checksum).map_err(|err| {
            CoreError::malformed_record(&self.path, self.offset, LATEST_VERSION, err)
        })?;
        if record.size != 0 && record.size != encoded.size {
            debug!(
                path = %self.path,
                offset = self.offset,
                declared = record.size,
                actual = encoded.size,
                "corrected record size"
            );
        }
        self.backend.write_at(self.offset, &encoded.bytes)?;
        self.last_write_size = encoded.size;
        let size = u64::from(encoded.size);
        self.offset += size;
        Ok(size)
    }

    /// Writes a noop of exactly `size` bytes. Extents are left alone.
    fn write_noop(&mut self, size: u64) -> CoreResult<()> {
        let header_len = RecordSchema::V7Plus.header_len() as u64;
        let data_len = usize::try_from(size.saturating_sub(header_len)).unwrap_or(0);
        let noop = Record {
            local_txid: self.last_txid,
            timestamp: self.last_timestamp,
            previous_size: self.last_write_size,
            data: Payload::Bytes(vec![0; data_len]),
            ..Record::new(RecordType::Noop)
        };
        debug!(path = %self.path, offset = self.offset, size, "padding with noop");
        self.append(&noop)?;
        Ok(())
    }

    fn write_extents(&mut self) -> CoreResult<()> {
        let mut header = ExtentsHeader::new(LATEST_VERSION, self.extents);
        self.backend.write_at(EXTENTS_OFFSET, &header.encode())?;
        header.seal(self.checksum);
        self.backend.write_at(EXTENTS_OFFSET, &header.encode())?;
        Ok(())
    }
}

impl fmt::Debug for JournalWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JournalWriter")
            .field("path", &self.path)
            .field("offset", &self.offset)
            .field("extents", &self.extents)
            .field("write_count", &self.write_count)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Drop for JournalWriter {
    fn drop(&mut self) {
        if !self.closed {
            warn!(
                path = %self.path,
                records = self.write_count,
                "journal writer dropped without close; extents are not final"
            );
            let _ = self.backend.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaderConfig;
    use crate::journal::JournalReader;
    use proptest::prelude::*;
    use std::fs;
    use tempfile::tempdir;
    use txlog_codec::{decode_record, record_crc, SoftwareChecksum};
    use txlog_storage::InMemoryBackend;

    fn publish(txid: u64, timestamp: u64, data: &[u8]) -> Record {
        let mut record = Record::new(RecordType::Publish);
        record.local_txid = txid;
        record.timestamp = timestamp;
        record.topic = b"orders".to_vec();
        record.data = Payload::Bytes(data.to_vec());
        record
    }

    fn write_all(records: Vec<Record>, extents: Extents) -> Vec<u8> {
        let dir = tempdir().unwrap();
        let path = dir.path().join("00000.journal");
        let mut writer = JournalWriter::create(&path, 1, extents).unwrap();
        for record in records {
            writer.write(record).unwrap();
        }
        writer.close().unwrap();
        fs::read(&path).unwrap()
    }

    fn read_all(bytes: Vec<u8>) -> (JournalReader, Vec<Record>) {
        let mut reader = JournalReader::from_backend(
            "mem.journal",
            Box::new(InMemoryBackend::with_data(bytes)),
            None,
            ReaderConfig::new().verify_checksums(true),
        )
        .unwrap();
        let records = reader.records().collect::<CoreResult<Vec<_>>>().unwrap();
        (reader, records)
    }

    #[test]
    fn closed_file_ends_on_segment() {
        let records = vec![publish(1, 10, b"a"), publish(2, 20, &[b'x'; 300])];
        let bytes = write_all(records, Extents::default());
        assert_eq!(bytes.len() % 4096, 0);
        assert_eq!(bytes.len(), 8192);

        let (_, records) = read_all(bytes);
        assert_eq!(records.len(), 3);
        let noop = &records[2];
        assert_eq!(noop.record_type, RecordType::Noop);
        assert_eq!(noop.size, 4096 - 256 - 512);
        assert_eq!(noop.local_txid, 2);
        assert_eq!(noop.timestamp, 20);
        assert_eq!(noop.previous_size, 512);
    }

    #[test]
    fn aligned_body_gets_no_noop() {
        let records = (1..=16).map(|txid| publish(txid, txid, b"")).collect();
        let bytes = write_all(records, Extents::default());
        assert_eq!(bytes.len(), 8192);
        let (_, read) = read_all(bytes);
        assert_eq!(read.len(), 16);
        assert!(read.iter().all(|r| r.record_type == RecordType::Publish));
    }

    #[test]
    fn extents_widen_regardless_of_order() {
        let records = [5, 2, 9, 1]
            .into_iter()
            .map(|txid| publish(txid, txid * 100, b"x"))
            .collect();
        let (reader, _) = read_all(write_all(records, Extents::default()));
        assert_eq!(
            reader.extents(),
            Extents {
                first: 1,
                first_timestamp: 100,
                last: 9,
                last_timestamp: 900,
            }
        );
    }

    #[test]
    fn seeded_extents_are_never_narrowed() {
        let records = vec![publish(5, 1, b"x")];
        let (reader, _) = read_all(write_all(records, Extents::new(3, 8)));
        assert_eq!((reader.extents().first, reader.extents().last), (3, 8));
    }

    #[test]
    fn every_record_crc_verifies() {
        let records = vec![publish(1, 1, b"one"), publish(2, 2, &[7u8; 1000])];
        let bytes = write_all(records, Extents::default());
        let mut offset = 4096usize;
        while offset < bytes.len() {
            let size =
                u32::from_le_bytes(bytes[offset + 4..offset + 8].try_into().unwrap()) as usize;
            let record = &bytes[offset..offset + size];
            let stored = u32::from_le_bytes(record[..4].try_into().unwrap());
            assert_eq!(
                record_crc(LATEST_VERSION, record, &SoftwareChecksum).unwrap(),
                stored
            );
            assert_eq!(decode_record(LATEST_VERSION, record).unwrap().size as usize, size);
            offset += size;
        }
    }

    #[test]
    fn previous_size_chains() {
        let records = vec![publish(1, 1, &[0; 300]), publish(2, 2, b""), publish(3, 3, b"")];
        let (_, read) = read_all(write_all(records, Extents::default()));
        assert_eq!(read[0].previous_size, 0);
        assert_eq!(read[1].previous_size, 512);
        assert_eq!(read[2].previous_size, 256);
    }

    #[test]
    fn declared_size_is_corrected() {
        let mut record = publish(1, 1, b"x");
        record.size = 4096;
        record.crc = 12345;
        let (_, read) = read_all(write_all(vec![record], Extents::default()));
        assert_eq!(read[0].size, 256);
    }

    #[test]
    fn redacted_record_is_rejected() {
        let mut writer = JournalWriter::create_with(
            "mem.journal",
            Box::new(InMemoryBackend::new()),
            1,
            Extents::default(),
            WriterConfig::default(),
        )
        .unwrap();
        let mut record = publish(1, 1, b"secret");
        record.redact_data();
        assert!(matches!(
            writer.write(record),
            Err(CoreError::MalformedRecord { offset: 4096, .. })
        ));
        writer.close().unwrap();
    }

    #[test]
    fn header_carries_writer_constants() {
        let bytes = write_all(Vec::new(), Extents::default());
        assert_eq!(bytes.len(), 4096);
        let (reader, records) = read_all(bytes);
        assert!(records.is_empty());
        assert_eq!(reader.version(), LATEST_VERSION);
        assert_eq!(reader.version_label(), "amps::txlog/v8");
        assert_eq!(reader.compression_type(), "gz");
        assert_eq!(reader.header().compression_options, 9);
        assert!(reader.header().crc_matches(&SoftwareChecksum));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn any_write_order_gives_min_max_extents(
            txids in proptest::collection::vec(1u64..10_000, 1..20),
            sizes in proptest::collection::vec(0usize..1500, 20),
        ) {
            let records = txids
                .iter()
                .zip(&sizes)
                .map(|(&txid, &len)| publish(txid, txid, &vec![b'd'; len]))
                .collect();
            let bytes = write_all(records, Extents::default());
            prop_assert_eq!(bytes.len() % 4096, 0);

            let (reader, read) = read_all(bytes);
            prop_assert_eq!(reader.extents().first, *txids.iter().min().unwrap());
            prop_assert_eq!(reader.extents().last, *txids.iter().max().unwrap());
            prop_assert!(read.len() >= txids.len());
            for record in &read {
                prop_assert_eq!(record.size % 256, 0);
            }
        }
    }
}
