//! Journal fixtures.
//!
//! [`JournalBuilder`] lays out journals of any schema version byte by byte,
//! the way writers of that version did, so readers and upgrades can be
//! tested against versions this workspace no longer writes.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use txlog_codec::{
    encode_record, unix_to_journal_time, MessageType, Payload, Record, RecordType,
    SoftwareChecksum, LATEST_VERSION,
};
use txlog_core::{
    body_offset, Extents, ExtentsHeader, FileHeader, DEFAULT_COMPRESSION_OPTIONS,
    DEFAULT_COMPRESSION_TYPE, EXTENTS_OFFSET,
};

/// Builds journal file bytes for any schema version.
#[derive(Debug, Clone)]
pub struct JournalBuilder {
    version: u32,
    instance_id: u32,
    extents: Option<Extents>,
    records: Vec<Record>,
    terminated: bool,
}

impl JournalBuilder {
    /// Creates a builder for `version`.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            instance_id: 1,
            extents: None,
            records: Vec::new(),
            terminated: false,
        }
    }

    /// Sets the instance id.
    #[must_use]
    pub fn instance_id(mut self, id: u32) -> Self {
        self.instance_id = id;
        self
    }

    /// Sets the declared extents instead of deriving them from the records.
    #[must_use]
    pub fn extents(mut self, extents: Extents) -> Self {
        self.extents = Some(extents);
        self
    }

    /// Appends a record.
    #[must_use]
    pub fn record(mut self, record: Record) -> Self {
        self.records.push(record);
        self
    }

    /// Appends records.
    #[must_use]
    pub fn records(mut self, records: impl IntoIterator<Item = Record>) -> Self {
        self.records.extend(records);
        self
    }

    /// Ends the body with a zero block.
    #[must_use]
    pub fn terminated(mut self, value: bool) -> Self {
        self.terminated = value;
        self
    }

    /// Version label written into the header.
    pub fn label(&self) -> String {
        format!("amps::txlog/v{}", self.version)
    }

    /// Extents the header will declare.
    pub fn declared_extents(&self) -> Extents {
        self.extents.unwrap_or_else(|| {
            let mut extents = Extents::default();
            for record in &self.records {
                extents.widen(record.local_txid, journal_timestamp(record.timestamp));
            }
            extents
        })
    }

    /// Lays out the journal.
    ///
    /// Previous sizes are chained as writers chain them.
    ///
    /// # Panics
    ///
    /// Panics if a record does not fit the layout of the version.
    pub fn build(&self) -> Vec<u8> {
        let mut header = if self.version == LATEST_VERSION {
            FileHeader::latest(
                self.instance_id,
                DEFAULT_COMPRESSION_TYPE,
                DEFAULT_COMPRESSION_OPTIONS,
            )
        } else {
            FileHeader::legacy(self.version, self.instance_id, &self.label())
        };
        header.seal(&SoftwareChecksum);
        let mut extents = ExtentsHeader::new(self.version, self.declared_extents());
        extents.seal(&SoftwareChecksum);

        let mut bytes = vec![0u8; body_offset(self.version) as usize];
        let encoded = header.encode();
        bytes[..encoded.len()].copy_from_slice(&encoded);
        let encoded = extents.encode();
        let start = EXTENTS_OFFSET as usize;
        bytes[start..start + encoded.len()].copy_from_slice(&encoded);

        let mut previous_size = 0;
        for record in &self.records {
            let mut record = record.clone();
            record.previous_size = previous_size;
            let encoded = encode_record(self.version, &record, &SoftwareChecksum)
                .expect("record fits the layout");
            previous_size = encoded.size;
            bytes.extend_from_slice(&encoded.bytes);
        }
        if self.terminated {
            bytes.extend_from_slice(&[0u8; 256]);
        }
        bytes
    }

    /// Writes the journal to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        fs::write(path, self.build()).expect("Failed to write journal");
        path.to_path_buf()
    }
}

fn journal_timestamp(timestamp: u64) -> i64 {
    i64::try_from(timestamp).unwrap_or(i64::MAX)
}

/// A publish record with every common field set.
///
/// The timestamp lies `txid` seconds after 2023-11-14T22:13:20Z.
pub fn sample_record(txid: u64) -> Record {
    let mut record = Record::new(RecordType::Publish);
    record.message_type_hash = MessageType::Json.hash();
    record.local_txid = txid;
    record.previous_local_txid = txid.saturating_sub(1);
    record.client_name_hash = 0xC11E;
    record.client_seq = txid;
    record.topic_hash = 0x70_91C;
    record.timestamp = unix_to_journal_time(1_700_000_000 + txid as i64, 0).unwrap_or(0);
    record.topic = b"orders".to_vec();
    record.auth_id = b"alice".to_vec();
    record.correlation_id = format!("corr-{txid}").into_bytes();
    record.data = Payload::Bytes(format!("{{\"id\":{txid}}}").into_bytes());
    record
}

/// A replicated copy of [`sample_record`].
pub fn replicated_record(txid: u64, source_hash: u64, source_txid: u64, path: &str) -> Record {
    let mut record = sample_record(txid);
    record.source_name_hash = source_hash;
    record.source_txid = source_txid;
    record.replication_path = path.as_bytes().to_vec();
    record
}

/// A temporary directory holding journals.
pub struct TestDir {
    dir: TempDir,
}

impl TestDir {
    /// Creates an empty directory.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a file in the directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// A glob pattern relative to the directory.
    pub fn pattern(&self, pattern: &str) -> String {
        format!("{}/{pattern}", self.dir.path().display())
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
