//! Dump totals across journal files.

use serde::Serialize;
use txlog_codec::{MessageType, Record, RecordType};

/// Totals accumulated while dumping one or more journals.
///
/// Only records that take part in the dump are counted, so noops are
/// excluded unless the dump includes them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JournalStats {
    /// Records counted.
    pub entries: u64,
    /// Bytes up to the end of the last counted record of each file.
    pub bytes: u64,
    /// Sum of file sizes.
    pub journal_size: u64,
    /// Records with an unknown type code.
    pub unknown_commands: u64,
    /// Records with an unknown message type hash.
    pub unknown_message_types: u64,
    /// A file was still being written.
    pub active: bool,
    #[serde(skip)]
    file_end: u64,
}

impl JournalStats {
    /// Creates empty totals.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one record of the current file.
    pub fn record(&mut self, record: &Record) {
        self.entries += 1;
        self.file_end = record.offset + u64::from(record.size);
        if matches!(record.record_type, RecordType::Unknown(_)) {
            self.unknown_commands += 1;
        }
        if MessageType::from_hash(record.message_type_hash).is_none() {
            self.unknown_message_types += 1;
        }
    }

    /// Closes the current file.
    pub fn finish_file(&mut self, file_size: u64, active: bool) {
        self.bytes += self.file_end;
        self.file_end = 0;
        self.journal_size += file_size;
        self.active |= active;
    }

    /// File bytes past the last counted record.
    #[must_use]
    pub fn remaining_bytes(&self) -> u64 {
        self.journal_size.saturating_sub(self.bytes)
    }
}
