//! Reader, writer and dump configuration.

use crate::header::{DEFAULT_COMPRESSION_OPTIONS, DEFAULT_COMPRESSION_TYPE};
use serde::{Deserialize, Serialize};
use txlog_codec::{Record, RecordType, RenderOptions};

/// Configuration for reading a journal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Recompute each record's CRC and fail on mismatch.
    pub verify_checksums: bool,
    /// Replace message data with a placeholder on every yielded record.
    pub redact_data: bool,
}

impl ReaderConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether record CRCs are verified.
    #[must_use]
    pub const fn verify_checksums(mut self, value: bool) -> Self {
        self.verify_checksums = value;
        self
    }

    /// Sets whether message data is redacted.
    #[must_use]
    pub const fn redact_data(mut self, value: bool) -> Self {
        self.redact_data = value;
        self
    }
}

/// Configuration for writing a journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Compression type recorded in the file header.
    pub compression_type: String,
    /// Compression options recorded in the file header.
    pub compression_options: u64,
    /// Whether `close` syncs the file to disk.
    pub sync_on_close: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression_type: DEFAULT_COMPRESSION_TYPE.to_string(),
            compression_options: DEFAULT_COMPRESSION_OPTIONS,
            sync_on_close: true,
        }
    }
}

impl WriterConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the compression type recorded in the header.
    #[must_use]
    pub fn compression_type(mut self, value: impl Into<String>) -> Self {
        self.compression_type = value.into();
        self
    }

    /// Sets the compression options recorded in the header.
    #[must_use]
    pub const fn compression_options(mut self, value: u64) -> Self {
        self.compression_options = value;
        self
    }

    /// Sets whether `close` syncs the file.
    #[must_use]
    pub const fn sync_on_close(mut self, value: bool) -> Self {
        self.sync_on_close = value;
        self
    }
}

/// Selection and presentation options for a dump report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DumpOptions {
    /// First entry index to print.
    pub start: Option<u64>,
    /// Last entry index to print, inclusive.
    pub stop: Option<u64>,
    /// Print noop filler records.
    pub include_noops: bool,
    /// Redact message data.
    pub omit_data: bool,
    /// Print replication source extents after each file.
    pub show_extents: bool,
    /// Print only the header report of each file, with raw extents.
    pub journal_extents: bool,
    /// Timestamp and expiration rendering.
    pub render: RenderOptions,
}

impl DumpOptions {
    /// Creates options that print every non-noop record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the first entry to print.
    #[must_use]
    pub const fn start(mut self, entry: u64) -> Self {
        self.start = Some(entry);
        self
    }

    /// Sets the last entry to print.
    #[must_use]
    pub const fn stop(mut self, entry: u64) -> Self {
        self.stop = Some(entry);
        self
    }

    /// Sets whether noops are printed.
    #[must_use]
    pub const fn include_noops(mut self, value: bool) -> Self {
        self.include_noops = value;
        self
    }

    /// Sets whether message data is redacted.
    #[must_use]
    pub const fn omit_data(mut self, value: bool) -> Self {
        self.omit_data = value;
        self
    }

    /// Sets whether replication extents follow each file.
    #[must_use]
    pub const fn show_extents(mut self, value: bool) -> Self {
        self.show_extents = value;
        self
    }

    /// Sets whether only the raw header extents are printed.
    #[must_use]
    pub const fn journal_extents(mut self, value: bool) -> Self {
        self.journal_extents = value;
        self
    }

    /// Sets rendering options.
    #[must_use]
    pub const fn render(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    /// True when `record` takes part in the dump at all.
    ///
    /// Noops are skipped, and not counted, unless asked for.
    #[must_use]
    pub fn counts(&self, record: &Record) -> bool {
        self.include_noops || record.record_type != RecordType::Noop
    }

    /// True when the counted record at `index` should be printed.
    #[must_use]
    pub fn in_range(&self, index: u64) -> bool {
        !self.start.is_some_and(|start| index < start) && !self.past_stop(index)
    }

    /// True when the record at `index` lies beyond `stop`.
    #[must_use]
    pub fn past_stop(&self, index: u64) -> bool {
        self.stop.is_some_and(|stop| index > stop)
    }
}
