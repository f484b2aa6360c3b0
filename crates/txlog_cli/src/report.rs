//! Text and JSON rendering of dump reports.
//!
//! The text layout is the aligned `label : value` form operators already
//! read: numbers and names right-aligned in a 30-column value field,
//! variable-length fields in brackets. Version 7 and later use 30-column
//! labels; older versions use 26-column labels for the fixed part.

use serde::Serialize;
use std::fmt::{self, Write as _};
use txlog_codec::{iso_timestamp, Expiration, Record, RecordType, RenderOptions};
use txlog_core::{Extents, JournalStats, SourceExtent, SourceExtents, SEPARATOR};

const VALUE_WIDTH: usize = 30;
const LABEL_WIDTH: usize = 30;
const LEGACY_LABEL_WIDTH: usize = 26;

/// Printed when a dumped file is still being written.
pub const ACTIVE_WARNING: &str = "
*****************************************************
NOTE: This is the active journal, and may change during
the dump process. Extents may not be fully written, and
reported counts and actual counts may differ.
*****************************************************
";

/// Renders bytes as text, escaping them when they are not UTF-8.
pub fn text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.escape_ascii().to_string(),
    }
}

struct Lines {
    out: String,
    width: usize,
}

impl Lines {
    fn new(width: usize) -> Self {
        Self {
            out: String::new(),
            width,
        }
    }

    fn start_line(&mut self) {
        if !self.out.is_empty() {
            self.out.push('\n');
        }
    }

    fn value(&mut self, label: &str, value: impl fmt::Display) {
        self.start_line();
        let value = value.to_string();
        let _ = write!(
            self.out,
            "{label:<width$}: {value:>VALUE_WIDTH$}",
            width = self.width
        );
    }

    fn bracketed(&mut self, label: &str, value: impl fmt::Display) {
        self.start_line();
        let _ = write!(self.out, "{label:<width$}: [{value}]", width = self.width);
    }
}

/// Renders one record as it appears in a dump of a `version` journal.
///
/// `index` is the record's position in the dump, which runs across files
/// and skips records the dump does not count.
pub fn format_record(record: &Record, version: u32, index: u64, options: &RenderOptions) -> String {
    let expiration = record.expiration_view(options);
    let timestamp = iso_timestamp(record.timestamp, options.zone);
    let data = record.data_view().to_string();
    let topic = text(&record.topic);

    let mut lines = Lines::new(if version >= 7 {
        LABEL_WIDTH
    } else {
        LEGACY_LABEL_WIDTH
    });
    lines.value("entry", index);
    lines.value("crc32", record.crc);
    lines.value("type", record.record_type);

    if version >= 7 {
        let group_local_queue = match expiration {
            Expiration::GroupLocalQueue(hash) => Some(hash),
            _ => None,
        };
        lines.value("flags", record.flags);
        lines.value("file offset", record.offset);
        lines.value("tx byte count", record.size);
        lines.value("msg byte count", record.message_len());
        lines.value("msg type", record.message_type_label());
        lines.value("local txid", record.local_txid);
        lines.value("previous local txid", record.previous_local_txid);
        lines.value("source txid", record.source_txid);
        lines.value("source name hash", record.source_name_hash);
        lines.value("client name hash", record.client_name_hash);
        lines.value("client seq", record.client_seq);
        lines.value("topic hash", record.topic_hash);
        if group_local_queue.is_some() {
            lines.value("sow expiration time", 0);
        } else {
            lines.value("sow expiration time", &expiration);
        }
        lines.value("iso8601 timestamp", &timestamp);
        lines.value("timestamp", record.timestamp);
        lines.value("previous byte count", record.previous_size);
        lines.value("topic byte count", record.topic.len());
        lines.bracketed("topic", &topic);
        if record.record_type == RecordType::Transfer {
            let (owner, request_path) = record
                .transfer()
                .map_or((0, String::new()), |t| (t.owner, text(t.request_path)));
            lines.value("owner", owner);
            lines.bracketed("request path", request_path);
        } else {
            lines.bracketed("data", &data);
        }
        if let Some(hash) = group_local_queue {
            lines.value("group local queue domain hash", hash);
        }
    } else {
        lines.value("tx byte count", record.size);
        lines.value("msg byte count", record.message_len());
        lines.value("msg type", record.message_type_label());
        lines.value("local txid", record.local_txid);
        if version >= 5 {
            lines.value("previous local txid", record.previous_local_txid);
        }
        lines.value("source txid", record.source_txid);
        lines.value("source name hash", record.source_name_hash);
        lines.value("client name hash", record.client_name_hash);
        lines.value("client seq", record.client_seq);
        lines.value("topic hash", record.topic_hash);
        if version >= 5 {
            lines.value("sow expiration time", &expiration);
        } else {
            lines.value("sow key", record.sow_key);
        }
        lines.value("iso8601 timestamp", &timestamp);
        lines.value("timestamp", record.timestamp);
        if version >= 5 {
            lines.value("previous byte count", record.previous_size);
        } else {
            lines.value("flags", record.flags.0);
        }
        lines.value("topic byte count", record.topic.len());
        lines.bracketed("topic", &topic);
        lines.bracketed("data", &data);
    }

    // Trailing fields use the wide labels in every version.
    lines.width = LABEL_WIDTH;
    let key_slot = record.key_slot();
    if !key_slot.is_empty() {
        if record.delete_context.is_empty() {
            lines.value("key byte count", key_slot.len());
            lines.bracketed("key", record.key_view());
        } else {
            lines.value("context byte count", key_slot.len());
            lines.bracketed("context", text(&record.delete_context));
        }
    }
    if version >= 6 {
        lines.value("correlation id byte count", record.correlation_id.len());
        lines.bracketed("correlation id", text(&record.correlation_id));
    }
    if version > 1 {
        lines.value("auth id byte count", record.auth_id.len());
        lines.bracketed("auth id", text(&record.auth_id));
        lines.value("rep path byte count", record.replication_path.len());
        lines.bracketed("rep path", text(&record.replication_path));
    }
    lines.start_line();
    lines.out.push_str(SEPARATOR);
    lines.out
}

/// Renders the replication source table printed after a file.
///
/// Source names are padded to a common width so the extents line up.
pub fn format_source_extents(local: Extents, sources: &SourceExtents) -> String {
    let names: Vec<(String, &SourceExtent)> = sources
        .iter()
        .map(|source| (source.source_name(), source))
        .collect();
    let widest = names.iter().map(|(name, _)| name.len()).max().unwrap_or(0);

    let mut out = String::from("Replication Source Info:\n");
    for (name, source) in &names {
        let _ = writeln!(out, "Replication Source {name}: {}", source.source_name_hash);
    }
    out.push_str("\nReplication Extents Info:\n");
    let _ = write!(
        out,
        "Local Extents: {}[{}:{}]",
        " ".repeat(widest + 2),
        local.first,
        local.last
    );
    for (name, source) in &names {
        let _ = write!(
            out,
            "\nSource {name} Extents: {}[{}:{}]",
            " ".repeat(widest - name.len()),
            source.first,
            source.latest
        );
    }
    out
}

/// Renders the totals block closing a dump.
pub fn format_totals(stats: &JournalStats) -> String {
    let mut out = format!(
        "Total Entries    : {}\nTotal Bytes      : {}\nRemaining Bytes  : {}",
        stats.entries,
        stats.bytes,
        stats.remaining_bytes()
    );
    if stats.unknown_commands > 0 {
        let _ = write!(
            out,
            "\nWARNING: {} messages with unknown command type.",
            stats.unknown_commands
        );
    }
    if stats.unknown_message_types > 0 {
        let _ = write!(
            out,
            "\nWARNING: {} messages with unknown message type.",
            stats.unknown_message_types
        );
    }
    out
}

/// A record as emitted by `--format json`.
#[derive(Debug, Serialize)]
pub struct RecordReport {
    /// Position in the dump.
    pub entry: u64,
    /// Byte offset within its file.
    pub offset: u64,
    /// Stored CRC32.
    pub crc: u32,
    /// On-disk size.
    pub size: u32,
    /// Type label.
    #[serde(rename = "type")]
    pub record_type: String,
    /// Flags label.
    pub flags: String,
    /// Message type name, or the hash when unknown.
    pub message_type: String,
    /// Local transaction id.
    pub local_txid: u64,
    /// Previous local transaction id.
    pub previous_local_txid: u64,
    /// Transaction id at the replication source.
    pub source_txid: u64,
    /// Replication source name hash.
    pub source_name_hash: u64,
    /// Client name hash.
    pub client_name_hash: u64,
    /// Client sequence number.
    pub client_seq: u64,
    /// Topic hash.
    pub topic_hash: u64,
    /// SOW key, for versions that carry one.
    pub sow_key: u64,
    /// Rendered expiration.
    pub sow_expiration: String,
    /// Rendered timestamp.
    pub timestamp: String,
    /// Size of the preceding record.
    pub previous_size: u32,
    /// Topic.
    pub topic: String,
    /// Key, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Delete context, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Correlation id.
    pub correlation_id: String,
    /// Authenticated id.
    pub auth_id: String,
    /// Replication path.
    pub replication_path: String,
    /// Message data length.
    pub message_len: usize,
    /// Message data as presented in the text report.
    pub data: String,
}

impl RecordReport {
    /// Builds the report of `record` at dump position `entry`.
    pub fn new(record: &Record, entry: u64, options: &RenderOptions) -> Self {
        let non_empty = |bytes: &[u8]| (!bytes.is_empty()).then(|| text(bytes));
        Self {
            entry,
            offset: record.offset,
            crc: record.crc,
            size: record.size,
            record_type: record.record_type.to_string(),
            flags: record.flags.to_string(),
            message_type: record.message_type_label(),
            local_txid: record.local_txid,
            previous_local_txid: record.previous_local_txid,
            source_txid: record.source_txid,
            source_name_hash: record.source_name_hash,
            client_name_hash: record.client_name_hash,
            client_seq: record.client_seq,
            topic_hash: record.topic_hash,
            sow_key: record.sow_key,
            sow_expiration: record.expiration_view(options).to_string(),
            timestamp: iso_timestamp(record.timestamp, options.zone),
            previous_size: record.previous_size,
            topic: text(&record.topic),
            key: (!record.key.is_empty()).then(|| record.key_view().to_string()),
            context: non_empty(&record.delete_context),
            correlation_id: text(&record.correlation_id),
            auth_id: text(&record.auth_id),
            replication_path: text(&record.replication_path),
            message_len: record.message_len(),
            data: record.data_view().to_string(),
        }
    }
}
