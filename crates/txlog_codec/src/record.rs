//! Canonical journal record and its label tables.
//!
//! A [`Record`] holds every field any schema version can carry. Fields a
//! version does not have are zero or empty after decoding. Message data is
//! kept byte-for-byte so that a record can be re-encoded without loss;
//! presentation concerns (redaction, compressed placeholders, string keys,
//! transfer payloads, expiration rendering) are exposed as views.

use crate::render::{expiration_timestamp, ExpirationFormat, RenderOptions};
use std::fmt;

/// Record type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// A publish.
    Publish,
    /// A delta publish.
    DeltaPublish,
    /// SOW delete by key.
    SowDeleteByKey,
    /// SOW delete by filter; the key trailer carries the delete context.
    SowDeleteByQuery,
    /// A duplicate.
    Duplicate,
    /// An acknowledgement.
    Ack,
    /// SOW delete by message data.
    SowDeleteByData,
    /// SOW delete by bookmark (queue removal).
    SowDeleteByBookmark,
    /// Queue message ownership transfer.
    Transfer,
    /// Alignment filler.
    Noop,
    /// A code this codec does not know. The code is kept for re-encoding.
    Unknown(u32),
}

impl RecordType {
    /// Maps an on-disk type code to a record type.
    #[must_use]
    pub const fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Publish,
            1 => Self::DeltaPublish,
            2 => Self::SowDeleteByKey,
            3 => Self::SowDeleteByQuery,
            4 => Self::Duplicate,
            5 => Self::Ack,
            6 => Self::SowDeleteByData,
            7 => Self::SowDeleteByBookmark,
            8 => Self::Transfer,
            9 => Self::Noop,
            other => Self::Unknown(other),
        }
    }

    /// Returns the on-disk type code.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::Publish => 0,
            Self::DeltaPublish => 1,
            Self::SowDeleteByKey => 2,
            Self::SowDeleteByQuery => 3,
            Self::Duplicate => 4,
            Self::Ack => 5,
            Self::SowDeleteByData => 6,
            Self::SowDeleteByBookmark => 7,
            Self::Transfer => 8,
            Self::Noop => 9,
            Self::Unknown(code) => code,
        }
    }

    /// Returns the report label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::DeltaPublish => "delta-publish",
            Self::SowDeleteByKey => "sow_delete_by_key",
            Self::SowDeleteByQuery => "sow_delete_by_query",
            Self::Duplicate => "duplicate",
            Self::Ack => "ack",
            Self::SowDeleteByData => "sow_delete_by_data",
            Self::SowDeleteByBookmark => "sow_delete_by_bookmark",
            Self::Transfer => "transfer",
            Self::Noop => "noop",
            Self::Unknown(_) => "unknown",
        }
    }

    /// True for types whose `sow_expiration` holds a group-local-queue
    /// domain hash and whose payload is never redacted.
    #[must_use]
    pub const fn is_group_local_queue(self) -> bool {
        matches!(self, Self::SowDeleteByBookmark | Self::Transfer)
    }
}

impl Default for RecordType {
    fn default() -> Self {
        Self::Publish
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Record flags.
///
/// Flags are labelled by table lookup on the whole value, not by testing
/// bits: any value outside the table is labelled `none`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Flags(pub u32);

impl Flags {
    /// No flags.
    pub const NONE: Self = Self(0);
    /// Message data is compressed.
    pub const COMPRESSED: Self = Self(1);
    /// The key is text.
    pub const STRING_KEY: Self = Self(2);
    /// Compressed data with a text key.
    pub const COMPRESSED_STRING_KEY: Self = Self(3);
    /// Cancel.
    pub const CANCEL: Self = Self(4);
    /// Re-acknowledgement.
    pub const REACK: Self = Self(12);

    /// Returns the report label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self.0 {
            1 => "compressed",
            2 => "string key",
            3 => "compressed, string key",
            4 => "cancel",
            12 => "reack",
            _ => "none",
        }
    }

    /// True when the label marks the data as compressed.
    #[must_use]
    pub const fn is_compressed(self) -> bool {
        matches!(self.0, 1 | 3)
    }

    /// True when the label marks the key as text.
    #[must_use]
    pub const fn is_string_key(self) -> bool {
        matches!(self.0, 2 | 3)
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Known message types, identified by the hash of their name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// FIX.
    Fix,
    /// Name/value FIX.
    NvFix,
    /// XML.
    Xml,
    /// JSON.
    Json,
    /// BSON.
    Bson,
    /// Opaque binary.
    Binary,
    /// BFlat.
    BFlat,
    /// MessagePack.
    MsgPack,
    /// Protocol Buffers.
    Protobuf,
}

impl MessageType {
    const ALL: [Self; 9] = [
        Self::Fix,
        Self::NvFix,
        Self::Xml,
        Self::Json,
        Self::Bson,
        Self::Binary,
        Self::BFlat,
        Self::MsgPack,
        Self::Protobuf,
    ];

    /// Looks up a message type by its name hash.
    #[must_use]
    pub fn from_hash(hash: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|mt| mt.hash() == hash)
    }

    /// Looks up a message type by name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mt| mt.name() == name)
    }

    /// Returns the name hash stored in records.
    #[must_use]
    pub const fn hash(self) -> u64 {
        match self {
            Self::Fix => 11_366_176_381_677_217_403,
            Self::NvFix => 2_827_704_697_691_937_455,
            Self::Xml => 10_107_872_178_429_970_057,
            Self::Json => 9_900_685_383_425_431_138,
            Self::Bson => 8_442_027_542_746_405_716,
            Self::Binary => 10_020_990_295_791_775_699,
            Self::BFlat => 5_817_622_476_697_324_896,
            Self::MsgPack => 9_610_505_581_487_600_755,
            Self::Protobuf => 698_723_037_243_269_950,
        }
    }

    /// Returns the message type name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fix => "fix",
            Self::NvFix => "nvfix",
            Self::Xml => "xml",
            Self::Json => "json",
            Self::Bson => "bson",
            Self::Binary => "binary",
            Self::BFlat => "bflat",
            Self::MsgPack => "msgpack",
            Self::Protobuf => "protobuf",
        }
    }
}

/// Renders a message type hash: the name when known, otherwise
/// `"<hash> (unknown)"`.
#[must_use]
pub fn message_type_label(hash: u64) -> String {
    match MessageType::from_hash(hash) {
        Some(mt) => mt.name().to_string(),
        None => format!("{hash} (unknown)"),
    }
}

/// Message data carried by a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// The bytes as stored.
    Bytes(Vec<u8>),
    /// Data suppressed by the reader; only its length is known.
    Redacted {
        /// Length of the suppressed data.
        len: u32,
    },
}

impl Default for Payload {
    fn default() -> Self {
        Self::Bytes(Vec::new())
    }
}

impl Payload {
    /// Returns the payload length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(bytes) => bytes.len(),
            Self::Redacted { len } => *len as usize,
        }
    }

    /// True when the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the bytes, or `None` when redacted.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Redacted { .. } => None,
        }
    }
}

/// How message data should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataView<'a> {
    /// UTF-8 text.
    Text(&'a str),
    /// Non UTF-8 bytes.
    Binary(&'a [u8]),
    /// Compressed data, which this codec does not inflate.
    Compressed,
    /// Data removed by redaction.
    Redacted,
}

impl fmt::Display for DataView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Binary(bytes) => write!(f, "{}", bytes.escape_ascii()),
            Self::Compressed => f.write_str("compressed data"),
            Self::Redacted => f.write_str("<removed from dump>"),
        }
    }
}

/// How a record key should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyView<'a> {
    /// A string key.
    Text(&'a str),
    /// A binary key.
    Binary(&'a [u8]),
}

impl fmt::Display for KeyView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Binary(bytes) => write!(f, "{}", bytes.escape_ascii()),
        }
    }
}

/// The payload of a transfer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer<'a> {
    /// Owning client id.
    pub owner: u64,
    /// Request path following the owner id.
    pub request_path: &'a [u8],
}

/// How a `sow_expiration` value should be presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiration {
    /// No expiration.
    Unset,
    /// Unix seconds.
    Seconds(u64),
    /// Rendered ISO-8601 timestamp.
    Iso(String),
    /// Group-local-queue domain hash, never a time.
    GroupLocalQueue(u64),
}

impl fmt::Display for Expiration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("0"),
            Self::Seconds(secs) => write!(f, "{secs}"),
            Self::Iso(text) => f.write_str(text),
            Self::GroupLocalQueue(hash) => write!(f, "{hash}"),
        }
    }
}

/// A journal record in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    /// Stored CRC32. Recomputed on encode.
    pub crc: u32,
    /// Stored on-disk size, a multiple of 256. Recomputed on encode.
    pub size: u32,
    /// Record type.
    pub record_type: RecordType,
    /// Flags (versions 1-4 and 7+).
    pub flags: Flags,
    /// Hash of the message type name.
    pub message_type_hash: u64,
    /// Local transaction id.
    pub local_txid: u64,
    /// Previous local transaction id (version 5+).
    pub previous_local_txid: u64,
    /// Transaction id at the replication source.
    pub source_txid: u64,
    /// Hash of the replication source name; zero for local records.
    pub source_name_hash: u64,
    /// Hash of the publishing client name.
    pub client_name_hash: u64,
    /// Client sequence number.
    pub client_seq: u64,
    /// Hash of message type and topic.
    pub topic_hash: u64,
    /// SOW key (versions 1-4).
    pub sow_key: u64,
    /// SOW expiration or group-local-queue hash (version 5+).
    pub sow_expiration: u64,
    /// Microseconds since the journal epoch.
    pub timestamp: u64,
    /// Size of the preceding record (version 5+).
    pub previous_size: u32,
    /// Topic bytes.
    pub topic: Vec<u8>,
    /// Authenticated id (version 2+).
    pub auth_id: Vec<u8>,
    /// Key bytes (version 7+).
    pub key: Vec<u8>,
    /// Delete context of a `sow_delete_by_query`, stored in the key slot.
    pub delete_context: Vec<u8>,
    /// Correlation id (version 6+).
    pub correlation_id: Vec<u8>,
    /// Replication path (version 2+).
    pub replication_path: Vec<u8>,
    /// Message data.
    pub data: Payload,
    /// Byte offset within the journal file; zero for records not read from one.
    pub offset: u64,
    /// Zero-based position within the journal file.
    pub entry: u64,
}

impl Record {
    /// Creates an empty record of the given type.
    #[must_use]
    pub fn new(record_type: RecordType) -> Self {
        Self {
            record_type,
            ..Self::default()
        }
    }

    /// Returns the message data length.
    #[must_use]
    pub fn message_len(&self) -> usize {
        self.data.len()
    }

    /// Returns the bytes stored in the key slot on disk.
    #[must_use]
    pub fn key_slot(&self) -> &[u8] {
        if self.delete_context.is_empty() {
            &self.key
        } else {
            &self.delete_context
        }
    }

    /// Replaces the message data with a placeholder unless the record type
    /// carries structural data in its payload.
    pub fn redact_data(&mut self) {
        if self.record_type.is_group_local_queue() {
            return;
        }
        if let Payload::Bytes(bytes) = &self.data {
            let len = u32::try_from(bytes.len()).unwrap_or(u32::MAX);
            self.data = Payload::Redacted { len };
        }
    }

    /// Returns how the message data should be presented.
    #[must_use]
    pub fn data_view(&self) -> DataView<'_> {
        match &self.data {
            Payload::Redacted { .. } => DataView::Redacted,
            Payload::Bytes(_) if self.flags.is_compressed() => DataView::Compressed,
            Payload::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => DataView::Text(text),
                Err(_) => DataView::Binary(bytes),
            },
        }
    }

    /// Returns how the key should be presented.
    #[must_use]
    pub fn key_view(&self) -> KeyView<'_> {
        if self.flags.is_string_key() {
            if let Ok(text) = std::str::from_utf8(&self.key) {
                return KeyView::Text(text);
            }
        }
        KeyView::Binary(&self.key)
    }

    /// Interprets the payload of a transfer record.
    ///
    /// Returns `None` for other record types, redacted payloads and payloads
    /// too short to hold the owner id.
    #[must_use]
    pub fn transfer(&self) -> Option<Transfer<'_>> {
        if self.record_type != RecordType::Transfer {
            return None;
        }
        let bytes = self.data.as_bytes()?;
        let (owner, request_path) = bytes.split_first_chunk::<8>()?;
        Some(Transfer {
            owner: u64::from_le_bytes(*owner),
            request_path,
        })
    }

    /// Returns how `sow_expiration` should be presented.
    #[must_use]
    pub fn expiration_view(&self, options: &RenderOptions) -> Expiration {
        if self.sow_expiration == 0 {
            return Expiration::Unset;
        }
        if self.record_type.is_group_local_queue() {
            return Expiration::GroupLocalQueue(self.sow_expiration);
        }
        match options.expiration {
            ExpirationFormat::Numeric => Expiration::Seconds(self.sow_expiration),
            ExpirationFormat::Iso => {
                Expiration::Iso(expiration_timestamp(self.sow_expiration, options.zone))
            }
        }
    }

    /// Returns the message type label.
    #[must_use]
    pub fn message_type_label(&self) -> String {
        message_type_label(self.message_type_hash)
    }
}
