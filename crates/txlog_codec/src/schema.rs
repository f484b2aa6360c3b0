//! Fixed record header layouts per schema version.
//!
//! Each version family is described by an ordered table of fields and their
//! widths. Decoding and encoding walk the table, so a layout difference is a
//! table difference rather than a branch in the codec.
//!
//! | schema | versions | fields | bytes |
//! |---|---|---|---|
//! | `V1` | 1 | 15 | 96 |
//! | `V2To4` | 2-4 | 17 | 104 |
//! | `V5` | 5 | 18 | 112 |
//! | `V6` | 6 | 20 | 120 |
//! | `V7Plus` | 7-8 | 21 | 120 |

use crate::error::{CodecError, CodecResult};

/// The schema version written by this crate.
pub const LATEST_VERSION: u32 = 8;

/// Records are stored in multiples of this many bytes.
pub const MIN_RECORD_SIZE: usize = 256;

/// Rounds `len` up to the next multiple of [`MIN_RECORD_SIZE`].
#[must_use]
pub const fn align_up(len: usize) -> usize {
    (len + MIN_RECORD_SIZE - 1) & !(MIN_RECORD_SIZE - 1)
}

/// Width of a fixed header field on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// Two bytes.
    U16,
    /// Four bytes.
    U32,
    /// Eight bytes.
    U64,
}

impl Width {
    /// Size in bytes.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::U16 => 2,
            Self::U32 => 4,
            Self::U64 => 8,
        }
    }

    /// Largest value the width can hold.
    #[must_use]
    pub const fn max(self) -> u64 {
        match self {
            Self::U16 => u16::MAX as u64,
            Self::U32 => u32::MAX as u64,
            Self::U64 => u64::MAX,
        }
    }
}

/// A fixed header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Field {
    Crc,
    Size,
    Type,
    Flags,
    MessageLen,
    MessageTypeHash,
    LocalTxid,
    PreviousLocalTxid,
    SourceTxid,
    SourceNameHash,
    ClientNameHash,
    ClientSeq,
    TopicHash,
    SowKey,
    SowExpiration,
    Timestamp,
    PreviousSize,
    TopicLen,
    AuthIdLen,
    KeyLen,
    CorrelationIdLen,
    ReplicationPathLen,
    Padding,
}

impl Field {
    /// Field name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Crc => "crc",
            Self::Size => "size",
            Self::Type => "type",
            Self::Flags => "flags",
            Self::MessageLen => "message_len",
            Self::MessageTypeHash => "message_type_hash",
            Self::LocalTxid => "local_txid",
            Self::PreviousLocalTxid => "previous_local_txid",
            Self::SourceTxid => "source_txid",
            Self::SourceNameHash => "source_name_hash",
            Self::ClientNameHash => "client_name_hash",
            Self::ClientSeq => "client_seq",
            Self::TopicHash => "topic_hash",
            Self::SowKey => "sow_key",
            Self::SowExpiration => "sow_expiration",
            Self::Timestamp => "timestamp",
            Self::PreviousSize => "previous_size",
            Self::TopicLen => "topic_len",
            Self::AuthIdLen => "auth_id_len",
            Self::KeyLen => "key_len",
            Self::CorrelationIdLen => "correlation_id_len",
            Self::ReplicationPathLen => "replication_path_len",
            Self::Padding => "padding",
        }
    }
}

use Field as F;
use Width::{U16, U32, U64};

const V1_FIELDS: &[(Field, Width)] = &[
    (F::Crc, U32),
    (F::Size, U32),
    (F::Type, U32),
    (F::MessageLen, U32),
    (F::MessageTypeHash, U64),
    (F::LocalTxid, U64),
    (F::SourceTxid, U64),
    (F::SourceNameHash, U64),
    (F::ClientNameHash, U64),
    (F::ClientSeq, U64),
    (F::TopicHash, U64),
    (F::SowKey, U64),
    (F::Timestamp, U64),
    (F::Flags, U32),
    (F::TopicLen, U32),
];

const V2_TO_4_FIELDS: &[(Field, Width)] = &[
    (F::Crc, U32),
    (F::Size, U32),
    (F::Type, U32),
    (F::MessageLen, U32),
    (F::MessageTypeHash, U64),
    (F::LocalTxid, U64),
    (F::SourceTxid, U64),
    (F::SourceNameHash, U64),
    (F::ClientNameHash, U64),
    (F::ClientSeq, U64),
    (F::TopicHash, U64),
    (F::SowKey, U64),
    (F::Timestamp, U64),
    (F::Flags, U32),
    (F::TopicLen, U32),
    (F::AuthIdLen, U32),
    (F::ReplicationPathLen, U32),
];

const V5_FIELDS: &[(Field, Width)] = &[
    (F::Crc, U32),
    (F::Size, U32),
    (F::Type, U32),
    (F::MessageLen, U32),
    (F::MessageTypeHash, U64),
    (F::LocalTxid, U64),
    (F::PreviousLocalTxid, U64),
    (F::SourceTxid, U64),
    (F::SourceNameHash, U64),
    (F::ClientNameHash, U64),
    (F::ClientSeq, U64),
    (F::TopicHash, U64),
    (F::SowExpiration, U64),
    (F::Timestamp, U64),
    (F::PreviousSize, U32),
    (F::TopicLen, U32),
    (F::AuthIdLen, U32),
    (F::ReplicationPathLen, U32),
];

const V6_FIELDS: &[(Field, Width)] = &[
    (F::Crc, U32),
    (F::Size, U32),
    (F::Type, U32),
    (F::MessageLen, U32),
    (F::MessageTypeHash, U64),
    (F::LocalTxid, U64),
    (F::PreviousLocalTxid, U64),
    (F::SourceTxid, U64),
    (F::SourceNameHash, U64),
    (F::ClientNameHash, U64),
    (F::ClientSeq, U64),
    (F::TopicHash, U64),
    (F::SowExpiration, U64),
    (F::Timestamp, U64),
    (F::PreviousSize, U32),
    (F::TopicLen, U32),
    (F::AuthIdLen, U32),
    (F::CorrelationIdLen, U32),
    (F::ReplicationPathLen, U32),
    (F::Padding, U32),
];

const V7_PLUS_FIELDS: &[(Field, Width)] = &[
    (F::Crc, U32),
    (F::Size, U32),
    (F::Type, U16),
    (F::Flags, U16),
    (F::MessageLen, U32),
    (F::MessageTypeHash, U64),
    (F::LocalTxid, U64),
    (F::PreviousLocalTxid, U64),
    (F::SourceTxid, U64),
    (F::SourceNameHash, U64),
    (F::ClientNameHash, U64),
    (F::ClientSeq, U64),
    (F::TopicHash, U64),
    (F::SowExpiration, U64),
    (F::Timestamp, U64),
    (F::PreviousSize, U32),
    (F::TopicLen, U32),
    (F::AuthIdLen, U32),
    (F::CorrelationIdLen, U32),
    (F::ReplicationPathLen, U32),
    (F::KeyLen, U32),
];

/// The fixed header layout family of a schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSchema {
    /// Version 1: topic and data only.
    V1,
    /// Versions 2 to 4: adds auth id and replication path.
    V2To4,
    /// Version 5: previous txid, expiration and previous size replace the
    /// SOW key and flags.
    V5,
    /// Version 6: adds correlation id.
    V6,
    /// Version 7 and later: 16-bit type and flags, adds key.
    V7Plus,
}

impl RecordSchema {
    /// Selects the layout for a schema version.
    ///
    /// Versions newer than [`LATEST_VERSION`] are read with the latest layout.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedVersion` for version 0.
    pub fn for_version(version: u32) -> CodecResult<Self> {
        match version {
            0 => Err(CodecError::UnsupportedVersion { version }),
            1 => Ok(Self::V1),
            2..=4 => Ok(Self::V2To4),
            5 => Ok(Self::V5),
            6 => Ok(Self::V6),
            _ => Ok(Self::V7Plus),
        }
    }

    /// Fields in on-disk order.
    #[must_use]
    pub const fn fields(self) -> &'static [(Field, Width)] {
        match self {
            Self::V1 => V1_FIELDS,
            Self::V2To4 => V2_TO_4_FIELDS,
            Self::V5 => V5_FIELDS,
            Self::V6 => V6_FIELDS,
            Self::V7Plus => V7_PLUS_FIELDS,
        }
    }

    /// Number of fixed fields.
    #[must_use]
    pub const fn field_count(self) -> usize {
        self.fields().len()
    }

    /// Size of the fixed header in bytes.
    #[must_use]
    pub const fn header_len(self) -> usize {
        let fields = self.fields();
        let mut total = 0;
        let mut i = 0;
        while i < fields.len() {
            total += fields[i].1.bytes();
            i += 1;
        }
        total
    }

    /// True when the layout has the given field.
    #[must_use]
    pub fn has(self, field: Field) -> bool {
        self.fields().iter().any(|(f, _)| *f == field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_sizes_and_field_counts() {
        let expected = [
            (RecordSchema::V1, 15, 96),
            (RecordSchema::V2To4, 17, 104),
            (RecordSchema::V5, 18, 112),
            (RecordSchema::V6, 20, 120),
            (RecordSchema::V7Plus, 21, 120),
        ];
        for (schema, count, len) in expected {
            assert_eq!(schema.field_count(), count, "{schema:?}");
            assert_eq!(schema.header_len(), len, "{schema:?}");
        }
    }

    #[test]
    fn version_selection() {
        assert_eq!(RecordSchema::for_version(1).unwrap(), RecordSchema::V1);
        assert_eq!(RecordSchema::for_version(3).unwrap(), RecordSchema::V2To4);
        assert_eq!(RecordSchema::for_version(4).unwrap(), RecordSchema::V2To4);
        assert_eq!(RecordSchema::for_version(5).unwrap(), RecordSchema::V5);
        assert_eq!(RecordSchema::for_version(6).unwrap(), RecordSchema::V6);
        assert_eq!(RecordSchema::for_version(8).unwrap(), RecordSchema::V7Plus);
        assert!(matches!(
            RecordSchema::for_version(0),
            Err(CodecError::UnsupportedVersion { version: 0 })
        ));
    }

    #[test]
    fn crc_and_size_lead_every_layout() {
        for schema in [
            RecordSchema::V1,
            RecordSchema::V2To4,
            RecordSchema::V5,
            RecordSchema::V6,
            RecordSchema::V7Plus,
        ] {
            assert_eq!(schema.fields()[0], (Field::Crc, Width::U32));
            assert_eq!(schema.fields()[1], (Field::Size, Width::U32));
        }
    }

    #[test]
    fn optional_fields() {
        assert!(!RecordSchema::V1.has(Field::AuthIdLen));
        assert!(RecordSchema::V2To4.has(Field::SowKey));
        assert!(!RecordSchema::V5.has(Field::Flags));
        assert!(RecordSchema::V6.has(Field::CorrelationIdLen));
        assert!(!RecordSchema::V6.has(Field::KeyLen));
        assert!(RecordSchema::V7Plus.has(Field::KeyLen));
    }

    #[test]
    fn alignment() {
        assert_eq!(align_up(1), 256);
        assert_eq!(align_up(256), 256);
        assert_eq!(align_up(257), 512);
        assert_eq!(align_up(120), 256);
    }
}
