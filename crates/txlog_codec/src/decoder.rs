//! Record decoding.

use crate::bytes::ByteReader;
use crate::checksum::{Checksum, CRC32_SEED};
use crate::error::{CodecError, CodecResult};
use crate::record::{Flags, Payload, Record, RecordType};
use crate::schema::{Field, RecordSchema};

/// The fixed header fields of a record, widened to a common shape.
///
/// Fields the version does not have are zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct FixedHeader {
    pub crc: u32,
    pub size: u32,
    pub type_code: u32,
    pub flags: u32,
    pub message_len: u32,
    pub message_type_hash: u64,
    pub local_txid: u64,
    pub previous_local_txid: u64,
    pub source_txid: u64,
    pub source_name_hash: u64,
    pub client_name_hash: u64,
    pub client_seq: u64,
    pub topic_hash: u64,
    pub sow_key: u64,
    pub sow_expiration: u64,
    pub timestamp: u64,
    pub previous_size: u32,
    pub topic_len: u32,
    pub auth_id_len: u32,
    pub key_len: u32,
    pub correlation_id_len: u32,
    pub replication_path_len: u32,
    pub padding: u32,
}

impl FixedHeader {
    /// Returns a field widened to `u64`.
    #[must_use]
    pub fn get(&self, field: Field) -> u64 {
        match field {
            Field::Crc => self.crc.into(),
            Field::Size => self.size.into(),
            Field::Type => self.type_code.into(),
            Field::Flags => self.flags.into(),
            Field::MessageLen => self.message_len.into(),
            Field::MessageTypeHash => self.message_type_hash,
            Field::LocalTxid => self.local_txid,
            Field::PreviousLocalTxid => self.previous_local_txid,
            Field::SourceTxid => self.source_txid,
            Field::SourceNameHash => self.source_name_hash,
            Field::ClientNameHash => self.client_name_hash,
            Field::ClientSeq => self.client_seq,
            Field::TopicHash => self.topic_hash,
            Field::SowKey => self.sow_key,
            Field::SowExpiration => self.sow_expiration,
            Field::Timestamp => self.timestamp,
            Field::PreviousSize => self.previous_size.into(),
            Field::TopicLen => self.topic_len.into(),
            Field::AuthIdLen => self.auth_id_len.into(),
            Field::KeyLen => self.key_len.into(),
            Field::CorrelationIdLen => self.correlation_id_len.into(),
            Field::ReplicationPathLen => self.replication_path_len.into(),
            Field::Padding => self.padding.into(),
        }
    }

    /// Stores a field. 32-bit fields keep the low 32 bits of `value`.
    pub fn set(&mut self, field: Field, value: u64) {
        let narrow = value as u32;
        match field {
            Field::Crc => self.crc = narrow,
            Field::Size => self.size = narrow,
            Field::Type => self.type_code = narrow,
            Field::Flags => self.flags = narrow,
            Field::MessageLen => self.message_len = narrow,
            Field::MessageTypeHash => self.message_type_hash = value,
            Field::LocalTxid => self.local_txid = value,
            Field::PreviousLocalTxid => self.previous_local_txid = value,
            Field::SourceTxid => self.source_txid = value,
            Field::SourceNameHash => self.source_name_hash = value,
            Field::ClientNameHash => self.client_name_hash = value,
            Field::ClientSeq => self.client_seq = value,
            Field::TopicHash => self.topic_hash = value,
            Field::SowKey => self.sow_key = value,
            Field::SowExpiration => self.sow_expiration = value,
            Field::Timestamp => self.timestamp = value,
            Field::PreviousSize => self.previous_size = narrow,
            Field::TopicLen => self.topic_len = narrow,
            Field::AuthIdLen => self.auth_id_len = narrow,
            Field::KeyLen => self.key_len = narrow,
            Field::CorrelationIdLen => self.correlation_id_len = narrow,
            Field::ReplicationPathLen => self.replication_path_len = narrow,
            Field::Padding => self.padding = narrow,
        }
    }

    /// True for the zero crc / zero size end-of-stream marker.
    #[must_use]
    pub const fn is_end_of_stream(&self) -> bool {
        self.crc == 0 && self.size == 0
    }

    /// Total length of the variable-length trailer fields.
    #[must_use]
    pub fn trailer_len(&self) -> u64 {
        [
            self.topic_len,
            self.auth_id_len,
            self.key_len,
            self.correlation_id_len,
            self.replication_path_len,
            self.message_len,
        ]
        .iter()
        .map(|&len| u64::from(len))
        .sum()
    }

    /// Length of the fixed header plus trailer, excluding alignment padding.
    #[must_use]
    pub fn packed_len(&self, schema: RecordSchema) -> u64 {
        schema.header_len() as u64 + self.trailer_len()
    }
}

/// Decodes the fixed header at the start of `bytes`.
///
/// Only the fixed header is read; `bytes` may be just the first 256-byte
/// block of a record.
///
/// # Errors
///
/// Returns `UnsupportedVersion` for an unknown version and `UnexpectedEof`
/// when `bytes` is shorter than the fixed header.
pub fn decode_fixed_header(version: u32, bytes: &[u8]) -> CodecResult<FixedHeader> {
    let schema = RecordSchema::for_version(version)?;
    let mut reader = ByteReader::new(bytes);
    let mut header = FixedHeader::default();
    for &(field, width) in schema.fields() {
        header.set(field, reader.read_uint(width)?);
    }
    Ok(header)
}

/// Decodes a complete record.
///
/// `bytes` holds the whole on-disk record: fixed header, trailer fields and
/// any alignment padding. Trailer fields are sliced in their fixed order
/// using the header's length fields.
///
/// # Errors
///
/// Returns `MalformedRecord` if `bytes` is shorter than the fixed header or
/// the declared lengths do not fit in `bytes`.
pub fn decode_record(version: u32, bytes: &[u8]) -> CodecResult<Record> {
    let schema = RecordSchema::for_version(version)?;
    if bytes.len() < schema.header_len() {
        return Err(CodecError::malformed(
            version,
            format!(
                "record of {} bytes is shorter than the {}-byte fixed header",
                bytes.len(),
                schema.header_len()
            ),
        ));
    }
    let header = decode_fixed_header(version, bytes)?;

    let packed = header.packed_len(schema);
    if packed > bytes.len() as u64 {
        return Err(CodecError::malformed(
            version,
            format!(
                "{} fixed fields and trailer need {packed} bytes, record holds {}",
                schema.field_count(),
                bytes.len()
            ),
        ));
    }

    let mut reader = ByteReader::new(&bytes[schema.header_len()..]);
    let topic = reader.read_bytes(header.topic_len as usize)?;
    let auth_id = reader.read_bytes(header.auth_id_len as usize)?;
    let key = reader.read_bytes(header.key_len as usize)?;
    let correlation_id = reader.read_bytes(header.correlation_id_len as usize)?;
    let replication_path = reader.read_bytes(header.replication_path_len as usize)?;
    let data = reader.read_bytes(header.message_len as usize)?;

    let record_type = RecordType::from_code(header.type_code);
    let (key, delete_context) = if record_type == RecordType::SowDeleteByQuery {
        (Vec::new(), key.to_vec())
    } else {
        (key.to_vec(), Vec::new())
    };

    Ok(Record {
        crc: header.crc,
        size: header.size,
        record_type,
        flags: Flags(header.flags),
        message_type_hash: header.message_type_hash,
        local_txid: header.local_txid,
        previous_local_txid: header.previous_local_txid,
        source_txid: header.source_txid,
        source_name_hash: header.source_name_hash,
        client_name_hash: header.client_name_hash,
        client_seq: header.client_seq,
        topic_hash: header.topic_hash,
        sow_key: header.sow_key,
        sow_expiration: header.sow_expiration,
        timestamp: header.timestamp,
        previous_size: header.previous_size,
        topic: topic.to_vec(),
        auth_id: auth_id.to_vec(),
        key,
        delete_context,
        correlation_id: correlation_id.to_vec(),
        replication_path: replication_path.to_vec(),
        data: Payload::Bytes(data.to_vec()),
        offset: 0,
        entry: 0,
    })
}

/// Recomputes the CRC32 of an encoded record.
///
/// The checksum covers every byte after the CRC field up to the end of the
/// last trailer field.
///
/// # Errors
///
/// Returns `MalformedRecord` if the declared lengths do not fit in `bytes`.
pub fn record_crc(version: u32, bytes: &[u8], checksum: &dyn Checksum) -> CodecResult<u32> {
    let schema = RecordSchema::for_version(version)?;
    let header = decode_fixed_header(version, bytes)?;
    let packed = header.packed_len(schema);
    if packed > bytes.len() as u64 {
        return Err(CodecError::malformed(
            version,
            format!("checksum span of {packed} bytes exceeds record of {}", bytes.len()),
        ));
    }
    Ok(checksum.crc32(&bytes[4..packed as usize], CRC32_SEED))
}
