//! Record encoding.

use crate::bytes::put_uint;
use crate::checksum::{Checksum, CRC32_SEED};
use crate::decoder::FixedHeader;
use crate::error::{CodecError, CodecResult};
use crate::record::Record;
use crate::schema::{align_up, Field, RecordSchema};

/// A record encoded for disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedRecord {
    /// The record bytes, zero padded to `size`.
    pub bytes: Vec<u8>,
    /// The aligned on-disk size written into the header.
    pub size: u32,
    /// The CRC32 written into the header.
    pub crc: u32,
    /// Length of fixed header plus trailer, before padding.
    pub packed_len: usize,
}

fn len_u32(field: Field, bytes: &[u8]) -> CodecResult<u32> {
    u32::try_from(bytes.len()).map_err(|_| CodecError::overflow(field.name(), bytes.len() as u64))
}

/// Returns `bytes` when the layout stores the field, otherwise nothing.
fn present(schema: RecordSchema, field: Field, bytes: &[u8]) -> &[u8] {
    if schema.has(field) {
        bytes
    } else {
        &[]
    }
}

/// Encodes a record in the layout of `version`.
///
/// The stored `crc` and `size` of the record are ignored: the size is the
/// packed length rounded up to 256 bytes and the CRC is computed over the
/// encoded bytes after the CRC field, excluding padding. Trailer fields the
/// target layout has no length field for are omitted. The key slot carries
/// the delete context when the record has one.
///
/// # Errors
///
/// Returns `RedactedPayload` if the record's data was redacted and
/// `FieldOverflow` if a value does not fit its on-disk width.
pub fn encode_record(
    version: u32,
    record: &Record,
    checksum: &dyn Checksum,
) -> CodecResult<EncodedRecord> {
    let schema = RecordSchema::for_version(version)?;
    let data = record.data.as_bytes().ok_or(CodecError::RedactedPayload)?;

    let topic = record.topic.as_slice();
    let auth_id = present(schema, Field::AuthIdLen, &record.auth_id);
    let key = present(schema, Field::KeyLen, record.key_slot());
    let correlation_id = present(schema, Field::CorrelationIdLen, &record.correlation_id);
    let replication_path = present(schema, Field::ReplicationPathLen, &record.replication_path);
    let trailer = [topic, auth_id, key, correlation_id, replication_path, data];

    let mut header = FixedHeader {
        crc: CRC32_SEED,
        size: 0,
        type_code: record.record_type.code(),
        flags: record.flags.0,
        message_len: len_u32(Field::MessageLen, data)?,
        message_type_hash: record.message_type_hash,
        local_txid: record.local_txid,
        previous_local_txid: record.previous_local_txid,
        source_txid: record.source_txid,
        source_name_hash: record.source_name_hash,
        client_name_hash: record.client_name_hash,
        client_seq: record.client_seq,
        topic_hash: record.topic_hash,
        sow_key: record.sow_key,
        sow_expiration: record.sow_expiration,
        timestamp: record.timestamp,
        previous_size: record.previous_size,
        topic_len: len_u32(Field::TopicLen, topic)?,
        auth_id_len: len_u32(Field::AuthIdLen, auth_id)?,
        key_len: len_u32(Field::KeyLen, key)?,
        correlation_id_len: len_u32(Field::CorrelationIdLen, correlation_id)?,
        replication_path_len: len_u32(Field::ReplicationPathLen, replication_path)?,
        padding: 0,
    };

    let packed_len = schema.header_len() + trailer.iter().map(|t| t.len()).sum::<usize>();
    let aligned = align_up(packed_len);
    header.size = u32::try_from(aligned).map_err(|_| CodecError::overflow("size", aligned as u64))?;

    let mut bytes = Vec::with_capacity(aligned);
    for &(field, width) in schema.fields() {
        let value = header.get(field);
        if value > width.max() {
            return Err(CodecError::overflow(field.name(), value));
        }
        put_uint(&mut bytes, width, value);
    }
    for part in trailer {
        bytes.extend_from_slice(part);
    }

    let crc = checksum.crc32(&bytes[4..], CRC32_SEED);
    bytes[..4].copy_from_slice(&crc.to_le_bytes());
    bytes.resize(aligned, 0);

    Ok(EncodedRecord {
        bytes,
        size: header.size,
        crc,
        packed_len,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::{default_checksum, SoftwareChecksum};
    use crate::decoder::{decode_record, record_crc};
    use crate::record::{Flags, Payload, RecordType};
    use crate::schema::{LATEST_VERSION, MIN_RECORD_SIZE};
    use proptest::prelude::*;

    fn sample() -> Record {
        Record {
            record_type: RecordType::Publish,
            flags: Flags::STRING_KEY,
            message_type_hash: 9_900_685_383_425_431_138,
            local_txid: 7,
            previous_local_txid: 6,
            source_txid: 3,
            source_name_hash: 0xfeed,
            client_name_hash: 0xbeef,
            client_seq: 12,
            topic_hash: 0xabc,
            sow_expiration: 1_700_000_000,
            timestamp: 66_000_000_000_000_000,
            previous_size: 256,
            topic: b"orders".to_vec(),
            auth_id: b"alice".to_vec(),
            key: b"order-1".to_vec(),
            correlation_id: b"corr".to_vec(),
            replication_path: b"east,west".to_vec(),
            data: Payload::Bytes(br#"{"id":1}"#.to_vec()),
            ..Record::default()
        }
    }

    #[test]
    fn latest_roundtrip_preserves_fields() {
        let record = sample();
        let encoded = encode_record(LATEST_VERSION, &record, &SoftwareChecksum).unwrap();
        assert_eq!(encoded.bytes.len(), 256);
        assert_eq!(encoded.size, 256);

        let decoded = decode_record(LATEST_VERSION, &encoded.bytes).unwrap();
        let expected = Record {
            crc: encoded.crc,
            size: encoded.size,
            ..record
        };
        assert_eq!(decoded, expected);
    }

    #[test]
    fn crc_matches_recomputation() {
        let encoded = encode_record(LATEST_VERSION, &sample(), default_checksum()).unwrap();
        let stored = u32::from_le_bytes(encoded.bytes[..4].try_into().unwrap());
        assert_eq!(stored, encoded.crc);
        assert_eq!(
            record_crc(LATEST_VERSION, &encoded.bytes, &SoftwareChecksum).unwrap(),
            encoded.crc
        );
    }

    #[test]
    fn declared_size_is_ignored() {
        let mut record = sample();
        record.size = 4096;
        record.data = Payload::Bytes(vec![b'x'; 300]);
        let encoded = encode_record(LATEST_VERSION, &record, &SoftwareChecksum).unwrap();
        assert_eq!(encoded.size, 512);
        assert_eq!(encoded.packed_len, 120 + 6 + 5 + 7 + 4 + 9 + 300);
    }

    #[test]
    fn older_layout_drops_missing_fields() {
        let encoded = encode_record(1, &sample(), &SoftwareChecksum).unwrap();
        let decoded = decode_record(1, &encoded.bytes).unwrap();
        assert_eq!(decoded.topic, b"orders");
        assert_eq!(decoded.data, sample().data);
        assert!(decoded.auth_id.is_empty());
        assert!(decoded.key.is_empty());
        assert_eq!(decoded.previous_local_txid, 0);
        assert_eq!(decoded.sow_expiration, 0);
    }

    #[test]
    fn delete_context_goes_to_key_slot() {
        let mut record = Record::new(RecordType::SowDeleteByQuery);
        record.delete_context = b"/status = 'done'".to_vec();
        let encoded = encode_record(LATEST_VERSION, &record, &SoftwareChecksum).unwrap();
        let decoded = decode_record(LATEST_VERSION, &encoded.bytes).unwrap();
        assert!(decoded.key.is_empty());
        assert_eq!(decoded.delete_context, b"/status = 'done'");
    }

    #[test]
    fn redacted_payload_is_rejected() {
        let mut record = sample();
        record.redact_data();
        assert_eq!(
            encode_record(LATEST_VERSION, &record, &SoftwareChecksum),
            Err(CodecError::RedactedPayload)
        );
    }

    #[test]
    fn wide_type_code_overflows_latest_layout() {
        let mut record = sample();
        record.record_type = RecordType::Unknown(70_000);
        assert!(matches!(
            encode_record(LATEST_VERSION, &record, &SoftwareChecksum),
            Err(CodecError::FieldOverflow { field: "type", .. })
        ));
        // Version 5 stores the type in 32 bits.
        assert!(encode_record(5, &record, &SoftwareChecksum).is_ok());
    }

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn u64_at(bytes: &[u8], offset: usize) -> u64 {
        u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap())
    }

    #[test]
    fn latest_layout_byte_offsets() {
        let mut record = sample();
        record.record_type = RecordType::Ack;
        let bytes = encode_record(LATEST_VERSION, &record, &SoftwareChecksum)
            .unwrap()
            .bytes;

        assert_eq!(u32_at(&bytes, 4), 256);
        assert_eq!(&bytes[8..10], &5u16.to_le_bytes());
        assert_eq!(&bytes[10..12], &(Flags::STRING_KEY.0 as u16).to_le_bytes());
        assert_eq!(u32_at(&bytes, 12), 8);
        assert_eq!(u64_at(&bytes, 16), 9_900_685_383_425_431_138);
        assert_eq!(u64_at(&bytes, 24), 7);
        assert_eq!(u64_at(&bytes, 32), 6);
        assert_eq!(u64_at(&bytes, 40), 3);
        assert_eq!(u64_at(&bytes, 48), 0xfeed);
        assert_eq!(u64_at(&bytes, 56), 0xbeef);
        assert_eq!(u64_at(&bytes, 64), 12);
        assert_eq!(u64_at(&bytes, 72), 0xabc);
        assert_eq!(u64_at(&bytes, 80), 1_700_000_000);
        assert_eq!(u64_at(&bytes, 88), 66_000_000_000_000_000);
        assert_eq!(u32_at(&bytes, 96), 256);
        assert_eq!(u32_at(&bytes, 100), 6);
        assert_eq!(u32_at(&bytes, 104), 5);
        assert_eq!(u32_at(&bytes, 108), 4);
        assert_eq!(u32_at(&bytes, 112), 9);
        assert_eq!(u32_at(&bytes, 116), 7);
        assert_eq!(&bytes[120..159], &b"ordersaliceorder-1correast,west{\"id\":1}"[..]);
        assert!(bytes[159..].iter().all(|&b| b == 0));
    }

    #[test]
    fn version_1_layout_byte_offsets() {
        let mut record = sample();
        record.sow_key = 99;
        let bytes = encode_record(1, &record, &SoftwareChecksum).unwrap().bytes;

        assert_eq!(u32_at(&bytes, 8), 0);
        assert_eq!(u64_at(&bytes, 24), 7);
        assert_eq!(u64_at(&bytes, 32), 3);
        assert_eq!(u64_at(&bytes, 72), 99);
        assert_eq!(u64_at(&bytes, 80), 66_000_000_000_000_000);
        assert_eq!(u32_at(&bytes, 88), Flags::STRING_KEY.0);
        assert_eq!(u32_at(&bytes, 92), 6);
        // Version 1 carries only topic and data.
        assert_eq!(&bytes[96..110], &b"orders{\"id\":1}"[..]);
        assert!(bytes[110..].iter().all(|&b| b == 0));
    }

    fn arb_bytes(max: usize) -> impl Strategy<Value = Vec<u8>> {
        proptest::collection::vec(any::<u8>(), 0..max)
    }

    proptest! {
        #[test]
        fn size_is_aligned_and_covers_contents(
            topic in arb_bytes(64),
            auth_id in arb_bytes(32),
            key in arb_bytes(32),
            data in arb_bytes(2048),
            version in 1u32..=8,
        ) {
            let record = Record {
                topic,
                auth_id,
                key,
                data: Payload::Bytes(data),
                ..Record::default()
            };
            let encoded = encode_record(version, &record, &SoftwareChecksum).unwrap();
            prop_assert_eq!(encoded.size as usize % MIN_RECORD_SIZE, 0);
            prop_assert_eq!(encoded.bytes.len(), encoded.size as usize);
            prop_assert!(encoded.packed_len <= encoded.bytes.len());

            let decoded = decode_record(version, &encoded.bytes).unwrap();
            prop_assert_eq!(decoded.topic, record.topic);
            prop_assert_eq!(decoded.data, record.data);
        }
    }
}
