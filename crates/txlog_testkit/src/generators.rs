//! Property-based test generators using proptest.
//!
//! Generated records only hold values every schema version can store;
//! [`fit_to_version`] then drops what a given version has no room for.

use proptest::prelude::*;
use txlog_codec::{Field, Flags, MessageType, Payload, Record, RecordSchema, RecordType};

/// Strategy for record types, mostly known codes.
pub fn record_type_strategy() -> impl Strategy<Value = RecordType> {
    prop_oneof![
        9 => (0u32..=8).prop_map(RecordType::from_code),
        1 => (10u32..1000).prop_map(RecordType::from_code),
    ]
}

/// Strategy for flag values, including values outside the label table.
pub fn flags_strategy() -> impl Strategy<Value = Flags> {
    prop_oneof![
        Just(Flags::NONE),
        Just(Flags::COMPRESSED),
        Just(Flags::STRING_KEY),
        Just(Flags::COMPRESSED_STRING_KEY),
        Just(Flags::CANCEL),
        Just(Flags::REACK),
        (0u32..64).prop_map(Flags),
    ]
}

/// Strategy for message type hashes, mostly known ones.
pub fn message_type_hash_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        4 => prop::sample::select(vec![
            MessageType::Json.hash(),
            MessageType::Fix.hash(),
            MessageType::Binary.hash(),
            MessageType::Protobuf.hash(),
        ]),
        1 => any::<u64>(),
    ]
}

/// Strategy for short byte strings.
pub fn bytes_strategy(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Strategy for records.
///
/// Sizes, CRCs, offsets and previous sizes are left at zero; writers fill
/// them in.
pub fn record_strategy() -> impl Strategy<Value = Record> {
    let ids = (
        any::<u64>(),
        any::<u64>(),
        any::<u64>(),
        any::<u64>(),
        any::<u64>(),
        any::<u64>(),
        any::<u64>(),
        any::<u64>(),
        any::<u64>(),
        any::<u64>(),
    );
    let trailer = (
        bytes_strategy(32),
        bytes_strategy(16),
        bytes_strategy(16),
        bytes_strategy(16),
        bytes_strategy(24),
        bytes_strategy(600),
    );
    (
        record_type_strategy(),
        flags_strategy(),
        message_type_hash_strategy(),
        ids,
        trailer,
    )
        .prop_map(|(record_type, flags, message_type_hash, ids, trailer)| {
            let (
                local,
                previous,
                source,
                source_hash,
                client,
                seq,
                topic_hash,
                sow_key,
                expiration,
                timestamp,
            ) = ids;
            let (topic, auth_id, key, correlation_id, replication_path, data) = trailer;
            let mut record = Record::new(record_type);
            record.flags = flags;
            record.message_type_hash = message_type_hash;
            record.local_txid = local;
            record.previous_local_txid = previous;
            record.source_txid = source;
            record.source_name_hash = source_hash;
            record.client_name_hash = client;
            record.client_seq = seq;
            record.topic_hash = topic_hash;
            record.sow_key = sow_key;
            record.sow_expiration = expiration;
            record.timestamp = timestamp;
            record.topic = topic;
            record.auth_id = auth_id;
            record.correlation_id = correlation_id;
            record.replication_path = replication_path;
            record.data = Payload::Bytes(data);
            if record_type == RecordType::SowDeleteByQuery {
                record.delete_context = key;
            } else {
                record.key = key;
            }
            record
        })
}

/// Strategy for a sequence of local txids, in any order.
pub fn txid_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(1u64..1_000_000, 1..=max_len)
}

/// Returns `record` as a reader of `version` would see it after a write.
///
/// Fields the layout has no slot for become zero or empty. Sizes, CRCs,
/// previous sizes and positions are cleared so records from different
/// files compare by content.
pub fn fit_to_version(record: &Record, version: u32) -> Record {
    let Ok(schema) = RecordSchema::for_version(version) else {
        return record.clone();
    };
    let mut fitted = record.clone();
    fitted.crc = 0;
    fitted.size = 0;
    fitted.previous_size = 0;
    fitted.offset = 0;
    fitted.entry = 0;

    if !schema.has(Field::Flags) {
        fitted.flags = Flags::NONE;
    }
    if !schema.has(Field::PreviousLocalTxid) {
        fitted.previous_local_txid = 0;
    }
    if !schema.has(Field::SowKey) {
        fitted.sow_key = 0;
    }
    if !schema.has(Field::SowExpiration) {
        fitted.sow_expiration = 0;
    }
    if !schema.has(Field::AuthIdLen) {
        fitted.auth_id.clear();
    }
    if !schema.has(Field::KeyLen) {
        fitted.key.clear();
        fitted.delete_context.clear();
    }
    if !schema.has(Field::CorrelationIdLen) {
        fitted.correlation_id.clear();
    }
    if !schema.has(Field::ReplicationPathLen) {
        fitted.replication_path.clear();
    }
    fitted
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txlog_codec::{decode_record, encode_record, SoftwareChecksum, LATEST_VERSION};

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn records_fit_the_latest_layout(record in record_strategy()) {
            let encoded = encode_record(LATEST_VERSION, &record, &SoftwareChecksum);
            prop_assert!(encoded.is_ok());
        }

        #[test]
        fn fitted_records_decode_as_fitted(record in record_strategy(), version in 1u32..=8) {
            let encoded = encode_record(version, &record, &SoftwareChecksum).unwrap();
            let decoded = decode_record(version, &encoded.bytes).unwrap();
            prop_assert_eq!(fit_to_version(&decoded, version), fit_to_version(&record, version));
        }

        #[test]
        fn txid_sequences_are_positive(txids in txid_sequence_strategy(16)) {
            prop_assert!(!txids.is_empty());
            prop_assert!(txids.iter().all(|&txid| txid > 0));
        }
    }
}
