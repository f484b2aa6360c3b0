//! Fuzz harnesses for the codec and the reader.
//!
//! Each target takes arbitrary bytes and must return without panicking;
//! malformed input surfaces as errors. The targets can be driven by
//! cargo-fuzz or by the seeded loops in the tests below.

use crate::fixtures::{sample_record, JournalBuilder};
use crate::generators::fit_to_version;
use txlog_codec::{decode_record, encode_record, parse_entitlements, SoftwareChecksum};
use txlog_core::{body_offset, JournalReader, ReaderConfig};
use txlog_storage::InMemoryBackend;

/// Reads every record of a journal held in memory, returning how many
/// were read before the scan ended or failed.
pub fn read_journal_bytes(bytes: Vec<u8>, config: ReaderConfig) -> usize {
    let backend = InMemoryBackend::with_data(bytes);
    let Ok(mut reader) = JournalReader::from_backend("fuzz", Box::new(backend), None, config)
    else {
        return 0;
    };
    let mut count = 0;
    for record in reader.records() {
        if record.is_err() {
            break;
        }
        count += 1;
    }
    count
}

/// Fuzz target for record decoding.
///
/// The first byte picks the schema version. A record that decodes must
/// survive re-encoding in the same version.
pub fn fuzz_record_decode(data: &[u8]) {
    let Some((&selector, bytes)) = data.split_first() else {
        return;
    };
    let version = u32::from(selector % 8) + 1;
    let Ok(record) = decode_record(version, bytes) else {
        return;
    };
    if let Ok(encoded) = encode_record(version, &record, &SoftwareChecksum) {
        let decoded = decode_record(version, &encoded.bytes).expect("re-encoded record decodes");
        assert_eq!(
            fit_to_version(&decoded, version),
            fit_to_version(&record, version),
            "re-encoding changed a version {version} record"
        );
    }
}

/// Fuzz target for a journal body of arbitrary bytes.
///
/// The first byte picks the schema version; the rest becomes the body.
pub fn fuzz_journal_body(data: &[u8]) {
    let Some((&selector, body)) = data.split_first() else {
        return;
    };
    let version = u32::from(selector % 8) + 1;
    let mut bytes = JournalBuilder::new(version).build();
    debug_assert_eq!(bytes.len() as u64, body_offset(version));
    bytes.extend_from_slice(body);
    read_journal_bytes(bytes, ReaderConfig::default());
}

/// Fuzz target for corrupted journals.
///
/// `data` is read as `(position, value)` triples: two bytes of position
/// within the body and one replacement byte, applied to a valid journal.
pub fn fuzz_journal_corruption(data: &[u8]) {
    let mut bytes = JournalBuilder::new(8)
        .records((1..=4).map(sample_record))
        .terminated(true)
        .build();
    let body = body_offset(8) as usize;
    let body_len = bytes.len() - body;

    for chunk in data.chunks_exact(3) {
        let position = usize::from(u16::from_le_bytes([chunk[0], chunk[1]])) % body_len;
        bytes[body + position] = chunk[2];
    }

    read_journal_bytes(bytes.clone(), ReaderConfig::default());
    read_journal_bytes(bytes, ReaderConfig::new().verify_checksums(true));
}

/// Fuzz target for the entitlement sub-format.
pub fn fuzz_entitlements(data: &[u8]) {
    let _ = parse_entitlements(data);
}
