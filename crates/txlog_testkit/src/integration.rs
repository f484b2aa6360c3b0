//! Cross-crate integration test helpers.
//!
//! These drive journals through the reader, the writer and the upgrade
//! path together and compare what comes out against what went in.

use crate::fixtures::{JournalBuilder, TestDir};
use crate::generators::fit_to_version;
use std::path::Path;
use txlog_codec::{Record, RecordType, LATEST_VERSION};
use txlog_core::{upgrade, CoreResult, Extents, JournalReader, JournalWriter, SEGMENT_LEN};

/// Everything a reader reports about a journal.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalSnapshot {
    /// Schema version.
    pub version: u32,
    /// Version label.
    pub label: String,
    /// Instance id.
    pub instance_id: u32,
    /// Declared extents.
    pub extents: Extents,
    /// Records other than noops.
    pub records: Vec<Record>,
    /// Noop records.
    pub noops: usize,
    /// True when records run past the declared extents.
    pub active: bool,
}

/// Reads a journal to its end.
///
/// # Errors
///
/// Returns the first error the reader reports.
pub fn snapshot(path: impl AsRef<Path>) -> CoreResult<JournalSnapshot> {
    let mut reader = JournalReader::open(path)?;
    let mut records = Vec::new();
    let mut noops = 0;
    for record in reader.records() {
        let record = record?;
        if record.record_type == RecordType::Noop {
            noops += 1;
        } else {
            records.push(record);
        }
    }
    let snapshot = JournalSnapshot {
        version: reader.version(),
        label: reader.version_label(),
        instance_id: reader.instance_id(),
        extents: reader.extents(),
        records,
        noops,
        active: reader.is_active(),
    };
    reader.close()?;
    Ok(snapshot)
}

/// Reads the records of a journal, skipping noops.
///
/// # Panics
///
/// Panics if the journal cannot be read.
pub fn read_records(path: impl AsRef<Path>) -> Vec<Record> {
    snapshot(path).expect("Failed to read journal").records
}

/// Records as they read back after an upgrade from `version`.
pub fn expected_after_upgrade(records: &[Record], version: u32) -> Vec<Record> {
    records
        .iter()
        .map(|record| fit_to_version(&fit_to_version(record, version), LATEST_VERSION))
        .collect()
}

/// Writes `records` with the latest writer and closes the file.
///
/// # Panics
///
/// Panics if a write fails.
pub fn write_latest(path: impl AsRef<Path>, extents: Extents, records: &[Record]) {
    let mut writer =
        JournalWriter::create(path.as_ref(), 1, extents).expect("Failed to create journal");
    for record in records {
        writer.write(record.clone()).expect("Failed to write record");
    }
    writer.close().expect("Failed to close journal");
}

/// Builds a journal of `version`, upgrades it and checks the result.
///
/// The upgraded file must carry the latest label, the same instance id and
/// extents, a length on a segment boundary, and the records of the source
/// minus the fields its version could not hold.
///
/// # Panics
///
/// Panics on any mismatch.
pub fn assert_upgrade_preserves(version: u32, records: &[Record]) {
    let dir = TestDir::new();
    let builder = JournalBuilder::new(version)
        .instance_id(42)
        .records(records.iter().cloned());
    let old = builder.write_to(dir.file(&format!("v{version}.journal")));
    let new = dir.file("upgraded.journal");

    let report = upgrade(&old.display().to_string(), &new).expect("Failed to upgrade");
    assert_eq!(report.source_version, version);

    let upgraded = snapshot(&new).expect("Failed to read upgraded journal");
    assert_eq!(upgraded.version, LATEST_VERSION);
    assert_eq!(upgraded.label, format!("amps::txlog/v{LATEST_VERSION}"));
    assert_eq!(upgraded.instance_id, 42);
    let declared = builder.declared_extents();
    assert_eq!(
        (upgraded.extents.first, upgraded.extents.last),
        (declared.first, declared.last)
    );

    let size = std::fs::metadata(&new).expect("Failed to stat").len();
    assert_eq!(size % SEGMENT_LEN, 0, "upgraded length {size}");

    let actual: Vec<Record> = upgraded
        .records
        .iter()
        .map(|record| fit_to_version(record, LATEST_VERSION))
        .collect();
    assert_eq!(actual, expected_after_upgrade(records, version));
}
