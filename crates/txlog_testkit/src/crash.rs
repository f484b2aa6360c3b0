//! Crash testing for journal writers.
//!
//! A writer that dies part way leaves a journal readers must still make
//! sense of: extents that were never finalized, a record cut inside its
//! first block, or a multi-block record cut after its first block.
//!
//! ## Test Strategy
//!
//! 1. **Writer dropped before close** - records readable, journal active
//! 2. **Crash inside a first block** - the scan ends before the torn record
//! 3. **Crash inside a later block** - the torn record reports truncation
//! 4. **Sync failure on close** - everything before the sync is readable
//!
//! ## Usage
//!
//! ```rust,ignore
//! use txlog_testkit::crash::CrashRecoveryHarness;
//!
//! let mut harness = CrashRecoveryHarness::new();
//! harness.run_all_tests();
//! assert!(harness.all_passed());
//! ```

use crate::fixtures::{sample_record, TestDir};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use txlog_codec::Payload;
use txlog_core::{
    CoreError, CoreResult, Extents, JournalReader, JournalWriter, WriterConfig, SEGMENT_LEN,
};
use txlog_storage::{FileBackend, StorageBackend, StorageError, StorageResult};

/// Result of a crash scenario.
#[derive(Debug, Clone)]
pub struct CrashRecoveryResult {
    /// Whether the scenario behaved as expected.
    pub passed: bool,
    /// Description of the scenario.
    pub description: String,
    /// Records expected to be readable.
    pub expected_records: usize,
    /// Records actually read.
    pub actual_records: usize,
    /// Any error message.
    pub error: Option<String>,
}

impl CrashRecoveryResult {
    /// Creates a passing result.
    pub fn pass(description: &str, records: usize) -> Self {
        Self {
            passed: true,
            description: description.to_string(),
            expected_records: records,
            actual_records: records,
            error: None,
        }
    }

    /// Creates a failing result.
    pub fn fail(description: &str, expected: usize, actual: usize, error: &str) -> Self {
        Self {
            passed: false,
            description: description.to_string(),
            expected_records: expected,
            actual_records: actual,
            error: Some(error.to_string()),
        }
    }
}

fn simulated(message: &str) -> StorageError {
    StorageError::Io(io::Error::new(io::ErrorKind::Other, message.to_string()))
}

/// A storage backend that loses every byte past a file offset.
///
/// A write crossing the limit persists the part before it and fails.
pub struct CrashableBackend {
    inner: Box<dyn StorageBackend>,
    limit: AtomicU64,
    crashed: AtomicBool,
    fail_on_sync: AtomicBool,
}

impl CrashableBackend {
    /// Creates a backend wrapping `inner` with no limit.
    pub fn new(inner: Box<dyn StorageBackend>) -> Self {
        Self {
            inner,
            limit: AtomicU64::new(u64::MAX),
            crashed: AtomicBool::new(false),
            fail_on_sync: AtomicBool::new(false),
        }
    }

    /// Drops every byte at or past `offset`.
    pub fn crash_at(&self, offset: u64) {
        self.limit.store(offset, Ordering::SeqCst);
    }

    /// Sets whether sync and flush fail.
    pub fn set_fail_on_sync(&self, fail: bool) {
        self.fail_on_sync.store(fail, Ordering::SeqCst);
    }

    /// Returns whether a write or sync has failed.
    pub fn has_crashed(&self) -> bool {
        self.crashed.load(Ordering::SeqCst)
    }

    fn check_sync(&self, what: &str) -> StorageResult<()> {
        if self.fail_on_sync.load(Ordering::SeqCst) {
            self.crashed.store(true, Ordering::SeqCst);
            return Err(simulated(&format!("simulated crash during {what}")));
        }
        Ok(())
    }
}

impl StorageBackend for CrashableBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn write_at(&mut self, offset: u64, data: &[u8]) -> StorageResult<()> {
        let limit = self.limit.load(Ordering::SeqCst);
        let end = offset + data.len() as u64;
        if end <= limit {
            return self.inner.write_at(offset, data);
        }
        self.crashed.store(true, Ordering::SeqCst);
        if offset < limit {
            let kept = (limit - offset) as usize;
            self.inner.write_at(offset, &data[..kept])?;
        }
        Err(simulated("simulated crash during write"))
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.check_sync("flush")?;
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.check_sync("sync")?;
        self.inner.sync()
    }

    fn release(&mut self) -> StorageResult<()> {
        self.inner.release()
    }
}

/// Runs crash scenarios against journals in a temporary directory.
pub struct CrashRecoveryHarness {
    dir: TestDir,
    /// Results of the scenarios run so far.
    pub results: Vec<CrashRecoveryResult>,
}

impl CrashRecoveryHarness {
    /// Creates a harness with a fresh temporary directory.
    pub fn new() -> Self {
        Self {
            dir: TestDir::new(),
            results: Vec::new(),
        }
    }

    /// Directory holding the scenario journals.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn crashable_writer(
        &self,
        name: &str,
        configure: impl FnOnce(&CrashableBackend),
    ) -> CoreResult<(PathBuf, JournalWriter)> {
        let path = self.dir.file(name);
        let backend = CrashableBackend::new(Box::new(FileBackend::create(&path)?));
        configure(&backend);
        let writer = JournalWriter::create_with(
            path.display().to_string(),
            Box::new(backend),
            1,
            Extents::default(),
            WriterConfig::default(),
        )?;
        Ok((path, writer))
    }

    fn finish(
        &mut self,
        description: &str,
        expected: usize,
        outcome: CoreResult<CrashRecoveryResult>,
    ) -> CrashRecoveryResult {
        let result = outcome.unwrap_or_else(|err| {
            CrashRecoveryResult::fail(description, expected, 0, &err.to_string())
        });
        self.results.push(result.clone());
        result
    }

    /// A writer dropped without close leaves readable records and a journal
    /// that reads as active.
    pub fn test_dropped_writer(&mut self) -> CrashRecoveryResult {
        let description = "Records survive a writer dropped before close";
        let outcome = (|| -> CoreResult<CrashRecoveryResult> {
            let (path, mut writer) = self.crashable_writer("dropped.journal", |_| {})?;
            for txid in 1..=3 {
                writer.write(sample_record(txid))?;
            }
            drop(writer);

            let mut reader = JournalReader::open(&path)?;
            let records = reader.records().collect::<CoreResult<Vec<_>>>()?;
            let active = reader.is_active();
            Ok(if records.len() == 3 && active {
                CrashRecoveryResult::pass(description, 3)
            } else {
                CrashRecoveryResult::fail(
                    description,
                    3,
                    records.len(),
                    &format!("active = {active}"),
                )
            })
        })();
        self.finish(description, 3, outcome)
    }

    /// A crash inside the first block of a record ends the scan before it.
    pub fn test_crash_in_first_block(&mut self) -> CrashRecoveryResult {
        let description = "Scan ends before a record torn in its first block";
        let outcome = (|| -> CoreResult<CrashRecoveryResult> {
            let (path, mut writer) = self.crashable_writer("first_block.journal", |backend| {
                backend.crash_at(SEGMENT_LEN + 256 + 100);
            })?;
            writer.write(sample_record(1))?;
            let torn = writer.write(sample_record(2));
            drop(writer);
            if torn.is_ok() {
                return Ok(CrashRecoveryResult::fail(
                    description,
                    1,
                    2,
                    "write past the crash point succeeded",
                ));
            }

            let mut reader = JournalReader::open(&path)?;
            let records = reader.records().collect::<CoreResult<Vec<_>>>()?;
            Ok(if records.len() == 1 {
                CrashRecoveryResult::pass(description, 1)
            } else {
                CrashRecoveryResult::fail(description, 1, records.len(), "unexpected records")
            })
        })();
        self.finish(description, 1, outcome)
    }

    /// A crash after the first block of a multi-block record reports the
    /// record as truncated.
    pub fn test_crash_in_later_block(&mut self) -> CrashRecoveryResult {
        let description = "Record torn after its first block is truncated";
        let outcome = (|| -> CoreResult<CrashRecoveryResult> {
            let (path, mut writer) = self.crashable_writer("later_block.journal", |backend| {
                backend.crash_at(SEGMENT_LEN + 256 + 512);
            })?;
            writer.write(sample_record(1))?;
            let mut large = sample_record(2);
            large.data = Payload::Bytes(vec![b'x'; 800]);
            let _ = writer.write(large);
            drop(writer);

            let mut reader = JournalReader::open(&path)?;
            let results: Vec<CoreResult<_>> = reader.records().collect();
            let readable = results.iter().filter(|r| r.is_ok()).count();
            let truncated = matches!(
                results.last(),
                Some(Err(CoreError::Truncated { declared: 1024, available: 512, .. }))
            );
            Ok(if readable == 1 && truncated {
                CrashRecoveryResult::pass(description, 1)
            } else {
                CrashRecoveryResult::fail(description, 1, readable, "no truncation reported")
            })
        })();
        self.finish(description, 1, outcome)
    }

    /// A failed sync on close still leaves the padded, finalized file.
    pub fn test_failed_sync(&mut self) -> CrashRecoveryResult {
        let description = "Records and extents survive a failed sync";
        let outcome = (|| -> CoreResult<CrashRecoveryResult> {
            let (path, mut writer) = self.crashable_writer("sync.journal", |backend| {
                backend.set_fail_on_sync(true);
            })?;
            for txid in 1..=3 {
                writer.write(sample_record(txid))?;
            }
            if writer.close().is_ok() {
                return Ok(CrashRecoveryResult::fail(
                    description,
                    3,
                    3,
                    "close succeeded despite failing sync",
                ));
            }

            let mut reader = JournalReader::open(&path)?;
            let records = reader.records().collect::<CoreResult<Vec<_>>>()?;
            let extents = reader.extents();
            Ok(if records.len() == 4 && (extents.first, extents.last) == (1, 3) {
                CrashRecoveryResult::pass(description, 4)
            } else {
                CrashRecoveryResult::fail(
                    description,
                    4,
                    records.len(),
                    &format!("extents {}..{}", extents.first, extents.last),
                )
            })
        })();
        self.finish(description, 4, outcome)
    }

    /// Runs every scenario.
    pub fn run_all_tests(&mut self) -> Vec<CrashRecoveryResult> {
        self.results.clear();

        self.test_dropped_writer();
        self.test_crash_in_first_block();
        self.test_crash_in_later_block();
        self.test_failed_sync();

        self.results.clone()
    }

    /// Returns a summary of the results.
    pub fn summary(&self) -> String {
        let passed = self.results.iter().filter(|r| r.passed).count();
        let total = self.results.len();

        let mut summary = format!(
            "\n=== Crash Test Summary ===\n\
             Passed: {}/{}\n\n",
            passed, total
        );

        for result in &self.results {
            let status = if result.passed { "✓" } else { "✗" };
            summary.push_str(&format!(
                "{} {}\n  Expected: {} records, Actual: {} records\n",
                status, result.description, result.expected_records, result.actual_records
            ));
            if let Some(ref error) = result.error {
                summary.push_str(&format!("  Error: {}\n", error));
            }
        }

        summary
    }

    /// Returns whether every scenario passed.
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }
}

impl Default for CrashRecoveryHarness {
    fn default() -> Self {
        Self::new()
    }
}
