//! Version upgrade of journal files.
//!
//! An upgrade reads a journal of any version and rewrites every record,
//! noops included, in the latest version. Sizes, CRCs and previous sizes are
//! recomputed by the writer; fields the old layout lacked take their
//! defaults. The instance id and declared extents carry over.
//!
//! Compressed sources are read through gzip. A compressed target is written
//! uncompressed next to it first, then compressed, and the intermediate file
//! is removed. A failed upgrade removes whatever it had written.

use crate::compression::{compress_file, is_compressed_path, remove_file, uncompressed_path};
use crate::error::{CoreError, CoreResult};
use crate::fileset::Fileset;
use crate::header::VERSION_LABEL;
use crate::journal::{JournalReader, JournalWriter};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Outcome of an upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeReport {
    /// The file that was read.
    pub source: PathBuf,
    /// The file that was written.
    pub target: PathBuf,
    /// Schema version of the source.
    pub source_version: u32,
    /// Records copied, noops included.
    pub records: u64,
}

/// Returns the version label of a journal.
///
/// # Errors
///
/// Returns an error if the journal cannot be opened.
pub fn version(path: impl AsRef<Path>) -> CoreResult<String> {
    let reader = JournalReader::open(path)?;
    let label = reader.version_label();
    reader.close()?;
    Ok(label)
}

/// True when a journal already carries the latest version label.
///
/// # Errors
///
/// Returns an error if the journal cannot be opened.
pub fn is_up_to_date(path: impl AsRef<Path>) -> CoreResult<bool> {
    Ok(version(path)? == VERSION_LABEL)
}

/// Copies every remaining record of `reader` into `writer` and closes it.
///
/// Returns the number of records copied.
///
/// # Errors
///
/// Returns the first read or write error; the writer is dropped unclosed.
pub fn transcode(reader: &mut JournalReader, mut writer: JournalWriter) -> CoreResult<u64> {
    let mut copied = 0;
    for record in reader.records() {
        writer.write(record?)?;
        copied += 1;
    }
    writer.close()?;
    Ok(copied)
}

/// Resolves links and `..` segments of a path that may not exist yet.
fn resolve(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return path.to_path_buf();
    };
    let parent = if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    };
    fs::canonicalize(parent).map_or_else(|_| path.to_path_buf(), |dir| dir.join(name))
}

/// Removes a partially written output, keeping the original error.
fn discard(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %err, "failed to remove partial upgrade output");
        }
    }
}

/// Upgrades the journal matching `old_pattern` into `new_path`.
///
/// `old_pattern` is a glob that must match exactly one file.
///
/// # Errors
///
/// Returns `NoMatchingFiles` or `InvalidArgument` when the pattern does not
/// match exactly one file, `InvalidArgument` when source and target are the
/// same file, and any read, write or compression error.
pub fn upgrade(old_pattern: &str, new_path: impl AsRef<Path>) -> CoreResult<UpgradeReport> {
    let source = Fileset::single(old_pattern)?;
    let target = new_path.as_ref();
    let staging = uncompressed_path(target);
    let real_source =
        fs::canonicalize(&source).map_err(|err| CoreError::io(source.display().to_string(), err))?;
    if resolve(&staging) == real_source || resolve(target) == real_source {
        return Err(CoreError::invalid_argument(format!(
            "cannot upgrade {} in place",
            source.display()
        )));
    }

    let mut reader = JournalReader::open(&source)?;
    let source_version = reader.version();
    let copied = JournalWriter::create(&staging, reader.instance_id(), reader.extents())
        .and_then(|writer| transcode(&mut reader, writer));
    let records = match copied {
        Ok(records) => records,
        Err(err) => {
            discard(&staging);
            return Err(err);
        }
    };
    reader.close()?;

    if is_compressed_path(target) {
        if let Err(err) = compress_file(&staging, target) {
            discard(&staging);
            discard(target);
            return Err(err);
        }
        remove_file(&staging)?;
    }

    info!(
        source = %source.display(),
        target = %target.display(),
        source_version,
        records,
        "upgraded journal"
    );
    Ok(UpgradeReport {
        source,
        target: target.to_path_buf(),
        source_version,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Extents;
    use std::fs;
    use tempfile::tempdir;
    use txlog_codec::{Payload, Record, RecordType};

    fn write_journal(path: &Path, txids: &[u64]) {
        let mut writer = JournalWriter::create(path, 4, Extents::new(1, 3)).unwrap();
        for &txid in txids {
            let mut record = Record::new(RecordType::Publish);
            record.local_txid = txid;
            record.timestamp = txid;
            record.topic = b"orders".to_vec();
            record.data = Payload::Bytes(format!("{{\"id\":{txid}}}").into_bytes());
            writer.write(record).unwrap();
        }
        writer.close().unwrap();
    }

    fn read_all(path: &Path) -> Vec<Record> {
        let mut reader = JournalReader::open(path).unwrap();
        reader.records().collect::<CoreResult<_>>().unwrap()
    }

    #[test]
    fn latest_upgrade_preserves_records() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("old.journal");
        let new = dir.path().join("new.journal");
        write_journal(&old, &[1, 2, 3]);

        let report = upgrade(old.to_str().unwrap(), &new).unwrap();
        assert_eq!(report.source_version, 8);
        assert_eq!(report.records, 4);
        assert_eq!(read_all(&old), read_all(&new));
        assert_eq!(fs::read(&old).unwrap(), fs::read(&new).unwrap());
        assert!(is_up_to_date(&new).unwrap());
    }

    #[test]
    fn compressed_target_and_source() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("old.journal");
        let packed = dir.path().join("packed.journal.gz");
        write_journal(&old, &[1, 2]);

        upgrade(old.to_str().unwrap(), &packed).unwrap();
        assert!(packed.exists());
        assert!(!dir.path().join("packed.journal").exists());

        let reader = JournalReader::open(&packed).unwrap();
        assert!(reader.is_compressed());
        assert_eq!(reader.file_size(), 8192);
        drop(reader);
        assert_eq!(read_all(&packed), read_all(&old));

        let unpacked = dir.path().join("unpacked.journal");
        let report = upgrade(packed.to_str().unwrap(), &unpacked).unwrap();
        assert_eq!(report.records, 3);
        assert_eq!(read_all(&unpacked), read_all(&old));
    }

    #[test]
    fn pattern_must_match_one_file() {
        let dir = tempdir().unwrap();
        let missing = format!("{}/*.journal", dir.path().display());
        assert!(matches!(
            upgrade(&missing, dir.path().join("x.journal")),
            Err(CoreError::NoMatchingFiles { .. })
        ));

        write_journal(&dir.path().join("a.journal"), &[1]);
        assert!(matches!(
            upgrade(&missing, dir.path().join("a.journal")),
            Err(CoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn dot_dot_alias_of_source_is_rejected() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let old = dir.path().join("old.journal");
        write_journal(&old, &[1, 2]);
        let before = fs::read(&old).unwrap();

        for alias in ["sub/../old.journal", "sub/../old.journal.gz"] {
            assert!(matches!(
                upgrade(old.to_str().unwrap(), dir.path().join(alias)),
                Err(CoreError::InvalidArgument { .. })
            ));
        }
        assert_eq!(fs::read(&old).unwrap(), before);
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_source_is_rejected() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("old.journal");
        let link = dir.path().join("link.journal");
        write_journal(&old, &[1, 2]);
        std::os::unix::fs::symlink(&old, &link).unwrap();
        let before = fs::read(&old).unwrap();

        assert!(matches!(
            upgrade(old.to_str().unwrap(), &link),
            Err(CoreError::InvalidArgument { .. })
        ));
        assert!(matches!(
            upgrade(link.to_str().unwrap(), &old),
            Err(CoreError::InvalidArgument { .. })
        ));
        assert_eq!(fs::read(&old).unwrap(), before);
    }

    #[test]
    fn failed_upgrade_removes_partial_output() {
        let dir = tempdir().unwrap();
        let old = dir.path().join("old.journal");
        let mut writer = JournalWriter::create(&old, 4, Extents::new(1, 2)).unwrap();
        for (txid, len) in [(1u64, 8usize), (2, 800)] {
            let mut record = Record::new(RecordType::Publish);
            record.local_txid = txid;
            record.data = Payload::Bytes(vec![b'x'; len]);
            writer.write(record).unwrap();
        }
        writer.close().unwrap();
        // Cut the second record, which spans four blocks, after two of them.
        let file = fs::OpenOptions::new().write(true).open(&old).unwrap();
        file.set_len(4096 + 256 + 512).unwrap();
        drop(file);

        for name in ["new.journal", "new.journal.gz"] {
            let target = dir.path().join(name);
            assert!(matches!(
                upgrade(old.to_str().unwrap(), &target),
                Err(CoreError::Truncated { .. })
            ));
            assert!(!target.exists());
            assert!(!dir.path().join("new.journal").exists());
        }
    }

    #[test]
    fn version_of_written_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("v.journal");
        write_journal(&path, &[]);
        assert_eq!(version(&path).unwrap(), "amps::txlog/v8");
    }
}
