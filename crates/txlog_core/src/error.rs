//! Error types for journal operations.

use std::io;
use thiserror::Error;
use txlog_codec::CodecError;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while reading, writing or upgrading a journal.
///
/// Record-level variants carry the journal path, the byte offset of the
/// record and, where relevant, the schema version.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] txlog_storage::StorageError),

    /// Codec error outside of a record scan.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    /// I/O error on a named file.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File the operation was on.
        path: String,
        /// Underlying error.
        source: io::Error,
    },

    /// Bad magic or an unreadable header.
    #[error("{path}: invalid journal format: {message}")]
    InvalidFormat {
        /// Journal path.
        path: String,
        /// Description of the format issue.
        message: String,
    },

    /// A record's declared size runs past the end of the file.
    #[error("{path}: record at offset {offset} declares {declared} bytes but only {available} remain")]
    Truncated {
        /// Journal path.
        path: String,
        /// Offset of the record.
        offset: u64,
        /// Declared record size.
        declared: u64,
        /// Bytes left in the file.
        available: u64,
    },

    /// A record does not match the layout of its version.
    #[error("{path}: malformed record at offset {offset} (version {version}): {source}")]
    MalformedRecord {
        /// Journal path.
        path: String,
        /// Offset of the record.
        offset: u64,
        /// Schema version of the file.
        version: u32,
        /// Codec failure.
        source: CodecError,
    },

    /// A record's stored CRC does not match its contents.
    #[error("{path}: checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Journal path.
        path: String,
        /// Offset of the record.
        offset: u64,
        /// Stored CRC.
        expected: u32,
        /// Recomputed CRC.
        actual: u32,
    },

    /// Invalid argument to an operation.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// A file pattern matched nothing.
    #[error("no files match {pattern}")]
    NoMatchingFiles {
        /// The pattern that was expanded.
        pattern: String,
    },
}

impl CoreError {
    /// Creates an I/O error for a path.
    pub fn io(path: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid format error.
    pub fn invalid_format(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidFormat {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a malformed record error.
    pub fn malformed_record(
        path: impl Into<String>,
        offset: u64,
        version: u32,
        source: CodecError,
    ) -> Self {
        Self::MalformedRecord {
            path: path.into(),
            offset,
            version,
            source,
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}
