//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding journal records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The record bytes do not match the layout declared for the version.
    #[error("malformed version {version} record: {message}")]
    MalformedRecord {
        /// On-disk schema version used for decoding.
        version: u32,
        /// Description of the mismatch.
        message: String,
    },

    /// No record layout exists for this schema version.
    #[error("unsupported journal version {version}")]
    UnsupportedVersion {
        /// The version found.
        version: u32,
    },

    /// A canonical field does not fit the width of the target layout.
    #[error("field {field} value {value} does not fit the target layout")]
    FieldOverflow {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: u64,
    },

    /// A record whose payload was redacted cannot be re-encoded.
    #[error("cannot encode a record whose message data was redacted")]
    RedactedPayload,

    /// Fewer bytes were supplied than the layout requires.
    #[error("unexpected end of input: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        /// Bytes required.
        needed: usize,
        /// Bytes present.
        available: usize,
    },
}

impl CodecError {
    /// Create a malformed record error.
    pub fn malformed(version: u32, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            version,
            message: message.into(),
        }
    }

    /// Create a field overflow error.
    pub fn overflow(field: &'static str, value: impl Into<u64>) -> Self {
        Self::FieldOverflow {
            field,
            value: value.into(),
        }
    }
}
