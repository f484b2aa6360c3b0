//! # txlog Core
//!
//! Journal files: headers, reading, writing and version upgrade.
//!
//! This crate provides:
//! - [`FileHeader`] and [`ExtentsHeader`] parsing and encoding
//! - [`JournalReader`] for files of every schema version, plain or gzip
//! - [`JournalWriter`] for the latest version
//! - [`upgrade`] to rewrite an old journal in the latest version
//! - [`JournalStats`] for dump totals
//!
//! Record layouts live in `txlog_codec`; byte storage in `txlog_storage`.
//!
//! ## File layout
//!
//! ```text
//! [0, 512)      file header
//! [512, 1024)   extents header
//! body          records at 4096 (version 4+) or 1024, each a multiple of
//!               256 bytes, ending at a zero block or end of file
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod compression;
mod config;
mod error;
mod fileset;
mod header;
mod journal;
mod stats;
mod upgrade;

pub use compression::{
    compress_file, decompress_file, gzip_uncompressed_size, is_compressed_path,
    uncompressed_path, COMPRESSED_EXTENSION, COMPRESSION_LEVEL,
};
pub use config::{DumpOptions, ReaderConfig, WriterConfig};
pub use error::{CoreError, CoreResult};
pub use fileset::Fileset;
pub use header::{
    body_offset, Extents, ExtentsHeader, FileHeader, DEFAULT_COMPRESSION_OPTIONS,
    DEFAULT_COMPRESSION_TYPE, EXTENTS_OFFSET, HEADER_BLOCK_LEN, MAGIC, SEGMENT_LEN,
    VERSION_LABEL,
};
pub use journal::{
    Frame, JournalReader, JournalWriter, Records, ScanCursor, SourceExtent, SourceExtents,
    BLOCK_LEN, SEPARATOR,
};
pub use stats::JournalStats;
pub use upgrade::{is_up_to_date, transcode, upgrade, version, UpgradeReport};
