//! # txlog Storage
//!
//! Storage backend trait and implementations for journal files.
//!
//! Storage backends are **opaque byte stores** - they do not interpret
//! the data they store. The journal header, extents and record layouts are
//! owned entirely by `txlog_core` and `txlog_codec`.
//!
//! ## Design Principles
//!
//! - Backends are simple byte stores (positioned read, positioned write)
//! - No knowledge of journal versions, headers or records
//! - Must be `Send + Sync`
//! - `release` gives the OS a chance to drop cached pages for the file
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For tests and for decompressed journal images
//! - [`FileBackend`] - For on-disk journals using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use txlog_storage::{StorageBackend, InMemoryBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! backend.write_at(0, b"hello world").unwrap();
//! let data = backend.read_at(6, 5).unwrap();
//! assert_eq!(&data, b"world");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
