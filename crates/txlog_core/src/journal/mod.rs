//! Journal reading and writing.
//!
//! - [`JournalReader`] opens a file of any version and scans its records.
//! - [`JournalWriter`] writes the latest version.
//! - [`ScanCursor`] is the reader's scan logic without I/O.

mod cursor;
mod extents;
mod reader;
mod writer;

pub use cursor::{Frame, ScanCursor, BLOCK_LEN};
pub use extents::{SourceExtent, SourceExtents};
pub use reader::{JournalReader, Records};
pub use writer::JournalWriter;

/// Rule printed under each report section.
pub const SEPARATOR: &str = "______________________________________________________________";
