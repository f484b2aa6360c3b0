//! # txlog Testkit
//!
//! Test utilities for txlog journals.
//!
//! This crate provides:
//! - Journal builders for every schema version and temp-dir fixtures
//! - Property-based test generators using proptest
//! - Crash recovery scenarios for the writer
//! - Cross-crate integration test helpers
//! - Fuzz testing harnesses
//!
//! ## Usage
//!
//! ```rust,ignore
//! use txlog_testkit::prelude::*;
//!
//! #[test]
//! fn upgrades_version_three() {
//!     let records: Vec<_> = (1..=3).map(sample_record).collect();
//!     assert_upgrade_preserves(3, &records);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod fuzz;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::fuzz::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use crash::*;
pub use fixtures::*;
pub use fuzz::*;
pub use generators::*;
pub use integration::*;
