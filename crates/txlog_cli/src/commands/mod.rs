//! CLI command implementations.

pub mod dump;
pub mod extents;
pub mod upgrade;
pub mod version;
