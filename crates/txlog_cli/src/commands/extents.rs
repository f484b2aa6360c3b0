//! Extents command implementation.

use super::dump::write_journal_extents;
use std::io::{self, Write};
use txlog_core::{DumpOptions, Fileset};

/// Runs the extents command.
pub fn run(files: &[String], options: DumpOptions) -> Result<(), Box<dyn std::error::Error>> {
    let fileset = Fileset::expand(files)?;
    let mut out = io::stdout().lock();
    write_journal_extents(&mut out, &fileset, &options)?;
    out.flush()?;
    Ok(())
}
