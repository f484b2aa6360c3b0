//! Version command implementation.

use std::path::Path;
use txlog_core::VERSION_LABEL;

/// Runs the version command.
///
/// With `check`, also reports whether the file needs an upgrade.
pub fn run(path: &Path, check: bool) -> Result<(), Box<dyn std::error::Error>> {
    let label = txlog_core::version(path)?;
    if check {
        let state = if label == VERSION_LABEL {
            "up to date"
        } else {
            "needs upgrade"
        };
        println!("{label} ({state}, latest {VERSION_LABEL})");
    } else {
        println!("{label}");
    }
    Ok(())
}
