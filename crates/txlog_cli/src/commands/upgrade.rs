//! Upgrade command implementation.

use std::path::Path;

/// Runs the upgrade command.
pub fn run(old: &str, new: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let report = txlog_core::upgrade(old, new)?;
    println!(
        "Upgraded {} (v{}) to {}: {} records",
        report.source.display(),
        report.source_version,
        report.target.display(),
        report.records
    );
    Ok(())
}
