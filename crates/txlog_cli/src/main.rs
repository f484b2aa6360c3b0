//! txlog CLI
//!
//! Command-line tools for transaction journal files.
//!
//! # Commands
//!
//! - `dump` - Print the records of one or more journals
//! - `extents` - Print the header report of each journal
//! - `version` - Print the version label of a journal
//! - `upgrade` - Rewrite a journal in the latest version

mod commands;
mod report;

use clap::{Parser, Subcommand};
use commands::dump::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use txlog_codec::{ExpirationFormat, RenderOptions};
use txlog_core::{DumpOptions, ReaderConfig};

/// Transaction journal tools.
#[derive(Parser)]
#[command(name = "txlog")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the records of one or more journals
    Dump {
        /// Journal files or glob patterns
        #[arg(required = true)]
        files: Vec<String>,

        /// First entry to print, counting from 0 across all files
        #[arg(long)]
        start: Option<u64>,

        /// Last entry to print
        #[arg(long)]
        stop: Option<u64>,

        /// Render timestamps in the local time zone
        #[arg(short, long)]
        localtime: bool,

        /// Print replication source extents after each file
        #[arg(short, long)]
        extents: bool,

        /// Print only the header of each file, with raw extents
        #[arg(long)]
        journal_extents: bool,

        /// Replace message data with a placeholder
        #[arg(long)]
        omit_data: bool,

        /// Include noop filler records
        #[arg(long)]
        include_noops: bool,

        /// Render SOW expirations as ISO-8601 timestamps
        #[arg(long)]
        iso_expiration: bool,

        /// Verify each record checksum
        #[arg(long)]
        verify: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the header report of each journal
    Extents {
        /// Journal files or glob patterns
        #[arg(required = true)]
        files: Vec<String>,

        /// Render timestamps in the local time zone
        #[arg(short, long)]
        localtime: bool,
    },

    /// Print the version label of a journal
    Version {
        /// Journal file
        file: PathBuf,

        /// Also report whether the file needs an upgrade
        #[arg(short, long)]
        check: bool,
    },

    /// Rewrite a journal in the latest version
    Upgrade {
        /// Journal to read; a glob matching exactly one file
        old: String,

        /// Journal to write; a `.gz` suffix compresses it
        new: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Reports go to stdout, logs to stderr
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Dump {
            files,
            start,
            stop,
            localtime,
            extents,
            journal_extents,
            omit_data,
            include_noops,
            iso_expiration,
            verify,
            format,
        } => {
            let expiration = if iso_expiration {
                ExpirationFormat::Iso
            } else {
                ExpirationFormat::Numeric
            };
            let mut options = DumpOptions::new()
                .include_noops(include_noops)
                .omit_data(omit_data)
                .show_extents(extents)
                .journal_extents(journal_extents)
                .render(
                    RenderOptions::new()
                        .local_time(localtime)
                        .expiration(expiration),
                );
            options.start = start;
            options.stop = stop;
            let config = ReaderConfig::new().verify_checksums(verify);
            commands::dump::run(&files, options, config, format)?;
        }
        Commands::Extents { files, localtime } => {
            let options = DumpOptions::new()
                .journal_extents(true)
                .render(RenderOptions::new().local_time(localtime));
            commands::extents::run(&files, options)?;
        }
        Commands::Version { file, check } => {
            commands::version::run(&file, check)?;
        }
        Commands::Upgrade { old, new } => {
            commands::upgrade::run(&old, &new)?;
        }
    }

    Ok(())
}
