//! Dump command implementation.

use crate::report::{
    format_record, format_source_extents, format_totals, RecordReport, ACTIVE_WARNING,
};
use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};
use txlog_codec::Record;
use txlog_core::{
    DumpOptions, Extents, Fileset, JournalReader, JournalStats, ReaderConfig, SourceExtents,
    SEPARATOR,
};

/// Output format of the dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The aligned text report.
    Text,
    /// One JSON document.
    Json,
}

/// Runs the dump command.
pub fn run(
    files: &[String],
    options: DumpOptions,
    config: ReaderConfig,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let fileset = Fileset::expand(files)?;
    let mut out = io::stdout().lock();

    if options.journal_extents {
        write_journal_extents(&mut out, &fileset, &options)?;
        return Ok(());
    }
    match format {
        OutputFormat::Text => {
            write_text(&mut out, &fileset, &options, config)?;
        }
        OutputFormat::Json => {
            let document = build_document(&fileset, &options, config)?;
            serde_json::to_writer_pretty(&mut out, &document)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Steps of a dump, in the order they happen.
enum DumpEvent<'a> {
    Opened(&'a JournalReader),
    Record {
        record: &'a Record,
        index: u64,
        version: u32,
    },
    Finished(&'a JournalReader),
}

/// Scans every file, calling `visit` for each step, and returns the totals.
///
/// The dump index runs across files. Once it passes `stop` the whole dump
/// ends, after the current file is finished.
fn scan(
    fileset: &Fileset,
    options: &DumpOptions,
    config: ReaderConfig,
    mut visit: impl FnMut(DumpEvent<'_>) -> Result<(), Box<dyn std::error::Error>>,
) -> Result<JournalStats, Box<dyn std::error::Error>> {
    let config = config.redact_data(options.omit_data);
    let mut stats = JournalStats::new();
    let mut index = 0u64;

    for path in fileset {
        let mut reader = JournalReader::open_with(path, config)?;
        visit(DumpEvent::Opened(&reader))?;

        let version = reader.version();
        let mut stopped = false;
        for record in reader.records() {
            let record = record?;
            if !options.counts(&record) {
                continue;
            }
            if options.in_range(index) {
                visit(DumpEvent::Record {
                    record: &record,
                    index,
                    version,
                })?;
            }
            stats.record(&record);
            index += 1;
            if options.past_stop(index) {
                stopped = true;
                break;
            }
        }

        stats.finish_file(reader.file_size(), reader.is_active());
        visit(DumpEvent::Finished(&reader))?;
        reader.close()?;
        if stopped {
            break;
        }
    }
    Ok(stats)
}

/// Writes the text report of a dump and returns its totals.
pub fn write_text<W: Write>(
    out: &mut W,
    fileset: &Fileset,
    options: &DumpOptions,
    config: ReaderConfig,
) -> Result<JournalStats, Box<dyn std::error::Error>> {
    let render = options.render;
    let mut sources_shown = false;

    let stats = scan(fileset, options, config, |event| {
        match event {
            DumpEvent::Opened(reader) => {
                writeln!(out, "{}", reader.format_extents(false, &render))?;
            }
            DumpEvent::Record {
                record,
                index,
                version,
            } => {
                writeln!(out, "{}", format_record(record, version, index, &render))?;
            }
            DumpEvent::Finished(reader) => {
                if options.show_extents && !reader.source_extents().is_empty() {
                    writeln!(
                        out,
                        "{}",
                        format_source_extents(reader.extents(), reader.source_extents())
                    )?;
                    sources_shown = true;
                }
            }
        }
        Ok(())
    })?;

    if sources_shown {
        writeln!(out, "{SEPARATOR}")?;
    }
    if stats.active {
        writeln!(out, "{ACTIVE_WARNING}")?;
    }
    writeln!(out, "{}", format_totals(&stats))?;
    Ok(stats)
}

/// Writes only the header report of each file, with raw extents.
pub fn write_journal_extents<W: Write>(
    out: &mut W,
    fileset: &Fileset,
    options: &DumpOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    for path in fileset {
        let reader = JournalReader::open(path)?;
        writeln!(out, "{}", reader.format_extents(true, &options.render))?;
        if reader.extents().is_unwritten() {
            writeln!(out, "{ACTIVE_WARNING}")?;
        }
        reader.close()?;
    }
    Ok(())
}

/// One file of a JSON dump.
#[derive(Debug, Serialize)]
pub struct FileReport {
    /// File path.
    pub path: String,
    /// Version label.
    pub version: String,
    /// Logical file size.
    pub file_size: u64,
    /// Declared extents.
    pub extents: Extents,
    /// Records printed from this file.
    pub records: Vec<RecordReport>,
    /// Replication extents, when asked for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_extents: Option<SourceExtents>,
}

/// Totals of a JSON dump.
#[derive(Debug, Serialize)]
pub struct TotalsReport {
    /// Accumulated totals.
    #[serde(flatten)]
    pub stats: JournalStats,
    /// File bytes past the last counted record.
    pub remaining_bytes: u64,
}

/// A whole JSON dump.
#[derive(Debug, Serialize)]
pub struct DumpDocument {
    /// Dumped files.
    pub files: Vec<FileReport>,
    /// Totals across files.
    pub totals: TotalsReport,
}

/// Builds the JSON form of a dump.
pub fn build_document(
    fileset: &Fileset,
    options: &DumpOptions,
    config: ReaderConfig,
) -> Result<DumpDocument, Box<dyn std::error::Error>> {
    let render = options.render;
    let mut files: Vec<FileReport> = Vec::new();

    let stats = scan(fileset, options, config, |event| {
        match event {
            DumpEvent::Opened(reader) => files.push(FileReport {
                path: reader.path().to_string(),
                version: reader.version_label(),
                file_size: reader.file_size(),
                extents: reader.extents(),
                records: Vec::new(),
                source_extents: None,
            }),
            DumpEvent::Record { record, index, .. } => {
                if let Some(file) = files.last_mut() {
                    file.records.push(RecordReport::new(record, index, &render));
                }
            }
            DumpEvent::Finished(reader) => {
                if let Some(file) = files.last_mut() {
                    file.extents = reader.extents();
                    if options.show_extents {
                        file.source_extents = Some(reader.source_extents().clone());
                    }
                }
            }
        }
        Ok(())
    })?;

    Ok(DumpDocument {
        files,
        totals: TotalsReport {
            remaining_bytes: stats.remaining_bytes(),
            stats,
        },
    })
}
