//! Data file to SQL conversion
//!
//! Drives [`ChunkedFileScanner`] chunk by chunk, resuming each chunk at the
//! previous chunk's last line, and streams every record into one
//! [`BatchSqlEmitter`].

use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::ais::{ProductFamily, RecordType};
use crate::emitter::{BatchSqlEmitter, EmitStats, DEFAULT_BATCH_SIZE};
use crate::error::{IngestError, Result};
use crate::scanner::ChunkedFileScanner;

/// Records scanned per chunk
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Header line of a generated update script
pub const SCRIPT_HEADER: &str = "-- USPS AIS CS215N UPDATE FILE";

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub family: ProductFamily,
    pub record_type: RecordType,
    pub start_line: u64,
    /// Total records to convert; `None` or `Some(0)` converts to end of file
    pub max_records: Option<usize>,
    pub batch_size: usize,
    pub chunk_size: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            family: ProductFamily::Cs215n,
            record_type: RecordType::Detail,
            start_line: 0,
            max_records: None,
            batch_size: DEFAULT_BATCH_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ConvertOptions {
    pub fn new(record_type: RecordType) -> Self {
        Self {
            record_type,
            ..Default::default()
        }
    }
}

/// Totals from a conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertSummary {
    pub found_count: usize,
    /// Line to resume from for the next conversion
    pub last_line_number: u64,
    pub statements: usize,
}

/// Convert `data_file` into INSERT statements written to `sink`
///
/// `on_progress` receives the line number of each converted record.
pub fn convert_file<W, P>(
    data_file: &Path,
    options: &ConvertOptions,
    sink: W,
    mut on_progress: P,
) -> Result<(W, ConvertSummary)>
where
    W: Write,
    P: FnMut(u64),
{
    if options.chunk_size == 0 {
        return Err(IngestError::config("chunk size must be at least 1"));
    }

    let scanner = ChunkedFileScanner::new(options.family);
    let mut emitter =
        BatchSqlEmitter::new(sink, options.family, options.record_type, options.batch_size)?;
    let limit = options.max_records.filter(|&n| n > 0);

    let mut found = 0usize;
    let mut next_line = options.start_line;
    loop {
        let chunk = match limit {
            Some(max) if found >= max => break,
            Some(max) => (max - found).min(options.chunk_size),
            None => options.chunk_size,
        };

        let summary = scanner.scan_each(
            data_file,
            Some(options.record_type),
            next_line,
            Some(chunk),
            |line_number, record| {
                on_progress(line_number);
                emitter.push(record)
            },
        )?;

        debug!(
            start_line = next_line,
            found = summary.found_count,
            last_line = summary.last_line_number,
            "Chunk converted"
        );

        found += summary.found_count;
        next_line = summary.last_line_number;
        if summary.found_count == 0 || summary.reached_end {
            break;
        }
    }

    let (sink, EmitStats { statements, .. }) = emitter.finish()?;
    info!(
        file = %data_file.display(),
        record_type = %options.record_type,
        found,
        last_line = next_line,
        "Conversion complete"
    );

    Ok((
        sink,
        ConvertSummary {
            found_count: found,
            last_line_number: next_line,
            statements,
        },
    ))
}

/// Write a full update script: header, transaction, truncate, inserts, commit
pub fn write_update_script<W: Write>(
    data_file: &Path,
    options: &ConvertOptions,
    mut sink: W,
) -> Result<(W, ConvertSummary)> {
    let table = crate::ais::layout_of(options.family, options.record_type).table;
    writeln!(sink, "{}", SCRIPT_HEADER)?;
    writeln!(sink, "START TRANSACTION;")?;
    writeln!(sink, "TRUNCATE TABLE `{}`;", table)?;

    let (mut sink, summary) = convert_file(data_file, options, sink, |_| {})?;

    writeln!(sink, "COMMIT;")?;
    sink.flush()?;
    Ok((sink, summary))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn data_file(tags: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for (i, tag) in tags.chars().enumerate() {
            write!(file, "{:<129}", format!("{}{:05}", tag, i)).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn convert(file: &NamedTempFile, options: &ConvertOptions) -> (String, ConvertSummary) {
        let (buf, summary) = convert_file(file.path(), options, Vec::new(), |_| {}).unwrap();
        (String::from_utf8(buf).unwrap(), summary)
    }

    #[test]
    fn test_convert_all_details() {
        let file = data_file("DADZD");
        let (sql, summary) = convert(&file, &ConvertOptions::default());
        assert_eq!(summary.found_count, 3);
        assert_eq!(summary.last_line_number, 5);
        assert_eq!(summary.statements, 1);
        assert!(sql.contains("\"00000\""));
        assert!(!sql.contains("\"00001\""));
        assert!(sql.contains("-- Processed 3 records total"));
    }

    #[test]
    fn test_small_chunks_give_same_output() {
        let file = data_file("DDADDZDDAD");
        let (whole, whole_summary) = convert(&file, &ConvertOptions::default());
        let chunked_options = ConvertOptions {
            chunk_size: 2,
            ..Default::default()
        };
        let (chunked, chunked_summary) = convert(&file, &chunked_options);
        assert_eq!(whole, chunked);
        assert_eq!(whole_summary, chunked_summary);
    }

    #[test]
    fn test_resume_from_last_line() {
        let file = data_file("DDADD");
        let first = ConvertOptions {
            max_records: Some(2),
            ..Default::default()
        };
        let (_, summary) = convert(&file, &first);
        assert_eq!(summary.found_count, 2);
        assert_eq!(summary.last_line_number, 2);

        let second = ConvertOptions {
            start_line: summary.last_line_number,
            ..Default::default()
        };
        let (sql, summary) = convert(&file, &second);
        assert_eq!(summary.found_count, 2);
        assert!(sql.contains("\"00003\""));
        assert!(sql.contains("\"00004\""));
    }

    #[test]
    fn test_no_matches() {
        let file = data_file("AAA");
        let (sql, summary) = convert(&file, &ConvertOptions::default());
        assert_eq!(summary.found_count, 0);
        assert_eq!(summary.last_line_number, 3);
        assert!(sql.is_empty());
    }

    #[test]
    fn test_progress_reports_line_numbers() {
        let file = data_file("ADAD");
        let mut lines = Vec::new();
        convert_file(file.path(), &ConvertOptions::default(), Vec::new(), |n| {
            lines.push(n)
        })
        .unwrap();
        assert_eq!(lines, vec![1, 3]);
    }

    #[test]
    fn test_update_script_framing() {
        let file = data_file("DD");
        let (buf, summary) =
            write_update_script(file.path(), &ConvertOptions::default(), Vec::new()).unwrap();
        let script = String::from_utf8(buf).unwrap();
        assert_eq!(summary.found_count, 2);

        let lines: Vec<&str> = script.lines().collect();
        assert_eq!(lines[0], SCRIPT_HEADER);
        assert_eq!(lines[1], "START TRANSACTION;");
        assert_eq!(lines[2], "TRUNCATE TABLE `ref_AIS_CS215N_D`;");
        assert!(lines[3].starts_with("INSERT INTO `ref_AIS_CS215N_D`"));
        assert_eq!(lines.last().copied(), Some("COMMIT;"));
    }
}
