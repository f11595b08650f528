//! Resumable chunked scanning of fixed-width data files
//!
//! A scan seeks straight to `start_line * line_width`, reads whole lines and
//! stops after `max_records` matches. The returned `last_line_number` is the
//! line after the last one consumed, so feeding it back as the next
//! `start_line` continues without skipping or repeating a record.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use tracing::{debug, trace};

use crate::ais::{FixedWidthRecordParser, ParseOutcome, ProductFamily, Record, RecordType};
use crate::error::{IngestError, Result};

/// Lines buffered per read syscall
const LINES_PER_BUFFER: usize = 512;

/// Position of the next line to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCursor {
    line_number: u64,
    line_width: usize,
}

impl ScanCursor {
    pub fn new(line_number: u64, line_width: usize) -> Self {
        Self {
            line_number,
            line_width,
        }
    }

    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    /// None when the offset does not fit in a u64
    pub fn byte_offset(&self) -> Option<u64> {
        self.line_number.checked_mul(self.line_width as u64)
    }

    fn advance(&mut self) {
        self.line_number += 1;
    }
}

/// Counters from one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Matching known records delivered
    pub found_count: usize,
    /// Line number just past the last line consumed
    pub last_line_number: u64,
    /// Lines whose tag has no layout
    pub unknown_count: usize,
    /// True when the scan stopped at end of file rather than at the limit
    pub reached_end: bool,
}

/// Records plus counters from [`ChunkedFileScanner::scan`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub records: Vec<Record>,
    pub found_count: usize,
    pub last_line_number: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkedFileScanner {
    parser: FixedWidthRecordParser,
}

impl ChunkedFileScanner {
    pub fn new(family: ProductFamily) -> Self {
        Self {
            parser: FixedWidthRecordParser::new(family),
        }
    }

    pub fn line_width(&self) -> usize {
        self.parser.line_width()
    }

    /// Number of whole lines in the file at `path`
    pub fn line_count(&self, path: &Path) -> Result<u64> {
        let len = std::fs::metadata(path)
            .map_err(|_| IngestError::FileNotFound(path.to_path_buf()))?
            .len();
        Ok(len / self.line_width() as u64)
    }

    /// Scan and collect matching records
    ///
    /// `max_records` of `None` or `Some(0)` means no limit.
    pub fn scan(
        &self,
        path: &Path,
        filter: Option<RecordType>,
        start_line: u64,
        max_records: Option<usize>,
    ) -> Result<ScanResult> {
        let mut records = Vec::new();
        let summary = self.scan_each(path, filter, start_line, max_records, |_, record| {
            records.push(record);
            Ok(())
        })?;

        Ok(ScanResult {
            records,
            found_count: summary.found_count,
            last_line_number: summary.last_line_number,
        })
    }

    /// Scan and hand each matching record to `on_record` with its line number
    pub fn scan_each<F>(
        &self,
        path: &Path,
        filter: Option<RecordType>,
        start_line: u64,
        max_records: Option<usize>,
        mut on_record: F,
    ) -> Result<ScanSummary>
    where
        F: FnMut(u64, Record) -> Result<()>,
    {
        if !path.is_file() {
            return Err(IngestError::FileNotFound(path.to_path_buf()));
        }

        let width = self.line_width();
        let limit = max_records.filter(|&n| n > 0);
        let mut cursor = ScanCursor::new(start_line, width);

        let mut file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let offset = match cursor.byte_offset() {
            Some(offset) if offset < file_len => offset,
            _ => {
                debug!(path = %path.display(), start_line, "Start line is past end of file");
                return Ok(ScanSummary {
                    last_line_number: start_line,
                    reached_end: true,
                    ..ScanSummary::default()
                });
            }
        };
        file.seek(SeekFrom::Start(offset))?;
        let mut reader = BufReader::with_capacity(width * LINES_PER_BUFFER, file);
        let mut line = vec![0u8; width];

        debug!(
            path = %path.display(),
            start_line,
            ?filter,
            ?limit,
            "Scanning data file"
        );

        let mut summary = ScanSummary::default();
        loop {
            if limit.is_some_and(|max| summary.found_count >= max) {
                break;
            }

            let read = read_full(&mut reader, &mut line)?;
            if read < width {
                if read > 0 {
                    debug!(
                        bytes = read,
                        line_number = cursor.line_number(),
                        "Ignoring partial trailing line"
                    );
                }
                summary.reached_end = true;
                break;
            }

            let line_number = cursor.line_number();
            cursor.advance();

            match self.parser.parse_line(&line, filter) {
                ParseOutcome::Parsed(Record::Unknown { tag }) => {
                    trace!(line_number, %tag, "Skipping unknown record type");
                    summary.unknown_count += 1;
                }
                ParseOutcome::Parsed(record) => {
                    summary.found_count += 1;
                    on_record(line_number, record)?;
                }
                ParseOutcome::NotMatched { .. } => {}
            }
        }

        summary.last_line_number = cursor.line_number();
        debug!(
            found = summary.found_count,
            last_line = summary.last_line_number,
            unknown = summary.unknown_count,
            "Scan finished"
        );
        Ok(summary)
    }
}

/// Fill `buf` unless the reader runs dry first; returns bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
