//! Batched multi-row INSERT generation
//!
//! Records are buffered and written as one `INSERT ... VALUES` statement per
//! `batch_size` rows. [`BatchSqlEmitter::finish`] writes the final partial
//! batch and the trailing record count.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::ais::{layout_of, ProductFamily, Record, RecordLayout, RecordType};
use crate::error::{IngestError, Result};

/// Rows per INSERT statement
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Counters from a finished emitter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitStats {
    pub rows: usize,
    pub statements: usize,
}

pub struct BatchSqlEmitter<W: Write> {
    sink: W,
    layout: &'static RecordLayout,
    batch_size: usize,
    pending: Vec<Record>,
    stats: EmitStats,
}

impl<W: Write> BatchSqlEmitter<W> {
    pub fn new(
        sink: W,
        family: ProductFamily,
        record_type: RecordType,
        batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(IngestError::config("batch size must be at least 1"));
        }
        Ok(Self {
            sink,
            layout: layout_of(family, record_type),
            batch_size,
            pending: Vec::with_capacity(batch_size.min(DEFAULT_BATCH_SIZE)),
            stats: EmitStats::default(),
        })
    }

    pub fn record_type(&self) -> RecordType {
        self.layout.record_type
    }

    pub fn stats(&self) -> EmitStats {
        self.stats
    }

    /// Queue a record, writing a statement once the batch is full
    pub fn push(&mut self, record: Record) -> Result<()> {
        if record.record_type() != Some(self.layout.record_type) {
            return Err(IngestError::SchemaMismatch {
                expected: self.layout.record_type,
                found: record.tag(),
            });
        }
        self.pending.push(record);
        if self.pending.len() >= self.batch_size {
            self.flush_batch()?;
        }
        Ok(())
    }

    fn flush_batch(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        write_statement(&mut self.sink, self.layout, &self.pending)?;
        self.stats.rows += self.pending.len();
        self.stats.statements += 1;
        self.pending.clear();
        Ok(())
    }

    /// Write any pending rows and the record count, then hand back the sink
    pub fn finish(mut self) -> Result<(W, EmitStats)> {
        self.flush_batch()?;
        if self.stats.rows > 0 {
            writeln!(self.sink, "-- Processed {} records total", self.stats.rows)?;
        }
        self.sink.flush()?;
        debug!(
            table = self.layout.table,
            rows = self.stats.rows,
            statements = self.stats.statements,
            "Emitter finished"
        );
        Ok((self.sink, self.stats))
    }
}

/// Emit every record into `sink` and finish
pub fn emit_all<W, I>(
    sink: W,
    family: ProductFamily,
    record_type: RecordType,
    batch_size: usize,
    records: I,
) -> Result<(W, EmitStats)>
where
    W: Write,
    I: IntoIterator<Item = Record>,
{
    let mut emitter = BatchSqlEmitter::new(sink, family, record_type, batch_size)?;
    for record in records {
        emitter.push(record)?;
    }
    emitter.finish()
}

/// Render records to a string
pub fn emit_to_string(
    family: ProductFamily,
    record_type: RecordType,
    batch_size: usize,
    records: impl IntoIterator<Item = Record>,
) -> Result<String> {
    let (buf, _) = emit_all(Vec::new(), family, record_type, batch_size, records)?;
    String::from_utf8(buf).map_err(|e| IngestError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

fn write_statement<W: Write>(sink: &mut W, layout: &RecordLayout, rows: &[Record]) -> io::Result<()> {
    let columns = layout
        .columns()
        .iter()
        .map(|c| format!("`{}`", c))
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(sink, "INSERT INTO `{}` ({})", layout.table, columns)?;
    writeln!(sink, "VALUES")?;

    for (i, record) in rows.iter().enumerate() {
        let mut values = Vec::with_capacity(layout.fields.len() + 1);
        values.push(quote(&record.tag().to_string()));
        values.extend(record.values().into_iter().map(quote));
        let terminator = if i + 1 == rows.len() { ";" } else { "," };
        writeln!(sink, "({}){}", values.join(","), terminator)?;
    }
    writeln!(sink)
}

/// Double-quote a value, escaping characters MySQL treats specially
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            '\x1a' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Destination for generated SQL
pub enum SqlSink {
    Buffer(Vec<u8>),
    File(BufWriter<File>),
}

impl SqlSink {
    pub fn buffer() -> Self {
        Self::Buffer(Vec::new())
    }

    /// Open `path` for appending, creating it if needed
    pub fn append(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::File(BufWriter::new(file)))
    }

    /// Buffered text, or `None` for a file sink
    pub fn into_text(self) -> Option<String> {
        match self {
            Self::Buffer(buf) => Some(String::from_utf8_lossy(&buf).into_owned()),
            Self::File(_) => None,
        }
    }
}

impl Write for SqlSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Buffer(b) => b.write(buf),
            Self::File(f) => f.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Buffer(_) => Ok(()),
            Self::File(f) => f.flush(),
        }
    }
}
