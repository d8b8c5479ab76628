//! Output sinks: NDJSON records, diverted raw rows, flat delimited tables.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::{self, Write};

/// Writes one compact JSON document per line.
pub struct RecordWriter<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(writer: W) -> Self {
        RecordWriter { writer, written: 0 }
    }

    pub fn write(&mut self, record: &Value) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Writes rejected raw rows back out as delimited text.
pub struct ErrorWriter<W: Write> {
    writer: csv::Writer<W>,
    written: usize,
}

impl<W: Write> ErrorWriter<W> {
    pub fn new(writer: W, delimiter: u8) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_writer(writer);
        ErrorWriter { writer, written: 0 }
    }

    pub fn write_row<S: AsRef<[u8]>>(&mut self, row: &[S]) -> csv::Result<()> {
        self.writer.write_record(row)?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Collects flat records and writes them as one table.
///
/// The header row is the union of every record's keys in first-seen order;
/// a record without a given key gets an empty cell.
#[derive(Debug, Default)]
pub struct FlatCsvWriter {
    headers: Vec<String>,
    positions: HashMap<String, usize>,
    rows: Vec<Map<String, Value>>,
}

impl FlatCsvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Map<String, Value>) {
        for key in record.keys() {
            if !self.positions.contains_key(key) {
                self.positions.insert(key.clone(), self.headers.len());
                self.headers.push(key.clone());
            }
        }
        self.rows.push(record);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the header row and every collected record.
    pub fn write_to<W: Write>(&self, writer: W, delimiter: u8) -> csv::Result<()> {
        let mut out = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(writer);

        if self.headers.is_empty() {
            return Ok(());
        }

        out.write_record(&self.headers)?;
        for row in &self.rows {
            let mut cells = vec![String::new(); self.headers.len()];
            for (key, value) in row {
                if let Some(&pos) = self.positions.get(key) {
                    cells[pos] = cell_text(value);
                }
            }
            out.write_record(&cells)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Strings as-is, null as empty, anything else as compact JSON.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
