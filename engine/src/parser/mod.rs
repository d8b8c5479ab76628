//! Delimited row source with encoding and delimiter auto-detection.
//!
//! Rows come out as plain `Vec<String>` in file order; the first row is
//! usually the header row. Nothing here knows about paths or records.

use std::path::Path;

use crate::error::{CsvError, CsvResult};

/// Candidate delimiters, in tie-break order.
const DELIMITERS: [char; 4] = [';', ',', '\t', '|'];

/// Decoded delimited text, ready to be iterated row by row.
#[derive(Debug, Clone)]
pub struct RowSource {
    content: String,
    encoding: String,
    delimiter: char,
}

impl RowSource {
    /// Read a file, detect its encoding and (unless given) its delimiter.
    pub fn open<P: AsRef<Path>>(path: P, delimiter: Option<char>) -> CsvResult<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_bytes(&bytes, delimiter)
    }

    /// Same as [`RowSource::open`] for bytes already in memory.
    pub fn from_bytes(bytes: &[u8], delimiter: Option<char>) -> CsvResult<Self> {
        if bytes.is_empty() {
            return Err(CsvError::EmptyFile);
        }

        let encoding = detect_encoding(bytes);
        let content = decode_content(bytes, &encoding)?;
        let content = content.trim_start_matches('\u{feff}').to_string();
        let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));

        Self::with_encoding(content, delimiter, encoding)
    }

    /// Wrap text that is already decoded.
    pub fn from_text(content: impl Into<String>, delimiter: char) -> CsvResult<Self> {
        Self::with_encoding(content.into(), delimiter, "utf-8".to_string())
    }

    fn with_encoding(content: String, delimiter: char, encoding: String) -> CsvResult<Self> {
        if !delimiter.is_ascii() {
            return Err(CsvError::Parse {
                line: 0,
                message: format!("delimiter '{}' is not a single-byte character", delimiter),
            });
        }
        if content.trim().is_empty() {
            return Err(CsvError::EmptyFile);
        }
        Ok(Self {
            content,
            encoding,
            delimiter,
        })
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Lazily yield every row, header row included. Rows may differ in length.
    pub fn rows(&self) -> impl Iterator<Item = CsvResult<Vec<String>>> + '_ {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter as u8)
            .from_reader(self.content.as_bytes())
            .into_records()
            .map(|result| {
                result
                    .map(|record| record.iter().map(str::to_string).collect())
                    .map_err(parse_error)
            })
    }

    /// Split off the header row from the data rows.
    pub fn split_header(
        &self,
    ) -> CsvResult<(Vec<String>, impl Iterator<Item = CsvResult<Vec<String>>> + '_)> {
        let mut rows = self.rows();
        let headers = rows.next().ok_or(CsvError::NoHeaders)??;
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(CsvError::NoHeaders);
        }
        Ok((headers, rows))
    }
}

fn parse_error(err: csv::Error) -> CsvError {
    let line = err.position().map(|p| p.line()).unwrap_or(0);
    CsvError::Parse {
        line,
        message: err.to_string(),
    }
}

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" | "" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding
pub fn decode_content(bytes: &[u8], encoding: &str) -> CsvResult<String> {
    match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => Ok(String::from_utf8(bytes.to_vec())
            .unwrap_or_else(|_| String::from_utf8_lossy(bytes).into_owned())),
        "iso-8859-1" | "latin-1" | "latin1" | "windows-1252" | "cp1252" => {
            Ok(encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned())
        }
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(enc) => {
                let (decoded, _, had_errors) = enc.decode(bytes);
                if had_errors {
                    return Err(CsvError::Encoding(other.to_string()));
                }
                Ok(decoded.into_owned())
            }
            // Unknown label: fall back to lossy UTF-8
            None => Ok(String::from_utf8_lossy(bytes).into_owned()),
        },
    }
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &DELIMITERS {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}
