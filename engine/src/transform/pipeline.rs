//! High-level conversion API.
//!
//! Combines every step of a run: reading rows, resolving headers, assembling
//! one nested record per row, enriching, pruning, validating, and writing
//! accepted records as NDJSON while diverting everything else to an error
//! file. The reverse direction (NDJSON back to flat records or CSV) lives here
//! too.
//!
//! # Example
//!
//! ```rust,no_run
//! use nestcsv::profile::ConversionProfile;
//! use nestcsv::transform::{convert_csv, ConvertOptions};
//! use std::path::Path;
//!
//! let profile = ConversionProfile::from_file("orders.profile.json")?;
//! let stats = convert_csv(
//!     Path::new("orders.csv"),
//!     Path::new("orders.jsonl"),
//!     Path::new("error_lines.csv"),
//!     &profile,
//!     &ConvertOptions::default(),
//! )?;
//! println!("{}", stats.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::Serialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use super::remap::{remap_tree, RenameMap};
use crate::error::{CsvResult, PipelineError, PipelineResult, RecordError};
use crate::logs::{log_info, log_success, log_warning, log_warning_indent};
use crate::parser::RowSource;
use crate::path::{parse_headers, StructuredPath};
use crate::profile::{CompiledProfile, ConversionProfile};
use crate::sink::{ErrorWriter, FlatCsvWriter, RecordWriter};
use crate::tree::{apply_at, assemble, flatten, prune_map};

/// Diverted rows reported individually before the log switches to a count.
const MAX_REPORTED: usize = 5;

/// Overrides taken from the command line; `None` keeps the profile's value.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    pub headers: Option<Vec<String>>,
    pub delimiter: Option<char>,
    pub drop_unmapped: Option<bool>,
    pub prune: Option<bool>,
}

impl ConvertOptions {
    /// Copy of `profile` with these overrides applied.
    pub fn apply_to(&self, profile: &ConversionProfile) -> ConversionProfile {
        let mut effective = profile.clone();
        if let Some(headers) = &self.headers {
            effective.headers = Some(headers.clone());
        }
        if let Some(delimiter) = self.delimiter {
            effective.delimiter = Some(delimiter);
        }
        if let Some(drop_unmapped) = self.drop_unmapped {
            effective.drop_unmapped = drop_unmapped;
        }
        if let Some(prune) = self.prune {
            effective.prune.enabled = prune;
        }
        effective
    }
}

/// Counters of a conversion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConvertStats {
    /// Data rows read (header row excluded)
    pub rows: usize,
    /// Records written to the output
    pub written: usize,
    /// Rows whose record could not be assembled
    pub failed: usize,
    /// Rows whose record was rejected by validation
    pub rejected: usize,
}

impl ConvertStats {
    /// Rows sent to the error output.
    pub fn diverted(&self) -> usize {
        self.failed + self.rejected
    }

    pub fn summary(&self) -> String {
        format!("Successful rows: {}, failed: {}", self.written, self.diverted())
    }
}

/// What became of one row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Accepted(Value),
    /// Assembled fine but failed validation.
    Rejected(Vec<String>),
    /// Could not be assembled.
    Failed(RecordError),
}

/// Turn one raw row into a record and decide whether it is kept.
pub fn process_row(profile: &CompiledProfile, paths: &[StructuredPath], row: &[String]) -> RowOutcome {
    let mut record = match assemble(paths, row.iter().cloned()) {
        Ok(map) => Value::Object(map),
        Err(err) => return RowOutcome::Failed(err),
    };

    for (path, chain) in &profile.enrich {
        apply_at(&mut record, path, |value| chain.apply(value));
    }

    if let (Some(sentinels), Value::Object(map)) = (&profile.sentinels, &mut record) {
        prune_map(map, sentinels);
    }

    match profile.validate(&record) {
        Ok(()) => RowOutcome::Accepted(record),
        Err(reasons) => RowOutcome::Rejected(reasons),
    }
}

/// Convert a CSV file into an NDJSON file, diverting bad rows to `errors`.
pub fn convert_csv(
    input: &Path,
    output: &Path,
    errors: &Path,
    profile: &ConversionProfile,
    options: &ConvertOptions,
) -> PipelineResult<ConvertStats> {
    let profile = options.apply_to(profile);

    log_info(format!("Reading {}", input.display()));
    let source = RowSource::open(input, profile.delimiter)?;

    let output = BufWriter::new(File::create(output)?);
    let errors = BufWriter::new(File::create(errors)?);
    convert_source(&source, &profile, output, errors)
}

/// Same as [`convert_csv`] for bytes already in memory.
pub fn convert_bytes<O: Write, E: Write>(
    bytes: &[u8],
    profile: &ConversionProfile,
    output: O,
    errors: E,
) -> PipelineResult<ConvertStats> {
    let source = RowSource::from_bytes(bytes, profile.delimiter)?;
    convert_source(&source, profile, output, errors)
}

/// Convert an opened row source. The first row is always consumed as the
/// file's header row, even when the profile supplies its own headers.
pub fn convert_source<O: Write, E: Write>(
    source: &RowSource,
    profile: &ConversionProfile,
    output: O,
    errors: E,
) -> PipelineResult<ConvertStats> {
    let compiled = profile.compile()?;

    log_success(format!("Detected encoding: {}", source.encoding()));
    log_success(format!("Separator: '{}'", format_delimiter(source.delimiter())));

    let (file_headers, rows) = source.split_header()?;
    if profile.headers.is_none() {
        let missing = profile.missing_columns(&file_headers);
        if !missing.is_empty() {
            log_warning(format!("Columns not found in file: {}", missing.join(", ")));
        }
    }

    let headers = profile.resolve_headers(&file_headers);
    log_info(format!("{} columns", headers.len()));

    let mut records = RecordWriter::new(output);
    let mut diverted = ErrorWriter::new(errors, source.delimiter() as u8);
    let stats = convert_rows(&headers, rows, &compiled, &mut records, &mut diverted)?;

    if stats.diverted() > 0 {
        log_warning(stats.summary());
    } else {
        log_success(stats.summary());
    }
    Ok(stats)
}

/// Core row loop: header strings are parsed once, every row is processed in
/// order. Row-level problems are diverted; only I/O problems stop the run.
pub fn convert_rows<I, O, E>(
    headers: &[String],
    rows: I,
    profile: &CompiledProfile,
    records: &mut RecordWriter<O>,
    errors: &mut ErrorWriter<E>,
) -> PipelineResult<ConvertStats>
where
    I: IntoIterator<Item = CsvResult<Vec<String>>>,
    O: Write,
    E: Write,
{
    let paths = parse_headers(headers)?;
    let mut stats = ConvertStats::default();

    for (i, row) in rows.into_iter().enumerate() {
        let row = row?;
        stats.rows += 1;

        let reason = match process_row(profile, &paths, &row) {
            RowOutcome::Accepted(record) => {
                records.write(&record)?;
                stats.written += 1;
                continue;
            }
            RowOutcome::Rejected(reasons) => {
                stats.rejected += 1;
                reasons.join("; ")
            }
            RowOutcome::Failed(err) => {
                stats.failed += 1;
                err.to_string()
            }
        };

        errors.write_row(row.as_slice())?;
        if stats.diverted() <= MAX_REPORTED {
            log_warning_indent(format!("Row {}: {}", i + 1, reason), 1);
        }
    }

    if stats.diverted() > MAX_REPORTED {
        log_warning_indent(format!("... +{} more", stats.diverted() - MAX_REPORTED), 1);
    }

    records.flush()?;
    errors.flush()?;
    Ok(stats)
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        other => other.to_string(),
    }
}

// =============================================================================
// NDJSON -> flat
// =============================================================================

/// Counters of an NDJSON pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub read: usize,
    pub written: usize,
    pub failed: usize,
}

impl NormalizeStats {
    /// Count a record that could not be processed, logging the first few.
    fn fail(&mut self, line_no: usize, err: &RecordError) {
        self.failed += 1;
        if self.failed <= MAX_REPORTED {
            log_warning_indent(format!("Line {}: {}", line_no, err), 1);
        }
    }

    fn report(&self, action: &str) {
        if self.failed > 0 {
            log_warning(format!("{} {}, failed: {}", action, self.written, self.failed));
        }
    }
}

/// Non-blank NDJSON lines as objects, tagged with their 1-based line number.
fn read_objects<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = PipelineResult<(usize, Map<String, Value>)>> {
    reader.lines().enumerate().filter_map(|(i, line)| {
        let line_no = i + 1;
        let line = match line {
            Ok(line) => line,
            Err(err) => return Some(Err(PipelineError::from(err))),
        };
        if line.trim().is_empty() {
            return None;
        }
        Some(parse_object(&line, line_no).map(|map| (line_no, map)))
    })
}

fn parse_object(line: &str, line_no: usize) -> PipelineResult<Map<String, Value>> {
    let value: Value = serde_json::from_str(line).map_err(|source| PipelineError::Json {
        line: line_no,
        source,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(PipelineError::NotAnObject { line: line_no }),
    }
}

/// NDJSON records in, flat NDJSON records out.
///
/// A record holding a list directly inside a list is skipped and counted as
/// failed.
pub fn flatten_ndjson<R: BufRead, W: Write>(reader: R, writer: W) -> PipelineResult<NormalizeStats> {
    let mut out = RecordWriter::new(writer);
    let mut stats = NormalizeStats::default();

    for item in read_objects(reader) {
        let (line_no, record) = item?;
        stats.read += 1;
        match flatten(&record) {
            Ok(flat) => {
                out.write(&Value::Object(flat))?;
                stats.written += 1;
            }
            Err(err) => stats.fail(line_no, &err),
        }
    }

    out.flush()?;
    stats.report("Flattened");
    Ok(stats)
}

/// Flatten each record, rename its keys, then nest it again.
///
/// A record whose new keys collide, or that cannot be flattened, is skipped
/// and counted as failed.
pub fn remap_ndjson<R: BufRead, W: Write>(
    reader: R,
    writer: W,
    rename: &RenameMap,
    drop_unmapped: bool,
) -> PipelineResult<NormalizeStats> {
    let mut out = RecordWriter::new(writer);
    let mut stats = NormalizeStats::default();

    for item in read_objects(reader) {
        let (line_no, record) = item?;
        stats.read += 1;
        match remap_tree(&record, rename, drop_unmapped) {
            Ok(remapped) => {
                out.write(&Value::Object(remapped))?;
                stats.written += 1;
            }
            Err(err) => stats.fail(line_no, &err),
        }
    }

    out.flush()?;
    stats.report("Remapped");
    Ok(stats)
}

/// NDJSON records in, one delimited table out. The header row holds the
/// flat path of every column, so the table converts straight back.
///
/// Records that cannot be flattened are left out of the table and counted as
/// failed.
pub fn export_csv<R: BufRead, W: Write>(
    reader: R,
    writer: W,
    delimiter: u8,
) -> PipelineResult<NormalizeStats> {
    let mut table = FlatCsvWriter::new();
    let mut stats = NormalizeStats::default();

    for item in read_objects(reader) {
        let (line_no, record) = item?;
        stats.read += 1;
        match flatten(&record) {
            Ok(flat) => table.push(flat),
            Err(err) => stats.fail(line_no, &err),
        }
    }

    table.write_to(writer, delimiter)?;
    stats.written = table.len();
    stats.report("Exported");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{Enrichment, PruneConfig};
    use crate::transform::Operation;
    use crate::validation::FieldPattern;
    use serde_json::json;

    fn lines(bytes: &[u8]) -> Vec<Value> {
        String::from_utf8(bytes.to_vec())
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn rows(data: &[&[&str]]) -> Vec<CsvResult<Vec<String>>> {
        data.iter()
            .map(|r| Ok(r.iter().map(|s| s.to_string()).collect()))
            .collect()
    }

    #[test]
    fn test_process_row_end_to_end_shape() {
        let paths = parse_headers(&["key_1.key_1.1", "key_1.key_1.2", "key_2.items[0].key2.1", "key_3"]).unwrap();
        let row: Vec<String> = vec!["v1".into(), "v2".into(), "v3".into(), "v4".into()];

        let outcome = process_row(&CompiledProfile::passthrough(), &paths, &row);
        assert_eq!(
            outcome,
            RowOutcome::Accepted(json!({
                "key_1": {"key_1": {"1": "v1", "2": "v2"}},
                "key_2": {"items": [{"key2": {"1": "v3"}}]},
                "key_3": "v4"
            }))
        );
    }

    #[test]
    fn test_process_row_length_mismatch() {
        let paths = parse_headers(&["a", "b"]).unwrap();
        let outcome = process_row(&CompiledProfile::passthrough(), &paths, &["1".to_string()]);
        assert_eq!(
            outcome,
            RowOutcome::Failed(RecordError::LengthMismatch { paths: 2, values: 1 })
        );
    }

    #[test]
    fn test_process_row_enrich_prune_validate() {
        let profile = ConversionProfile {
            patterns: vec![FieldPattern::new("id", r"\d+$")],
            prune: PruneConfig { enabled: true, sentinels: vec![json!("N/A")] },
            enrich: vec![Enrichment {
                path: "items[*].qty".into(),
                operations: vec![Operation::Trim, Operation::ToNumber],
            }],
            ..ConversionProfile::default()
        };
        let compiled = profile.compile().unwrap();
        let paths = parse_headers(&["id", "note", "items[0].qty", "items[1].qty"]).unwrap();

        let row: Vec<String> = vec!["7".into(), "N/A".into(), " 2 ".into(), "x".into()];
        assert_eq!(
            process_row(&compiled, &paths, &row),
            RowOutcome::Accepted(json!({"id": "7", "items": [{"qty": 2}]}))
        );

        let row: Vec<String> = vec!["A7".into(), "".into(), "1".into(), "1".into()];
        assert!(matches!(process_row(&compiled, &paths, &row), RowOutcome::Rejected(_)));
    }

    #[test]
    fn test_convert_rows_diverts_bad_rows() {
        let compiled = ConversionProfile {
            patterns: vec![FieldPattern::new("id", r"\d")],
            ..ConversionProfile::default()
        }
        .compile()
        .unwrap();

        let headers: Vec<String> = vec!["id".into(), "a.b".into()];
        let data = rows(&[&["1", "x"], &["2"], &["z", "y"], &["3", "w"]]);

        let mut out = RecordWriter::new(Vec::new());
        let mut err_buf = Vec::new();
        let stats = {
            let mut errors = ErrorWriter::new(&mut err_buf, b',');
            convert_rows(&headers, data, &compiled, &mut out, &mut errors).unwrap()
        };

        assert_eq!(stats, ConvertStats { rows: 4, written: 2, failed: 1, rejected: 1 });
        assert_eq!(stats.summary(), "Successful rows: 2, failed: 2");
        assert_eq!(
            lines(&out.into_inner()),
            vec![json!({"id": "1", "a": {"b": "x"}}), json!({"id": "3", "a": {"b": "w"}})]
        );
        assert_eq!(String::from_utf8(err_buf).unwrap(), "2\nz,y\n");
    }

    #[test]
    fn test_convert_rows_bad_header_is_fatal() {
        let headers: Vec<String> = vec!["a[x]".into()];
        let mut out = RecordWriter::new(Vec::new());
        let mut errors = ErrorWriter::new(Vec::new(), b',');
        let result = convert_rows(
            &headers,
            rows(&[&["1"]]),
            &CompiledProfile::passthrough(),
            &mut out,
            &mut errors,
        );
        assert!(matches!(result, Err(PipelineError::Path(_))));
    }

    #[test]
    fn test_convert_bytes_with_header_override() {
        let csv = b"whatever;ignored\n1;a\n2;b\n";
        let profile = ConversionProfile {
            headers: Some(vec!["id".into(), "tags[0]".into()]),
            ..ConversionProfile::default()
        };

        let mut out = Vec::new();
        let mut errors = Vec::new();
        let stats = convert_bytes(csv, &profile, &mut out, &mut errors).unwrap();

        assert_eq!(stats.rows, 2);
        assert_eq!(
            lines(&out),
            vec![json!({"id": "1", "tags": ["a"]}), json!({"id": "2", "tags": ["b"]})]
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_convert_bytes_renames_file_headers() {
        let csv = b"Order ID,Customer,Notes\n10,Ada,hello\n";
        let profile = ConversionProfile {
            rename: [("Order ID", "id"), ("Customer", "customer.name")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            drop_unmapped: true,
            ..ConversionProfile::default()
        };

        let mut out = Vec::new();
        convert_bytes(csv, &profile, &mut out, Vec::new()).unwrap();
        assert_eq!(lines(&out), vec![json!({"id": "10", "customer": {"name": "Ada"}})]);
    }

    #[test]
    fn test_convert_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.jsonl");
        let errors = dir.path().join("error_lines.csv");
        std::fs::write(&input, "id;items[0].n;items[1].n\n1;a;b\n2;c\n").unwrap();

        let stats = convert_csv(
            &input,
            &output,
            &errors,
            &ConversionProfile::default(),
            &ConvertOptions::default(),
        )
        .unwrap();

        assert_eq!(stats.written, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(
            lines(&std::fs::read(&output).unwrap()),
            vec![json!({"id": "1", "items": [{"n": "a"}, {"n": "b"}]})]
        );
        assert_eq!(std::fs::read_to_string(&errors).unwrap(), "2;c\n");
    }

    #[test]
    fn test_options_override_profile() {
        let profile = ConversionProfile::default();
        let options = ConvertOptions {
            headers: Some(vec!["a".into()]),
            delimiter: Some('|'),
            drop_unmapped: Some(true),
            prune: Some(true),
        };
        let effective = options.apply_to(&profile);
        assert_eq!(effective.headers, Some(vec!["a".to_string()]));
        assert_eq!(effective.delimiter, Some('|'));
        assert!(effective.drop_unmapped);
        assert!(effective.prune.enabled);
    }

    #[test]
    fn test_flatten_ndjson() {
        let input = b"{\"a\": {\"b\": 1}, \"l\": [{\"x\": \"y\"}]}\n\n{\"c\": \"d\"}\n";
        let mut out = Vec::new();
        let stats = flatten_ndjson(&input[..], &mut out).unwrap();

        assert_eq!(stats, NormalizeStats { read: 2, written: 2, failed: 0 });
        assert_eq!(lines(&out), vec![json!({"a.b": 1, "l[0].x": "y"}), json!({"c": "d"})]);
    }

    #[test]
    fn test_flatten_ndjson_rejects_non_objects() {
        let input = b"{\"a\": 1}\n[1, 2]\n";
        let err = flatten_ndjson(&input[..], Vec::new()).unwrap_err();
        assert!(matches!(err, PipelineError::NotAnObject { line: 2 }));

        let err = flatten_ndjson(&b"{oops"[..], Vec::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Json { line: 1, .. }));
    }

    #[test]
    fn test_remap_ndjson() {
        let input = b"{\"first\": \"Ada\", \"extra\": 1}\n{\"first\": \"Grace\", \"phone\": \"1\"}\n";
        let rename: RenameMap = [("first", "person.name"), ("phone", "person.phones[0]")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let mut out = Vec::new();
        let stats = remap_ndjson(&input[..], &mut out, &rename, true).unwrap();
        assert_eq!(stats.written, 2);
        assert_eq!(
            lines(&out),
            vec![
                json!({"person": {"name": "Ada"}}),
                json!({"person": {"name": "Grace", "phones": ["1"]}})
            ]
        );
    }

    #[test]
    fn test_remap_ndjson_counts_conflicts() {
        let input = b"{\"a\": \"1\", \"b\": \"2\"}\n{\"a\": \"3\"}\n";
        let rename: RenameMap = [("a", "x"), ("b", "x.y")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let mut out = Vec::new();
        let stats = remap_ndjson(&input[..], &mut out, &rename, false).unwrap();
        assert_eq!(stats, NormalizeStats { read: 2, written: 1, failed: 1 });
        assert_eq!(lines(&out), vec![json!({"x": "3"})]);
    }

    #[test]
    fn test_export_csv() {
        let input = b"{\"id\": \"1\", \"items\": [{\"n\": \"a\"}]}\n{\"id\": \"2\", \"note\": \"x\"}\n";
        let mut out = Vec::new();
        let stats = export_csv(&input[..], &mut out, b';').unwrap();

        assert_eq!(stats, NormalizeStats { read: 2, written: 2, failed: 0 });
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "id;items[0].n;note\n1;a;\n2;;x\n"
        );
    }

    #[test]
    fn test_list_of_lists_is_skipped_not_collapsed() {
        let input = b"{\"grid\": [[1, 2], [3, 4]]}\n{\"id\": \"1\"}\n";

        let mut flat = Vec::new();
        let stats = flatten_ndjson(&input[..], &mut flat).unwrap();
        assert_eq!(stats, NormalizeStats { read: 2, written: 1, failed: 1 });
        assert_eq!(lines(&flat), vec![json!({"id": "1"})]);

        let mut csv = Vec::new();
        let stats = export_csv(&input[..], &mut csv, b',').unwrap();
        assert_eq!(stats, NormalizeStats { read: 2, written: 1, failed: 1 });
        assert_eq!(String::from_utf8(csv).unwrap(), "id\n1\n");

        let mut remapped = Vec::new();
        let stats = remap_ndjson(&input[..], &mut remapped, &RenameMap::new(), false).unwrap();
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn test_export_then_convert_restores_records() {
        let original = json!({"id": "1", "customer": {"name": "Ada"}, "items": [{"n": "a"}, {"n": "b"}]});
        let input = format!("{}\n", original);

        let mut csv = Vec::new();
        export_csv(input.as_bytes(), &mut csv, b',').unwrap();

        let mut out = Vec::new();
        convert_bytes(&csv, &ConversionProfile::default(), &mut out, Vec::new()).unwrap();
        assert_eq!(lines(&out), vec![original]);
    }
}
