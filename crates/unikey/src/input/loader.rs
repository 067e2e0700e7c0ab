//! CSV/TSV loader with delimiter detection.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::dataset::{Dataset, Value};
use super::source::SourceMetadata;
use crate::error::{Result, UnikeyError};

/// Delimiters to try when auto-detecting.
const DELIMITERS: &[u8] = &[b'\t', b',', b';', b'|'];

const UTF8_BOM: &str = "\u{feff}";

/// Loader configuration.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Delimiter to use (None = auto-detect).
    pub delimiter: Option<u8>,
    /// Whether the file has a header row.
    pub has_header: bool,
    /// Maximum rows to read (None = all).
    pub max_rows: Option<usize>,
    /// Quote character.
    pub quote: u8,
    /// Cell contents loaded as null.
    pub null_markers: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delimiter: None,
            has_header: true,
            max_rows: None,
            quote: b'"',
            null_markers: vec![String::new()],
        }
    }
}

/// Loads delimited text files into a [`Dataset`].
#[derive(Debug, Clone)]
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    /// Create a new loader with default configuration.
    pub fn new() -> Self {
        Self {
            config: LoaderConfig::default(),
        }
    }

    /// Create a loader with custom configuration.
    pub fn with_config(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// The loader's configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load a file and return the dataset and its metadata.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<(Dataset, SourceMetadata)> {
        let path = path.as_ref();
        let io_err = |e| UnikeyError::Io {
            path: path.to_path_buf(),
            source: e,
        };

        let mut file = File::open(path).map_err(io_err)?;
        let size_bytes = file.metadata().map_err(io_err)?.len();

        let mut contents = Vec::new();
        file.read_to_end(&mut contents).map_err(io_err)?;

        let mut hasher = Sha256::new();
        hasher.update(&contents);
        let hash = format!("sha256:{:x}", hasher.finalize());

        let (decoded, encoding) = decode(&contents);
        if encoding != "utf-8" {
            warn!(file = %path.display(), "contents are not valid UTF-8, decoded lossily");
        }
        let text = decoded.strip_prefix(UTF8_BOM).unwrap_or(decoded.as_ref());

        let delimiter = match self.config.delimiter {
            Some(d) => d,
            None => detect_delimiter(text.as_bytes())?,
        };

        let dataset = self.load_bytes(text.as_bytes(), delimiter)?;

        let format = match delimiter {
            b'\t' => "tsv",
            b',' => "csv",
            b';' => "csv-semicolon",
            b'|' => "psv",
            _ => "delimited",
        }
        .to_string();

        debug!(
            file = %path.display(),
            rows = dataset.row_count(),
            columns = dataset.column_count(),
            format = %format,
            "loaded dataset"
        );

        let metadata = SourceMetadata::new(
            path.to_path_buf(),
            hash,
            size_bytes,
            format,
            encoding.to_string(),
            dataset.row_count(),
            dataset.column_count(),
        );

        Ok((dataset, metadata))
    }

    /// Load already-decoded bytes with a known delimiter.
    pub fn load_bytes(&self, bytes: &[u8], delimiter: u8) -> Result<Dataset> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(self.config.has_header)
            .quote(self.config.quote)
            .flexible(true)
            .from_reader(bytes);

        let mut records = reader.records().peekable();

        let headers: Vec<String> = if self.config.has_header {
            reader_headers(bytes, delimiter, self.config.quote)?
        } else {
            match records.peek() {
                Some(Ok(record)) => (0..record.len())
                    .map(|i| format!("column_{}", i + 1))
                    .collect(),
                Some(Err(_)) => {
                    if let Some(Err(e)) = records.next() {
                        return Err(e.into());
                    }
                    Vec::new()
                }
                None => return Err(UnikeyError::EmptyData("No data rows found".to_string())),
            }
        };

        if headers.is_empty() {
            return Err(UnikeyError::EmptyData("No columns found".to_string()));
        }

        let expected_cols = headers.len();
        let mut rows = Vec::new();

        for (row_idx, result) in records.enumerate() {
            if let Some(max) = self.config.max_rows {
                if row_idx >= max {
                    break;
                }
            }

            let record = result?;
            if record.len() != expected_cols {
                warn!(
                    row = row_idx,
                    found = record.len(),
                    expected = expected_cols,
                    "ragged row, padding or truncating"
                );
            }

            let mut row: Vec<Value> = record
                .iter()
                .take(expected_cols)
                .map(|cell| self.cell_value(cell))
                .collect();
            row.resize(expected_cols, Value::Null);
            rows.push(row);
        }

        if rows.is_empty() {
            return Err(UnikeyError::EmptyData("No data rows found".to_string()));
        }

        Dataset::new(headers, rows)
    }

    fn cell_value(&self, cell: &str) -> Value {
        if self.config.null_markers.iter().any(|m| m == cell) {
            Value::Null
        } else {
            Value::text(cell)
        }
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the header row with a separate reader so the record iterator stays borrowed.
fn reader_headers(bytes: &[u8], delimiter: u8, quote: u8) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .quote(quote)
        .flexible(true)
        .from_reader(bytes);
    Ok(reader.headers()?.iter().map(|s| s.to_string()).collect())
}

/// Decode file contents, falling back to lossy UTF-8.
fn decode(bytes: &[u8]) -> (Cow<'_, str>, &'static str) {
    match std::str::from_utf8(bytes) {
        Ok(s) => (Cow::Borrowed(s), "utf-8"),
        Err(_) => (String::from_utf8_lossy(bytes), "utf-8-lossy"),
    }
}

/// Detect the delimiter by analyzing the first few lines.
fn detect_delimiter(bytes: &[u8]) -> Result<u8> {
    let reader = BufReader::new(bytes);
    let lines: Vec<String> = reader
        .lines()
        .take(10)
        .filter_map(|l| l.ok())
        .filter(|l| !l.trim().is_empty())
        .collect();

    if lines.is_empty() {
        return Err(UnikeyError::EmptyData("No lines to analyze".to_string()));
    }

    let mut best_delimiter = b',';
    let mut best_score = 0;

    for &delim in DELIMITERS {
        let counts: Vec<usize> = lines
            .iter()
            .map(|line| count_delimiter_in_line(line, delim))
            .collect();

        let first_count = counts[0];
        if first_count == 0 {
            continue;
        }

        let consistent = counts.iter().all(|&c| c == first_count);
        let variance: f64 = if counts.len() > 1 {
            let mean = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
            counts.iter().map(|&c| (c as f64 - mean).powi(2)).sum::<f64>() / counts.len() as f64
        } else {
            0.0
        };

        // Consistent counts dominate; tab wins ties since it rarely occurs in values
        let score = if consistent {
            first_count * 1000 + (if delim == b'\t' { 100 } else { 0 })
        } else if variance < 1.0 {
            first_count * 100
        } else {
            first_count
        };

        if score > best_score {
            best_score = score;
            best_delimiter = delim;
        }
    }

    Ok(best_delimiter)
}

/// Count delimiter occurrences in a line, respecting quotes.
fn count_delimiter_in_line(line: &str, delimiter: u8) -> usize {
    let delim_char = delimiter as char;
    let mut count = 0;
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c == delim_char && !in_quotes => count += 1,
            _ => {}
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_detect_delimiter_csv() {
        let data = b"a,b,c\n1,2,3\n4,5,6";
        assert_eq!(detect_delimiter(data).unwrap(), b',');
    }

    #[test]
    fn test_detect_delimiter_tsv() {
        let data = b"a\tb\tc\n1\t2\t3\n4\t5\t6";
        assert_eq!(detect_delimiter(data).unwrap(), b'\t');
    }

    #[test]
    fn test_detect_delimiter_ignores_quoted() {
        let data = b"name;note\n\"a,b\";x\n\"c,d\";y";
        assert_eq!(detect_delimiter(data).unwrap(), b';');
    }

    #[test]
    fn test_load_csv_with_nulls() {
        let loader = Loader::new();
        let data = b"name,age,city\nAlice,30,NYC\nBob,,LA";
        let ds = loader.load_bytes(data, b',').unwrap();

        assert_eq!(ds.columns(), &["name", "age", "city"]);
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.get(0, 0), Some(&Value::text("Alice")));
        assert_eq!(ds.get(1, 1), Some(&Value::Null));
    }

    #[test]
    fn test_load_pads_and_truncates_ragged_rows() {
        let loader = Loader::new();
        let data = b"a,b\n1\n2,3,4";
        let ds = loader.load_bytes(data, b',').unwrap();

        assert_eq!(ds.get(0, 1), Some(&Value::Null));
        assert_eq!(ds.rows()[1], vec![Value::text("2"), Value::text("3")]);
    }

    #[test]
    fn test_load_without_header() {
        let loader = Loader::with_config(LoaderConfig {
            has_header: false,
            ..LoaderConfig::default()
        });
        let ds = loader.load_bytes(b"1,2\n3,4", b',').unwrap();
        assert_eq!(ds.columns(), &["column_1", "column_2"]);
        assert_eq!(ds.row_count(), 2);
    }

    #[test]
    fn test_header_only_is_empty_data() {
        let err = Loader::new().load_bytes(b"a,b\n", b',').unwrap_err();
        assert!(matches!(err, UnikeyError::EmptyData(_)));
    }

    #[test]
    fn test_duplicate_headers_are_invalid() {
        let err = Loader::new().load_bytes(b"a,a\n1,2", b',').unwrap_err();
        assert!(matches!(err, UnikeyError::InvalidDataset(_)));
    }

    #[test]
    fn test_max_rows() {
        let loader = Loader::with_config(LoaderConfig {
            max_rows: Some(1),
            ..LoaderConfig::default()
        });
        let ds = loader.load_bytes(b"a\n1\n2\n3", b',').unwrap();
        assert_eq!(ds.row_count(), 1);
    }

    #[test]
    fn test_load_file_metadata_and_bom() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all("\u{feff}id\tname\n1\tx\n2\ty\n".as_bytes()).unwrap();

        let (ds, meta) = Loader::new().load(file.path()).unwrap();
        assert_eq!(ds.columns(), &["id", "name"]);
        assert_eq!(meta.format, "tsv");
        assert_eq!(meta.encoding, "utf-8");
        assert_eq!(meta.row_count, 2);
        assert!(meta.hash.starts_with("sha256:"));
    }

    #[test]
    fn test_load_invalid_utf8_is_lossy() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"id,name\n1,caf\xe9\n2,bar\n").unwrap();

        let (ds, meta) = Loader::new().load(file.path()).unwrap();
        assert_eq!(meta.encoding, "utf-8-lossy");
        assert_eq!(ds.row_count(), 2);
    }
}
