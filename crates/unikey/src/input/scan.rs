//! Directory scanning for eligible data files.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use crate::error::{Result, UnikeyError};

/// Default pattern for split-header companion files that are skipped.
pub const DEFAULT_EXCLUDE_PATTERN: &str = r"_header_\d+\.csv$";

static DEFAULT_EXCLUDE: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(DEFAULT_EXCLUDE_PATTERN)
        .case_insensitive(true)
        .build()
        .unwrap()
});

/// Finds `.csv` files in a directory, minus excluded names.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    directory: PathBuf,
    exclude: Regex,
}

impl DirectoryScanner {
    /// Scan `directory` with the default exclude pattern.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            exclude: DEFAULT_EXCLUDE.clone(),
        }
    }

    /// Replace the exclude pattern (matched case-insensitively against file names).
    pub fn with_exclude(mut self, pattern: &str) -> Result<Self> {
        self.exclude = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(self)
    }

    /// The scanned directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// List eligible files, sorted by file name.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.directory).map_err(|e| UnikeyError::Io {
            path: self.directory.clone(),
            source: e,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| UnikeyError::Io {
                path: self.directory.clone(),
                source: e,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            if self.is_eligible(&name) {
                files.push(path);
            }
        }

        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Whether a file name passes the extension and exclude filters.
    pub fn is_eligible(&self, file_name: &str) -> bool {
        file_name.to_lowercase().ends_with(".csv") && !self.exclude.is_match(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_filter() {
        let scanner = DirectoryScanner::new(".");
        assert!(scanner.is_eligible("orders.csv"));
        assert!(scanner.is_eligible("ORDERS.CSV"));
        assert!(!scanner.is_eligible("orders.tsv"));
        assert!(!scanner.is_eligible("orders_header_3.csv"));
        assert!(!scanner.is_eligible("orders_HEADER_12.CSV"));
        assert!(scanner.is_eligible("orders_header.csv"));
    }

    #[test]
    fn test_custom_exclude() {
        let scanner = DirectoryScanner::new(".").with_exclude("^tmp_").unwrap();
        assert!(!scanner.is_eligible("tmp_orders.csv"));
        assert!(scanner.is_eligible("orders_header_3.csv"));
    }

    #[test]
    fn test_invalid_exclude_is_error() {
        let err = DirectoryScanner::new(".").with_exclude("(").unwrap_err();
        assert!(matches!(err, UnikeyError::Regex(_)));
    }

    #[test]
    fn test_files_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        for name in ["b.csv", "a.csv", "a_header_1.csv", "notes.txt"] {
            std::fs::write(dir.path().join(name), "x\n1\n").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.csv")).unwrap();

        let files = DirectoryScanner::new(dir.path()).files().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.csv", "b.csv"]);
    }

    #[test]
    fn test_missing_directory() {
        let err = DirectoryScanner::new("/definitely/not/here").files().unwrap_err();
        assert!(matches!(err, UnikeyError::Io { .. }));
    }
}
