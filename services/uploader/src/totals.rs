//! Per-file and grand totals of an upload run. Process-local only.

use serde::Serialize;

use crate::api::{CheckCounts, LinesCounts};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadTotals {
    pub file: String,
    pub rows: u64,
    pub check: CheckCounts,
    pub lines: LinesCounts,
}

impl UploadTotals {
    pub fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            ..Self::default()
        }
    }

    pub fn add_chunk(&mut self, rows: usize, check: CheckCounts, lines: LinesCounts) {
        self.rows += rows as u64;
        self.check += check;
        self.lines += lines;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedFile {
    pub file: String,
    pub error: String,
}

/// Grand totals. Only files that completed every chunk are counted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub files: Vec<String>,
    pub rows: u64,
    pub check: CheckCounts,
    pub lines: LinesCounts,
    pub failed_files: Vec<FailedFile>,
    pub skipped_files: Vec<FailedFile>,
}

impl RunSummary {
    pub fn add_file(&mut self, totals: UploadTotals) {
        self.rows += totals.rows;
        self.check += totals.check;
        self.lines += totals.lines;
        self.files.push(totals.file);
    }

    pub fn fail_file(&mut self, file: &str, error: String) {
        self.failed_files.push(FailedFile {
            file: file.to_string(),
            error,
        });
    }

    pub fn skip_file(&mut self, file: &str, error: String) {
        self.skipped_files.push(FailedFile {
            file: file.to_string(),
            error,
        });
    }
}
