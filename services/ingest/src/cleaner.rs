//! Row cleaning for AP308 report exports.
//!
//! The legacy report repeats a banner at every page break, splits each
//! column label over two lines and emits rows of varying width. The cleaner
//! turns one file's raw rows into a rectangular table with a single header.

use std::io::Write;

use tracing::debug;

use crate::error::{IngestError, Result};
use crate::table::RawRow;

/// First-cell marker of the page-header banner the legacy system repeats.
pub const DEFAULT_SENTINEL: &str = "AP308";

/// A rectangular table: one merged header and data rows of equal width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CleanTable {
    /// Rebuild a table from an already-cleaned CSV (first row is the header).
    pub fn from_clean_rows(mut rows: Vec<RawRow>) -> Result<Self> {
        if rows.is_empty() {
            return Err(IngestError::TooFewRows { found: 0 });
        }
        let header = rows.remove(0);
        let mut table = CleanTable { header, rows };
        table.pad();
        Ok(table)
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Write header and rows as CSV.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::WriterBuilder::new().flexible(false).from_writer(writer);
        wtr.write_record(&self.header)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    fn pad(&mut self) {
        let max_cols = std::iter::once(&self.header)
            .chain(self.rows.iter())
            .map(Vec::len)
            .max()
            .unwrap_or(0);

        self.header.resize(max_cols, String::new());
        for row in &mut self.rows {
            row.resize(max_cols, String::new());
        }
    }
}

#[derive(Debug, Clone)]
pub struct RowCleaner {
    sentinels: Vec<String>,
}

impl Default for RowCleaner {
    fn default() -> Self {
        Self {
            sentinels: vec![DEFAULT_SENTINEL.to_string()],
        }
    }
}

impl RowCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add extra first-cell markers to drop, on top of the default banner.
    pub fn with_sentinels<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for s in extra {
            let s: String = s.into();
            let trimmed = s.trim();
            if !trimmed.is_empty() {
                self.sentinels.push(trimmed.to_string());
            }
        }
        self
    }

    fn is_sentinel(&self, cell: &str) -> bool {
        self.sentinels.iter().any(|s| s.eq_ignore_ascii_case(cell))
    }

    /// Clean one file's rows.
    ///
    /// Order: trim and drop empty rows, skip banners ahead of the header,
    /// merge the two header lines, filter the data rows, pad to the widest
    /// row. The continuation header line usually starts with a blank cell,
    /// so the blank-first-cell rule only applies to data rows.
    pub fn clean(&self, raw: Vec<RawRow>) -> Result<CleanTable> {
        let mut rows = raw
            .into_iter()
            .map(|row| row.into_iter().map(|c| c.trim().to_string()).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|c| !c.is_empty()))
            .skip_while(|row| self.is_sentinel(first_cell(row)))
            .collect::<Vec<_>>();

        if rows.len() < 2 {
            return Err(IngestError::TooFewRows { found: rows.len() });
        }

        let data = rows.split_off(2);
        let line2 = rows.pop().unwrap_or_default();
        let line1 = rows.pop().unwrap_or_default();
        let header = merge_header(&line1, &line2);

        let total = data.len();
        let rows = data
            .into_iter()
            .filter(|row| {
                let first = first_cell(row);
                !first.is_empty()
                    && !self.is_sentinel(first)
                    && !same_cells(row, &line1)
                    && !same_cells(row, &line2)
            })
            .collect::<Vec<_>>();

        debug!(kept = rows.len(), dropped = total - rows.len(), "cleaned data rows");

        let mut table = CleanTable { header, rows };
        table.pad();
        Ok(table)
    }
}

fn first_cell(row: &[String]) -> &str {
    row.first().map(String::as_str).unwrap_or("")
}

fn merge_header(line1: &[String], line2: &[String]) -> Vec<String> {
    let width = line1.len().max(line2.len());
    (0..width)
        .map(|i| {
            let a = line1.get(i).map(String::as_str).unwrap_or("");
            let b = line2.get(i).map(String::as_str).unwrap_or("");
            format!("{} {}", a, b).trim().to_string()
        })
        .collect()
}

fn same_cells(a: &[String], b: &[String]) -> bool {
    trim_trailing_empty(a) == trim_trailing_empty(b)
}

fn trim_trailing_empty(row: &[String]) -> &[String] {
    let end = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
    &row[..end]
}
