//! File-level composition of the ingest stages.

use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::cleaner::{CleanTable, RowCleaner};
use crate::error::Result;
use crate::fields::Anomaly;
use crate::identity::RowIdentity;
use crate::layout::file_name;
use crate::record::FieldIndex;
use crate::sort::{assign_stable_rows, SortMode, UploadUnit};
use crate::table::parse_rows;
use crate::text::decode_bytes;

/// A passthrough value and the clean-CSV data row it came from (1-based).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowAnomaly {
    pub clean_row: usize,
    #[serde(flatten)]
    pub anomaly: Anomaly,
}

/// One clean file turned into ordered, hashed upload units.
#[derive(Debug, Clone)]
pub struct PreparedFile {
    pub source_file: String,
    pub units: Vec<UploadUnit>,
    pub anomalies: Vec<RowAnomaly>,
}

/// Raw export file → clean table.
pub fn clean_raw_file(path: &Path, cleaner: &RowCleaner) -> Result<CleanTable> {
    let bytes = fs::read(path)?;
    let rows = parse_rows(&decode_bytes(&bytes))?;
    debug!(file = %path.display(), raw_rows = rows.len(), "parsed raw export");
    cleaner.clean(rows)
}

/// Clean table → normalized, hashed, ordered units.
pub fn prepare_table(
    source_folder: &str,
    source_file: &str,
    table: &CleanTable,
    mode: SortMode,
) -> Result<PreparedFile> {
    let index = FieldIndex::from_header(&table.header)?;

    let mut rows = Vec::with_capacity(table.rows.len());
    let mut anomalies = Vec::new();
    for (i, row) in table.rows.iter().enumerate() {
        let outcome = index.normalize(row);
        anomalies.extend(outcome.anomalies.into_iter().map(|anomaly| RowAnomaly {
            clean_row: i + 1,
            anomaly,
        }));
        let identity = RowIdentity::compute(&outcome.record);
        rows.push((outcome.record, identity));
    }

    Ok(PreparedFile {
        source_file: source_file.to_string(),
        units: assign_stable_rows(source_folder, source_file, rows, mode),
        anomalies,
    })
}

/// Clean CSV file (merged header first) → prepared file.
pub fn prepare_clean_file(source_folder: &str, path: &Path, mode: SortMode) -> Result<PreparedFile> {
    let bytes = fs::read(path)?;
    let table = CleanTable::from_clean_rows(parse_rows(&decode_bytes(&bytes))?)?;
    prepare_table(source_folder, &file_name(path), &table, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::source_row_key;
    use crate::record::Field;

    const RAW: &str = "\u{feff}AP308,ACCOUNTS PAYABLE,,\r\n\
P/O,VEND,INVOICE,NET,CHECK,BATCH,DESCRIPTION\r\n\
NO.,NO.,NUMBER,AMOUNT,NUMBER,,\r\n\
,,,,,,\r\n\
1001,V02,INV-2,\"1,000\",500,B1,chairs\r\n\
AP308,PAGE 2,,\r\n\
1002,V01,INV-1,12.5,500,B1,desks\r\n\
1003,V01,INV-3,oops,501,B1,\r\n";

    #[test]
    fn test_raw_to_units_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let raw_path = dir.path().join("ap308_june.csv");
        fs::write(&raw_path, RAW).unwrap();

        let table = clean_raw_file(&raw_path, &RowCleaner::new()).unwrap();
        assert_eq!(table.header[0], "P/O NO.");
        assert_eq!(table.header[5], "BATCH");
        assert_eq!(table.rows.len(), 3);

        let clean_path = dir.path().join("clean.csv");
        table.write_csv(fs::File::create(&clean_path).unwrap()).unwrap();

        let prepared = prepare_clean_file("2024-06", &clean_path, SortMode::Default).unwrap();
        assert_eq!(prepared.source_file, "clean.csv");
        assert_eq!(prepared.units.len(), 3);

        // batch equal, check 500 < 501, then vend V01 < V02
        let order: Vec<&str> = prepared.units.iter().map(|u| u.data.text(Field::InvoiceNo)).collect();
        assert_eq!(order, vec!["INV-1", "INV-2", "INV-3"]);
        assert_eq!(prepared.units[0].data.net_amount.as_deref(), Some("12.50"));
        assert_eq!(prepared.units[1].data.net_amount.as_deref(), Some("1000.00"));
        assert_eq!(prepared.units[2].source_row_key, source_row_key("2024-06", "clean.csv", 3));

        assert_eq!(prepared.anomalies.len(), 1);
        assert_eq!(prepared.anomalies[0].clean_row, 3);
        assert_eq!(prepared.anomalies[0].anomaly.value, "oops");
    }

    #[test]
    fn test_prepare_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.csv");
        fs::write(&path, "VEND NO.,INVOICE NO.,NET AMOUNT\nV2,I1,3\nV1,I9,4\n").unwrap();

        let a = prepare_clean_file("f", &path, SortMode::Default).unwrap();
        let b = prepare_clean_file("f", &path, SortMode::Default).unwrap();
        assert_eq!(a.units, b.units);
        assert_eq!(a.units[0].data.text(Field::VendNo), "V1");
    }
}
