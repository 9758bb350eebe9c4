//! Ragged CSV parsing into plain string rows.

use crate::error::Result;

/// One physical CSV line, one string per field.
pub type RawRow = Vec<String>;

/// Parse normalized text into rows.
///
/// Rows keep whatever width they have; reconciling widths is the cleaner's
/// job. Quoting follows standard CSV (`""` is an escaped quote) and a
/// trailing newline does not produce an empty row.
pub fn parse_rows(text: &str) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_ragged() {
        let rows = parse_rows("a,b,c\n1,2\n1,2,3,4\n").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[1].len(), 2);
        assert_eq!(rows[2].len(), 4);
    }

    #[test]
    fn test_parse_rows_quoting() {
        let text = "\"ACME, INC.\",\"say \"\"hi\"\"\",\"two\nlines\"\n";
        let rows = parse_rows(text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], vec!["ACME, INC.", "say \"hi\"", "two\nlines"]);
    }

    #[test]
    fn test_parse_rows_no_trailing_empty_row() {
        let rows = parse_rows("a,b\n").unwrap();
        assert_eq!(rows, vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[test]
    fn test_parse_rows_empty_input() {
        assert!(parse_rows("").unwrap().is_empty());
    }
}
