//! Canonical ledger fields and the per-file column mapping.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{IngestError, Result};
use crate::fields::{checked_date_mdy, checked_money, norm_str, Anomaly, AnomalyKind};

/// The twelve canonical AP308 fields, in content-hash order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    PoNo,
    VendNo,
    VendorName,
    InvoiceNo,
    InvoiceDate,
    AccountNo,
    AcctPd,
    NetAmount,
    CheckNo,
    CheckDate,
    Description,
    Batch,
}

impl Field {
    pub const ALL: [Field; 12] = [
        Field::PoNo,
        Field::VendNo,
        Field::VendorName,
        Field::InvoiceNo,
        Field::InvoiceDate,
        Field::AccountNo,
        Field::AcctPd,
        Field::NetAmount,
        Field::CheckNo,
        Field::CheckDate,
        Field::Description,
        Field::Batch,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::PoNo => "po_no",
            Field::VendNo => "vend_no",
            Field::VendorName => "vendor_name",
            Field::InvoiceNo => "invoice_no",
            Field::InvoiceDate => "invoice_date",
            Field::AccountNo => "account_no",
            Field::AcctPd => "acct_pd",
            Field::NetAmount => "net_amount",
            Field::CheckNo => "check_no",
            Field::CheckDate => "check_date",
            Field::Description => "description",
            Field::Batch => "batch",
        }
    }

    /// Header labels (uppercased, alphanumerics only) that map to this field.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::PoNo => &["PONO", "PONUMBER", "PO"],
            Field::VendNo => &["VENDNO", "VENDORNO", "VENDORNUMBER", "VENDOR"],
            Field::VendorName => &["VENDORNAME", "VENDNAME", "NAME"],
            Field::InvoiceNo => &["INVOICENO", "INVOICENUMBER", "INVNO", "INVOICE"],
            Field::InvoiceDate => &["INVOICEDATE", "INVDATE"],
            Field::AccountNo => &["ACCOUNTNO", "ACCOUNTNUMBER", "ACCTNO", "ACCOUNT"],
            Field::AcctPd => &["ACCTPD", "ACCOUNTINGPERIOD", "PERIOD"],
            Field::NetAmount => &["NETAMOUNT", "NETAMT", "AMOUNT"],
            Field::CheckNo => &["CHECKNO", "CHECKNUMBER", "CHKNO", "CHECK"],
            Field::CheckDate => &["CHECKDATE", "CHKDATE"],
            Field::Description => &["DESCRIPTION", "DESC"],
            Field::Batch => &["BATCH", "BATCHNO", "BATCHNUMBER"],
        }
    }
}

/// One normalized ledger line. `None` serializes as JSON `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub po_no: Option<String>,
    pub vend_no: Option<String>,
    pub vendor_name: Option<String>,
    pub invoice_no: Option<String>,
    pub invoice_date: Option<String>,
    pub account_no: Option<String>,
    pub acct_pd: Option<String>,
    pub net_amount: Option<String>,
    pub check_no: Option<String>,
    pub check_date: Option<String>,
    pub description: Option<String>,
    pub batch: Option<String>,
}

impl NormalizedRecord {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Value used for hashing and ordering: `None` reads as `""`.
    pub fn text(&self, field: Field) -> &str {
        self.get(field).unwrap_or("")
    }

    pub fn set(&mut self, field: Field, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::PoNo => &self.po_no,
            Field::VendNo => &self.vend_no,
            Field::VendorName => &self.vendor_name,
            Field::InvoiceNo => &self.invoice_no,
            Field::InvoiceDate => &self.invoice_date,
            Field::AccountNo => &self.account_no,
            Field::AcctPd => &self.acct_pd,
            Field::NetAmount => &self.net_amount,
            Field::CheckNo => &self.check_no,
            Field::CheckDate => &self.check_date,
            Field::Description => &self.description,
            Field::Batch => &self.batch,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::PoNo => &mut self.po_no,
            Field::VendNo => &mut self.vend_no,
            Field::VendorName => &mut self.vendor_name,
            Field::InvoiceNo => &mut self.invoice_no,
            Field::InvoiceDate => &mut self.invoice_date,
            Field::AccountNo => &mut self.account_no,
            Field::AcctPd => &mut self.acct_pd,
            Field::NetAmount => &mut self.net_amount,
            Field::CheckNo => &mut self.check_no,
            Field::CheckDate => &mut self.check_date,
            Field::Description => &mut self.description,
            Field::Batch => &mut self.batch,
        }
    }
}

/// A normalized record plus the values that had to be passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeOutcome {
    pub record: NormalizedRecord,
    pub anomalies: Vec<Anomaly>,
}

/// Column position of each canonical field, resolved once per file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIndex {
    columns: [Option<usize>; 12],
}

fn canonical_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}

impl FieldIndex {
    /// Map a merged header to field positions.
    ///
    /// Exact alias matches are taken leftmost-first, and a column is never
    /// assigned to two fields. Fails when neither vendor nor invoice number
    /// can be located.
    pub fn from_header(header: &[String]) -> Result<Self> {
        let labels: Vec<String> = header.iter().map(|h| canonical_label(h)).collect();
        let mut columns = [None; 12];
        let mut taken = vec![false; labels.len()];

        for (slot, field) in Field::ALL.iter().enumerate() {
            for alias in field.aliases() {
                let hit = labels
                    .iter()
                    .enumerate()
                    .find(|(i, label)| !taken[*i] && label.as_str() == *alias)
                    .map(|(i, _)| i);
                if let Some(i) = hit {
                    columns[slot] = Some(i);
                    taken[i] = true;
                    break;
                }
            }
        }

        let index = FieldIndex { columns };
        if index.column(Field::VendNo).is_none() && index.column(Field::InvoiceNo).is_none() {
            return Err(IngestError::UnrecognizedHeader {
                header: header.to_vec(),
            });
        }
        Ok(index)
    }

    pub fn column(&self, field: Field) -> Option<usize> {
        let slot = Field::ALL.iter().position(|f| *f == field)?;
        self.columns[slot]
    }

    fn cell<'a>(&self, row: &'a [String], field: Field) -> &'a str {
        self.column(field)
            .and_then(|i| row.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Normalize one clean row. Never fails; passthroughs land in `anomalies`.
    pub fn normalize(&self, row: &[String]) -> NormalizeOutcome {
        let mut record = NormalizedRecord::default();
        let mut anomalies = Vec::new();

        for field in Field::ALL {
            let text = norm_str(self.cell(row, field));
            if text.is_empty() {
                continue;
            }

            let checked = match field {
                Field::NetAmount => checked_money(&text).map_err(|v| (v, AnomalyKind::Money)),
                Field::InvoiceDate | Field::CheckDate => {
                    checked_date_mdy(&text).map_err(|v| (v, AnomalyKind::Date))
                }
                _ => Ok(text),
            };

            let value = match checked {
                Ok(v) => v,
                Err((v, kind)) => {
                    warn!(field = field.name(), value = %v, "value kept without normalization");
                    anomalies.push(Anomaly {
                        field,
                        value: v.clone(),
                        kind,
                    });
                    v
                }
            };
            record.set(field, Some(value));
        }

        NormalizeOutcome { record, anomalies }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn full_header() -> Vec<String> {
        strings(&[
            "P/O NO.",
            "VEND NO.",
            "VENDOR NAME",
            "INVOICE NUMBER",
            "INVOICE DATE",
            "ACCOUNT NUMBER",
            "ACCT PD",
            "NET AMOUNT",
            "CHECK NUMBER",
            "CHECK DATE",
            "DESCRIPTION",
            "BATCH",
        ])
    }

    #[test]
    fn test_field_index_full_header() {
        let index = FieldIndex::from_header(&full_header()).unwrap();
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(index.column(*field), Some(i), "{}", field.name());
        }
    }

    #[test]
    fn test_field_index_shuffled_and_partial() {
        let header = strings(&["BATCH", "", "INV NO", "VEND NO"]);
        let index = FieldIndex::from_header(&header).unwrap();
        assert_eq!(index.column(Field::Batch), Some(0));
        assert_eq!(index.column(Field::InvoiceNo), Some(2));
        assert_eq!(index.column(Field::VendNo), Some(3));
        assert_eq!(index.column(Field::CheckDate), None);
    }

    #[test]
    fn test_field_index_rejects_unrelated_header() {
        let err = FieldIndex::from_header(&strings(&["FOO", "BAR"])).unwrap_err();
        assert!(err.is_structural());
    }

    #[test]
    fn test_normalize_row() {
        let index = FieldIndex::from_header(&full_header()).unwrap();
        let row = strings(&[
            "", "V001", "ACME   SUPPLY", "INV-1", "3/4/2024", "5000-100", "07", "1,234.5", "88123",
            "03/15/2024", " Paper  goods ", "B12",
        ]);
        let outcome = index.normalize(&row);
        let r = &outcome.record;

        assert!(outcome.anomalies.is_empty());
        assert_eq!(r.po_no, None);
        assert_eq!(r.vendor_name.as_deref(), Some("ACME SUPPLY"));
        assert_eq!(r.invoice_date.as_deref(), Some("2024-03-04"));
        assert_eq!(r.net_amount.as_deref(), Some("1234.50"));
        assert_eq!(r.check_date.as_deref(), Some("2024-03-15"));
        assert_eq!(r.description.as_deref(), Some("Paper goods"));
        assert_eq!(r.text(Field::PoNo), "");
    }

    #[test]
    fn test_embedded_unit_separator_cannot_shift_field_boundaries() {
        use crate::identity::{RowIdentity, FIELD_SEPARATOR};

        let index = FieldIndex::from_header(&strings(&["VEND NO", "INVOICE NO"])).unwrap();
        let a = index.normalize(&strings(&["A\u{1f}B", "C"])).record;
        let b = index.normalize(&strings(&["A", "B\u{1f}C"])).record;

        assert_eq!(a.vend_no.as_deref(), Some("A B"));
        assert_eq!(b.invoice_no.as_deref(), Some("B C"));
        for field in Field::ALL {
            assert!(!a.text(field).contains(FIELD_SEPARATOR));
            assert!(!b.text(field).contains(FIELD_SEPARATOR));
        }
        assert_ne!(RowIdentity::compute(&a).anchor_hash, RowIdentity::compute(&b).anchor_hash);
    }

    #[test]
    fn test_normalize_row_reports_anomalies() {
        let index = FieldIndex::from_header(&full_header()).unwrap();
        let mut row = vec![String::new(); 12];
        row[1] = "V1".into();
        row[4] = "sometime".into();
        row[7] = "N/A".into();

        let outcome = index.normalize(&row);
        assert_eq!(outcome.record.invoice_date.as_deref(), Some("sometime"));
        assert_eq!(outcome.record.net_amount.as_deref(), Some("N/A"));
        assert_eq!(
            outcome.anomalies,
            vec![
                Anomaly { field: Field::InvoiceDate, value: "sometime".into(), kind: AnomalyKind::Date },
                Anomaly { field: Field::NetAmount, value: "N/A".into(), kind: AnomalyKind::Money },
            ]
        );
    }

    #[test]
    fn test_record_serializes_nulls() {
        let mut r = NormalizedRecord::default();
        r.set(Field::VendNo, Some("V1".into()));
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["vend_no"], "V1");
        assert!(json["batch"].is_null());
    }
}
