//! Content-addressed row identities.
//!
//! `anchor_hash` covers the business key only; `content_hash` covers all
//! twelve fields. Same anchor with a different content hash means "same
//! ledger line, revised".

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::record::{Field, NormalizedRecord};

/// ASCII unit separator; cannot occur in normalized field text.
pub const FIELD_SEPARATOR: char = '\u{1f}';

const ANCHOR_FIELDS: [Field; 4] = [Field::VendNo, Field::InvoiceNo, Field::CheckNo, Field::Batch];

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn hash_fields(record: &NormalizedRecord, fields: &[Field]) -> String {
    let joined = fields
        .iter()
        .map(|f| record.text(*f))
        .collect::<Vec<_>>()
        .join(&FIELD_SEPARATOR.to_string());
    sha256_hex(joined.as_bytes())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowIdentity {
    pub anchor_hash: String,
    pub content_hash: String,
}

impl RowIdentity {
    pub fn compute(record: &NormalizedRecord) -> Self {
        Self {
            anchor_hash: hash_fields(record, &ANCHOR_FIELDS),
            content_hash: hash_fields(record, &Field::ALL),
        }
    }
}

/// Reproducible per-row key: `sha256(folder|file|stable_row_num)`.
pub fn source_row_key(source_folder: &str, source_file: &str, stable_row_num: usize) -> String {
    sha256_hex(format!("{}|{}|{}", source_folder, source_file, stable_row_num).as_bytes())
}
