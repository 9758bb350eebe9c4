//! Deterministic ordering and stable row numbering.
//!
//! The export has no primary key, so a row's durable coordinate is its rank
//! under a fixed total order, not its line number in the file.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::fields::money_value;
use crate::identity::{source_row_key, RowIdentity};
use crate::record::{Field, NormalizedRecord};

const SORT_KEYS: [Field; 5] = [
    Field::Batch,
    Field::CheckNo,
    Field::VendNo,
    Field::InvoiceNo,
    Field::AccountNo,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    Default,
    /// Keep input order (debugging only).
    None,
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(SortMode::Default),
            "none" => Ok(SortMode::None),
            other => Err(format!("unknown sort mode '{}' (expected default|none)", other)),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortMode::Default => write!(f, "default"),
            SortMode::None => write!(f, "none"),
        }
    }
}

/// One row ready for the remote API. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadUnit {
    pub stable_row_num: usize,
    pub source_row_key: String,
    pub anchor_hash: String,
    pub content_hash: String,
    pub data: NormalizedRecord,
}

enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut digits = None;

    for (i, c) in s.char_indices() {
        let is_digit = c.is_ascii_digit();
        match digits {
            Some(prev) if prev != is_digit => {
                out.push(if prev { Chunk::Digits(&s[start..i]) } else { Chunk::Text(&s[start..i]) });
                start = i;
            }
            _ => {}
        }
        digits = Some(is_digit);
    }
    if let Some(prev) = digits {
        out.push(if prev { Chunk::Digits(&s[start..]) } else { Chunk::Text(&s[start..]) });
    }
    out
}

fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn cmp_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Case-insensitive comparison with embedded numbers compared by value,
/// so `"B2"` sorts before `"b10"`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (ca, cb) = (chunks(a), chunks(b));
    for (x, y) in ca.iter().zip(cb.iter()) {
        let ord = match (x, y) {
            (Chunk::Digits(x), Chunk::Digits(y)) => cmp_digits(x, y),
            (Chunk::Digits(x), Chunk::Text(y))
            | (Chunk::Text(x), Chunk::Digits(y))
            | (Chunk::Text(x), Chunk::Text(y)) => cmp_text(x, y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ca.len().cmp(&cb.len())
}

/// Missing amounts first, then numeric ascending, then unparsable text.
fn cmp_amount(a: Option<&str>, b: Option<&str>) -> Ordering {
    fn rank(v: Option<&str>) -> (u8, Option<f64>, &str) {
        match v {
            None => (0, None, ""),
            Some(s) => match money_value(s) {
                Some(n) => (1, Some(n), s),
                None => (2, None, s),
            },
        }
    }
    let (ra, na, sa) = rank(a);
    let (rb, nb, sb) = rank(b);
    ra.cmp(&rb)
        .then_with(|| match (na, nb) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        })
        .then_with(|| sa.cmp(sb))
}

fn cmp_rows(a: &(NormalizedRecord, RowIdentity), b: &(NormalizedRecord, RowIdentity)) -> Ordering {
    SORT_KEYS
        .iter()
        .fold(Ordering::Equal, |ord, f| {
            ord.then_with(|| natural_cmp(a.0.text(*f), b.0.text(*f)))
        })
        .then_with(|| cmp_amount(a.0.get(Field::NetAmount), b.0.get(Field::NetAmount)))
        .then_with(|| a.0.text(Field::Description).cmp(b.0.text(Field::Description)))
        .then_with(|| a.1.content_hash.cmp(&b.1.content_hash))
}

/// Order rows and number them 1..=n, building the upload units.
pub fn assign_stable_rows(
    source_folder: &str,
    source_file: &str,
    mut rows: Vec<(NormalizedRecord, RowIdentity)>,
    mode: SortMode,
) -> Vec<UploadUnit> {
    if mode == SortMode::Default {
        rows.sort_by(cmp_rows);
    }

    rows.into_iter()
        .enumerate()
        .map(|(i, (data, identity))| {
            let stable_row_num = i + 1;
            UploadUnit {
                stable_row_num,
                source_row_key: source_row_key(source_folder, source_file, stable_row_num),
                anchor_hash: identity.anchor_hash,
                content_hash: identity.content_hash,
                data,
            }
        })
        .collect()
}
