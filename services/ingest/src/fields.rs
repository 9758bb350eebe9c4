//! Field-level normalization: free text, money and dates.
//!
//! Every function here is total and idempotent. A value that cannot be
//! normalized is passed through as cleaned text so a human can audit it;
//! it is never zeroed or replaced with a guess.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

use crate::record::Field;

/// Why a value was passed through without normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    Money,
    Date,
}

/// A value kept as-is because it did not parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    pub field: Field,
    pub value: String,
    pub kind: AnomalyKind,
}

fn money_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)$").expect("valid money regex"))
}

fn mdy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid date regex"))
}

fn iso_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"))
}

/// Trim and collapse internal whitespace runs to one space.
///
/// Control characters count as whitespace, so no field can carry the
/// unit separator the identity hashes join on.
pub fn norm_str(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Money as a fixed two-decimal string, e.g. `"1,234"` → `"1234.00"`.
///
/// Unparsable input comes back cleaned (trimmed, separators removed).
pub fn norm_money(s: &str) -> String {
    match checked_money(s) {
        Ok(v) | Err(v) => v,
    }
}

/// `M/D/YYYY` or `MM/DD/YYYY` → `YYYY-MM-DD`; anything else unchanged.
pub fn norm_date_mdy(s: &str) -> String {
    match checked_date_mdy(s) {
        Ok(v) | Err(v) => v,
    }
}

/// `Ok(normalized)` or `Err(cleaned passthrough)`.
pub(crate) fn checked_money(s: &str) -> Result<String, String> {
    let cleaned = s.trim().replace(',', "");
    if !money_re().is_match(&cleaned) {
        return Err(cleaned);
    }
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() => match round_cents(v) {
            Some(cents) => Ok(format!("{:.2}", cents / 100.0)),
            None => Err(cleaned),
        },
        _ => Err(cleaned),
    }
}

/// Whole cents, ties away from zero. Anything that rounds to zero is a
/// positive zero so `-0.001` and `0` render alike.
fn round_cents(v: f64) -> Option<f64> {
    let cents = (v * 100.0).round();
    if !cents.is_finite() {
        return None;
    }
    Some(if cents == 0.0 { 0.0 } else { cents })
}

/// `Ok(normalized)` or `Err(input passthrough)`.
pub(crate) fn checked_date_mdy(s: &str) -> Result<String, String> {
    let trimmed = s.trim();
    if iso_re().is_match(trimmed) {
        return Ok(trimmed.to_string());
    }

    let parsed = mdy_re().captures(trimmed).and_then(|caps| {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    });

    match parsed {
        Some(date) => Ok(date.format("%Y-%m-%d").to_string()),
        None => Err(s.to_string()),
    }
}

/// Parse an already-normalized amount for ordering.
pub(crate) fn money_value(s: &str) -> Option<f64> {
    if !money_re().is_match(s) {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
