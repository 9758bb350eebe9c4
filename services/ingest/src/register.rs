//! Legacy AP register conversion.
//!
//! A register export uses the same report layout as AP308. Conversion emits
//! each distinct ledger line once; the seen-set lives in a
//! [`RegisterConversion`] created per run, so nothing leaks between runs in
//! a long-lived process.

use std::collections::HashSet;

use serde::Serialize;

use crate::cleaner::CleanTable;
use crate::error::Result;
use crate::identity::RowIdentity;
use crate::record::{FieldIndex, NormalizedRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegisterStats {
    pub rows_in: usize,
    pub rows_out: usize,
    pub duplicates: usize,
    pub anomalies: usize,
}

#[derive(Debug, Default)]
pub struct RegisterConversion {
    seen: HashSet<String>,
    records: Vec<NormalizedRecord>,
    stats: RegisterStats,
}

impl RegisterConversion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one cleaned table; duplicates across tables of the same run are dropped.
    pub fn push_table(&mut self, table: &CleanTable) -> Result<()> {
        let index = FieldIndex::from_header(&table.header)?;

        for row in &table.rows {
            self.stats.rows_in += 1;
            let outcome = index.normalize(row);
            self.stats.anomalies += outcome.anomalies.len();

            let identity = RowIdentity::compute(&outcome.record);
            if self.seen.insert(identity.content_hash) {
                self.records.push(outcome.record);
                self.stats.rows_out += 1;
            } else {
                self.stats.duplicates += 1;
            }
        }

        Ok(())
    }

    pub fn stats(&self) -> &RegisterStats {
        &self.stats
    }

    pub fn finish(self) -> (Vec<NormalizedRecord>, RegisterStats) {
        (self.records, self.stats)
    }
}
