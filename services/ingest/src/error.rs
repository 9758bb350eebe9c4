//! Error type for the ingest core.
//!
//! Structural errors are per-file: the caller logs them and moves on to the
//! next file instead of aborting the run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Too few rows after cleaning: need a two-line header, found {found} row(s)")]
    TooFewRows { found: usize },

    #[error("Unrecognized header: no vendor or invoice column in {header:?}")]
    UnrecognizedHeader { header: Vec<String> },

    #[error("Input directory not found: {path}")]
    MissingDirectory { path: PathBuf },
}

impl IngestError {
    /// True for errors caused by the contents of one file.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            IngestError::Csv(_) | IngestError::TooFewRows { .. } | IngestError::UnrecognizedHeader { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
