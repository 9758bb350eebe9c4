//! AP308 Uploader - Stage 3 of the AP308 pipeline
//!
//! Responsibilities:
//! - Load the API base URL from `config.json`
//! - Turn clean tables into hashed, ordered upload units
//! - Drive the two-phase check/upsert protocol chunk by chunk
//! - Accumulate per-file and grand totals, isolating failed files
//!
//! Chunks of one file are sent strictly in sequence, and each chunk's
//! lines call is only issued after its check call has resolved. The pair
//! is not atomic: a crash between phases leaves observations recorded
//! without lines, which the server reports as `skipped_missing_observed`
//! on a later upsert rather than preventing it.

pub mod api;
pub mod batcher;
pub mod config;
pub mod error;
pub mod retry;
pub mod totals;

pub use api::{
    CheckCounts, CheckRequest, CheckRow, DryRunApi, HttpApi, ImportApi, LineRow, LinesCounts,
    LinesRequest,
};
pub use batcher::{UploadBatcher, UploadOptions, DEFAULT_CHUNK_SIZE};
pub use config::UploaderConfig;
pub use error::UploadError;
pub use retry::RetryPolicy;
pub use totals::{FailedFile, RunSummary, UploadTotals};
