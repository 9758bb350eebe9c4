//! AP308 Ingest - Shared core of the AP-ledger CSV pipeline
//!
//! Responsibilities:
//! - Decode and canonicalize raw export text
//! - Parse ragged CSV into rows and clean the two-line header report format
//! - Normalize money, dates and free text into canonical field values
//! - Compute anchor/content identities for every ledger line
//! - Order rows deterministically and assign stable row numbers
//!
//! CRITICAL: Everything in here must be DETERMINISTIC
//! Same input bytes = same rows, same hashes, same stable_row_num

pub mod cleaner;
pub mod error;
pub mod fields;
pub mod identity;
pub mod layout;
pub mod logging;
pub mod pipeline;
pub mod record;
pub mod register;
pub mod sort;
pub mod table;
pub mod text;

pub use cleaner::{CleanTable, RowCleaner, DEFAULT_SENTINEL};
pub use error::{IngestError, Result};
pub use fields::{norm_date_mdy, norm_money, norm_str, Anomaly, AnomalyKind};
pub use identity::{sha256_hex, source_row_key, RowIdentity, FIELD_SEPARATOR};
pub use pipeline::{clean_raw_file, prepare_clean_file, prepare_table, PreparedFile, RowAnomaly};
pub use layout::{file_name, list_csv_files, FolderLayout};
pub use record::{Field, FieldIndex, NormalizeOutcome, NormalizedRecord};
pub use register::{RegisterConversion, RegisterStats};
pub use sort::{assign_stable_rows, natural_cmp, SortMode, UploadUnit};
